use anyhow::Result;
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use audit_ledger::config::LedgerConfig;
use audit_ledger::ledger::{AuditLedger, BehaviorClass, EventType, NewEvent, Payload};

fn payload(value: Value) -> Payload {
    value.as_object().cloned().unwrap_or_default()
}

/// Scripted proctoring session exercising each record helper
fn record_demo_session(ledger: &mut AuditLedger, session_id: &str) -> Result<()> {
    ledger.record_session_start(
        session_id,
        payload(json!({"examId": "EXAM-DSA-101", "studentId": "STU-4F2A91C0"})),
    )?;
    ledger.record_face_event(
        session_id,
        EventType::FaceDetected,
        payload(json!({"confidence": 0.97, "faceCount": 1, "frameNumber": 12})),
    )?;
    ledger.append(
        NewEvent::new(session_id, EventType::QuestionViewed)
            .with_payload(payload(json!({"questionNumber": 1}))),
    )?;
    ledger.record_security_event(
        session_id,
        EventType::TabSwitch,
        payload(json!({"durationMs": 4200})),
    )?;
    ledger.record_behavior(
        session_id,
        BehaviorClass::Suspicious,
        payload(json!({"confidence": 0.71, "indicators": ["gaze_away", "tab_switch"]})),
    )?;
    ledger.record_face_event(
        session_id,
        EventType::MultipleFaces,
        payload(json!({"confidence": 0.88, "faceCount": 2, "frameNumber": 418})),
    )?;
    ledger.record_credibility_update(
        session_id,
        44.0,
        payload(json!({"previousScore": 71.0, "reason": "multiple faces"})),
    )?;
    ledger.append(
        NewEvent::new(session_id, EventType::AnswerSubmitted)
            .with_payload(payload(json!({"questionNumber": 1, "answer": "B"}))),
    )?;
    ledger.append(NewEvent::new(session_id, EventType::ExamSubmitted))?;
    ledger.record_session_end(
        session_id,
        payload(json!({"finalCredibility": 44.0, "totalViolations": 2})),
    )?;
    Ok(())
}

fn main() -> Result<()> {
    let config = LedgerConfig::load()?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting audit ledger demonstration");

    let mut ledger = AuditLedger::from_config(&config);
    if let Some(genesis) = ledger.genesis_block() {
        println!("Genesis block: {}", genesis.hash());
    }

    for session_id in ["SES-7C1D2E9A40B3", "SES-0A9F33B7C214"] {
        record_demo_session(&mut ledger, session_id)?;
        if let Some(trail) = ledger.session_audit_trail(session_id) {
            println!(
                "Session {}: {} events, {} violations, {} warnings, integrity {}",
                trail.session_id,
                trail.block_count,
                trail.violations,
                trail.warnings,
                if trail.integrity_valid { "ok" } else { "FAILED" }
            );
        }
    }

    let verification = ledger.verify_integrity();
    println!("{}", verification.summary());

    let stats = ledger.statistics();
    println!("Total blocks: {}", stats.total_blocks);
    println!("Total sessions: {}", stats.total_sessions);
    println!(
        "Severity: info {}, warning {}, critical {}, violation {}",
        stats.severity_counts.info,
        stats.severity_counts.warning,
        stats.severity_counts.critical,
        stats.severity_counts.violation
    );

    for block in ledger.violations() {
        println!(
            "Violation at block #{}: {} ({}) session {}",
            block.index(),
            block.event_type(),
            block.event_summary(),
            block.session_id()
        );
    }

    for block in ledger.blocks().iter().take(5) {
        println!(
            "Block #{} {:<28} prev {:.20}... hash {:.20}...",
            block.index(),
            block.event_type().as_str(),
            block.previous_hash(),
            block.hash()
        );
    }

    ledger.lock();
    match &config.snapshot_path {
        Some(path) => {
            ledger.save_snapshot(path)?;
            println!("Snapshot written to {}", path);
        }
        None => warn!("No snapshot_path configured, skipping export"),
    }

    Ok(())
}
