use audit_ledger::ledger::{AuditLedger, EventType, NewEvent, Payload};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

/// Fixed base time so hashes are reproducible across runs
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 20, 8, 0, 0).unwrap()
}

pub fn payload(value: Value) -> Payload {
    value.as_object().cloned().unwrap_or_default()
}

/// Two interleaved exam sessions on top of genesis
pub fn create_test_ledger() -> AuditLedger {
    let mut ledger = AuditLedger::new();
    let t = base_time();

    let events = vec![
        NewEvent::new("S1", EventType::SessionStart)
            .with_payload(payload(json!({"examId": "EXAM-1", "studentId": "STU-1"})))
            .at(t),
        NewEvent::new("S2", EventType::SessionStart)
            .with_payload(payload(json!({"examId": "EXAM-1", "studentId": "STU-2"})))
            .at(t + Duration::seconds(5)),
        NewEvent::new("S1", EventType::QuestionViewed)
            .with_payload(payload(json!({"questionNumber": 1})))
            .at(t + Duration::seconds(30)),
        NewEvent::new("S2", EventType::MultipleFaces)
            .with_payload(payload(json!({"faceCount": 2, "confidence": 0.91})))
            .at(t + Duration::seconds(40)),
        NewEvent::new("S1", EventType::TabSwitch).at(t + Duration::seconds(75)),
        NewEvent::new("S2", EventType::SessionEnd).at(t + Duration::seconds(90)),
        NewEvent::new("S1", EventType::SessionEnd).at(t + Duration::seconds(120)),
    ];

    for event in events {
        ledger.append(event).expect("Failed to append test event");
    }
    ledger
}
