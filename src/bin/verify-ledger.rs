use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, Command};
use std::path::Path;
use tracing::{error, info};

use audit_ledger::ledger::{load_snapshot, AuditLedger, TamperDifference};

fn main() {
    // Parse command line arguments
    let matches = Command::new("verify-ledger")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Verify the integrity of an exported audit ledger snapshot")
        .arg(
            Arg::new("snapshot")
                .short('s')
                .long("snapshot")
                .value_name("PATH")
                .help("Path to the ledger snapshot (JSON)")
                .required(true),
        )
        .arg(
            Arg::new("reference")
                .short('r')
                .long("reference")
                .value_name("PATH")
                .help("Reference snapshot to compare block hashes against"),
        )
        .arg(
            Arg::new("session")
                .long("session")
                .value_name("SESSION_ID")
                .help("Also verify a single session's blocks"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable verbose output"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Suppress output except errors"),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let quiet = matches.get_flag("quiet");

    let level = if quiet {
        tracing::Level::ERROR
    } else if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let options = VerifyOptions {
        snapshot: matches
            .get_one::<String>("snapshot")
            .cloned()
            .unwrap_or_default(),
        reference: matches.get_one::<String>("reference").cloned(),
        session: matches.get_one::<String>("session").cloned(),
        verbose,
    };

    if let Err(e) = verify_snapshot_file(&options) {
        error!("Ledger verification failed: {:#}", e);
        std::process::exit(1);
    }

    if !quiet {
        println!("Ledger verification completed successfully");
    }
}

struct VerifyOptions {
    snapshot: String,
    reference: Option<String>,
    session: Option<String>,
    verbose: bool,
}

fn verify_snapshot_file(options: &VerifyOptions) -> Result<()> {
    info!("Verifying ledger snapshot: {}", options.snapshot);

    if !Path::new(&options.snapshot).exists() {
        return Err(anyhow!("Snapshot file not found: {}", options.snapshot));
    }

    let snapshot = load_snapshot(&options.snapshot)?;
    if options.verbose {
        println!(
            "Loaded snapshot version {} exported at {} ({} blocks)",
            snapshot.version,
            snapshot.exported_at,
            snapshot.chain.len()
        );
    }

    // Import re-checks every block hash and the whole chain
    let ledger = AuditLedger::import(&snapshot).context("Snapshot import rejected")?;
    if options.verbose {
        println!("Every block hash and chain link verified");
    }

    if let Some(session_id) = &options.session {
        if ledger.session_positions(session_id).is_empty() {
            return Err(anyhow!("Session not found in ledger: {}", session_id));
        }
        if !ledger.verify_session_integrity(session_id) {
            return Err(anyhow!("Session integrity check failed: {}", session_id));
        }
        if options.verbose {
            println!("Session {} verified", session_id);
        }
    }

    if let Some(reference_path) = &options.reference {
        let reference = load_snapshot(reference_path)
            .with_context(|| format!("Failed to load reference snapshot {}", reference_path))?;
        let report = ledger.detect_tampering_with_snapshot(&reference);

        if report.tampered {
            for difference in &report.differences {
                match difference {
                    TamperDifference::HashMismatch {
                        index,
                        current_hash,
                        reference_hash,
                    } => println!(
                        "  Block {}: hash {} differs from reference {}",
                        index, current_hash, reference_hash
                    ),
                    TamperDifference::LengthMismatch { current, reference } => println!(
                        "  Length {} differs from reference length {}",
                        current, reference
                    ),
                }
            }
            return Err(anyhow!(
                "Snapshot diverges from reference in {} places",
                report.differences.len()
            ));
        }

        if options.verbose {
            println!("Snapshot matches reference {}", reference_path);
        }
    }

    if options.verbose {
        let stats = ledger.statistics();
        println!("\nLedger Summary:");
        println!("  Total blocks: {}", stats.total_blocks);
        println!("  Sessions: {}", stats.total_sessions);
        println!("  Locked: {}", stats.is_locked);
        println!("  Violations: {}", stats.severity_counts.violation);
        if let Some(latest) = ledger.latest_block() {
            println!("  Head hash: {}", latest.hash());
        }

        println!("\nEvent type distribution:");
        for (event_type, count) in &stats.event_counts {
            println!("  {}: {}", event_type, count);
        }
    }

    Ok(())
}
