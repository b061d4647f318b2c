//! CLI command implementations
//!
//! The drill runs a full primary/secondary lifecycle in memory:
//!
//! 1. Write entries on the primary, heartbeating and replicating each step
//! 2. Crash the primary (stop driving it)
//! 3. Advance the clock until the secondary detects the silence
//! 4. Fail over, keep writing on the new primary
//! 5. Rejoin the deposed replica, replay the committed log, checkpoint
//!
//! The clock is simulated, so two runs with the same arguments produce
//! the same report apart from the wall-clock timestamps.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::coordinator::{Coordinator, CoordinatorStats};
use crate::failover::{FailoverOutcome, FailoverTrigger};
use crate::ids::{Millis, ReplicaId};
use crate::log::{LogEntry, LogEntryType, Payload, Subsystem};
use crate::observability::{log_event_with_fields, Event};
use crate::replay::{ReplayApply, ReplayResult, ReplayStats};
use crate::replication::ReplicaConfig;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::write_response;

/// Simulated time between two writes.
const WRITE_STEP_MS: Millis = 10;

const SUBSYSTEMS: [Subsystem; 5] = [
    Subsystem::ProcessManager,
    Subsystem::Scheduler,
    Subsystem::CapabilitySystem,
    Subsystem::Audit,
    Subsystem::Accrual,
];

/// Dispatch a parsed command.
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::CheckConfig { config } => check_config(&config),
        Command::Drill {
            config,
            entries,
            kill_primary_after,
        } => drill(config.as_deref(), entries, kill_primary_after),
    }
}

/// Load, validate and echo a configuration file.
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = load_config(config_path)?;
    write_response(&config)
}

/// Run the failover drill and print its report.
pub fn drill(config_path: Option<&Path>, entries: u64, kill_primary_after: u64) -> CliResult<()> {
    let config = match config_path {
        Some(path) => load_config(path)?,
        None => ReplicaConfig::default(),
    };

    let report = run_drill(config, entries, kill_primary_after)?;
    let invariants_hold = report.invariants_hold;
    write_response(&report)?;

    if !invariants_hold {
        return Err(CliError::drill_failed("pair invariants violated after drill"));
    }
    Ok(())
}

fn load_config(path: &Path) -> CliResult<ReplicaConfig> {
    let config = ReplicaConfig::load(path)?;
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("path", &path.display().to_string())],
    );
    Ok(config)
}

/// Outcome of one drill
#[derive(Debug, Clone, Serialize)]
pub struct DrillReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub config: ReplicaConfig,
    pub entries_written: u64,
    /// `None` when the primary survived the whole drill
    pub primary_killed_after: Option<u64>,
    pub failure_detected_after_ms: Option<Millis>,
    pub trigger: Option<FailoverTrigger>,
    pub failover: Option<FailoverOutcome>,
    pub replay: ReplayStats,
    /// SHA-256 over every replayed payload, in LSN order
    pub state_digest: String,
    pub entries_checkpointed: usize,
    pub invariants_hold: bool,
    pub simulated_duration_ms: Millis,
    pub stats: CoordinatorStats,
}

/// Folds replayed payloads into one digest.
#[derive(Default)]
struct PayloadDigest {
    hasher: Sha256,
}

impl ReplayApply for PayloadDigest {
    fn apply_entry(&mut self, entry: &LogEntry) -> ReplayResult<()> {
        self.hasher.update(entry.lsn.get().to_le_bytes());
        self.hasher.update([entry.payload.subsystem.as_u8()]);
        self.hasher.update(&entry.payload.data);
        Ok(())
    }
}

impl PayloadDigest {
    fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

fn drill_payload(i: u64) -> Payload {
    let subsystem = SUBSYSTEMS[(i % SUBSYSTEMS.len() as u64) as usize];
    Payload::new(subsystem, format!("drill-op-{}", i))
}

/// Run the drill against `config` without printing anything.
pub fn run_drill(config: ReplicaConfig, entries: u64, kill_primary_after: u64) -> CliResult<DrillReport> {
    if entries == 0 {
        return Err(CliError::invalid_argument("--entries must be > 0"));
    }

    let started_at = Utc::now();
    let mut clock: Millis = 0;
    let mut pair = Coordinator::new(ReplicaId(1), ReplicaId(2), config.clone(), clock)?;
    log_event_with_fields(
        Event::DrillStart,
        &[
            ("entries", &entries.to_string()),
            ("kill_primary_after", &kill_primary_after.to_string()),
        ],
    );

    let crash = kill_primary_after < entries;
    let healthy_writes = if crash { kill_primary_after } else { entries };

    for i in 0..healthy_writes {
        clock += WRITE_STEP_MS;
        pair.submit(LogEntryType::StateMutation, drill_payload(i), clock)?;
        pair.heartbeat_tick(clock);
        pair.replicate(clock)?;
    }

    let mut failure_detected_after_ms = None;
    let mut trigger = None;
    let mut failover = None;

    if crash {
        // The primary is gone: nothing drives it from here on
        let killed_at = clock;
        let give_up_at = killed_at + config.heartbeat_timeout_ms + 2 * config.heartbeat_interval_ms;
        let detected = loop {
            clock += config.heartbeat_interval_ms;
            if let Some(found) = pair.detect_failure(clock) {
                break found;
            }
            if clock > give_up_at {
                return Err(CliError::drill_failed(format!(
                    "primary failure not detected within {}ms",
                    clock - killed_at
                )));
            }
        };
        failure_detected_after_ms = Some(clock - killed_at);

        pair.begin_failover(detected.clone(), clock)?;
        clock += WRITE_STEP_MS;
        failover = Some(pair.complete_failover(clock)?);
        trigger = Some(detected);

        for i in kill_primary_after..entries {
            clock += WRITE_STEP_MS;
            pair.submit(LogEntryType::StateMutation, drill_payload(i), clock)?;
            pair.heartbeat_tick(clock);
        }

        clock += WRITE_STEP_MS;
        pair.rejoin_failed_replica(clock)?;
        pair.replicate(clock)?;
    }

    let mut digest = PayloadDigest::default();
    let replay = pair.replay_committed(&mut digest, clock)?;
    let entries_checkpointed = pair.checkpoint();
    let invariants_hold = pair.check_invariants().is_ok();

    log_event_with_fields(
        Event::DrillComplete,
        &[
            ("epoch", &pair.primary().epoch().to_string()),
            ("invariants_hold", if invariants_hold { "true" } else { "false" }),
            ("simulated_ms", &clock.to_string()),
        ],
    );

    Ok(DrillReport {
        started_at,
        finished_at: Utc::now(),
        config,
        entries_written: entries,
        primary_killed_after: crash.then_some(kill_primary_after),
        failure_detected_after_ms,
        trigger,
        failover,
        replay,
        state_digest: digest.finish(),
        entries_checkpointed,
        invariants_hold,
        simulated_duration_ms: clock,
        stats: pair.stats(),
    })
}
