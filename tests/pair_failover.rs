//! Pair Failover Tests
//!
//! Drives a primary/secondary pair through loss of the primary, promotion,
//! continued writes and rejoin, using only the public coordinator API.

use replicore::cli::run_drill;
use replicore::coordinator::{Coordinator, CoordinatorError};
use replicore::failover::FailoverTrigger;
use replicore::ids::{Epoch, Lsn, Millis, ReplicaId};
use replicore::log::{LogEntryType, Payload, Subsystem};
use replicore::replication::{ReplicaConfig, ReplicaHealth, ReplicaRole, ReplicationError};

fn config() -> ReplicaConfig {
    ReplicaConfig {
        heartbeat_interval_ms: 100,
        heartbeat_timeout_ms: 400,
        ..ReplicaConfig::default()
    }
}

fn write(pair: &mut Coordinator, n: u64, at: Millis) -> Lsn {
    pair.submit(
        LogEntryType::StateMutation,
        Payload::new(Subsystem::Scheduler, format!("job-{}", n)),
        at,
    )
    .unwrap()
}

/// Pair with `n` entries written and replicated, clock ending at `n * 10`.
fn replicated_pair(n: u64) -> Coordinator {
    let mut pair = Coordinator::new(ReplicaId(1), ReplicaId(2), config(), 0).unwrap();
    for i in 1..=n {
        write(&mut pair, i, i * 10);
        pair.replicate(i * 10).unwrap();
    }
    pair
}

// =============================================================================
// Detection
// =============================================================================

/// Silence shorter than the timeout is not a failure.
#[test]
fn test_no_failure_inside_timeout() {
    let pair = replicated_pair(3);
    assert!(pair.detect_failure(30 + 400).is_none());
    assert!(pair.detect_failure(30 + 401).is_some());
}

/// A primary reported critical is failed over without waiting.
#[test]
fn test_critical_primary_triggers_immediately() {
    let mut pair = replicated_pair(1);
    pair.record_primary_health(ReplicaHealth::critical("disk full"));

    assert!(matches!(
        pair.detect_failure(20),
        Some(FailoverTrigger::PrimaryCritical { .. })
    ));
}

// =============================================================================
// Full lifecycle
// =============================================================================

/// Lose the primary, promote, keep writing, rejoin, converge.
#[test]
fn test_failover_and_rejoin() {
    let mut pair = replicated_pair(5);

    let trigger = pair.detect_failure(1_000).unwrap();
    pair.begin_failover(trigger, 1_000).unwrap();

    assert_eq!(pair.primary().id(), ReplicaId(2));
    assert_eq!(pair.primary().epoch(), Epoch(2));
    assert_eq!(pair.secondary().role(), ReplicaRole::Failed);
    // Everything the new primary held is now committed
    assert_eq!(pair.primary_log().committed_lsn(), Lsn(5));

    let outcome = pair.complete_failover(1_200).unwrap();
    assert_eq!(outcome.recovery_time_ms(), 200);
    assert!(outcome.within_rto());
    assert_eq!(pair.failover_state().state_name(), "Complete");

    // Epoch marker at 6, then new writes
    assert_eq!(write(&mut pair, 6, 1_300), Lsn(7));
    pair.check_invariants().unwrap();

    pair.rejoin_failed_replica(1_400).unwrap();
    pair.replicate(1_400).unwrap();

    assert_eq!(pair.secondary().id(), ReplicaId(1));
    assert_eq!(pair.secondary().role(), ReplicaRole::Secondary);
    assert_eq!(pair.secondary().epoch(), Epoch(2));
    assert_eq!(pair.replication_lag(), 0);
    assert_eq!(pair.primary().last_committed_lsn(), Lsn(7));
    pair.check_invariants().unwrap();

    let metrics = pair.metrics().snapshot();
    assert_eq!(metrics.failovers, 1);
    assert_eq!(metrics.rejoins, 1);
    assert_eq!(metrics.rto_breaches, 0);
}

/// A slow promotion degrades the new primary but still completes.
#[test]
fn test_slow_failover_breaches_rto() {
    let mut pair = replicated_pair(2);
    let trigger = pair.detect_failure(1_000).unwrap();
    pair.begin_failover(trigger, 1_000).unwrap();

    let outcome = pair.complete_failover(1_000 + 6_000).unwrap();
    assert!(!outcome.within_rto());
    assert_eq!(pair.primary().health(), &ReplicaHealth::degraded("RTO exceeded"));
    assert_eq!(pair.primary().role(), ReplicaRole::Primary);
    assert_eq!(pair.metrics().snapshot().rto_breaches, 1);
}

/// A batch built by the old primary is fenced once the pair has moved on.
#[test]
fn test_stale_batch_fenced_after_failover() {
    let mut pair = replicated_pair(2);
    write(&mut pair, 3, 30);
    let stale = pair.prepare_replication(30).unwrap();

    let trigger = pair.detect_failure(1_000).unwrap();
    pair.begin_failover(trigger, 1_000).unwrap();
    pair.complete_failover(1_010).unwrap();
    pair.rejoin_failed_replica(1_020).unwrap();

    let err = pair.deliver_replication(&stale, 1_020).unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::Replication(ReplicationError::EpochMismatch { .. })
    ));
    assert_eq!(pair.metrics().snapshot().epoch_fences, 1);
    pair.check_invariants().unwrap();
}

/// Checkpointing drops acknowledged entries but keeps the watermark entry.
#[test]
fn test_checkpoint_keeps_watermark() {
    let mut pair = replicated_pair(6);
    assert_eq!(pair.checkpoint(), 10);
    assert_eq!(pair.primary_log().first_lsn(), Lsn(6));
    pair.check_invariants().unwrap();
}

// =============================================================================
// Drill
// =============================================================================

/// The drill leaves the pair converged with invariants intact.
#[test]
fn test_drill_end_to_end() {
    let report = run_drill(config(), 20, 10).unwrap();
    assert!(report.invariants_hold);
    assert_eq!(report.stats.primary.id, ReplicaId(2));
    assert_eq!(report.stats.failovers, 1);
    assert_eq!(report.replay.entries_replayed, 21);
    assert_eq!(report.state_digest.len(), 64);
}
