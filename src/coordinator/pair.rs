//! Primary/secondary pair
//!
//! The coordinator owns both replicas and both logs outright. Every call
//! takes `now` from the caller, moves the pair one step, and reports what
//! happened through the return value, the logger and the metrics.
//!
//! Slot discipline: `primary` always holds the replica with Primary
//! authority. A failover swaps the slots, so after promotion the deposed
//! replica sits in `secondary` as `Failed` until it rejoins.

use std::mem;

use super::errors::{CoordinatorError, CoordinatorResult};
use super::stats::{CoordinatorStats, ReplicaSummary, Totals};
use crate::failover::{FailoverController, FailoverOutcome, FailoverState, FailoverTrigger};
use crate::heartbeat::{process_heartbeat, HeartbeatMonitor, HeartbeatResponse};
use crate::ids::{Lsn, Millis, ReplicaId};
use crate::invariants::{check_hash_chain, check_lsn_monotonic, check_single_primary};
use crate::log::{LogEntryType, MessageLog, Payload, Subsystem};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::replay::{ReplayApply, ReplayEngine, ReplayStats};
use crate::replication::{
    apply_replication, build_request, install_snapshot, ReplicaConfig, ReplicaHealth,
    ReplicaRole, ReplicaState, ReplicationError, ReplicationRequest,
};

/// One replica with everything it owns
#[derive(Debug)]
struct ReplicaSlot {
    state: ReplicaState,
    log: MessageLog,
    monitor: HeartbeatMonitor,
}

impl ReplicaSlot {
    fn new(state: ReplicaState) -> Self {
        let log = MessageLog::new(state.config().max_log_entries);
        let monitor = HeartbeatMonitor::new(state.config());
        Self {
            state,
            log,
            monitor,
        }
    }

    fn summary(&self) -> ReplicaSummary {
        ReplicaSummary {
            id: self.state.id(),
            role: self.state.role(),
            epoch: self.state.epoch(),
            health: self.state.health().as_str(),
            last_applied_lsn: self.state.last_applied_lsn(),
            last_committed_lsn: self.state.last_committed_lsn(),
            log: self.log.stats(),
        }
    }
}

/// Replica pair coordinator
#[derive(Debug)]
pub struct Coordinator {
    config: ReplicaConfig,
    primary: ReplicaSlot,
    secondary: ReplicaSlot,
    failover: FailoverController,
    metrics: MetricsRegistry,
    totals: Totals,
}

impl Coordinator {
    /// Build a fresh pair: both replicas at epoch 1, nothing appended.
    pub fn new(
        primary_id: ReplicaId,
        secondary_id: ReplicaId,
        config: ReplicaConfig,
        now: Millis,
    ) -> CoordinatorResult<Self> {
        config.validate()?;
        if primary_id == secondary_id {
            return Err(CoordinatorError::DuplicateReplicaId(primary_id));
        }

        Ok(Self {
            primary: ReplicaSlot::new(ReplicaState::primary(primary_id, config.clone(), now)),
            secondary: ReplicaSlot::new(ReplicaState::secondary(
                secondary_id,
                config.clone(),
                now,
            )),
            config,
            failover: FailoverController::new(),
            metrics: MetricsRegistry::new(),
            totals: Totals::default(),
        })
    }

    pub fn config(&self) -> &ReplicaConfig {
        &self.config
    }

    /// Replica currently holding Primary authority.
    pub fn primary(&self) -> &ReplicaState {
        &self.primary.state
    }

    pub fn secondary(&self) -> &ReplicaState {
        &self.secondary.state
    }

    pub fn primary_log(&self) -> &MessageLog {
        &self.primary.log
    }

    pub fn secondary_log(&self) -> &MessageLog {
        &self.secondary.log
    }

    pub fn failover_state(&self) -> &FailoverState {
        self.failover.state()
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    // =========================================================================
    // WRITES AND REPLICATION
    // =========================================================================

    /// Append an operation on the primary.
    pub fn submit(
        &mut self,
        entry_type: LogEntryType,
        payload: Payload,
        now: Millis,
    ) -> CoordinatorResult<Lsn> {
        let slot = &mut self.primary;
        if !slot.state.role().can_write() {
            return Err(CoordinatorError::NotWritable {
                replica: slot.state.id(),
                role: slot.state.role(),
            });
        }

        let lsn = slot.log.append(entry_type, payload, slot.state.epoch(), now)?;
        slot.state.set_last_applied(lsn);

        self.metrics.increment_appends();
        log_event_with_fields(
            Event::ReplicaAppend,
            &[
                ("lsn", &lsn.to_string()),
                ("replica", &slot.state.id().to_string()),
                ("type", entry_type.as_str()),
            ],
        );
        Ok(lsn)
    }

    /// Build the next batch for the secondary without delivering it.
    pub fn prepare_replication(&self, now: Millis) -> CoordinatorResult<ReplicationRequest> {
        let from = self.secondary.state.last_applied_lsn().next();
        Ok(build_request(
            &self.primary.state,
            &self.primary.log,
            self.secondary.state.id(),
            from,
            now,
        )?)
    }

    /// Deliver a batch to the secondary and, on acknowledgement, commit
    /// the primary up to the acknowledged LSN.
    pub fn deliver_replication(
        &mut self,
        request: &ReplicationRequest,
        now: Millis,
    ) -> CoordinatorResult<Lsn> {
        let before = self.secondary.state.last_applied_lsn();
        let result = apply_replication(
            &mut self.secondary.state,
            &mut self.secondary.log,
            request,
            now,
        );

        let ack = match result {
            Ok(ack) => ack,
            Err(err) => {
                self.record_rejection(&err);
                return Err(err.into());
            }
        };

        let applied = ack.saturating_distance(before);
        self.totals.entries_replicated += applied;
        self.totals.record_latency(now.saturating_sub(request.sent_at));
        self.metrics.add_entries_replicated(applied);

        if request.epoch == self.primary.state.epoch() {
            self.primary.log.commit_to_lsn(ack);
            self.primary.state.set_last_committed(ack);
            // An acknowledgement is proof of life
            self.primary.state.touch_heartbeat(now);
        }

        if applied > 0 {
            log_event_with_fields(
                Event::ReplicationApplied,
                &[
                    ("ack_lsn", &ack.to_string()),
                    ("entries", &applied.to_string()),
                    ("target", &self.secondary.state.id().to_string()),
                ],
            );
        }
        Ok(ack)
    }

    /// Ship the next batch to the secondary and apply it.
    pub fn replicate(&mut self, now: Millis) -> CoordinatorResult<Lsn> {
        let request = self.prepare_replication(now)?;
        self.deliver_replication(&request, now)
    }

    fn record_rejection(&mut self, err: &ReplicationError) {
        self.totals.replication_errors += 1;
        self.metrics.increment_replication_rejections();
        if matches!(err, ReplicationError::EpochMismatch { .. }) {
            self.metrics.increment_epoch_fences();
        }
        log_event_with_fields(
            Event::ReplicationRejected,
            &[
                ("kind", err.kind_name()),
                ("reason", &err.to_string()),
                ("target", &self.secondary.state.id().to_string()),
            ],
        );
    }

    // =========================================================================
    // LIVENESS
    // =========================================================================

    /// Send a primary→secondary heartbeat if one is due.
    ///
    /// Returns the secondary's answer, or `None` when nothing was sent or
    /// the secondary is down. A `NeedEntries` answer triggers replication;
    /// a failed pull is counted as a rejection and the answer still returned.
    pub fn heartbeat_tick(&mut self, now: Millis) -> Option<HeartbeatResponse> {
        if !self.primary.monitor.is_due(now) {
            return None;
        }
        let heartbeat = self.primary.monitor.prepare(&self.primary.state, now);
        self.metrics.increment_heartbeats_sent();

        if self.secondary.state.role() == ReplicaRole::Failed {
            self.primary.monitor.record_miss();
            return None;
        }

        let response = process_heartbeat(&mut self.secondary.state, &heartbeat, now);
        self.primary.monitor.record_response(&response);

        match &response {
            HeartbeatResponse::Reject { reason } => {
                self.metrics.increment_heartbeats_rejected();
                self.metrics.increment_epoch_fences();
                log_event_with_fields(
                    Event::HeartbeatRejected,
                    &[
                        ("from", &heartbeat.from.to_string()),
                        ("reason", reason),
                    ],
                );
            }
            HeartbeatResponse::NeedEntries { .. } => {
                self.primary.state.touch_heartbeat(now);
                match self.prepare_replication(now) {
                    // Rejected deliveries are already counted and logged
                    Ok(request) => {
                        let _ = self.deliver_replication(&request, now);
                    }
                    Err(CoordinatorError::Replication(err)) => self.record_rejection(&err),
                    Err(_) => {}
                }
            }
            HeartbeatResponse::Ack => {
                self.primary.state.touch_heartbeat(now);
            }
        }
        Some(response)
    }

    /// Record an externally observed health for the primary.
    pub fn record_primary_health(&mut self, health: ReplicaHealth) {
        self.primary.state.set_health(health);
    }

    /// Decide whether the secondary should take over.
    ///
    /// Returns a trigger when the primary is known critical or dead, or
    /// when the secondary has not heard from it within the timeout.
    pub fn detect_failure(&self, now: Millis) -> Option<FailoverTrigger> {
        if self.failover.is_in_progress()
            || self.secondary.state.role() != ReplicaRole::Secondary
        {
            return None;
        }

        let health = self.primary.state.health();
        if health.warrants_failover() {
            return Some(FailoverTrigger::PrimaryCritical {
                health: health.clone(),
            });
        }

        let trigger = self
            .secondary
            .monitor
            .timeout_trigger(&self.secondary.state, now)?;
        log_event_with_fields(
            Event::HeartbeatTimeout,
            &[
                ("last_seen", &self.secondary.state.last_heartbeat().to_string()),
                ("observer", &self.secondary.state.id().to_string()),
            ],
        );
        Some(trigger)
    }

    // =========================================================================
    // FAILOVER
    // =========================================================================

    /// Promote the secondary and fence the current primary.
    pub fn begin_failover(&mut self, trigger: FailoverTrigger, now: Millis) -> CoordinatorResult<()> {
        let old_primary = self.primary.state.id();
        let trigger_name = trigger.as_str();

        if let Err(err) = self
            .failover
            .trigger(&mut self.secondary.state, trigger, old_primary, now)
        {
            log_event_with_fields(
                Event::FailoverFailed,
                &[
                    ("candidate", &self.secondary.state.id().to_string()),
                    ("reason", &err.to_string()),
                ],
            );
            return Err(err.into());
        }

        let deposed = &mut self.primary.state;
        deposed.set_role(ReplicaRole::Failed);
        deposed.set_health(ReplicaHealth::dead(now, "deposed by failover"));
        mem::swap(&mut self.primary, &mut self.secondary);

        let new_primary = &mut self.primary;
        new_primary.state.set_last_committed(new_primary.state.last_applied_lsn());
        new_primary.log.commit_to_lsn(new_primary.log.last_lsn());
        new_primary.monitor = HeartbeatMonitor::new(&self.config);

        log_event_with_fields(
            Event::FailoverStart,
            &[
                ("epoch", &new_primary.state.epoch().to_string()),
                ("new_primary", &new_primary.state.id().to_string()),
                ("old_primary", &old_primary.to_string()),
                ("trigger", trigger_name),
            ],
        );
        Ok(())
    }

    /// Finish the open failover and mark the new epoch in the log.
    ///
    /// A full log refuses before anything changes; checkpoint and retry.
    pub fn complete_failover(&mut self, now: Millis) -> CoordinatorResult<FailoverOutcome> {
        self.primary.log.check_capacity(1)?;
        let outcome = self.failover.complete(&mut self.primary.state, now)?;

        self.totals.failovers += 1;
        self.metrics.increment_failovers();

        let epoch = self.primary.state.epoch();
        let marker = Payload::new(Subsystem::Replication, epoch.get().to_le_bytes().to_vec());
        let lsn = self
            .primary
            .log
            .append(LogEntryType::EpochTransition, marker, epoch, now)?;
        self.primary.state.set_last_applied(lsn);

        let recovery = outcome.recovery_time_ms().to_string();
        if !outcome.within_rto() {
            self.metrics.increment_rto_breaches();
            log_event_with_fields(
                Event::FailoverRtoExceeded,
                &[
                    ("recovery_time_ms", &recovery),
                    ("rto_ms", &self.config.rto_ms.to_string()),
                ],
            );
        }
        log_event_with_fields(
            Event::FailoverComplete,
            &[
                ("epoch", &epoch.to_string()),
                ("new_primary", &self.primary.state.id().to_string()),
                ("recovery_time_ms", &recovery),
            ],
        );
        Ok(outcome)
    }

    /// Reinstall a failed secondary from a copy of the primary's log.
    pub fn rejoin_failed_replica(&mut self, now: Millis) -> CoordinatorResult<Lsn> {
        let resume_after = install_snapshot(
            &mut self.secondary.state,
            &mut self.secondary.log,
            &self.primary.state,
            &self.primary.log,
            now,
        )?;
        self.secondary.monitor = HeartbeatMonitor::new(&self.config);

        self.metrics.increment_rejoins();
        log_event_with_fields(
            Event::ReplicaRejoined,
            &[
                ("epoch", &self.secondary.state.epoch().to_string()),
                ("replica", &self.secondary.state.id().to_string()),
                ("resume_after", &resume_after.to_string()),
            ],
        );
        Ok(resume_after)
    }

    // =========================================================================
    // MAINTENANCE
    // =========================================================================

    /// Truncate both logs below the acknowledged commit watermark.
    ///
    /// The watermark entry itself is kept. Returns the number of entries
    /// dropped across both logs.
    pub fn checkpoint(&mut self) -> usize {
        let watermark = self.primary.state.last_committed_lsn();
        let mut dropped = self.primary.log.truncate_before(watermark);
        if self.secondary.state.role().accepts_replication() {
            dropped += self
                .secondary
                .log
                .truncate_before(watermark.min(self.secondary.state.last_applied_lsn()));
        }

        self.metrics.record_checkpoint(dropped as u64);
        log_event_with_fields(
            Event::LogTruncated,
            &[
                ("dropped", &dropped.to_string()),
                ("watermark", &watermark.to_string()),
            ],
        );
        dropped
    }

    /// Replay the primary's committed range into `applier`.
    pub fn replay_committed<A: ReplayApply>(
        &self,
        applier: &mut A,
        now: Millis,
    ) -> CoordinatorResult<ReplayStats> {
        let log = &self.primary.log;
        let start = Lsn(log.first_lsn().get().saturating_sub(1));
        Ok(ReplayEngine::replay(log, start, log.committed_lsn(), now, applier)?)
    }

    /// Check ordering, chaining and role invariants across the pair.
    pub fn check_invariants(&self) -> CoordinatorResult<()> {
        for slot in [&self.primary, &self.secondary] {
            let replica = slot.state.id();
            check_lsn_monotonic(slot.log.iter()).map_err(|lsn| {
                violation(replica, "lsn_monotonic", lsn)
            })?;
            check_hash_chain(slot.log.iter()).map_err(|lsn| {
                violation(replica, "hash_chain", lsn)
            })?;
        }

        // A failed replica takes no part in authority; the other may be
        // mid-promotion or serving alone
        let (p, s) = (self.primary.state.role(), self.secondary.state.role());
        let degraded = p == ReplicaRole::Failed || s == ReplicaRole::Failed;
        if !degraded && !check_single_primary(p, s) {
            return Err(violation(self.secondary.state.id(), "single_primary", Lsn::ZERO));
        }

        if self.secondary.state.role().accepts_replication() {
            for entry in self.secondary.log.iter() {
                if let Some(ours) = self.primary.log.entry(entry.lsn) {
                    if ours.entry_hash != entry.entry_hash {
                        return Err(violation(self.secondary.state.id(), "log_prefix", entry.lsn));
                    }
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Entries the secondary still lacks.
    pub fn replication_lag(&self) -> u64 {
        self.primary
            .state
            .last_applied_lsn()
            .saturating_distance(self.secondary.state.last_applied_lsn())
    }

    pub fn is_replication_healthy(&self) -> bool {
        self.replication_lag() <= self.config.max_replication_lag
    }

    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            primary: self.primary.summary(),
            secondary: self.secondary.summary(),
            replication_lag: self.replication_lag(),
            replication_healthy: self.is_replication_healthy(),
            entries_replicated: self.totals.entries_replicated,
            replication_errors: self.totals.replication_errors,
            failovers: self.totals.failovers,
            last_replication_latency_ms: self.totals.last_latency_ms,
            max_replication_latency_ms: self.totals.max_latency_ms,
            failover_state: self.failover.state_name(),
            metrics: self.metrics.snapshot(),
        }
    }
}

fn violation(replica: ReplicaId, invariant: &'static str, lsn: Lsn) -> CoordinatorError {
    let lsn_text = lsn.to_string();
    log_event_with_fields(
        Event::InvariantViolation,
        &[
            ("invariant", invariant),
            ("lsn", &lsn_text),
            ("replica", &replica.to_string()),
        ],
    );
    CoordinatorError::InvariantViolation {
        replica,
        invariant,
        lsn,
    }
}
