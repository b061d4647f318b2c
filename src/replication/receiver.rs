//! Replication requests, target side
//!
//! Rules, checked in order:
//! 1. Epoch must equal the local epoch (fences a deposed primary)
//! 2. Target must be this replica, in a role that accepts replication
//! 3. Request must be younger than `replication_timeout_ms`
//! 4. Empty batch: acknowledge the current position
//! 5. Leading entries at or below `last_applied_lsn` are duplicates; they
//!    are skipped if their hashes match local history
//! 6. The first new entry must be `last_applied_lsn + 1`
//! 7. The whole batch must chain onto the local tail
//!
//! Nothing is appended until every rule has passed, so a rejected request
//! leaves state and log untouched. Entries are never buffered or reordered.

use serde::Serialize;

use super::errors::{ReplicationError, ReplicationResult};
use super::sender::ReplicationRequest;
use super::state::ReplicaState;
use crate::ids::{Lsn, Millis};
use crate::log::{AppendError, MessageLog};

/// Wire form of the target's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReplicationResponse {
    Ok { last_applied_lsn: Lsn },
    Failed { reason: String },
}

impl ReplicationResponse {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

impl From<&ReplicationResult<Lsn>> for ReplicationResponse {
    fn from(result: &ReplicationResult<Lsn>) -> Self {
        match result {
            Ok(lsn) => Self::Ok {
                last_applied_lsn: *lsn,
            },
            Err(e) => Self::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// Apply a replication request to a target replica.
///
/// Returns the target's `last_applied_lsn` after the request.
pub fn apply_replication(
    state: &mut ReplicaState,
    log: &mut MessageLog,
    request: &ReplicationRequest,
    now: Millis,
) -> ReplicationResult<Lsn> {
    if request.epoch != state.epoch() {
        return Err(ReplicationError::EpochMismatch {
            local: state.epoch(),
            received: request.epoch,
        });
    }

    if request.target != state.id() {
        return Err(ReplicationError::invalid_state(
            state.id(),
            format!("request addressed to {}", request.target),
        ));
    }
    if !state.role().accepts_replication() {
        return Err(ReplicationError::invalid_state(
            state.id(),
            format!("role {} does not accept replication", state.role()),
        ));
    }
    if log.last_lsn() != state.last_applied_lsn() {
        return Err(ReplicationError::invalid_state(
            state.id(),
            format!(
                "log tail {} out of step with applied lsn {}",
                log.last_lsn(),
                state.last_applied_lsn()
            ),
        ));
    }

    let limit_ms = state.config().replication_timeout_ms;
    let age_ms = now.saturating_sub(request.sent_at);
    if age_ms > limit_ms {
        return Err(ReplicationError::ReplicationTimeout { age_ms, limit_ms });
    }

    let applied = state.last_applied_lsn();
    let duplicates = request
        .entries
        .iter()
        .take_while(|e| e.lsn <= applied)
        .count();

    for dup in &request.entries[..duplicates] {
        if let Some(local) = log.entry(dup.lsn) {
            if local.entry_hash != dup.entry_hash {
                return Err(ReplicationError::integrity(
                    dup.lsn,
                    "redelivered entry differs from local history",
                ));
            }
        }
    }

    let fresh = &request.entries[duplicates..];
    if let Some(first) = fresh.first() {
        let expected = applied.next();
        if first.lsn != expected {
            return Err(ReplicationError::LsnGap {
                expected,
                received: first.lsn,
            });
        }

        log.check_batch(fresh)
            .map_err(|e| append_to_replication(state, e))?;
        for entry in fresh {
            log.append_replicated(entry.clone())
                .map_err(|e| append_to_replication(state, e))?;
        }
        state.set_last_applied(log.last_lsn());
    }

    if request.prev_committed_lsn > state.last_committed_lsn() {
        state.set_last_committed(request.prev_committed_lsn);
        log.commit_to_lsn(state.last_committed_lsn());
    }
    state.touch_heartbeat(now);

    Ok(state.last_applied_lsn())
}

fn append_to_replication(state: &ReplicaState, e: AppendError) -> ReplicationError {
    match e {
        AppendError::LogFull { current, max } => ReplicationError::invalid_state(
            state.id(),
            format!("log full ({} of {} entries)", current, max),
        ),
        AppendError::IntegrityError { lsn, reason } | AppendError::InvalidEntry { lsn, reason } => {
            ReplicationError::integrity(lsn, reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{Epoch, ReplicaId};
    use crate::log::{LogEntryType, Payload, Subsystem};
    use crate::replication::{build_request, ReplicaConfig};

    struct Pair {
        primary: ReplicaState,
        primary_log: MessageLog,
        secondary: ReplicaState,
        secondary_log: MessageLog,
    }

    fn pair(n: u64) -> Pair {
        let config = ReplicaConfig::default();
        let mut primary = ReplicaState::primary(ReplicaId(1), config.clone(), 0);
        let mut primary_log = MessageLog::new(100);
        for i in 1..=n {
            primary_log
                .append(
                    LogEntryType::StateMutation,
                    Payload::new(Subsystem::ProcessManager, vec![i as u8]),
                    Epoch(1),
                    i * 100,
                )
                .unwrap();
        }
        primary.set_last_applied(primary_log.last_lsn());
        Pair {
            primary,
            primary_log,
            secondary: ReplicaState::secondary(ReplicaId(2), config, 0),
            secondary_log: MessageLog::new(100),
        }
    }

    fn request_from(p: &Pair, from: u64, now: Millis) -> ReplicationRequest {
        build_request(&p.primary, &p.primary_log, ReplicaId(2), Lsn(from), now).unwrap()
    }

    #[test]
    fn test_apply_batch_advances_target() {
        let mut p = pair(3);
        let request = request_from(&p, 1, 10);

        let lsn = apply_replication(&mut p.secondary, &mut p.secondary_log, &request, 20).unwrap();

        assert_eq!(lsn, Lsn(3));
        assert_eq!(p.secondary.last_applied_lsn(), Lsn(3));
        assert_eq!(p.secondary_log.tail_hash(), p.primary_log.tail_hash());
        assert_eq!(p.secondary.last_heartbeat(), 20);
    }

    #[test]
    fn test_committed_follows_source_watermark() {
        let mut p = pair(3);
        p.primary.set_last_committed(Lsn(2));
        let request = request_from(&p, 1, 0);

        apply_replication(&mut p.secondary, &mut p.secondary_log, &request, 0).unwrap();
        assert_eq!(p.secondary.last_committed_lsn(), Lsn(2));
        assert_eq!(p.secondary_log.committed_lsn(), Lsn(2));
    }

    #[test]
    fn test_empty_request_acknowledges_position() {
        let mut p = pair(0);
        let request = request_from(&p, 1, 0);
        assert!(request.is_empty());

        let lsn = apply_replication(&mut p.secondary, &mut p.secondary_log, &request, 0).unwrap();
        assert_eq!(lsn, Lsn::ZERO);
    }

    #[test]
    fn test_epoch_mismatch_rejected() {
        let mut p = pair(2);
        let mut request = request_from(&p, 1, 0);
        request.epoch = Epoch(7);

        let err = apply_replication(&mut p.secondary, &mut p.secondary_log, &request, 0).unwrap_err();
        assert!(matches!(err, ReplicationError::EpochMismatch { .. }));
        assert!(p.secondary_log.is_empty());
    }

    #[test]
    fn test_gap_rejected_not_buffered() {
        let mut p = pair(5);
        let request = request_from(&p, 3, 0);

        let err = apply_replication(&mut p.secondary, &mut p.secondary_log, &request, 0).unwrap_err();
        assert_eq!(err, ReplicationError::LsnGap { expected: Lsn(1), received: Lsn(3) });
        assert_eq!(p.secondary.last_applied_lsn(), Lsn::ZERO);
        assert!(p.secondary_log.is_empty());
    }

    #[test]
    fn test_duplicate_delivery_is_idempotent() {
        let mut p = pair(3);
        let request = request_from(&p, 1, 0);
        apply_replication(&mut p.secondary, &mut p.secondary_log, &request, 0).unwrap();

        let again = apply_replication(&mut p.secondary, &mut p.secondary_log, &request, 0).unwrap();
        assert_eq!(again, Lsn(3));
        assert_eq!(p.secondary_log.len(), 3);
    }

    #[test]
    fn test_overlapping_batch_applies_new_suffix() {
        let mut p = pair(4);
        let first = ReplicationRequest {
            entries: p.primary_log.entries_from(Lsn(1)).take(2).cloned().collect(),
            ..request_from(&p, 1, 0)
        };
        apply_replication(&mut p.secondary, &mut p.secondary_log, &first, 0).unwrap();

        let overlapping = request_from(&p, 1, 0);
        let lsn = apply_replication(&mut p.secondary, &mut p.secondary_log, &overlapping, 0).unwrap();
        assert_eq!(lsn, Lsn(4));
        assert!(p.secondary_log.verify_chain().is_ok());
    }

    #[test]
    fn test_divergent_duplicate_is_integrity_failure() {
        let mut p = pair(2);
        let request = request_from(&p, 1, 0);
        apply_replication(&mut p.secondary, &mut p.secondary_log, &request, 0).unwrap();

        let mut forged = request.clone();
        forged.entries[0].payload.data = b"other history".to_vec();
        forged.entries[0].entry_hash = forged.entries[0].recompute_hash();

        let err = apply_replication(&mut p.secondary, &mut p.secondary_log, &forged, 0).unwrap_err();
        assert!(err.requires_operator());
    }

    #[test]
    fn test_tampered_batch_leaves_target_untouched() {
        let mut p = pair(3);
        let mut request = request_from(&p, 1, 0);
        request.entries[2].payload.data = b"tampered".to_vec();

        let err = apply_replication(&mut p.secondary, &mut p.secondary_log, &request, 0).unwrap_err();
        assert!(matches!(err, ReplicationError::IntegrityCheckFailed { lsn: Lsn(3), .. }));
        assert!(p.secondary_log.is_empty());
        assert_eq!(p.secondary.last_applied_lsn(), Lsn::ZERO);
    }

    #[test]
    fn test_primary_target_rejected() {
        let mut p = pair(1);
        let mut request = request_from(&p, 1, 0);
        request.target = ReplicaId(1);
        let err = apply_replication(&mut p.primary, &mut p.primary_log, &request, 0).unwrap_err();
        assert!(matches!(err, ReplicationError::InvalidReplicaState { .. }));
    }

    #[test]
    fn test_stale_request_times_out() {
        let mut p = pair(1);
        let request = request_from(&p, 1, 0);
        let now = p.secondary.config().replication_timeout_ms + 1;

        let err = apply_replication(&mut p.secondary, &mut p.secondary_log, &request, now).unwrap_err();
        assert!(matches!(err, ReplicationError::ReplicationTimeout { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_response_wire_form() {
        let ok: ReplicationResult<Lsn> = Ok(Lsn(4));
        assert_eq!(ReplicationResponse::from(&ok), ReplicationResponse::Ok { last_applied_lsn: Lsn(4) });

        let failed: ReplicationResult<Lsn> = Err(ReplicationError::LsnGap { expected: Lsn(1), received: Lsn(2) });
        assert!(!ReplicationResponse::from(&failed).is_ok());
    }
}
