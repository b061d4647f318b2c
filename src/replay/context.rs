//! Replay session bookkeeping
//!
//! A context covers `(start_lsn, target_lsn]`. It only ever moves forward
//! one LSN at a time; a rejected entry leaves it exactly as it was.

use serde::Serialize;

use super::errors::{ReplayError, ReplayResult};
use crate::ids::{Lsn, Millis};
use crate::log::LogEntry;

/// State of one replay session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayContext {
    pub start_lsn: Lsn,
    pub target_lsn: Lsn,
    pub current_lsn: Lsn,
    pub entries_replayed: u64,
    pub started_at: Millis,
    pub last_entry_timestamp: Millis,
}

impl ReplayContext {
    /// Begin a session positioned just after `start_lsn`.
    pub fn new(start_lsn: Lsn, target_lsn: Lsn, now: Millis) -> Self {
        Self {
            start_lsn,
            target_lsn,
            current_lsn: start_lsn,
            entries_replayed: 0,
            started_at: now,
            last_entry_timestamp: 0,
        }
    }

    /// Accept `entry` as the next step of the session.
    pub fn replay_entry(&mut self, entry: &LogEntry) -> ReplayResult<()> {
        let expected = self.current_lsn.next();
        if entry.lsn != expected {
            return Err(ReplayError::LsnDiscontinuity {
                expected,
                received: entry.lsn,
            });
        }
        if entry.lsn > self.target_lsn {
            return Err(ReplayError::BeyondTarget {
                lsn: entry.lsn,
                target: self.target_lsn,
            });
        }
        // Equal timestamps are fine for batched entries
        if entry.timestamp < self.last_entry_timestamp {
            return Err(ReplayError::TimestampRegression {
                lsn: entry.lsn,
                timestamp: entry.timestamp,
                previous: self.last_entry_timestamp,
            });
        }

        self.current_lsn = entry.lsn;
        self.entries_replayed += 1;
        self.last_entry_timestamp = entry.timestamp;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.current_lsn >= self.target_lsn
    }

    /// Integer percentage of the range covered.
    pub fn progress(&self) -> u8 {
        if self.target_lsn <= self.start_lsn {
            return 100;
        }
        let total = self.target_lsn.saturating_distance(self.start_lsn);
        let done = self.current_lsn.saturating_distance(self.start_lsn).min(total);
        (done * 100 / total) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::Epoch;
    use crate::log::{LogEntryType, MessageLog, Payload, Subsystem};

    fn log(timestamps: &[Millis]) -> MessageLog {
        let mut log = MessageLog::new(64);
        for &ts in timestamps {
            log.append(
                LogEntryType::StateMutation,
                Payload::new(Subsystem::Scheduler, ts.to_le_bytes().to_vec()),
                Epoch(1),
                ts,
            )
            .unwrap();
        }
        log
    }

    #[test]
    fn test_replays_in_order() {
        let log = log(&[10, 20, 30]);
        let mut ctx = ReplayContext::new(Lsn::ZERO, Lsn(3), 0);
        for entry in log.iter() {
            ctx.replay_entry(entry).unwrap();
        }
        assert!(ctx.is_complete());
        assert_eq!(ctx.entries_replayed, 3);
        assert_eq!(ctx.last_entry_timestamp, 30);
        assert_eq!(ctx.progress(), 100);
    }

    #[test]
    fn test_out_of_order_rejected_without_change() {
        let log = log(&[10, 20, 30, 40, 50]);
        let mut ctx = ReplayContext::new(Lsn(3), Lsn(5), 0);
        let before = ctx.clone();

        let err = ctx.replay_entry(log.entry(Lsn(5)).unwrap()).unwrap_err();
        assert_eq!(
            err,
            ReplayError::LsnDiscontinuity { expected: Lsn(4), received: Lsn(5) }
        );
        assert_eq!(ctx, before);
    }

    #[test]
    fn test_equal_timestamps_allowed() {
        let log = log(&[10, 10]);
        let mut ctx = ReplayContext::new(Lsn::ZERO, Lsn(2), 0);
        for entry in log.iter() {
            ctx.replay_entry(entry).unwrap();
        }
        assert_eq!(ctx.entries_replayed, 2);
    }

    #[test]
    fn test_timestamp_regression() {
        let log = log(&[50, 40]);
        let mut ctx = ReplayContext::new(Lsn::ZERO, Lsn(2), 0);
        ctx.replay_entry(log.entry(Lsn(1)).unwrap()).unwrap();
        assert!(matches!(
            ctx.replay_entry(log.entry(Lsn(2)).unwrap()),
            Err(ReplayError::TimestampRegression { timestamp: 40, previous: 50, .. })
        ));
        assert_eq!(ctx.current_lsn, Lsn(1));
    }

    #[test]
    fn test_beyond_target() {
        let log = log(&[1, 2]);
        let mut ctx = ReplayContext::new(Lsn::ZERO, Lsn(1), 0);
        ctx.replay_entry(log.entry(Lsn(1)).unwrap()).unwrap();
        assert!(matches!(
            ctx.replay_entry(log.entry(Lsn(2)).unwrap()),
            Err(ReplayError::BeyondTarget { .. })
        ));
    }

    #[test]
    fn test_progress() {
        let log = log(&[1, 2, 3, 4]);
        let mut ctx = ReplayContext::new(Lsn::ZERO, Lsn(4), 0);
        assert_eq!(ctx.progress(), 0);
        ctx.replay_entry(log.entry(Lsn(1)).unwrap()).unwrap();
        assert_eq!(ctx.progress(), 25);

        let empty = ReplayContext::new(Lsn(7), Lsn(7), 0);
        assert!(empty.is_complete());
        assert_eq!(empty.progress(), 100);
    }
}
