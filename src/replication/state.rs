//! Replica state
//!
//! Owned by exactly one execution context (the coordinator that built it).
//! Fields are read through accessors; changes go through the protocol
//! functions (replication, heartbeat, failover), which validate before
//! they mutate.

use serde::Serialize;

use super::config::ReplicaConfig;
use super::role::{ReplicaHealth, ReplicaRole};
use crate::ids::{Epoch, Lsn, Millis, ReplicaId};

/// Snapshot of one replica's protocol position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicaState {
    id: ReplicaId,
    role: ReplicaRole,
    last_applied_lsn: Lsn,
    last_committed_lsn: Lsn,
    health: ReplicaHealth,
    epoch: Epoch,
    last_heartbeat: Millis,
    config: ReplicaConfig,
}

impl ReplicaState {
    /// Fresh replica at the initial epoch with nothing applied.
    pub fn new(id: ReplicaId, role: ReplicaRole, config: ReplicaConfig, now: Millis) -> Self {
        Self {
            id,
            role,
            last_applied_lsn: Lsn::ZERO,
            last_committed_lsn: Lsn::ZERO,
            health: ReplicaHealth::Healthy,
            epoch: Epoch::INITIAL,
            last_heartbeat: now,
            config,
        }
    }

    pub fn primary(id: ReplicaId, config: ReplicaConfig, now: Millis) -> Self {
        Self::new(id, ReplicaRole::Primary, config, now)
    }

    pub fn secondary(id: ReplicaId, config: ReplicaConfig, now: Millis) -> Self {
        Self::new(id, ReplicaRole::Secondary, config, now)
    }

    pub fn id(&self) -> ReplicaId {
        self.id
    }

    pub fn role(&self) -> ReplicaRole {
        self.role
    }

    pub fn last_applied_lsn(&self) -> Lsn {
        self.last_applied_lsn
    }

    pub fn last_committed_lsn(&self) -> Lsn {
        self.last_committed_lsn
    }

    pub fn health(&self) -> &ReplicaHealth {
        &self.health
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Last time this replica heard from its peer.
    pub fn last_heartbeat(&self) -> Millis {
        self.last_heartbeat
    }

    pub fn config(&self) -> &ReplicaConfig {
        &self.config
    }

    pub fn is_primary(&self) -> bool {
        self.role == ReplicaRole::Primary
    }

    pub(crate) fn set_role(&mut self, role: ReplicaRole) {
        self.role = role;
    }

    pub(crate) fn set_health(&mut self, health: ReplicaHealth) {
        self.health = health;
    }

    pub(crate) fn set_epoch(&mut self, epoch: Epoch) {
        self.epoch = epoch;
    }

    pub(crate) fn set_last_applied(&mut self, lsn: Lsn) {
        self.last_applied_lsn = lsn;
    }

    /// Committed never runs ahead of applied.
    pub(crate) fn set_last_committed(&mut self, lsn: Lsn) {
        self.last_committed_lsn = lsn.min(self.last_applied_lsn);
    }

    pub(crate) fn touch_heartbeat(&mut self, now: Millis) {
        self.last_heartbeat = self.last_heartbeat.max(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_replica_starts_empty() {
        let state = ReplicaState::secondary(ReplicaId(2), ReplicaConfig::default(), 50);
        assert_eq!(state.role(), ReplicaRole::Secondary);
        assert_eq!(state.epoch(), Epoch(1));
        assert_eq!(state.last_applied_lsn(), Lsn::ZERO);
        assert_eq!(state.last_committed_lsn(), Lsn::ZERO);
        assert_eq!(state.last_heartbeat(), 50);
        assert!(state.health().is_healthy());
    }

    #[test]
    fn test_committed_capped_by_applied() {
        let mut state = ReplicaState::primary(ReplicaId(1), ReplicaConfig::default(), 0);
        state.set_last_applied(Lsn(3));
        state.set_last_committed(Lsn(10));
        assert_eq!(state.last_committed_lsn(), Lsn(3));
    }

    #[test]
    fn test_heartbeat_never_moves_backward() {
        let mut state = ReplicaState::primary(ReplicaId(1), ReplicaConfig::default(), 100);
        state.touch_heartbeat(50);
        assert_eq!(state.last_heartbeat(), 100);
        state.touch_heartbeat(200);
        assert_eq!(state.last_heartbeat(), 200);
    }
}
