//! Hub-wide counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, shared by the registry and the server
#[derive(Debug, Default)]
pub struct HubMetrics {
    users_joined: AtomicU64,
    rooms_created: AtomicU64,
    rooms_removed: AtomicU64,
    sessions_created: AtomicU64,
    sessions_closed: AtomicU64,
    connections_total: AtomicU64,
    connections_active: AtomicU64,
    events_dispatched: AtomicU64,
    events_failed: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_joined(&self) {
        self.users_joined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn room_created(&self) {
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn room_removed(&self) {
        self.rooms_removed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_opened(&self) {
        self.connections_total.fetch_add(1, Ordering::Relaxed);
        self.connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.connections_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Count one dispatched event and whether it failed
    pub fn event_dispatched(&self, failed: bool) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.events_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> HubStats {
        HubStats {
            users_joined: self.users_joined.load(Ordering::Relaxed),
            rooms_created: self.rooms_created.load(Ordering::Relaxed),
            rooms_removed: self.rooms_removed.load(Ordering::Relaxed),
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            connections_total: self.connections_total.load(Ordering::Relaxed),
            connections_active: self.connections_active.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            events_failed: self.events_failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of hub counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Successful joins, creators included
    pub users_joined: u64,
    pub rooms_created: u64,
    pub rooms_removed: u64,
    pub sessions_created: u64,
    pub sessions_closed: u64,
    /// Connections ever accepted
    pub connections_total: u64,
    pub connections_active: u64,
    pub events_dispatched: u64,
    pub events_failed: u64,
}

impl HubStats {
    /// Rooms currently alive
    pub fn active_rooms(&self) -> u64 {
        self.rooms_created.saturating_sub(self.rooms_removed)
    }

    /// Sessions currently open
    pub fn active_sessions(&self) -> u64 {
        self.sessions_created.saturating_sub(self.sessions_closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hub_stats_new() {
        let stats = HubMetrics::new().snapshot();
        assert_eq!(stats, HubStats::default());
        assert_eq!(stats.active_rooms(), 0);
    }

    #[test]
    fn test_counters() {
        let metrics = HubMetrics::new();

        metrics.room_created();
        metrics.room_created();
        metrics.room_removed();
        metrics.user_joined();
        metrics.session_created();
        metrics.connection_opened();
        metrics.connection_opened();
        metrics.connection_closed();
        metrics.event_dispatched(false);
        metrics.event_dispatched(true);

        let stats = metrics.snapshot();
        assert_eq!(stats.active_rooms(), 1);
        assert_eq!(stats.users_joined, 1);
        assert_eq!(stats.active_sessions(), 1);
        assert_eq!(stats.connections_total, 2);
        assert_eq!(stats.connections_active, 1);
        assert_eq!(stats.events_dispatched, 2);
        assert_eq!(stats.events_failed, 1);
    }
}
