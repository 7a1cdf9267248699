//! In-memory per-session cache of verified server data.
//!
//! The cache is a performance optimization, never a source of truth. Losing
//! it on restart only costs a re-verification pass. It is an explicit object
//! handed to the service that owns it, not ambient global state.

use std::collections::{HashMap, HashSet};

use crate::types::notice::{CanonicalNotice, Provenance};
use crate::types::stats::ServerStats;

/// Session-scoped cache keyed by server address.
///
/// Holds the last computed [`ServerStats`], a per-notice acknowledgment
/// snapshot, and the one-way "blockchain verified this session" flag.
#[derive(Debug, Default)]
pub struct SessionCache {
    /// server address -> last computed stats
    stats: HashMap<String, ServerStats>,
    /// server address -> (notice id -> acknowledged)
    ack_snapshot: HashMap<String, HashMap<String, bool>>,
    /// Addresses with at least one completed blockchain pass this process
    /// lifetime. One-way: entries are never removed.
    verified_sessions: HashSet<String>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store stats for a server address, replacing any previous entry.
    pub fn cache_server_stats(&mut self, server_address: &str, stats: ServerStats) {
        self.stats.insert(server_address.to_string(), stats);
    }

    /// Last cached stats for a server address, if any.
    pub fn server_stats(&self, server_address: &str) -> Option<&ServerStats> {
        self.stats.get(server_address)
    }

    /// Snapshot per-notice acknowledgment state for a server.
    pub fn cache_ack_snapshot(&mut self, server_address: &str, notices: &[CanonicalNotice]) {
        let snapshot = notices
            .iter()
            .map(|n| (n.notice_id.clone(), n.acknowledged))
            .collect();
        self.ack_snapshot
            .insert(server_address.to_string(), snapshot);
    }

    /// Last known acknowledgment state for one notice, if snapshotted.
    pub fn acknowledged(&self, server_address: &str, notice_id: &str) -> Option<bool> {
        self.ack_snapshot
            .get(server_address)
            .and_then(|m| m.get(notice_id))
            .copied()
    }

    /// True only after at least one completed blockchain pass for this
    /// address this process lifetime.
    pub fn has_verified_blockchain(&self, server_address: &str) -> bool {
        self.verified_sessions.contains(server_address)
    }

    /// Mark this address as blockchain-verified. One-way: never reset
    /// within the process.
    pub fn set_blockchain_verified(&mut self, server_address: &str) {
        self.verified_sessions.insert(server_address.to_string());
    }

    /// Record the outcome of a completed blockchain pass: cache stats and
    /// the acknowledgment snapshot, and flip the session-verified flag.
    pub fn record_blockchain_pass(
        &mut self,
        server_address: &str,
        notices: &[CanonicalNotice],
        now_ms: i64,
    ) {
        let stats = ServerStats::from_notices(notices, Provenance::Blockchain, true, now_ms);
        self.cache_server_stats(server_address, stats);
        self.cache_ack_snapshot(server_address, notices);
        self.set_blockchain_verified(server_address);
    }

    /// Number of cached entries (for diagnostics).
    pub fn size(&self) -> (usize, usize) {
        (self.stats.len(), self.ack_snapshot.len())
    }
}
