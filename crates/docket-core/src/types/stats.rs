//! Aggregate statistics for one process server.

use serde::{Deserialize, Serialize};

use crate::types::notice::{CanonicalNotice, Provenance};

/// Counts derived from one server's notice set, cached per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStats {
    pub total_served: usize,
    pub acknowledged: usize,
    pub pending: usize,
    /// Which source these counts were computed from.
    pub source: Provenance,
    /// True when the counts come from (or were confirmed by) a blockchain pass.
    pub verified: bool,
    /// When the counts were computed, epoch milliseconds.
    pub timestamp_ms: i64,
}

impl ServerStats {
    /// Compute stats over a server's notice set.
    pub fn from_notices(
        notices: &[CanonicalNotice],
        source: Provenance,
        verified: bool,
        timestamp_ms: i64,
    ) -> Self {
        let acknowledged = notices.iter().filter(|n| n.acknowledged).count();
        Self {
            total_served: notices.len(),
            acknowledged,
            pending: notices.len() - acknowledged,
            source,
            verified,
            timestamp_ms,
        }
    }
}
