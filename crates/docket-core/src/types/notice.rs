//! Canonical notice record, the unit of reconciliation.
//!
//! Both data sources (REST backend, on-chain contract) produce records in
//! their own shapes; the readers in `docket-sync` normalize everything into
//! [`CanonicalNotice`] before any merging happens. The reconciliation engine
//! only ever sees this one shape.

use serde::{Deserialize, Serialize};

/// Recipient-facing lifecycle of a notice, derived from `acknowledged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeStatus {
    Pending,
    Acknowledged,
}

impl NoticeStatus {
    pub fn from_acknowledged(acknowledged: bool) -> Self {
        if acknowledged {
            NoticeStatus::Acknowledged
        } else {
            NoticeStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeStatus::Pending => "pending",
            NoticeStatus::Acknowledged => "acknowledged",
        }
    }
}

/// Which source produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Fast, possibly-stale REST backend.
    Backend,
    /// Authoritative on-chain contract.
    Blockchain,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Backend => "backend",
            Provenance::Blockchain => "blockchain",
        }
    }
}

/// A legal notice normalized from either source.
///
/// `notice_id` is derived from the alert token id (or the document token id
/// when no alert exists) and is unique within one server's result set.
///
/// Invariants maintained by the readers and the reconciliation engine:
/// - `provenance == Blockchain` implies `last_verified_ms` is set.
/// - `status` always agrees with `acknowledged` (use [`set_acknowledged`]).
///
/// [`set_acknowledged`]: CanonicalNotice::set_acknowledged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalNotice {
    pub notice_id: String,
    pub alert_id: Option<String>,
    pub document_id: Option<String>,
    pub recipient: String,
    pub server_address: String,
    /// Creation time, epoch milliseconds.
    pub timestamp_ms: i64,
    pub case_number: String,
    pub notice_type: String,
    pub acknowledged: bool,
    pub status: NoticeStatus,
    pub provenance: Provenance,
    /// When the blockchain last confirmed this record; `None` means
    /// "never confirmed this session".
    pub last_verified_ms: Option<i64>,
    /// True once a blockchain pass has confirmed this record.
    pub verified: bool,
}

impl CanonicalNotice {
    /// Update the acknowledgment flag, keeping `status` in sync.
    pub fn set_acknowledged(&mut self, acknowledged: bool) {
        self.acknowledged = acknowledged;
        self.status = NoticeStatus::from_acknowledged(acknowledged);
    }
}
