//! # Docket Sync
//!
//! Hybrid notice fetching over two sources of unequal trust.
//!
//! The REST backend answers in milliseconds but may lag or diverge from the
//! chain; the on-chain contract is authoritative but slow to scan. The
//! [`HybridNoticeService`] returns the fast answer immediately and schedules
//! a background blockchain pass that reconciles and re-publishes the
//! verified result as a [`VerificationEvent`].
//!
//! ## Layout
//!
//! - [`backend`]: REST reader, tolerant of several historical field namings.
//! - [`chain`]: the [`NoticeChain`] trait, the TronGrid implementation, and
//!   the sequential contract scan.
//! - [`scheduler`]: single-worker background verification queue.
//! - [`service`]: the hybrid orchestration tying it all together.
//!
//! All pure logic (types, reconciliation, the session cache) lives in
//! `docket-core`; this crate owns everything that touches a socket or a
//! clock.

pub mod backend;
pub mod chain;
pub mod config;
pub mod scheduler;
pub mod service;

pub use backend::{ApiNoticeRecord, BackendError, HttpNoticeBackend, NoticeBackend};
pub use chain::{fetch_from_blockchain, ChainError, ChainNoticeRecord, NoticeChain, TronGridChain};
pub use config::SyncConfig;
pub use scheduler::{VerificationEvent, VerificationScheduler};
pub use service::{HybridFetch, HybridNoticeService, ServiceError};

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
