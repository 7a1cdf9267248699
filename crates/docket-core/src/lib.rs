//! # Docket Core
//!
//! Pure Rust legal-notice reconciliation logic.
//!
//! This crate contains **no networking code** and **no async dependencies**.
//! It is the data heart of Docket: every notice record, whether it came
//! from the fast REST backend or the authoritative blockchain, passes
//! through these types before being shown to a caller.
//!
//! ## Trust Model
//!
//! - **Backend records** (`Provenance::Backend`) are fast but unverified:
//!   the backend is a cache that may lag or diverge from the chain.
//!
//! - **Blockchain records** (`Provenance::Blockchain`) are authoritative:
//!   when the two sources disagree about a notice, the chain wins
//!   (`reconcile` module). A backend record is only `verified` once a
//!   blockchain pass has confirmed it this session.
//!
//! ## Usage
//!
//! ```ignore
//! use docket_core::reconcile::reconcile;
//! use docket_core::cache::SessionCache;
//! use docket_core::types::notice::CanonicalNotice;
//! ```

pub mod address;
pub mod cache;
pub mod reconcile;
pub mod types;

// Re-export commonly used types for convenience
pub use address::{from_chain_bytes, to_chain_bytes, AddressError};
pub use cache::SessionCache;
pub use reconcile::reconcile;
pub use types::{
    notice::{CanonicalNotice, NoticeStatus, Provenance},
    stats::ServerStats,
};
