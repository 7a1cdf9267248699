//! Reconciliation engine: merge backend records with blockchain records.
//!
//! The backend is a cache; the chain is the source of truth. Reconciliation
//! annotates the backend list in place: a record confirmed on chain becomes
//! `verified`, and on any acknowledgment disagreement the chain's value
//! overwrites the backend's. A record with no on-chain counterpart is merely
//! "not confirmed this pass", not asserted to be wrong.

use std::collections::HashMap;

use crate::types::notice::CanonicalNotice;

/// Annotate `backend` against `blockchain`, keyed by `notice_id`.
///
/// Mutates the backend records in place; callers get the same collection
/// back, only payloads change. Idempotent: reconciling the same pair twice
/// yields the same `acknowledged`/`verified` values.
pub fn reconcile(backend: &mut [CanonicalNotice], blockchain: &[CanonicalNotice]) {
    // O(n) index build, O(1) lookup per backend record.
    let by_id: HashMap<&str, &CanonicalNotice> = blockchain
        .iter()
        .map(|n| (n.notice_id.as_str(), n))
        .collect();

    for notice in backend.iter_mut() {
        match by_id.get(notice.notice_id.as_str()) {
            Some(chain) => {
                if notice.acknowledged != chain.acknowledged {
                    // Chain wins ties.
                    notice.set_acknowledged(chain.acknowledged);
                }
                notice.verified = true;
                notice.last_verified_ms = chain.last_verified_ms;
            }
            None => {
                notice.verified = false;
            }
        }
    }
}
