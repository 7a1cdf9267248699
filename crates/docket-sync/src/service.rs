//! Hybrid orchestration.
//!
//! Return fast, verify slow: the backend answer goes to the caller
//! immediately, marked unverified, while a background blockchain pass
//! reconciles it and publishes the corrected set as an event. When the
//! backend is down the service falls back to scanning the chain inline,
//! which is slower but authoritative.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use docket_core::{CanonicalNotice, Provenance, ServerStats, SessionCache};

use crate::backend::{fetch_from_backend, NoticeBackend};
use crate::chain::{fetch_from_blockchain, NoticeChain};
use crate::config::SyncConfig;
use crate::now_ms;
use crate::scheduler::{VerificationEvent, VerificationScheduler};

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Both sources came up empty and nothing was cached from an earlier
    /// pass. Distinguishes "no notices exist" from "sources unreachable".
    #[error("no notice data available for server {server_address}")]
    NoData { server_address: String },
}

/// The answer handed back to a caller.
#[derive(Debug, Clone)]
pub struct HybridFetch {
    pub notices: Vec<CanonicalNotice>,
    /// Which source produced this answer.
    pub source: Provenance,
    /// True when a blockchain pass already confirmed this server's data
    /// during this process lifetime.
    pub verified: bool,
}

/// Front door of the sync layer.
///
/// Owns the session cache and the background scheduler. Constructed once
/// per process and shared.
pub struct HybridNoticeService {
    backend: Arc<dyn NoticeBackend>,
    chain: Arc<dyn NoticeChain>,
    cache: Arc<Mutex<SessionCache>>,
    scheduler: VerificationScheduler,
    config: SyncConfig,
}

impl HybridNoticeService {
    pub fn new(
        backend: Arc<dyn NoticeBackend>,
        chain: Arc<dyn NoticeChain>,
        config: SyncConfig,
    ) -> Self {
        let cache = Arc::new(Mutex::new(SessionCache::new()));
        let scheduler =
            VerificationScheduler::spawn(chain.clone(), cache.clone(), config.clone());
        Self {
            backend,
            chain,
            cache,
            scheduler,
            config,
        }
    }

    /// Fetch notices for one server.
    ///
    /// Backend path: answer immediately and, unless this session already
    /// completed a blockchain pass for the address, queue a background
    /// verification. Blockchain path (backend unavailable or empty, or
    /// `force_blockchain`): scan inline and answer with authoritative
    /// data.
    pub async fn fetch_notices_hybrid(
        &self,
        server_address: &str,
        force_blockchain: bool,
    ) -> Result<HybridFetch, ServiceError> {
        let backend_notices = if force_blockchain {
            None
        } else {
            fetch_from_backend(self.backend.as_ref(), server_address)
                .await
                .filter(|notices| !notices.is_empty())
        };

        if let Some(notices) = backend_notices {
            let verified = {
                let mut cache = self.cache.lock().await;
                let verified = cache.has_verified_blockchain(server_address);
                let stats =
                    ServerStats::from_notices(&notices, Provenance::Backend, verified, now_ms());
                cache.cache_server_stats(server_address, stats);
                verified
            };

            if !verified {
                debug!(server = server_address, "queuing background verification");
                self.scheduler
                    .queue_verification(server_address, notices.clone());
            }

            return Ok(HybridFetch {
                notices,
                source: Provenance::Backend,
                verified,
            });
        }

        info!(server = server_address, "scanning chain inline");
        let notices = fetch_from_blockchain(self.chain.as_ref(), server_address, &self.config).await;

        let mut cache = self.cache.lock().await;
        if notices.is_empty() && cache.server_stats(server_address).is_none() {
            return Err(ServiceError::NoData {
                server_address: server_address.to_string(),
            });
        }
        cache.record_blockchain_pass(server_address, &notices, now_ms());

        Ok(HybridFetch {
            notices,
            source: Provenance::Blockchain,
            verified: true,
        })
    }

    /// Last cached stats for a server, if any source has answered yet.
    pub async fn server_stats(&self, server_address: &str) -> Option<ServerStats> {
        self.cache.lock().await.server_stats(server_address).cloned()
    }

    /// Subscribe to background verification results.
    pub fn subscribe(&self) -> broadcast::Receiver<VerificationEvent> {
        self.scheduler.subscribe()
    }

    /// Stop the background worker and wait for it.
    pub async fn shutdown(self) {
        self.scheduler.shutdown().await;
    }
}
