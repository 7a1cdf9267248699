//! Background verification scheduler.
//!
//! A single worker drains a queue of verification jobs. Serializing the
//! work keeps at most one contract scan in flight, which is what public
//! node rate limits tolerate, and the inter-job delay spaces scans out
//! further. Callers observe completed verifications through a broadcast
//! channel instead of mutating shared state behind the caller's back.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use docket_core::{reconcile, CanonicalNotice, SessionCache};

use crate::chain::{fetch_from_blockchain, NoticeChain};
use crate::config::SyncConfig;
use crate::now_ms;

/// One queued verification request.
struct VerificationJob {
    server_address: String,
    /// The backend snapshot handed out to the caller, reconciled against
    /// the chain scan when the job runs.
    backend_notices: Vec<CanonicalNotice>,
    enqueued_at: Instant,
}

/// Published when a background verification completes.
#[derive(Debug, Clone)]
pub struct VerificationEvent {
    pub server_address: String,
    /// The verified notice set: the reconciled backend snapshot, or the
    /// raw chain scan when the backend had returned nothing.
    pub notices: Vec<CanonicalNotice>,
}

/// Handle to the background verification worker.
pub struct VerificationScheduler {
    jobs: mpsc::UnboundedSender<VerificationJob>,
    events: broadcast::Sender<VerificationEvent>,
    cancel: CancellationToken,
    worker: JoinHandle<()>,
}

impl VerificationScheduler {
    /// Spawn the worker task.
    pub fn spawn(
        chain: Arc<dyn NoticeChain>,
        cache: Arc<Mutex<SessionCache>>,
        config: SyncConfig,
    ) -> Self {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(16);
        let cancel = CancellationToken::new();

        let worker = tokio::spawn(run_worker(
            chain,
            cache,
            config,
            jobs_rx,
            events_tx.clone(),
            cancel.clone(),
        ));

        Self {
            jobs: jobs_tx,
            events: events_tx,
            cancel,
            worker,
        }
    }

    /// Queue a verification for `server_address`. Fire and forget: jobs
    /// are not deduplicated, so queuing the same address twice runs two
    /// scans and publishes two events.
    pub fn queue_verification(&self, server_address: &str, backend_notices: Vec<CanonicalNotice>) {
        let job = VerificationJob {
            server_address: server_address.to_string(),
            backend_notices,
            enqueued_at: Instant::now(),
        };
        if self.jobs.send(job).is_err() {
            warn!(server = server_address, "verification queue is closed, dropping job");
        }
    }

    /// Subscribe to completed verifications. Slow subscribers may miss
    /// events; each event is self-contained so a missed one is only a
    /// missed refresh.
    pub fn subscribe(&self) -> broadcast::Receiver<VerificationEvent> {
        self.events.subscribe()
    }

    /// Stop the worker and wait for it to finish its current job.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if self.worker.await.is_err() {
            warn!("verification worker panicked during shutdown");
        }
    }
}

async fn run_worker(
    chain: Arc<dyn NoticeChain>,
    cache: Arc<Mutex<SessionCache>>,
    config: SyncConfig,
    mut jobs: mpsc::UnboundedReceiver<VerificationJob>,
    events: broadcast::Sender<VerificationEvent>,
    cancel: CancellationToken,
) {
    info!("verification worker started");
    loop {
        let job = tokio::select! {
            _ = cancel.cancelled() => break,
            job = jobs.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        debug!(
            server = %job.server_address,
            queued_ms = job.enqueued_at.elapsed().as_millis() as u64,
            "running verification job"
        );
        run_job(chain.as_ref(), &cache, &config, &events, job).await;

        // Space scans out; abandon the wait on shutdown.
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.inter_job_delay) => {}
        }
    }
    info!("verification worker stopped");
}

async fn run_job(
    chain: &dyn NoticeChain,
    cache: &Mutex<SessionCache>,
    config: &SyncConfig,
    events: &broadcast::Sender<VerificationEvent>,
    job: VerificationJob,
) {
    let chain_notices = fetch_from_blockchain(chain, &job.server_address, config).await;

    let mut backend_notices = job.backend_notices;
    reconcile(&mut backend_notices, &chain_notices);

    // The scan ran without holding the lock; only the bookkeeping does.
    {
        let mut cache = cache.lock().await;
        cache.record_blockchain_pass(&job.server_address, &chain_notices, now_ms());
    }

    let notices = if backend_notices.is_empty() {
        chain_notices
    } else {
        backend_notices
    };
    info!(
        server = %job.server_address,
        count = notices.len(),
        "verification complete"
    );

    // No subscribers is fine; the cache already holds the outcome.
    let _ = events.send(VerificationEvent {
        server_address: job.server_address,
        notices,
    });
}
