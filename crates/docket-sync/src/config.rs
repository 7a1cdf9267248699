//! Tunables for the sync layer.

use std::time::Duration;

/// Configuration shared by the readers, the scheduler and the service.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// First notice id probed by the sequential contract scan.
    pub scan_start_id: u64,
    /// Hard ceiling on ids probed per scan, as protection against a
    /// contract that answers every id.
    pub max_scan_ids: u64,
    /// Pause between background verification jobs, to stay friendly to
    /// public node rate limits.
    pub inter_job_delay: Duration,
    /// Per-request timeout for both HTTP clients.
    pub request_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            scan_start_id: 1,
            max_scan_ids: 100,
            inter_job_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = SyncConfig::default();
        assert_eq!(config.scan_start_id, 1);
        assert_eq!(config.max_scan_ids, 100);
        assert!(config.inter_job_delay >= Duration::from_millis(1));
    }
}
