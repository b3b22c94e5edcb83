use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Client-side configuration for talking to the scan engine.
///
/// `db_min_timestamp` and the artificial max timestamp are the two sentinels
/// the split planner falls back to when a query leaves the time range open
/// on one side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Scan-engine channel address, `tcp://host:port` or `ipc:///path`.
    pub engine_url: String,
    /// How many parallel sub-scans one table scan is divided into.
    pub number_of_splits: usize,
    /// Lowest timestamp actually present in the database, used when a query
    /// gives no lower time constraint. 0 when unknown.
    pub db_min_timestamp: u64,
    /// How far past "now" the artificial max timestamp is placed when a query
    /// gives no upper time constraint, in microseconds.
    pub artificial_max_horizon_micros: u64,
    /// Channel send timeout.
    pub send_timeout: Duration,
    /// Channel receive timeout.
    pub recv_timeout: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            engine_url: "tcp://localhost:4433".to_string(),
            number_of_splits: 5,
            db_min_timestamp: 0,
            artificial_max_horizon_micros: 10 * 60 * 1_000_000,
            send_timeout: Duration::from_secs(60),
            recv_timeout: Duration::from_secs(60),
        }
    }
}

impl ScanConfig {
    /// Engine-chosen ceiling used in place of an unbounded scan end.
    ///
    /// Deliberately below the true unsigned maximum so the open-ended
    /// remainder can be scanned as one extra sentinel split.
    pub fn artificial_max_timestamp(&self) -> u64 {
        let now_micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        now_micros.saturating_add(self.artificial_max_horizon_micros)
    }
}

#[cfg(test)]
mod tests {
    use super::ScanConfig;

    #[test]
    fn artificial_max_is_ahead_of_now_and_below_unsigned_max() {
        let cfg = ScanConfig::default();
        let art_max = cfg.artificial_max_timestamp();
        assert!(art_max > cfg.db_min_timestamp);
        assert!(art_max < u64::MAX);
    }
}
