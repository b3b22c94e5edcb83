//! Time-range split planner.
//!
//! A table scan covers one global time interval. The planner partitions that
//! interval into per-node sub-ranges so each scan target handles one
//! contiguous slice of time. Open-ended intervals are closed with two
//! configured sentinels: `db_min_timestamp` below and an artificial maximum
//! above, each getting its own extra split so no row outside the sentinels is
//! missed.
//!
//! Architecture role:
//! - consumes the global `TimeBoundaries` extracted from the predicate;
//! - produces one `TimeBoundaries` per split, handed to the host engine's
//!   split-distribution layer as `ScanSplit` assignments;
//! - pure per call, no state beyond the configured sentinels.

use std::fmt;

use serde::{Deserialize, Serialize};
use varve_common::{Result, ScanConfig, VarveError};

/// One sub-range of the split plan. `None` start means "from the absolute
/// minimum"; `None` end means "to the absolute maximum".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBoundaries {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl TimeBoundaries {
    pub fn of(start: Option<u64>, end: Option<u64>) -> Self {
        Self { start, end }
    }

    fn closed(start: u64, end: u64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Inclusive unsigned endpoints with the open sides pinned to the
    /// absolute extremes.
    pub fn effective(&self) -> (u64, u64) {
        (self.start.unwrap_or(0), self.end.unwrap_or(u64::MAX))
    }
}

impl fmt::Display for TimeBoundaries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(start) => write!(f, "[{start}, ")?,
            None => write!(f, "[-, ")?,
        }
        match self.end {
            Some(end) => write!(f, "{end}]"),
            None => write!(f, "-]"),
        }
    }
}

/// One split assignment for the distribution layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSplit {
    /// Channel address of the scan-engine node serving this split.
    pub address: String,
    pub boundaries: TimeBoundaries,
}

/// Partitions one global time interval into per-target sub-ranges.
#[derive(Debug, Clone)]
pub struct SplitPlanner {
    number_of_splits: usize,
    db_min_timestamp: u64,
    artificial_max_timestamp: u64,
}

impl SplitPlanner {
    pub fn new(
        number_of_splits: usize,
        db_min_timestamp: u64,
        artificial_max_timestamp: u64,
    ) -> Self {
        Self {
            number_of_splits,
            db_min_timestamp,
            artificial_max_timestamp,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(
            config.number_of_splits,
            config.db_min_timestamp,
            config.artificial_max_timestamp(),
        )
    }

    /// Divides `requested` into sub-ranges, one per split.
    ///
    /// A closed interval yields exactly `number_of_splits` equal sub-ranges,
    /// the last one absorbing the integer-division remainder. An absent start
    /// prepends one extra range `[0, db_min_timestamp)`; an absent end
    /// appends the sentinel range `[artificial_max, u64::MAX]`, which is
    /// placed ahead of the equal sub-ranges in the result. The result order
    /// is therefore: prepended range, sentinel range, then the equal
    /// sub-ranges ascending.
    ///
    /// # Errors
    /// [`VarveError::InvalidConfig`] for a zero split count and
    /// [`VarveError::Domain`] for an inverted interval.
    pub fn plan(&self, requested: &TimeBoundaries) -> Result<Vec<TimeBoundaries>> {
        if self.number_of_splits == 0 {
            return Err(VarveError::InvalidConfig(
                "split count must be at least 1".to_string(),
            ));
        }

        let min_ts = requested.start.unwrap_or(self.db_min_timestamp);
        let max_ts = requested.end.unwrap_or(self.artificial_max_timestamp);
        if max_ts < min_ts {
            return Err(VarveError::Domain(format!(
                "inverted time interval: start {min_ts} exceeds end {max_ts}"
            )));
        }

        let mut plan =
            Vec::with_capacity(self.number_of_splits + 2);
        if requested.start.is_none() {
            plan.push(TimeBoundaries::closed(0, self.db_min_timestamp));
        }
        if requested.end.is_none() {
            plan.push(TimeBoundaries::closed(self.artificial_max_timestamp, u64::MAX));
        }

        let step = (max_ts - min_ts) / self.number_of_splits as u64;
        let mut cursor = min_ts;
        for split in 0..self.number_of_splits {
            let end = if split + 1 == self.number_of_splits {
                // Last range absorbs the division remainder.
                max_ts
            } else {
                cursor + step
            };
            plan.push(TimeBoundaries::closed(cursor, end));
            cursor = end;
        }

        Ok(plan)
    }
}
