//! One scan exchange end to end: encode, round trip, decode, account.

use std::time::Instant;

use tracing::debug;
use varve_common::{MetricsRegistry, Result};
use varve_protocol::wire::{decode_scan_reply, encode_scan_message};
use varve_protocol::{ScanRequest, ScanResultSlice};

use crate::transport::ReqChannel;

/// Drives scan requests over one owned channel.
///
/// One session serves one split: requests go out one at a time through
/// `&mut self`, matching the one-outstanding-request transport contract.
pub struct ScanSession<C: ReqChannel> {
    channel: C,
    metrics: MetricsRegistry,
    /// Label for logs and metrics, normally the engine node address.
    target: String,
}

impl<C: ReqChannel> ScanSession<C> {
    pub fn new(channel: C, target: impl Into<String>, metrics: MetricsRegistry) -> Self {
        Self {
            channel,
            metrics,
            target: target.into(),
        }
    }

    /// Executes one scan and decodes the reply into column slices.
    pub fn scan(&mut self, request: &ScanRequest) -> Result<ScanResultSlice> {
        let filter_count: usize = request.filters.groups().map(|g| g.len()).sum();
        debug!(
            target_node = %self.target,
            min_ts = request.min_ts,
            max_ts = request.max_ts,
            projection = request.projection.len(),
            filters = filter_count,
            operator = "ScanSession",
            "sending scan request"
        );

        let message = encode_scan_message(request)?;
        let started = Instant::now();
        let reply = self.channel.send(&message)?;
        let elapsed = started.elapsed();

        let slice = decode_scan_reply(&reply)?;
        let rows = slice
            .columns
            .values()
            .map(|c| c.element_count())
            .max()
            .unwrap_or(0);
        self.metrics.record_scan(
            &self.target,
            rows as u64,
            reply.len() as u64,
            elapsed.as_secs_f64(),
        );
        debug!(
            target_node = %self.target,
            rows,
            bytes = reply.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            operator = "ScanSession",
            "scan reply decoded"
        );
        Ok(slice)
    }

    pub fn into_channel(self) -> C {
        self.channel
    }
}
