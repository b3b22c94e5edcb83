use std::sync::{Arc, OnceLock};

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

/// Scan-side metrics shared by sessions.
///
/// Cheap to clone; all clones feed the same underlying registry.
#[derive(Clone, Debug)]
pub struct MetricsRegistry {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    registry: Registry,
    scan_requests: CounterVec,
    scan_rows: CounterVec,
    scan_bytes: CounterVec,
    scan_seconds: HistogramVec,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner::new()),
        }
    }

    pub fn record_scan(&self, target: &str, rows: u64, bytes: u64, secs: f64) {
        let labels = [target];
        self.inner.scan_requests.with_label_values(&labels).inc();
        self.inner
            .scan_rows
            .with_label_values(&labels)
            .inc_by(rows as f64);
        self.inner
            .scan_bytes
            .with_label_values(&labels)
            .inc_by(bytes as f64);
        self.inner
            .scan_seconds
            .with_label_values(&labels)
            .observe(secs.max(0.0));
    }

    pub fn render_prometheus(&self) -> String {
        let metric_families = self.inner.registry.gather();
        let mut out = Vec::new();
        let enc = TextEncoder::new();
        if enc.encode(&metric_families, &mut out).is_err() {
            return String::new();
        }
        String::from_utf8_lossy(&out).to_string()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsInner {
    fn new() -> Self {
        let registry = Registry::new();

        let scan_requests = counter_vec(
            &registry,
            "varve_scan_requests_total",
            "Scan requests sent to the engine",
            &["target"],
        );
        let scan_rows = counter_vec(
            &registry,
            "varve_scan_rows_total",
            "Rows decoded from scan replies",
            &["target"],
        );
        let scan_bytes = counter_vec(
            &registry,
            "varve_scan_bytes_total",
            "Reply bytes received from the engine",
            &["target"],
        );
        let scan_seconds = histogram_vec(
            &registry,
            "varve_scan_seconds",
            "Scan round-trip plus decode time",
            &["target"],
        );

        Self {
            registry,
            scan_requests,
            scan_rows,
            scan_bytes,
            scan_seconds,
        }
    }
}

fn counter_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let c = CounterVec::new(Opts::new(name, help), labels).expect("counter vec");
    registry
        .register(Box::new(c.clone()))
        .expect("register counter");
    c
}

fn histogram_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> HistogramVec {
    let h = HistogramVec::new(HistogramOpts::new(name, help), labels).expect("histogram vec");
    registry
        .register(Box::new(h.clone()))
        .expect("register histogram");
    h
}

static GLOBAL_METRICS: OnceLock<MetricsRegistry> = OnceLock::new();

pub fn global_metrics() -> &'static MetricsRegistry {
    GLOBAL_METRICS.get_or_init(MetricsRegistry::new)
}
