use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref VENDOR_CALLS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "gateway_vendor_calls_total",
        "Total HTTP calls issued to the vendor API"
    ))
    .unwrap();
    pub static ref VENDOR_REJECTIONS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "gateway_vendor_rejections_total",
        "Vendor envelopes with a non-zero result"
    ))
    .unwrap();
    pub static ref VENDOR_TRANSPORT_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "gateway_vendor_transport_failures_total",
        "Vendor calls that failed at the HTTP transport"
    ))
    .unwrap();
    pub static ref VENDOR_LOGINS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "gateway_vendor_logins_total",
        "Login calls issued to the vendor"
    ))
    .unwrap();
    pub static ref SYNC_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "gateway_sync_latency_seconds",
            "Time taken by one sync operation end to end"
        )
        .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    )
    .unwrap();
    pub static ref DEVICES_UPSERTED: Gauge = Gauge::with_opts(Opts::new(
        "gateway_devices_upserted",
        "Devices touched by the most recent vehicle sync"
    ))
    .unwrap();
    pub static ref POLLS_SKIPPED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "gateway_polls_skipped_total",
        "Poll ticks skipped because the previous poll was still running"
    ))
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY.register(Box::new(VENDOR_CALLS_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(VENDOR_REJECTIONS_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(VENDOR_TRANSPORT_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(VENDOR_LOGINS_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(SYNC_LATENCY_SECONDS.clone()))
        .unwrap();
    REGISTRY.register(Box::new(DEVICES_UPSERTED.clone())).unwrap();
    REGISTRY
        .register(Box::new(POLLS_SKIPPED_TOTAL.clone()))
        .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_ok() {
        String::from_utf8(buffer).unwrap_or_default()
    } else {
        String::new()
    }
}
