// Prometheus metrics for quota gateway monitoring
//
// Exposed on the /metrics HTTP endpoint:
// - Usage checks per tool (counter)
// - Quota denials per tool (counter)
// - Counter-store failures (counter)
// - Upstream provider failures per tool (counter)

use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

use crate::quota::key::Resource;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    pub static ref USAGE_CHECKS_TOTAL: CounterVec = CounterVec::new(
        prometheus::Opts::new("usage_checks_total", "Quota checks performed per tool"),
        &["tool"]
    ).expect("Failed to create usage checks metric");

    pub static ref QUOTA_DENIED_TOTAL: CounterVec = CounterVec::new(
        prometheus::Opts::new("quota_denied_total", "Requests denied for exhausted quota per tool"),
        &["tool"]
    ).expect("Failed to create quota denied metric");

    pub static ref STORE_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "store_failures_total",
        "Counter store operations that failed (requests denied fail-closed)"
    ).expect("Failed to create store failures metric");

    pub static ref UPSTREAM_FAILURES_TOTAL: CounterVec = CounterVec::new(
        prometheus::Opts::new("upstream_failures_total", "Upstream provider calls that failed per tool"),
        &["tool"]
    ).expect("Failed to create upstream failures metric");
}

/// Initialize the metrics registry - must be called once at startup
pub fn init() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(USAGE_CHECKS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUOTA_DENIED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STORE_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(UPSTREAM_FAILURES_TOTAL.clone()))?;
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}

pub fn record_usage_check(resource: Resource) {
    USAGE_CHECKS_TOTAL
        .with_label_values(&[resource.key_name()])
        .inc();
}

pub fn record_quota_denied(resource: Resource) {
    QUOTA_DENIED_TOTAL
        .with_label_values(&[resource.key_name()])
        .inc();
}

pub fn record_store_failure() {
    STORE_FAILURES_TOTAL.inc();
}

pub fn record_upstream_failure(resource: Resource) {
    UPSTREAM_FAILURES_TOTAL
        .with_label_values(&[resource.key_name()])
        .inc();
}
