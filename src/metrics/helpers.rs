//! Metrics helper structs for convenient metric recording

use std::time::Duration;

use prometheus::{Encoder, TextEncoder};

use super::{
    CONTENT_VALIDATION_FAILURES_TOTAL, LOCALES_TOTAL, RENDERS_TOTAL, RENDER_DURATION,
    RENDER_MARKERS_TOTAL, TEMPLATES_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording render metrics
pub struct RenderMetrics;

impl RenderMetrics {
    /// Record a completed top-level render
    pub fn record_render(channel: &str, elapsed: Duration) {
        RENDERS_TOTAL.with_label_values(&[channel]).inc();
        RENDER_DURATION
            .with_label_values(&[channel])
            .observe(elapsed.as_secs_f64());
    }

    /// Record an inline marker written into output
    pub fn record_marker(kind: &str) {
        RENDER_MARKERS_TOTAL.with_label_values(&[kind]).inc();
    }
}

/// Helper struct for recording validation metrics
pub struct ValidationMetrics;

impl ValidationMetrics {
    /// Record a content write rejected by validation
    pub fn record_rejected() {
        CONTENT_VALIDATION_FAILURES_TOTAL.inc();
    }
}

/// Helper struct for store gauges
pub struct StoreMetrics;

impl StoreMetrics {
    /// Update the template and locale gauges
    pub fn update_counts(templates: usize, locales: usize) {
        TEMPLATES_TOTAL.set(templates as i64);
        LOCALES_TOTAL.set(locales as i64);
    }
}
