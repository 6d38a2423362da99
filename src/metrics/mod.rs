//! Prometheus metrics for the template service.
//!
//! - Render metrics (renders per channel, render latency)
//! - Inline marker metrics (markers emitted by kind)
//! - Content validation metrics
//! - Store gauges (templates, locales)

mod helpers;

pub use helpers::{encode_metrics, RenderMetrics, StoreMetrics, ValidationMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "ara_templates";

lazy_static! {
    // ============================================================================
    // Render Metrics
    // ============================================================================

    /// Total top-level renders by channel
    pub static ref RENDERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_renders_total", METRIC_PREFIX),
        "Total template renders",
        &["channel"]
    ).unwrap();

    /// Render duration by channel
    pub static ref RENDER_DURATION: HistogramVec = register_histogram_vec!(
        format!("{}_render_duration_seconds", METRIC_PREFIX),
        "Template render duration in seconds",
        &["channel"],
        vec![0.00001, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1]
    ).unwrap();

    /// Inline markers emitted into rendered output, by diagnostic kind
    pub static ref RENDER_MARKERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_render_markers_total", METRIC_PREFIX),
        "Total inline diagnostic markers emitted while rendering",
        &["kind"]
    ).unwrap();

    // ============================================================================
    // Validation Metrics
    // ============================================================================

    /// Content writes rejected by validation
    pub static ref CONTENT_VALIDATION_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_content_validation_failures_total", METRIC_PREFIX),
        "Total content writes rejected because of unresolved references"
    ).unwrap();

    // ============================================================================
    // Store Metrics
    // ============================================================================

    /// Number of stored templates
    pub static ref TEMPLATES_TOTAL: IntGauge = register_int_gauge!(
        format!("{}_templates_total", METRIC_PREFIX),
        "Number of stored templates"
    ).unwrap();

    /// Number of stored locales
    pub static ref LOCALES_TOTAL: IntGauge = register_int_gauge!(
        format!("{}_locales_total", METRIC_PREFIX),
        "Number of stored locales"
    ).unwrap();
}
