//! Prometheus metrics for the enrichment pipeline.
//!
//! A single global registry holds counters for job/step/supplier
//! outcomes and outbound-call attempts, duration histograms and queue
//! gauges. Exported in Prometheus text format at `/metrics`.

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Jobs finished, by terminal status
    pub static ref JOBS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("jobs_total", "Enrichment jobs finished, by terminal status")
            .namespace("bom_enricher"),
        &["status"]
    ).expect("Failed to create JOBS_TOTAL metric");

    /// Step results, by step and status
    pub static ref STEP_RESULTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("step_results_total", "Pipeline step results, by step and status")
            .namespace("bom_enricher"),
        &["step", "status"]
    ).expect("Failed to create STEP_RESULTS_TOTAL metric");

    /// Supplier responses, by supplier and status
    pub static ref SUPPLIER_RESPONSES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("supplier_responses_total", "Supplier responses, by supplier and status")
            .namespace("bom_enricher"),
        &["supplier", "status"]
    ).expect("Failed to create SUPPLIER_RESPONSES_TOTAL metric");

    /// Outbound logical calls, by outcome; attempt counts go to the histogram
    pub static ref HTTP_CALLS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("http_calls_total", "Outbound logical calls, by outcome")
            .namespace("bom_enricher"),
        &["outcome"]
    ).expect("Failed to create HTTP_CALLS_TOTAL metric");

    /// Attempts used per logical outbound call
    pub static ref HTTP_CALL_ATTEMPTS: Histogram = Histogram::with_opts(
        HistogramOpts::new("http_call_attempts", "Attempts used per logical outbound call")
            .namespace("bom_enricher")
            .buckets(vec![1.0, 2.0, 3.0])
    ).expect("Failed to create HTTP_CALL_ATTEMPTS metric");

    /// Job duration in seconds
    pub static ref JOB_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new("job_duration_seconds", "Enrichment job duration in seconds")
            .namespace("bom_enricher")
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0])
    ).expect("Failed to create JOB_DURATION_SECONDS metric");

    /// Step duration in seconds, by step
    pub static ref STEP_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new("step_duration_seconds", "Pipeline step duration in seconds")
            .namespace("bom_enricher")
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["step"]
    ).expect("Failed to create STEP_DURATION_SECONDS metric");

    /// Jobs waiting in the enrichment queue
    pub static ref QUEUE_DEPTH: Gauge = Gauge::with_opts(
        Opts::new("queue_depth", "Jobs waiting in the enrichment queue")
            .namespace("bom_enricher")
    ).expect("Failed to create QUEUE_DEPTH metric");

    /// Active progress-stream subscribers
    pub static ref SSE_SUBSCRIBERS: Gauge = Gauge::with_opts(
        Opts::new("sse_subscribers", "Active progress-stream subscribers")
            .namespace("bom_enricher")
    ).expect("Failed to create SSE_SUBSCRIBERS metric");
}

/// Register all metrics with the global registry.
///
/// Idempotent: duplicate registration is ignored so tests can call it
/// freely.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(JOBS_TOTAL.clone()),
        Box::new(STEP_RESULTS_TOTAL.clone()),
        Box::new(SUPPLIER_RESPONSES_TOTAL.clone()),
        Box::new(HTTP_CALLS_TOTAL.clone()),
        Box::new(HTTP_CALL_ATTEMPTS.clone()),
        Box::new(JOB_DURATION_SECONDS.clone()),
        Box::new(STEP_DURATION_SECONDS.clone()),
        Box::new(QUEUE_DEPTH.clone()),
        Box::new(SSE_SUBSCRIBERS.clone()),
    ];

    for collector in collectors {
        match PROMETHEUS_REGISTRY.register(collector) {
            Ok(()) => {}
            Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// Export all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let families = PROMETHEUS_REGISTRY.gather();
    encoder.encode_to_string(&families).unwrap_or_default()
}

/// Record one finished logical outbound call
pub fn record_http_call(attempts: u32, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    HTTP_CALLS_TOTAL.with_label_values(&[outcome]).inc();
    HTTP_CALL_ATTEMPTS.observe(attempts as f64);
}

/// Record a step result
pub fn record_step_result(step: &str, status: &str, duration_ms: Option<u64>) {
    STEP_RESULTS_TOTAL.with_label_values(&[step, status]).inc();
    if let Some(ms) = duration_ms {
        STEP_DURATION_SECONDS
            .with_label_values(&[step])
            .observe(ms as f64 / 1000.0);
    }
}

/// Record a finished job
pub fn record_job_result(status: &str, duration_ms: Option<u64>) {
    JOBS_TOTAL.with_label_values(&[status]).inc();
    if let Some(ms) = duration_ms {
        JOB_DURATION_SECONDS.observe(ms as f64 / 1000.0);
    }
}

/// Record a supplier response
pub fn record_supplier_response(supplier: &str, status: &str) {
    SUPPLIER_RESPONSES_TOTAL
        .with_label_values(&[supplier, status])
        .inc();
}
