use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use cdp_adapter::metrics as cdp_metrics;
use lazy_static::lazy_static;
use once_cell::sync::{Lazy, OnceCell};
use prometheus::{histogram_opts, Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};
use tracing::error;

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);
static REGISTER_ONCE: OnceCell<()> = OnceCell::new();

lazy_static! {
    static ref EXTRACTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("statgrab_extractions_total", "Extraction attempts by outcome"),
        &["outcome"]
    )
    .unwrap();
    static ref EXTRACTION_DURATION: HistogramVec = HistogramVec::new(
        histogram_opts!(
            "statgrab_extraction_duration_seconds",
            "End-to-end extraction latency",
            vec![1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 45.0, 60.0, 90.0]
        ),
        &["outcome"]
    )
    .unwrap();
}

pub fn register_metrics() {
    REGISTER_ONCE.get_or_init(|| {
        let registry = global_registry();
        cdp_metrics::register_metrics(registry);
        for collector in [
            Box::new(EXTRACTIONS_TOTAL.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(EXTRACTION_DURATION.clone()),
        ] {
            if let Err(err) = registry.register(collector) {
                error!(?err, "failed to register extraction metric");
            }
        }
    });
}

/// `outcome` is `ok` or the failing render phase.
pub fn record_extraction(outcome: &str, elapsed: Duration) {
    EXTRACTIONS_TOTAL.with_label_values(&[outcome]).inc();
    EXTRACTION_DURATION
        .with_label_values(&[outcome])
        .observe(elapsed.as_secs_f64());
}

pub fn extraction_count(outcome: &str) -> u64 {
    EXTRACTIONS_TOTAL.with_label_values(&[outcome]).get()
}

pub fn global_registry() -> &'static Registry {
    &GLOBAL_REGISTRY
}

/// Prometheus text exposition of every registered metric.
pub fn render_text() -> Result<String, prometheus::Error> {
    register_metrics();
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&global_registry().gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
}

pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    match render_text() {
        Ok(body) => match HeaderValue::from_str(encoder.format_type()) {
            Ok(value) => ([(header::CONTENT_TYPE, value)], body).into_response(),
            Err(err) => {
                error!(?err, "failed to build content-type header");
                (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
            }
        },
        Err(err) => {
            error!(?err, "failed to encode prometheus metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metric encode error").into_response()
        }
    }
}
