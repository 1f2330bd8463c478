use std::future::Future;
use std::time::Instant;

use lazy_static::lazy_static;
use prometheus::{
    core::Collector, histogram_opts, HistogramVec, IntCounter, IntCounterVec, Registry,
};
use serde_json::Value;
use tracing::error;

use crate::error::{AdapterError, AdapterErrorKind};

lazy_static! {
    static ref CDP_COMMANDS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("statgrab_cdp_commands_total", "Total CDP commands executed"),
        &["method"]
    )
    .unwrap();
    static ref CDP_COMMAND_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new(
            "statgrab_cdp_command_failures_total",
            "CDP command failures by error kind"
        ),
        &["method", "kind"]
    )
    .unwrap();
    static ref CDP_COMMAND_DURATION: HistogramVec = HistogramVec::new(
        histogram_opts!(
            "statgrab_cdp_command_duration_seconds",
            "CDP command latency",
            vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]
        ),
        &["method"]
    )
    .unwrap();
    static ref CDP_LAUNCHES_TOTAL: IntCounter =
        IntCounter::new("statgrab_cdp_launches_total", "Total browser launches").unwrap();
    static ref CDP_LAUNCH_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "statgrab_cdp_launch_failures_total",
        "Total browser launches that failed",
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register cdp metric");
        }
    }
}

/// Add the adapter's collectors to `registry`. Registering twice is harmless.
pub fn register_metrics(registry: &Registry) {
    register(registry, CDP_COMMANDS_TOTAL.clone());
    register(registry, CDP_COMMAND_FAILURES_TOTAL.clone());
    register(registry, CDP_COMMAND_DURATION.clone());
    register(registry, CDP_LAUNCHES_TOTAL.clone());
    register(registry, CDP_LAUNCH_FAILURES_TOTAL.clone());
}

fn kind_label(kind: &AdapterErrorKind) -> &'static str {
    match kind {
        AdapterErrorKind::NavTimeout => "nav_timeout",
        AdapterErrorKind::CdpIo => "cdp_io",
        AdapterErrorKind::LaunchFailed => "launch_failed",
        AdapterErrorKind::TargetNotFound => "target_not_found",
        AdapterErrorKind::Internal => "internal",
    }
}

/// Count `call` and record its latency on success or its error kind on failure.
pub async fn observe_command<F>(method: &str, call: F) -> Result<Value, AdapterError>
where
    F: Future<Output = Result<Value, AdapterError>>,
{
    let start = Instant::now();
    CDP_COMMANDS_TOTAL.with_label_values(&[method]).inc();
    let result = call.await;
    match &result {
        Ok(_) => CDP_COMMAND_DURATION
            .with_label_values(&[method])
            .observe(start.elapsed().as_secs_f64()),
        Err(err) => CDP_COMMAND_FAILURES_TOTAL
            .with_label_values(&[method, kind_label(&err.kind)])
            .inc(),
    }
    result
}

pub fn record_launch(ok: bool) {
    CDP_LAUNCHES_TOTAL.inc();
    if !ok {
        CDP_LAUNCH_FAILURES_TOTAL.inc();
    }
}
