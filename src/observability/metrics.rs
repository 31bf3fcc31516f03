//! Metrics collection for `trafficlight`.
//!
//! Prometheus-compatible metrics through the `metrics` facade. Every
//! recording function is a no-op until [`init_metrics`] installs a recorder.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::TrafficLightError;
use crate::phase::Phase;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without
/// an HTTP endpoint.
///
/// # Errors
///
/// Returns `TrafficLightError::Io` if the recorder or HTTP listener
/// cannot be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), TrafficLightError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| TrafficLightError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "trafficlight_phase_transitions_total",
        "Total number of phase toggles, labelled by the phase entered"
    );
    describe_gauge!(
        "trafficlight_current_phase",
        "Current signal phase (0 = red, 1 = green)"
    );
    describe_histogram!(
        "trafficlight_cycle_duration_ms",
        "Randomized duration drawn for each phase, in milliseconds"
    );
    describe_counter!(
        "trafficlight_observer_wakeups_total",
        "Phase events consumed by observers, labelled by phase"
    );
}

/// Records a toggle into `entered`.
pub fn record_phase_transition(entered: Phase) {
    counter!("trafficlight_phase_transitions_total", "phase" => entered.as_str()).increment(1);
}

/// Sets the current phase gauge.
pub fn set_current_phase(phase: Phase) {
    let value = match phase {
        Phase::Red => 0.0,
        Phase::Green => 1.0,
    };
    gauge!("trafficlight_current_phase").set(value);
}

/// Records the duration drawn for the next phase.
pub fn record_cycle_duration(duration: Duration) {
    histogram!("trafficlight_cycle_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

/// Records an observer consuming a phase event.
pub fn record_observer_wakeup(phase: Phase) {
    counter!("trafficlight_observer_wakeups_total", "phase" => phase.as_str()).increment(1);
}
