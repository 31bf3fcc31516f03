//! Shared integration-test helpers: fast controllers and a harness for
//! running the `trafficlight` binary with a timeout.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use tokio::process::Command;

use trafficlight::phase::{ControllerConfig, CycleRange, DeliveryOrder, SignalController};

/// Default timeout for a CLI invocation to finish.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Builds a controller config with a millisecond-scale cycle.
#[allow(clippy::missing_panics_doc)]
pub fn fast_config(min_ms: u64, max_ms: u64, order: DeliveryOrder) -> ControllerConfig {
    ControllerConfig {
        cycle: CycleRange::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
            .expect("valid test cycle range"),
        order,
        seed: Some(0x5eed),
    }
}

/// Builds an idle controller with a millisecond-scale FIFO cycle.
pub fn fast_controller(min_ms: u64, max_ms: u64) -> SignalController {
    SignalController::new(fast_config(min_ms, max_ms, DeliveryOrder::Fifo))
}

/// Runs the compiled `trafficlight` binary with `args`.
///
/// Panics if the process cannot be spawned or does not exit within
/// `timeout`; the child is killed on drop.
#[allow(clippy::missing_panics_doc)]
pub async fn run_trafficlight(args: &[&str], timeout: Duration) -> Output {
    let bin = env!("CARGO_BIN_EXE_trafficlight");
    let child = Command::new(bin)
        .args(args)
        .env_remove("TRAFFICLIGHT_CONFIG")
        .env_remove("TRAFFICLIGHT_LOG_LEVEL")
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .expect("failed to spawn trafficlight");

    tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .expect("trafficlight did not exit in time")
        .expect("failed to collect trafficlight output")
}

/// Writes `contents` to `name` inside `dir` and returns the path.
#[allow(clippy::missing_panics_doc)]
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("failed to write test file");
    path
}
