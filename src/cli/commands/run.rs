//! Signal run command
//!
//! Builds a controller from config and flags, starts it, and runs one
//! blocking observer per `--observers` on tokio's blocking pool. Each
//! observer waits for `--greens` green events; every event wakes exactly
//! one observer, so observers are served one green at a time.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::cli::args::RunArgs;
use crate::config::{ConfigLoader, SignalConfig};
use crate::error::{ChannelError, ExitCode, TrafficLightError};
use crate::observability::{Event, EventEmitter, init_metrics};
use crate::phase::timing::whole_millis;
use crate::phase::{Phase, SignalController};

/// Run the signal until every observer has seen its greens, or until
/// interrupted.
///
/// Returns [`ExitCode::SUCCESS`] on completion, or the signal exit code
/// after a clean teardown when interrupted.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the events file or
/// metrics listener cannot be set up, or the controller fails to start.
pub async fn run(args: &RunArgs, quiet: bool) -> Result<i32, TrafficLightError> {
    let file_config = match &args.config {
        Some(path) => ConfigLoader::with_defaults().load(path)?,
        None => SignalConfig::default(),
    };
    let controller_config = file_config
        .with_overrides(args.overrides())
        .controller_config()?;

    if let Some(port) = args.metrics_port {
        init_metrics(Some(port))?;
        info!(port, "metrics listener started");
    }

    let events = args
        .events_file
        .as_deref()
        .map(EventEmitter::from_file)
        .transpose()?
        .map(Arc::new);

    let mut controller = SignalController::new(controller_config);
    if let Some(events) = &events {
        controller = controller.with_events(Arc::clone(events));
    }
    let controller = Arc::new(controller);
    controller.start()?;

    let mut observers = JoinSet::new();
    for id in 0..args.observers {
        let controller = Arc::clone(&controller);
        let events = events.clone();
        let greens = args.greens;
        observers.spawn_blocking(move || {
            observe(id, &controller, greens, events.as_deref(), quiet)
        });
    }

    let (outcome, exit_code) = tokio::select! {
        result = join_observers(&mut observers) => (result, ExitCode::SUCCESS),
        code = shutdown_signal() => {
            warn!("interrupted, stopping signal");
            (Ok(()), code)
        }
    };

    // Shutdown joins the timing thread, so keep it off the async workers.
    let stopping = Arc::clone(&controller);
    tokio::task::spawn_blocking(move || stopping.shutdown())
        .await
        .map_err(std::io::Error::other)?;

    // Observers still blocked were released with `Closed`.
    while observers.join_next().await.is_some() {}

    outcome.map(|()| exit_code)
}

/// Body of one observer thread.
fn observe(
    id: u32,
    controller: &SignalController,
    greens: u32,
    events: Option<&EventEmitter>,
    quiet: bool,
) -> Result<(), ChannelError> {
    for n in 1..=greens {
        let started = Instant::now();
        controller.wait_for_green()?;
        let waited_ms = whole_millis(started.elapsed());
        info!(observer = id, n, waited_ms, "observer released on green");
        if !quiet {
            println!(
                "observer {id}: green #{n} after {}",
                humantime::format_duration(Duration::from_millis(waited_ms))
            );
        }
        if let Some(events) = events {
            events.emit(Event::ObserverReleased {
                timestamp: Utc::now(),
                observer: id,
                phase: Phase::Green,
                waited_ms,
            });
        }
    }
    Ok(())
}

async fn join_observers(
    observers: &mut JoinSet<Result<(), ChannelError>>,
) -> Result<(), TrafficLightError> {
    while let Some(joined) = observers.join_next().await {
        joined.map_err(std::io::Error::other)??;
    }
    Ok(())
}

/// Resolves on Ctrl+C (or SIGTERM on Unix) with the matching exit code.
async fn shutdown_signal() -> i32 {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            return tokio::select! {
                _ = tokio::signal::ctrl_c() => ExitCode::INTERRUPTED,
                _ = sigterm.recv() => ExitCode::TERMINATED,
            };
        }
    }
    let _ = tokio::signal::ctrl_c().await;
    ExitCode::INTERRUPTED
}
