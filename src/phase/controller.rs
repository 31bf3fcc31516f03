//! Signal controller and timing loop
//!
//! The `SignalController` owns the current phase and a dedicated timing
//! thread that toggles it after a randomized interval, publishing every new
//! phase through a [`PhaseChannel`]. Observers block on that channel until
//! the phase they want is published.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::error::{ChannelError, ControllerError};
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter};

use super::channel::{DeliveryOrder, PhaseChannel};
use super::state::{Phase, PhaseState};
use super::timing::{CycleRange, whole_millis};

/// Name given to every controller's timing thread.
pub const TIMING_THREAD_NAME: &str = "signal-timing";

/// Construction parameters for a [`SignalController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerConfig {
    /// Range each phase duration is drawn from.
    pub cycle: CycleRange,
    /// Removal policy of the phase channel.
    pub order: DeliveryOrder,
    /// Fixed RNG seed; `None` seeds from the thread-local generator.
    pub seed: Option<u64>,
}

/// Stop flag the timing loop sleeps on.
///
/// Raising it wakes the loop out of its deadline sleep immediately.
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    const fn new() -> Self {
        Self {
            stopped: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    fn raise(&self) {
        *self.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.wake.notify_all();
    }

    /// Sleeps for `remaining` or until raised. Returns `true` if raised.
    fn wait_for(&self, remaining: Duration) -> bool {
        let guard = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (stopped, _) = self
            .wake
            .wait_timeout_while(guard, remaining, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        *stopped
    }
}

/// State shared between the controller and its timing thread.
struct Shared {
    state: PhaseState,
    channel: PhaseChannel<Phase>,
    stop: StopSignal,
    toggles: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

struct Worker {
    lifecycle: Lifecycle,
    handle: Option<JoinHandle<()>>,
}

/// A single traffic signal cycling between red and green on its own thread.
///
/// Lifecycle: a new controller is red and idle. [`start`](Self::start)
/// launches the timing loop. [`shutdown`](Self::shutdown), which also runs
/// on drop, stops the loop, joins its thread, and closes the phase channel.
/// A controller is never restarted.
///
/// Phase events are consumed exactly once: with several observers waiting,
/// each published phase wakes only one of them.
pub struct SignalController {
    shared: Arc<Shared>,
    config: ControllerConfig,
    events: Option<Arc<EventEmitter>>,
    worker: Mutex<Worker>,
}

impl SignalController {
    /// Creates an idle controller showing red.
    #[must_use]
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: PhaseState::new(Phase::Red),
                channel: PhaseChannel::new(config.order),
                stop: StopSignal::new(),
                toggles: AtomicU64::new(0),
            }),
            config,
            events: None,
            worker: Mutex::new(Worker {
                lifecycle: Lifecycle::Idle,
                handle: None,
            }),
        }
    }

    /// Attaches a JSONL event sink for lifecycle and phase-change events.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = Some(events);
        self
    }

    fn lock_worker(&self) -> MutexGuard<'_, Worker> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Launches the timing loop on a dedicated thread and returns at once.
    ///
    /// Only one loop ever runs per controller. Concurrent calls are
    /// serialized; exactly one of them starts the loop.
    ///
    /// # Errors
    ///
    /// - [`ControllerError::AlreadyRunning`] if the loop is already running.
    /// - [`ControllerError::Stopped`] if the controller was shut down.
    /// - [`ControllerError::Spawn`] if the thread could not be created; the
    ///   controller stays idle.
    pub fn start(&self) -> Result<(), ControllerError> {
        let mut worker = self.lock_worker();
        match worker.lifecycle {
            Lifecycle::Running => return Err(ControllerError::AlreadyRunning),
            Lifecycle::Stopped => return Err(ControllerError::Stopped),
            Lifecycle::Idle => {}
        }

        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        let config = self.config;
        let rng = config.seed.map_or_else(
            || StdRng::from_rng(&mut rand::rng()),
            StdRng::seed_from_u64,
        );

        let handle = thread::Builder::new()
            .name(TIMING_THREAD_NAME.to_string())
            .spawn(move || run_timing_loop(&shared, config, rng, events.as_deref()))
            .map_err(ControllerError::Spawn)?;

        worker.handle = Some(handle);
        worker.lifecycle = Lifecycle::Running;
        Ok(())
    }

    /// Returns the current phase without blocking.
    #[must_use]
    pub fn current_phase(&self) -> Phase {
        self.shared.state.current()
    }

    /// Blocks until the next transition to green is published.
    ///
    /// This is edge-triggered: it waits for a green *event*, not a green
    /// *level*. A caller arriving while the light is already green keeps
    /// waiting until the signal has gone red and turned green again (or until
    /// an unconsumed green event is still queued). Red events taken from the
    /// channel along the way are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the controller is shut down while
    /// waiting.
    pub fn wait_for_green(&self) -> Result<(), ChannelError> {
        self.wait_for(Phase::Green)
    }

    /// Blocks until a transition to `target` is published.
    ///
    /// Same edge-triggered semantics as [`wait_for_green`](Self::wait_for_green).
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the controller is shut down while
    /// waiting.
    pub fn wait_for(&self, target: Phase) -> Result<(), ChannelError> {
        drain_until(&self.shared.channel, target, None)
    }

    /// Like [`wait_for`](Self::wait_for), bounded by `timeout` for the whole
    /// wait.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Timeout`] if no `target` event arrived in time,
    /// or [`ChannelError::Closed`] if the controller was shut down.
    pub fn wait_for_timeout(&self, target: Phase, timeout: Duration) -> Result<(), ChannelError> {
        drain_until(&self.shared.channel, target, Instant::now().checked_add(timeout))
    }

    /// Returns how many times the phase has toggled.
    #[must_use]
    pub fn toggle_count(&self) -> u64 {
        self.shared.toggles.load(Ordering::SeqCst)
    }

    /// Returns the number of published phase events not yet consumed.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.shared.channel.len()
    }

    /// Returns whether the timing loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock_worker().lifecycle == Lifecycle::Running
    }

    /// Returns the configuration this controller was built with.
    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Stops the timing loop, joins its thread, and closes the phase channel.
    ///
    /// Observers still blocked in a wait are released with
    /// [`ChannelError::Closed`]. Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        let (was_running, handle) = {
            let mut worker = self.lock_worker();
            if worker.lifecycle == Lifecycle::Stopped {
                return;
            }
            let was_running = worker.lifecycle == Lifecycle::Running;
            worker.lifecycle = Lifecycle::Stopped;
            (was_running, worker.handle.take())
        };

        self.shared.stop.raise();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("timing thread panicked");
            }
        }
        self.shared.channel.close();

        if was_running {
            let toggles = self.toggle_count();
            let phase = self.current_phase();
            info!(toggles, %phase, "signal controller stopped");
            if let Some(events) = &self.events {
                events.emit(Event::ControllerStopped {
                    timestamp: Utc::now(),
                    toggles,
                    phase,
                });
            }
        }
    }
}

impl Default for SignalController {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl Drop for SignalController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SignalController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalController")
            .field("current_phase", &self.current_phase())
            .field("toggles", &self.toggle_count())
            .field("running", &self.is_running())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Takes events from `channel` until one equals `target`.
fn drain_until(
    channel: &PhaseChannel<Phase>,
    target: Phase,
    deadline: Option<Instant>,
) -> Result<(), ChannelError> {
    loop {
        let phase = match deadline {
            None => channel.receive()?,
            Some(deadline) => {
                channel.receive_timeout(deadline.saturating_duration_since(Instant::now()))?
            }
        };
        metrics::record_observer_wakeup(phase);
        if phase == target {
            return Ok(());
        }
        debug!(%phase, waiting_for = %target, "discarding phase event");
    }
}

/// Body of the timing thread.
///
/// Sleeps until the current phase's deadline (or until stopped), then
/// toggles the phase, counts the toggle, draws the next duration, and
/// publishes the new phase, in that order.
fn run_timing_loop(
    shared: &Shared,
    config: ControllerConfig,
    mut rng: StdRng,
    events: Option<&EventEmitter>,
) {
    let cycle = config.cycle;
    let mut target = cycle.sample(&mut rng);
    let mut last_toggle = Instant::now();

    let phase = shared.state.current();
    info!(
        %phase,
        cycle = %cycle,
        order = %config.order,
        first_ms = whole_millis(target),
        "signal controller started"
    );
    if let Some(events) = events {
        events.emit(Event::ControllerStarted {
            timestamp: Utc::now(),
            phase,
            min_cycle_ms: whole_millis(cycle.min()),
            max_cycle_ms: whole_millis(cycle.max()),
            order: config.order,
        });
    }
    metrics::set_current_phase(phase);
    metrics::record_cycle_duration(target);

    loop {
        if shared.stop.wait_for(target.saturating_sub(last_toggle.elapsed())) {
            break;
        }
        if last_toggle.elapsed() < target {
            continue;
        }

        let entered = shared.state.toggle();
        // Must be counted before the send: woken observers read the counter.
        let toggle = shared.toggles.fetch_add(1, Ordering::SeqCst) + 1;
        last_toggle = Instant::now();
        target = cycle.sample(&mut rng);
        if shared.channel.send(entered).is_err() {
            break;
        }

        metrics::record_phase_transition(entered);
        metrics::set_current_phase(entered);
        metrics::record_cycle_duration(target);
        debug!(
            phase = %entered,
            toggle,
            next_ms = whole_millis(target),
            "phase toggled"
        );
        if let Some(events) = events {
            events.emit(Event::PhaseChanged {
                timestamp: Utc::now(),
                from: entered.toggled(),
                to: entered,
                toggle,
                next_cycle_ms: whole_millis(target),
            });
        }
    }

    debug!("timing loop exited");
}
