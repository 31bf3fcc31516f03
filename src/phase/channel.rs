//! Blocking phase hand-off channel
//!
//! `PhaseChannel` carries phase-change events from the single timing loop to
//! any number of observers. Every value is handed to exactly one receiver;
//! this is a work queue, not a broadcast.
//!
//! The pending sequence sits behind one `Mutex`, held only for a single
//! insert or remove. Blocked receivers park on a `Condvar`, which releases
//! the mutex while they sleep.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::ChannelError;

/// Which pending value `receive` takes when more than one is queued.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOrder {
    /// Oldest pending value first. Observers see every transition in order.
    #[default]
    Fifo,
    /// Newest pending value first. When two values are pending the older one
    /// is delivered only after the newer one, so a slow observer may act on
    /// the latest phase before an earlier transition.
    Lifo,
}

impl DeliveryOrder {
    /// Returns the lowercase name of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fifo => "fifo",
            Self::Lifo => "lifo",
        }
    }
}

impl std::fmt::Display for DeliveryOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Pending<T> {
    queue: VecDeque<T>,
    closed: bool,
}

impl<T> Pending<T> {
    fn take(&mut self, order: DeliveryOrder) -> Option<T> {
        match order {
            DeliveryOrder::Fifo => self.queue.pop_front(),
            DeliveryOrder::Lifo => self.queue.pop_back(),
        }
    }
}

/// Unbounded single-producer, multi-consumer blocking queue.
///
/// `send` never blocks. `receive` parks the calling thread until a value is
/// available and removes exactly one, following the channel's
/// [`DeliveryOrder`].
///
/// After [`close`](Self::close), values already queued are still delivered;
/// once drained, receivers get [`ChannelError::Closed`].
pub struct PhaseChannel<T> {
    pending: Mutex<Pending<T>>,
    available: Condvar,
    order: DeliveryOrder,
}

impl<T> PhaseChannel<T> {
    /// Creates an empty channel with the given removal policy.
    #[must_use]
    pub const fn new(order: DeliveryOrder) -> Self {
        Self {
            pending: Mutex::new(Pending {
                queue: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
            order,
        }
    }

    /// Returns the removal policy of this channel.
    #[must_use]
    pub const fn order(&self) -> DeliveryOrder {
        self.order
    }

    // Queue operations cannot leave `Pending` half-updated, so a panic on
    // another thread while holding the lock does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, Pending<T>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues `value` and wakes one blocked receiver.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] if the channel was closed. The value
    /// is dropped in that case.
    pub fn send(&self, value: T) -> Result<(), ChannelError> {
        {
            let mut pending = self.lock();
            if pending.closed {
                return Err(ChannelError::Closed);
            }
            pending.queue.push_back(value);
            trace!(pending = pending.queue.len(), "phase event queued");
        }
        self.available.notify_one();
        Ok(())
    }

    /// Blocks until a value is available, then removes and returns it.
    ///
    /// Without a [`close`](Self::close) this waits indefinitely.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] once the channel is closed and empty.
    pub fn receive(&self) -> Result<T, ChannelError> {
        let mut pending = self
            .available
            .wait_while(self.lock(), |p| p.queue.is_empty() && !p.closed)
            .unwrap_or_else(PoisonError::into_inner);
        pending.take(self.order).ok_or(ChannelError::Closed)
    }

    /// Like [`receive`](Self::receive), but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Timeout`] if nothing arrived in time, or
    /// [`ChannelError::Closed`] once the channel is closed and empty.
    pub fn receive_timeout(&self, timeout: Duration) -> Result<T, ChannelError> {
        let deadline = Instant::now() + timeout;
        let mut pending = self.lock();
        loop {
            if let Some(value) = pending.take(self.order) {
                return Ok(value);
            }
            if pending.closed {
                return Err(ChannelError::Closed);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ChannelError::Timeout);
            }
            pending = self
                .available
                .wait_timeout(pending, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Removes a value if one is pending, without blocking.
    #[must_use]
    pub fn try_receive(&self) -> Option<T> {
        self.lock().take(self.order)
    }

    /// Closes the channel and wakes every blocked receiver. Idempotent.
    pub fn close(&self) {
        {
            let mut pending = self.lock();
            if pending.closed {
                return;
            }
            pending.closed = true;
        }
        self.available.notify_all();
    }

    /// Returns whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Returns the number of values waiting to be received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns whether no values are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }
}

impl<T> Default for PhaseChannel<T> {
    fn default() -> Self {
        Self::new(DeliveryOrder::default())
    }
}

impl<T> std::fmt::Debug for PhaseChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self.lock();
        f.debug_struct("PhaseChannel")
            .field("order", &self.order)
            .field("pending", &pending.queue.len())
            .field("closed", &pending.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::Phase;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let channel = PhaseChannel::new(DeliveryOrder::Fifo);
        channel.send(1).unwrap();
        channel.send(2).unwrap();
        channel.send(3).unwrap();

        assert_eq!(channel.receive().unwrap(), 1);
        assert_eq!(channel.receive().unwrap(), 2);
        assert_eq!(channel.receive().unwrap(), 3);
    }

    #[test]
    fn test_lifo_order() {
        let channel = PhaseChannel::new(DeliveryOrder::Lifo);
        channel.send(1).unwrap();
        channel.send(2).unwrap();
        channel.send(3).unwrap();

        assert_eq!(channel.receive().unwrap(), 3);
        assert_eq!(channel.receive().unwrap(), 2);
        assert_eq!(channel.receive().unwrap(), 1);
    }

    #[test]
    fn test_lifo_delivers_newest_phase_first() {
        let channel = PhaseChannel::new(DeliveryOrder::Lifo);
        channel.send(Phase::Green).unwrap();
        channel.send(Phase::Red).unwrap();

        assert_eq!(channel.receive().unwrap(), Phase::Red);
        assert_eq!(channel.receive().unwrap(), Phase::Green);
    }

    #[test]
    fn test_default_is_fifo() {
        let channel: PhaseChannel<Phase> = PhaseChannel::default();
        assert_eq!(channel.order(), DeliveryOrder::Fifo);
    }

    #[test]
    fn test_len_and_is_empty() {
        let channel = PhaseChannel::default();
        assert!(channel.is_empty());
        channel.send(Phase::Red).unwrap();
        channel.send(Phase::Green).unwrap();
        assert_eq!(channel.len(), 2);
        let _ = channel.receive().unwrap();
        assert_eq!(channel.len(), 1);
    }

    #[test]
    fn test_try_receive_empty() {
        let channel: PhaseChannel<Phase> = PhaseChannel::default();
        assert!(channel.try_receive().is_none());
        channel.send(Phase::Green).unwrap();
        assert_eq!(channel.try_receive(), Some(Phase::Green));
        assert!(channel.try_receive().is_none());
    }

    #[test]
    fn test_receive_timeout_expires() {
        let channel: PhaseChannel<Phase> = PhaseChannel::default();
        let started = Instant::now();
        let result = channel.receive_timeout(Duration::from_millis(50));
        assert_eq!(result, Err(ChannelError::Timeout));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_receive_timeout_returns_pending_value() {
        let channel = PhaseChannel::default();
        channel.send(Phase::Green).unwrap();
        assert_eq!(
            channel.receive_timeout(Duration::from_millis(10)),
            Ok(Phase::Green)
        );
    }

    #[test]
    fn test_receiver_blocks_until_delayed_send() {
        let channel = Arc::new(PhaseChannel::default());
        let (tx, rx) = mpsc::channel();

        let receiver = {
            let c = Arc::clone(&channel);
            thread::spawn(move || {
                let value = c.receive();
                tx.send(Instant::now()).unwrap();
                value
            })
        };

        // The receiver must still be parked well after it started.
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

        let sent_at = Instant::now();
        channel.send(Phase::Green).unwrap();

        let woke_at = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(woke_at >= sent_at);
        assert_eq!(receiver.join().unwrap(), Ok(Phase::Green));
    }

    #[test]
    fn test_close_wakes_blocked_receivers() {
        let channel: Arc<PhaseChannel<Phase>> = Arc::new(PhaseChannel::default());
        let receivers: Vec<_> = (0..3)
            .map(|_| {
                let c = Arc::clone(&channel);
                thread::spawn(move || c.receive())
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        channel.close();

        for r in receivers {
            assert_eq!(r.join().unwrap(), Err(ChannelError::Closed));
        }
    }

    #[test]
    fn test_close_drains_pending_first() {
        let channel = PhaseChannel::default();
        channel.send(Phase::Red).unwrap();
        channel.close();

        assert!(channel.is_closed());
        assert_eq!(channel.receive(), Ok(Phase::Red));
        assert_eq!(channel.receive(), Err(ChannelError::Closed));
        assert_eq!(
            channel.receive_timeout(Duration::from_millis(10)),
            Err(ChannelError::Closed)
        );
    }

    #[test]
    fn test_send_after_close_fails() {
        let channel = PhaseChannel::default();
        channel.close();
        channel.close();
        assert_eq!(channel.send(Phase::Green), Err(ChannelError::Closed));
        assert!(channel.is_empty());
    }

    #[test]
    fn test_concurrent_receivers_exactly_once() {
        const SENDS: usize = 1_000;
        const RECEIVERS: usize = 8;

        let channel = Arc::new(PhaseChannel::new(DeliveryOrder::Lifo));
        let receivers: Vec<_> = (0..RECEIVERS)
            .map(|_| {
                let c = Arc::clone(&channel);
                thread::spawn(move || {
                    let mut got = Vec::new();
                    while let Ok(v) = c.receive() {
                        got.push(v);
                    }
                    got
                })
            })
            .collect();

        for i in 0..SENDS {
            channel.send(i).unwrap();
        }
        channel.close();

        let mut seen = HashSet::new();
        let mut total = 0;
        for r in receivers {
            for v in r.join().unwrap() {
                assert!(seen.insert(v), "value {v} delivered twice");
                total += 1;
            }
        }
        assert_eq!(total, SENDS);
        assert_eq!(seen, (0..SENDS).collect::<HashSet<_>>());
    }

    #[test]
    fn test_debug_output() {
        let channel: PhaseChannel<Phase> = PhaseChannel::new(DeliveryOrder::Lifo);
        let debug = format!("{channel:?}");
        assert!(debug.contains("PhaseChannel"));
        assert!(debug.contains("Lifo"));
    }
}
