//! Signal phase representation
//!
//! Lock-free atomic storage for the current phase. The timing loop is the
//! only writer; observers on any thread read it without blocking.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

/// The two phases of the traffic signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Stop. The initial phase of every controller.
    #[default]
    Red,
    /// Go.
    Green,
}

impl Phase {
    /// Returns the phase the signal moves to from `self`.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Red => Self::Green,
            Self::Green => Self::Red,
        }
    }

    /// Returns the lowercase name used in logs, metrics, and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Red => "red",
            Self::Green => "green",
        }
    }

    const fn to_bits(self) -> u8 {
        match self {
            Self::Red => 0,
            Self::Green => 1,
        }
    }

    const fn from_bits(bits: u8) -> Self {
        if bits == 0 { Self::Red } else { Self::Green }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic current-phase cell.
///
/// A single `AtomicU8` so a reader can never observe a partial update.
pub struct PhaseState {
    current: AtomicU8,
}

impl PhaseState {
    /// Creates a new `PhaseState` holding `initial`.
    #[must_use]
    pub const fn new(initial: Phase) -> Self {
        Self {
            current: AtomicU8::new(initial.to_bits()),
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn current(&self) -> Phase {
        Phase::from_bits(self.current.load(Ordering::SeqCst))
    }

    /// Flips the phase and returns the newly current value.
    pub fn toggle(&self) -> Phase {
        let previous = Phase::from_bits(self.current.fetch_xor(1, Ordering::SeqCst));
        previous.toggled()
    }

    /// Overwrites the current phase.
    pub fn set(&self, phase: Phase) {
        self.current.store(phase.to_bits(), Ordering::SeqCst);
    }
}

impl Default for PhaseState {
    fn default() -> Self {
        Self::new(Phase::Red)
    }
}

impl std::fmt::Debug for PhaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseState")
            .field("current", &self.current())
            .finish()
    }
}
