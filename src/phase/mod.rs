//! Traffic signal core
//!
//! A two-phase signal whose phase toggles on a randomized timer, and the
//! blocking channel observers use to wait for a particular phase.
//!
//! # Architecture
//!
//! - [`Phase`] / [`PhaseState`]: the red/green value and its atomic cell
//! - [`PhaseChannel`]: blocking hand-off queue, each event consumed once
//! - [`CycleRange`]: randomized phase duration bounds
//! - [`SignalController`]: owns the timing thread and exposes the waits

pub mod channel;
pub mod controller;
pub mod state;
pub mod timing;

pub use channel::{DeliveryOrder, PhaseChannel};
pub use controller::{ControllerConfig, SignalController};
pub use state::{Phase, PhaseState};
pub use timing::CycleRange;
