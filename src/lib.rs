//! `trafficlight` - A randomized traffic signal with blocking observers
//!
//! The core is a [`phase::SignalController`] that toggles between red and
//! green on its own thread and publishes each change through a
//! [`phase::PhaseChannel`], letting any number of observer threads block
//! until the light turns green.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod phase;
