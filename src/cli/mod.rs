//! Command-line interface for `trafficlight`
//!
//! Argument parsing and command handlers for the driver binary.

pub mod args;
pub mod commands;
