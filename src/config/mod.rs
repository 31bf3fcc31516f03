//! Configuration for the `trafficlight` driver
//!
//! YAML schema, loading, and validation. The signal core itself takes a
//! [`ControllerConfig`](crate::phase::ControllerConfig); this module turns a
//! config file plus CLI overrides into one.

pub mod loader;
pub mod schema;

pub use loader::{ConfigLoader, LoaderOptions};
pub use schema::{ConfigOverrides, CycleSpec, SignalConfig};
