//! Observability for `trafficlight`
//!
//! Logging, metrics, and a structured JSONL event stream for watching the
//! signal cycle and its observers.

pub mod events;
pub mod logging;
pub mod metrics;

pub use events::{Event, EventEmitter};
pub use logging::{LogFormat, init_logging};
pub use metrics::init_metrics;
