//! Butterbot - liveness monitoring daemon library
//!
//! Checks HTTP endpoints, watches Kafka topics for forward progress and
//! scans Kafka topics for events matching configured rules. Transitions
//! between up and down, and matching events, are posted to webhooks.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `checks`: Evaluators for HTTP checks, topic liveness and event rules
//! - `monitor`: Per-check state, transition rules and the poll loop
//! - `notify`: Notifier registry and webhook delivery
//! - `kafka`: rdkafka-backed stream readers
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use butterbot::Config;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!     println!("{}", config.summary());
//!     Ok(())
//! }
//! ```

pub mod checks;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod kafka;
pub mod logging;
pub mod monitor;
pub mod notify;
pub mod telemetry;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{ButterbotError, Result};
pub use monitor::{Collaborators, FixedTicks, IntervalTicker, Monitor, Ticker};

#[cfg(test)]
pub mod test_utils;
