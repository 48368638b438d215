//! Kafka adapter
//!
//! Implements the stream reader capability on top of `rdkafka`.

pub mod config;
pub mod reader;

pub use config::{client_settings, ConfigError, SaslMechanism, SecurityProtocol};
pub use reader::{KafkaConnector, KafkaStreamReader};
