//! Configuration management for Butterbot
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ButterbotError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Butterbot
///
/// Holds the monitored targets and notifiers under `butterbot`, plus the
/// daemon loop settings and logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Notifiers and checks
    #[serde(default)]
    pub butterbot: ButterbotConfig,
    /// Poll loop and broker read settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Monitored targets and the notifiers they alert
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ButterbotConfig {
    /// Webhook notifiers, looked up by name
    #[serde(default)]
    pub notifiers: Vec<NotifierConfig>,

    /// HTTP endpoint checks
    #[serde(default, rename = "httpchecks", alias = "http_checks")]
    pub http_checks: Vec<HttpCheckConfig>,

    /// Kafka topic liveness checks
    #[serde(default, rename = "kafkatopicchecks", alias = "kafka_topic_checks")]
    pub kafka_topic_checks: Vec<KafkaTopicCheckConfig>,

    /// Kafka event watches
    #[serde(default, rename = "kafkaevents", alias = "kafka_events")]
    pub kafka_events: Vec<KafkaEventConfig>,
}

/// A webhook notification target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Delivery kind (`discord` is the supported text webhook)
    #[serde(rename = "type")]
    pub kind: String,

    /// Name referenced from check `notify` lists
    pub name: String,

    /// Webhook URL
    pub url: String,

    /// Content type sent with the webhook body
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Status code the webhook answers with on success
    #[serde(default = "default_notifier_status_code")]
    pub status_code: u16,
}

/// HTTP endpoint check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpCheckConfig {
    /// Check name, used in notification messages
    pub name: String,

    /// Notifier names to alert on transitions
    #[serde(default)]
    pub notify: Vec<String>,

    /// Request parameters
    pub parameters: HttpCheckParameters,
}

/// Request parameters for an HTTP check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpCheckParameters {
    /// HTTP verb (only `get` is supported)
    #[serde(default = "default_verb")]
    pub verb: String,

    /// Target URL
    pub url: String,

    /// Expected response status code
    #[serde(default = "default_expected_code")]
    pub code: u16,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub skip_verify: bool,

    /// Request timeout in seconds
    #[serde(default = "default_http_timeout")]
    pub timeout: u64,
}

impl HttpCheckParameters {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Kafka topic liveness check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KafkaTopicCheckConfig {
    /// Check name, used in notification messages
    pub name: String,

    /// Notifier names to alert on transitions
    #[serde(default)]
    pub notify: Vec<String>,

    /// Broker and topic parameters
    pub parameters: KafkaTopicParameters,
}

/// Broker and topic parameters for a liveness check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KafkaTopicParameters {
    /// Broker host
    pub host: String,

    /// Broker port
    #[serde(deserialize_with = "deserialize_port")]
    pub port: String,

    /// Topic to watch
    pub topic: String,

    /// Seconds without new records before the topic is considered down
    pub timeout: u64,

    /// Partition to read
    #[serde(default)]
    pub partition: i32,

    /// Offset the first cycle starts reading from
    #[serde(default)]
    pub start_offset: i64,

    /// Security settings
    #[serde(default)]
    pub security: Option<KafkaSecurityConfig>,
}

impl KafkaTopicParameters {
    /// Bootstrap server address
    pub fn brokers(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Stall window as a chrono duration, `None` when it cannot be represented
    pub fn stall_timeout(&self) -> Option<chrono::Duration> {
        i64::try_from(self.timeout)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }
}

/// Kafka event watch: a topic and an ordered list of event rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KafkaEventConfig {
    /// Broker host
    pub host: String,

    /// Broker port
    #[serde(deserialize_with = "deserialize_port")]
    pub port: String,

    /// Topic to scan
    pub topic: String,

    /// Partition to read
    #[serde(default)]
    pub partition: i32,

    /// Consumer group used to store the read position (defaults to `daemon.group_id`)
    #[serde(default)]
    pub group_id: Option<String>,

    /// Security settings
    #[serde(default)]
    pub security: Option<KafkaSecurityConfig>,

    /// Event rules, evaluated in declaration order
    #[serde(default)]
    pub events: Vec<EventRuleConfig>,
}

impl KafkaEventConfig {
    /// Bootstrap server address
    pub fn brokers(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A single event rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRuleConfig {
    /// Rule name, prefixed to the notification message
    pub name: String,

    /// Record key the rule applies to
    pub key: String,

    /// Field equality filters; all entries of all maps must hold
    #[serde(default)]
    pub filter: Vec<BTreeMap<String, String>>,

    /// Fields to extract into the message, in order
    #[serde(default)]
    pub extract: Vec<String>,

    /// Notifier names to alert on a match
    #[serde(default)]
    pub notify: Vec<String>,
}

impl EventRuleConfig {
    /// All filter conditions as one flat conjunction
    pub fn conditions(&self) -> impl Iterator<Item = (&String, &String)> {
        self.filter.iter().flat_map(|map| map.iter())
    }
}

/// Kafka security configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KafkaSecurityConfig {
    /// Security protocol (PLAINTEXT, SSL, SASL_PLAINTEXT, SASL_SSL)
    pub protocol: String,

    /// SASL mechanism (PLAIN, SCRAM-SHA-256, SCRAM-SHA-512)
    #[serde(default)]
    pub sasl_mechanism: Option<String>,

    /// SASL username
    #[serde(default)]
    pub sasl_username: Option<String>,

    /// SASL password (prefer env var KAFKA_SASL_PASSWORD)
    #[serde(default)]
    pub sasl_password: Option<String>,
}

/// Poll loop and broker read settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds between poll cycles
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Bounded wait for a single broker read, in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,

    /// Wall-clock cap on draining one topic within a cycle
    #[serde(default = "default_max_drain")]
    pub max_drain_secs: u64,

    /// Consumer group for event watches
    #[serde(default = "default_group_id")]
    pub group_id: String,

    /// Listen address for the Prometheus exporter
    #[serde(default)]
    pub metrics_listen: Option<String>,
}

impl DaemonConfig {
    /// Interval between poll cycles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Bounded wait for a single read
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Cap on a full drain
    pub fn max_drain(&self) -> Duration {
        Duration::from_secs(self.max_drain_secs)
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            read_timeout_ms: default_read_timeout(),
            max_drain_secs: default_max_drain(),
            group_id: default_group_id(),
            metrics_listen: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Enable JSON-formatted logs
    #[serde(default = "default_json_logs")]
    pub json_format: bool,

    /// Log file path (if None, STDOUT only)
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: default_json_logs(),
            file_path: None,
        }
    }
}

fn default_content_type() -> String {
    "application/json".to_string()
}

fn default_notifier_status_code() -> u16 {
    204
}

fn default_verb() -> String {
    "get".to_string()
}

fn default_expected_code() -> u16 {
    200
}

fn default_http_timeout() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    1
}

fn default_read_timeout() -> u64 {
    1000
}

fn default_max_drain() -> u64 {
    30
}

fn default_group_id() -> String {
    "butterbot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json_logs() -> bool {
    true
}

/// Accepts ports written either as YAML strings or integers
fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Text(String),
        Number(u16),
    }

    Ok(match Port::deserialize(deserializer)? {
        Port::Text(text) => text,
        Port::Number(number) => number.to_string(),
    })
}

/// Longest accepted timeout or interval, in seconds (ten years)
const MAX_DURATION_SECS: u64 = 10 * 365 * 24 * 60 * 60;

const VALID_SECURITY_PROTOCOLS: [&str; 4] = ["PLAINTEXT", "SSL", "SASL_PLAINTEXT", "SASL_SSL"];

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing, cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(
                ButterbotError::Config(format!("Config file not found at {}", path)).into(),
            );
        }

        let mut config = Self::from_file(path)?;
        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents).map_err(ButterbotError::from)?)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(ButterbotError::from)?;
        Self::from_yaml(&contents)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(level) = std::env::var("BUTTERBOT_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json_logs) = std::env::var("BUTTERBOT_JSON_LOGS") {
            match json_logs.parse::<bool>() {
                Ok(v) => self.logging.json_format = v,
                Err(_) => tracing::warn!("Invalid value for BUTTERBOT_JSON_LOGS: {}", json_logs),
            }
        }

        if let Ok(log_file) = std::env::var("BUTTERBOT_LOG_FILE") {
            self.logging.file_path = Some(PathBuf::from(log_file));
        }

        if let Ok(interval) = std::env::var("BUTTERBOT_POLL_INTERVAL_SECS") {
            match interval.parse::<u64>() {
                Ok(v) => self.daemon.poll_interval_secs = v,
                Err(_) => {
                    tracing::warn!("Invalid BUTTERBOT_POLL_INTERVAL_SECS: {}", interval)
                }
            }
        }

        if let Ok(timeout) = std::env::var("BUTTERBOT_READ_TIMEOUT_MS") {
            match timeout.parse::<u64>() {
                Ok(v) => self.daemon.read_timeout_ms = v,
                Err(_) => tracing::warn!("Invalid BUTTERBOT_READ_TIMEOUT_MS: {}", timeout),
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }

        if let Some(json_logs) = cli.json_logs {
            self.logging.json_format = json_logs;
        }
    }

    /// Validate the configuration
    ///
    /// Hard errors are limited to values the poll loop cannot work with.
    /// References to unknown notifiers, unsupported verbs and unsupported
    /// notifier kinds only produce warnings: they degrade a single check at
    /// runtime without stopping the daemon.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        require_duration(
            self.daemon.poll_interval_secs,
            MAX_DURATION_SECS,
            "daemon.poll_interval_secs",
        )?;
        require_duration(
            self.daemon.read_timeout_ms,
            MAX_DURATION_SECS * 1000,
            "daemon.read_timeout_ms",
        )?;
        require_duration(
            self.daemon.max_drain_secs,
            MAX_DURATION_SECS,
            "daemon.max_drain_secs",
        )?;

        let mut notifier_names = HashSet::new();
        for notifier in &self.butterbot.notifiers {
            if notifier.name.is_empty() {
                return Err(
                    ButterbotError::Config("notifier name cannot be empty".to_string()).into(),
                );
            }
            if !notifier_names.insert(notifier.name.as_str()) {
                tracing::warn!(
                    notifier = %notifier.name,
                    "Duplicate notifier name, the first definition wins"
                );
            }
            if crate::notify::NotifierKind::parse(&notifier.kind).is_none() {
                tracing::warn!(
                    notifier = %notifier.name,
                    kind = %notifier.kind,
                    "Unsupported notifier type, notifications to it will be skipped"
                );
            }
        }

        for check in &self.butterbot.http_checks {
            require_non_empty(&check.name, "httpchecks[].name")?;
            require_non_empty(&check.parameters.url, "httpchecks[].parameters.url")?;
            require_duration(
                check.parameters.timeout,
                MAX_DURATION_SECS,
                &format!("httpcheck {}: timeout", check.name),
            )?;
            if !check.parameters.verb.eq_ignore_ascii_case("get") {
                tracing::warn!(
                    check = %check.name,
                    verb = %check.parameters.verb,
                    "Unsupported HTTP verb, check will fail every cycle"
                );
            }
            warn_unknown_notifiers(&check.name, &check.notify, &notifier_names);
        }

        for check in &self.butterbot.kafka_topic_checks {
            require_non_empty(&check.name, "kafkatopicchecks[].name")?;
            require_non_empty(&check.parameters.host, "kafkatopicchecks[].parameters.host")?;
            require_non_empty(&check.parameters.topic, "kafkatopicchecks[].parameters.topic")?;
            if check.parameters.timeout > MAX_DURATION_SECS {
                return Err(ButterbotError::Config(format!(
                    "kafkatopiccheck {}: timeout must be at most {}",
                    check.name, MAX_DURATION_SECS
                ))
                .into());
            }
            validate_security(check.parameters.security.as_ref())?;
            warn_unknown_notifiers(&check.name, &check.notify, &notifier_names);
        }

        for watch in &self.butterbot.kafka_events {
            require_non_empty(&watch.host, "kafkaevents[].host")?;
            require_non_empty(&watch.topic, "kafkaevents[].topic")?;
            validate_security(watch.security.as_ref())?;
            for rule in &watch.events {
                require_non_empty(&rule.name, "kafkaevents[].events[].name")?;
                warn_unknown_notifiers(&rule.name, &rule.notify, &notifier_names);
            }
        }

        Ok(())
    }

    /// One-line summary of what will be monitored
    pub fn summary(&self) -> String {
        let rules: usize = self
            .butterbot
            .kafka_events
            .iter()
            .map(|watch| watch.events.len())
            .sum();
        format!(
            "notifiers={}, http_checks={}, topic_checks={}, event_watches={} (rules={}), interval={}s",
            self.butterbot.notifiers.len(),
            self.butterbot.http_checks.len(),
            self.butterbot.kafka_topic_checks.len(),
            self.butterbot.kafka_events.len(),
            rules,
            self.daemon.poll_interval_secs
        )
    }
}

fn require_non_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ButterbotError::Config(format!("{} cannot be empty", field)).into());
    }
    Ok(())
}

fn require_duration(value: u64, max: u64, field: &str) -> Result<()> {
    if value == 0 {
        return Err(ButterbotError::Config(format!("{} must be greater than 0", field)).into());
    }
    if value > max {
        return Err(ButterbotError::Config(format!("{} must be at most {}", field, max)).into());
    }
    Ok(())
}

fn validate_security(security: Option<&KafkaSecurityConfig>) -> Result<()> {
    if let Some(security) = security {
        let protocol = security.protocol.to_uppercase();
        if !VALID_SECURITY_PROTOCOLS.contains(&protocol.as_str()) {
            return Err(ButterbotError::Config(format!(
                "Invalid security protocol: {}. Must be one of: {}",
                security.protocol,
                VALID_SECURITY_PROTOCOLS.join(", ")
            ))
            .into());
        }
        if let Some(mechanism) = &security.sasl_mechanism {
            crate::kafka::SaslMechanism::parse(mechanism)
                .map_err(|e| ButterbotError::Config(e.to_string()))?;
        }
    }
    Ok(())
}

fn warn_unknown_notifiers(owner: &str, notify: &[String], known: &HashSet<&str>) {
    for name in notify {
        if !known.contains(name.as_str()) {
            tracing::warn!(check = %owner, notifier = %name, "Unknown notifier referenced");
        }
    }
}
