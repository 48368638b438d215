//! librdkafka client settings for topic readers.
//!
//! Readers are assigned a single partition explicitly, so the group id only
//! matters for readers that store their position (event watches).

use crate::checks::StreamTarget;
use crate::config::KafkaSecurityConfig;
use thiserror::Error;

/// Environment variable consulted when no SASL password is configured
pub const SASL_PASSWORD_ENV: &str = "KAFKA_SASL_PASSWORD";

/// Group id used by readers that do not store positions
pub const LIVENESS_GROUP_ID: &str = "butterbot-liveness";

/// Errors that can occur while building client settings.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Missing required configuration value.
    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    /// Invalid security protocol specified.
    #[error("Invalid security protocol: {0}")]
    InvalidSecurityProtocol(String),

    /// Invalid SASL mechanism specified.
    #[error("Invalid SASL mechanism: {0}")]
    InvalidSaslMechanism(String),
}

/// Security protocol for Kafka connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SecurityProtocol {
    /// No encryption or authentication.
    #[default]
    Plaintext,
    /// TLS encryption without SASL.
    Ssl,
    /// SASL authentication without TLS.
    SaslPlaintext,
    /// SASL authentication with TLS encryption.
    SaslSsl,
}

impl SecurityProtocol {
    /// Parse a configured protocol name, case-insensitively
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_uppercase().as_str() {
            "PLAINTEXT" => Ok(Self::Plaintext),
            "SSL" => Ok(Self::Ssl),
            "SASL_PLAINTEXT" => Ok(Self::SaslPlaintext),
            "SASL_SSL" => Ok(Self::SaslSsl),
            _ => Err(ConfigError::InvalidSecurityProtocol(value.to_string())),
        }
    }

    /// Returns the Kafka configuration string for this protocol.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plaintext => "PLAINTEXT",
            Self::Ssl => "SSL",
            Self::SaslPlaintext => "SASL_PLAINTEXT",
            Self::SaslSsl => "SASL_SSL",
        }
    }

    /// Whether the protocol authenticates with SASL
    pub fn uses_sasl(&self) -> bool {
        matches!(self, Self::SaslPlaintext | Self::SaslSsl)
    }
}

/// SASL authentication mechanism.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SaslMechanism {
    /// PLAIN mechanism (username/password in clear text).
    Plain,
    /// SCRAM-SHA-256 mechanism.
    #[default]
    ScramSha256,
    /// SCRAM-SHA-512 mechanism.
    ScramSha512,
}

impl SaslMechanism {
    /// Parse a configured mechanism name, case-insensitively
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.to_uppercase().as_str() {
            "PLAIN" => Ok(Self::Plain),
            "SCRAM-SHA-256" => Ok(Self::ScramSha256),
            "SCRAM-SHA-512" => Ok(Self::ScramSha512),
            _ => Err(ConfigError::InvalidSaslMechanism(value.to_string())),
        }
    }

    /// Returns the Kafka configuration string for this mechanism.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "PLAIN",
            Self::ScramSha256 => "SCRAM-SHA-256",
            Self::ScramSha512 => "SCRAM-SHA-512",
        }
    }
}

/// Key-value settings for an rdkafka `ClientConfig`.
///
/// # Errors
///
/// Returns `ConfigError` if the security settings are invalid or SASL
/// credentials are missing.
pub fn client_settings(target: &StreamTarget) -> Result<Vec<(String, String)>, ConfigError> {
    let group_id = target
        .group_id
        .clone()
        .unwrap_or_else(|| LIVENESS_GROUP_ID.to_string());

    let mut settings = vec![
        ("bootstrap.servers".to_string(), target.brokers.clone()),
        ("group.id".to_string(), group_id),
        ("client.id".to_string(), "butterbot".to_string()),
        ("auto.offset.reset".to_string(), "earliest".to_string()),
        ("enable.auto.commit".to_string(), "false".to_string()),
        ("enable.auto.offset.store".to_string(), "false".to_string()),
        ("enable.partition.eof".to_string(), "false".to_string()),
    ];

    if let Some(security) = &target.security {
        settings.extend(security_settings(security)?);
    }

    Ok(settings)
}

fn security_settings(security: &KafkaSecurityConfig) -> Result<Vec<(String, String)>, ConfigError> {
    let protocol = SecurityProtocol::parse(&security.protocol)?;
    let mut settings = vec![(
        "security.protocol".to_string(),
        protocol.as_str().to_string(),
    )];

    if protocol.uses_sasl() {
        let mechanism = match &security.sasl_mechanism {
            Some(mechanism) => SaslMechanism::parse(mechanism)?,
            None => SaslMechanism::default(),
        };
        let username = security
            .sasl_username
            .clone()
            .ok_or_else(|| ConfigError::MissingConfig("sasl_username".to_string()))?;
        let password = match &security.sasl_password {
            Some(password) => password.clone(),
            None => std::env::var(SASL_PASSWORD_ENV)
                .map_err(|_| ConfigError::MissingConfig(SASL_PASSWORD_ENV.to_string()))?,
        };

        settings.push(("sasl.mechanism".to_string(), mechanism.as_str().to_string()));
        settings.push(("sasl.username".to_string(), username));
        settings.push(("sasl.password".to_string(), password));
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn target(group_id: Option<&str>, security: Option<KafkaSecurityConfig>) -> StreamTarget {
        StreamTarget {
            brokers: "kafka:9093".to_string(),
            topic: "orders".to_string(),
            partition: 0,
            group_id: group_id.map(str::to_string),
            security,
        }
    }

    fn lookup<'a>(settings: &'a [(String, String)], key: &str) -> Option<&'a str> {
        settings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_plaintext_settings() {
        let settings = client_settings(&target(None, None)).unwrap();

        assert_eq!(lookup(&settings, "bootstrap.servers"), Some("kafka:9093"));
        assert_eq!(lookup(&settings, "group.id"), Some(LIVENESS_GROUP_ID));
        assert_eq!(lookup(&settings, "enable.auto.commit"), Some("false"));
        assert_eq!(lookup(&settings, "auto.offset.reset"), Some("earliest"));
        assert!(lookup(&settings, "security.protocol").is_none());
    }

    #[test]
    fn test_group_id_is_used() {
        let settings = client_settings(&target(Some("butterbot"), None)).unwrap();
        assert_eq!(lookup(&settings, "group.id"), Some("butterbot"));
    }

    #[test]
    fn test_sasl_settings() {
        let security = KafkaSecurityConfig {
            protocol: "sasl_ssl".to_string(),
            sasl_mechanism: Some("SCRAM-SHA-512".to_string()),
            sasl_username: Some("monitor".to_string()),
            sasl_password: Some("secret".to_string()),
        };
        let settings = client_settings(&target(None, Some(security))).unwrap();

        assert_eq!(lookup(&settings, "security.protocol"), Some("SASL_SSL"));
        assert_eq!(lookup(&settings, "sasl.mechanism"), Some("SCRAM-SHA-512"));
        assert_eq!(lookup(&settings, "sasl.username"), Some("monitor"));
        assert_eq!(lookup(&settings, "sasl.password"), Some("secret"));
    }

    #[test]
    #[serial]
    fn test_sasl_password_from_env() {
        std::env::set_var(SASL_PASSWORD_ENV, "from-env");
        let security = KafkaSecurityConfig {
            protocol: "SASL_PLAINTEXT".to_string(),
            sasl_mechanism: None,
            sasl_username: Some("monitor".to_string()),
            sasl_password: None,
        };
        let settings = client_settings(&target(None, Some(security))).unwrap();
        std::env::remove_var(SASL_PASSWORD_ENV);

        assert_eq!(lookup(&settings, "sasl.mechanism"), Some("SCRAM-SHA-256"));
        assert_eq!(lookup(&settings, "sasl.password"), Some("from-env"));
    }

    #[test]
    #[serial]
    fn test_missing_sasl_password() {
        std::env::remove_var(SASL_PASSWORD_ENV);
        let security = KafkaSecurityConfig {
            protocol: "SASL_SSL".to_string(),
            sasl_mechanism: None,
            sasl_username: Some("monitor".to_string()),
            sasl_password: None,
        };
        let err = client_settings(&target(None, Some(security))).unwrap_err();
        assert_eq!(err, ConfigError::MissingConfig(SASL_PASSWORD_ENV.to_string()));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            SecurityProtocol::parse("TLS"),
            Err(ConfigError::InvalidSecurityProtocol(_))
        ));
        assert!(matches!(
            SaslMechanism::parse("GSSAPI"),
            Err(ConfigError::InvalidSaslMechanism(_))
        ));
        assert_eq!(SecurityProtocol::parse("ssl").unwrap(), SecurityProtocol::Ssl);
        assert!(!SecurityProtocol::Ssl.uses_sasl());
    }
}
