//! Counters for check outcomes, transitions and notifications
//!
//! All counters go through the `metrics` facade. Nothing is recorded unless
//! a recorder is installed; the `prometheus` feature installs one from the
//! binary when `daemon.metrics_listen` is set.
//!
//! # Metrics
//!
//! - `butterbot_checks_total`: evaluations by check kind and outcome
//! - `butterbot_transitions_total`: confirmed transitions by check kind and new state
//! - `butterbot_notifications_total`: webhook deliveries by outcome
//! - `butterbot_event_matches_total`: event rule matches by rule name

use metrics::increment_counter;

/// Kind of check, used as a metric label and in log fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    /// HTTP endpoint check
    Http,
    /// Kafka topic liveness check
    Stream,
    /// Kafka event watch
    Event,
}

impl CheckKind {
    /// Label value for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Stream => "stream",
            Self::Event => "event",
        }
    }
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Records one evaluation of a check
pub fn record_check(kind: CheckKind, outcome: &'static str) {
    increment_counter!(
        "butterbot_checks_total",
        "kind" => kind.as_str(),
        "outcome" => outcome
    );
}

/// Records a confirmed up/down transition
pub fn record_transition(kind: CheckKind, is_up: bool) {
    increment_counter!(
        "butterbot_transitions_total",
        "kind" => kind.as_str(),
        "state" => if is_up { "up" } else { "down" }
    );
}

/// Records the outcome of one webhook delivery
pub fn record_notification(outcome: &'static str) {
    increment_counter!("butterbot_notifications_total", "outcome" => outcome);
}

/// Records an event rule match
pub fn record_event_match(rule: &str) {
    increment_counter!("butterbot_event_matches_total", "rule" => rule.to_string());
}

/// Install the Prometheus exporter listening on `listen`.
///
/// Only has an effect when compiled with the `prometheus` feature; an
/// unparsable address or a failed install is logged and ignored.
pub fn init_metrics_exporter(listen: Option<&str>) {
    let Some(listen) = listen else {
        return;
    };

    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;

        let addr: std::net::SocketAddr = match listen.parse() {
            Ok(addr) => addr,
            Err(e) => {
                tracing::warn!(listen = %listen, error = %e, "Invalid metrics listen address");
                return;
            }
        };
        match PrometheusBuilder::new().with_http_listener(addr).install() {
            Ok(()) => tracing::info!(listen = %addr, "Prometheus exporter installed"),
            Err(e) => tracing::warn!("Failed to install Prometheus exporter: {}", e),
        }
    }

    #[cfg(not(feature = "prometheus"))]
    tracing::warn!(
        listen = %listen,
        "metrics_listen is set but butterbot was built without the prometheus feature"
    );
}
