//! Event rule matching
//!
//! An event watch reads new records from a topic and compares each one
//! against its rules. A rule matches when the record key equals the rule
//! key and every filter condition holds on the decoded payload. The first
//! satisfying rule wins, and the scan stops at the first matching record;
//! anything after it is left for the next cycle.

use crate::checks::decode::{render_value, value_equals, Fields, StructuredDecoder};
use crate::checks::stream::{
    Drain, StreamConnector, StreamError, StreamPosition, StreamRecord, StreamTarget,
};
use crate::config::EventRuleConfig;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A rule that matched a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMatch {
    /// Name of the matching rule
    pub rule: String,
    /// Rendered notification message
    pub message: String,
    /// Notifiers to alert
    pub notify: Vec<String>,
}

/// Outcome of one event watch cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventResult {
    /// The match that ended the scan, if any
    pub matched: Option<EventMatch>,
    /// Position after the last record read, `None` when nothing was read
    pub next_offset: Option<i64>,
    /// Records read this cycle
    pub records: usize,
    /// Open, read or close failure
    pub transport_failure: Option<StreamError>,
}

impl EventResult {
    /// Whether a rule matched
    pub fn status(&self) -> bool {
        self.matched.is_some()
    }
}

/// Compares records against the rules of one event watch
#[derive(Clone)]
pub struct EventMatcher {
    rules: Vec<EventRuleConfig>,
    decoder: Arc<dyn StructuredDecoder>,
}

impl EventMatcher {
    /// Create a matcher for `rules`
    pub fn new(rules: Vec<EventRuleConfig>, decoder: Arc<dyn StructuredDecoder>) -> Self {
        Self { rules, decoder }
    }

    /// Find the first rule satisfied by `record`.
    ///
    /// A payload that cannot be decoded matches nothing.
    pub fn match_record(&self, record: &StreamRecord) -> Option<EventMatch> {
        let mut fields: Option<Fields> = None;

        for rule in &self.rules {
            if record.key != rule.key.as_bytes() {
                continue;
            }

            if fields.is_none() {
                match self.decoder.decode(&record.value) {
                    Ok(decoded) => fields = Some(decoded),
                    Err(e) => {
                        warn!(offset = record.offset, error = %e, "Skipping undecodable record");
                        return None;
                    }
                }
            }
            let payload = fields.as_ref()?;

            let satisfied = rule.conditions().all(|(field, expected)| {
                payload
                    .get(field)
                    .is_some_and(|value| value_equals(value, expected))
            });
            if satisfied {
                return Some(EventMatch {
                    rule: rule.name.clone(),
                    message: build_message(rule, payload),
                    notify: rule.notify.clone(),
                });
            }
        }

        None
    }

    /// Human readable description of the rules, for logging
    pub fn summary(&self) -> String {
        if self.rules.is_empty() {
            return "no rules".to_string();
        }

        self.rules
            .iter()
            .map(|rule| {
                let mut parts = vec![format!("key={}", rule.key)];
                parts.extend(rule.conditions().map(|(f, v)| format!("{}={}", f, v)));
                if !rule.extract.is_empty() {
                    parts.push(format!("extract={}", rule.extract.join(",")));
                }
                format!("{} ({})", rule.name, parts.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// `"<rule>: "` followed by `"<field>: <value> "` for every extract field
fn build_message(rule: &EventRuleConfig, payload: &Fields) -> String {
    let mut message = format!("{}: ", rule.name);
    for field in &rule.extract {
        let _ = write!(message, "{}: {} ", field, render_value(payload.get(field)));
    }
    message
}

/// Runs event watches over a [`StreamConnector`]
#[derive(Clone)]
pub struct EventWatchEvaluator {
    connector: Arc<dyn StreamConnector>,
    read_timeout: Duration,
    max_drain: Duration,
}

impl EventWatchEvaluator {
    /// Create an evaluator
    pub fn new(connector: Arc<dyn StreamConnector>, read_timeout: Duration, max_drain: Duration) -> Self {
        Self {
            connector,
            read_timeout,
            max_drain,
        }
    }

    /// Scan new records from `position` until one matches or the topic is drained
    pub async fn evaluate(
        &self,
        target: &StreamTarget,
        matcher: &EventMatcher,
        position: StreamPosition,
    ) -> EventResult {
        let mut result = EventResult::default();

        let mut reader = match self.connector.open_at(target, position).await {
            Ok(reader) => reader,
            Err(e) => {
                warn!(topic = %target.topic, error = %e, "Failed to open reader");
                result.transport_failure = Some(e);
                return result;
            }
        };

        let mut drain = Drain::new(reader.as_mut(), self.read_timeout, self.max_drain);
        while let Some(record) = drain.next().await {
            result.next_offset = Some(record.next_offset());
            if let Some(found) = matcher.match_record(&record) {
                info!(
                    topic = %target.topic,
                    rule = %found.rule,
                    offset = record.offset,
                    "Event matched"
                );
                result.matched = Some(found);
                break;
            }
        }
        result.records = drain.records_read();
        result.transport_failure = drain.finish();

        if let Err(e) = reader.close().await {
            warn!(topic = %target.topic, error = %e, "Failed to close reader");
            result.transport_failure = Some(e);
        }

        debug!(
            topic = %target.topic,
            records = result.records,
            matched = result.status(),
            "Event scan finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::decode::JsonDecoder;
    use crate::test_utils::{record, ScriptedConnector};
    use std::collections::BTreeMap;

    fn rule(name: &str, key: &str, filter: &[(&str, &str)], extract: &[&str]) -> EventRuleConfig {
        EventRuleConfig {
            name: name.to_string(),
            key: key.to_string(),
            filter: filter
                .iter()
                .map(|(f, v)| BTreeMap::from([(f.to_string(), v.to_string())]))
                .collect(),
            extract: extract.iter().map(|s| s.to_string()).collect(),
            notify: vec!["ops".to_string()],
        }
    }

    fn matcher(rules: Vec<EventRuleConfig>) -> EventMatcher {
        EventMatcher::new(rules, Arc::new(JsonDecoder))
    }

    fn target() -> StreamTarget {
        StreamTarget {
            brokers: "kafka:9092".to_string(),
            topic: "deployments".to_string(),
            partition: 0,
            group_id: Some("butterbot".to_string()),
            security: None,
        }
    }

    #[test]
    fn test_match_renders_extract_fields() {
        let matcher = matcher(vec![rule("rule", "k", &[("a", "1")], &["x", "y"])]);
        let found = matcher
            .match_record(&record("k", r#"{"a":"1","x":"1","y":"2"}"#, 0))
            .unwrap();

        assert_eq!(found.rule, "rule");
        assert_eq!(found.message, "rule: x: 1 y: 2 ");
        assert_eq!(found.notify, vec!["ops".to_string()]);
    }

    #[test]
    fn test_match_renders_arrays() {
        let matcher = matcher(vec![rule(
            "Test Event",
            "testKey",
            &[("filterField", "filterValue")],
            &["extractField"],
        )]);
        let payload = r#"{"filterField":"filterValue","extractField":["extractValueElement1","extractValueElement2"]}"#;

        let found = matcher.match_record(&record("testKey", payload, 4)).unwrap();
        assert_eq!(
            found.message,
            "Test Event: extractField: [extractValueElement1 extractValueElement2] "
        );
    }

    #[test]
    fn test_failing_filter_does_not_match() {
        let matcher = matcher(vec![rule("rule", "k", &[("a", "1"), ("b", "2")], &[])]);
        assert!(matcher
            .match_record(&record("k", r#"{"a":"1","b":"3"}"#, 0))
            .is_none());
    }

    #[test]
    fn test_missing_filter_field_does_not_match() {
        let matcher = matcher(vec![rule("rule", "k", &[("a", "1")], &[])]);
        assert!(matcher.match_record(&record("k", r#"{"b":"1"}"#, 0)).is_none());
    }

    #[test]
    fn test_missing_extract_field_renders_empty() {
        let matcher = matcher(vec![rule("rule", "k", &[], &["gone"])]);
        let found = matcher.match_record(&record("k", "{}", 0)).unwrap();
        assert_eq!(found.message, "rule: gone:  ");
    }

    #[test]
    fn test_key_mismatch_does_not_match() {
        let matcher = matcher(vec![rule("rule", "k", &[], &[])]);
        assert!(matcher.match_record(&record("other", "{}", 0)).is_none());
    }

    #[test]
    fn test_numeric_field_matches_text() {
        let matcher = matcher(vec![rule("rule", "k", &[("attempt", "3")], &["attempt"])]);
        let found = matcher
            .match_record(&record("k", r#"{"attempt":3}"#, 0))
            .unwrap();
        assert_eq!(found.message, "rule: attempt: 3 ");
    }

    #[test]
    fn test_malformed_payload_matches_nothing() {
        let matcher = matcher(vec![rule("rule", "k", &[], &[])]);
        assert!(matcher.match_record(&record("k", "{oops", 0)).is_none());
    }

    #[test]
    fn test_first_satisfying_rule_wins() {
        let matcher = matcher(vec![
            rule("strict", "k", &[("status", "failed"), ("env", "prod")], &[]),
            rule("loose", "k", &[("status", "failed")], &[]),
            rule("looser", "k", &[], &[]),
        ]);
        let found = matcher
            .match_record(&record("k", r#"{"status":"failed","env":"dev"}"#, 0))
            .unwrap();
        assert_eq!(found.rule, "loose");
    }

    #[test]
    fn test_summary() {
        let matcher = matcher(vec![rule("deploy", "deployments", &[("status", "failed")], &["service"])]);
        assert_eq!(
            matcher.summary(),
            "deploy (key=deployments, status=failed, extract=service)"
        );
        assert_eq!(EventMatcher::new(vec![], Arc::new(JsonDecoder)).summary(), "no rules");
    }

    #[tokio::test]
    async fn test_evaluate_stops_at_first_match() {
        let connector = Arc::new(ScriptedConnector::new().session(vec![
            Ok(record("k", r#"{"status":"ok"}"#, 10)),
            Ok(record("k", r#"{"status":"failed"}"#, 11)),
            Ok(record("k", r#"{"status":"failed"}"#, 12)),
        ]));
        let evaluator = EventWatchEvaluator::new(
            connector.clone(),
            Duration::from_millis(50),
            Duration::from_secs(5),
        );
        let matcher = matcher(vec![rule("failed", "k", &[("status", "failed")], &["status"])]);

        let result = evaluator
            .evaluate(&target(), &matcher, StreamPosition::Resume)
            .await;

        assert!(result.status());
        assert_eq!(result.matched.as_ref().unwrap().message, "failed: status: failed ");
        assert_eq!(result.next_offset, Some(12));
        assert_eq!(result.records, 2);
        assert_eq!(connector.opened(), vec![StreamPosition::Resume]);
        assert_eq!(connector.closed(), 1);
    }

    #[tokio::test]
    async fn test_evaluate_without_match_consumes_everything() {
        let connector = Arc::new(ScriptedConnector::new().session(vec![
            Ok(record("k", r#"{"status":"ok"}"#, 0)),
            Ok(record("other", r#"{"status":"failed"}"#, 1)),
        ]));
        let evaluator = EventWatchEvaluator::new(
            connector,
            Duration::from_millis(50),
            Duration::from_secs(5),
        );
        let matcher = matcher(vec![rule("failed", "k", &[("status", "failed")], &[])]);

        let result = evaluator
            .evaluate(&target(), &matcher, StreamPosition::Offset(0))
            .await;

        assert!(!result.status());
        assert!(result.matched.is_none());
        assert_eq!(result.next_offset, Some(2));
        assert!(result.transport_failure.is_none());
    }

    #[tokio::test]
    async fn test_evaluate_open_failure() {
        let connector = Arc::new(
            ScriptedConnector::new().failing_open(StreamError::Transport("refused".to_string())),
        );
        let evaluator = EventWatchEvaluator::new(
            connector,
            Duration::from_millis(50),
            Duration::from_secs(5),
        );

        let result = evaluator
            .evaluate(&target(), &matcher(vec![]), StreamPosition::Resume)
            .await;

        assert!(!result.status());
        assert!(result.next_offset.is_none());
        assert!(result.transport_failure.is_some());
    }
}
