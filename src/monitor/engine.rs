//! The poll loop
//!
//! A [`Monitor`] owns the configuration, the evaluators and the state of
//! every check. Each cycle evaluates HTTP checks, then topic liveness
//! checks, then event watches, in configuration order, and notifies on
//! transitions. A failing check never stops the cycle.

use crate::checks::{
    EventMatcher, EventWatchEvaluator, HttpCheckEvaluator, HttpTransport, StreamConnector,
    StreamLivenessEvaluator, StreamPosition, StreamTarget, StructuredDecoder,
};
use crate::clock::Clock;
use crate::config::{ButterbotConfig, Config};
use crate::monitor::scheduler::Ticker;
use crate::monitor::store::{CheckStore, EventWatchId, HttpCheckId, StreamCheckId};
use crate::monitor::transition::{http_transition, stream_transition};
use crate::notify::{NotificationSink, NotifierRegistry, WebhookDispatcher};
use crate::telemetry::{self, CheckKind};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// External capabilities the monitor runs on
#[derive(Clone)]
pub struct Collaborators {
    /// HTTP requests
    pub http: Arc<dyn HttpTransport>,
    /// Topic readers
    pub streams: Arc<dyn StreamConnector>,
    /// Event payload decoding
    pub decoder: Arc<dyn StructuredDecoder>,
    /// Webhook delivery
    pub sink: Arc<dyn NotificationSink>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

/// What happened during one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Up/down transitions
    pub transitions: usize,
    /// Event rule matches
    pub event_matches: usize,
    /// Notifiers a message was handed to
    pub notifications: usize,
}

impl CycleReport {
    fn add_notifications(&mut self, sent: usize) {
        self.notifications += sent;
    }
}

/// Monitors every configured check
pub struct Monitor {
    checks: ButterbotConfig,
    registry: NotifierRegistry,
    dispatcher: WebhookDispatcher,
    http: HttpCheckEvaluator,
    liveness: StreamLivenessEvaluator,
    events: EventWatchEvaluator,
    stream_targets: Vec<StreamTarget>,
    event_targets: Vec<StreamTarget>,
    matchers: Vec<EventMatcher>,
    clock: Arc<dyn Clock>,
    store: CheckStore,
}

impl Monitor {
    /// Build a monitor for `config`; every check starts up
    pub fn new(config: &Config, collaborators: Collaborators) -> Self {
        let checks = config.butterbot.clone();
        let daemon = &config.daemon;

        let stream_targets = checks
            .kafka_topic_checks
            .iter()
            .map(|check| StreamTarget::for_topic_check(&check.parameters))
            .collect();
        let event_targets = checks
            .kafka_events
            .iter()
            .map(|watch| StreamTarget::for_event_watch(watch, &daemon.group_id))
            .collect();
        let matchers: Vec<EventMatcher> = checks
            .kafka_events
            .iter()
            .map(|watch| EventMatcher::new(watch.events.clone(), collaborators.decoder.clone()))
            .collect();
        for (watch, matcher) in checks.kafka_events.iter().zip(&matchers) {
            debug!(topic = %watch.topic, rules = %matcher.summary(), "Event watch configured");
        }

        Self {
            registry: NotifierRegistry::new(checks.notifiers.clone()),
            dispatcher: WebhookDispatcher::new(collaborators.sink),
            http: HttpCheckEvaluator::new(collaborators.http),
            liveness: StreamLivenessEvaluator::new(
                collaborators.streams.clone(),
                collaborators.clock.clone(),
                daemon.read_timeout(),
                daemon.max_drain(),
            ),
            events: EventWatchEvaluator::new(
                collaborators.streams,
                daemon.read_timeout(),
                daemon.max_drain(),
            ),
            store: CheckStore::from_config(&checks),
            stream_targets,
            event_targets,
            matchers,
            clock: collaborators.clock,
            checks,
        }
    }

    /// State of every check
    pub fn store(&self) -> &CheckStore {
        &self.store
    }

    /// Run one cycle per tick until the ticker ends; returns the number of cycles run
    pub async fn run<T: Ticker + ?Sized>(&mut self, ticker: &mut T) -> usize {
        let mut cycles = 0;
        while ticker.tick().await {
            let report = self.run_cycle().await;
            cycles += 1;
            debug!(
                cycle = cycles,
                transitions = report.transitions,
                event_matches = report.event_matches,
                notifications = report.notifications,
                "Cycle complete"
            );
        }
        cycles
    }

    /// Evaluate every check once
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();
        self.run_http_checks(&mut report).await;
        self.run_stream_checks(&mut report).await;
        self.run_event_watches(&mut report).await;
        report
    }

    async fn run_http_checks(&mut self, report: &mut CycleReport) {
        for (index, check) in self.checks.http_checks.iter().enumerate() {
            let result = self.http.evaluate(&check.parameters).await;
            telemetry::record_check(CheckKind::Http, result.outcome());

            let Some(status) = self.store.http_mut(HttpCheckId::new(index)) else {
                continue;
            };
            let transition = http_transition(status.is_up, &result);
            let (Some(is_up), Some(message)) = (transition.is_up(), transition.message(&check.name))
            else {
                if let Some(failure) = &result.failure {
                    warn!(
                        check = %check.name,
                        kind = %CheckKind::Http,
                        error = %failure,
                        "{}",
                        result.detail
                    );
                } else if !result.succeeded {
                    info!(check = %check.name, kind = %CheckKind::Http, "{}", result.detail);
                } else {
                    debug!(check = %check.name, kind = %CheckKind::Http, "{}", result.detail);
                }
                continue;
            };

            status.is_up = is_up;
            status.last_message = message.clone();
            info!(
                check = %check.name,
                kind = %CheckKind::Http,
                detail = %result.detail,
                "{}",
                message
            );
            telemetry::record_transition(CheckKind::Http, status.is_up);
            report.transitions += 1;

            let sent = self
                .dispatcher
                .notify(&self.registry, &check.notify, &message)
                .await;
            report.add_notifications(sent);
        }
    }

    async fn run_stream_checks(&mut self, report: &mut CycleReport) {
        for (index, check) in self.checks.kafka_topic_checks.iter().enumerate() {
            let id = StreamCheckId::new(index);
            let Some(previous) = self.store.stream(id).cloned() else {
                continue;
            };

            let result = self
                .liveness
                .evaluate(
                    &self.stream_targets[index],
                    previous.offset,
                    previous.last_message_time,
                )
                .await;

            let outcome = if let Some(failure) = &result.transport_failure {
                error!(
                    check = %check.name,
                    kind = %CheckKind::Stream,
                    error = %failure,
                    "Failed to read topic"
                );
                "transport_error"
            } else if result.records > 0 {
                "advanced"
            } else {
                "idle"
            };
            telemetry::record_check(CheckKind::Stream, outcome);

            let transition = stream_transition(
                &previous,
                &result,
                self.clock.now(),
                check.parameters.stall_timeout(),
            );

            let Some(state) = self.store.stream_mut(id) else {
                continue;
            };
            state.offset = result.offset;
            state.last_message_time = result.last_message_time;

            let (Some(is_up), Some(message)) = (transition.is_up(), transition.message(&check.name))
            else {
                debug!(
                    check = %check.name,
                    kind = %CheckKind::Stream,
                    offset = result.offset,
                    records = result.records,
                    "No transition"
                );
                continue;
            };

            state.is_up = is_up;
            info!(
                check = %check.name,
                kind = %CheckKind::Stream,
                offset = result.offset,
                "{}",
                message
            );
            telemetry::record_transition(CheckKind::Stream, state.is_up);
            report.transitions += 1;

            let sent = self
                .dispatcher
                .notify(&self.registry, &check.notify, &message)
                .await;
            report.add_notifications(sent);
        }
    }

    async fn run_event_watches(&mut self, report: &mut CycleReport) {
        for (index, watch) in self.checks.kafka_events.iter().enumerate() {
            let id = EventWatchId::new(index);
            let position = self
                .store
                .event(id)
                .and_then(|cursor| cursor.next_offset)
                .map_or(StreamPosition::Resume, StreamPosition::Offset);

            let result = self
                .events
                .evaluate(&self.event_targets[index], &self.matchers[index], position)
                .await;

            if let (Some(cursor), Some(next)) = (self.store.event_mut(id), result.next_offset) {
                cursor.next_offset = Some(next);
            }

            let outcome = if let Some(failure) = &result.transport_failure {
                error!(
                    topic = %watch.topic,
                    kind = %CheckKind::Event,
                    error = %failure,
                    "Failed to read topic"
                );
                "transport_error"
            } else if result.status() {
                "matched"
            } else {
                "no_match"
            };
            telemetry::record_check(CheckKind::Event, outcome);

            let Some(found) = result.matched else {
                continue;
            };
            info!(
                topic = %watch.topic,
                kind = %CheckKind::Event,
                rule = %found.rule,
                "{}",
                found.message
            );
            telemetry::record_event_match(&found.rule);
            report.event_matches += 1;

            let sent = self
                .dispatcher
                .notify(&self.registry, &found.notify, &found.message)
                .await;
            report.add_notifications(sent);
        }
    }
}
