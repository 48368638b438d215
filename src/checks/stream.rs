//! Stream readers and topic liveness
//!
//! A broker never says "this topic is dead". The only evidence is the
//! absence of forward progress, so the evaluator here only reports how far
//! it got and when it last saw a record; the monitor compares two cycles to
//! decide liveness.
//!
//! Reading is done through a [`Drain`]: a bounded sequence of records that
//! ends when a read times out (caught up), a transport error occurs, or a
//! wall-clock deadline passes.

use crate::clock::Clock;
use crate::config::{KafkaEventConfig, KafkaSecurityConfig, KafkaTopicParameters};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Errors returned by stream readers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// No record arrived within the bounded wait
    #[error("no record within {0:?}")]
    Timeout(Duration),

    /// The broker connection failed
    #[error("stream transport error: {0}")]
    Transport(String),
}

/// A record read from a topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    /// Record key (empty when the record has none)
    pub key: Vec<u8>,
    /// Record payload
    pub value: Vec<u8>,
    /// Offset of this record
    pub offset: i64,
}

impl StreamRecord {
    /// Offset of the record that follows this one
    pub fn next_offset(&self) -> i64 {
        self.offset + 1
    }
}

/// Where a reader starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPosition {
    /// An explicit offset
    Offset(i64),
    /// The consumer group's stored position, earliest when none is stored
    Resume,
}

/// Broker, topic and partition a reader is opened on
#[derive(Debug, Clone, PartialEq)]
pub struct StreamTarget {
    /// Bootstrap servers
    pub brokers: String,
    /// Topic name
    pub topic: String,
    /// Partition number
    pub partition: i32,
    /// Consumer group storing the read position, if any
    pub group_id: Option<String>,
    /// Security settings
    pub security: Option<KafkaSecurityConfig>,
}

impl StreamTarget {
    /// Target of a topic liveness check; positions are kept in memory only
    pub fn for_topic_check(params: &KafkaTopicParameters) -> Self {
        Self {
            brokers: params.brokers(),
            topic: params.topic.clone(),
            partition: params.partition,
            group_id: None,
            security: params.security.clone(),
        }
    }

    /// Target of an event watch; positions are also stored in `group`
    pub fn for_event_watch(watch: &KafkaEventConfig, default_group: &str) -> Self {
        Self {
            brokers: watch.brokers(),
            topic: watch.topic.clone(),
            partition: watch.partition,
            group_id: Some(
                watch
                    .group_id
                    .clone()
                    .unwrap_or_else(|| default_group.to_string()),
            ),
            security: watch.security.clone(),
        }
    }
}

/// Opens readers on a topic
#[async_trait]
pub trait StreamConnector: Send + Sync {
    /// Open a reader positioned at `position`
    async fn open_at(
        &self,
        target: &StreamTarget,
        position: StreamPosition,
    ) -> Result<Box<dyn StreamReader>, StreamError>;
}

/// An open read cursor
#[async_trait]
pub trait StreamReader: Send {
    /// Read the next record, waiting at most `timeout`.
    ///
    /// Returns `StreamError::Timeout` when nothing arrived in time.
    async fn read_next(&mut self, timeout: Duration) -> Result<StreamRecord, StreamError>;

    /// Release the reader
    async fn close(&mut self) -> Result<(), StreamError>;
}

/// Why a drain stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainEnd {
    /// A read timed out: no more records are available right now
    CaughtUp,
    /// The wall-clock deadline passed
    DeadlineReached,
    /// The reader failed
    Failed(StreamError),
}

/// Bounded iteration over the records a reader has available.
///
/// Each read waits at most the per-read timeout and never past the
/// deadline. Once the drain has ended it yields nothing more; a new drain
/// over the same reader picks up where this one stopped. A duration too
/// large to place on the clock leaves the drain without a deadline.
pub struct Drain<'r> {
    reader: &'r mut dyn StreamReader,
    read_timeout: Duration,
    deadline: Option<Instant>,
    records: usize,
    end: Option<DrainEnd>,
}

impl<'r> Drain<'r> {
    /// Start draining `reader` for at most `max_duration`
    pub fn new(reader: &'r mut dyn StreamReader, read_timeout: Duration, max_duration: Duration) -> Self {
        Self {
            reader,
            read_timeout,
            deadline: Instant::now().checked_add(max_duration),
            records: 0,
            end: None,
        }
    }

    /// Next available record, `None` once the drain has ended
    pub async fn next(&mut self) -> Option<StreamRecord> {
        if self.end.is_some() {
            return None;
        }

        if self.deadline_passed() {
            self.end = Some(DrainEnd::DeadlineReached);
            return None;
        }

        let wait = match self.deadline {
            Some(deadline) => self.read_timeout.min(deadline - Instant::now()),
            None => self.read_timeout,
        };
        match self.reader.read_next(wait).await {
            Ok(record) => {
                self.records += 1;
                Some(record)
            }
            Err(StreamError::Timeout(_)) => {
                self.end = Some(if self.deadline_passed() {
                    DrainEnd::DeadlineReached
                } else {
                    DrainEnd::CaughtUp
                });
                None
            }
            Err(e) => {
                self.end = Some(DrainEnd::Failed(e));
                None
            }
        }
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Records yielded so far
    pub fn records_read(&self) -> usize {
        self.records
    }

    /// Why the drain stopped, `None` while it is still open
    pub fn end(&self) -> Option<&DrainEnd> {
        self.end.as_ref()
    }

    /// Release the reader borrow, returning the transport failure if there was one
    pub fn finish(self) -> Option<StreamError> {
        match self.end {
            Some(DrainEnd::Failed(e)) => Some(e),
            _ => None,
        }
    }
}

/// What one liveness evaluation observed
#[derive(Debug, Clone, PartialEq)]
pub struct LivenessResult {
    /// Next offset to read
    pub offset: i64,
    /// When a record was last observed
    pub last_message_time: Option<DateTime<Utc>>,
    /// Records read this cycle
    pub records: usize,
    /// Open, read or close failure
    pub transport_failure: Option<StreamError>,
}

/// Drains a topic from the last recorded offset
#[derive(Clone)]
pub struct StreamLivenessEvaluator {
    connector: Arc<dyn StreamConnector>,
    clock: Arc<dyn Clock>,
    read_timeout: Duration,
    max_drain: Duration,
}

impl StreamLivenessEvaluator {
    /// Create an evaluator
    pub fn new(
        connector: Arc<dyn StreamConnector>,
        clock: Arc<dyn Clock>,
        read_timeout: Duration,
        max_drain: Duration,
    ) -> Self {
        Self {
            connector,
            clock,
            read_timeout,
            max_drain,
        }
    }

    /// Read everything available after `offset`.
    ///
    /// The returned offset and time only move when a record was read.
    pub async fn evaluate(
        &self,
        target: &StreamTarget,
        offset: i64,
        last_message_time: Option<DateTime<Utc>>,
    ) -> LivenessResult {
        let mut result = LivenessResult {
            offset,
            last_message_time,
            records: 0,
            transport_failure: None,
        };

        let mut reader = match self
            .connector
            .open_at(target, StreamPosition::Offset(offset))
            .await
        {
            Ok(reader) => reader,
            Err(e) => {
                warn!(topic = %target.topic, error = %e, "Failed to open reader");
                result.transport_failure = Some(e);
                return result;
            }
        };

        let mut drain = Drain::new(reader.as_mut(), self.read_timeout, self.max_drain);
        while let Some(record) = drain.next().await {
            result.offset = record.next_offset();
            result.last_message_time = Some(self.clock.now());
        }
        result.records = drain.records_read();
        if let Some(DrainEnd::DeadlineReached) = drain.end() {
            debug!(topic = %target.topic, records = result.records, "Drain deadline reached");
        }
        result.transport_failure = drain.finish();

        if let Err(e) = reader.close().await {
            warn!(topic = %target.topic, error = %e, "Failed to close reader");
            result.transport_failure = Some(e);
        }

        result
    }
}
