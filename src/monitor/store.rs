//! Per-check state owned by the monitor
//!
//! Entries are keyed by typed identifiers derived from each check's
//! position in the configuration, so two checks with the same name never
//! share state.

use crate::config::ButterbotConfig;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

macro_rules! check_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl $name {
            /// Identifier of the check at `index` in its configuration list
            pub fn new(index: usize) -> Self {
                Self(index)
            }

            /// Position in the configuration list
            pub fn index(&self) -> usize {
                self.0
            }
        }
    };
}

check_id!(
    /// Identifies an HTTP check
    HttpCheckId
);
check_id!(
    /// Identifies a topic liveness check
    StreamCheckId
);
check_id!(
    /// Identifies an event watch
    EventWatchId
);

/// Last known state of an HTTP check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStatus {
    /// Whether the check is considered up
    pub is_up: bool,
    /// Last transition message, empty before the first transition
    pub last_message: String,
}

impl Default for HttpStatus {
    fn default() -> Self {
        Self {
            is_up: true,
            last_message: String::new(),
        }
    }
}

/// Last known state of a topic liveness check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessState {
    /// Whether the topic is considered alive
    pub is_up: bool,
    /// Next offset to read
    pub offset: i64,
    /// When a record was last observed, `None` until the first one
    pub last_message_time: Option<DateTime<Utc>>,
}

impl LivenessState {
    /// Initial state of a check starting at `offset`
    pub fn starting_at(offset: i64) -> Self {
        Self {
            is_up: true,
            offset,
            last_message_time: None,
        }
    }
}

/// Read position of an event watch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCursor {
    /// Next offset to read, `None` to resume from the consumer group
    pub next_offset: Option<i64>,
}

/// State of every configured check
#[derive(Debug, Clone, Default)]
pub struct CheckStore {
    http: BTreeMap<HttpCheckId, HttpStatus>,
    streams: BTreeMap<StreamCheckId, LivenessState>,
    events: BTreeMap<EventWatchId, EventCursor>,
}

impl CheckStore {
    /// Initial state for the checks in `config`: everything starts up
    pub fn from_config(config: &ButterbotConfig) -> Self {
        let http = (0..config.http_checks.len())
            .map(|index| (HttpCheckId::new(index), HttpStatus::default()))
            .collect();
        let streams = config
            .kafka_topic_checks
            .iter()
            .enumerate()
            .map(|(index, check)| {
                (
                    StreamCheckId::new(index),
                    LivenessState::starting_at(check.parameters.start_offset),
                )
            })
            .collect();
        let events = (0..config.kafka_events.len())
            .map(|index| (EventWatchId::new(index), EventCursor::default()))
            .collect();

        Self {
            http,
            streams,
            events,
        }
    }

    /// State of an HTTP check
    pub fn http(&self, id: HttpCheckId) -> Option<&HttpStatus> {
        self.http.get(&id)
    }

    /// Mutable state of an HTTP check
    pub fn http_mut(&mut self, id: HttpCheckId) -> Option<&mut HttpStatus> {
        self.http.get_mut(&id)
    }

    /// State of a topic liveness check
    pub fn stream(&self, id: StreamCheckId) -> Option<&LivenessState> {
        self.streams.get(&id)
    }

    /// Mutable state of a topic liveness check
    pub fn stream_mut(&mut self, id: StreamCheckId) -> Option<&mut LivenessState> {
        self.streams.get_mut(&id)
    }

    /// Cursor of an event watch
    pub fn event(&self, id: EventWatchId) -> Option<&EventCursor> {
        self.events.get(&id)
    }

    /// Mutable cursor of an event watch
    pub fn event_mut(&mut self, id: EventWatchId) -> Option<&mut EventCursor> {
        self.events.get_mut(&id)
    }
}
