//! Up/down transition rules
//!
//! Notifications are sent on transitions only. These functions compare the
//! previous state with the latest observation and never touch the store.

use crate::checks::{CheckResult, LivenessResult};
use crate::monitor::store::LivenessState;
use chrono::{DateTime, Duration, Utc};

/// Change of a check's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No change
    Stay,
    /// The check recovered
    Up,
    /// The check went down
    Down,
}

impl Transition {
    /// New up state, `None` when nothing changed
    pub fn is_up(&self) -> Option<bool> {
        match self {
            Self::Stay => None,
            Self::Up => Some(true),
            Self::Down => Some(false),
        }
    }

    /// Notification text for a check called `name`
    pub fn message(&self, name: &str) -> Option<String> {
        match self {
            Self::Stay => None,
            Self::Up => Some(format!("{} is up", name)),
            Self::Down => Some(format!("{} is down", name)),
        }
    }
}

/// Transition of an HTTP check.
///
/// Only a transport failure takes a check down; a response with an
/// unexpected code never changes state.
pub fn http_transition(is_up: bool, result: &CheckResult) -> Transition {
    if result.succeeded {
        if is_up {
            Transition::Stay
        } else {
            Transition::Up
        }
    } else if result.is_transport_failure() && is_up {
        Transition::Down
    } else {
        Transition::Stay
    }
}

/// Transition of a topic liveness check.
///
/// Progress (a new offset or a new observation time) brings a down check
/// back up. Without progress the check goes down once the last observation
/// is older than `timeout`, or immediately when nothing was ever observed.
/// A window that cannot be represented, or that ends past the last
/// representable time, never elapses.
pub fn stream_transition(
    previous: &LivenessState,
    current: &LivenessResult,
    now: DateTime<Utc>,
    timeout: Option<Duration>,
) -> Transition {
    let progressed = current.offset != previous.offset
        || current.last_message_time != previous.last_message_time;

    if progressed {
        return if previous.is_up {
            Transition::Stay
        } else {
            Transition::Up
        };
    }

    let stalled = match previous.last_message_time {
        None => true,
        Some(seen) => timeout
            .and_then(|window| seen.checked_add_signed(window))
            .is_some_and(|deadline| now > deadline),
    };
    if stalled && previous.is_up {
        Transition::Down
    } else {
        Transition::Stay
    }
}
