//! Monitor: per-check state, transition rules and the poll loop

pub mod engine;
pub mod scheduler;
pub mod store;
pub mod transition;

pub use engine::{Collaborators, CycleReport, Monitor};
pub use scheduler::{FixedTicks, IntervalTicker, Ticker};
pub use store::{
    CheckStore, EventCursor, EventWatchId, HttpCheckId, HttpStatus, LivenessState, StreamCheckId,
};
pub use transition::{http_transition, stream_transition, Transition};
