//! Check evaluators
//!
//! Each evaluator performs one observation and reports what it saw. None of
//! them decide whether a check is up or down; that is left to the monitor,
//! which owns the previous state.

pub mod decode;
pub mod events;
pub mod http;
pub mod stream;

pub use decode::{DecodeError, JsonDecoder, StructuredDecoder};
pub use events::{EventMatch, EventMatcher, EventResult, EventWatchEvaluator};
pub use http::{CheckResult, HttpCheckEvaluator, HttpTransport, ReqwestTransport};
pub use stream::{
    Drain, DrainEnd, LivenessResult, StreamConnector, StreamError, StreamLivenessEvaluator,
    StreamPosition, StreamReader, StreamRecord, StreamTarget,
};
