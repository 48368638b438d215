//! Test utilities for Butterbot
//!
//! Hand-written fakes for the capabilities the monitor runs on: a webhook
//! sink that records posts, scripted stream readers and a scripted HTTP
//! transport.

use crate::checks::{
    HttpTransport, StreamConnector, StreamError, StreamPosition, StreamReader, StreamRecord,
    StreamTarget,
};
use crate::config::NotifierConfig;
use crate::error::ButterbotError;
use crate::notify::{NotificationSink, PostResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Discord notifier expecting the default 204
pub fn notifier(name: &str, url: &str) -> NotifierConfig {
    NotifierConfig {
        kind: "discord".to_string(),
        name: name.to_string(),
        url: url.to_string(),
        content_type: "application/json".to_string(),
        status_code: 204,
    }
}

/// Stream record with a text key and payload
pub fn record(key: &str, value: &str, offset: i64) -> StreamRecord {
    StreamRecord {
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
        offset,
    }
}

/// A POST seen by [`RecordingSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPost {
    pub url: String,
    pub content_type: String,
    pub body: String,
}

/// [`NotificationSink`] that records posts and answers with a fixed status
#[derive(Debug, Default)]
pub struct RecordingSink {
    status: Option<u16>,
    posts: Mutex<Vec<RecordedPost>>,
    attempts: AtomicUsize,
}

impl RecordingSink {
    /// Sink answering every post with `status`
    pub fn new(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Sink failing every post with a delivery error
    pub fn failing() -> Self {
        Self::default()
    }

    /// Posts that were answered
    pub fn posts(&self) -> Vec<RecordedPost> {
        self.posts.lock().unwrap().clone()
    }

    /// Posts attempted, including failed ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: String,
    ) -> Result<PostResponse, ButterbotError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let Some(status) = self.status else {
            return Err(ButterbotError::Delivery(format!("{} unreachable", url)));
        };

        self.posts.lock().unwrap().push(RecordedPost {
            url: url.to_string(),
            content_type: content_type.to_string(),
            body,
        });
        Ok(PostResponse {
            status,
            body: String::new(),
        })
    }
}

/// [`StreamReader`] replaying scripted reads, then timing out
pub struct ScriptedReader {
    reads: VecDeque<Result<StreamRecord, StreamError>>,
    fail_close: bool,
    closed: Arc<AtomicUsize>,
}

impl ScriptedReader {
    /// Reader replaying `reads`
    pub fn new(reads: Vec<Result<StreamRecord, StreamError>>) -> Self {
        Self {
            reads: reads.into(),
            fail_close: false,
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl StreamReader for ScriptedReader {
    async fn read_next(&mut self, timeout: Duration) -> Result<StreamRecord, StreamError> {
        self.reads
            .pop_front()
            .unwrap_or(Err(StreamError::Timeout(timeout)))
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(StreamError::Transport("close failed".to_string()));
        }
        Ok(())
    }
}

type Session = Result<Vec<Result<StreamRecord, StreamError>>, StreamError>;

/// [`StreamConnector`] handing out one scripted session per open.
///
/// Once the scripted sessions are used up every open yields an empty reader.
#[derive(Default)]
pub struct ScriptedConnector {
    sessions: Mutex<VecDeque<Session>>,
    opened: Mutex<Vec<StreamPosition>>,
    closed: Arc<AtomicUsize>,
    fail_close: bool,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next open yields a reader replaying `reads`
    pub fn session(self, reads: Vec<Result<StreamRecord, StreamError>>) -> Self {
        self.sessions.lock().unwrap().push_back(Ok(reads));
        self
    }

    /// Next open fails with `err`
    pub fn failing_open(self, err: StreamError) -> Self {
        self.sessions.lock().unwrap().push_back(Err(err));
        self
    }

    /// Every reader fails to close
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Positions readers were opened at
    pub fn opened(&self) -> Vec<StreamPosition> {
        self.opened.lock().unwrap().clone()
    }

    /// Readers closed so far
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamConnector for ScriptedConnector {
    async fn open_at(
        &self,
        _target: &StreamTarget,
        position: StreamPosition,
    ) -> Result<Box<dyn StreamReader>, StreamError> {
        self.opened.lock().unwrap().push(position);
        let session = self
            .sessions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Vec::new()));

        let reads = session?;
        Ok(Box::new(ScriptedReader {
            reads: reads.into(),
            fail_close: self.fail_close,
            closed: self.closed.clone(),
        }))
    }
}

/// [`HttpTransport`] answering from a script, then with 200
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<u16, ButterbotError>>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<u16, ButterbotError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(
        &self,
        _url: &str,
        _timeout: Duration,
        _skip_tls_verify: bool,
    ) -> Result<u16, ButterbotError> {
        self.responses.lock().unwrap().pop_front().unwrap_or(Ok(200))
    }
}
