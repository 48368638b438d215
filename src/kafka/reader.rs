//! rdkafka-backed stream readers.
//!
//! Each reader owns a `StreamConsumer` assigned to one partition at an
//! explicit position. Readers that belong to a consumer group commit the
//! position they reached when closed.

use crate::checks::{StreamConnector, StreamError, StreamPosition, StreamReader, StreamRecord, StreamTarget};
use crate::kafka::config::client_settings;
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::BorrowedMessage;
use rdkafka::{Message, Offset, TopicPartitionList};
use std::time::Duration;
use tracing::{debug, info};

fn transport(err: impl std::fmt::Display) -> StreamError {
    StreamError::Transport(err.to_string())
}

/// [`StreamConnector`] creating rdkafka consumers
#[derive(Debug, Clone, Copy, Default)]
pub struct KafkaConnector;

impl KafkaConnector {
    /// Create a connector
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamConnector for KafkaConnector {
    async fn open_at(
        &self,
        target: &StreamTarget,
        position: StreamPosition,
    ) -> Result<Box<dyn StreamReader>, StreamError> {
        let mut client_config = ClientConfig::new();
        for (key, value) in client_settings(target).map_err(transport)? {
            client_config.set(key, value);
        }
        let consumer: StreamConsumer = client_config.create().map_err(transport)?;

        let offset = match position {
            StreamPosition::Offset(offset) => Offset::Offset(offset),
            StreamPosition::Resume => Offset::Stored,
        };
        let mut assignment = TopicPartitionList::new();
        assignment
            .add_partition_offset(&target.topic, target.partition, offset)
            .map_err(transport)?;
        consumer.assign(&assignment).map_err(transport)?;

        debug!(
            brokers = %target.brokers,
            topic = %target.topic,
            partition = target.partition,
            position = ?position,
            "Opened reader"
        );

        Ok(Box::new(KafkaStreamReader {
            consumer,
            topic: target.topic.clone(),
            partition: target.partition,
            commit_on_close: target.group_id.is_some(),
            position: None,
        }))
    }
}

/// [`StreamReader`] over one assigned partition
pub struct KafkaStreamReader {
    consumer: StreamConsumer,
    topic: String,
    partition: i32,
    commit_on_close: bool,
    position: Option<i64>,
}

fn to_record(message: &BorrowedMessage<'_>) -> StreamRecord {
    StreamRecord {
        key: message.key().map(<[u8]>::to_vec).unwrap_or_default(),
        value: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        offset: message.offset(),
    }
}

#[async_trait]
impl StreamReader for KafkaStreamReader {
    async fn read_next(&mut self, timeout: Duration) -> Result<StreamRecord, StreamError> {
        let outcome = match tokio::time::timeout(timeout, self.consumer.recv()).await {
            Err(_) => Err(StreamError::Timeout(timeout)),
            Ok(Err(e)) => Err(transport(e)),
            Ok(Ok(message)) => Ok(to_record(&message)),
        };

        if let Ok(record) = &outcome {
            self.position = Some(record.next_offset());
        }
        outcome
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        let Some(position) = self.position.take() else {
            return Ok(());
        };
        if !self.commit_on_close {
            return Ok(());
        }

        let mut offsets = TopicPartitionList::new();
        offsets
            .add_partition_offset(&self.topic, self.partition, Offset::Offset(position))
            .map_err(transport)?;
        self.consumer
            .commit(&offsets, CommitMode::Sync)
            .map_err(transport)?;

        info!(
            topic = %self.topic,
            partition = self.partition,
            offset = position,
            "Committed read position"
        );
        Ok(())
    }
}
