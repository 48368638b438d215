use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use butterbot::checks::{StreamConnector, StreamError, StreamPosition, StreamReader, StreamTarget};

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Connector for configurations without Kafka checks
#[allow(dead_code)]
pub struct NoStreams;

#[async_trait]
impl StreamConnector for NoStreams {
    async fn open_at(
        &self,
        target: &StreamTarget,
        _position: StreamPosition,
    ) -> Result<Box<dyn StreamReader>, StreamError> {
        Err(StreamError::Transport(format!(
            "no broker for topic {}",
            target.topic
        )))
    }
}
