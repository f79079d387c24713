use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Result;

/// Settings fixed at client construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_socket")]
    pub socket: PathBuf,

    /// Protocol version announced to the agent.
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_transport")]
    pub preferred_transport: String,

    /// Maximum number of characters of a tag.
    #[serde(default = "default_tag_size")]
    pub tag_size: usize,

    /// Bytes requested from the socket per read.
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
}

fn default_socket() -> PathBuf {
    PathBuf::from(protocol::DEFAULT_SOCKET)
}

fn default_version() -> String {
    protocol::VERSION.to_string()
}

fn default_transport() -> String {
    protocol::DEFAULT_TRANSPORT.to_string()
}

fn default_tag_size() -> usize {
    protocol::TAG_SIZE
}

fn default_read_chunk_size() -> usize {
    4096
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            socket: default_socket(),
            version: default_version(),
            preferred_transport: default_transport(),
            tag_size: default_tag_size(),
            read_chunk_size: default_read_chunk_size(),
        }
    }
}

impl ClientConfig {
    pub fn new(socket: impl Into<PathBuf>) -> Self {
        ClientConfig {
            socket: socket.into(),
            ..Default::default()
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
