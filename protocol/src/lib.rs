//! # protocol - tirion client/agent wire format
//!
//! The client and the agent talk over a Unix stream socket using UTF-8 text
//! records terminated by `\n`.
//!
//! ```text
//! client -> agent   tirion v0.3\tmmap          opening message
//! agent  -> client  4\tmmap:///tmp/run.mmap    slot count and buffer location
//! client -> agent   tsome tag text             tag
//! agent  -> client  <c><payload>               command, selected by first char
//! ```
//!
//! After the handshake the metric values themselves never travel over the
//! socket; they live in the memory-mapped file named by the reply.
//!
//! ```rust
//! use protocol::HandshakeReply;
//!
//! let reply = HandshakeReply::parse("3\tmmap:///tmp/x.bin")?;
//! assert_eq!(reply.slot_count, 3);
//! assert_eq!(reply.location.to_str(), Some("/tmp/x.bin"));
//! # Ok::<(), protocol::ProtocolError>(())
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Protocol version announced in the opening message.
pub const VERSION: &str = "0.3";

/// URL scheme of a memory-mapped metrics buffer.
pub const MMAP_SCHEME: &str = "mmap://";

/// Transport token the client asks for by default.
pub const DEFAULT_TRANSPORT: &str = "mmap";

/// Maximum number of characters of tag text sent to the agent.
pub const TAG_SIZE: usize = 512;

pub const DEFAULT_SOCKET: &str = "/tmp/tirion.sock";

/// Leading character of a tag record.
pub const TAG_PREFIX: char = 't';

pub const RECORD_SEPARATOR: char = '\n';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("malformed handshake reply: {0}")]
    MalformedHandshake(String),
    #[error("invalid slot count: {0:?}")]
    InvalidSlotCount(String),
    #[error("unsupported transport: {0:?}")]
    UnsupportedTransport(String),
}

/// Opening message of the handshake, without the record separator.
pub fn hello(version: &str, transport: &str) -> String {
    format!("tirion v{}\t{}", version, transport)
}

/// Agent answer to the opening message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeReply {
    pub slot_count: usize,
    pub location: PathBuf,
}

impl HandshakeReply {
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let (count, url) = match line.split_once('\t') {
            Some((count, url)) if !url.is_empty() => (count, url),
            _ => {
                return Err(ProtocolError::MalformedHandshake(
                    "expected slot count and buffer url".to_string(),
                ))
            }
        };

        let slot_count = count
            .parse::<usize>()
            .map_err(|_| ProtocolError::InvalidSlotCount(count.to_string()))?;

        let path = url
            .strip_prefix(MMAP_SCHEME)
            .ok_or_else(|| ProtocolError::UnsupportedTransport(url.to_string()))?;

        if path.is_empty() {
            return Err(ProtocolError::MalformedHandshake(
                "buffer url has no path".to_string(),
            ));
        }

        Ok(HandshakeReply {
            slot_count,
            location: PathBuf::from(path),
        })
    }
}

/// Builds a tag record: at most `limit` characters of `text`, newlines
/// replaced by spaces, prefixed with [`TAG_PREFIX`].
pub fn prepare_tag(text: &str, limit: usize) -> String {
    let text = match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    };

    let mut record = String::with_capacity(text.len() + 1);
    record.push(TAG_PREFIX);
    record.extend(
        text.chars()
            .map(|c| if c == RECORD_SEPARATOR { ' ' } else { c }),
    );
    record
}

/// Splits an agent command into its selector and payload.
pub fn split_command(line: &str) -> Option<(char, &str)> {
    let mut chars = line.chars();
    let command = chars.next()?;
    Some((command, chars.as_str()))
}
