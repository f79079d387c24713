use mmapbuf::MmapBufError;
use protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

pub mod client;
pub mod config;
pub mod framing;
pub mod handshake;
pub mod listener;

pub use client::Client;
pub use config::ClientConfig;
pub use framing::FramedReceiver;
pub use listener::{CommandHandler, UnknownCommands};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot connect to unix socket {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("handshake failed: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("metrics buffer error: {0}")]
    Buffer(#[from] MmapBufError),
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("no record separator within {0} bytes")]
    LineTooLong(usize),
    #[error("unix socket closed by agent")]
    EndOfStream,
    #[error("client is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ClientError>;
