use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MmapBufError {
    #[error("failed to open buffer file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("buffer file {path} holds {actual} bytes, expected at least {expected}")]
    TooSmall {
        path: PathBuf,
        expected: usize,
        actual: u64,
    },

    #[error("slot count {0} exceeds the addressable size")]
    TooLarge(usize),

    #[error("memory mapping failed: {0}")]
    MmapFailed(#[from] nix::errno::Errno),

    #[error("memory flush failed: {0}")]
    FlushFailed(nix::errno::Errno),
}
