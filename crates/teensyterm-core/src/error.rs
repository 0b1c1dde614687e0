use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Port \"{0}\" not found.")]
    PortNotFound(String),
    #[error("No connection!")]
    NotConnected,
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(#[source] serialport::Error),
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    #[error("write failed: {0}")]
    Write(#[source] io::Error),
    #[error("read failed: {0}")]
    ReadFault(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("\"{}\" already exists", .0.display())]
    FileAlreadyExists(PathBuf),
    #[error("invalid file name {0:?}")]
    InvalidFileName(String),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SinkError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
