//! Core functionalities: serial session, output sink, driver loop.

pub mod encoding;
pub mod error;
pub mod line;
pub mod logbuf;
pub mod monitor;
pub mod port;
pub mod session;
pub mod sink;

#[cfg(test)]
mod mock;

pub use encoding::TextEncoding;
pub use error::{SessionError, SinkError};
pub use logbuf::{LogEntry, LogStore, Source};
pub use monitor::{ConnectionState, Monitor, MonitorConfig, Prompt};
pub use port::{LineEnding, PortInfo, PortProvider, SerialConfig, SystemPorts};
pub use session::Session;
pub use sink::OutputSink;
