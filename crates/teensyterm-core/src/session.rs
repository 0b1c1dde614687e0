//! The single serial connection to the board.

use std::io::{ErrorKind, Read, Write};
use std::time::Instant;

use log::{debug, info, warn};

use crate::error::SessionError;
use crate::line::LineAssembler;
use crate::port::{Link, PortInfo, PortProvider, SerialConfig};

const READ_CHUNK: usize = 4096;

struct OpenLink {
    port: PortInfo,
    io: Box<dyn Link>,
    lines: LineAssembler,
}

/// Owns at most one open link. Opening a new port always drops the old one
/// first.
pub struct Session<P> {
    provider: P,
    cfg: SerialConfig,
    link: Option<OpenLink>,
    tail: Vec<u8>,
}

impl<P: PortProvider> Session<P> {
    pub fn new(provider: P, cfg: SerialConfig) -> Self {
        Self {
            provider,
            cfg,
            link: None,
            tail: Vec::new(),
        }
    }

    pub fn list_ports(&self) -> Result<Vec<PortInfo>, SessionError> {
        self.provider.list_ports()
    }

    /// Opens the port named `ident`, or failing that the first enumerated
    /// port whose description contains it.
    ///
    /// A miss leaves any current connection untouched.
    pub fn open(&mut self, ident: &str) -> Result<&PortInfo, SessionError> {
        let ident = ident.trim();
        let ports = self.provider.list_ports()?;
        let port = ports
            .iter()
            .find(|p| p.port_name == ident)
            .or_else(|| ports.iter().find(|p| p.matches(ident)))
            .cloned()
            .ok_or_else(|| SessionError::PortNotFound(ident.to_string()))?;

        self.close();
        let io = self.provider.open(&port.port_name, &self.cfg)?;
        info!(
            "opened {} at {} baud (timeout {:?})",
            port.port_name, self.cfg.baud_rate, self.cfg.read_timeout
        );
        let link = self.link.insert(OpenLink {
            port,
            io,
            lines: LineAssembler::new(),
        });
        Ok(&link.port)
    }

    /// Returns whether a connection was actually closed. Bytes still waiting
    /// for a newline are kept for [`Session::take_tail`].
    pub fn close(&mut self) -> bool {
        match self.link.take() {
            Some(mut link) => {
                let rest = link.lines.take_pending();
                if !rest.is_empty() {
                    debug!(
                        "kept {} unterminated bytes from {}",
                        rest.len(),
                        link.port.port_name
                    );
                    self.tail.extend_from_slice(&rest);
                }
                info!("closed {}", link.port.port_name);
                true
            }
            None => false,
        }
    }

    /// Received bytes that never became a line before their link closed.
    pub fn take_tail(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.tail)
    }

    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    pub fn port(&self) -> Option<&PortInfo> {
        self.link.as_ref().map(|l| &l.port)
    }

    /// Sends `text` followed by the configured line ending.
    pub fn write(&mut self, text: &str) -> Result<(), SessionError> {
        let ending = self.cfg.line_ending.as_bytes();
        let link = self.link.as_mut().ok_or(SessionError::NotConnected)?;
        let mut data = Vec::with_capacity(text.len() + ending.len());
        data.extend_from_slice(text.as_bytes());
        data.extend_from_slice(ending);
        link.io
            .write_all(&data)
            .and_then(|()| link.io.flush())
            .map_err(SessionError::Write)?;
        debug!("wrote {} bytes to {}", data.len(), link.port.port_name);
        Ok(())
    }

    /// Returns one line, touching the port at most once.
    ///
    /// `Ok(None)` means nothing complete arrived within the read timeout.
    pub fn read_line(&mut self) -> Result<Option<Vec<u8>>, SessionError> {
        let now = Instant::now();
        let Some(link) = self.link.as_mut() else {
            return Ok(None);
        };
        if let Some(line) = link.lines.next_line(now) {
            return Ok(Some(line));
        }
        self.read_once()?;
        Ok(self
            .link
            .as_mut()
            .and_then(|l| l.lines.next_line(Instant::now())))
    }

    /// Makes one read attempt and returns every line that is now complete,
    /// in arrival order.
    pub fn poll(&mut self) -> Result<Vec<Vec<u8>>, SessionError> {
        if self.link.is_none() {
            return Ok(Vec::new());
        }
        self.read_once()?;
        let mut out = Vec::new();
        if let Some(link) = self.link.as_mut() {
            let now = Instant::now();
            while let Some(line) = link.lines.next_line(now) {
                out.push(line);
            }
        }
        Ok(out)
    }

    /// One bounded read. Any fault other than a timeout closes the session.
    fn read_once(&mut self) -> Result<(), SessionError> {
        let Some(link) = self.link.as_mut() else {
            return Ok(());
        };
        let mut buf = [0u8; READ_CHUNK];
        match link.io.read(&mut buf) {
            Ok(n) => {
                link.lines.push(&buf[..n], Instant::now());
                Ok(())
            }
            Err(e) if matches!(
                e.kind(),
                ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
            ) =>
            {
                Ok(())
            }
            Err(e) => {
                warn!("read fault on {}: {e}", link.port.port_name);
                self.close();
                Err(SessionError::ReadFault(e))
            }
        }
    }
}
