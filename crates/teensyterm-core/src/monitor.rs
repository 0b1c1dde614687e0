//! The driver: ties one session to one output sink and turns every
//! operator action into log messages.

use std::path::PathBuf;

use log::{debug, info, warn};

use crate::encoding::TextEncoding;
use crate::error::{SessionError, SinkError};
use crate::logbuf::LogStore;
use crate::port::{looks_like_port_name, PortProvider, SerialConfig};
use crate::session::Session;
use crate::sink::OutputSink;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub serial: SerialConfig,
    pub save_dir: PathBuf,
    pub backup_name: String,
    pub mirror: bool,
    pub encoding: TextEncoding,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            save_dir: PathBuf::from("SavedFiles"),
            backup_name: "defaultFile".to_string(),
            mirror: true,
            encoding: TextEncoding::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

/// A question the operator has to answer before an action goes through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    ClearOutput,
    Overwrite { name: String, path: PathBuf },
    Quit,
}

impl Prompt {
    pub fn title(&self) -> &'static str {
        match self {
            Prompt::Quit => "Quit",
            _ => "Warning",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Prompt::ClearOutput => "Are you sure you want to clear the output monitor?".to_string(),
            Prompt::Overwrite { path, .. } => {
                let file = path
                    .file_name()
                    .map(|f| f.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let dir = path
                    .parent()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default();
                format!("\"{file}\" already exists in \"{dir}\". Do you wish to overwrite it?")
            }
            Prompt::Quit => "Do you want to quit?".to_string(),
        }
    }
}

pub struct Monitor<P> {
    session: Session<P>,
    sink: OutputSink,
    encoding: TextEncoding,
    pending: Option<Prompt>,
    running: bool,
}

impl<P: PortProvider> Monitor<P> {
    pub fn new(provider: P, cfg: MonitorConfig) -> Result<Self, SinkError> {
        let sink = OutputSink::new(cfg.save_dir, &cfg.backup_name, cfg.mirror)?;
        Ok(Self {
            session: Session::new(provider, cfg.serial),
            sink,
            encoding: cfg.encoding,
            pending: None,
            running: true,
        })
    }

    /// Startup briefing: list ports and tell the operator how to connect.
    pub fn brief(&mut self) {
        self.scan_ports();
        self.sink.system("");
        self.sink
            .system("Teensy usually appears as \"USB Serial Device\"");
        self.sink.system(
            "Enter the Teensy's port and click \"Open Serial Port\" to connect.",
        );
    }

    pub fn scan_ports(&mut self) {
        self.sink.system("==== Found Serial Ports: ====");
        match self.session.list_ports() {
            Ok(ports) if ports.is_empty() => self.sink.system("No ports detected."),
            Ok(ports) => {
                for port in ports {
                    self.sink.system(format!("- {}", port.description()));
                }
            }
            Err(e) => {
                warn!("{e}");
                self.sink.system(format!("Port scan failed: {e}"));
            }
        }
    }

    pub fn connect(&mut self, ident: &str) -> bool {
        let ident = ident.trim();
        if !ident.is_empty() && !looks_like_port_name(ident) {
            self.sink.system(format!(
                "\"{ident}\" does not look like a port name, searching descriptions."
            ));
        }
        let previous = self.session.port().map(|p| p.port_name.clone());
        let result = self
            .session
            .open(ident)
            .map(|port| port.port_name.clone());
        if let (Some(name), Err(SessionError::PortNotFound(_))) = (&previous, &result) {
            debug!("{name} stays open");
        } else if let Some(name) = previous {
            self.flush_tail();
            self.sink.system(format!("Disconnected from port \"{name}\"."));
        }
        match result {
            Ok(name) => {
                self.sink.system(format!("Connected to port \"{name}\"."));
                true
            }
            Err(e @ SessionError::PortNotFound(_)) => {
                info!("{e}");
                self.sink.system(e.to_string());
                false
            }
            Err(e) => {
                warn!("{e}");
                self.sink.system(format!("Could not connect: {e}"));
                false
            }
        }
    }

    pub fn disconnect(&mut self) {
        if let Some(name) = self.session.port().map(|p| p.port_name.clone()) {
            self.session.close();
            self.flush_tail();
            self.sink.system(format!("Disconnected from port \"{name}\"."));
        }
    }

    /// Sends one command. Returns `true` when it went out, so the caller can
    /// clear its entry field.
    pub fn send(&mut self, command: &str) -> bool {
        if !self.session.is_open() {
            self.sink.system(SessionError::NotConnected.to_string());
            return false;
        }
        if command.is_empty() {
            return false;
        }
        match self.session.write(command) {
            Ok(()) => {
                self.sink.system(format!("Command Sent: {command}"));
                true
            }
            Err(e) => {
                warn!("{e}");
                self.sink.system(format!("Command not sent: {e}"));
                false
            }
        }
    }

    /// One pass of the loop: a single read attempt, then every completed
    /// line goes to the sink in arrival order. Returns whether anything
    /// visible changed.
    pub fn tick(&mut self) -> bool {
        if !self.session.is_open() {
            return false;
        }
        match self.session.poll() {
            Ok(lines) => {
                let changed = !lines.is_empty();
                for line in lines {
                    self.record(&line);
                }
                changed
            }
            Err(e) => {
                self.flush_tail();
                self.sink.system(format!("Connection lost: {e}"));
                true
            }
        }
    }

    /// Records whatever the last closed link left unterminated.
    fn flush_tail(&mut self) {
        let tail = self.session.take_tail();
        if !tail.is_empty() {
            self.record(&tail);
        }
    }

    fn record(&mut self, raw: &[u8]) {
        let text = self.encoding.decode(raw);
        if let Err(e) = self.sink.record(raw, &text) {
            warn!("{e}");
            self.sink.set_mirror_enabled(false);
            self.sink
                .system(format!("Backup write failed, continuous save stopped: {e}"));
        }
    }

    pub fn request_clear(&mut self) {
        self.pending = Some(Prompt::ClearOutput);
    }

    /// Saves right away unless the file exists, in which case an overwrite
    /// prompt is raised.
    pub fn request_save(&mut self, name: &str) {
        match self.sink.save_snapshot(name, false) {
            Ok(path) => self.saved(path),
            Err(SinkError::FileAlreadyExists(path)) => {
                self.pending = Some(Prompt::Overwrite {
                    name: name.to_string(),
                    path,
                });
            }
            Err(e) => self.save_failed(e),
        }
    }

    pub fn request_quit(&mut self) {
        self.pending = Some(Prompt::Quit);
    }

    pub fn pending(&self) -> Option<&Prompt> {
        self.pending.as_ref()
    }

    /// Resolves the pending prompt. Declining changes nothing.
    pub fn answer(&mut self, yes: bool) {
        let Some(prompt) = self.pending.take() else {
            return;
        };
        if !yes {
            return;
        }
        match prompt {
            Prompt::ClearOutput => {
                self.sink.clear_output();
                self.sink.system("Output monitor cleared.");
            }
            Prompt::Overwrite { name, .. } => match self.sink.save_snapshot(&name, true) {
                Ok(path) => self.saved(path),
                Err(e) => self.save_failed(e),
            },
            Prompt::Quit => {
                self.session.close();
                self.flush_tail();
                self.running = false;
            }
        }
    }

    fn saved(&mut self, path: PathBuf) {
        let file = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.sink.system(format!("Output saved to {file}"));
    }

    fn save_failed(&mut self, e: SinkError) {
        warn!("{e}");
        self.sink.system(format!("Save failed: {e}"));
    }

    pub fn set_mirror_enabled(&mut self, enabled: bool) {
        self.sink.set_mirror_enabled(enabled);
    }

    pub fn set_encoding(&mut self, encoding: TextEncoding) {
        self.encoding = encoding;
    }

    pub fn state(&self) -> ConnectionState {
        if self.session.is_open() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    pub fn port_name(&self) -> Option<&str> {
        self.session.port().map(|p| p.port_name.as_str())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn log(&self) -> &LogStore {
        self.sink.log()
    }

    pub fn sink(&self) -> &OutputSink {
        &self.sink
    }
}
