use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use teensyterm_core::{LineEnding, MonitorConfig, SerialConfig, TextEncoding};

/// Operator choices that survive a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub port: String,
    pub file_name: String,
    pub save_dir: PathBuf,
    pub auto_save: bool,
    pub auto_scroll: bool,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub encoding: String,
    pub line_ending: String,
}

impl Default for Settings {
    fn default() -> Self {
        let serial = SerialConfig::default();
        Self {
            port: if cfg!(windows) { "COM3" } else { "/dev/ttyACM0" }.to_string(),
            file_name: "defaultFile".to_string(),
            save_dir: PathBuf::from("SavedFiles"),
            auto_save: true,
            auto_scroll: true,
            baud_rate: serial.baud_rate,
            read_timeout_ms: serial.read_timeout.as_millis() as u64,
            encoding: TextEncoding::default().to_string(),
            line_ending: "None".to_string(),
        }
    }
}

impl Settings {
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("teensyterm").join("settings.json"))
    }

    /// Falls back to defaults when the file is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("no settings at {}: {e}", path.display());
                return Self::default();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            log::warn!("ignoring malformed settings {}: {e}", path.display());
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn text_encoding(&self) -> TextEncoding {
        self.encoding.parse().unwrap_or_default()
    }

    pub fn line_ending(&self) -> LineEnding {
        match self.line_ending.as_str() {
            "LF" => LineEnding::LF,
            "CR" => LineEnding::CR,
            "CRLF" => LineEnding::CRLF,
            _ => LineEnding::None,
        }
    }

    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            serial: SerialConfig {
                baud_rate: self.baud_rate,
                read_timeout: Duration::from_millis(self.read_timeout_ms),
                line_ending: self.line_ending(),
                ..Default::default()
            },
            save_dir: self.save_dir.clone(),
            backup_name: self.file_name.clone(),
            mirror: self.auto_save,
            encoding: self.text_encoding(),
        }
    }
}
