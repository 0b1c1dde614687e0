use serialport::SerialPortInfo;
use std::io::{Read, Write};
use std::time::Duration;

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq)]
pub struct PortInfo {
    pub port_name: String,
    pub port_type: String,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (port_type, vid, pid, serial_number, manufacturer, product) = match &info.port_type {
            serialport::SerialPortType::UsbPort(usb) => (
                "USB".to_string(),
                Some(usb.vid),
                Some(usb.pid),
                usb.serial_number.clone(),
                usb.manufacturer.clone(),
                usb.product.clone(),
            ),
            serialport::SerialPortType::PciPort => ("PCI".to_string(), None, None, None, None, None),
            serialport::SerialPortType::BluetoothPort => ("Bluetooth".to_string(), None, None, None, None, None),
            serialport::SerialPortType::Unknown => ("Unknown".to_string(), None, None, None, None, None),
        };
        Self {
            port_name: info.port_name,
            port_type,
            vid,
            pid,
            serial_number,
            manufacturer,
            product,
        }
    }
}

impl PortInfo {
    /// Human readable label, always ending in the system port name,
    /// e.g. `USB Serial (COM3)`.
    pub fn description(&self) -> String {
        let label = self
            .product
            .as_deref()
            .or(self.manufacturer.as_deref())
            .unwrap_or(&self.port_type);
        match (self.vid, self.pid) {
            (Some(vid), Some(pid)) => {
                format!("{label} [{vid:04X}:{pid:04X}] ({})", self.port_name)
            }
            _ => format!("{label} ({})", self.port_name),
        }
    }

    /// Whether a user-typed identifier refers to this port: either the exact
    /// system name or any part of the description.
    pub fn matches(&self, ident: &str) -> bool {
        !ident.is_empty() && (self.port_name == ident || self.description().contains(ident))
    }
}

/// Loose check that `ident` looks like a port name on this platform.
pub fn looks_like_port_name(ident: &str) -> bool {
    if cfg!(windows) {
        ident
            .strip_prefix("COM")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    } else {
        ident.starts_with("/dev/") && ident.len() > "/dev/".len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    None,
    LF,
    CR,
    CRLF,
}

impl LineEnding {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            LineEnding::None => b"",
            LineEnding::LF => b"\n",
            LineEnding::CR => b"\r",
            LineEnding::CRLF => b"\r\n",
        }
    }
}

/// Teensy boards talk at 19200 baud in this setup.
pub const DEFAULT_BAUD_RATE: u32 = 19_200;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub read_timeout: Duration,
    pub data_bits: serialport::DataBits,
    pub parity: serialport::Parity,
    pub stop_bits: serialport::StopBits,
    pub flow_control: serialport::FlowControl,
    pub line_ending: LineEnding,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            data_bits: serialport::DataBits::Eight,
            parity: serialport::Parity::None,
            stop_bits: serialport::StopBits::One,
            flow_control: serialport::FlowControl::None,
            line_ending: LineEnding::None,
        }
    }
}

/// An open byte link to the device. Reads return within the configured
/// timeout; a timeout surfaces as `ErrorKind::TimedOut`.
pub trait Link: Read + Write {}

impl<T: Read + Write + ?Sized> Link for T {}

/// Enumerates and opens ports. The session talks to hardware only through
/// this seam.
pub trait PortProvider {
    fn list_ports(&self) -> Result<Vec<PortInfo>, SessionError>;

    fn open(&self, port_name: &str, cfg: &SerialConfig) -> Result<Box<dyn Link>, SessionError>;
}

/// The real serial ports of this machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl PortProvider for SystemPorts {
    fn list_ports(&self) -> Result<Vec<PortInfo>, SessionError> {
        let ports = serialport::available_ports().map_err(SessionError::Enumerate)?;
        Ok(ports.into_iter().map(PortInfo::from).collect())
    }

    fn open(&self, port_name: &str, cfg: &SerialConfig) -> Result<Box<dyn Link>, SessionError> {
        let port = serialport::new(port_name, cfg.baud_rate)
            .data_bits(cfg.data_bits)
            .parity(cfg.parity)
            .stop_bits(cfg.stop_bits)
            .flow_control(cfg.flow_control)
            .timeout(cfg.read_timeout)
            .open()
            .map_err(|source| SessionError::Open {
                port: port_name.to_string(),
                source,
            })?;
        Ok(Box::new(port))
    }
}
