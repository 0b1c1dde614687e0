//! Scripted port provider for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;

use crate::error::SessionError;
use crate::port::{Link, PortInfo, PortProvider, SerialConfig};

pub(crate) enum MockRead {
    Data(Vec<u8>),
    Timeout,
    Fault,
}

#[derive(Default)]
pub(crate) struct MockState {
    pub reads: VecDeque<MockRead>,
    pub written: Vec<u8>,
    pub read_calls: usize,
    pub opened: Vec<String>,
    pub refuse_open: bool,
}

#[derive(Clone)]
pub(crate) struct MockPorts {
    pub ports: Vec<PortInfo>,
    pub state: Rc<RefCell<MockState>>,
}

impl MockPorts {
    pub fn with_teensy() -> Self {
        Self {
            ports: vec![PortInfo {
                port_name: "COM3".into(),
                port_type: "USB".into(),
                vid: Some(0x16C0),
                pid: Some(0x0483),
                serial_number: Some("1234560".into()),
                manufacturer: Some("Teensyduino".into()),
                product: Some("USB Serial Device".into()),
            }],
            state: Rc::default(),
        }
    }

    /// Plain ports in enumeration order, described by their name only.
    pub fn with_names(names: &[&str]) -> Self {
        Self {
            ports: names
                .iter()
                .map(|name| PortInfo {
                    port_name: name.to_string(),
                    port_type: "Unknown".into(),
                    vid: None,
                    pid: None,
                    serial_number: None,
                    manufacturer: None,
                    product: None,
                })
                .collect(),
            state: Rc::default(),
        }
    }

    pub fn empty() -> Self {
        Self {
            ports: Vec::new(),
            state: Rc::default(),
        }
    }

    pub fn script(&self, read: MockRead) {
        self.state.borrow_mut().reads.push_back(read);
    }

    pub fn written(&self) -> Vec<u8> {
        self.state.borrow().written.clone()
    }

    pub fn read_calls(&self) -> usize {
        self.state.borrow().read_calls
    }
}

impl PortProvider for MockPorts {
    fn list_ports(&self) -> Result<Vec<PortInfo>, SessionError> {
        Ok(self.ports.clone())
    }

    fn open(&self, port_name: &str, _cfg: &SerialConfig) -> Result<Box<dyn Link>, SessionError> {
        let mut state = self.state.borrow_mut();
        if state.refuse_open {
            return Err(SessionError::Open {
                port: port_name.to_string(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "busy"),
            });
        }
        state.opened.push(port_name.to_string());
        Ok(Box::new(MockLink {
            state: Rc::clone(&self.state),
        }))
    }
}

struct MockLink {
    state: Rc<RefCell<MockState>>,
}

impl Read for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        state.read_calls += 1;
        match state.reads.pop_front() {
            Some(MockRead::Data(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(MockRead::Fault) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device disconnected",
            )),
            Some(MockRead::Timeout) | None => {
                Err(io::Error::new(io::ErrorKind::TimedOut, "timed out"))
            }
        }
    }
}

impl Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.state.borrow_mut().written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
