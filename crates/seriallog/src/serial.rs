//! Serial endpoint management.
//!
//! This module wraps the platform serial driver behind [`SerialEndpoint`]:
//! opening a port with a bounded per-read timeout, reading one
//! newline-delimited line at a time, and reporting closure exactly once
//! when the endpoint is dropped. The [`LineSource`] trait is the seam the
//! acquisition loop reads through, so the loop can be driven without
//! hardware in tests.

use std::io::Read;
use std::time::Duration;

use serde::Serialize;
use serialport::SerialPort;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// A source of newline-delimited text lines.
///
/// Implementors yield `Ok(Some(line))` for a received line (without its
/// terminator), `Ok(None)` when no data arrived within the read timeout,
/// and `Err` for failures that end the session.
pub trait LineSource {
    /// Read one line, blocking up to the source's configured timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails or the received
    /// bytes are not valid text.
    fn read_line(&mut self) -> Result<Option<String>>;
}

/// An exclusively-owned serial port, read line by line.
///
/// Opened once at session start and closed exactly once when dropped;
/// closure is reported so the operator can confirm the port was released.
pub struct SerialEndpoint {
    port: Box<dyn SerialPort>,
    name: String,
}

impl std::fmt::Debug for SerialEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialEndpoint")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl SerialEndpoint {
    /// Open the named port at the given baud rate with a per-read timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PortUnavailable`], [`Error::PortPermission`], or
    /// [`Error::PortOpen`] depending on why the port could not be opened.
    pub fn open(name: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        debug!("opening serial port {} at {} baud", name, baud_rate);
        let port = serialport::new(name, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|source| Error::port_open(name, source))?;

        info!("serial port {} opened at {} baud", name, baud_rate);
        Ok(Self {
            port,
            name: name.to_string(),
        })
    }

    /// The name of the underlying port.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read raw bytes up to a newline or the read timeout.
    ///
    /// Returns `None` if the timeout expired with nothing received. A
    /// timeout with a partial line buffered returns the partial line, as
    /// the transport delivered it.
    fn read_line_bytes(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buffer = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            match self.port.read(&mut byte) {
                Ok(0) => {
                    if buffer.is_empty() {
                        return Ok(None);
                    }
                    break;
                }
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    buffer.push(byte[0]);
                }
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::TimedOut
                        || e.kind() == std::io::ErrorKind::Interrupted =>
                {
                    // No data within the timeout window, or a signal
                    // landed mid-read; both are observed by the caller
                    // as "no line yet".
                    if buffer.is_empty() {
                        return Ok(None);
                    }
                    break;
                }
                Err(e) => return Err(Error::PortRead(e)),
            }
        }

        // Strip a trailing carriage return from CRLF-terminated lines.
        if buffer.last() == Some(&b'\r') {
            buffer.pop();
        }

        Ok(Some(buffer))
    }
}

impl LineSource for SerialEndpoint {
    fn read_line(&mut self) -> Result<Option<String>> {
        match self.read_line_bytes()? {
            // Malformed bytes end the session rather than being skipped.
            Some(bytes) => Ok(Some(String::from_utf8(bytes)?)),
            None => Ok(None),
        }
    }
}

impl Drop for SerialEndpoint {
    fn drop(&mut self) {
        info!("serial port {} closed", self.name);
    }
}

/// Information about one detected serial port.
#[derive(Debug, Clone, Serialize)]
pub struct PortInfo {
    /// Platform name of the port (e.g. `/dev/ttyUSB0`, `COM5`).
    pub name: String,
    /// The kind of port (USB, PCI, Bluetooth, unknown).
    pub kind: String,
    /// USB manufacturer string, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    /// USB product string, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    /// USB serial number, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    /// USB vendor ID, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vid: Option<u16>,
    /// USB product ID, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u16>,
}

/// List the serial ports available on this machine.
///
/// # Errors
///
/// Returns [`Error::PortList`] if port enumeration fails.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(Error::PortList)?;

    let infos = ports
        .into_iter()
        .map(|p| {
            let (kind, manufacturer, product, serial_number, vid, pid) = match p.port_type {
                serialport::SerialPortType::UsbPort(usb) => (
                    "usb".to_string(),
                    usb.manufacturer,
                    usb.product,
                    usb.serial_number,
                    Some(usb.vid),
                    Some(usb.pid),
                ),
                serialport::SerialPortType::PciPort => {
                    ("pci".to_string(), None, None, None, None, None)
                }
                serialport::SerialPortType::BluetoothPort => {
                    ("bluetooth".to_string(), None, None, None, None, None)
                }
                serialport::SerialPortType::Unknown => {
                    ("unknown".to_string(), None, None, None, None, None)
                }
            };

            PortInfo {
                name: p.port_name,
                kind,
                manufacturer,
                product,
                serial_number,
                vid,
                pid,
            }
        })
        .collect();

    Ok(infos)
}
