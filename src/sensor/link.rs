use std::io::{BufRead, BufReader, ErrorKind};
use std::time::Duration;

use serialport::SerialPort;

use crate::error::DeviceError;

/// One open connection to the sensor board.
pub trait SensorLink: Send {
    /// Blocks until a full line arrives or the read times out.
    ///
    /// `Ok(None)` means the timeout elapsed; partial input is kept for the
    /// next call.
    fn read_line(&mut self) -> Result<Option<String>, DeviceError>;
}

/// Opens (and reopens) the sensor device.
pub trait SensorConnector: Send {
    fn connect(&mut self) -> Result<Box<dyn SensorLink>, DeviceError>;

    fn describe(&self) -> String;
}

pub struct SerialConnector {
    path: String,
    baud_rate: u32,
    read_timeout: Duration,
}

impl SerialConnector {
    pub fn new(path: impl Into<String>, baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            read_timeout,
        }
    }
}

impl SensorConnector for SerialConnector {
    fn connect(&mut self) -> Result<Box<dyn SensorLink>, DeviceError> {
        let port = serialport::new(&self.path, self.baud_rate)
            .timeout(self.read_timeout)
            .open()
            .map_err(|err| DeviceError::Open(format!("{}: {err}", self.path)))?;

        Ok(Box::new(SerialLink {
            reader: BufReader::new(port),
            pending: Vec::new(),
        }))
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.path, self.baud_rate)
    }
}

struct SerialLink {
    reader: BufReader<Box<dyn SerialPort>>,
    pending: Vec<u8>,
}

impl SensorLink for SerialLink {
    fn read_line(&mut self) -> Result<Option<String>, DeviceError> {
        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) => Err(DeviceError::Disconnected),
            Ok(_) => {
                // Garbled bytes are expected on power-up; let the parser reject them.
                let line = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                Ok(Some(line))
            }
            Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                Ok(None)
            }
            Err(err) => Err(DeviceError::Io(err)),
        }
    }
}
