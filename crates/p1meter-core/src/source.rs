//! Where records come from: a live P1 serial port or a replayed capture.
//!
//! The device-versus-capture decision is made once, here, when the source is
//! built. The pacing capability travels with the constructed source, so the
//! ingestion loop never has to re-inspect the environment per record.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Environment variable naming the P1 serial device. When unset, the
/// recorded capture is replayed instead.
pub const SERIAL_DEVICE_ENV: &str = "SERIAL_DEVICE";

/// P1 port baud rate (DSMR 4.x and later).
pub const BAUD_RATE: u32 = 115_200;

/// Inter-record delay when replaying a capture, approximating the arrival
/// rate of a live meter.
pub const REPLAY_PACING: Duration = Duration::from_millis(200);

/// Capture replayed when no serial device is configured.
pub const DEFAULT_CAPTURE: &str = "captures/telegram.txt";

/// A healthy meter emits a telegram every second; a read blocking this long
/// means the line is dead and the process should die with it.
const SERIAL_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Failure to open or read a line source.
///
/// All of these are fatal to ingestion. Per-record problems are handled
/// downstream; anything surfacing here ends the loop, and the process is
/// expected to be restarted by its supervisor.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not open serial device {device}: {err}")]
    SerialOpen {
        device: String,
        #[source]
        err: serialport::Error,
    },
    #[error("could not open capture file {path}: {err}")]
    CaptureOpen {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("read from line source failed: {0}")]
    Read(#[from] io::Error),
    #[error("line source exhausted")]
    EndOfStream,
}

/// An ordered, unbounded sequence of newline-terminated records.
pub struct LineSource {
    reader: BufReader<Box<dyn Read + Send>>,
    pacing: Option<Duration>,
}

impl std::fmt::Debug for LineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSource")
            .field("pacing", &self.pacing)
            .finish_non_exhaustive()
    }
}

impl LineSource {
    /// Open a live P1 port at the fixed baud rate. Live meters pace their
    /// own output, so no artificial delay is attached.
    pub fn serial(device: &str) -> Result<Self, SourceError> {
        let port = serialport::new(device, BAUD_RATE)
            .timeout(SERIAL_READ_TIMEOUT)
            .open()
            .map_err(|err| SourceError::SerialOpen {
                device: device.to_string(),
                err,
            })?;
        Ok(Self {
            reader: BufReader::new(Box::new(port) as Box<dyn Read + Send>),
            pacing: None,
        })
    }

    /// Replay a recorded capture with the standard inter-record delay.
    pub fn replay(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        Self::replay_paced(path, REPLAY_PACING)
    }

    /// Replay a recorded capture with an explicit inter-record delay.
    pub fn replay_paced(path: impl AsRef<Path>, pacing: Duration) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| SourceError::CaptureOpen {
            path: path.to_path_buf(),
            err,
        })?;
        Ok(Self {
            reader: BufReader::new(Box::new(file) as Box<dyn Read + Send>),
            pacing: Some(pacing),
        })
    }

    /// Build the source this process was configured for: the serial device
    /// named by `SERIAL_DEVICE`, or the built-in capture when unset.
    pub fn from_env() -> Result<Self, SourceError> {
        match std::env::var(SERIAL_DEVICE_ENV) {
            Ok(device) if !device.is_empty() => {
                log::info!("reading from serial device {device}");
                Self::serial(&device)
            }
            _ => {
                log::info!("{SERIAL_DEVICE_ENV} not set, replaying {DEFAULT_CAPTURE}");
                Self::replay(DEFAULT_CAPTURE)
            }
        }
    }

    /// Inter-record delay to apply between reads, if this source needs one.
    pub fn pacing(&self) -> Option<Duration> {
        self.pacing
    }

    /// Read the next record, terminator included.
    ///
    /// Records are read as raw bytes and converted lossily, so a stray
    /// non-ASCII byte degrades one record instead of ending the stream.
    /// End of stream and read failures both surface as errors; neither is
    /// retried here.
    pub fn next_line(&mut self) -> Result<String, SourceError> {
        let mut raw = Vec::new();
        match self.reader.read_until(b'\n', &mut raw)? {
            0 => Err(SourceError::EndOfStream),
            _ => Ok(String::from_utf8_lossy(&raw).into_owned()),
        }
    }
}
