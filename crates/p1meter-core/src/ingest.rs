//! The ingestion loop: record in, state update out, until the source dies.

use std::thread;

use crate::source::{LineSource, SourceError};
use crate::state::MeterState;
use crate::telegram::Reading;

/// Drive `source` into `state` until the source fails or runs dry, and
/// return the error that stopped it.
///
/// Per-record decode failures are logged and absorbed here; they never stop
/// the loop and never touch the state. Records matching no table entry are
/// skipped silently. Exhaustion and read errors are fatal: nothing here
/// reconnects, the supervisor restarts the whole process.
pub fn run(mut source: LineSource, state: &MeterState) -> SourceError {
    loop {
        let line = match source.next_line() {
            Ok(line) => line,
            Err(err) => return err,
        };

        if let Some(reading) = Reading::classify(&line) {
            match reading.decode(&line) {
                Ok(value) => state.update(reading, value),
                Err(err) => log::warn!("dropping record: {err}"),
            }
        }

        if let Some(delay) = source.pacing() {
            thread::sleep(delay);
        }
    }
}
