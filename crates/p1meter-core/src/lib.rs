//! # p1meter-core
//!
//! Telegram decoding and metering-state engine for DSMR P1 smart meters.
//!
//! A P1 port emits a telegram, a block of newline-terminated records,
//! every second. Six of those records carry the readings this crate
//! publishes: cumulative energy per tariff and direction, and instantaneous
//! power per direction. Everything else in the telegram is skipped.
//!
//! ## Architecture
//!
//! Line source → classify → decode → meter state → (exporter reads)
//!
//! The ingestion loop is the sole writer of [`MeterState`]; the exporter and
//! any number of concurrent scrapes read it without ever blocking the loop.
//!
//! ```no_run
//! use p1meter_core::{LineSource, MeterState, ingest};
//!
//! let source = LineSource::from_env().expect("no usable line source");
//! let state = MeterState::new();
//!
//! // Runs until the source fails or runs dry, then reports why.
//! let err = ingest::run(source, &state);
//! eprintln!("ingestion stopped: {err}");
//! ```

pub mod ingest;
pub mod source;
pub mod state;
pub mod telegram;

pub use source::{LineSource, SourceError};
pub use state::MeterState;
pub use telegram::{DecodeError, Reading, ReadingInfo};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
