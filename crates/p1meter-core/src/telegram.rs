//! P1 telegram records: the closed table of metered OBIS codes and the
//! fixed-position field decoder.
//!
//! A DSMR meter emits a telegram, a block of newline-terminated records,
//! every second. Six records carry readings we publish; everything else
//! (equipment ids, timestamps, gas-meter lines, the checksum trailer) is
//! skipped without comment. Matching is a byte-exact prefix check against
//! the table below; the numeric field sits at a fixed offset with a fixed
//! width that differs between cumulative-energy and instantaneous-power
//! records.

use std::fmt;
use std::num::ParseFloatError;

use thiserror::Error;

/// One metered quantity reported over the P1 port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reading {
    /// Cumulative energy delivered to the client, low tariff.
    EnergyDeliveredLow,
    /// Cumulative energy received from the client, low tariff.
    EnergyReceivedLow,
    /// Cumulative energy delivered to the client, high tariff.
    EnergyDeliveredHigh,
    /// Cumulative energy received from the client, high tariff.
    EnergyReceivedHigh,
    /// Instantaneous power delivered to the client.
    PowerDelivered,
    /// Instantaneous power received from the client.
    PowerReceived,
}

/// Static metadata for a [`Reading`]: which record carries it, where its
/// numeric field sits, and how to bring the value into canonical units.
#[derive(Debug, Clone)]
pub struct ReadingInfo {
    /// OBIS reference the record starts with (e.g. `"1-0:1.8.1"`).
    pub obis: &'static str,
    /// Byte offset of the numeric field, from the start of the record.
    pub field_offset: usize,
    /// Byte width of the numeric field.
    pub field_width: usize,
    /// Factor from the telegram's unit (kWh / kW) to the canonical one.
    pub scale: f64,
    /// Canonical unit after scaling.
    pub unit: &'static str,
    /// One-line human-readable description.
    pub description: &'static str,
}

static ENERGY_DELIVERED_LOW: ReadingInfo = ReadingInfo {
    obis: "1-0:1.8.1",
    field_offset: 10,
    field_width: 10,
    scale: 1000.0,
    unit: "Wh",
    description: "cumulative energy delivered to client, low tariff",
};

static ENERGY_RECEIVED_LOW: ReadingInfo = ReadingInfo {
    obis: "1-0:2.8.1",
    field_offset: 10,
    field_width: 10,
    scale: 1000.0,
    unit: "Wh",
    description: "cumulative energy received from client, low tariff",
};

static ENERGY_DELIVERED_HIGH: ReadingInfo = ReadingInfo {
    obis: "1-0:1.8.2",
    field_offset: 10,
    field_width: 10,
    scale: 1000.0,
    unit: "Wh",
    description: "cumulative energy delivered to client, high tariff",
};

static ENERGY_RECEIVED_HIGH: ReadingInfo = ReadingInfo {
    obis: "1-0:2.8.2",
    field_offset: 10,
    field_width: 10,
    scale: 1000.0,
    unit: "Wh",
    description: "cumulative energy received from client, high tariff",
};

static POWER_DELIVERED: ReadingInfo = ReadingInfo {
    obis: "1-0:1.7.0",
    field_offset: 10,
    field_width: 6,
    scale: 1000.0,
    unit: "W",
    description: "instantaneous power delivered to client",
};

static POWER_RECEIVED: ReadingInfo = ReadingInfo {
    obis: "1-0:2.7.0",
    field_offset: 10,
    field_width: 6,
    scale: 1000.0,
    unit: "W",
    description: "instantaneous power received from client",
};

impl Reading {
    /// Every reading the meter reports, in telegram order.
    pub const ALL: [Reading; 6] = [
        Reading::EnergyDeliveredLow,
        Reading::EnergyReceivedLow,
        Reading::EnergyDeliveredHigh,
        Reading::EnergyReceivedHigh,
        Reading::PowerDelivered,
        Reading::PowerReceived,
    ];

    /// Reading metadata.
    pub fn info(self) -> &'static ReadingInfo {
        match self {
            Reading::EnergyDeliveredLow => &ENERGY_DELIVERED_LOW,
            Reading::EnergyReceivedLow => &ENERGY_RECEIVED_LOW,
            Reading::EnergyDeliveredHigh => &ENERGY_DELIVERED_HIGH,
            Reading::EnergyReceivedHigh => &ENERGY_RECEIVED_HIGH,
            Reading::PowerDelivered => &POWER_DELIVERED,
            Reading::PowerReceived => &POWER_RECEIVED,
        }
    }

    /// Match a raw record against the table.
    ///
    /// Byte-exact, case-sensitive prefix match. A record matching no entry
    /// is not an error, just not ours. The table's prefixes are
    /// mutually exclusive, so at most one entry can match.
    pub fn classify(line: &str) -> Option<Reading> {
        Reading::ALL
            .into_iter()
            .find(|reading| line.starts_with(reading.info().obis))
    }

    /// Extract and parse this reading's numeric field from a record already
    /// known to carry it. Returns the value in the canonical unit.
    pub fn decode(self, line: &str) -> Result<f64, DecodeError> {
        let info = self.info();
        let end = info.field_offset + info.field_width;
        let field = line
            .get(info.field_offset..end)
            .ok_or_else(|| DecodeError::Truncated {
                reading: self,
                want: end,
                have: line.trim_end().len(),
            })?;
        let value: f64 = field.parse().map_err(|err| DecodeError::Malformed {
            reading: self,
            field: field.to_string(),
            err,
        })?;
        Ok(value * info.scale)
    }

    /// Label value for the flow direction of this reading.
    pub fn direction(self) -> &'static str {
        match self {
            Reading::EnergyDeliveredLow | Reading::EnergyDeliveredHigh | Reading::PowerDelivered => {
                "delivered"
            }
            Reading::EnergyReceivedLow | Reading::EnergyReceivedHigh | Reading::PowerReceived => {
                "received"
            }
        }
    }

    /// Tariff label for cumulative-energy readings. Instantaneous power is
    /// not accumulated per tariff and has none.
    pub fn tariff(self) -> Option<&'static str> {
        match self {
            Reading::EnergyDeliveredLow | Reading::EnergyReceivedLow => Some("tariff1"),
            Reading::EnergyDeliveredHigh | Reading::EnergyReceivedHigh => Some("tariff2"),
            Reading::PowerDelivered | Reading::PowerReceived => None,
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info().obis)
    }
}

/// A record matched the table but its numeric field would not parse.
///
/// Recoverable, per record: the caller drops the record and carries on with
/// the next one. Nothing is retried and no state is written.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{reading} record too short: field ends at byte {want}, record has {have}")]
    Truncated {
        reading: Reading,
        want: usize,
        have: usize,
    },
    #[error("{reading} field {field:?} is not a decimal number: {err}")]
    Malformed {
        reading: Reading,
        field: String,
        err: ParseFloatError,
    },
}
