//! The meter's current snapshot: the latest decoded value per reading.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::telegram::Reading;

/// Latest decoded value per reading, in canonical units (W / Wh).
///
/// This is the one shared-mutable thing in the process. The ingestion loop
/// is its sole writer; the exporter and any number of concurrent scrapes
/// read it. A reading that has never been decoded is absent, not zero.
/// Entries appear on first decode and are replaced in place from then on;
/// nothing ever removes one.
///
/// Updates are whole-value replacements under one write lock, so a reader
/// sees either the previous value or the new one, never a torn write.
#[derive(Debug, Default)]
pub struct MeterState {
    readings: RwLock<HashMap<Reading, f64>>,
}

impl MeterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current value for `reading`.
    pub fn update(&self, reading: Reading, value: f64) {
        self.readings.write().unwrap().insert(reading, value);
    }

    /// Latest value for `reading`, or `None` if never observed.
    pub fn read(&self, reading: Reading) -> Option<f64> {
        self.readings.read().unwrap().get(&reading).copied()
    }

    /// One consistent point-in-time copy of every observed reading, in
    /// telegram order.
    pub fn snapshot(&self) -> Vec<(Reading, f64)> {
        let readings = self.readings.read().unwrap();
        let mut snapshot: Vec<(Reading, f64)> =
            readings.iter().map(|(&reading, &value)| (reading, value)).collect();
        snapshot.sort_by_key(|(reading, _)| {
            Reading::ALL.iter().position(|candidate| candidate == reading)
        });
        snapshot
    }

    /// How many distinct readings have been observed so far.
    pub fn observed(&self) -> usize {
        self.readings.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unobserved_readings_read_as_unset() {
        let state = MeterState::new();
        for reading in Reading::ALL {
            assert_eq!(state.read(reading), None);
        }
        assert_eq!(state.observed(), 0);
        assert!(state.snapshot().is_empty());
    }

    #[test]
    fn update_then_read_round_trips() {
        let state = MeterState::new();
        state.update(Reading::PowerDelivered, 244.0);
        assert_eq!(state.read(Reading::PowerDelivered), Some(244.0));
        assert_eq!(state.read(Reading::PowerReceived), None);
        assert_eq!(state.observed(), 1);
    }

    #[test]
    fn last_write_wins_regardless_of_magnitude() {
        let state = MeterState::new();
        state.update(Reading::EnergyDeliveredLow, 9_999_999.0);
        state.update(Reading::EnergyDeliveredLow, 12.0);
        assert_eq!(state.read(Reading::EnergyDeliveredLow), Some(12.0));
        assert_eq!(state.observed(), 1);
    }

    #[test]
    fn repeated_identical_updates_are_idempotent() {
        let state = MeterState::new();
        state.update(Reading::PowerReceived, 37.0);
        let once = state.snapshot();
        state.update(Reading::PowerReceived, 37.0);
        assert_eq!(state.snapshot(), once);
    }

    #[test]
    fn snapshot_is_ordered_like_the_telegram() {
        let state = MeterState::new();
        state.update(Reading::PowerReceived, 1.0);
        state.update(Reading::EnergyDeliveredLow, 2.0);
        state.update(Reading::PowerDelivered, 3.0);
        let order: Vec<Reading> = state.snapshot().into_iter().map(|(r, _)| r).collect();
        assert_eq!(
            order,
            vec![
                Reading::EnergyDeliveredLow,
                Reading::PowerDelivered,
                Reading::PowerReceived,
            ]
        );
    }
}
