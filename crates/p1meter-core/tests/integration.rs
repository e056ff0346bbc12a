//! Integration tests for p1meter-core.
//!
//! These drive the full pipeline the daemon runs in production:
//! capture file → line source → ingestion loop → meter state.

use std::io::Write;
use std::time::{Duration, Instant};

use tempfile::NamedTempFile;

use p1meter_core::{LineSource, MeterState, Reading, SourceError, ingest};

/// Short replay delay so paced tests stay fast while still exercising the
/// pacing path.
const TEST_PACING: Duration = Duration::from_millis(5);

fn capture(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp capture");
    file.write_all(contents.as_bytes()).expect("write capture");
    file
}

fn replay(contents: &str) -> (MeterState, SourceError) {
    let file = capture(contents);
    let source = LineSource::replay_paced(file.path(), TEST_PACING).unwrap();
    let state = MeterState::new();
    let err = ingest::run(source, &state);
    (state, err)
}

#[test]
fn power_record_lands_in_watts() {
    let (state, err) = replay("1-0:1.7.0(00.244*kW)\n");
    assert!(matches!(err, SourceError::EndOfStream));
    let value = state.read(Reading::PowerDelivered).expect("power decoded");
    assert!((value - 244.0).abs() < 1e-6, "got {value}");
}

#[test]
fn energy_record_lands_in_watthours() {
    let (state, err) = replay("1-0:1.8.1(001234.567*kWh)\n");
    assert!(matches!(err, SourceError::EndOfStream));
    let value = state
        .read(Reading::EnergyDeliveredLow)
        .expect("energy decoded");
    assert!((value - 1_234_567.0).abs() < 1e-3, "got {value}");
}

#[test]
fn unknown_records_leave_every_reading_unset() {
    let (state, _) = replay("0-1:24.2.1(160315180000W)(00081.092*m3)\n");
    for reading in Reading::ALL {
        assert_eq!(state.read(reading), None, "{reading} should be unset");
    }
}

#[test]
fn snapshot_before_any_record_is_fully_unset() {
    let state = MeterState::new();
    for reading in Reading::ALL {
        assert_eq!(state.read(reading), None);
    }
    assert!(state.snapshot().is_empty());
}

#[test]
fn paced_replay_of_mixed_capture_yields_both_values() {
    let file = capture(
        "1-0:1.8.1(000306.946*kWh)\n\
         0-0:96.14.0(0002)\n\
         1-0:1.7.0(02.793*kW)\n",
    );
    let source = LineSource::replay_paced(file.path(), TEST_PACING).unwrap();
    let state = MeterState::new();

    let started = Instant::now();
    let err = ingest::run(source, &state);
    let elapsed = started.elapsed();

    assert!(matches!(err, SourceError::EndOfStream));
    // Three records, each followed by a pacing delay.
    assert!(elapsed >= TEST_PACING * 2, "replay finished in {elapsed:?}");

    let energy = state.read(Reading::EnergyDeliveredLow).expect("energy");
    assert!((energy - 306_946.0).abs() < 1e-3);
    let power = state.read(Reading::PowerDelivered).expect("power");
    assert!((power - 2793.0).abs() < 1e-6);
    assert_eq!(state.observed(), 2);
}

#[test]
fn full_telegram_populates_all_six_readings() {
    let (state, _) = replay(
        "/KFM5KAIFA-METER\n\
         \n\
         1-3:0.2.8(42)\n\
         0-0:1.0.0(160315184416W)\n\
         1-0:1.8.1(000306.946*kWh)\n\
         1-0:2.8.1(000011.000*kWh)\n\
         1-0:1.8.2(000210.088*kWh)\n\
         1-0:2.8.2(000022.000*kWh)\n\
         0-0:96.14.0(0002)\n\
         1-0:1.7.0(02.793*kW)\n\
         1-0:2.7.0(00.000*kW)\n\
         !6EEE\n",
    );
    assert_eq!(state.observed(), Reading::ALL.len());
    let high = state.read(Reading::EnergyDeliveredHigh).expect("tariff2");
    assert!((high - 210_088.0).abs() < 1e-3);
    assert_eq!(state.read(Reading::PowerReceived), Some(0.0));
}

#[test]
fn reprocessing_the_same_record_is_idempotent() {
    let (state, _) = replay(
        "1-0:2.8.2(000022.000*kWh)\n\
         1-0:2.8.2(000022.000*kWh)\n",
    );
    assert_eq!(state.observed(), 1);
    let value = state.read(Reading::EnergyReceivedHigh).expect("decoded");
    assert!((value - 22_000.0).abs() < 1e-3);
}

#[test]
fn shipped_capture_decodes_end_to_end() {
    // The capture the daemon replays when SERIAL_DEVICE is unset lives at
    // the workspace root; resolve it relative to this crate.
    let path = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../captures/telegram.txt"
    );
    let source = LineSource::replay_paced(path, Duration::ZERO).unwrap();
    let state = MeterState::new();
    let err = ingest::run(source, &state);
    assert!(matches!(err, SourceError::EndOfStream));
    assert_eq!(state.observed(), Reading::ALL.len());
    for reading in Reading::ALL {
        let value = state.read(reading).expect("reading observed");
        assert!(value.is_finite() && value >= 0.0);
    }
}
