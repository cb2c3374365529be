mod common;

use activity_metrics::pipeline::detect::detect;
use activity_metrics::{parse_activity, FileFormat, ParseError};
use common::{record, Field, FitWriter, MESG_LAP, MESG_RECORD, MESG_SESSION, SPORT_RUNNING};

#[test]
fn five_k_session_is_normalized() {
    let metrics = parse_activity(&common::five_k_run(), Some("run.fit")).expect("valid fit");

    assert!((metrics.total_distance - 5.0).abs() < 1e-9);
    assert!((metrics.total_time - 1800.0).abs() < 1e-9);
    assert!((metrics.avg_pace - 6.0).abs() < 1e-3);
    assert_eq!(metrics.avg_cadence, 168);
    assert_eq!(metrics.max_cadence, 180);
    assert_eq!(metrics.avg_heart_rate, 150);
    assert_eq!(metrics.max_heart_rate, 171);
    assert_eq!(metrics.total_calories, 420);

    assert_eq!(metrics.laps.len(), 1);
    assert_eq!(metrics.laps[0].lap_number, 1);
    assert_eq!(metrics.laps[0].avg_cadence, 168);
    assert!((metrics.laps[0].pace - 6.0).abs() < 1e-3);

    assert_eq!(metrics.records.len(), 6);
    assert!(metrics.records.iter().all(|s| s.cadence == 168));
    assert!((metrics.records[5].distance - 5.0).abs() < 1e-9);
    assert!((metrics.records[0].speed - 10.0).abs() < 0.01);
}

#[test]
fn fit_bytes_named_gpx_are_still_fit() {
    let bytes = common::five_k_run();
    assert_eq!(detect(&bytes, Some("morning.gpx")), Some(FileFormat::Fit));
    assert_eq!(detect(&bytes, None), Some(FileFormat::Fit));

    let metrics = parse_activity(&bytes, Some("morning.gpx")).expect("valid fit");
    assert_eq!(metrics.avg_cadence, 168);
}

#[test]
fn laps_are_numbered_without_gaps() {
    let lap = |index: u16, meters: u32| {
        vec![
            Field::U16(254, index),
            Field::U32(7, 300_000),
            Field::U32(9, meters * 100),
        ]
    };
    let bytes = FitWriter::new()
        .message(MESG_RECORD, &record(0, 0.0, 80, 140))
        .message(MESG_LAP, &lap(0, 1000))
        .message(MESG_LAP, &lap(1, 1000))
        .message(MESG_LAP, &lap(2, 400))
        .finish();

    let metrics = parse_activity(&bytes, Some("laps.fit")).expect("valid fit");
    let numbers: Vec<u32> = metrics.laps.iter().map(|l| l.lap_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!((metrics.laps[2].distance - 0.4).abs() < 1e-9);
    assert!((metrics.laps[0].pace - 5.0).abs() < 1e-9);
}

#[test]
fn native_lap_order_follows_message_index() {
    let lap = |index: u16, meters: u32, seconds: u32| {
        vec![
            Field::U16(254, index),
            Field::U32(7, seconds * 1000),
            Field::U32(9, meters * 100),
        ]
    };
    let bytes = FitWriter::new()
        .message(MESG_RECORD, &record(0, 0.0, 80, 140))
        .message(MESG_LAP, &lap(2, 400, 120))
        .message(MESG_LAP, &lap(0, 1000, 300))
        .message(MESG_LAP, &lap(1, 1200, 360))
        .finish();

    let metrics = parse_activity(&bytes, Some("laps.fit")).expect("valid fit");
    let distances: Vec<f64> = metrics.laps.iter().map(|l| l.distance).collect();
    assert_eq!(distances, vec![1.0, 1.2, 0.4]);
    let numbers: Vec<u32> = metrics.laps.iter().map(|l| l.lap_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[test]
fn running_sport_cadence_is_read() {
    let bytes = FitWriter::new()
        .message(MESG_RECORD, &record(0, 0.0, 84, 150))
        .message(
            MESG_LAP,
            &[
                Field::Enum(25, SPORT_RUNNING),
                Field::U16(254, 0),
                Field::U32(7, 300_000),
                Field::U32(9, 100_000),
                Field::U8(17, 84),
                Field::U8(18, 90),
            ],
        )
        .message(
            MESG_SESSION,
            &[
                Field::Enum(5, SPORT_RUNNING),
                Field::U32(7, 300_000),
                Field::U32(9, 100_000),
                Field::U8(18, 84),
                Field::U8(19, 90),
            ],
        )
        .finish();

    let metrics = parse_activity(&bytes, Some("run.fit")).expect("valid fit");
    assert_eq!(metrics.avg_cadence, 168);
    assert_eq!(metrics.max_cadence, 180);
    assert_eq!(metrics.laps[0].avg_cadence, 168);
    assert_eq!(metrics.laps[0].max_cadence, 180);
}

#[test]
fn running_dynamics_and_environment_fields_are_read() {
    let bytes = FitWriter::new()
        .message(
            MESG_RECORD,
            &[
                Field::U32(253, 1_000_000_000),
                Field::U32(5, 0),
                Field::U16(2, 3100),
                Field::U32(78, 3150),
                Field::S8(13, 18),
                Field::U16(39, 950),
                Field::U16(41, 2450),
            ],
        )
        .message(
            MESG_RECORD,
            &[
                Field::U32(253, 1_000_000_360),
                Field::U32(5, 100_000),
                Field::U16(2, 3125),
                Field::S8(13, -2),
            ],
        )
        .message(
            MESG_SESSION,
            &[
                Field::U32(7, 360_000),
                Field::U32(9, 100_000),
                Field::U8(24, 35),
                Field::U16(89, 950),
                Field::U16(91, 2450),
                Field::U16(134, 11900),
            ],
        )
        .finish();

    let metrics = parse_activity(&bytes, Some("dynamics.fit")).expect("valid fit");

    assert_eq!(metrics.training_effect, 3.5);
    assert!((metrics.vertical_oscillation - 9.5).abs() < 1e-9);
    assert!((metrics.ground_contact_time - 245.0).abs() < 1e-9);
    assert!((metrics.avg_stride_length - 1.19).abs() < 1e-9);

    let first = &metrics.records[0];
    assert!((first.altitude - 130.0).abs() < 1e-9);
    assert_eq!(first.temperature, 18.0);
    assert!((first.vertical_oscillation - 9.5).abs() < 1e-9);
    assert!((first.ground_contact_time - 245.0).abs() < 1e-9);

    let second = &metrics.records[1];
    assert!((second.altitude - 125.0).abs() < 1e-9);
    assert_eq!(second.temperature, -2.0);
}

#[test]
fn distance_free_records_get_one_session_lap() {
    let mut writer = FitWriter::new();
    for i in 0..=10u32 {
        writer = writer.message(
            MESG_RECORD,
            &[Field::U32(253, 1_000_000_000 + i * 90), Field::U8(3, 150)],
        );
    }
    let bytes = writer
        .message(
            MESG_SESSION,
            &[
                Field::U32(7, 900_000),
                Field::U32(9, 300_000),
                Field::U8(16, 150),
            ],
        )
        .finish();

    let metrics = parse_activity(&bytes, Some("treadmill.fit")).expect("valid fit");
    assert_eq!(metrics.laps.len(), 1);
    let lap = &metrics.laps[0];
    assert_eq!(lap.lap_number, 1);
    assert!((lap.distance - 3.0).abs() < 1e-9);
    assert!((lap.time - 900.0).abs() < 1e-9);
    assert!((lap.pace - 5.0).abs() < 1e-9);
    assert_eq!(lap.avg_heart_rate, 150);
}

#[test]
fn missing_session_is_derived_and_laps_synthesized() {
    let mut writer = FitWriter::new();
    for i in 0..=25u32 {
        writer = writer.message(MESG_RECORD, &record(i * 36, i as f64 * 100.0, 85, 140));
    }
    let metrics = parse_activity(&writer.finish(), Some("nolaps.fit")).expect("valid fit");

    assert!((metrics.total_distance - 2.5).abs() < 1e-9);
    assert!((metrics.total_time - 900.0).abs() < 1e-9);
    assert!((metrics.avg_pace - 6.0).abs() < 1e-9);
    assert_eq!(metrics.avg_cadence, 170);

    assert_eq!(metrics.laps.len(), 3);
    assert!((metrics.laps[0].distance - 1.0).abs() < 1e-9);
    assert!((metrics.laps[2].distance - 0.5).abs() < 1e-9);
    assert!((metrics.laps[0].time - 360.0).abs() < 1e-6);
}

#[test]
fn truncated_file_is_a_decode_error() {
    let mut bytes = common::five_k_run();
    bytes.truncate(bytes.len() - 20);

    match parse_activity(&bytes, Some("broken.fit")) {
        Err(ParseError::Decode { format, reason }) => {
            assert_eq!(format, FileFormat::Fit);
            assert!(reason.contains("truncated"));
        }
        other => panic!("expected decode error, got {:?}", other),
    }
}

#[test]
fn header_only_file_is_empty() {
    let bytes = FitWriter::new().finish();
    assert!(matches!(
        parse_activity(&bytes, Some("empty.fit")),
        Err(ParseError::EmptyActivity(FileFormat::Fit))
    ));
}
