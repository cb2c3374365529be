use crate::types::activity::{
    CanonicalMetrics, FileFormat, Lap, RawActivity, RawLap, RawRecord, RawSession, Sample,
};

const MPS_TO_KMH: f64 = 3.6;
const MM_PER_CM: f64 = 10.0;
const MM_PER_M: f64 = 1000.0;

/// Minutes per kilometer from a speed in km/h; 0 when standing still.
pub fn pace_from_speed_kmh(speed_kmh: f64) -> f64 {
    if speed_kmh > 0.0 && speed_kmh.is_finite() {
        60.0 / speed_kmh
    } else {
        0.0
    }
}

/// Minutes per kilometer from distance and time; 0 when no distance was covered.
pub fn pace_from_distance(distance_km: f64, time_seconds: f64) -> f64 {
    if distance_km > 0.0 && time_seconds >= 0.0 {
        (time_seconds / 60.0) / distance_km
    } else {
        0.0
    }
}

/// Convert a decoded activity into the canonical schema. Every unit
/// conversion happens here, once: distances to km, m/s to km/h, mm to cm or m,
/// and half-cadence to full steps per minute.
pub fn normalize(raw: RawActivity, format: FileFormat) -> CanonicalMetrics {
    let RawActivity {
        session,
        laps,
        records,
    } = raw;

    let mut metrics = normalize_session(&session, format);
    metrics.laps = normalize_laps(laps, format);
    metrics.records = normalize_records(&records, format);

    // Some sources report no usable average speed; fall back to the totals.
    if metrics.avg_pace == 0.0 && metrics.total_distance > 0.0 && metrics.total_time > 0.0 {
        metrics.avg_pace = pace_from_distance(metrics.total_distance, metrics.total_time);
    }

    metrics
}

fn normalize_session(session: &RawSession, format: FileFormat) -> CanonicalMetrics {
    let unit = format.distance_unit();
    let total_distance = non_negative(session.distance.map(|d| unit.to_km(d)));
    let total_time = non_negative(session.elapsed_time);

    let avg_pace = if total_distance > 0.0 {
        pace_from_speed_kmh(non_negative(session.avg_speed) * MPS_TO_KMH)
    } else {
        0.0
    };

    CanonicalMetrics {
        total_time,
        total_distance,
        avg_pace,
        avg_heart_rate: whole(session.avg_heart_rate),
        max_heart_rate: whole(session.max_heart_rate),
        avg_cadence: full_cadence(session.avg_cadence),
        max_cadence: full_cadence(session.max_cadence),
        total_calories: non_negative(session.calories).round() as u32,
        avg_stride_length: non_negative(session.stride_length) / MM_PER_M,
        vertical_oscillation: non_negative(session.vertical_oscillation) / MM_PER_CM,
        ground_contact_time: non_negative(session.stance_time),
        training_effect: non_negative(session.training_effect),
        ..CanonicalMetrics::default()
    }
}

fn normalize_laps(mut laps: Vec<RawLap>, format: FileFormat) -> Vec<Lap> {
    let unit = format.distance_unit();

    // Native ordinals decide the order; numbering is then made gap-free.
    laps.sort_by_key(|lap| lap.ordinal.unwrap_or(u32::MAX));
    let sequential = laps
        .iter()
        .enumerate()
        .all(|(i, lap)| lap.ordinal.map_or(true, |o| o == i as u32 + 1));
    if !sequential {
        tracing::warn!("{} lap ordinals are not sequential, renumbering", format);
    }

    laps.iter()
        .enumerate()
        .map(|(i, lap)| {
            let distance = non_negative(lap.distance.map(|d| unit.to_km(d)));
            let time = non_negative(lap.elapsed_time);
            let pace = match lap.avg_speed.filter(|s| *s > 0.0) {
                _ if distance == 0.0 => 0.0,
                Some(speed) => pace_from_speed_kmh(speed * MPS_TO_KMH),
                None => pace_from_distance(distance, time),
            };

            Lap {
                lap_number: i as u32 + 1,
                distance,
                time,
                pace,
                avg_heart_rate: whole(lap.avg_heart_rate),
                max_heart_rate: whole(lap.max_heart_rate),
                avg_cadence: full_cadence(lap.avg_cadence),
                max_cadence: full_cadence(lap.max_cadence),
            }
        })
        .collect()
}

fn normalize_records(records: &[RawRecord], format: FileFormat) -> Vec<Sample> {
    let unit = format.distance_unit();
    let mut covered = 0.0_f64;

    records
        .iter()
        .map(|record| {
            // Cumulative distance never goes backwards, even when a sample lacks it.
            covered = covered.max(non_negative(record.distance.map(|d| unit.to_km(d))));

            Sample {
                timestamp: record.timestamp,
                distance: covered,
                speed: non_negative(record.speed) * MPS_TO_KMH,
                heart_rate: whole(record.heart_rate),
                cadence: full_cadence(record.cadence),
                altitude: finite(record.altitude),
                temperature: finite(record.temperature),
                vertical_oscillation: non_negative(record.vertical_oscillation) / MM_PER_CM,
                ground_contact_time: non_negative(record.stance_time),
            }
        })
        .collect()
}

fn finite(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

fn non_negative(value: Option<f64>) -> f64 {
    finite(value).max(0.0)
}

fn whole(value: Option<f64>) -> u16 {
    non_negative(value).round().min(u16::MAX as f64) as u16
}

fn full_cadence(half: Option<f64>) -> u16 {
    whole(half.map(|c| c * 2.0))
}
