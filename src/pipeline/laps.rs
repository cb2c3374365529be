use crate::types::activity::{DistanceUnit, RawLap, RawRecord, RawSession, SensorStats};

/// Remainders shorter than this (in km) do not open another lap.
const LAP_EPSILON_KM: f64 = 1e-6;

struct OpenLap {
    start: f64,
    time: f64,
    heart_rate: SensorStats,
    cadence: SensorStats,
}

impl OpenLap {
    fn new(start: f64) -> Self {
        Self {
            start,
            time: 0.0,
            heart_rate: SensorStats::default(),
            cadence: SensorStats::default(),
        }
    }

    fn add(&mut self, point: &RawRecord) {
        self.heart_rate.push(point.heart_rate);
        self.cadence.push(point.cadence);
    }

    fn close(self, end: f64, ordinal: u32) -> RawLap {
        RawLap {
            ordinal: Some(ordinal),
            elapsed_time: Some(self.time),
            distance: Some(end - self.start),
            avg_heart_rate: self.heart_rate.mean(),
            max_heart_rate: self.heart_rate.max(),
            avg_cadence: self.cadence.mean(),
            max_cadence: self.cadence.max(),
            ..RawLap::default()
        }
    }
}

/// Split a continuous track into 1 km laps.
///
/// `cumulative[i]` is the distance covered at `points[i]` in `unit`, and
/// `segment_seconds[i]` is the time between `points[i]` and `points[i + 1]`.
/// Boundary crossings are interpolated within the crossing segment, so every
/// lap but the last is exactly one kilometer and the segment's time is split
/// in the same proportion. Each trackpoint's readings count toward exactly one
/// lap: the one containing its position, with a point lying on a boundary
/// belonging to the lap it closes.
pub fn synthesize(
    points: &[RawRecord],
    cumulative: &[f64],
    segment_seconds: &[f64],
    unit: DistanceUnit,
) -> Vec<RawLap> {
    let n = points.len().min(cumulative.len());
    if n < 2 {
        return Vec::new();
    }

    let lap_length = unit.per_km();
    let epsilon = LAP_EPSILON_KM * lap_length;
    let end = cumulative[n - 1];

    let mut laps = Vec::new();
    let mut boundary = cumulative[0] + lap_length;
    let mut lap = OpenLap::new(cumulative[0]);
    lap.add(&points[0]);

    for i in 1..n {
        let (d0, d1) = (cumulative[i - 1], cumulative[i]);
        let seconds = segment_seconds.get(i - 1).copied().unwrap_or(0.0);
        let span = d1 - d0;
        let share = |from: f64, to: f64| {
            if span > 0.0 {
                seconds * ((to - from) / span).max(0.0)
            } else {
                0.0
            }
        };

        let mut from = d0;
        let mut placed = false;

        // Stop before a boundary that coincides with the end of the track so
        // the stream never produces a zero-length trailing lap.
        while d1 >= boundary - epsilon && end - boundary > epsilon {
            lap.time += share(from, boundary.min(d1));
            if d1 <= boundary + epsilon {
                lap.add(&points[i]);
                placed = true;
            }

            let ordinal = laps.len() as u32 + 1;
            let closed = std::mem::replace(&mut lap, OpenLap::new(boundary));
            laps.push(closed.close(boundary, ordinal));

            from = boundary;
            boundary += lap_length;
        }

        lap.time += if span > 0.0 { share(from, d1) } else { seconds };
        if !placed {
            lap.add(&points[i]);
        }
    }

    if end - lap.start > epsilon {
        let ordinal = laps.len() as u32 + 1;
        laps.push(lap.close(end, ordinal));
    }

    laps
}

/// Synthesize laps for an activity that carries records but no laps of its own.
pub fn synthesize_from_records(records: &[RawRecord], unit: DistanceUnit) -> Vec<RawLap> {
    let mut covered = 0.0_f64;
    let cumulative: Vec<f64> = records
        .iter()
        .map(|record| {
            if let Some(distance) = record.distance {
                covered = covered.max(distance);
            }
            covered
        })
        .collect();

    let segment_seconds: Vec<f64> = records
        .windows(2)
        .map(|pair| match (pair[0].timestamp, pair[1].timestamp) {
            (Some(prev), Some(curr)) => (curr - prev).num_milliseconds().max(0) as f64 / 1000.0,
            _ => 0.0,
        })
        .collect();

    synthesize(records, &cumulative, &segment_seconds, unit)
}

/// One lap spanning the whole activity, for sources whose records carry no
/// distance to split on. `None` when the session covered no distance either.
pub fn whole_activity(session: &RawSession) -> Option<RawLap> {
    session.distance.filter(|d| *d > 0.0)?;

    Some(RawLap {
        ordinal: Some(1),
        elapsed_time: session.elapsed_time,
        distance: session.distance,
        avg_speed: session.avg_speed,
        avg_heart_rate: session.avg_heart_rate,
        max_heart_rate: session.max_heart_rate,
        avg_cadence: session.avg_cadence,
        max_cadence: session.max_cadence,
    })
}
