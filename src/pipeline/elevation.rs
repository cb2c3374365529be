use crate::types::activity::CanonicalMetrics;

const SMOOTH_WINDOW: usize = 5;
/// Altitude changes at or below this many meters are treated as sensor noise.
const NOISE_THRESHOLD_M: f64 = 0.5;

/// Fill in `elevation_gain`/`elevation_loss` from the record altitudes.
pub fn annotate(metrics: &mut CanonicalMetrics) {
    let altitudes: Vec<f64> = metrics.records.iter().map(|r| r.altitude).collect();
    let (gain, loss) = gain_and_loss(&altitudes);
    metrics.elevation_gain = gain;
    metrics.elevation_loss = loss;
}

fn gain_and_loss(altitudes: &[f64]) -> (f64, f64) {
    let smoothed = smooth(altitudes);

    let mut gain = 0.0;
    let mut loss = 0.0;
    for pair in smoothed.windows(2) {
        let diff = pair[1] - pair[0];
        if diff > NOISE_THRESHOLD_M {
            gain += diff;
        } else if diff < -NOISE_THRESHOLD_M {
            loss -= diff;
        }
    }

    (f64::round(gain), f64::round(loss))
}

/// Centered moving average; the window shrinks at both ends of the track.
fn smooth(values: &[f64]) -> Vec<f64> {
    let half = SMOOTH_WINDOW / 2;
    (0..values.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(values.len());
            let window = &values[start..end];
            window.iter().sum::<f64>() / window.len() as f64
        })
        .collect()
}
