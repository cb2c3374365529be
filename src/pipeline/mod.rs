pub mod detect;
pub mod elevation;
pub mod geo;
pub mod laps;
pub mod normalize;
pub mod parse;

use crate::error::ParseError;
use crate::types::activity::{CanonicalMetrics, FileFormat};

/// Detect, decode and normalize one activity file.
///
/// Synchronous and self-contained: all of `bytes` is read, nothing is cached,
/// and either complete metrics or a single error come back.
pub fn parse_activity(bytes: &[u8], filename: Option<&str>) -> Result<CanonicalMetrics, ParseError> {
    parse_detected(bytes, filename).map(|(_, metrics)| metrics)
}

/// Like [`parse_activity`], also reporting the format the bytes were decoded as.
pub fn parse_detected(
    bytes: &[u8],
    filename: Option<&str>,
) -> Result<(FileFormat, CanonicalMetrics), ParseError> {
    let format = detect::detect(bytes, filename).ok_or(ParseError::UnsupportedFormat)?;

    let mut raw = parse::parse(bytes, format)?;
    if raw.is_empty() {
        return Err(ParseError::EmptyActivity(format));
    }

    if raw.laps.is_empty() {
        tracing::debug!("{} activity has no laps, splitting records into 1 km laps", format);
        raw.laps = laps::synthesize_from_records(&raw.records, format.distance_unit());
        if raw.laps.is_empty() {
            raw.laps.extend(laps::whole_activity(&raw.session));
        }
    }

    let metrics = normalize::normalize(raw, format);

    tracing::info!(
        "Parsed {} activity: {} samples, {} laps, {:.2} km",
        format,
        metrics.records.len(),
        metrics.laps.len(),
        metrics.total_distance
    );

    Ok((format, metrics))
}
