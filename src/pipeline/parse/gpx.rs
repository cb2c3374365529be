use chrono::{DateTime, Utc};

use crate::error::ParseError;
use crate::pipeline::geo::haversine_distance;
use crate::pipeline::laps;
use crate::pipeline::parse::xml::{self, Node};
use crate::pipeline::parse::{sniff_text, Parser};
use crate::types::activity::{DistanceUnit, FileFormat, RawActivity, RawRecord, SensorStats};

pub(crate) fn sniff(bytes: &[u8]) -> bool {
    sniff_text(bytes, &["<gpx", "<trk"])
}

/// Ways a producer may have spelled an extension field, in the order they are
/// tried. Garmin's TrackPointExtension is by far the most common, but devices
/// and converters disagree on the prefix and on whether one is used at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Prefixed(&'static str),
    Bare,
    Scan,
}

const PROBES: &[Probe] = &[
    Probe::Prefixed("gpxtpx"),
    Probe::Prefixed("ns3"),
    Probe::Prefixed("ns2"),
    Probe::Prefixed("gpxdata"),
    Probe::Prefixed("gpxx"),
    Probe::Bare,
    Probe::Scan,
];

/// An extension field: exact local names to try, and the substring used by
/// the last-resort scan.
struct ExtensionField {
    names: &'static [&'static str],
    needle: &'static str,
}

const HEART_RATE: ExtensionField = ExtensionField {
    names: &["hr", "heartrate"],
    needle: "hr",
};

const CADENCE: ExtensionField = ExtensionField {
    names: &["cad", "cadence"],
    needle: "cad",
};

const MAX_HEART_RATE: f64 = 250.0;
const MAX_HALF_CADENCE: f64 = 200.0;

impl Probe {
    fn lookup<'a>(&self, extensions: &'a [(String, String)], field: &ExtensionField) -> Option<&'a str> {
        let found = match self {
            Probe::Prefixed(prefix) => extensions.iter().find(|(key, _)| {
                key.split_once(':').is_some_and(|(p, local)| {
                    p == *prefix && field.names.iter().any(|n| local.eq_ignore_ascii_case(n))
                })
            }),
            Probe::Bare => extensions
                .iter()
                .find(|(key, _)| field.names.iter().any(|n| key.eq_ignore_ascii_case(n))),
            Probe::Scan => extensions.iter().find(|(key, _)| {
                xml::local_name(key)
                    .to_ascii_lowercase()
                    .contains(field.needle)
            }),
        };
        found.map(|(_, value)| value.as_str())
    }
}

fn probe(extensions: &[(String, String)], field: &ExtensionField) -> Option<f64> {
    PROBES.iter().find_map(|strategy| {
        let value = strategy.lookup(extensions, field).and_then(xml::number)?;
        if *strategy == Probe::Scan {
            tracing::debug!("GPX extension '{}' recovered by key scan", field.needle);
        }
        Some(value)
    })
}

fn plausible(value: Option<f64>, max: f64) -> Option<f64> {
    value.filter(|v| *v > 0.0 && *v < max)
}

#[derive(Debug, Clone, Default)]
struct TrackPoint {
    lat: f64,
    lon: f64,
    elevation: Option<f64>,
    time: Option<DateTime<Utc>>,
    extensions: Vec<(String, String)>,
}

#[derive(Default)]
struct GpxBuilder {
    tracks: usize,
    in_track: bool,
    in_extensions: bool,
    point: Option<TrackPoint>,
    points: Vec<TrackPoint>,
}

impl GpxBuilder {
    fn visit(&mut self, path: &[String], node: Node<'_>) -> Result<(), ParseError> {
        let name = path.last().map(|n| xml::local_name(n)).unwrap_or_default();

        match node {
            Node::Open(attributes) => match name {
                "trk" => {
                    self.tracks += 1;
                    self.in_track = self.tracks == 1;
                }
                "trkpt" if self.in_track => {
                    let lat = xml::attribute(attributes, "lat").and_then(xml::number);
                    let lon = xml::attribute(attributes, "lon").and_then(xml::number);
                    match (lat, lon) {
                        (Some(lat), Some(lon)) => {
                            self.point = Some(TrackPoint {
                                lat,
                                lon,
                                ..TrackPoint::default()
                            })
                        }
                        _ => tracing::debug!("skipping GPX trackpoint without lat/lon"),
                    }
                }
                "extensions" if self.point.is_some() => self.in_extensions = true,
                _ => {}
            },
            Node::Text(text) => {
                if let Some(point) = self.point.as_mut() {
                    if self.in_extensions {
                        if let Some(key) = path.last() {
                            point.extensions.push((key.clone(), text.to_string()));
                        }
                    } else {
                        match name {
                            "ele" => point.elevation = xml::number(text),
                            "time" => point.time = xml::timestamp(text),
                            _ => {}
                        }
                    }
                }
            }
            Node::Close => match name {
                "trk" => self.in_track = false,
                "trkpt" => {
                    if let Some(point) = self.point.take() {
                        self.points.push(point);
                    }
                }
                "extensions" => self.in_extensions = false,
                _ => {}
            },
        }

        Ok(())
    }
}

pub struct GpxParser;

impl Parser for GpxParser {
    fn parse(&self, bytes: &[u8]) -> Result<RawActivity, ParseError> {
        let mut builder = GpxBuilder::default();
        let root = xml::walk(bytes, FileFormat::Gpx, |path, node| builder.visit(path, node))?;

        if xml::local_name(&root) != "gpx" {
            return Err(ParseError::decode(
                FileFormat::Gpx,
                format!("expected <gpx> root, found <{}>", root),
            ));
        }
        if builder.points.is_empty() {
            return Err(ParseError::EmptyActivity(FileFormat::Gpx));
        }

        Ok(build_activity(&builder.points))
    }
}

fn build_activity(points: &[TrackPoint]) -> RawActivity {
    let mut cumulative = Vec::with_capacity(points.len());
    let mut segment_seconds = Vec::with_capacity(points.len().saturating_sub(1));
    let mut distance = 0.0;
    let mut total_time = 0.0;

    cumulative.push(0.0);
    for pair in points.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);
        distance += haversine_distance(prev.lat, prev.lon, curr.lat, curr.lon);
        cumulative.push(distance);

        // Pairs missing a timestamp contribute no time; nothing is interpolated.
        let seconds = match (prev.time, curr.time) {
            (Some(prev), Some(curr)) => (curr - prev).num_milliseconds().max(0) as f64 / 1000.0,
            _ => 0.0,
        };
        total_time += seconds;
        segment_seconds.push(seconds);
    }

    let mut heart_rate = SensorStats::default();
    let mut cadence = SensorStats::default();

    let records: Vec<RawRecord> = points
        .iter()
        .zip(&cumulative)
        .map(|(point, distance)| {
            let hr = plausible(probe(&point.extensions, &HEART_RATE), MAX_HEART_RATE);
            let cad = plausible(probe(&point.extensions, &CADENCE), MAX_HALF_CADENCE);
            heart_rate.push(hr);
            cadence.push(cad);

            RawRecord {
                timestamp: point.time,
                distance: Some(*distance),
                heart_rate: hr,
                cadence: cad,
                altitude: point.elevation,
                ..RawRecord::default()
            }
        })
        .collect();

    let mut activity = RawActivity::default();
    activity.session.elapsed_time = Some(total_time);
    activity.session.distance = Some(distance);
    activity.session.avg_heart_rate = heart_rate.mean();
    activity.session.max_heart_rate = heart_rate.max();
    activity.session.avg_cadence = cadence.mean();
    activity.session.max_cadence = cadence.max();
    activity.laps = laps::synthesize(&records, &cumulative, &segment_seconds, DistanceUnit::Kilometers);
    activity.records = records;
    activity
}
