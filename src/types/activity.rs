use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Fit,
    Tcx,
    Gpx,
}

impl FileFormat {
    /// Priority order used by content sniffing.
    pub const ALL: [FileFormat; 3] = [FileFormat::Fit, FileFormat::Tcx, FileFormat::Gpx];

    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        match ext.to_lowercase().as_str() {
            "fit" => Some(FileFormat::Fit),
            "tcx" => Some(FileFormat::Tcx),
            "gpx" => Some(FileFormat::Gpx),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::Fit => "FIT",
            FileFormat::Tcx => "TCX",
            FileFormat::Gpx => "GPX",
        }
    }

    /// Unit in which this format's decoder reports distances.
    pub fn distance_unit(&self) -> DistanceUnit {
        match self {
            FileFormat::Fit | FileFormat::Tcx => DistanceUnit::Meters,
            FileFormat::Gpx => DistanceUnit::Kilometers,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn supported_formats() -> Vec<&'static str> {
    FileFormat::ALL.iter().map(FileFormat::name).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Meters,
    Kilometers,
}

impl DistanceUnit {
    pub fn per_km(&self) -> f64 {
        match self {
            DistanceUnit::Meters => 1000.0,
            DistanceUnit::Kilometers => 1.0,
        }
    }

    pub fn to_km(&self, value: f64) -> f64 {
        value / self.per_km()
    }
}

/// Session-level summary exactly as the source reported it.
///
/// Units follow the source format: distances in [`FileFormat::distance_unit`],
/// speeds in m/s, cadence as half-cadence, vertical oscillation and stride in mm.
#[derive(Debug, Clone, Default)]
pub struct RawSession {
    pub elapsed_time: Option<f64>,
    pub distance: Option<f64>,
    pub avg_speed: Option<f64>,
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
    pub avg_cadence: Option<f64>,
    pub max_cadence: Option<f64>,
    pub calories: Option<f64>,
    pub stride_length: Option<f64>,
    pub vertical_oscillation: Option<f64>,
    pub stance_time: Option<f64>,
    pub training_effect: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct RawLap {
    /// 1-based ordinal reported by the source, if it has one.
    pub ordinal: Option<u32>,
    pub elapsed_time: Option<f64>,
    pub distance: Option<f64>,
    pub avg_speed: Option<f64>,
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
    pub avg_cadence: Option<f64>,
    pub max_cadence: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub timestamp: Option<DateTime<Utc>>,
    /// Cumulative distance.
    pub distance: Option<f64>,
    pub speed: Option<f64>,
    pub heart_rate: Option<f64>,
    pub cadence: Option<f64>,
    pub altitude: Option<f64>,
    pub temperature: Option<f64>,
    pub vertical_oscillation: Option<f64>,
    pub stance_time: Option<f64>,
}

/// Decoder output, still in source units.
#[derive(Debug, Clone, Default)]
pub struct RawActivity {
    pub session: RawSession,
    pub laps: Vec<RawLap>,
    pub records: Vec<RawRecord>,
}

impl RawActivity {
    pub fn is_empty(&self) -> bool {
        self.laps.is_empty() && self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    pub lap_number: u32,
    pub distance: f64,
    pub time: f64,
    pub pace: f64,
    pub avg_heart_rate: u16,
    pub max_heart_rate: u16,
    pub avg_cadence: u16,
    pub max_cadence: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub timestamp: Option<DateTime<Utc>>,
    pub distance: f64,
    pub speed: f64,
    pub heart_rate: u16,
    pub cadence: u16,
    pub altitude: f64,
    pub temperature: f64,
    pub vertical_oscillation: f64,
    pub ground_contact_time: f64,
}

/// Format-agnostic metrics handed to the analysis layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalMetrics {
    pub total_time: f64,
    pub total_distance: f64,
    pub avg_pace: f64,
    pub avg_heart_rate: u16,
    pub max_heart_rate: u16,
    pub avg_cadence: u16,
    pub max_cadence: u16,
    pub total_calories: u32,
    pub avg_stride_length: f64,
    pub vertical_oscillation: f64,
    pub ground_contact_time: f64,
    pub training_effect: f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    pub laps: Vec<Lap>,
    pub records: Vec<Sample>,
}

/// Running mean/max over positive sensor readings.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorStats {
    sum: f64,
    count: usize,
    max: f64,
}

impl SensorStats {
    pub fn push(&mut self, value: Option<f64>) {
        if let Some(value) = value.filter(|v| *v > 0.0) {
            self.sum += value;
            self.count += 1;
            self.max = self.max.max(value);
        }
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count > 0 {
            Some(self.sum / self.count as f64)
        } else {
            None
        }
    }

    pub fn max(&self) -> Option<f64> {
        if self.count > 0 {
            Some(self.max)
        } else {
            None
        }
    }
}
