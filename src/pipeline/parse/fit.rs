//! FIT decoding.
//!
//! A FIT file is a header (12 or 14 bytes, the 14-byte form carrying a header
//! CRC), a data section of definition and data messages, and a two-byte CRC
//! trailer. The header is validated here so callers get a precise reason for
//! rejection; the message stream itself is tokenized by `fitparser`, which
//! pairs data messages with their definitions and applies profile scales.

use std::collections::HashSet;

use chrono::Utc;
use fitparser::de::{from_bytes_with_options, DecodeOption};
use fitparser::profile::MesgNum;
use fitparser::{FitDataField, FitDataRecord, Value};

use crate::error::ParseError;
use crate::pipeline::parse::Parser;
use crate::types::activity::{
    FileFormat, RawActivity, RawLap, RawRecord, RawSession, SensorStats,
};

const MIN_HEADER_SIZE: usize = 12;
const MAX_PROTOCOL_VERSION: u8 = 20;
const SIGNATURE: &[u8; 4] = b".FIT";
const TRAILER_CRC_SIZE: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FitHeader {
    pub header_size: usize,
    pub protocol_version: u8,
    pub profile_version: u16,
    pub data_size: usize,
    pub has_header_crc: bool,
}

impl FitHeader {
    pub fn read(bytes: &[u8]) -> Result<Self, String> {
        if bytes.len() < MIN_HEADER_SIZE {
            return Err(format!(
                "file is {} bytes, shorter than the {}-byte header",
                bytes.len(),
                MIN_HEADER_SIZE
            ));
        }

        let header_size = bytes[0] as usize;
        if header_size < MIN_HEADER_SIZE {
            return Err(format!("header size {} is below {}", header_size, MIN_HEADER_SIZE));
        }

        let protocol_version = bytes[1];
        if protocol_version > MAX_PROTOCOL_VERSION {
            return Err(format!("unsupported protocol version {}", protocol_version));
        }

        if &bytes[8..12] != SIGNATURE {
            return Err("missing .FIT signature".to_string());
        }

        let profile_version = u16::from_le_bytes([bytes[2], bytes[3]]);
        let data_size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;

        Ok(Self {
            header_size,
            protocol_version,
            profile_version,
            data_size,
            has_header_crc: header_size >= 14,
        })
    }

    fn check_length(&self, len: usize) -> Result<(), String> {
        let expected = self.header_size + self.data_size + TRAILER_CRC_SIZE;
        if len < expected {
            return Err(format!(
                "truncated file: header declares {} bytes, got {}",
                expected, len
            ));
        }
        Ok(())
    }
}

pub(crate) fn sniff(bytes: &[u8]) -> bool {
    FitHeader::read(bytes).is_ok()
}

pub struct FitParser;

impl Parser for FitParser {
    fn parse(&self, bytes: &[u8]) -> Result<RawActivity, ParseError> {
        let header = FitHeader::read(bytes).map_err(|e| ParseError::decode(FileFormat::Fit, e))?;
        header
            .check_length(bytes.len())
            .map_err(|e| ParseError::decode(FileFormat::Fit, e))?;

        let data = from_bytes_with_options(bytes, &decode_options()).map_err(|e| {
            ParseError::decode(FileFormat::Fit, format!("Failed to parse FIT file: {}", e))
        })?;

        tracing::debug!(
            "FIT protocol {} profile {} (header crc: {}): {} messages",
            header.protocol_version,
            header.profile_version,
            header.has_header_crc,
            data.len()
        );

        let mut activity = RawActivity::default();
        let mut session: Option<RawSession> = None;

        for message in &data {
            match message.kind() {
                MesgNum::Session if session.is_none() => session = Some(read_session(message)),
                MesgNum::Lap => activity.laps.push(read_lap(message)),
                MesgNum::Record => activity.records.push(read_record(message)),
                _ => {}
            }
        }

        activity.session = match session {
            Some(session) => session,
            None => {
                tracing::debug!("FIT file has no session message, deriving totals from records");
                session_from_records(&activity.records)
            }
        };

        Ok(activity)
    }
}

/// Sport-specific subfields (`avg_running_cadence` and friends) keep their
/// generic names, and legacy fields stay next to their enhanced expansion.
fn decode_options() -> HashSet<DecodeOption> {
    HashSet::from([
        DecodeOption::UseGenericSubFieldName,
        DecodeOption::KeepCompositeFields,
    ])
}

fn read_session(message: &FitDataRecord) -> RawSession {
    let fields = FieldLookup(message.fields());
    RawSession {
        elapsed_time: fields.number("total_elapsed_time"),
        distance: fields.number("total_distance"),
        avg_speed: fields.enhanced_number("enhanced_avg_speed", "avg_speed"),
        avg_heart_rate: fields.number("avg_heart_rate"),
        max_heart_rate: fields.number("max_heart_rate"),
        avg_cadence: fields.first_number(&["avg_cadence", "avg_running_cadence"]),
        max_cadence: fields.first_number(&["max_cadence", "max_running_cadence"]),
        calories: fields.number("total_calories"),
        stride_length: fields.first_number(&["avg_stride_length", "avg_step_length"]),
        vertical_oscillation: fields.number("avg_vertical_oscillation"),
        stance_time: fields.number("avg_stance_time"),
        training_effect: fields.number("total_training_effect"),
    }
}

fn read_lap(message: &FitDataRecord) -> RawLap {
    let fields = FieldLookup(message.fields());
    RawLap {
        ordinal: fields
            .get("message_index")
            .and_then(|value| MessageIndex::from_value(value).map(MessageIndex::ordinal)),
        elapsed_time: fields.number("total_elapsed_time"),
        distance: fields.number("total_distance"),
        avg_speed: fields.enhanced_number("enhanced_avg_speed", "avg_speed"),
        avg_heart_rate: fields.number("avg_heart_rate"),
        max_heart_rate: fields.number("max_heart_rate"),
        avg_cadence: fields.first_number(&["avg_cadence", "avg_running_cadence"]),
        max_cadence: fields.first_number(&["max_cadence", "max_running_cadence"]),
    }
}

fn read_record(message: &FitDataRecord) -> RawRecord {
    let fields = FieldLookup(message.fields());
    RawRecord {
        timestamp: fields.get("timestamp").and_then(|value| match value {
            Value::Timestamp(ts) => Some(ts.with_timezone(&Utc)),
            _ => None,
        }),
        distance: fields.number("distance"),
        speed: fields.enhanced_number("enhanced_speed", "speed"),
        heart_rate: fields.number("heart_rate"),
        cadence: fields.number("cadence"),
        altitude: fields.enhanced_number("enhanced_altitude", "altitude"),
        temperature: fields.number("temperature"),
        vertical_oscillation: fields.number("vertical_oscillation"),
        stance_time: fields.number("stance_time"),
    }
}

fn session_from_records(records: &[RawRecord]) -> RawSession {
    let first = records.iter().find_map(|r| r.timestamp);
    let last = records.iter().rev().find_map(|r| r.timestamp);
    let elapsed_time = match (first, last) {
        (Some(first), Some(last)) => Some((last - first).num_milliseconds().max(0) as f64 / 1000.0),
        _ => None,
    };

    let mut heart_rate = SensorStats::default();
    let mut cadence = SensorStats::default();
    for record in records {
        heart_rate.push(record.heart_rate);
        cadence.push(record.cadence);
    }

    RawSession {
        elapsed_time,
        distance: records.iter().filter_map(|r| r.distance).reduce(f64::max),
        avg_heart_rate: heart_rate.mean(),
        max_heart_rate: heart_rate.max(),
        avg_cadence: cadence.mean(),
        max_cadence: cadence.max(),
        ..RawSession::default()
    }
}

/// `message_index` arrives either as a bare integer or wrapped in an array,
/// depending on how the field was declared. Either way it is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageIndex {
    Raw(u32),
    Wrapped(u32),
}

impl MessageIndex {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(values) => values
                .iter()
                .find_map(integer)
                .map(MessageIndex::Wrapped),
            other => integer(other).map(MessageIndex::Raw),
        }
    }

    fn ordinal(self) -> u32 {
        match self {
            MessageIndex::Raw(index) | MessageIndex::Wrapped(index) => index + 1,
        }
    }
}

fn integer(value: &Value) -> Option<u32> {
    match value {
        Value::UInt8(v) => Some(*v as u32),
        Value::UInt16(v) => Some(*v as u32),
        Value::UInt32(v) => Some(*v),
        Value::UInt64(v) => u32::try_from(*v).ok(),
        Value::SInt8(v) => u32::try_from(*v).ok(),
        Value::SInt16(v) => u32::try_from(*v).ok(),
        Value::SInt32(v) => u32::try_from(*v).ok(),
        Value::SInt64(v) => u32::try_from(*v).ok(),
        Value::Float64(v) if *v >= 0.0 => Some(*v as u32),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Float32(v) => Some(*v as f64),
        Value::Float64(v) => Some(*v),
        Value::SInt8(v) => Some(*v as f64),
        Value::SInt16(v) => Some(*v as f64),
        Value::SInt32(v) => Some(*v as f64),
        Value::SInt64(v) => Some(*v as f64),
        Value::UInt8(v) => Some(*v as f64),
        Value::UInt16(v) => Some(*v as f64),
        Value::UInt32(v) => Some(*v as f64),
        Value::UInt64(v) => Some(*v as f64),
        Value::Array(values) => values.iter().find_map(number),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

struct FieldLookup<'a>(&'a [FitDataField]);

impl<'a> FieldLookup<'a> {
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.0
            .iter()
            .find(|field| field.name() == name)
            .map(|field| field.value())
    }

    fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(number)
    }

    /// First present field among `names`, in preference order.
    fn first_number(&self, names: &[&str]) -> Option<f64> {
        names.iter().find_map(|name| self.number(name))
    }

    /// The high-resolution field when the device wrote one, else the legacy
    /// field. A legacy field is also expanded under the enhanced name, so an
    /// enhanced value that merely repeats the legacy one is passed over first.
    fn enhanced_number(&self, enhanced: &str, legacy: &str) -> Option<f64> {
        let legacy_value = self.number(legacy);
        let candidates: Vec<f64> = self
            .0
            .iter()
            .filter(|field| field.name() == enhanced)
            .filter_map(|field| number(field.value()))
            .collect();

        candidates
            .iter()
            .copied()
            .find(|value| Some(*value) != legacy_value)
            .or_else(|| candidates.first().copied())
            .or(legacy_value)
    }
}
