#![allow(dead_code)]

use axum::{body::to_bytes, http::Request, Router};
use serde_json::Value;
use tower::ServiceExt;

pub const FIT_EPOCH_OFFSET: u32 = 631_065_600;

pub const MESG_FILE_ID: u16 = 0;
pub const MESG_SESSION: u16 = 18;
pub const MESG_LAP: u16 = 19;
pub const MESG_RECORD: u16 = 20;

/// A field value tagged with its FIT field definition number.
#[derive(Debug, Clone, Copy)]
pub enum Field {
    Enum(u8, u8),
    U8(u8, u8),
    S8(u8, i8),
    U16(u8, u16),
    U32(u8, u32),
    S32(u8, i32),
}

impl Field {
    fn definition(&self) -> [u8; 3] {
        match *self {
            Field::Enum(num, _) => [num, 1, 0x00],
            Field::U8(num, _) => [num, 1, 0x02],
            Field::S8(num, _) => [num, 1, 0x01],
            Field::U16(num, _) => [num, 2, 0x84],
            Field::U32(num, _) => [num, 4, 0x86],
            Field::S32(num, _) => [num, 4, 0x85],
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        match *self {
            Field::Enum(_, v) | Field::U8(_, v) => out.push(v),
            Field::S8(_, v) => out.extend_from_slice(&v.to_le_bytes()),
            Field::U16(_, v) => out.extend_from_slice(&v.to_le_bytes()),
            Field::U32(_, v) => out.extend_from_slice(&v.to_le_bytes()),
            Field::S32(_, v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

/// Minimal little-endian FIT encoder: every data message is preceded by its
/// own definition on local type 0.
#[derive(Default)]
pub struct FitWriter {
    records: Vec<u8>,
}

impl FitWriter {
    pub fn new() -> Self {
        Self::default().message(MESG_FILE_ID, &[Field::Enum(0, 4), Field::U32(4, 1_000_000_000)])
    }

    pub fn message(mut self, global: u16, fields: &[Field]) -> Self {
        self.records.extend_from_slice(&[0x40, 0, 0]);
        self.records.extend_from_slice(&global.to_le_bytes());
        self.records.push(fields.len() as u8);
        for field in fields {
            self.records.extend_from_slice(&field.definition());
        }

        self.records.push(0x00);
        for field in fields {
            field.write(&mut self.records);
        }
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let mut out = vec![14, 0x10];
        out.extend_from_slice(&2132u16.to_le_bytes());
        out.extend_from_slice(&(self.records.len() as u32).to_le_bytes());
        out.extend_from_slice(b".FIT");
        let header_crc = crc(&out);
        out.extend_from_slice(&header_crc.to_le_bytes());

        out.extend_from_slice(&self.records);
        let file_crc = crc(&out);
        out.extend_from_slice(&file_crc.to_le_bytes());
        out
    }
}

pub fn crc(data: &[u8]) -> u16 {
    const CRC_TABLE: [u16; 16] = [
        0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
        0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
    ];

    data.iter().fold(0u16, |crc, byte| {
        let mut tmp = CRC_TABLE[(crc & 0xF) as usize];
        let mut crc = (crc >> 4) & 0x0FFF;
        crc ^= tmp ^ CRC_TABLE[(byte & 0xF) as usize];
        tmp = CRC_TABLE[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc ^ tmp ^ CRC_TABLE[((byte >> 4) & 0xF) as usize]
    })
}

/// A record message: seconds since start, cumulative meters, half-cadence, bpm.
pub fn record(seconds: u32, meters: f64, cadence: u8, heart_rate: u8) -> Vec<Field> {
    vec![
        Field::U32(253, 1_000_000_000 + seconds),
        Field::U32(5, (meters * 100.0).round() as u32),
        Field::U16(6, 2778),
        Field::U8(3, heart_rate),
        Field::U8(4, cadence),
    ]
}

pub const SPORT_RUNNING: u8 = 1;

/// One 5 km run at 10 km/h with half-cadence 84, as a single lap.
pub fn five_k_run() -> Vec<u8> {
    let mut writer = FitWriter::new();
    for i in 0..=5u32 {
        writer = writer.message(MESG_RECORD, &record(i * 360, i as f64 * 1000.0, 84, 150));
    }
    writer
        .message(
            MESG_LAP,
            &[
                Field::U32(253, 1_000_001_800),
                Field::U16(254, 0),
                Field::U32(7, 1_800_000),
                Field::U32(9, 500_000),
                Field::U16(13, 2778),
                Field::U8(15, 150),
                Field::U8(17, 84),
            ],
        )
        .message(
            MESG_SESSION,
            &[
                Field::U32(253, 1_000_001_800),
                Field::U32(7, 1_800_000),
                Field::U32(9, 500_000),
                Field::U16(14, 2778),
                Field::U8(16, 150),
                Field::U8(17, 171),
                Field::U8(18, 84),
                Field::U8(19, 90),
                Field::U16(11, 420),
            ],
        )
        .finish()
}

pub fn multipart_body(file_name: &str, file_body: &[u8], boundary: &str) -> Vec<u8> {
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(file_body);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

pub fn app() -> Router {
    activity_metrics::routes::router()
}

pub async fn post_file(file_name: &str, file_body: &[u8]) -> (axum::http::StatusCode, Value) {
    let boundary = "X-BOUNDARY-TEST";
    let body = multipart_body(file_name, file_body, boundary);

    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/parse")
                .method("POST")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(axum::body::Body::from(body))
                .expect("request"),
        )
        .await
        .expect("response");

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&body).expect("json body");
    (status, json)
}
