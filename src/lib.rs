pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod types;

pub use error::{AppError, ParseError};
pub use pipeline::{parse_activity, parse_detected};
pub use types::activity::{supported_formats, CanonicalMetrics, FileFormat, Lap, Sample};
