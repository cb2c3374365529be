pub(crate) mod fit;
pub(crate) mod gpx;
pub(crate) mod tcx;
mod xml;

use crate::error::ParseError;
use crate::types::activity::{FileFormat, RawActivity};

pub trait Parser {
    fn parse(&self, bytes: &[u8]) -> Result<RawActivity, ParseError>;
}

pub fn parse(bytes: &[u8], format: FileFormat) -> Result<RawActivity, ParseError> {
    match format {
        FileFormat::Fit => fit::FitParser.parse(bytes),
        FileFormat::Tcx => tcx::TcxParser.parse(bytes),
        FileFormat::Gpx => gpx::GpxParser.parse(bytes),
    }
}

/// Lossy text view used by the XML sniffers.
fn sniff_text(bytes: &[u8], markers: &[&str]) -> bool {
    let text = String::from_utf8_lossy(bytes);
    markers.iter().all(|marker| text.contains(marker))
}
