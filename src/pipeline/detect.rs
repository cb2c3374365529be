use crate::pipeline::parse::{fit, gpx, tcx};
use crate::types::activity::FileFormat;

/// Pick the decoder for an upload. The extension is only a hint: content that
/// fails the hinted format's sniff falls through to content-only detection.
pub fn detect(bytes: &[u8], filename: Option<&str>) -> Option<FileFormat> {
    if let Some(hinted) = filename.and_then(FileFormat::from_filename) {
        if sniff(bytes, hinted) {
            return Some(hinted);
        }
        tracing::debug!("{} extension did not match content, sniffing", hinted);
    }

    FileFormat::ALL
        .into_iter()
        .find(|format| sniff(bytes, *format))
}

fn sniff(bytes: &[u8], format: FileFormat) -> bool {
    match format {
        FileFormat::Fit => fit::sniff(bytes),
        FileFormat::Tcx => tcx::sniff(bytes),
        FileFormat::Gpx => gpx::sniff(bytes),
    }
}
