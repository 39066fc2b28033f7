use chrono::{Datelike, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExifError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("EXIF parsing error: {0}")]
    Parse(#[from] exif::Error),

    #[error("no capture date in metadata")]
    MissingDate,

    #[error("Date parsing error: {message}")]
    DateParse { message: String },
}

/// Year and month a photo was taken; names its folder in the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureDate {
    pub year: i32,
    pub month: u32,
}

impl CaptureDate {
    /// Folder name under the archive root, `YYYY-MM`.
    pub fn folder_name(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

impl fmt::Display for CaptureDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Source of capture dates for the import pass.
pub trait CaptureDateSource {
    fn capture_date(&self, path: &Path) -> Result<CaptureDate, ExifError>;
}

/// Reads the capture date out of a file's embedded EXIF block
pub struct ExifService;

impl ExifService {
    pub fn new() -> Self {
        Self
    }

    fn read_capture_date(&self, file_path: &Path) -> Result<CaptureDate, ExifError> {
        let file = File::open(file_path)?;
        let mut buf_reader = BufReader::new(file);
        let exif_reader = Reader::new().read_from_container(&mut buf_reader)?;

        // Prefer the shutter time, fall back to the last-modified stamp
        let field = exif_reader
            .get_field(Tag::DateTimeOriginal, In::PRIMARY)
            .or_else(|| exif_reader.get_field(Tag::DateTime, In::PRIMARY))
            .ok_or(ExifError::MissingDate)?;

        let datetime_str = field_to_string(&field.value).ok_or(ExifError::MissingDate)?;
        let taken_at = parse_exif_datetime(&datetime_str)?;

        Ok(CaptureDate {
            year: taken_at.year(),
            month: taken_at.month(),
        })
    }
}

impl CaptureDateSource for ExifService {
    fn capture_date(&self, path: &Path) -> Result<CaptureDate, ExifError> {
        let date = self.read_capture_date(path)?;
        log::debug!("OriginalDate: {} {}", date, path.display());
        Ok(date)
    }
}

impl Default for ExifService {
    fn default() -> Self {
        Self::new()
    }
}

fn field_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(vec) => vec.first().map(|ascii_val| {
            String::from_utf8_lossy(ascii_val)
                .trim_end_matches('\0')
                .trim()
                .to_string()
        }),
        Value::Undefined(data, _) => Some(
            String::from_utf8_lossy(data)
                .trim_end_matches('\0')
                .trim()
                .to_string(),
        ),
        _ => None,
    }
}

/// EXIF datetime format: "YYYY:MM:DD HH:MM:SS"
fn parse_exif_datetime(datetime_str: &str) -> Result<NaiveDateTime, ExifError> {
    NaiveDateTime::parse_from_str(datetime_str, "%Y:%m:%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(datetime_str, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| ExifError::DateParse {
            message: format!("{datetime_str:?}: {e}"),
        })
}
