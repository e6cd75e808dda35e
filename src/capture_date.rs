/**
 * Capture date resolution
 *
 * Resolution order:
 * 1. Embedded EXIF capture time (JPEG and HEIC only)
 * 2. Date found in the file name (only when enabled)
 * 3. File modification time (always available for a readable file)
 */

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use exif::{In, Reader as ExifReader, Tag, Value};
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{OrganizeError, Result};

/// Tags consulted for a capture time, most specific first
const CAPTURE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

static FILENAME_DATE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\d{8}", "%Y%m%d"),
        (r"\d{4}-\d{2}-\d{2}", "%Y-%m-%d"),
        (r"\d{4}_\d{2}_\d{2}", "%Y_%m_%d"),
    ]
    .into_iter()
    .map(|(pattern, format)| (Regex::new(pattern).expect("static date pattern"), format))
    .collect()
});

/// Supported photo formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoFormat {
    Jpeg,
    Png,
    Heic,
}

impl PhotoFormat {
    /// Detect the format from the file extension, ignoring case
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(PhotoFormat::Jpeg),
            "png" => Some(PhotoFormat::Png),
            "heic" => Some(PhotoFormat::Heic),
            _ => None,
        }
    }

    /// Read the capture time stored in the file, if the format carries one.
    ///
    /// PNG has no standard capture tag and always yields `None`.
    pub fn try_read_capture_date(&self, path: &Path) -> Option<NaiveDateTime> {
        match self {
            PhotoFormat::Jpeg | PhotoFormat::Heic => read_exif_capture_date(path),
            PhotoFormat::Png => None,
        }
    }
}

/// Where a resolved date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateSource {
    Exif,
    Filename,
    Modified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureDate {
    pub taken: NaiveDateTime,
    pub source: DateSource,
}

impl CaptureDate {
    pub fn date(&self) -> NaiveDate {
        self.taken.date()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureDateResolver {
    filename_dates: bool,
}

impl CaptureDateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename_dates(mut self, enabled: bool) -> Self {
        self.filename_dates = enabled;
        self
    }

    /// Resolve the capture date of a photo.
    ///
    /// Missing or unparseable metadata is not an error; the only failure is a
    /// file whose modification time cannot be read.
    pub fn resolve(&self, path: &Path) -> Result<CaptureDate> {
        debug!("Resolving capture date: {}", path.display());

        if let Some(format) = PhotoFormat::from_path(path) {
            if let Some(taken) = format.try_read_capture_date(path) {
                debug!("EXIF capture date {} for {}", taken, path.display());
                return Ok(CaptureDate {
                    taken,
                    source: DateSource::Exif,
                });
            }
        }

        if self.filename_dates {
            if let Some(taken) = extract_filename_date(path) {
                debug!("Filename date {} for {}", taken, path.display());
                return Ok(CaptureDate {
                    taken,
                    source: DateSource::Filename,
                });
            }
        }

        debug!("Using file modification time for: {}", path.display());
        let taken = modified_time(path)?;
        Ok(CaptureDate {
            taken,
            source: DateSource::Modified,
        })
    }
}

/// Resolve a capture date from metadata, falling back to the modification time
pub fn resolve_capture_date(path: &Path) -> Result<CaptureDate> {
    CaptureDateResolver::new().resolve(path)
}

fn read_exif_capture_date(path: &Path) -> Option<NaiveDateTime> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("Cannot open {} for EXIF: {}", path.display(), e);
            return None;
        }
    };
    let mut reader = BufReader::new(file);

    let exif = match ExifReader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            debug!("No EXIF data in {}: {}", path.display(), e);
            return None;
        }
    };

    let taken = CAPTURE_TAGS.iter().find_map(|tag| {
        let field = exif.get_field(*tag, In::PRIMARY)?;
        match field.value {
            Value::Ascii(ref values) => values.iter().find_map(|raw| parse_exif_datetime(raw)),
            _ => None,
        }
    });

    if taken.is_none() {
        debug!("EXIF present but no usable capture time in {}", path.display());
    }
    taken
}

/// Parse an EXIF ASCII timestamp (`YYYY:MM:DD HH:MM:SS`)
fn parse_exif_datetime(raw: &[u8]) -> Option<NaiveDateTime> {
    let dt = exif::DateTime::from_ascii(raw).ok()?;
    NaiveDate::from_ymd_opt(i32::from(dt.year), u32::from(dt.month), u32::from(dt.day))?
        .and_hms_opt(u32::from(dt.hour), u32::from(dt.minute), u32::from(dt.second))
}

fn extract_filename_date(path: &Path) -> Option<NaiveDateTime> {
    let stem = path.file_stem()?.to_str()?;
    FILENAME_DATE_PATTERNS.iter().find_map(|(pattern, format)| {
        pattern
            .find_iter(stem)
            .find_map(|m| NaiveDate::parse_from_str(m.as_str(), format).ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}

fn modified_time(path: &Path) -> Result<NaiveDateTime> {
    let mtime = fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|e| OrganizeError::io(path, e))?;
    Ok(DateTime::<Local>::from(mtime).naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use filetime::FileTime;
    use tempfile::TempDir;

    const DATE_TIME: u16 = 0x0132;
    const DATE_TIME_ORIGINAL: u16 = 0x9003;
    const DATE_TIME_DIGITIZED: u16 = 0x9004;
    const IMAGE_UNIQUE_ID: u16 = 0xA420;

    fn push_ifd_entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
        out.extend_from_slice(&tag.to_be_bytes());
        out.extend_from_slice(&kind.to_be_bytes());
        out.extend_from_slice(&count.to_be_bytes());
        out.extend_from_slice(&value.to_be_bytes());
    }

    /// Minimal big-endian JPEG with the given 19-character ASCII tags.
    /// DateTime goes into IFD0, every other tag into the Exif IFD.
    fn jpeg_with_exif_tags(tags: &[(u16, &str)]) -> Vec<u8> {
        assert!(tags.iter().all(|(_, value)| value.len() == 19));
        let (ifd0, exif_ifd): (Vec<_>, Vec<_>) = tags.iter().partition(|entry| entry.0 == DATE_TIME);

        let ifd_len = |entries: usize| (2 + 12 * entries + 4) as u32;
        let has_exif_ifd = !exif_ifd.is_empty();
        let ifd0_entries = ifd0.len() + usize::from(has_exif_ifd);
        let exif_offset = 8 + ifd_len(ifd0_entries);
        let data_offset = exif_offset + if has_exif_ifd { ifd_len(exif_ifd.len()) } else { 0 };

        let mut data = Vec::new();
        let mut push_ascii = |out: &mut Vec<u8>, tag: u16, value: &str| {
            push_ifd_entry(out, tag, 2, 20, data_offset + data.len() as u32);
            data.extend_from_slice(value.as_bytes());
            data.push(0);
        };

        let mut tiff = b"MM\x00\x2a".to_vec();
        tiff.extend_from_slice(&8u32.to_be_bytes());
        tiff.extend_from_slice(&(ifd0_entries as u16).to_be_bytes());
        for (tag, value) in &ifd0 {
            push_ascii(&mut tiff, *tag, *value);
        }
        if has_exif_ifd {
            push_ifd_entry(&mut tiff, 0x8769, 4, 1, exif_offset);
        }
        tiff.extend_from_slice(&0u32.to_be_bytes());
        if has_exif_ifd {
            tiff.extend_from_slice(&(exif_ifd.len() as u16).to_be_bytes());
            for (tag, value) in &exif_ifd {
                push_ascii(&mut tiff, *tag, *value);
            }
            tiff.extend_from_slice(&0u32.to_be_bytes());
        }
        tiff.extend(data);

        let mut jpeg = vec![0xFF, 0xD8, 0xFF, 0xE1];
        jpeg.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        jpeg.extend_from_slice(b"Exif\0\0");
        jpeg.extend(tiff);
        jpeg.extend_from_slice(&[0xFF, 0xD9]);
        jpeg
    }

    fn jpeg_with_exif_date(date: &str) -> Vec<u8> {
        jpeg_with_exif_tags(&[(DATE_TIME_ORIGINAL, date)])
    }

    fn set_mtime(path: &Path, year: i32, month: u32, day: u32) {
        let ts = Local
            .with_ymd_and_hms(year, month, day, 12, 0, 0)
            .unwrap()
            .timestamp();
        filetime::set_file_mtime(path, FileTime::from_unix_time(ts, 0)).unwrap();
    }

    #[test]
    fn test_format_detection_ignores_case() {
        assert_eq!(PhotoFormat::from_path(Path::new("a.JPG")), Some(PhotoFormat::Jpeg));
        assert_eq!(PhotoFormat::from_path(Path::new("a.jpeg")), Some(PhotoFormat::Jpeg));
        assert_eq!(PhotoFormat::from_path(Path::new("a.Png")), Some(PhotoFormat::Png));
        assert_eq!(PhotoFormat::from_path(Path::new("a.HEIC")), Some(PhotoFormat::Heic));
        assert_eq!(PhotoFormat::from_path(Path::new("a.gif")), None);
        assert_eq!(PhotoFormat::from_path(Path::new("jpg")), None);
    }

    #[test]
    fn test_parse_exif_datetime() {
        let dt = parse_exif_datetime(b"2024:03:24 10:15:30").unwrap();
        assert_eq!(dt.to_string(), "2024-03-24 10:15:30");
        assert!(parse_exif_datetime(b"0000:00:00 00:00:00").is_none());
        assert!(parse_exif_datetime(b"    :  :     :  :  ").is_none());
        assert!(parse_exif_datetime(b"garbage").is_none());
    }

    #[test]
    fn test_exif_date_wins_over_mtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_0001.jpg");
        fs::write(&path, jpeg_with_exif_date("2024:03:24 10:15:30")).unwrap();
        set_mtime(&path, 2020, 1, 1);

        let resolved = resolve_capture_date(&path).unwrap();
        assert_eq!(resolved.source, DateSource::Exif);
        assert_eq!(resolved.date(), NaiveDate::from_ymd_opt(2024, 3, 24).unwrap());
    }

    fn resolve_jpeg(tags: &[(u16, &str)]) -> CaptureDate {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tagged.jpg");
        fs::write(&path, jpeg_with_exif_tags(tags)).unwrap();
        set_mtime(&path, 2001, 1, 1);
        resolve_capture_date(&path).unwrap()
    }

    #[test]
    fn test_date_time_original_has_precedence() {
        let resolved = resolve_jpeg(&[
            (DATE_TIME, "2022:02:02 02:02:02"),
            (DATE_TIME_ORIGINAL, "2020:10:10 10:10:10"),
            (DATE_TIME_DIGITIZED, "2021:11:11 11:11:11"),
        ]);
        assert_eq!(resolved.source, DateSource::Exif);
        assert_eq!(resolved.taken.to_string(), "2020-10-10 10:10:10");
    }

    #[test]
    fn test_digitized_before_date_time() {
        let resolved = resolve_jpeg(&[
            (DATE_TIME, "2022:02:02 02:02:02"),
            (DATE_TIME_DIGITIZED, "2021:11:11 11:11:11"),
        ]);
        assert_eq!(resolved.taken.to_string(), "2021-11-11 11:11:11");
    }

    #[test]
    fn test_date_time_used_last() {
        let resolved = resolve_jpeg(&[(DATE_TIME, "2022:02:02 02:02:02")]);
        assert_eq!(resolved.source, DateSource::Exif);
        assert_eq!(resolved.taken.to_string(), "2022-02-02 02:02:02");
    }

    #[test]
    fn test_invalid_original_falls_through() {
        let resolved = resolve_jpeg(&[
            (DATE_TIME_ORIGINAL, "0000:00:00 00:00:00"),
            (DATE_TIME_DIGITIZED, "2021:11:11 11:11:11"),
        ]);
        assert_eq!(resolved.taken.to_string(), "2021-11-11 11:11:11");

        let resolved = resolve_jpeg(&[
            (DATE_TIME_ORIGINAL, "0000:00:00 00:00:00"),
            (DATE_TIME_DIGITIZED, "    :  :     :  :  "),
            (DATE_TIME, "2022:02:02 02:02:02"),
        ]);
        assert_eq!(resolved.taken.to_string(), "2022-02-02 02:02:02");
    }

    #[test]
    fn test_exif_without_dates_falls_back_to_mtime() {
        let resolved = resolve_jpeg(&[(IMAGE_UNIQUE_ID, "0123456789ABCDEFGHI")]);
        assert_eq!(resolved.source, DateSource::Modified);
        assert_eq!(resolved.date(), NaiveDate::from_ymd_opt(2001, 1, 1).unwrap());
    }

    #[test]
    fn test_png_falls_back_to_mtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.png");
        fs::write(&path, b"\x89PNG\r\n\x1a\n").unwrap();
        set_mtime(&path, 2023, 11, 5);

        let resolved = resolve_capture_date(&path).unwrap();
        assert_eq!(resolved.source, DateSource::Modified);
        assert_eq!(resolved.date(), NaiveDate::from_ymd_opt(2023, 11, 5).unwrap());
    }

    #[test]
    fn test_corrupt_jpeg_falls_back_to_mtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.jpg");
        fs::write(&path, b"not a jpeg").unwrap();
        set_mtime(&path, 2022, 7, 14);

        let resolved = resolve_capture_date(&path).unwrap();
        assert_eq!(resolved.source, DateSource::Modified);
        assert_eq!(resolved.date(), NaiveDate::from_ymd_opt(2022, 7, 14).unwrap());
    }

    #[test]
    fn test_filename_date_only_when_enabled() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_20190812_093000.png");
        fs::write(&path, b"png").unwrap();
        set_mtime(&path, 2023, 11, 5);

        let plain = CaptureDateResolver::new().resolve(&path).unwrap();
        assert_eq!(plain.source, DateSource::Modified);

        let named = CaptureDateResolver::new()
            .with_filename_dates(true)
            .resolve(&path)
            .unwrap();
        assert_eq!(named.source, DateSource::Filename);
        assert_eq!(named.date(), NaiveDate::from_ymd_opt(2019, 8, 12).unwrap());
    }

    #[test]
    fn test_filename_date_patterns() {
        let date = |name: &str| extract_filename_date(Path::new(name)).map(|dt| dt.date());
        let ymd = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);

        assert_eq!(date("2024-03-24_photo.jpg"), ymd(2024, 3, 24));
        assert_eq!(date("holiday_2021_12_31.heic"), ymd(2021, 12, 31));
        assert_eq!(date("WA20200229.jpg"), ymd(2020, 2, 29));
        assert_eq!(date("IMG_99999999.jpg"), None);
        assert_eq!(date("DSC_0042.jpg"), None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = resolve_capture_date(&dir.path().join("gone.jpg")).unwrap_err();
        assert!(matches!(err, OrganizeError::Io { .. }));
    }
}
