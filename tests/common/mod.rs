#![allow(dead_code)]

use chrono::{Local, TimeZone};
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};

pub const DATE_TIME: u16 = 0x0132;
pub const DATE_TIME_ORIGINAL: u16 = 0x9003;
pub const DATE_TIME_DIGITIZED: u16 = 0x9004;
pub const IMAGE_UNIQUE_ID: u16 = 0xA420;

fn push_ifd_entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
    out.extend_from_slice(&tag.to_be_bytes());
    out.extend_from_slice(&kind.to_be_bytes());
    out.extend_from_slice(&count.to_be_bytes());
    out.extend_from_slice(&value.to_be_bytes());
}

/// Minimal big-endian JPEG with the given 19-character ASCII tags.
/// DateTime goes into IFD0, every other tag into the Exif IFD.
pub fn jpeg_with_exif_tags(tags: &[(u16, &str)]) -> Vec<u8> {
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

pub fn jpeg_with_exif_date(date: &str) -> Vec<u8> {
    jpeg_with_exif_tags(&[(DATE_TIME_ORIGINAL, date)])
}

/// Set the modification time to local noon of the given day
pub fn set_mtime(path: &Path, year: i32, month: u32, day: u32) {
    let ts = Local
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .unwrap()
        .timestamp();
    filetime::set_file_mtime(path, FileTime::from_unix_time(ts, 0)).unwrap();
}

pub fn write_file(dir: &Path, name: &str, content: &[u8], mtime: (i32, u32, u32)) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    set_mtime(&path, mtime.0, mtime.1, mtime.2);
    path
}
