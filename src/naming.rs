/**
 * Destination folder naming
 *
 * Folder formats:
 *   Year   -> YYYY_Photos
 *   Season -> YYYY_<Season>_Photos
 *   Month  -> YYYY-MM_Photos
 *   Day    -> YYYY-MM-DD_Photos
 * With a year parent every granularity except Year is nested under YYYY/.
 */

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{Granularity, OrganizationConfig};

/// Meteorological season. Boundary months belong wholly to one season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Fall,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compute the destination folder segments for a date.
///
/// Pure function of its inputs. December stays in its own calendar year even
/// though its season continues into the next one.
pub fn compute_destination<D: Datelike>(date: &D, config: &OrganizationConfig) -> Vec<String> {
    let year = date.year();

    let leaf = match config.granularity {
        Granularity::Year => format!("{:04}_Photos", year),
        Granularity::Season => {
            format!("{:04}_{}_Photos", year, Season::from_month(date.month()))
        }
        Granularity::Month => format!("{:04}-{:02}_Photos", year, date.month()),
        Granularity::Day => {
            format!("{:04}-{:02}-{:02}_Photos", year, date.month(), date.day())
        }
    };

    // The Year leaf already is the year folder
    if config.use_year_parent && config.granularity != Granularity::Year {
        vec![format!("{:04}", year), leaf]
    } else {
        vec![leaf]
    }
}

/// Relative destination of a file: the computed folders plus its own name
pub fn destination_relative_path<D: Datelike>(
    date: &D,
    config: &OrganizationConfig,
    file_name: &OsStr,
) -> PathBuf {
    let mut path: PathBuf = compute_destination(date, config).into_iter().collect();
    path.push(file_name);
    path
}

/// Name used for the n-th colliding file: `stem-n.ext`
pub fn suffixed_file_name(file_name: &OsStr, counter: u32) -> OsString {
    let path = Path::new(file_name);
    let mut name = path
        .file_stem()
        .map(OsStr::to_os_string)
        .unwrap_or_else(|| file_name.to_os_string());
    name.push(format!("-{}", counter));
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }
    name
}
