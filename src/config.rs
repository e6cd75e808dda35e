/**
 * Organization options supplied by the front-end
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bucketing unit used to name destination folders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Year,
    Season,
    Month,
    Day,
}

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Year,
        Granularity::Season,
        Granularity::Month,
        Granularity::Day,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Year => "year",
            Granularity::Season => "season",
            Granularity::Month => "month",
            Granularity::Day => "day",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "year" | "yearly" => Ok(Granularity::Year),
            "season" => Ok(Granularity::Season),
            "month" | "monthly" => Ok(Granularity::Month),
            "day" | "daily" => Ok(Granularity::Day),
            other => Err(format!(
                "Invalid granularity: {}. Must be 'year', 'season', 'month', or 'day'",
                other
            )),
        }
    }
}

/// How a photo reaches its destination folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    Copy,
    Move,
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferMode::Copy => f.write_str("copy"),
            TransferMode::Move => f.write_str("move"),
        }
    }
}

/// Immutable set of options a plan is built with.
///
/// `recursive` and `filename_dates` are off by default, which keeps the plan
/// limited to the files directly inside the source folder and dates resolved
/// from metadata or the modification time only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub granularity: Granularity,
    pub use_year_parent: bool,
    pub move_files: bool,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub filename_dates: bool,
}

impl OrganizationConfig {
    pub fn new(granularity: Granularity) -> Self {
        Self {
            granularity,
            ..Self::default()
        }
    }

    pub fn with_year_parent(mut self, use_year_parent: bool) -> Self {
        self.use_year_parent = use_year_parent;
        self
    }

    pub fn with_move_files(mut self, move_files: bool) -> Self {
        self.move_files = move_files;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_filename_dates(mut self, filename_dates: bool) -> Self {
        self.filename_dates = filename_dates;
        self
    }

    pub fn transfer_mode(&self) -> TransferMode {
        if self.move_files {
            TransferMode::Move
        } else {
            TransferMode::Copy
        }
    }
}
