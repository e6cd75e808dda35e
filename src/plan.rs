/**
 * Organization planning
 *
 * Builds the full before/after mapping for a source folder without touching
 * anything but directory listings and file metadata.
 */

use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::capture_date::{CaptureDateResolver, DateSource, PhotoFormat};
use crate::config::OrganizationConfig;
use crate::error::{OrganizeError, Result};
use crate::naming::destination_relative_path;
use crate::progress::progress_bar;

/// Prefix of macOS AppleDouble companion files, never photos
const APPLE_DOUBLE_PREFIX: &str = "._";

/// One photo and where it will go
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub source_path: PathBuf,
    pub format: PhotoFormat,
    pub captured_at: NaiveDateTime,
    pub date_source: DateSource,
    /// Folders plus file name, relative to the plan's destination root
    pub destination_relative_path: PathBuf,
}

impl PhotoRecord {
    pub fn resolved_date(&self) -> NaiveDate {
        self.captured_at.date()
    }

    pub fn file_name(&self) -> &OsStr {
        self.destination_relative_path
            .file_name()
            .unwrap_or_else(|| self.source_path.as_os_str())
    }

    /// Folder part of the destination, relative to the destination root
    pub fn destination_folder(&self) -> &Path {
        self.destination_relative_path
            .parent()
            .unwrap_or_else(|| Path::new(""))
    }
}

/// A supported file whose date could not be resolved while planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadableFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationPlan {
    pub source_root: PathBuf,
    pub destination_root: PathBuf,
    pub config: OrganizationConfig,
    pub records: Vec<PhotoRecord>,
    pub unreadable: Vec<UnreadableFile>,
}

impl OrganizationPlan {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Absolute destination a record is planned for
    pub fn destination_path(&self, record: &PhotoRecord) -> PathBuf {
        self.destination_root.join(&record.destination_relative_path)
    }

    /// Records grouped by destination folder, folders in sorted order
    pub fn folders(&self) -> BTreeMap<&Path, Vec<&PhotoRecord>> {
        let mut folders: BTreeMap<&Path, Vec<&PhotoRecord>> = BTreeMap::new();
        for record in &self.records {
            folders.entry(record.destination_folder()).or_default().push(record);
        }
        folders
    }
}

pub struct Planner {
    config: OrganizationConfig,
    resolver: CaptureDateResolver,
    show_progress: bool,
}

impl Planner {
    pub fn new(config: OrganizationConfig) -> Self {
        Self {
            config,
            resolver: CaptureDateResolver::new().with_filename_dates(config.filename_dates),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Plan the photos in `source_dir` into folders under `destination_root`.
    ///
    /// Fails only when the source folder itself cannot be listed. Files whose
    /// date cannot be resolved are reported in `unreadable`.
    pub fn plan(&self, source_dir: &Path, destination_root: &Path) -> Result<OrganizationPlan> {
        let files = find_photo_files(source_dir, self.config.recursive)?;
        info!("Planning {} photos from {}", files.len(), source_dir.display());
        Ok(self.plan_files(source_dir, destination_root, files))
    }

    /// Resolve dates and destinations for already listed files
    fn plan_files(
        &self,
        source_dir: &Path,
        destination_root: &Path,
        files: Vec<(PathBuf, PhotoFormat)>,
    ) -> OrganizationPlan {
        let pb = progress_bar(files.len(), "Reading capture dates", self.show_progress);
        let mut records = Vec::with_capacity(files.len());
        let mut unreadable = Vec::new();

        for (path, format) in files {
            pb.inc(1);
            let resolved = match self.resolver.resolve(&path) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    unreadable.push(UnreadableFile {
                        reason: error_chain(&e),
                        path,
                    });
                    continue;
                }
            };

            let Some(file_name) = path.file_name() else {
                continue;
            };
            let relative = destination_relative_path(&resolved.date(), &self.config, file_name);
            debug!("{} -> {}", path.display(), relative.display());

            records.push(PhotoRecord {
                source_path: path,
                format,
                captured_at: resolved.taken,
                date_source: resolved.source,
                destination_relative_path: relative,
            });
        }
        pb.finish_and_clear();

        OrganizationPlan {
            source_root: source_dir.to_path_buf(),
            destination_root: destination_root.to_path_buf(),
            config: self.config,
            records,
            unreadable,
        }
    }
}

/// Plan with folders created inside the source directory
pub fn build_plan(source_dir: &Path, config: &OrganizationConfig) -> Result<OrganizationPlan> {
    Planner::new(*config).plan(source_dir, source_dir)
}

/// Plan with folders created under an explicit destination root
pub fn build_plan_into(
    source_dir: &Path,
    destination_root: &Path,
    config: &OrganizationConfig,
) -> Result<OrganizationPlan> {
    Planner::new(*config).plan(source_dir, destination_root)
}

/// Supported photos in `directory`, ordered by path
fn find_photo_files(directory: &Path, recursive: bool) -> Result<Vec<(PathBuf, PhotoFormat)>> {
    let unreadable = |source| OrganizeError::SourceUnreadable {
        path: directory.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(directory).map_err(unreadable)?;
    if !metadata.is_dir() {
        return Err(OrganizeError::NotADirectory {
            path: directory.to_path_buf(),
        });
    }
    // Listing permission is checked up front so a locked folder is fatal
    fs::read_dir(directory).map_err(unreadable)?;

    let walker = WalkDir::new(directory).min_depth(1).sort_by_file_name();
    let walker = if recursive { walker } else { walker.max_depth(1) };

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", directory.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(APPLE_DOUBLE_PREFIX) {
            debug!("Skipping AppleDouble file: {}", entry.path().display());
            continue;
        }
        if let Some(format) = PhotoFormat::from_path(entry.path()) {
            files.push((entry.into_path(), format));
        }
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn error_chain(e: &OrganizeError) -> String {
    match std::error::Error::source(e) {
        Some(source) => format!("{}: {}", e, source),
        None => e.to_string(),
    }
}
