/**
 * Plan execution: copies or moves planned photos into their folders
 *
 * Collision policy, applied in plan order:
 * - destination holds identical content -> skipped as duplicate
 * - destination holds other content     -> written as stem-2.ext, stem-3.ext, ...
 * Existing destination files are never overwritten or deleted.
 */

use anyhow::{Context, Result};
use filetime::FileTime;
use log::{debug, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::TransferMode;
use crate::hashing::ContentHasher;
use crate::naming::suffixed_file_name;
use crate::plan::{OrganizationPlan, PhotoRecord};
use crate::progress::progress_bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// An identical file already sits at the destination
    Duplicate,
    /// Source and destination are the same file
    AlreadyInPlace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Transferred {
        source: PathBuf,
        destination: PathBuf,
    },
    Skipped {
        source: PathBuf,
        destination: PathBuf,
        reason: SkipReason,
    },
    Failed {
        source: PathBuf,
        reason: String,
    },
}

impl FileOutcome {
    pub fn source(&self) -> &Path {
        match self {
            FileOutcome::Transferred { source, .. }
            | FileOutcome::Skipped { source, .. }
            | FileOutcome::Failed { source, .. } => source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub mode: TransferMode,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<FileOutcome>,
}

impl ExecutionResult {
    fn new(mode: TransferMode) -> Self {
        Self {
            mode,
            succeeded: 0,
            skipped: 0,
            failed: 0,
            outcomes: Vec::new(),
        }
    }

    fn record(&mut self, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Transferred { .. } => self.succeeded += 1,
            FileOutcome::Skipped { .. } => self.skipped += 1,
            FileOutcome::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Failed files with their reasons
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            FileOutcome::Failed { source, reason } => Some((source.as_path(), reason.as_str())),
            _ => None,
        })
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed == 0
    }
}

/// Where a record ends up once collisions are taken into account
enum Target {
    Free(PathBuf),
    Duplicate(PathBuf),
}

pub struct PlanExecutor {
    content_hasher: ContentHasher,
    show_progress: bool,
}

impl Default for PlanExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanExecutor {
    pub fn new() -> Self {
        Self {
            content_hasher: ContentHasher::new(),
            show_progress: false,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Execute a plan, consuming it.
    ///
    /// Every record gets an outcome; a failing file never stops the rest.
    pub fn execute(&self, plan: OrganizationPlan) -> ExecutionResult {
        let mode = plan.config.transfer_mode();
        info!(
            "Executing plan: {} {} photos into {}",
            mode,
            plan.len(),
            plan.destination_root.display()
        );

        let pb = progress_bar(plan.len(), "Organizing photos", self.show_progress);
        let mut result = ExecutionResult::new(mode);

        for record in &plan.records {
            let outcome = self.execute_record(&plan, record, mode);
            match &outcome {
                FileOutcome::Failed { source, reason } => {
                    warn!("Failed to {} {}: {}", mode, source.display(), reason);
                }
                FileOutcome::Skipped { source, reason, .. } => {
                    debug!("Skipped {} ({:?})", source.display(), reason);
                }
                FileOutcome::Transferred { .. } => {}
            }
            result.record(outcome);
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!(
            "Plan executed: {} succeeded, {} skipped, {} failed",
            result.succeeded, result.skipped, result.failed
        );
        result
    }

    fn execute_record(&self, plan: &OrganizationPlan, record: &PhotoRecord, mode: TransferMode) -> FileOutcome {
        let source = record.source_path.clone();
        let planned = plan.destination_path(record);

        if planned == source {
            return FileOutcome::Skipped {
                source,
                destination: planned,
                reason: SkipReason::AlreadyInPlace,
            };
        }

        let target = match self.resolve_target(&source, &planned) {
            Ok(target) => target,
            Err(e) => {
                return FileOutcome::Failed {
                    source,
                    reason: format!("{:#}", e),
                }
            }
        };

        match target {
            Target::Duplicate(existing) => FileOutcome::Skipped {
                source,
                destination: existing,
                reason: SkipReason::Duplicate,
            },
            Target::Free(destination) => match perform_file_operation(&source, &destination, mode) {
                Ok(()) => FileOutcome::Transferred { source, destination },
                Err(e) => FileOutcome::Failed {
                    source,
                    reason: format!("Failed to {} file: {:#}", mode, e),
                },
            },
        }
    }

    /// First free name for `planned`, or the existing file it duplicates
    fn resolve_target(&self, source: &Path, planned: &Path) -> Result<Target> {
        let file_name = planned
            .file_name()
            .with_context(|| format!("Destination has no file name: {}", planned.display()))?;
        let folder = planned.parent().unwrap_or_else(|| Path::new(""));

        let mut candidate = planned.to_path_buf();
        let mut counter = 2;
        loop {
            if !path_taken(&candidate)? {
                return Ok(Target::Free(candidate));
            }
            if self.content_hasher.same_content(source, &candidate)? {
                return Ok(Target::Duplicate(candidate));
            }
            debug!("Destination taken: {}", candidate.display());
            candidate = folder.join(suffixed_file_name(file_name, counter));
            counter += 1;
        }
    }
}

/// Execute a plan without progress output
pub fn execute_plan(plan: OrganizationPlan) -> ExecutionResult {
    PlanExecutor::new().execute(plan)
}

fn path_taken(path: &Path) -> Result<bool> {
    path.try_exists()
        .with_context(|| format!("Failed to check destination: {}", path.display()))
}

/// Copy or move one file, creating the destination folders first
fn perform_file_operation(source_path: &Path, target_path: &Path, mode: TransferMode) -> Result<()> {
    debug!("Attempting {} operation: '{}' -> '{}'", mode, source_path.display(), target_path.display());

    if let Some(parent) = target_path.parent() {
        if !parent.exists() {
            debug!("Creating target directory: {}", parent.display());
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create target directory: {}", parent.display()))?;
        }
    }

    match mode {
        TransferMode::Move => match fs::rename(source_path, target_path) {
            Ok(()) => {
                debug!("Move operation successful");
            }
            Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
                debug!("Cross-device move detected, using copy+delete strategy");
                copy_preserving_mtime(source_path, target_path)?;
                if let Err(e) = fs::remove_file(source_path) {
                    // Leave exactly one copy behind: the untouched source
                    discard_partial_target(target_path);
                    return Err(e)
                        .with_context(|| format!("Failed to remove original file: {}", source_path.display()));
                }
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Failed to move file from '{}' to '{}'",
                        source_path.display(),
                        target_path.display()
                    )
                });
            }
        },
        TransferMode::Copy => {
            copy_preserving_mtime(source_path, target_path)?;
            debug!("Copy operation successful");
        }
    }
    Ok(())
}

/// Copy with the source's modification time. On any error the target, which
/// was free before the call, is removed again.
fn copy_preserving_mtime(source_path: &Path, target_path: &Path) -> Result<()> {
    let copied = copy_then_set_mtime(source_path, target_path);
    if copied.is_err() {
        discard_partial_target(target_path);
    }
    copied
}

fn discard_partial_target(target_path: &Path) {
    match fs::remove_file(target_path) {
        Ok(()) => debug!("Removed partial target: {}", target_path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial target {}: {}", target_path.display(), e),
    }
}

fn copy_then_set_mtime(source_path: &Path, target_path: &Path) -> Result<()> {
    fs::copy(source_path, target_path).with_context(|| {
        format!(
            "Failed to copy file from '{}' to '{}'",
            source_path.display(),
            target_path.display()
        )
    })?;

    let metadata = fs::metadata(source_path)
        .with_context(|| format!("Failed to read metadata: {}", source_path.display()))?;
    filetime::set_file_mtime(target_path, FileTime::from_last_modification_time(&metadata))
        .with_context(|| format!("Failed to set modification time: {}", target_path.display()))?;
    Ok(())
}
