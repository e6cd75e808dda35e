pub mod capture_date;
pub mod config;
pub mod error;
pub mod file_ops;
pub mod folder_map;
pub mod hashing;
pub mod naming;
pub mod plan;
mod progress;

pub use capture_date::{resolve_capture_date, CaptureDate, CaptureDateResolver, DateSource, PhotoFormat};
pub use config::{Granularity, OrganizationConfig, TransferMode};
pub use error::OrganizeError;
pub use file_ops::{execute_plan, ExecutionResult, FileOutcome, PlanExecutor, SkipReason};
pub use folder_map::folder_map;
pub use naming::{compute_destination, Season};
pub use plan::{build_plan, build_plan_into, OrganizationPlan, PhotoRecord, Planner, UnreadableFile};
