//! Modify-jobs and their application to the workspace.

mod applier;
mod model;

pub use applier::{ApplyReport, FileWrite, JobOutcome, PatchApplier};
pub use model::{JobType, ModifyJob, append_line, delete_line, replace_all};
