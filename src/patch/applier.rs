//! Applies a proposal's modify-jobs to the loaded workspace and persists the
//! touched files.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use tokio::fs;

use crate::error::PatchError;
use crate::patch::model::ModifyJob;
use crate::workspace::SourceFile;

/// What happened to a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The buffer changed.
    Applied,
    /// The job was valid but had nothing to do.
    NoOp,
    /// The job's inputs were malformed; the buffer is untouched.
    Failed(PatchError),
    /// No loaded file matches `job.file`.
    UnknownFile,
}

/// Result of writing one touched file back to the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWrite {
    pub file: String,
    pub bytes: usize,
    pub error: Option<String>,
}

/// Summary of the apply phase.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    /// One outcome per job, in the order the jobs were received.
    pub outcomes: Vec<(ModifyJob, JobOutcome)>,
    /// Final content of every file that at least one job targeted.
    pub touched: BTreeMap<String, String>,
    /// Persistence results; empty in dry-run mode.
    pub writes: Vec<FileWrite>,
}

impl ApplyReport {
    pub fn count(&self, pred: impl Fn(&JobOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }

    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Applied))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, JobOutcome::Failed(_) | JobOutcome::UnknownFile))
    }

    pub fn write_failures(&self) -> usize {
        self.writes.iter().filter(|w| w.error.is_some()).count()
    }

    /// One-line summary for logs and the completion notification.
    pub fn summary(&self) -> String {
        format!(
            "{} job(s): {} applied, {} no-op, {} failed; {} file(s) touched",
            self.outcomes.len(),
            self.applied(),
            self.count(|o| matches!(o, JobOutcome::NoOp)),
            self.failed(),
            self.touched.len(),
        )
    }
}

/// Owns the in-memory workspace buffers for one run.
pub struct PatchApplier {
    root: PathBuf,
    buffers: HashMap<String, String>,
    dry_run: bool,
}

impl PatchApplier {
    /// Take ownership of the loaded files.
    pub fn new(root: impl Into<PathBuf>, files: Vec<SourceFile>) -> Self {
        let buffers = files.into_iter().map(|f| (f.file_name, f.data)).collect();
        Self {
            root: root.into(),
            buffers,
            dry_run: false,
        }
    }

    /// Apply in memory only; never write to disk.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Apply every job in order, then persist the touched files.
    pub async fn apply(mut self, jobs: &[ModifyJob]) -> ApplyReport {
        let mut report = self.apply_in_memory(jobs);

        if self.dry_run {
            tracing::info!(
                "Dry run: skipping write of {} file(s)",
                report.touched.len()
            );
            return report;
        }

        for (file, content) in &report.touched {
            let path = self.root.join(file);
            let error = match fs::write(&path, content).await {
                Ok(()) => {
                    tracing::info!("Wrote {} ({} bytes)", path.display(), content.len());
                    None
                }
                Err(e) => {
                    tracing::error!("Failed to write {}: {}", path.display(), e);
                    Some(e.to_string())
                }
            };
            report.writes.push(FileWrite {
                file: file.clone(),
                bytes: content.len(),
                error,
            });
        }

        report
    }

    /// Fold the jobs over the buffer map. Each job sees the result of every
    /// earlier job against the same file.
    pub fn apply_in_memory(&mut self, jobs: &[ModifyJob]) -> ApplyReport {
        let mut touched_names: Vec<&str> = Vec::new();
        let mut outcomes = Vec::with_capacity(jobs.len());

        for (idx, job) in jobs.iter().enumerate() {
            let Some(buffer) = self.buffers.get_mut(&job.file) else {
                tracing::warn!(
                    "Job {} targets unknown file '{}', skipping",
                    idx + 1,
                    job.file
                );
                outcomes.push((job.clone(), JobOutcome::UnknownFile));
                continue;
            };

            if !touched_names.contains(&job.file.as_str()) {
                touched_names.push(&job.file);
            }

            let outcome = match job.apply(buffer) {
                Ok(true) => JobOutcome::Applied,
                Ok(false) => {
                    tracing::debug!("Job {} ({} {}) was a no-op", idx + 1, job.job_type, job.file);
                    JobOutcome::NoOp
                }
                Err(e) => {
                    tracing::warn!("Job {} on '{}' skipped: {}", idx + 1, job.file, e);
                    JobOutcome::Failed(e)
                }
            };
            outcomes.push((job.clone(), outcome));
        }

        let touched = touched_names
            .into_iter()
            .filter_map(|name| {
                self.buffers
                    .get(name)
                    .map(|data| (name.to_string(), data.clone()))
            })
            .collect();

        ApplyReport {
            outcomes,
            touched,
            writes: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::patch::model::JobType;

    fn files() -> Vec<SourceFile> {
        vec![
            SourceFile::new("a.txt", "1\n2\n3"),
            SourceFile::new("b.txt", "x"),
        ]
    }

    #[test]
    fn test_jobs_see_latest_buffer() {
        let mut applier = PatchApplier::new("/unused", files());
        let report = applier.apply_in_memory(&[
            ModifyJob::append("a.txt", 2, "NEW"),
            ModifyJob::delete("a.txt", 1),
        ]);

        assert_eq!(report.touched.get("a.txt").unwrap(), "2\nNEW\n3");
        assert!(!report.touched.contains_key("b.txt"));
        assert_eq!(report.applied(), 2);
    }

    #[test]
    fn test_unknown_file_does_not_affect_others() {
        let mut applier = PatchApplier::new("/unused", files());
        let report = applier.apply_in_memory(&[
            ModifyJob::replace("missing.txt", "x", "y"),
            ModifyJob::replace("b.txt", "x", "y"),
        ]);

        assert_eq!(report.outcomes[0].1, JobOutcome::UnknownFile);
        assert_eq!(report.outcomes[1].1, JobOutcome::Applied);
        assert_eq!(report.touched.get("b.txt").unwrap(), "y");
        assert_eq!(report.touched.len(), 1);
    }

    #[test]
    fn test_bad_job_is_isolated() {
        let mut applier = PatchApplier::new("/unused", files());
        let bad = ModifyJob {
            file: "a.txt".into(),
            job_type: JobType::Append,
            source: "zero".into(),
            destination: "nope".into(),
        };
        let report = applier.apply_in_memory(&[bad, ModifyJob::delete("a.txt", 3)]);

        assert!(matches!(report.outcomes[0].1, JobOutcome::Failed(_)));
        assert_eq!(report.outcomes[1].1, JobOutcome::Applied);
        assert_eq!(report.touched.get("a.txt").unwrap(), "1\n2");
        assert_eq!(report.failed(), 1);
    }

    #[tokio::test]
    async fn test_only_touched_files_are_written() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), "1\n2\n3").unwrap();
        std::fs::write(dir.path().join("b.txt"), "x").unwrap();

        // Stale on-disk content for b.txt proves it is never rewritten.
        let mut loaded = files();
        loaded[1].data = "stale".into();

        let report = PatchApplier::new(dir.path(), loaded)
            .apply(&[ModifyJob::append("a.txt", 3, "4")])
            .await;

        assert_eq!(report.writes.len(), 1);
        assert_eq!(report.write_failures(), 0);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "1\n2\n3\n4"
        );
        assert_eq!(std::fs::read_to_string(dir.path().join("b.txt")).unwrap(), "x");
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.txt"), "x").unwrap();

        let report = PatchApplier::new(dir.path(), files())
            .with_dry_run(true)
            .apply(&[ModifyJob::replace("b.txt", "x", "y")])
            .await;

        assert_eq!(report.touched.get("b.txt").unwrap(), "y");
        assert!(report.writes.is_empty());
        assert_eq!(std::fs::read_to_string(dir.path().join("b.txt")).unwrap(), "x");
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let nested = vec![SourceFile::new("gone/c.txt", "c")];

        let report = PatchApplier::new(dir.path(), nested)
            .apply(&[ModifyJob::append("gone/c.txt", 1, "d")])
            .await;

        assert_eq!(report.write_failures(), 1);
        assert_eq!(report.applied(), 1);
    }
}
