//! One self-modification run.
//!
//! ```text
//! Idle ─► Loading ─► Assembling ─► Proposing ─► Applying ─► Notifying ─► Done
//!            │                         │
//!            └─────────────────────────┴──────► Failed
//! ```
//!
//! Every input is validated while loading (including a non-empty task pool),
//! so assembling cannot fail. Loading and proposing happen entirely in
//! memory, so a failure in either leaves the workspace untouched. Applying
//! never fails the run: bad jobs are skipped and reported.

pub mod outputs;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;

use crate::config::PipelineConfig;
use crate::error::{ConfigError, Error, Result};
use crate::notify::Notifier;
use crate::patch::{ApplyReport, PatchApplier};
use crate::prompt::{PromptAssembler, PromptTemplate};
use crate::proposer::{ChangeProposer, ProposalResult};
use crate::workspace::{WorkspaceLoader, read_text};

/// Phase of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Loading,
    Assembling,
    Proposing,
    Applying,
    Notifying,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Loading => "loading",
            PipelineState::Assembling => "assembling",
            PipelineState::Proposing => "proposing",
            PipelineState::Applying => "applying",
            PipelineState::Notifying => "notifying",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Appended to the changelog when the model proposes nothing.
pub const EMPTY_PROPOSAL_NOTE: &str = "No changes were proposed for this run.";

/// Posted in place of a blank changelog so the third notification always goes out.
pub const EMPTY_CHANGELOG_NOTICE: &str = "(empty changelog)";

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub state: PipelineState,
    pub task: String,
    pub proposal: ProposalResult,
    pub apply: ApplyReport,
    pub response_size: usize,
}

/// Filesystem inputs for a run.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub workspace_dir: PathBuf,
    pub tasks_dir: PathBuf,
    pub template_path: PathBuf,
}

impl From<&PipelineConfig> for RunPaths {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            workspace_dir: config.workspace_dir.clone(),
            tasks_dir: config.tasks_dir.clone(),
            template_path: config.template_path.clone(),
        }
    }
}

/// Drives one run from loading to the final notification.
pub struct Pipeline<R: Rng> {
    paths: RunPaths,
    loader: WorkspaceLoader,
    proposer: ChangeProposer,
    notifier: Arc<dyn Notifier>,
    rng: R,
    dry_run: bool,
    state: PipelineState,
}

impl<R: Rng> Pipeline<R> {
    pub fn new(
        paths: RunPaths,
        proposer: ChangeProposer,
        notifier: Arc<dyn Notifier>,
        rng: R,
    ) -> Self {
        Self {
            paths,
            loader: WorkspaceLoader::new(),
            proposer,
            notifier,
            rng,
            dry_run: false,
            state: PipelineState::Idle,
        }
    }

    pub fn with_loader(mut self, loader: WorkspaceLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    fn enter(&mut self, state: PipelineState) {
        tracing::info!("Pipeline: {} -> {}", self.state, state);
        self.state = state;
    }

    /// Run the pipeline to `Done` or `Failed`.
    ///
    /// A fatal error is reported to the notifier (best effort) and returned
    /// wrapped with the phase it happened in.
    pub async fn run(&mut self) -> Result<RunReport> {
        self.notifier
            .notify(&format!(
                "Self-patch run started at {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
            ))
            .await;

        match self.execute().await {
            Ok(report) => Ok(report),
            Err(e) => {
                let phase = self.state;
                self.enter(PipelineState::Failed);
                tracing::error!("Run failed during {}: {}", phase, e);
                self.notifier
                    .notify(&format!("Self-patch run failed during {}: {}", phase, e))
                    .await;
                Err(Error::Pipeline {
                    phase,
                    source: Box::new(e),
                })
            }
        }
    }

    async fn execute(&mut self) -> Result<RunReport> {
        self.enter(PipelineState::Loading);
        let template_raw = read_text(&self.paths.template_path).await?;
        let template = PromptTemplate::parse(template_raw)?;
        let (files, tasks) = self
            .loader
            .load_all(&self.paths.workspace_dir, &self.paths.tasks_dir)
            .await?;
        if tasks.is_empty() {
            return Err(ConfigError::NoTasks.into());
        }

        self.enter(PipelineState::Assembling);
        let directive = {
            let mut assembler = PromptAssembler::new(template, &mut self.rng);
            assembler.assemble(&files, &tasks)?
        };

        self.enter(PipelineState::Proposing);
        let proposal = self.proposer.propose(&directive.text).await?;
        let mut result = proposal.result;

        if result.modify_jobs.is_empty() {
            tracing::warn!("Proposal contains no modify-jobs");
            if result.changelog.trim().is_empty() {
                result.changelog = EMPTY_PROPOSAL_NOTE.to_string();
            } else {
                result.changelog = format!("{}\n\n{}", result.changelog, EMPTY_PROPOSAL_NOTE);
            }
        }

        self.enter(PipelineState::Applying);
        let apply = PatchApplier::new(self.paths.workspace_dir.clone(), files)
            .with_dry_run(self.dry_run)
            .apply(&result.modify_jobs)
            .await;
        tracing::info!("{}", apply.summary());

        self.enter(PipelineState::Notifying);
        self.notifier
            .notify(&format!(
                "Self-patch run finished: {} byte response, {}",
                proposal.response_size,
                apply.summary()
            ))
            .await;
        let changelog = if result.changelog.trim().is_empty() {
            EMPTY_CHANGELOG_NOTICE
        } else {
            result.changelog.as_str()
        };
        self.notifier.notify(changelog).await;

        self.enter(PipelineState::Done);
        Ok(RunReport {
            state: self.state,
            task: directive.task.name,
            proposal: result,
            apply,
            response_size: proposal.response_size,
        })
    }
}
