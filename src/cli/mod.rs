//! Command-line interface.
//!
//! The pipeline is normally invoked with no arguments; every flag falls back
//! to an environment variable.

use std::path::PathBuf;

use clap::Parser;

use crate::config::defaults;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "selfpatch",
    version,
    about = "Let an LLM propose and apply edits to a bot's own source tree"
)]
pub struct Cli {
    /// Workspace root the run may rewrite
    #[arg(long, env = "SELFPATCH_WORKSPACE", default_value = "src")]
    pub workspace: PathBuf,

    /// Directory of task prompts, one picked at random per run
    #[arg(long, env = "SELFPATCH_TASKS", default_value = "tasks")]
    pub tasks: PathBuf,

    /// Directive template containing {{FILES}} and {{TASK}}
    #[arg(long, env = "SELFPATCH_TEMPLATE", default_value = "prompt.txt")]
    pub template: PathBuf,

    /// Comma-separated names to skip while loading (e.g. "node_modules,.git")
    #[arg(long, env = "SELFPATCH_IGNORE", value_delimiter = ',')]
    pub ignore: Vec<String>,

    /// Fixed seed for task selection
    #[arg(long, env = "SELFPATCH_SEED")]
    pub seed: Option<u64>,

    /// Apply edits in memory only
    #[arg(long, env = "SELFPATCH_DRY_RUN")]
    pub dry_run: bool,

    /// File to append commit_message/changelog outputs to (defaults to $GITHUB_OUTPUT)
    #[arg(long, env = "SELFPATCH_OUTPUT")]
    pub output_file: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, env = "SELFPATCH_LOG_JSON")]
    pub log_json: bool,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "LLM_BASE_URL", default_value = defaults::LLM_BASE_URL)]
    pub llm_base_url: String,

    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    #[arg(long, env = "LLM_MODEL", default_value = defaults::LLM_MODEL)]
    pub llm_model: String,

    /// Timeout for the proposal request, in seconds
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value_t = defaults::LLM_TIMEOUT_SECS)]
    pub llm_timeout_secs: u64,

    #[arg(long, env = "LLM_MAX_TOKENS")]
    pub llm_max_tokens: Option<u32>,

    /// Bot token used to post run notifications
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    pub discord_token: Option<String>,

    /// Channel that receives run notifications
    #[arg(long, env = "DISCORD_CHANNEL_ID")]
    pub discord_channel_id: Option<String>,

    #[arg(long, env = "DISCORD_API_BASE", default_value = defaults::DISCORD_API_BASE)]
    pub discord_api_base: String,
}
