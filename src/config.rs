//! Runtime configuration.
//!
//! Everything is read from the environment (optionally via `.env`) through
//! the clap [`Cli`](crate::cli::Cli); this module turns those raw values into
//! validated settings.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::cli::Cli;
use crate::error::ConfigError;

const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_LLM_MODEL: &str = "gpt-4o";
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 600;
const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Complete configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub llm: LlmConfig,
    pub notify: NotifyConfig,
}

/// Filesystem layout and run behavior.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Mutable tree of files the run may rewrite.
    pub workspace_dir: PathBuf,
    /// Read-only pool of task prompts.
    pub tasks_dir: PathBuf,
    /// Directive template containing both placeholders.
    pub template_path: PathBuf,
    /// Directory or file names skipped while loading.
    pub ignore: Vec<String>,
    /// Fixed seed for task selection.
    pub seed: Option<u64>,
    /// Apply in memory only.
    pub dry_run: bool,
    /// File the named run outputs are appended to.
    pub output_file: Option<PathBuf>,
}

/// LLM provider configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub model: String,
    /// Upper bound on the proposal request.
    pub timeout: Duration,
    pub max_tokens: Option<u32>,
}

/// Notification channel configuration.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub api_base: String,
    pub discord_token: Option<SecretString>,
    pub channel_id: Option<String>,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_DISCORD_API_BASE.to_string(),
            discord_token: None,
            channel_id: None,
        }
    }
}

impl Config {
    /// Build and validate the configuration from parsed CLI/env values.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let api_key = cli
            .llm_api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "LLM_API_KEY".to_string(),
                hint: "Set it in the environment or .env".to_string(),
            })?;

        if cli.llm_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "LLM_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if let Some(id) = &cli.discord_channel_id {
            if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
                return Err(ConfigError::InvalidValue {
                    key: "DISCORD_CHANNEL_ID".to_string(),
                    message: format!("'{}' is not a Discord snowflake", id),
                });
            }
        }

        let output_file = cli.output_file.or_else(|| {
            std::env::var_os("GITHUB_OUTPUT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        });

        Ok(Self {
            pipeline: PipelineConfig {
                workspace_dir: cli.workspace,
                tasks_dir: cli.tasks,
                template_path: cli.template,
                ignore: cli
                    .ignore
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                seed: cli.seed,
                dry_run: cli.dry_run,
                output_file,
            },
            llm: LlmConfig {
                base_url: cli.llm_base_url,
                api_key: SecretString::from(api_key),
                model: cli.llm_model,
                timeout: Duration::from_secs(cli.llm_timeout_secs),
                max_tokens: cli.llm_max_tokens,
            },
            notify: NotifyConfig {
                api_base: cli.discord_api_base,
                discord_token: cli
                    .discord_token
                    .filter(|t| !t.trim().is_empty())
                    .map(SecretString::from),
                channel_id: cli.discord_channel_id,
            },
        })
    }
}

impl LlmConfig {
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            api_key: SecretString::from("test-key".to_string()),
            model: DEFAULT_LLM_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
            max_tokens: None,
        }
    }
}

/// Defaults shared with the clap definitions.
pub mod defaults {
    pub const LLM_BASE_URL: &str = super::DEFAULT_LLM_BASE_URL;
    pub const LLM_MODEL: &str = super::DEFAULT_LLM_MODEL;
    pub const LLM_TIMEOUT_SECS: u64 = super::DEFAULT_LLM_TIMEOUT_SECS;
    pub const DISCORD_API_BASE: &str = super::DEFAULT_DISCORD_API_BASE;
}
