//! selfpatch: an LLM-driven self-modification pipeline for a Discord bot.
//!
//! A run loads the bot's source tree, asks a model for a list of modify-jobs
//! for one randomly chosen task, applies them, and announces the result.

pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod notify;
pub mod patch;
pub mod pipeline;
pub mod prompt;
pub mod proposer;
pub mod workspace;

pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineState, RunPaths, RunReport};
