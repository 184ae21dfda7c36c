//! Lifecycle notifications for a pipeline run.
//!
//! Notifications are best effort: [`Notifier::notify`] swallows and logs
//! delivery failures so they can never fail or mask a run.

mod discord;

pub use discord::DiscordNotifier;

use async_trait::async_trait;

use crate::error::NotifyError;

/// Something that can post a text message to the configured channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Get the notifier name (e.g., "discord", "log").
    fn name(&self) -> &str;

    /// Deliver a message, reporting failures.
    async fn send(&self, text: &str) -> Result<(), NotifyError>;

    /// Deliver a message, logging and dropping any failure.
    async fn notify(&self, text: &str) {
        if let Err(e) = self.send(text).await {
            tracing::warn!("Notification via {} failed: {}", self.name(), e);
        }
    }
}

/// Writes notifications to the log. Used when no channel is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        tracing::info!(target: "selfpatch::notify", "{}", text);
        Ok(())
    }
}

/// Split `text` into chunks of at most `limit` characters, preferring line
/// breaks as split points.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();

        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if line_len > limit {
            // A single line longer than the limit gets hard-split.
            for ch in line.chars() {
                if current_len == limit {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                current.push(ch);
                current_len += 1;
            }
        } else {
            current.push_str(line);
            current_len += line_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
