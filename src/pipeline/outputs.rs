//! Named string outputs handed to the surrounding CI job.
//!
//! Outputs are appended in the multiline `name<<DELIMITER` form understood by
//! GitHub Actions' `$GITHUB_OUTPUT` file.

use std::io::Write;
use std::path::Path;

use uuid::Uuid;

pub const COMMIT_MESSAGE: &str = "commit_message";
pub const CHANGELOG: &str = "changelog";

/// Format one output entry. The delimiter is random so it cannot collide
/// with model-generated text.
pub fn format_output(name: &str, value: &str) -> String {
    let delimiter = format!("SELFPATCH_EOF_{}", Uuid::new_v4().simple());
    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}

/// Append every `(name, value)` pair to `path`.
pub fn write_outputs(path: &Path, outputs: &[(&str, &str)]) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    for (name, value) in outputs {
        file.write_all(format_output(name, value).as_bytes())?;
    }
    file.flush()
}
