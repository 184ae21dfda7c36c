//! Modify-job types and their semantics over a single text buffer.
//!
//! Buffers are treated as `\n`-separated lines. Line numbers are 1-based and
//! always address the buffer as it is *now*: a job that follows an insert or
//! delete in the same file sees shifted lines. The proposer is asked for line
//! numbers against the original file, so multi-job edits on one file can land
//! one line off. This is kept deliberately for compatibility with existing
//! task prompts.

use serde::{Deserialize, Serialize};

use crate::error::PatchError;

/// Kind of edit a modify-job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    /// Insert `destination` after line `source`.
    Append,
    /// Replace every literal occurrence of `source` with `destination`.
    Replace,
    /// Remove line `source`.
    Delete,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Append => "append",
            JobType::Replace => "replace",
            JobType::Delete => "delete",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One proposed edit against one workspace file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModifyJob {
    /// Workspace-relative file name the job targets.
    pub file: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub source: String,
    /// Unused by delete jobs, so it may be omitted on the wire.
    #[serde(default)]
    pub destination: String,
}

impl ModifyJob {
    pub fn append(file: impl Into<String>, line: usize, text: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            job_type: JobType::Append,
            source: line.to_string(),
            destination: text.into(),
        }
    }

    pub fn replace(
        file: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            job_type: JobType::Replace,
            source: from.into(),
            destination: to.into(),
        }
    }

    pub fn delete(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            job_type: JobType::Delete,
            source: line.to_string(),
            destination: String::new(),
        }
    }

    /// Apply this job to `buffer` in place.
    ///
    /// Returns `Ok(true)` when the buffer changed and `Ok(false)` for a no-op.
    pub fn apply(&self, buffer: &mut String) -> Result<bool, PatchError> {
        match self.job_type {
            JobType::Append => match parse_line_number(&self.source, JobType::Append)? {
                Some(line) => {
                    append_line(buffer, line, &self.destination);
                    Ok(true)
                }
                None => Err(invalid_line(&self.source, JobType::Append)),
            },
            JobType::Replace => Ok(replace_all(buffer, &self.source, &self.destination)),
            JobType::Delete => match parse_line_number(&self.source, JobType::Delete)? {
                Some(line) => Ok(delete_line(buffer, line)),
                None => Ok(false),
            },
        }
    }
}

/// Parse an optionally signed integer line number.
///
/// `Ok(None)` means zero or negative. Values too large for `usize` saturate,
/// which lands them past the end of any buffer.
fn parse_line_number(raw: &str, op: JobType) -> Result<Option<usize>, PatchError> {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid_line(raw, op));
    }
    if negative {
        return Ok(None);
    }
    // Only overflow can fail here.
    let line = digits.parse::<usize>().unwrap_or(usize::MAX);
    Ok((line > 0).then_some(line))
}

fn invalid_line(raw: &str, op: JobType) -> PatchError {
    PatchError::InvalidLineNumber {
        op: op.as_str(),
        value: raw.to_string(),
    }
}

/// Insert `text` so it becomes line `after + 1`, clamping to the end.
pub fn append_line(buffer: &mut String, after: usize, text: &str) {
    let mut lines: Vec<&str> = buffer.split('\n').collect();
    let at = after.min(lines.len());
    lines.insert(at, text);
    *buffer = lines.join("\n");
}

/// Remove the 1-based `line`. Returns false when it is out of range.
pub fn delete_line(buffer: &mut String, line: usize) -> bool {
    let mut lines: Vec<&str> = buffer.split('\n').collect();
    if line == 0 || line > lines.len() {
        return false;
    }
    lines.remove(line - 1);
    *buffer = lines.join("\n");
    true
}

/// Literal global replace. Returns false when `from` does not occur.
pub fn replace_all(buffer: &mut String, from: &str, to: &str) -> bool {
    if from.is_empty() || !buffer.contains(from) {
        return false;
    }
    *buffer = buffer.replace(from, to);
    true
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn run(job: &ModifyJob, input: &str) -> (String, Result<bool, PatchError>) {
        let mut buffer = input.to_string();
        let result = job.apply(&mut buffer);
        (buffer, result)
    }

    #[test]
    fn test_append_after_line() {
        let (out, res) = run(&ModifyJob::append("a", 2, "NEW"), "1\n2\n3");
        assert_eq!(out, "1\n2\nNEW\n3");
        assert_eq!(res, Ok(true));
    }

    #[test]
    fn test_append_past_end_clamps() {
        let (out, res) = run(&ModifyJob::append("a", 42, "tail"), "1\n2\n3");
        assert_eq!(out, "1\n2\n3\ntail");
        assert!(res.is_ok());
    }

    #[test]
    fn test_append_rejects_zero_and_garbage() {
        for bad in ["0", "-1", "two", "", "1.5"] {
            let job = ModifyJob {
                file: "a".into(),
                job_type: JobType::Append,
                source: bad.into(),
                destination: "x".into(),
            };
            let (out, res) = run(&job, "1\n2");
            assert_eq!(out, "1\n2", "buffer must be untouched for {:?}", bad);
            assert!(
                matches!(res, Err(PatchError::InvalidLineNumber { op: "append", .. })),
                "expected error for {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_append_huge_line_clamps() {
        let job = ModifyJob {
            file: "a".into(),
            job_type: JobType::Append,
            source: "99999999999999999999999".into(),
            destination: "NEW".into(),
        };
        let (out, res) = run(&job, "1\n2\n3");
        assert_eq!(out, "1\n2\n3\nNEW");
        assert_eq!(res, Ok(true));
    }

    #[test]
    fn test_append_then_delete_round_trips() {
        let original = "fn main() {\n    run();\n}\n";
        let line_count = original.split('\n').count();
        for n in 1..=line_count {
            let mut buffer = original.to_string();
            ModifyJob::append("f", n, "// inserted").apply(&mut buffer).unwrap();
            ModifyJob::delete("f", n + 1).apply(&mut buffer).unwrap();
            assert_eq!(buffer, original, "round trip failed at line {}", n);
        }
    }

    #[test]
    fn test_replace_all_occurrences() {
        let (out, res) = run(&ModifyJob::replace("a", "foo", "bar"), "foo foo\nfoo");
        assert_eq!(out, "bar bar\nbar");
        assert_eq!(res, Ok(true));
    }

    #[test]
    fn test_replace_is_literal() {
        let (out, _) = run(&ModifyJob::replace("a", "a.c", "X"), "abc a.c");
        assert_eq!(out, "abc X");
    }

    #[test]
    fn test_replace_missing_source_is_noop() {
        let (out, res) = run(&ModifyJob::replace("a", "zzz", "y"), "x");
        assert_eq!(out, "x");
        assert_eq!(res, Ok(false));
    }

    #[test]
    fn test_replace_is_idempotent() {
        let job = ModifyJob::replace("a", "let x", "let mut x");
        let mut once = "let x = 1;\nlet y = 2;".to_string();
        job.apply(&mut once).unwrap();

        let mut twice = once.clone();
        // "let mut x" does not contain "let x", so the second pass is a no-op.
        assert_eq!(job.apply(&mut twice), Ok(false));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_delete_line() {
        let (out, res) = run(&ModifyJob::delete("a", 1), "1\n2\n3");
        assert_eq!(out, "2\n3");
        assert_eq!(res, Ok(true));
    }

    #[test]
    fn test_delete_out_of_range_is_noop() {
        for n in [0, 4, 100] {
            let (out, res) = run(&ModifyJob::delete("a", n), "1\n2\n3");
            assert_eq!(out, "1\n2\n3");
            assert_eq!(res, Ok(false));
        }
    }

    #[test]
    fn test_delete_negative_is_noop() {
        for n in ["-1", "-0", "-99999999999999999999999", "99999999999999999999999"] {
            let job = ModifyJob {
                file: "a".into(),
                job_type: JobType::Delete,
                source: n.into(),
                destination: String::new(),
            };
            let (out, res) = run(&job, "1\n2\n3");
            assert_eq!(out, "1\n2\n3", "buffer must be untouched for {:?}", n);
            assert_eq!(res, Ok(false), "expected no-op for {:?}", n);
        }
    }

    #[test]
    fn test_delete_garbage_line_is_error() {
        let job = ModifyJob {
            file: "a".into(),
            job_type: JobType::Delete,
            source: "third".into(),
            destination: String::new(),
        };
        let (out, res) = run(&job, "1\n2\n3");
        assert_eq!(out, "1\n2\n3");
        assert!(res.is_err());
    }

    #[test]
    fn test_job_type_wire_names() {
        let job: ModifyJob = serde_json::from_str(
            r#"{"file":"a.txt","type":"delete","source":"1"}"#,
        )
        .unwrap();
        assert_eq!(job.job_type, JobType::Delete);
        assert_eq!(job.destination, "");

        let bad = serde_json::from_str::<ModifyJob>(
            r#"{"file":"a.txt","type":"insert","source":"1","destination":""}"#,
        );
        assert!(bad.is_err());
    }
}
