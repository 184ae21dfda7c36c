//! Loads the mutable source tree and the task prompt pool.
//!
//! Either everything loads or the run aborts: downstream patches assume a
//! complete, consistent file set.

use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use tokio::fs;

use crate::error::WorkspaceError;

/// A workspace file held in memory for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the workspace root, `/`-separated.
    pub file_name: String,
    pub data: String,
}

impl SourceFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

/// One directive fragment from the task pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPrompt {
    /// File the prompt was read from, for logging.
    pub name: String,
    pub text: String,
}

/// Reads the workspace tree and the task pool.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceLoader {
    ignore: Vec<String>,
}

impl WorkspaceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip any directory or file whose name matches one of `names`.
    pub fn with_ignore(mut self, names: Vec<String>) -> Self {
        self.ignore = names;
        self
    }

    fn is_ignored(&self, name: &str) -> bool {
        self.ignore.iter().any(|n| n == name)
    }

    /// Recursively load every regular file under `root`, sorted by name.
    pub async fn load_workspace(&self, root: &Path) -> Result<Vec<SourceFile>, WorkspaceError> {
        let mut paths = Vec::new();
        self.walk(root, &mut paths).await?;

        let mut files = try_join_all(paths.into_iter().map(|path| async move {
            let data = read_text(&path).await?;
            Ok::<_, WorkspaceError>(SourceFile {
                file_name: relative_name(root, &path),
                data,
            })
        }))
        .await?;

        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        tracing::info!("Loaded {} workspace file(s) from {}", files.len(), root.display());
        Ok(files)
    }

    /// Load every regular file directly under `dir` as a task prompt.
    pub async fn load_tasks(&self, dir: &Path) -> Result<Vec<TaskPrompt>, WorkspaceError> {
        let mut paths = Vec::new();
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|source| read_dir_error(dir, source))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| read_dir_error(dir, source))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.is_ignored(&name) {
                continue;
            }
            let file_type = entry
                .file_type()
                .await
                .map_err(|source| read_dir_error(dir, source))?;
            if file_type.is_file() {
                paths.push(entry.path());
            }
        }

        let mut tasks = try_join_all(paths.into_iter().map(|path| async move {
            let text = read_text(&path).await?;
            Ok::<_, WorkspaceError>(TaskPrompt {
                name: relative_name(dir, &path),
                text,
            })
        }))
        .await?;

        tasks.sort_by(|a, b| a.name.cmp(&b.name));
        tracing::info!("Loaded {} task prompt(s) from {}", tasks.len(), dir.display());
        Ok(tasks)
    }

    /// Load the workspace and the task pool concurrently.
    pub async fn load_all(
        &self,
        root: &Path,
        tasks: &Path,
    ) -> Result<(Vec<SourceFile>, Vec<TaskPrompt>), WorkspaceError> {
        tokio::try_join!(self.load_workspace(root), self.load_tasks(tasks))
    }

    async fn walk(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), WorkspaceError> {
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|source| read_dir_error(dir, source))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| read_dir_error(dir, source))?
        {
            let name = entry.file_name();
            if self.is_ignored(&name.to_string_lossy()) {
                continue;
            }

            let path = entry.path();
            let file_type = entry
                .file_type()
                .await
                .map_err(|source| read_dir_error(&path, source))?;

            if file_type.is_dir() {
                Box::pin(self.walk(&path, out)).await?;
            } else if file_type.is_file() {
                out.push(path);
            }
        }

        Ok(())
    }
}

/// Read a whole file as UTF-8.
pub async fn read_text(path: &Path) -> Result<String, WorkspaceError> {
    let bytes = fs::read(path)
        .await
        .map_err(|source| WorkspaceError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
    String::from_utf8(bytes).map_err(|_| WorkspaceError::NotUtf8 {
        path: path.to_path_buf(),
    })
}

fn read_dir_error(path: &Path, source: std::io::Error) -> WorkspaceError {
    WorkspaceError::ReadDir {
        path: path.to_path_buf(),
        source,
    }
}

fn relative_name(base: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
