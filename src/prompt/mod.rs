//! Builds the directive sent to the model.
//!
//! The template carries two placeholders: [`FILES_PLACEHOLDER`] is replaced by
//! a JSON array of `{"fileName", "data"}` objects and [`TASK_PLACEHOLDER`] by
//! the text of one task prompt picked at random.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::ConfigError;
use crate::workspace::{SourceFile, TaskPrompt};

pub const FILES_PLACEHOLDER: &str = "{{FILES}}";
pub const TASK_PLACEHOLDER: &str = "{{TASK}}";

/// A validated directive template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    raw: String,
}

impl PromptTemplate {
    /// Validate that both placeholders are present.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = raw.into();
        for placeholder in [FILES_PLACEHOLDER, TASK_PLACEHOLDER] {
            if !raw.contains(placeholder) {
                return Err(ConfigError::MissingPlaceholder { placeholder });
            }
        }
        Ok(Self { raw })
    }

    /// Substitute the files and the task into the template.
    ///
    /// Substituted text is never rescanned, so placeholder-like strings inside
    /// workspace files or task prompts stay literal.
    pub fn render(&self, files: &[SourceFile], task: &TaskPrompt) -> String {
        let files_json = format!("{:#}", files_value(files));

        let substitutions = [
            (FILES_PLACEHOLDER, files_json.as_str()),
            (TASK_PLACEHOLDER, task.text.as_str()),
        ];

        let mut out = String::with_capacity(self.raw.len() + files_json.len() + task.text.len());
        let mut rest = self.raw.as_str();
        while let Some((at, placeholder, value)) = substitutions
            .iter()
            .filter_map(|(p, v)| rest.find(p).map(|at| (at, *p, *v)))
            .min_by_key(|(at, _, _)| *at)
        {
            out.push_str(&rest[..at]);
            out.push_str(value);
            rest = &rest[at + placeholder.len()..];
        }
        out.push_str(rest);

        out
    }
}

/// JSON array of `{"fileName", "data"}` objects.
fn files_value(files: &[SourceFile]) -> serde_json::Value {
    serde_json::Value::Array(
        files
            .iter()
            .map(|f| serde_json::json!({ "fileName": f.file_name, "data": f.data }))
            .collect(),
    )
}

/// Picks a task and renders the directive.
pub struct PromptAssembler<R: Rng> {
    template: PromptTemplate,
    rng: R,
}

/// Directive plus the task that seeded it.
#[derive(Debug, Clone)]
pub struct Directive {
    pub text: String,
    pub task: TaskPrompt,
}

impl<R: Rng> PromptAssembler<R> {
    pub fn new(template: PromptTemplate, rng: R) -> Self {
        Self { template, rng }
    }

    /// Choose a task uniformly at random and render the directive.
    pub fn assemble(
        &mut self,
        files: &[SourceFile],
        tasks: &[TaskPrompt],
    ) -> Result<Directive, ConfigError> {
        let task = tasks.choose(&mut self.rng).ok_or(ConfigError::NoTasks)?;
        tracing::info!("Selected task prompt '{}'", task.name);

        let text = self.template.render(files, task);
        tracing::debug!("Directive is {} bytes", text.len());

        Ok(Directive {
            text,
            task: task.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn task(name: &str, text: &str) -> TaskPrompt {
        TaskPrompt {
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_missing_placeholder() {
        let err = PromptTemplate::parse("only {{FILES}} here").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingPlaceholder {
                placeholder: TASK_PLACEHOLDER
            }
        ));

        let err = PromptTemplate::parse("only {{TASK}} here").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingPlaceholder {
                placeholder: FILES_PLACEHOLDER
            }
        ));
    }

    #[test]
    fn test_render_substitutes_both() {
        let template = PromptTemplate::parse("Files:\n{{FILES}}\nTask: {{TASK}}").unwrap();
        let files = vec![SourceFile::new("a.txt", "1\n2")];
        let out = template.render(&files, &task("t", "fix it"));

        assert!(out.starts_with("Files:\n["));
        assert!(out.contains(r#""fileName": "a.txt""#));
        assert!(out.contains(r#""data": "1\n2""#));
        assert!(out.ends_with("Task: fix it"));
        assert!(!out.contains("{{"));
    }

    #[test]
    fn test_placeholders_inside_files_are_not_expanded() {
        let template = PromptTemplate::parse("{{TASK}}|{{FILES}}").unwrap();
        let files = vec![SourceFile::new("p.txt", "uses {{TASK}} literally")];
        let out = template.render(&files, &task("t", "DO"));

        assert!(out.starts_with("DO|"));
        assert!(out.contains("uses {{TASK}} literally"));
    }

    #[test]
    fn test_seeded_selection_is_deterministic() {
        let tasks = vec![task("a", "A"), task("b", "B"), task("c", "C"), task("d", "D")];
        let template = PromptTemplate::parse("{{FILES}}{{TASK}}").unwrap();

        let pick = |seed| {
            let mut assembler =
                PromptAssembler::new(template.clone(), StdRng::seed_from_u64(seed));
            (0..8)
                .map(|_| assembler.assemble(&[], &tasks).unwrap().task.name)
                .collect::<Vec<_>>()
        };

        assert_eq!(pick(7), pick(7));
    }

    #[test]
    fn test_selection_covers_pool() {
        let tasks = vec![task("a", "A"), task("b", "B"), task("c", "C")];
        let template = PromptTemplate::parse("{{FILES}}{{TASK}}").unwrap();
        let mut assembler = PromptAssembler::new(template, StdRng::seed_from_u64(1));

        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(assembler.assemble(&[], &tasks).unwrap().task.name);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_empty_pool_is_config_error() {
        let template = PromptTemplate::parse("{{FILES}}{{TASK}}").unwrap();
        let mut assembler = PromptAssembler::new(template, StdRng::seed_from_u64(0));
        assert!(matches!(
            assembler.assemble(&[], &[]),
            Err(ConfigError::NoTasks)
        ));
    }
}
