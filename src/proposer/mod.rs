//! Asks the reasoning service for a set of modify-jobs.
//!
//! One request, one attempt. Anything other than a response that matches the
//! proposal shape exactly is a [`ProposalError`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ProposalError;
use crate::llm::{ChatMessage, CompletionRequest, FinishReason, LlmProvider, extract_json};
use crate::patch::ModifyJob;

const SYSTEM_PROMPT: &str = "You maintain the source code of a Discord bot. \
Respond only with a JSON object matching the provided schema. \
Line numbers in append and delete jobs are 1-based.";

/// Validated output of the change proposer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProposalResult {
    pub modify_jobs: Vec<ModifyJob>,
    pub commit_message: String,
    pub changelog: String,
}

/// A proposal plus transport details the pipeline reports on.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub result: ProposalResult,
    /// Size of the raw model response in bytes.
    pub response_size: usize,
}

/// JSON schema sent alongside the directive.
pub fn proposal_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "modifyJobs": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "file": {
                            "type": "string",
                            "description": "fileName of the workspace file to edit"
                        },
                        "type": {
                            "type": "string",
                            "enum": ["append", "replace", "delete"]
                        },
                        "source": {
                            "type": "string",
                            "description": "append/delete: 1-based line number; replace: literal text to find"
                        },
                        "destination": {
                            "type": "string",
                            "description": "append: line to insert; replace: replacement text; delete: empty"
                        }
                    },
                    "required": ["file", "type", "source", "destination"],
                    "additionalProperties": false
                }
            },
            "commitMessage": { "type": "string" },
            "changelog": { "type": "string" }
        },
        "required": ["modifyJobs", "commitMessage", "changelog"],
        "additionalProperties": false
    })
}

/// Strictly parse a model response into a [`ProposalResult`].
pub fn parse_proposal(content: &str) -> Result<ProposalResult, ProposalError> {
    if content.trim().is_empty() {
        return Err(ProposalError::EmptyResponse);
    }

    let json_str = extract_json(content).ok_or_else(|| ProposalError::SchemaMismatch {
        reason: "no JSON object in response".to_string(),
    })?;

    serde_json::from_str(json_str).map_err(|e| ProposalError::SchemaMismatch {
        reason: e.to_string(),
    })
}

/// Change proposer backed by an [`LlmProvider`].
pub struct ChangeProposer {
    llm: Arc<dyn LlmProvider>,
    max_tokens: Option<u32>,
}

impl ChangeProposer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            llm,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Send the directive and validate the answer.
    pub async fn propose(&self, directive: &str) -> Result<Proposal, ProposalError> {
        let mut request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(directive),
        ])
        .with_response_schema("proposal", proposal_schema());
        if let Some(max) = self.max_tokens {
            request = request.with_max_tokens(max);
        }

        tracing::info!(
            "Requesting proposal from {} ({} byte directive)",
            self.llm.model_name(),
            directive.len()
        );

        let response = self.llm.complete(request).await?;

        tracing::info!(
            "Proposal received: {} bytes, {} input / {} output tokens",
            response.content.len(),
            response.input_tokens,
            response.output_tokens
        );

        if response.finish_reason == FinishReason::Length {
            tracing::warn!("Model hit the token limit; response is likely truncated");
        }

        let result = parse_proposal(&response.content)?;
        Ok(Proposal {
            response_size: response.content.len(),
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::LlmError;
    use crate::llm::CompletionResponse;
    use crate::patch::JobType;

    struct CannedLlm(Result<String, ()>);

    #[async_trait]
    impl LlmProvider for CannedLlm {
        fn model_name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            assert!(req.response_schema.is_some());
            match &self.0 {
                Ok(content) => Ok(CompletionResponse {
                    content: content.clone(),
                    finish_reason: FinishReason::Stop,
                    input_tokens: 1,
                    output_tokens: 1,
                }),
                Err(()) => Err(LlmError::RequestFailed {
                    provider: "canned".into(),
                    reason: "boom".into(),
                }),
            }
        }
    }

    #[test]
    fn test_parse_valid_proposal() {
        let raw = r#"{
            "modifyJobs": [
                {"file": "a.txt", "type": "append", "source": "2", "destination": "NEW"},
                {"file": "b.txt", "type": "replace", "source": "x", "destination": "y"}
            ],
            "commitMessage": "Tweak files",
            "changelog": "- tweaked"
        }"#;

        let result = parse_proposal(raw).unwrap();
        assert_eq!(result.modify_jobs.len(), 2);
        assert_eq!(result.modify_jobs[0].job_type, JobType::Append);
        assert_eq!(result.commit_message, "Tweak files");
    }

    #[test]
    fn test_parse_strips_code_fence() {
        let raw = "```json\n{\"modifyJobs\": [], \"commitMessage\": \"c\", \"changelog\": \"l\"}\n```";
        let result = parse_proposal(raw).unwrap();
        assert!(result.modify_jobs.is_empty());
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let raw = r#"{"modifyJobs": [{"file": "a", "type": "rename", "source": "1", "destination": ""}],
                      "commitMessage": "c", "changelog": "l"}"#;
        assert!(matches!(
            parse_proposal(raw),
            Err(ProposalError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_extra_and_missing_fields() {
        let extra = r#"{"modifyJobs": [], "commitMessage": "c", "changelog": "l", "mood": "happy"}"#;
        assert!(parse_proposal(extra).is_err());

        let missing = r#"{"modifyJobs": [], "commitMessage": "c"}"#;
        assert!(parse_proposal(missing).is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_proposal("   "),
            Err(ProposalError::EmptyResponse)
        ));
        assert!(matches!(
            parse_proposal("I could not do that."),
            Err(ProposalError::SchemaMismatch { .. })
        ));
        assert!(parse_proposal(r#"{"modifyJobs": [ {"file": "#).is_err());
    }

    #[tokio::test]
    async fn test_propose_reports_size() {
        let body = r#"{"modifyJobs": [], "commitMessage": "c", "changelog": "l"}"#;
        let proposer = ChangeProposer::new(Arc::new(CannedLlm(Ok(body.to_string()))));

        let proposal = proposer.propose("do something").await.unwrap();
        assert_eq!(proposal.response_size, body.len());
        assert_eq!(proposal.result.changelog, "l");
    }

    #[tokio::test]
    async fn test_propose_service_failure() {
        let proposer = ChangeProposer::new(Arc::new(CannedLlm(Err(()))));
        let err = proposer.propose("do something").await.unwrap_err();
        assert!(matches!(err, ProposalError::Llm(_)));
    }
}
