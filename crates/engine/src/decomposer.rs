//! Question decomposition
//!
//! Provides:
//! - The `QuestionDecomposer` boundary consumed by the engine
//! - An LLM-backed generator that routes sub-questions to tools
//! - Tolerant parsing of the model's JSON output

use crate::types::{SubQuestion, ToolMetadata};
use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use subquery_common::errors::{AppError, Result};
use subquery_common::llm::{ChatModel, ChatRequest};

/// Splits a complex query into tool-routed sub-questions
///
/// An empty result is valid. Failures are fatal for the query.
#[async_trait]
pub trait QuestionDecomposer: Send + Sync {
    async fn decompose(&self, tools: &[ToolMetadata], query: &str) -> Result<Vec<SubQuestion>>;
}

const DECOMPOSE_SYSTEM_PROMPT: &str =
    "You break complex questions into simpler sub-questions, each answerable by exactly one tool.";

/// Render the decomposition prompt in one pass, so placeholder-like text in
/// tool descriptions or the query is never substituted.
fn decompose_prompt(tools_json: &str, query: &str) -> String {
    format!(
        "\
Given a user question and a list of tools, output a list of relevant \
sub-questions in JSON that, when answered in full, are sufficient to answer \
the original question. Every sub-question must name the tool that answers it.

# Example
<Tools>
```json
[
  {{\"name\": \"uber_10k\", \"description\": \"Provides information about Uber financials for year 2021\"}},
  {{\"name\": \"lyft_10k\", \"description\": \"Provides information about Lyft financials for year 2021\"}}
]
```

<User Question>
Compare and contrast the revenue growth and EBITDA of Uber and Lyft for year 2021

<Output>
```json
{{
  \"items\": [
    {{\"sub_question\": \"What is the revenue growth of Uber\", \"tool_name\": \"uber_10k\"}},
    {{\"sub_question\": \"What is the EBITDA of Uber\", \"tool_name\": \"uber_10k\"}},
    {{\"sub_question\": \"What is the revenue growth of Lyft\", \"tool_name\": \"lyft_10k\"}},
    {{\"sub_question\": \"What is the EBITDA of Lyft\", \"tool_name\": \"lyft_10k\"}}
  ]
}}
```

# Task
<Tools>
```json
{tools_json}
```

<User Question>
{query}

<Output>
"
    )
}

static FENCED_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("fence pattern is valid")
});

#[derive(Serialize)]
struct ToolDescription<'a> {
    name: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GeneratorOutput {
    Items { items: Vec<SubQuestion> },
    List(Vec<SubQuestion>),
}

/// Decomposer backed by a chat model
pub struct LlmQuestionGenerator {
    model: Arc<dyn ChatModel>,
}

impl LlmQuestionGenerator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Render the decomposition prompt
    fn build_prompt(&self, tools: &[ToolMetadata], query: &str) -> Result<String> {
        let descriptions: Vec<ToolDescription<'_>> = tools
            .iter()
            .map(|t| ToolDescription {
                name: &t.name,
                description: &t.description,
            })
            .collect();
        let tools_json = serde_json::to_string_pretty(&descriptions)?;

        Ok(decompose_prompt(&tools_json, query))
    }
}

#[async_trait]
impl QuestionDecomposer for LlmQuestionGenerator {
    async fn decompose(&self, tools: &[ToolMetadata], query: &str) -> Result<Vec<SubQuestion>> {
        let prompt = self.build_prompt(tools, query)?;
        let request = ChatRequest::new(prompt).with_system(DECOMPOSE_SYSTEM_PROMPT);

        let output = self
            .model
            .complete(request)
            .await
            .map_err(|e| AppError::Decomposition {
                message: e.to_string(),
            })?;

        let sub_questions = parse_sub_questions(&output)?;
        tracing::debug!(
            model = self.model.model_name(),
            count = sub_questions.len(),
            "Decomposed query"
        );
        Ok(sub_questions)
    }
}

/// Parse generator output into sub-questions
///
/// Accepts a bare array or an `{"items": [...]}` object, optionally inside a
/// fenced code block and surrounded by prose.
pub fn parse_sub_questions(output: &str) -> Result<Vec<SubQuestion>> {
    let candidate = FENCED_BLOCK
        .captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(output)
        .trim();

    let json = match candidate.find(['{', '[']) {
        Some(start) => &candidate[start..],
        None => {
            return Err(AppError::Decomposition {
                message: format!("No JSON found in generator output: {}", output),
            })
        }
    };

    let parsed: GeneratorOutput =
        serde_json::from_str(json).map_err(|e| AppError::Decomposition {
            message: format!("Unparseable generator output: {}", e),
        })?;

    Ok(match parsed {
        GeneratorOutput::Items { items } => items,
        GeneratorOutput::List(items) => items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use subquery_common::llm::MockChatModel;

    fn tools() -> Vec<ToolMetadata> {
        vec![
            ToolMetadata::new("docA", "Annual report of company A"),
            ToolMetadata::new("docB", "Annual report of company B"),
        ]
    }

    #[test]
    fn test_parse_items_object_in_fence() {
        let output = "Here you go:\n```json\n{\"items\": [\
            {\"sub_question\": \"X?\", \"tool_name\": \"docA\"},\
            {\"sub_question\": \"Y?\", \"tool_name\": \"docB\"}]}\n```";

        let parsed = parse_sub_questions(output).unwrap();

        assert_eq!(
            parsed,
            vec![SubQuestion::new("docA", "X?"), SubQuestion::new("docB", "Y?")]
        );
    }

    #[test]
    fn test_parse_bare_array() {
        let output = r#"[{"sub_question": "X?", "tool_name": "docA"}]"#;
        assert_eq!(parse_sub_questions(output).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_empty_items() {
        assert!(parse_sub_questions(r#"{"items": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_is_decomposition_error() {
        let err = parse_sub_questions("I cannot help with that.").unwrap_err();
        assert!(matches!(err, AppError::Decomposition { .. }));

        let err = parse_sub_questions(r#"{"questions": 3}"#).unwrap_err();
        assert!(matches!(err, AppError::Decomposition { .. }));
    }

    #[test]
    fn test_prompt_lists_tools_in_order() {
        let generator = LlmQuestionGenerator::new(Arc::new(MockChatModel::new("[]")));

        let prompt = generator.build_prompt(&tools(), "Compare A and B").unwrap();

        let a = prompt.rfind("\"docA\"").unwrap();
        let b = prompt.rfind("\"docB\"").unwrap();
        assert!(a < b);
        assert!(prompt.trim_end().ends_with("Compare A and B\n\n<Output>"));
    }

    #[test]
    fn test_placeholder_text_is_not_substituted() {
        let generator = LlmQuestionGenerator::new(Arc::new(MockChatModel::new("[]")));
        let tools = vec![ToolMetadata::new("docA", "Echoes {query} back verbatim")];

        let prompt = generator.build_prompt(&tools, "What is {tools_json}?").unwrap();

        assert!(prompt.contains("Echoes {query} back verbatim"));
        assert!(prompt.contains("What is {tools_json}?"));
        assert_eq!(prompt.matches("What is {tools_json}?").count(), 1);
    }

    #[test]
    fn test_generator_uses_model_output() {
        let model = Arc::new(
            MockChatModel::new("[]")
                .with_reply(r#"{"items": [{"sub_question": "X?", "tool_name": "docA"}]}"#),
        );
        let generator = LlmQuestionGenerator::new(model.clone());

        let sub_questions =
            tokio_test::block_on(generator.decompose(&tools(), "Compare A and B")).unwrap();

        assert_eq!(sub_questions, vec![SubQuestion::new("docA", "X?")]);
        assert_eq!(model.prompts().len(), 1);
    }
}
