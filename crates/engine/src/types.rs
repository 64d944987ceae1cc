//! Core value types shared across the query pipeline

use crate::evidence::Evidence;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A piece of a complex query routed to a single tool
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubQuestion {
    /// Question text sent to the tool
    pub sub_question: String,

    /// Name of the tool meant to answer it
    pub tool_name: String,
}

impl SubQuestion {
    pub fn new(tool_name: impl Into<String>, sub_question: impl Into<String>) -> Self {
        Self {
            sub_question: sub_question.into(),
            tool_name: tool_name.into(),
        }
    }
}

/// A sub-question and, once answered, its answer
///
/// `answer` is only `None` for the batch-start payload; pairs that survive
/// the fan-out always carry an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuestionAnswerPair {
    pub sub_q: SubQuestion,
    pub answer: Option<String>,
}

impl SubQuestionAnswerPair {
    pub fn pending(sub_q: SubQuestion) -> Self {
        Self { sub_q, answer: None }
    }

    pub fn answered(sub_q: SubQuestion, answer: impl Into<String>) -> Self {
        Self {
            sub_q,
            answer: Some(answer.into()),
        }
    }
}

/// Descriptive metadata of a tool, shown to the decomposer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Unique tool name
    pub name: String,

    /// What the tool can answer questions about
    pub description: String,
}

impl ToolMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Answer produced by a query engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Response {
    /// Answer text
    pub response: String,

    /// Evidence the answer was synthesized from
    #[serde(default)]
    pub source_nodes: Vec<Evidence>,

    /// Engine-specific extras
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Response {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            ..Self::default()
        }
    }

    pub fn with_sources(mut self, source_nodes: Vec<Evidence>) -> Self {
        self.source_nodes = source_nodes;
        self
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_displays_answer_text() {
        let response = Response::new("Uber grew faster");
        assert_eq!(response.to_string(), "Uber grew faster");
    }

    #[test]
    fn test_sub_question_deserializes_from_generator_shape() {
        let sq: SubQuestion = serde_json::from_str(
            r#"{"sub_question": "What is the revenue growth of Uber", "tool_name": "uber_10k"}"#,
        )
        .unwrap();

        assert_eq!(sq, SubQuestion::new("uber_10k", "What is the revenue growth of Uber"));
    }
}
