//! Response synthesis - Generates the final answer from evidence
//!
//! Provides:
//! - The `ResponseSynthesizer` boundary consumed by the engine
//! - An LLM-backed synthesizer with configurable answer style

use crate::evidence::Evidence;
use crate::types::Response;
use async_trait::async_trait;
use std::sync::Arc;
use subquery_common::errors::{AppError, Result};
use subquery_common::llm::{ChatModel, ChatRequest};

/// Reduces a query and its evidence to a final answer
///
/// Behaviour on empty evidence is up to the implementation.
#[async_trait]
pub trait ResponseSynthesizer: Send + Sync {
    async fn synthesize(&self, query: &str, evidence: Vec<Evidence>) -> Result<Response>;
}

/// Synthesis style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisStyle {
    /// Brief, to-the-point
    Concise,
    /// Comprehensive explanation
    Detailed,
}

/// Synthesis options
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Maximum output tokens
    pub max_tokens: Option<usize>,

    /// Temperature (0.0 - 1.0)
    pub temperature: Option<f32>,

    pub style: SynthesisStyle,

    /// System prompt override
    pub system_prompt: Option<String>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            max_tokens: None,
            temperature: None,
            style: SynthesisStyle::Detailed,
            system_prompt: None,
        }
    }
}

/// Synthesizer backed by a chat model
pub struct LlmSynthesizer {
    model: Arc<dyn ChatModel>,
    options: SynthesisOptions,
}

impl LlmSynthesizer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self::with_options(model, SynthesisOptions::default())
    }

    pub fn with_options(model: Arc<dyn ChatModel>, options: SynthesisOptions) -> Self {
        Self { model, options }
    }

    /// Build the synthesis prompt
    fn build_prompt(&self, query: &str, evidence: &[Evidence]) -> String {
        let style_instruction = match self.options.style {
            SynthesisStyle::Concise => "Provide a brief, focused answer.",
            SynthesisStyle::Detailed => "Provide a comprehensive answer with explanations.",
        };

        let mut prompt = format!(
            "Answer the question using ONLY the context information below. \
            The context consists of sub-questions and their answers. \
            If the context is insufficient, say so. Do not make up information.\n\n\
            {}\n\n\
            Context:\n",
            style_instruction
        );

        if evidence.is_empty() {
            prompt.push_str("(no sub-question answers were collected)\n");
        }
        for (i, record) in evidence.iter().enumerate() {
            prompt.push_str(&format!("\n[{}] {}\n", i + 1, record.text));
        }

        prompt.push_str(&format!("\nQuestion: {}\nAnswer:", query));
        prompt
    }
}

#[async_trait]
impl ResponseSynthesizer for LlmSynthesizer {
    async fn synthesize(&self, query: &str, evidence: Vec<Evidence>) -> Result<Response> {
        let prompt = self.build_prompt(query, &evidence);
        let system = self
            .options
            .system_prompt
            .clone()
            .unwrap_or_else(|| "You are a helpful research assistant.".to_string());

        let request = ChatRequest {
            system: Some(system),
            prompt,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };

        let answer = self
            .model
            .complete(request)
            .await
            .map_err(|e| AppError::Synthesis {
                message: e.to_string(),
            })?;

        Ok(Response::new(answer.trim()).with_sources(evidence))
    }
}
