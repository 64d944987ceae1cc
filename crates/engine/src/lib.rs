//! SubQuery engine
//!
//! Answers complex questions by splitting them into sub-questions, each
//! routed to a named tool engine, and synthesizing one response from the
//! collected answers.

pub mod callbacks;
pub mod coordinator;
pub mod decomposer;
pub mod engine;
pub mod evidence;
pub mod executor;
pub mod registry;
pub mod synthesizer;
pub mod tools;
pub mod trace;
pub mod types;

#[cfg(test)]
mod testing;

pub use callbacks::{CallbackEvent, CallbackHandler, CallbackManager, LoggingCallbackHandler};
pub use decomposer::{LlmQuestionGenerator, QuestionDecomposer};
pub use engine::SubQuestionQueryEngine;
pub use evidence::Evidence;
pub use synthesizer::{LlmSynthesizer, ResponseSynthesizer};
pub use tools::{HttpQueryEngine, QueryEngine, QueryEngineTool};
pub use types::{Response, SubQuestion, SubQuestionAnswerPair, ToolMetadata};
