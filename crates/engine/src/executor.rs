//! Sub-question execution
//!
//! Runs one sub-question against its tool and classifies the result. A
//! recoverable failure (unknown tool, tool could not answer) drops the
//! sub-question without affecting its siblings; anything else is fatal for
//! the whole query.

use crate::registry::ToolRegistry;
use crate::trace::{TraceLabel, TracePrinter};
use crate::types::{SubQuestion, SubQuestionAnswerPair};
use std::sync::Arc;
use std::time::Instant;
use subquery_common::errors::{AppError, Result};
use subquery_common::metrics::{self, SubQuestionStatus};

/// Classified result of one sub-question
#[derive(Debug)]
pub enum SubQuestionOutcome {
    /// The tool produced an answer
    Answered(SubQuestionAnswerPair),
    /// The sub-question is dropped; siblings continue
    Recoverable { reason: String },
    /// The whole query must fail
    Fatal(AppError),
}

/// Executes sub-questions against the tool registry
pub struct SubQuestionExecutor {
    registry: Arc<ToolRegistry>,
    printer: TracePrinter,
}

impl SubQuestionExecutor {
    pub fn new(registry: Arc<ToolRegistry>, verbose: bool) -> Self {
        Self {
            registry,
            printer: TracePrinter::new(verbose),
        }
    }

    /// Execute one sub-question
    pub async fn execute(&self, sub_q: &SubQuestion, label: TraceLabel) -> SubQuestionOutcome {
        let start = Instant::now();

        match self.answer(sub_q, label).await {
            Ok(answer) => {
                metrics::record_sub_question(
                    start.elapsed().as_secs_f64(),
                    &sub_q.tool_name,
                    SubQuestionStatus::Answered,
                );
                tracing::debug!(
                    index = label.index(),
                    tool = %sub_q.tool_name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Sub-question answered"
                );
                SubQuestionOutcome::Answered(SubQuestionAnswerPair::answered(sub_q.clone(), answer))
            }
            Err(err) if err.is_recoverable() => {
                metrics::record_sub_question(0.0, &sub_q.tool_name, SubQuestionStatus::Dropped);
                tracing::warn!(
                    index = label.index(),
                    tool = %sub_q.tool_name,
                    sub_question = %sub_q.sub_question,
                    error = %err,
                    "Failed to run sub-question, dropping it"
                );
                SubQuestionOutcome::Recoverable {
                    reason: err.to_string(),
                }
            }
            Err(err) => {
                metrics::record_sub_question(0.0, &sub_q.tool_name, SubQuestionStatus::Failed);
                tracing::error!(
                    index = label.index(),
                    tool = %sub_q.tool_name,
                    sub_question = %sub_q.sub_question,
                    error = %err,
                    "Sub-question failed fatally"
                );
                SubQuestionOutcome::Fatal(err)
            }
        }
    }

    async fn answer(&self, sub_q: &SubQuestion, label: TraceLabel) -> Result<String> {
        let engine = self
            .registry
            .resolve(&sub_q.tool_name)
            .ok_or_else(|| AppError::ToolNotFound {
                name: sub_q.tool_name.clone(),
            })?;

        self.printer
            .question(label, &sub_q.tool_name, &sub_q.sub_question);

        let response = engine.query(&sub_q.sub_question).await?;
        let answer = response.to_string();

        self.printer.answer(label, &sub_q.tool_name, &answer);
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tool, FailingEngine, StaticEngine};

    fn executor() -> SubQuestionExecutor {
        let registry = ToolRegistry::new(vec![
            tool("docA", StaticEngine::new("alpha")),
            tool("refuses", FailingEngine::cannot_answer()),
            tool("broken", FailingEngine::fatal()),
        ])
        .unwrap();
        SubQuestionExecutor::new(Arc::new(registry), true)
    }

    #[tokio::test]
    async fn test_answer_is_stringified_response() {
        let outcome = executor()
            .execute(&SubQuestion::new("docA", "X?"), TraceLabel::new(0))
            .await;

        match outcome {
            SubQuestionOutcome::Answered(pair) => {
                assert_eq!(pair, SubQuestionAnswerPair::answered(SubQuestion::new("docA", "X?"), "alpha"));
            }
            other => panic!("expected answer, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_recoverable() {
        let outcome = executor()
            .execute(&SubQuestion::new("docC", "Z?"), TraceLabel::new(2))
            .await;

        match outcome {
            SubQuestionOutcome::Recoverable { reason } => assert!(reason.contains("docC")),
            other => panic!("expected recoverable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cannot_answer_is_recoverable() {
        let outcome = executor()
            .execute(&SubQuestion::new("refuses", "Y?"), TraceLabel::new(1))
            .await;

        assert!(matches!(outcome, SubQuestionOutcome::Recoverable { .. }));
    }

    #[tokio::test]
    async fn test_other_errors_are_fatal() {
        let outcome = executor()
            .execute(&SubQuestion::new("broken", "Y?"), TraceLabel::new(1))
            .await;

        assert!(matches!(outcome, SubQuestionOutcome::Fatal(AppError::Internal { .. })));
    }
}
