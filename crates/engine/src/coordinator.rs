//! Sub-question fan-out
//!
//! Executes a batch of sub-questions under one of two scheduling modes and
//! returns the surviving pairs in decomposition order:
//! - Sequential: one at a time, each finished before the next starts
//! - Concurrent: one task per sub-question in a `JoinSet`, every task joined
//!   before returning
//!
//! Each task writes only its own index-addressed slot. A fatal failure
//! cancels the tasks still in flight and propagates.

use crate::callbacks::{CallbackEventType, CallbackManager, EventPayload};
use crate::executor::{SubQuestionExecutor, SubQuestionOutcome};
use crate::trace::{label_mapping, TraceLabel};
use crate::types::{SubQuestion, SubQuestionAnswerPair};
use std::sync::Arc;
use subquery_common::config::ConcurrencyMode;
use subquery_common::errors::{AppError, Result};
use tokio::task::JoinSet;

/// Orchestrates execution of a sub-question batch
pub struct FanoutCoordinator {
    executor: Arc<SubQuestionExecutor>,
    callbacks: Arc<CallbackManager>,
}

impl FanoutCoordinator {
    pub fn new(executor: Arc<SubQuestionExecutor>, callbacks: Arc<CallbackManager>) -> Self {
        Self { executor, callbacks }
    }

    /// Run every sub-question and collect the surviving pairs
    ///
    /// Returns only after every execution has answered or been dropped.
    pub async fn run(
        &self,
        sub_questions: &[SubQuestion],
        mode: ConcurrencyMode,
    ) -> Result<Vec<SubQuestionAnswerPair>> {
        let event_id = self.callbacks.on_event_start(
            CallbackEventType::SubQuestions,
            EventPayload::SubQuestions {
                sub_questions: sub_questions
                    .iter()
                    .cloned()
                    .map(SubQuestionAnswerPair::pending)
                    .collect(),
            },
        );

        let slots = match mode {
            ConcurrencyMode::Sequential => self.run_sequential(sub_questions).await?,
            ConcurrencyMode::Concurrent => self.run_concurrent(sub_questions).await?,
        };

        // Drop the sub-questions that failed
        let pairs: Vec<SubQuestionAnswerPair> = slots.into_iter().flatten().collect();

        tracing::info!(
            mode = mode.as_str(),
            total = sub_questions.len(),
            answered = pairs.len(),
            "Sub-questions complete"
        );

        self.callbacks.on_event_end(
            CallbackEventType::SubQuestions,
            EventPayload::SubQuestions {
                sub_questions: pairs.clone(),
            },
            event_id,
        );

        Ok(pairs)
    }

    async fn run_sequential(
        &self,
        sub_questions: &[SubQuestion],
    ) -> Result<Vec<Option<SubQuestionAnswerPair>>> {
        let mut slots = Vec::with_capacity(sub_questions.len());

        for (sub_q, label) in sub_questions.iter().zip(label_mapping(sub_questions.len())) {
            match self.executor.execute(sub_q, label).await {
                SubQuestionOutcome::Answered(pair) => slots.push(Some(pair)),
                SubQuestionOutcome::Recoverable { .. } => slots.push(None),
                SubQuestionOutcome::Fatal(err) => return Err(err),
            }
        }

        Ok(slots)
    }

    async fn run_concurrent(
        &self,
        sub_questions: &[SubQuestion],
    ) -> Result<Vec<Option<SubQuestionAnswerPair>>> {
        let mut slots: Vec<Option<SubQuestionAnswerPair>> = vec![None; sub_questions.len()];
        let mut join_set = JoinSet::new();

        for (index, sub_q) in sub_questions.iter().cloned().enumerate() {
            let executor = Arc::clone(&self.executor);
            join_set.spawn(async move {
                let outcome = executor.execute(&sub_q, TraceLabel::new(index)).await;
                (index, outcome)
            });
        }

        // Barrier: drain every task before returning
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, SubQuestionOutcome::Answered(pair))) => slots[index] = Some(pair),
                Ok((_, SubQuestionOutcome::Recoverable { .. })) => {}
                Ok((index, SubQuestionOutcome::Fatal(err))) => {
                    tracing::warn!(
                        index,
                        in_flight = join_set.len(),
                        "Cancelling remaining sub-questions after fatal failure"
                    );
                    join_set.abort_all();
                    return Err(err);
                }
                Err(join_err) => {
                    join_set.abort_all();
                    return Err(AppError::Internal {
                        message: format!("Sub-question task failed: {}", join_err),
                    });
                }
            }
        }

        Ok(slots)
    }
}
