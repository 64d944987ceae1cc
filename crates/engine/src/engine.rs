//! Sub-question query engine
//!
//! Answers a complex query in four steps:
//! 1. decompose it into tool-routed sub-questions
//! 2. fan the sub-questions out to their tools
//! 3. turn the surviving answers into evidence records
//! 4. synthesize the final response from the evidence
//!
//! `query` is the async entry point and always fans out concurrently.
//! `query_blocking` drives the same pipeline on a private current-thread
//! runtime, scheduling sub-questions per `EngineConfig::concurrency`.

use crate::callbacks::{
    CallbackEventType, CallbackHandler, CallbackManager, EventPayload, LoggingCallbackHandler,
};
use crate::coordinator::FanoutCoordinator;
use crate::decomposer::{LlmQuestionGenerator, QuestionDecomposer};
use crate::evidence::build_evidence;
use crate::executor::SubQuestionExecutor;
use crate::registry::ToolRegistry;
use crate::synthesizer::{LlmSynthesizer, ResponseSynthesizer, SynthesisOptions};
use crate::tools::{HttpQueryEngine, QueryEngine, QueryEngineTool};
use crate::trace::TracePrinter;
use crate::types::{Response, ToolMetadata};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use subquery_common::config::{AppConfig, ConcurrencyMode, EngineConfig};
use subquery_common::errors::{AppError, Result};
use subquery_common::llm::ChatModel;
use subquery_common::metrics;

/// Decompose, fan out, synthesize
pub struct SubQuestionQueryEngine {
    question_gen: Arc<dyn QuestionDecomposer>,
    response_synthesizer: Arc<dyn ResponseSynthesizer>,
    registry: Arc<ToolRegistry>,
    coordinator: FanoutCoordinator,
    callbacks: Arc<CallbackManager>,
    printer: TracePrinter,
    config: EngineConfig,
}

impl SubQuestionQueryEngine {
    /// Build an engine over an ordered tool list
    ///
    /// Fails with `DuplicateTool` if two tools share a name.
    pub fn new(
        question_gen: Arc<dyn QuestionDecomposer>,
        response_synthesizer: Arc<dyn ResponseSynthesizer>,
        tools: Vec<QueryEngineTool>,
        config: EngineConfig,
    ) -> Result<Self> {
        let registry = Arc::new(ToolRegistry::new(tools)?);
        let callbacks = Arc::new(CallbackManager::default());
        let coordinator = Self::coordinator(&registry, &callbacks, config.verbose);

        Ok(Self {
            question_gen,
            response_synthesizer,
            registry,
            coordinator,
            callbacks,
            printer: TracePrinter::new(config.verbose),
            config,
        })
    }

    /// Build the LLM-backed engine described by `config`
    ///
    /// Decomposition and synthesis share `model`; every configured tool
    /// becomes a remote `HttpQueryEngine`.
    pub fn from_config(config: &AppConfig, model: Arc<dyn ChatModel>) -> Result<Self> {
        let tools = config
            .tools
            .iter()
            .map(|tool| {
                let engine = HttpQueryEngine::from_config(tool)?;
                Ok(QueryEngineTool::from_defaults(
                    Arc::new(engine),
                    tool.name.clone(),
                    tool.description.clone(),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let synthesizer = LlmSynthesizer::with_options(
            Arc::clone(&model),
            SynthesisOptions {
                max_tokens: Some(config.llm.max_tokens),
                temperature: Some(config.llm.temperature),
                ..SynthesisOptions::default()
            },
        );

        let engine = Self::new(
            Arc::new(LlmQuestionGenerator::new(model)),
            Arc::new(synthesizer),
            tools,
            config.engine.clone(),
        )?;

        tracing::info!(
            tools = engine.registry.len(),
            concurrency = config.engine.concurrency.as_str(),
            verbose = config.engine.verbose,
            "Sub-question engine ready"
        );

        let handlers: Vec<Arc<dyn CallbackHandler>> = vec![Arc::new(LoggingCallbackHandler)];
        Ok(engine.with_callback_manager(CallbackManager::new(handlers)))
    }

    /// Replace the callback manager
    pub fn with_callback_manager(mut self, callbacks: CallbackManager) -> Self {
        self.callbacks = Arc::new(callbacks);
        self.coordinator = Self::coordinator(&self.registry, &self.callbacks, self.config.verbose);
        self
    }

    fn coordinator(
        registry: &Arc<ToolRegistry>,
        callbacks: &Arc<CallbackManager>,
        verbose: bool,
    ) -> FanoutCoordinator {
        FanoutCoordinator::new(
            Arc::new(SubQuestionExecutor::new(Arc::clone(registry), verbose)),
            Arc::clone(callbacks),
        )
    }

    /// Metadata of the registered tools, in construction order
    pub fn tools(&self) -> &[ToolMetadata] {
        self.registry.all_metadata()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Answer `query`, fanning sub-questions out concurrently
    pub async fn query(&self, query: &str) -> Result<Response> {
        self.run(query, ConcurrencyMode::Concurrent).await
    }

    /// Answer `query` from synchronous code
    ///
    /// The pipeline runs on a private current-thread runtime. When the
    /// calling thread is already inside a runtime context (for example a
    /// `spawn_blocking` thread), that runtime is driven on a scoped OS thread.
    pub fn query_blocking(&self, query: &str) -> Result<Response> {
        let mode = self.config.concurrency;
        let drive = || -> Result<Response> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(self.run(query, mode))
        };

        if tokio::runtime::Handle::try_current().is_err() {
            return drive();
        }

        // Runtimes cannot be nested on one thread
        std::thread::scope(|scope| match scope.spawn(drive).join() {
            Ok(result) => result,
            Err(_) => Err(AppError::Internal {
                message: "Blocking query thread panicked".to_string(),
            }),
        })
    }

    async fn run(&self, query: &str, mode: ConcurrencyMode) -> Result<Response> {
        let start = Instant::now();
        let result = self.execute(query, mode).await;
        let elapsed = start.elapsed();

        match &result {
            Ok((_, evidence_count)) => {
                metrics::record_query(elapsed.as_secs_f64(), mode.as_str(), *evidence_count, true);
                tracing::info!(
                    mode = mode.as_str(),
                    evidence = evidence_count,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Query answered"
                );
            }
            Err(err) => {
                metrics::record_query(elapsed.as_secs_f64(), mode.as_str(), 0, false);
                tracing::error!(mode = mode.as_str(), error = %err, "Query failed");
            }
        }

        result.map(|(response, _)| response)
    }

    async fn execute(&self, query: &str, mode: ConcurrencyMode) -> Result<(Response, usize)> {
        let event_id = self.callbacks.on_event_start(
            CallbackEventType::Query,
            EventPayload::Query {
                query: query.to_string(),
            },
        );

        let sub_questions = self
            .question_gen
            .decompose(self.registry.all_metadata(), query)
            .await?;
        self.printer.generated(sub_questions.len());

        let pairs = self.coordinator.run(&sub_questions, mode).await?;
        let evidence = build_evidence(&pairs);
        let evidence_count = evidence.len();

        let response = self.response_synthesizer.synthesize(query, evidence).await?;

        self.callbacks.on_event_end(
            CallbackEventType::Query,
            EventPayload::Response {
                response: response.response.clone(),
            },
            event_id,
        );

        Ok((response, evidence_count))
    }
}

#[async_trait]
impl QueryEngine for SubQuestionQueryEngine {
    async fn query(&self, query: &str) -> Result<Response> {
        SubQuestionQueryEngine::query(self, query).await
    }
}

impl std::fmt::Debug for SubQuestionQueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubQuestionQueryEngine")
            .field("registry", &self.registry)
            .field("callbacks", &self.callbacks)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
