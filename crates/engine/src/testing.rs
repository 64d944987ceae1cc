//! Instrumented collaborators for unit tests

use crate::callbacks::{CallbackEvent, CallbackHandler};
use crate::decomposer::QuestionDecomposer;
use crate::evidence::Evidence;
use crate::synthesizer::ResponseSynthesizer;
use crate::tools::{QueryEngine, QueryEngineTool};
use crate::types::{Response, SubQuestion, ToolMetadata};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use subquery_common::errors::{AppError, Result};
use tracing_subscriber::fmt::MakeWriter;

/// Wrap an engine as a tool named `name`
pub fn tool(name: &str, engine: impl QueryEngine + 'static) -> QueryEngineTool {
    QueryEngineTool::from_defaults(
        Arc::new(engine),
        name,
        format!("Answers questions about {}", name),
    )
}

#[derive(Default)]
struct EngineStats {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    completions: Mutex<Vec<Instant>>,
}

/// Engine answering every question with fixed text, after an optional delay
///
/// Clones share their statistics.
#[derive(Clone)]
pub struct StaticEngine {
    text: String,
    delay: Option<Duration>,
    stats: Arc<EngineStats>,
}

impl StaticEngine {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            delay: None,
            stats: Arc::new(EngineStats::default()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.stats.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.stats.max_in_flight.load(Ordering::SeqCst)
    }

    /// Instants at which queries finished
    pub fn completions(&self) -> Vec<Instant> {
        self.stats.completions.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryEngine for StaticEngine {
    async fn query(&self, _query: &str) -> Result<Response> {
        self.stats.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.stats.completions.lock().unwrap().push(Instant::now());
        Ok(Response::new(self.text.clone()))
    }
}

/// Engine that always fails
pub struct FailingEngine {
    recoverable: bool,
}

impl FailingEngine {
    pub fn cannot_answer() -> Self {
        Self { recoverable: true }
    }

    pub fn fatal() -> Self {
        Self { recoverable: false }
    }
}

#[async_trait]
impl QueryEngine for FailingEngine {
    async fn query(&self, query: &str) -> Result<Response> {
        if self.recoverable {
            Err(AppError::ToolCannotAnswer {
                tool: "failing".to_string(),
                message: format!("no answer for {}", query),
            })
        } else {
            Err(AppError::Internal {
                message: "engine crashed".to_string(),
            })
        }
    }
}

/// Decomposer returning a fixed list, or a fixed error
pub struct ScriptedDecomposer {
    sub_questions: Vec<SubQuestion>,
    fail: bool,
    seen_tools: Mutex<Vec<Vec<ToolMetadata>>>,
}

impl ScriptedDecomposer {
    pub fn new(sub_questions: Vec<SubQuestion>) -> Self {
        Self {
            sub_questions,
            fail: false,
            seen_tools: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    /// Tool metadata passed to each call
    pub fn seen_tools(&self) -> Vec<Vec<ToolMetadata>> {
        self.seen_tools.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuestionDecomposer for ScriptedDecomposer {
    async fn decompose(&self, tools: &[ToolMetadata], _query: &str) -> Result<Vec<SubQuestion>> {
        self.seen_tools.lock().unwrap().push(tools.to_vec());
        if self.fail {
            return Err(AppError::Decomposition {
                message: "model refused".to_string(),
            });
        }
        Ok(self.sub_questions.clone())
    }
}

/// One recorded synthesis call
#[derive(Debug, Clone)]
pub struct SynthesisCall {
    pub query: String,
    pub evidence: Vec<Evidence>,
    pub at: Instant,
}

/// Synthesizer joining evidence texts and recording every call
#[derive(Default)]
pub struct RecordingSynthesizer {
    fail: bool,
    calls: Mutex<Vec<SynthesisCall>>,
}

impl RecordingSynthesizer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<SynthesisCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseSynthesizer for RecordingSynthesizer {
    async fn synthesize(&self, query: &str, evidence: Vec<Evidence>) -> Result<Response> {
        self.calls.lock().unwrap().push(SynthesisCall {
            query: query.to_string(),
            evidence: evidence.clone(),
            at: Instant::now(),
        });
        if self.fail {
            return Err(AppError::Synthesis {
                message: "context window exceeded".to_string(),
            });
        }

        let text = evidence
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(" | ");
        Ok(Response::new(text).with_sources(evidence))
    }
}

/// Handler keeping every event it receives
#[derive(Default)]
pub struct RecordingHandler {
    starts: Mutex<Vec<CallbackEvent>>,
    ends: Mutex<Vec<CallbackEvent>>,
}

impl RecordingHandler {
    pub fn starts(&self) -> Vec<CallbackEvent> {
        self.starts.lock().unwrap().clone()
    }

    pub fn ends(&self) -> Vec<CallbackEvent> {
        self.ends.lock().unwrap().clone()
    }
}

impl CallbackHandler for RecordingHandler {
    fn on_event_start(&self, event: &CallbackEvent) {
        self.starts.lock().unwrap().push(event.clone());
    }

    fn on_event_end(&self, event: &CallbackEvent) {
        self.ends.lock().unwrap().push(event.clone());
    }
}

/// In-memory sink for a test-scoped JSON tracing subscriber
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Install a JSON subscriber writing here for the current thread
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_ansi(false)
            .with_writer(self.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Every captured event, one JSON object each
    pub fn events(&self) -> Vec<serde_json::Value> {
        let bytes = self.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
