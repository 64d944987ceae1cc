//! Observability callbacks
//!
//! The engine emits paired start/end events that share an event id:
//! - `Query` around the whole pipeline
//! - `SubQuestions` around the fan-out (all sub-questions at start, only
//!   the surviving pairs at end)
//!
//! Handlers are external telemetry hooks; nothing in the engine reads them.

use crate::types::SubQuestionAnswerPair;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Kind of traced operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackEventType {
    Query,
    SubQuestions,
}

/// Structured event payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    Query { query: String },
    Response { response: String },
    SubQuestions { sub_questions: Vec<SubQuestionAnswerPair> },
}

/// A single start or end event
#[derive(Debug, Clone, Serialize)]
pub struct CallbackEvent {
    pub event_id: Uuid,
    pub event_type: CallbackEventType,
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
}

/// Receiver of engine events
pub trait CallbackHandler: Send + Sync {
    fn on_event_start(&self, event: &CallbackEvent);

    fn on_event_end(&self, event: &CallbackEvent);
}

/// Fans events out to the registered handlers
#[derive(Clone, Default)]
pub struct CallbackManager {
    handlers: Vec<Arc<dyn CallbackHandler>>,
}

impl CallbackManager {
    pub fn new(handlers: Vec<Arc<dyn CallbackHandler>>) -> Self {
        Self { handlers }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn CallbackHandler>) {
        self.handlers.push(handler);
    }

    /// Emit a start event and return its id
    pub fn on_event_start(&self, event_type: CallbackEventType, payload: EventPayload) -> Uuid {
        let event = CallbackEvent {
            event_id: Uuid::new_v4(),
            event_type,
            payload,
            timestamp: Utc::now(),
        };
        for handler in &self.handlers {
            handler.on_event_start(&event);
        }
        event.event_id
    }

    /// Emit the end event matching `event_id`
    pub fn on_event_end(&self, event_type: CallbackEventType, payload: EventPayload, event_id: Uuid) {
        let event = CallbackEvent {
            event_id,
            event_type,
            payload,
            timestamp: Utc::now(),
        };
        for handler in &self.handlers {
            handler.on_event_end(&event);
        }
    }
}

impl std::fmt::Debug for CallbackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackManager")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Writes every event as a structured tracing record
#[derive(Debug, Default)]
pub struct LoggingCallbackHandler;

impl LoggingCallbackHandler {
    fn payload_json(event: &CallbackEvent) -> String {
        serde_json::to_string(&event.payload).unwrap_or_default()
    }
}

impl CallbackHandler for LoggingCallbackHandler {
    fn on_event_start(&self, event: &CallbackEvent) {
        tracing::info!(
            event_id = %event.event_id,
            event_type = ?event.event_type,
            payload = %Self::payload_json(event),
            "Event started"
        );
    }

    fn on_event_end(&self, event: &CallbackEvent) {
        tracing::info!(
            event_id = %event.event_id,
            event_type = ?event.event_type,
            payload = %Self::payload_json(event),
            "Event finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHandler;
    use crate::types::SubQuestion;

    #[test]
    fn test_start_and_end_share_event_id() {
        let recorder = Arc::new(RecordingHandler::default());
        let handlers: Vec<Arc<dyn CallbackHandler>> =
            vec![recorder.clone(), Arc::new(LoggingCallbackHandler)];
        let manager = CallbackManager::new(handlers);

        let id = manager.on_event_start(
            CallbackEventType::Query,
            EventPayload::Query { query: "Compare X and Y".into() },
        );
        manager.on_event_end(
            CallbackEventType::Query,
            EventPayload::Response { response: "done".into() },
            id,
        );

        let starts = recorder.starts();
        let ends = recorder.ends();
        assert_eq!(starts.len(), 1);
        assert_eq!(ends.len(), 1);
        assert_eq!(starts[0].event_id, ends[0].event_id);
        assert!(ends[0].timestamp >= starts[0].timestamp);
    }

    #[test]
    fn test_payload_serializes_with_kind_tag() {
        let payload = EventPayload::SubQuestions {
            sub_questions: vec![SubQuestionAnswerPair::pending(SubQuestion::new("docA", "X?"))],
        };

        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["kind"], "sub_questions");
        assert_eq!(value["sub_questions"][0]["sub_q"]["tool_name"], "docA");
        assert!(value["sub_questions"][0]["answer"].is_null());
    }

    #[test]
    fn test_manager_without_handlers_is_silent() {
        let manager = CallbackManager::default();
        let id = manager.on_event_start(
            CallbackEventType::SubQuestions,
            EventPayload::SubQuestions { sub_questions: vec![] },
        );
        manager.on_event_end(
            CallbackEventType::SubQuestions,
            EventPayload::SubQuestions { sub_questions: vec![] },
            id,
        );
    }
}
