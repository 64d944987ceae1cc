//! Remote query engine reached over HTTP
//!
//! Protocol: `POST {endpoint}` with `{"query": "..."}`; a successful reply is
//! `{"response": "..."}`. A non-success status means the remote engine could
//! not answer; transport failures are fatal.

use super::QueryEngine;
use crate::types::Response;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use subquery_common::config::ToolConfig;
use subquery_common::errors::{AppError, Result};

#[derive(Serialize)]
struct RemoteQuery<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct RemoteAnswer {
    response: String,
}

/// Query engine backed by a remote HTTP service
pub struct HttpQueryEngine {
    name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpQueryEngine {
    /// Create a new remote engine
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into(),
            client,
        })
    }

    /// Create a remote engine from its tool configuration
    pub fn from_config(config: &ToolConfig) -> Result<Self> {
        Self::new(
            config.name.clone(),
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl QueryEngine for HttpQueryEngine {
    async fn query(&self, query: &str) -> Result<Response> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&RemoteQuery { query })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ToolCannotAnswer {
                tool: self.name.clone(),
                message: format!("remote engine returned {}: {}", status, body),
            });
        }

        let answer: RemoteAnswer = response.json().await?;
        Ok(Response::new(answer.response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn_remote() -> String {
        async fn answer(Json(body): Json<Value>) -> Json<Value> {
            let query = body["query"].as_str().unwrap_or_default();
            Json(json!({ "response": format!("answer to {}", query) }))
        }

        async fn refuse() -> (StatusCode, &'static str) {
            (StatusCode::UNPROCESSABLE_ENTITY, "no matching documents")
        }

        let app = Router::new()
            .route("/answer", post(answer))
            .route("/refuse", post(refuse));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_successful_remote_answer() {
        let base = spawn_remote().await;
        let engine =
            HttpQueryEngine::new("docA", format!("{}/answer", base), Duration::from_secs(5)).unwrap();

        let response = engine.query("X?").await.unwrap();

        assert_eq!(response.to_string(), "answer to X?");
    }

    #[tokio::test]
    async fn test_error_status_is_cannot_answer() {
        let base = spawn_remote().await;
        let engine =
            HttpQueryEngine::new("docA", format!("{}/refuse", base), Duration::from_secs(5)).unwrap();

        let err = engine.query("X?").await.unwrap_err();

        assert!(err.is_recoverable());
        assert!(err.to_string().contains("no matching documents"));
    }

    #[tokio::test]
    async fn test_unreachable_engine_is_fatal() {
        // Bind then drop to obtain a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let engine =
            HttpQueryEngine::new("docA", format!("http://{}/answer", addr), Duration::from_secs(2))
                .unwrap();

        let err = engine.query("X?").await.unwrap_err();

        assert!(!err.is_recoverable());
    }
}
