//! Query handler

use crate::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use subquery_common::{
    errors::{AppError, Result},
    metrics::RequestMetrics,
};
use validator::Validate;

/// Query request
#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[validate(length(min = 1, max = 4000))]
    pub query: String,

    /// Include the sub-question evidence in the response
    #[serde(default)]
    pub verbose: bool,
}

/// Query response
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<SourceItem>>,
    pub processing_time_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct SourceItem {
    pub tool_name: String,
    pub text: String,
}

/// Answer a complex query
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();
    let request_metrics = RequestMetrics::start("POST", "/v1/query");

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("query".to_string()),
    })?;

    let result = state.engine.query(&request.query).await;
    let status = match &result {
        Ok(_) => 200,
        Err(err) => err.status_code().as_u16(),
    };
    request_metrics.finish(status);
    let answer = result?;

    let sources = request.verbose.then(|| {
        answer
            .source_nodes
            .iter()
            .map(|e| SourceItem {
                tool_name: e.tool_name.clone(),
                text: e.text.clone(),
            })
            .collect()
    });

    tracing::info!(
        query_len = request.query.len(),
        processing_time_ms = start.elapsed().as_millis() as u64,
        "Query served"
    );

    Ok(Json(QueryResponse {
        query: request.query,
        response: answer.response,
        sources,
        processing_time_ms: start.elapsed().as_millis() as u64,
    }))
}
