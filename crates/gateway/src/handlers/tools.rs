//! Tool listing handler

use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use subquery_engine::ToolMetadata;

#[derive(Serialize)]
pub struct ToolsResponse {
    pub total: usize,
    pub tools: Vec<ToolMetadata>,
}

/// List registered tools in the order the decomposer sees them
pub async fn list_tools(State(state): State<AppState>) -> Json<ToolsResponse> {
    let tools = state.engine.tools().to_vec();

    Json(ToolsResponse {
        total: tools.len(),
        tools,
    })
}
