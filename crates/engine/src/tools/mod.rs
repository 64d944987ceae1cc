//! Tool engines
//!
//! A tool is a named, independently queryable engine plus the metadata the
//! decomposer uses to route sub-questions to it:
//! - `QueryEngine` is the query capability every tool implements
//! - `HttpQueryEngine` forwards questions to a remote JSON endpoint

mod http;

pub use http::HttpQueryEngine;

use crate::types::{Response, ToolMetadata};
use async_trait::async_trait;
use std::sync::Arc;
use subquery_common::errors::Result;

/// Query capability of a tool
///
/// Implementations signal "could not answer" with
/// `AppError::ToolCannotAnswer`; any other error aborts the whole query.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Answer a question
    async fn query(&self, query: &str) -> Result<Response>;
}

/// A query engine together with its metadata
#[derive(Clone)]
pub struct QueryEngineTool {
    pub metadata: ToolMetadata,
    pub query_engine: Arc<dyn QueryEngine>,
}

impl QueryEngineTool {
    pub fn new(metadata: ToolMetadata, query_engine: Arc<dyn QueryEngine>) -> Self {
        Self {
            metadata,
            query_engine,
        }
    }

    /// Build a tool from a name and description
    pub fn from_defaults(
        query_engine: Arc<dyn QueryEngine>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::new(ToolMetadata::new(name, description), query_engine)
    }
}

impl std::fmt::Debug for QueryEngineTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEngineTool")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}
