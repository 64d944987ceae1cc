//! Tool registry
//!
//! Maps tool names to query engines. Built once from the ordered tool list
//! and read-only afterwards, so it is shared freely across sub-question tasks.

use crate::tools::{QueryEngine, QueryEngineTool};
use crate::types::ToolMetadata;
use std::collections::HashMap;
use std::sync::Arc;
use subquery_common::errors::{AppError, Result};

/// Immutable name -> engine mapping
pub struct ToolRegistry {
    /// Metadata in construction order
    metadatas: Vec<ToolMetadata>,

    engines: HashMap<String, Arc<dyn QueryEngine>>,
}

impl ToolRegistry {
    /// Build the registry, rejecting repeated tool names
    pub fn new(tools: Vec<QueryEngineTool>) -> Result<Self> {
        let mut metadatas = Vec::with_capacity(tools.len());
        let mut engines = HashMap::with_capacity(tools.len());

        for tool in tools {
            let name = tool.metadata.name.clone();
            if engines.insert(name.clone(), tool.query_engine).is_some() {
                return Err(AppError::DuplicateTool { name });
            }
            metadatas.push(tool.metadata);
        }

        Ok(Self { metadatas, engines })
    }

    /// Resolve a tool engine by name
    ///
    /// Unknown names yield `None`; the caller decides what a miss means.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn QueryEngine>> {
        self.engines.get(name).cloned()
    }

    /// Metadata of every tool, in construction order
    pub fn all_metadata(&self) -> &[ToolMetadata] {
        &self.metadatas
    }

    pub fn contains(&self, name: &str) -> bool {
        self.engines.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.metadatas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadatas.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.metadatas)
            .finish()
    }
}
