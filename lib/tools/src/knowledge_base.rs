//! Knowledge-base lookup backed by a local JSON file.

use crate::error::ToolError;
use promptline_ai::{Field, SchemaDescriptor};
use promptline_core::Result;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Name under which the model sees this tool.
pub const NAME: &str = "search_kb";

/// File read when no path is configured.
pub const DEFAULT_PATH: &str = "knowledge_base.json";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

/// Returns the knowledge base document so the model can answer from it.
#[derive(Debug, Clone)]
pub struct KnowledgeBaseTool {
    path: PathBuf,
}

impl KnowledgeBaseTool {
    /// Creates a tool reading `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this tool reads.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parameter schema declared to the model.
    #[must_use]
    pub fn parameters() -> SchemaDescriptor {
        SchemaDescriptor::new("search_kb", "")
            .field(Field::string("query", "What to look up in the knowledge base"))
    }

    /// Reads and returns the whole knowledge base. The query is logged but
    /// the model does the matching.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidArguments`] without a `query` and
    /// [`ToolError::ExecutionFailed`] if the file is missing or not JSON.
    #[instrument(skip(self, args), fields(path = %self.path.display()))]
    pub async fn call(&self, args: &JsonValue) -> Result<JsonValue, ToolError> {
        let SearchArgs { query } =
            serde_json::from_value(args.clone()).map_err(|e| ToolError::InvalidArguments {
                name: NAME.to_string(),
                reason: e.to_string(),
            })?;
        debug!(%query, "searching knowledge base");

        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                name: NAME.to_string(),
                reason: format!("cannot read {}: {e}", self.path.display()),
            })?;

        let document = serde_json::from_str(&raw).map_err(|e| ToolError::ExecutionFailed {
            name: NAME.to_string(),
            reason: format!("{} is not valid JSON: {e}", self.path.display()),
        })?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[tokio::test]
    async fn returns_file_contents() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"records": [{{"question": "What is the return policy?", "answer": "30 days"}}]}}"#
        )
        .expect("write");

        let tool = KnowledgeBaseTool::new(file.path());
        let document = tool
            .call(&json!({"query": "return policy"}))
            .await
            .expect("lookup");
        assert_eq!(document["records"][0]["answer"], "30 days");
    }

    #[tokio::test]
    async fn missing_file_fails() {
        let dir = tempfile::tempdir().expect("temp dir");
        let tool = KnowledgeBaseTool::new(dir.path().join("absent.json"));
        let err = tool.call(&json!({"query": "x"})).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            ToolError::ExecutionFailed { .. }
        ));
    }

    #[tokio::test]
    async fn invalid_json_fails() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write");
        let err = KnowledgeBaseTool::new(file.path())
            .call(&json!({"query": "x"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }
}
