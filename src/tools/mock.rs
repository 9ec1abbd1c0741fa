//! Mock validation tool for testing
//!
//! Returns configurable outcomes without touching any external service.
//! Essential for unit tests and CI pipelines.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::{GeoRecord, TaxonomyRecord, ToolKind, ToolOutcome, ToolRecord, ValidationTool};

/// Mock tool that returns predefined outcomes
pub struct MockTool {
    kind: ToolKind,
    /// Queue of outcomes to return (FIFO)
    outcomes: Arc<Mutex<Vec<ToolOutcome>>>,
    /// Error message to fail with instead of producing an outcome
    failure: Option<String>,
    /// Track all outputs this tool was invoked with (for assertions)
    calls: Arc<Mutex<Vec<Value>>>,
}

impl MockTool {
    /// Create a mock that echoes the output with the kind's null record.
    pub fn new(kind: ToolKind) -> Self {
        Self {
            kind,
            outcomes: Arc::new(Mutex::new(vec![])),
            failure: None,
            calls: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Create a mock that fails every invocation.
    pub fn failing(kind: ToolKind, message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new(kind)
        }
    }

    /// Create with a queue of outcomes.
    pub fn with_outcomes(kind: ToolKind, outcomes: Vec<ToolOutcome>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes)),
            ..Self::new(kind)
        }
    }

    /// Add an outcome to the queue.
    pub fn queue_outcome(&self, outcome: ToolOutcome) {
        self.outcomes.lock().unwrap().push(outcome);
    }

    /// Get all outputs this tool was invoked with.
    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }

    /// Get the last output this tool was invoked with.
    pub fn last_call(&self) -> Option<Value> {
        self.calls.lock().unwrap().last().cloned()
    }

    /// Echo outcome: output unchanged, null record for this tool's kind.
    fn default_outcome(&self, output: &Value) -> ToolOutcome {
        let record = match self.kind {
            ToolKind::Taxonomy => ToolRecord::Taxonomy(TaxonomyRecord::null()),
            ToolKind::Geolocation => ToolRecord::Geolocation(GeoRecord::null()),
            ToolKind::Wikipedia => ToolRecord::None,
        };
        ToolOutcome {
            output: output.clone(),
            record,
        }
    }
}

#[async_trait]
impl ValidationTool for MockTool {
    fn kind(&self) -> ToolKind {
        self.kind
    }

    async fn validate(&self, output: &Value) -> Result<ToolOutcome> {
        // Record the invocation
        self.calls.lock().unwrap().push(output.clone());

        if let Some(message) = &self.failure {
            bail!("{message}");
        }

        // Outcome from queue, or the echo default
        let mut queue = self.outcomes.lock().unwrap();
        if queue.is_empty() {
            Ok(self.default_outcome(output))
        } else {
            Ok(queue.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_default_outcome() {
        let tool = MockTool::new(ToolKind::Taxonomy);
        let output = json!({"scientificName": "Acer rubrum"});

        let outcome = tool.validate(&output).await.unwrap();

        assert_eq!(outcome.output, output);
        assert_eq!(outcome.record, ToolRecord::Taxonomy(TaxonomyRecord::null()));
    }

    #[tokio::test]
    async fn test_mock_queued_outcomes() {
        let rewritten = json!({"scientificName": "Acer rubrum L."});
        let tool = MockTool::with_outcomes(
            ToolKind::Taxonomy,
            vec![ToolOutcome {
                output: rewritten.clone(),
                record: ToolRecord::Taxonomy(TaxonomyRecord {
                    exact_match: true,
                    best_match: "Acer rubrum L.".to_string(),
                    ..TaxonomyRecord::null()
                }),
            }],
        );

        let output = json!({"scientificName": "Acer rubrum"});
        let first = tool.validate(&output).await.unwrap();
        let second = tool.validate(&output).await.unwrap();

        assert_eq!(first.output, rewritten);
        // Queue drained: falls back to the echo default
        assert_eq!(second.output, output);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let tool = MockTool::failing(ToolKind::Geolocation, "geocoder quota exceeded");

        let result = tool.validate(&json!({})).await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("quota"));
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let tool = MockTool::new(ToolKind::Wikipedia);

        tool.validate(&json!({"a": 1})).await.unwrap();
        tool.validate(&json!({"b": 2})).await.unwrap();

        let calls = tool.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], json!({"a": 1}));
        assert_eq!(tool.last_call(), Some(json!({"b": 2})));
    }
}
