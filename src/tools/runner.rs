//! Concurrent tool dispatch
//!
//! Fans the registered validation tools out over the extraction output, one
//! spawned task per tool, and collects whichever complete. Best-effort only:
//! a failed or panicked tool is logged and its slot in the report falls back
//! to the original output plus the null record. No ordering, no retries, no
//! timeout — the validators bound their own network calls.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::{GeoRecord, TaxonomyRecord, ToolKind, ToolOutcome, ToolRecord, ValidationTool};

/// Dispatches registered validation tools concurrently.
#[derive(Default)]
pub struct ToolRunner {
    tools: Vec<Arc<dyn ValidationTool>>,
}

impl ToolRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Registering a second tool of the same kind replaces
    /// nothing; the later outcome wins in the report.
    pub fn register(&mut self, tool: Arc<dyn ValidationTool>) -> &mut Self {
        self.tools.push(tool);
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_tool(mut self, tool: Arc<dyn ValidationTool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Run every registered tool against `output` and wait for all of them.
    pub async fn run(&self, output: &Value) -> ToolReport {
        let shared = Arc::new(output.clone());

        let handles: Vec<_> = self
            .tools
            .iter()
            .map(|tool| {
                let tool = Arc::clone(tool);
                let output = Arc::clone(&shared);
                let kind = tool.kind();
                (kind, tokio::spawn(async move { tool.validate(&output).await }))
            })
            .collect();

        let mut outcomes = HashMap::new();
        for (kind, handle) in handles {
            match handle.await {
                Ok(Ok(outcome)) => {
                    debug!(tool = %kind, "validation tool completed");
                    outcomes.insert(kind, outcome);
                }
                Ok(Err(err)) => {
                    warn!(tool = %kind, error = %err, "validation tool failed");
                }
                Err(err) => {
                    warn!(tool = %kind, error = %err, "validation tool task aborted");
                }
            }
        }

        ToolReport {
            original: output.clone(),
            outcomes,
        }
    }
}

impl std::fmt::Debug for ToolRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<&str> = self.tools.iter().map(|t| t.kind().as_str()).collect();
        f.debug_struct("ToolRunner").field("tools", &kinds).finish()
    }
}

/// Collected outcomes of one dispatch, keyed by tool kind.
///
/// Accessors hand out defaults for anything that failed or never ran, so the
/// caller always gets a usable `(output, record)` pair.
#[derive(Debug, Clone)]
pub struct ToolReport {
    original: Value,
    outcomes: HashMap<ToolKind, ToolOutcome>,
}

impl ToolReport {
    /// Taxonomy result: the tool's rewritten output and record, or the
    /// original output with the null record.
    pub fn taxonomy(&self) -> (Value, TaxonomyRecord) {
        match self.outcomes.get(&ToolKind::Taxonomy) {
            Some(ToolOutcome {
                output,
                record: ToolRecord::Taxonomy(record),
            }) => (output.clone(), record.clone()),
            _ => (self.original.clone(), TaxonomyRecord::null()),
        }
    }

    /// Geolocation result: the tool's rewritten output and record, or the
    /// original output with the null record.
    pub fn geolocation(&self) -> (Value, GeoRecord) {
        match self.outcomes.get(&ToolKind::Geolocation) {
            Some(ToolOutcome {
                output,
                record: ToolRecord::Geolocation(record),
            }) => (output.clone(), record.clone()),
            _ => (self.original.clone(), GeoRecord::null()),
        }
    }

    /// Raw outcome for a kind, if that tool completed.
    pub fn outcome(&self, kind: ToolKind) -> Option<&ToolOutcome> {
        self.outcomes.get(&kind)
    }

    /// Number of tools that completed successfully.
    pub fn completed(&self) -> usize {
        self.outcomes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::MockTool;
    use serde_json::json;

    fn output() -> Value {
        json!({
            "scientificName": "Quercus alba",
            "verbatimCoordinates": "42.28 N, 83.74 W",
        })
    }

    #[tokio::test]
    async fn run_collects_outcomes_by_kind() {
        let runner = ToolRunner::new()
            .with_tool(Arc::new(MockTool::new(ToolKind::Taxonomy)))
            .with_tool(Arc::new(MockTool::new(ToolKind::Geolocation)))
            .with_tool(Arc::new(MockTool::new(ToolKind::Wikipedia)));

        let report = runner.run(&output()).await;

        assert_eq!(report.completed(), 3);
        assert!(report.outcome(ToolKind::Taxonomy).is_some());
        assert!(report.outcome(ToolKind::Wikipedia).is_some());
    }

    #[tokio::test]
    async fn register_adds_tools_in_place() {
        let mut runner = ToolRunner::new();
        runner
            .register(Arc::new(MockTool::new(ToolKind::Taxonomy)))
            .register(Arc::new(MockTool::new(ToolKind::Geolocation)));

        let report = runner.run(&output()).await;
        assert_eq!(report.completed(), 2);
    }

    #[tokio::test]
    async fn failed_tool_falls_back_to_defaults() {
        let runner = ToolRunner::new()
            .with_tool(Arc::new(MockTool::new(ToolKind::Taxonomy)))
            .with_tool(Arc::new(MockTool::failing(
                ToolKind::Geolocation,
                "geocoder unreachable",
            )));

        let report = runner.run(&output()).await;

        assert_eq!(report.completed(), 1);

        let (geo_output, geo_record) = report.geolocation();
        assert_eq!(geo_output, output());
        assert_eq!(geo_record, GeoRecord::null());

        // The surviving tool still reports normally
        let (tax_output, tax_record) = report.taxonomy();
        assert_eq!(tax_output, output());
        assert_eq!(tax_record, TaxonomyRecord::null());
    }

    #[tokio::test]
    async fn unregistered_tools_default() {
        let runner = ToolRunner::new();

        let report = runner.run(&output()).await;

        assert_eq!(report.completed(), 0);
        let (tax_output, tax_record) = report.taxonomy();
        assert_eq!(tax_output, output());
        assert_eq!(tax_record, TaxonomyRecord::null());
    }

    #[tokio::test]
    async fn rewritten_output_is_reported() {
        let rewritten = json!({"scientificName": "Quercus alba L."});
        let tool = MockTool::with_outcomes(
            ToolKind::Taxonomy,
            vec![ToolOutcome {
                output: rewritten.clone(),
                record: ToolRecord::Taxonomy(TaxonomyRecord {
                    exact_match: true,
                    best_match: "Quercus alba L.".to_string(),
                    ..TaxonomyRecord::null()
                }),
            }],
        );

        let runner = ToolRunner::new().with_tool(Arc::new(tool));
        let report = runner.run(&output()).await;

        let (tax_output, tax_record) = report.taxonomy();
        assert_eq!(tax_output, rewritten);
        assert!(tax_record.exact_match);
        assert_eq!(tax_record.best_match, "Quercus alba L.");
    }

    #[tokio::test]
    async fn every_tool_sees_the_same_output() {
        let taxonomy = Arc::new(MockTool::new(ToolKind::Taxonomy));
        let geo = Arc::new(MockTool::new(ToolKind::Geolocation));

        let runner = ToolRunner::new()
            .with_tool(Arc::clone(&taxonomy) as Arc<dyn ValidationTool>)
            .with_tool(Arc::clone(&geo) as Arc<dyn ValidationTool>);

        runner.run(&output()).await;

        assert_eq!(taxonomy.last_call(), Some(output()));
        assert_eq!(geo.last_call(), Some(output()));
    }
}
