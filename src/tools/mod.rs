//! # Validation Tool Abstraction
//!
//! Trait and result types for the post-extraction validation tools.
//!
//! After a label is transcribed, independent validators enrich the output:
//! taxonomy resolution against World Flora Online, coordinate validation
//! through a geocoding service, and a Wikipedia lookup for the determination.
//! Their implementations live in sibling crates behind the [`ValidationTool`]
//! trait; this module owns the seam, the record types consumers read, and the
//! null defaults used when a tool fails or is not registered.
//!
//! ## Tools
//!
//! | Kind | Record | On failure |
//! |------|--------|------------|
//! | `taxonomy` | [`TaxonomyRecord`] | original output + [`TaxonomyRecord::null`] |
//! | `geolocation` | [`GeoRecord`] | original output + [`GeoRecord::null`] |
//! | `wikipedia` | none (side-effect only) | logged and omitted |

mod mock;
mod runner;

pub use mock::MockTool;
pub use runner::{ToolReport, ToolRunner};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The validation tools the runner knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Taxonomy,
    Geolocation,
    Wikipedia,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Taxonomy => "taxonomy",
            ToolKind::Geolocation => "geolocation",
            ToolKind::Wikipedia => "wikipedia",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core trait implemented by every validation tool.
///
/// Tools receive the extracted output read-only and return a possibly
/// rewritten copy plus their record. Failures are ordinary `Err`s; the runner
/// logs them and substitutes defaults, so implementations should not swallow
/// their own errors.
#[async_trait]
pub trait ValidationTool: Send + Sync {
    /// Which tool this is; determines where its outcome lands in the report.
    fn kind(&self) -> ToolKind;

    /// Validate the extraction output.
    async fn validate(&self, output: &Value) -> Result<ToolOutcome>;
}

/// What a tool hands back on success.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutcome {
    /// The extraction output, possibly rewritten by the tool (e.g. the
    /// taxonomy tool normalizes the scientific name in place).
    pub output: Value,
    /// The tool's own record, reported alongside the output.
    pub record: ToolRecord,
}

impl ToolOutcome {
    /// Outcome that leaves the output untouched and carries no record
    /// (the Wikipedia tool's shape).
    pub fn unchanged(output: &Value) -> Self {
        Self {
            output: output.clone(),
            record: ToolRecord::None,
        }
    }
}

/// Per-tool record payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRecord {
    Taxonomy(TaxonomyRecord),
    Geolocation(GeoRecord),
    /// Side-effect-only tools (Wikipedia writes its own artifact file).
    None,
}

/// Taxonomy resolution record, keyed the way downstream reporting expects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyRecord {
    #[serde(rename = "WFO_override_OCR")]
    pub override_ocr: bool,
    #[serde(rename = "WFO_exact_match")]
    pub exact_match: bool,
    #[serde(rename = "WFO_exact_match_name")]
    pub exact_match_name: String,
    #[serde(rename = "WFO_best_match")]
    pub best_match: String,
    #[serde(rename = "WFO_candidate_names")]
    pub candidate_names: Vec<String>,
    #[serde(rename = "WFO_placement")]
    pub placement: String,
}

impl TaxonomyRecord {
    /// The record reported when taxonomy validation fails or never ran.
    pub fn null() -> Self {
        Self::default()
    }
}

/// Geolocation record, keyed the way downstream reporting expects.
///
/// Coordinate fields stay strings: they are transcribed values, carried
/// verbatim whether or not they parse as numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoRecord {
    #[serde(rename = "GEO_override_OCR")]
    pub override_ocr: bool,
    #[serde(rename = "GEO_method")]
    pub method: String,
    #[serde(rename = "GEO_formatted_full_string")]
    pub formatted_full_string: String,
    #[serde(rename = "GEO_decimal_lat")]
    pub decimal_lat: String,
    #[serde(rename = "GEO_decimal_long")]
    pub decimal_long: String,
    #[serde(rename = "GEO_city")]
    pub city: String,
    #[serde(rename = "GEO_county")]
    pub county: String,
    #[serde(rename = "GEO_state")]
    pub state: String,
    #[serde(rename = "GEO_state_code")]
    pub state_code: String,
    #[serde(rename = "GEO_country")]
    pub country: String,
    #[serde(rename = "GEO_country_code")]
    pub country_code: String,
    #[serde(rename = "GEO_continent")]
    pub continent: String,
}

impl GeoRecord {
    /// The record reported when geolocation validation fails or never ran.
    pub fn null() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_kind_display() {
        assert_eq!(ToolKind::Taxonomy.to_string(), "taxonomy");
        assert_eq!(ToolKind::Geolocation.to_string(), "geolocation");
        assert_eq!(ToolKind::Wikipedia.to_string(), "wikipedia");
    }

    #[test]
    fn taxonomy_null_serializes_with_wire_keys() {
        let value = serde_json::to_value(TaxonomyRecord::null()).unwrap();
        assert_eq!(value["WFO_override_OCR"], false);
        assert_eq!(value["WFO_exact_match"], false);
        assert_eq!(value["WFO_best_match"], "");
        assert!(value["WFO_candidate_names"].as_array().unwrap().is_empty());
    }

    #[test]
    fn geo_null_serializes_with_wire_keys() {
        let value = serde_json::to_value(GeoRecord::null()).unwrap();
        assert_eq!(value["GEO_override_OCR"], false);
        assert_eq!(value["GEO_method"], "");
        assert_eq!(value["GEO_decimal_lat"], "");
        assert_eq!(value["GEO_continent"], "");
        // the full null shape downstream reporting depends on
        assert_eq!(value.as_object().unwrap().len(), 12);
    }

    #[test]
    fn unchanged_outcome_clones_output() {
        let output = serde_json::json!({"scientificName": "Quercus alba"});
        let outcome = ToolOutcome::unchanged(&output);
        assert_eq!(outcome.output, output);
        assert_eq!(outcome.record, ToolRecord::None);
    }
}
