//! Sepal - inference support utilities for specimen-label extraction pipelines

pub mod error;
pub mod monitor;
pub mod prompt;
pub mod tokens;
pub mod tools;

pub use error::{FixSuggestion, SupportError};
pub use monitor::{
    detect_gpus, CapabilityClass, GpuDevice, GpuInventory, LoadMonitor, UsageMaxima, UsageReport,
};
pub use prompt::{sanitize_prompt, sanitize_value, save_prompt};
pub use tokens::{count_tokens, Vendor};
pub use tools::{
    GeoRecord, MockTool, TaxonomyRecord, ToolKind, ToolOutcome, ToolRecord, ToolReport,
    ToolRunner, ValidationTool,
};
