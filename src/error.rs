//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Errors surfaced by the support utilities.
///
/// Most pipeline-facing paths degrade to defaults instead of failing (tool
/// failures are logged and replaced by null records, token-count failures
/// report zero). These variants cover the seams where the caller must know.
#[derive(Error, Debug)]
pub enum SupportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("load monitor is already running")]
    MonitorAlreadyRunning,

    #[error("load monitor is not running")]
    MonitorNotRunning,

    #[error("load monitor sampler thread panicked")]
    MonitorPanicked,
}

impl FixSuggestion for SupportError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            SupportError::Io(_) => Some("Check file path and permissions"),
            SupportError::MonitorAlreadyRunning => {
                Some("Call stop() before starting a new monitoring session")
            }
            SupportError::MonitorNotRunning => {
                Some("Call start() before stop() or stop_inference_timer()")
            }
            SupportError::MonitorPanicked => None,
        }
    }
}
