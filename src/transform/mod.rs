//! Turns an author's manual function into the program text the interpreter
//! runs.
//!
//! The pipeline is: rewrite annotation comments into `view(...)`/`step(...)`
//! calls, extract the function body, wrap it in the harness, beautify. The
//! same annotation rewrite and beautifier produce the display text, so both
//! texts carry their breakpoint calls on corresponding lines.

mod annotation;
mod beautify;
mod extract;
mod harness;

use thiserror::Error;
use tracing::{debug, warn};

use crate::session::config::ManualConfig;

pub use annotation::{parse_payload, render_call, rewrite_annotations, rewrite_line, Annotation};
pub use beautify::beautify;
pub use extract::extract_body;
pub use harness::{wrap, HARNESS_FUNCTION, RESULT_VARIABLE, VALUES_BINDING};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("The configuration does not define a manual function")]
    MissingFunction,
    #[error("Could not find the opening brace of the manual function body")]
    MissingOpeningBrace,
    #[error("Could not find the closing brace of the manual function body")]
    MissingClosingBrace,
    #[error("The parameter list of the manual function is not closed")]
    UnbalancedParameters,
}

/// Outcome of a transform: the `{ code, error, isLoading }` triple as a sum
/// type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    /// No configuration yet.
    Loading,
    Ready { code: String },
    Failed { error: String },
}

impl Transformed {
    pub fn code(&self) -> Option<&str> {
        match self {
            Transformed::Ready { code } => Some(code),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Transformed::Failed { error } => Some(error),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Transformed::Loading)
    }
}

pub struct SourceTransformer;

impl SourceTransformer {
    pub fn transform(config: Option<&ManualConfig>) -> Transformed {
        let config = match config {
            Some(config) => config,
            None => return Transformed::Loading,
        };
        match Self::program_text(config) {
            Ok(code) => {
                debug!("transformed manual function into {} bytes of program text", code.len());
                Transformed::Ready { code }
            }
            Err(e) => {
                warn!("source transform failed: {}", e);
                Transformed::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    pub fn program_text(config: &ManualConfig) -> Result<String, TransformError> {
        let source = config
            .manual_function
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or(TransformError::MissingFunction)?;
        let rewritten = rewrite_annotations(source);
        let body = extract_body(&rewritten)?;
        Ok(beautify(&wrap(body)))
    }

    /// The author-facing function with annotations rewritten, formatted like
    /// the program text.
    pub fn display_text(source: &str) -> String {
        beautify(&rewrite_annotations(source))
    }
}
