use std::path::PathBuf;

use thiserror::Error;

use crate::browser::locator::LogicalTarget;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Could not resolve {target}{}", describe_capture(.diagnostic))]
    Resolution {
        target: LogicalTarget,
        diagnostic: Option<PathBuf>,
    },

    #[error("Decision parse error: {0}")]
    DecisionParse(String),

    #[error("Page did not advance from {from} within {waited_ms}ms{}", describe_capture(.diagnostic))]
    TransitionTimeout {
        from: String,
        waited_ms: u64,
        diagnostic: Option<PathBuf>,
    },

    #[error("Provider '{provider}' invocation failed: {message}")]
    ProviderInvocation { provider: String, message: String },

    #[error("Source re-served {revisits} already visited profiles in a row")]
    Stalled { revisits: u32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

impl ScoutError {
    /// Errors that end the run instead of being recovered inside the loop.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ScoutError::DecisionParse(_) | ScoutError::ProviderInvocation { .. }
        )
    }

    /// Path of the diagnostic page capture written before this error surfaced, if any.
    pub fn diagnostic(&self) -> Option<&PathBuf> {
        match self {
            ScoutError::Resolution { diagnostic, .. }
            | ScoutError::TransitionTimeout { diagnostic, .. } => diagnostic.as_ref(),
            _ => None,
        }
    }
}

fn describe_capture(diagnostic: &Option<PathBuf>) -> String {
    match diagnostic {
        Some(path) => format!(" (page captured to {})", path.display()),
        None => String::new(),
    }
}

impl From<fantoccini::error::CmdError> for ScoutError {
    fn from(e: fantoccini::error::CmdError) -> Self {
        ScoutError::Browser(e.to_string())
    }
}

pub type ScoutResult<T> = Result<T, ScoutError>;
