use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("no action map named '{0}'")]
    ModeNotFound(String),

    #[error("no action '{action}' in map '{mode}'")]
    ActionNotFound { mode: String, action: String },

    #[error("duplicate {what} '{name}'")]
    Duplicate { what: &'static str, name: String },

    #[error("unsupported control path '{0}'")]
    UnknownControlPath(String),

    #[error("unsupported control type '{control_type}' on action '{action}'")]
    UnsupportedControlType { action: String, control_type: String },

    #[error("invalid binding for action '{action}': {reason}")]
    InvalidBinding { action: String, reason: String },

    #[error("failed to parse input JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl InputError {
    /// Lookup failures mean the catalog and the code disagree; callers abort
    /// initialisation on these instead of running with a partial setup.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            InputError::ModeNotFound(_) | InputError::ActionNotFound { .. }
        )
    }
}
