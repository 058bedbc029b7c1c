//! Error taxonomy shared by every crate in the workspace.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Lifecycle state a transform had reached when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Created,
    Initialized,
    Computed,
    HeaderFinalized,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Initialized => write!(f, "initialized"),
            Self::Computed => write!(f, "computed"),
            Self::HeaderFinalized => write!(f, "header-finalized"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipeError {
    /// Malformed or truncated binary input.
    #[error("decode error: {reason}")]
    Decode {
        reason: String,
        #[source]
        source: Option<io::Error>,
    },

    /// Header name/axis combination that does not resolve to a declared slot.
    #[error("unknown header parameter '{name}'")]
    UnknownField { name: String },

    /// Value kind or element width not accepted by the format.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("file {} already exists (overwrite not requested)", path.display())]
    FileExists { path: PathBuf },

    /// Failure inside one transform, with the state it had reached.
    #[error("{name} failed in state {stage}")]
    Transform {
        name: &'static str,
        stage: Stage,
        #[source]
        source: Box<PipeError>,
    },

    /// Unsupported dimensionality or an axis out of bounds.
    #[error("shape error: {0}")]
    Shape(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PipeError {
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn decode_io(reason: impl Into<String>, source: io::Error) -> Self {
        Self::Decode {
            reason: reason.into(),
            source: Some(source),
        }
    }

    pub fn unknown_field(name: impl Into<String>) -> Self {
        Self::UnknownField { name: name.into() }
    }

    /// Walk `Transform` wrappers down to the originating error.
    pub fn root_cause(&self) -> &PipeError {
        match self {
            Self::Transform { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipeError>;
