//! Error types for the review workflow.
//!
//! Each collaborator and component has its own error enum; [`ReviewError`]
//! unifies them for callers that drive the whole session and provides
//! user-facing messages so front ends never match on error text.

use std::path::PathBuf;

use review_model::ModelError;
use thiserror::Error;

use crate::session::Phase;

/// Failure of the extraction collaborator.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot extract a table from {file_name} ({mime_type})")]
    Unsupported {
        file_name: String,
        mime_type: String,
    },

    #[error("extraction returned data in an unexpected format: {reason}")]
    Malformed { reason: String },

    #[error("extraction failed: {message}")]
    Failed { message: String },
}

/// Failure fetching the identity registry at session start.
#[derive(Debug, Error)]
pub enum RegistryLoadError {
    #[error("failed to read identity registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("identity registry is malformed: {reason}")]
    Malformed { reason: String },

    #[error("identity registry unavailable: {message}")]
    Unavailable { message: String },
}

/// Failure of the persistence collaborator for one row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to save row: {message}")]
pub struct SaveError {
    pub message: String,
}

impl SaveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Rejected operator action on the current row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ClassificationError {
    #[error("column {column} is out of range (row has {column_count} columns)")]
    ColumnOutOfRange { column: usize, column_count: usize },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("type '{tag}' is already assigned to column {column}")]
    TypeAlreadyAssigned { tag: String, column: usize },

    #[error("column {column} is excluded from submission")]
    ColumnExcluded { column: usize },

    #[error("no column is typed as a name")]
    NoNameColumn,

    #[error("identity {id} is not in the registry")]
    UnknownIdentity { id: i64 },
}

/// Workflow action attempted at the wrong time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {action} while the session is {phase}")]
    InvalidPhase { action: &'static str, phase: Phase },

    #[error("a save is already in flight for this row")]
    SaveInFlight,

    #[error("no save is pending")]
    NoSavePending,
}

/// Failure loading the review configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Unified error for the review workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReviewError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("extraction produced no rows")]
    EmptyResult,

    #[error(transparent)]
    RegistryLoad(#[from] RegistryLoadError),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<ModelError> for ReviewError {
    fn from(err: ModelError) -> Self {
        Self::Classification(ClassificationError::Model(err))
    }
}

impl ReviewError {
    /// True when resubmitting the identical action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Save(_))
    }

    /// Message suitable for showing to the operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::Extraction(err) => format!("Could not extract a table: {err}"),
            Self::EmptyResult => {
                "No rows were found in the extracted table. Please try another image.".to_string()
            }
            Self::RegistryLoad(err) => format!("Could not load the identity list: {err}"),
            Self::Save(err) => format!("The row was not saved: {}", err.message),
            Self::Classification(err) => err.to_string(),
            Self::Session(err) => err.to_string(),
        }
    }

    /// How the operator can recover, if there is a known way.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Extraction(_) | Self::EmptyResult => {
                Some("Reset and upload a clearer image or a different file.")
            }
            Self::RegistryLoad(_) => Some("Reload the session once the registry is reachable."),
            Self::Save(_) => Some("Submit again to retry with the same data."),
            Self::Session(SessionError::SaveInFlight) => {
                Some("Wait for the pending save to finish.")
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
