//! Error types for the Freesound client.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when talking to the Freesound API.
#[derive(Error, Debug)]
pub enum FreesoundError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("API error ({status}): {reason}")]
    Api { status: u16, reason: String },

    /// Response body could not be parsed
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Field absent from a response object.
    ///
    /// Usually the `fields` request parameter left it out.
    #[error("Field `{0}` is not present in the response (check the `fields` request parameter)")]
    MissingField(String),

    /// Field present but holding an unexpected JSON type
    #[error("Field `{field}` is not {expected}")]
    FieldType { field: String, expected: String },

    /// `next_page` called on the last page
    #[error("No more pages")]
    NoMorePages,

    /// `previous_page` called on the first page
    #[error("Already at first page")]
    AtFirstPage,

    /// `more` called on an exhausted combined search
    #[error("No more results")]
    ResultsExhausted,

    /// Position outside the current page
    #[error("Index {index} out of range for a page of {len} results")]
    IndexOutOfRange { index: usize, len: usize },

    /// Downloading to a local file failed
    #[error("Retrieval of {} failed: {source}", path.display())]
    Retrieval {
        path: PathBuf,
        source: Box<FreesoundError>,
    },

    /// Invalid API base URL
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// No usable API key or access token
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// IO error during download
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FreesoundError {
    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub(crate) fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub(crate) fn field_type(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::FieldType {
            field: field.into(),
            expected: expected.into(),
        }
    }

    pub(crate) fn retrieval(path: impl Into<PathBuf>, source: FreesoundError) -> Self {
        Self::Retrieval {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// HTTP status of an API error, looking through retrieval failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Retrieval { source, .. } => source.status(),
            _ => None,
        }
    }

    /// True for errors raised by walking past either end of a result set.
    pub fn is_pagination_boundary(&self) -> bool {
        matches!(
            self,
            Self::NoMorePages
                | Self::AtFirstPage
                | Self::ResultsExhausted
                | Self::IndexOutOfRange { .. }
        )
    }
}

/// Result type for Freesound client operations.
pub type Result<T> = std::result::Result<T, FreesoundError>;
