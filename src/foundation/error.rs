/// Convenience result type used across photostamp.
pub type StampResult<T> = Result<T, StampError>;

/// Error taxonomy for the annotation pipeline.
///
/// Every variant is scoped to a single job row: the batch driver records it
/// against the offending source path and moves on to the next row.
#[derive(thiserror::Error, Debug)]
pub enum StampError {
    /// The source image cannot be opened or decoded.
    #[error("unreadable source: {0}")]
    UnreadableSource(String),

    /// A fixed asset (font or logo) is absent or unusable.
    #[error("missing asset: {0}")]
    MissingAsset(String),

    /// A job-table record lacks a required column or carries a malformed value.
    #[error("invalid job row: {0}")]
    InvalidJobRow(String),

    /// The destination cannot be created or written.
    #[error("write failure: {0}")]
    WriteFailure(String),

    /// The encoder rejected a save parameter.
    #[error("encode failure: {0}")]
    EncodeFailure(String),

    /// No free destination name was found within the retry limit.
    #[error("destination exhausted: {0}")]
    DestinationExhausted(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StampError {
    /// Build a [`StampError::UnreadableSource`] value.
    pub fn unreadable_source(msg: impl Into<String>) -> Self {
        Self::UnreadableSource(msg.into())
    }

    /// Build a [`StampError::MissingAsset`] value.
    pub fn missing_asset(msg: impl Into<String>) -> Self {
        Self::MissingAsset(msg.into())
    }

    /// Build a [`StampError::InvalidJobRow`] value.
    pub fn invalid_job_row(msg: impl Into<String>) -> Self {
        Self::InvalidJobRow(msg.into())
    }

    /// Build a [`StampError::WriteFailure`] value.
    pub fn write_failure(msg: impl Into<String>) -> Self {
        Self::WriteFailure(msg.into())
    }

    /// Build a [`StampError::EncodeFailure`] value.
    pub fn encode_failure(msg: impl Into<String>) -> Self {
        Self::EncodeFailure(msg.into())
    }

    /// Build a [`StampError::DestinationExhausted`] value.
    pub fn destination_exhausted(msg: impl Into<String>) -> Self {
        Self::DestinationExhausted(msg.into())
    }

    /// Short, stable name of the error kind, used in logs and run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnreadableSource(_) => "UnreadableSource",
            Self::MissingAsset(_) => "MissingAsset",
            Self::InvalidJobRow(_) => "InvalidJobRow",
            Self::WriteFailure(_) => "WriteFailure",
            Self::EncodeFailure(_) => "EncodeFailure",
            Self::DestinationExhausted(_) => "DestinationExhausted",
            Self::Other(_) => "Other",
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
