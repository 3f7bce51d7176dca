//! Error types for transcript and metadata extraction

/// Result type for extraction operations
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Why a single extraction attempt failed.
///
/// The `Display` text is what the user sees, so it is written as a
/// user-facing message rather than a debug string.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("Error: Video element not found")]
    VideoElementNotFound,

    #[error("Error: No transcript available for this video. Could not find a transcript button or menu entry.")]
    TranscriptPanelUnavailable,

    #[error("Error: No transcript available for this video. Try refreshing the page and waiting a few seconds before extracting.")]
    NoSegmentsLoaded,

    #[error("Error: Found {found} segments but couldn't extract text. This might be a YouTube layout issue.")]
    NoNonEmptyText { found: usize },

    #[error("Error: {0}")]
    UnexpectedDom(String),

    #[error("Could not find ytInitialPlayerResponse")]
    PlayerResponseMissing,

    #[error("No captions available for this video")]
    NoCaptionTracks,
}

impl ExtractionError {
    /// Wrap any DOM-level failure as the catch-all variant
    pub fn dom(message: impl Into<String>) -> Self {
        Self::UnexpectedDom(message.into())
    }
}
