/// YouTube Transcript Extractor - Rust Implementation
///
/// Pulls the transcript, chapters and metadata out of a YouTube watch page
/// and groups the transcript into fixed-width time buckets.

pub mod config;
pub mod error;
pub mod selectors;
pub mod polling;
pub mod page;
pub mod transcript;
pub mod metadata;
pub mod fetch;
pub mod export;
pub mod session;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder, OutputFormat};
pub use crate::error::ExtractionError;
pub use crate::page::{ElementHandle, ElementSnapshot, HtmlSnapshot, Page};
pub use crate::polling::{Delay, NoDelay, TokioDelay};
pub use crate::selectors::SelectorTable;
pub use crate::transcript::{BucketPolicy, TimestampStyle, TranscriptDocument, TranscriptExtractor};
pub use crate::metadata::{MetadataExtractor, PageDetails, VideoMetadata};
pub use crate::fetch::WatchPageClient;
pub use crate::session::{ExtractionSession, SessionError, VideoReport};
