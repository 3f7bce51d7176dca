/// One extraction run: guard the target, extract, render and save
use crate::config::Config;
use crate::error::ExtractionError;
use crate::export;
use crate::fetch::{FetchError, WatchPageClient};
use crate::metadata::{page_duration, MetadataExtractor, PageDetails};
use crate::page::Page;
use crate::polling::Delay;
use crate::selectors::SelectorTable;
use crate::transcript::extractor::PanelState;
use crate::transcript::timedtext::{self, PlayerResponse};
use crate::transcript::{TranscriptDocument, TranscriptExtractor};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::info;
use url::Url;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Please open a YouTube video first!")]
    NotAWatchPage(String),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Download failed: {0}")]
    Output(#[from] anyhow::Error),
}

/// Where the transcript text came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptSource {
    Panel(PanelState),
    CaptionTrack { language: String },
}

/// Everything one extraction produced
#[derive(Debug, Clone)]
pub struct VideoReport {
    pub video_url: String,
    pub details: PageDetails,
    pub transcript: TranscriptDocument,
    pub source: TranscriptSource,
}

/// `true` for `youtube.com/watch` pages (any subdomain)
pub fn is_watch_url(page_url: &str) -> bool {
    let Ok(parsed) = Url::parse(page_url) else {
        return false;
    };
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    (host == "youtube.com" || host.ends_with(".youtube.com")) && parsed.path().starts_with("/watch")
}

pub struct ExtractionSession<'a> {
    config: &'a Config,
    selectors: SelectorTable,
    delay: &'a dyn Delay,
}

impl<'a> ExtractionSession<'a> {
    pub fn new(config: &'a Config, delay: &'a dyn Delay) -> Self {
        Self {
            config,
            selectors: SelectorTable::default(),
            delay,
        }
    }

    pub fn with_selectors(mut self, selectors: SelectorTable) -> Self {
        self.selectors = selectors;
        self
    }

    fn guard<P: Page>(&self, page: &P) -> Result<String, SessionError> {
        match page.location() {
            Some(location) if !is_watch_url(&location) => Err(SessionError::NotAWatchPage(location)),
            Some(location) => Ok(location),
            None => Ok(String::new()),
        }
    }

    /// Extract from a rendered page through its transcript panel
    pub async fn extract_page<P: Page>(&self, page: &mut P) -> Result<VideoReport, SessionError> {
        let video_url = self.guard(&*page)?;

        let duration = page_duration(&*page, &self.selectors, self.config.extraction.default_duration_seconds)?
            .ok_or(ExtractionError::VideoElementNotFound)?;

        let details = MetadataExtractor::new(&self.config.extraction, &self.selectors, self.delay)
            .extract(page, duration)
            .await;

        let outcome = TranscriptExtractor::new(
            &self.config.extraction,
            &self.config.bucketing,
            &self.selectors,
            self.delay,
        )
        .extract(page)
        .await?;

        Ok(VideoReport {
            video_url,
            details,
            transcript: outcome.document,
            source: TranscriptSource::Panel(outcome.panel),
        })
    }

    /// Extract from the page's embedded caption tracks, downloading the
    /// selected track with `client`
    pub async fn extract_captions<P: Page>(
        &self,
        page: &mut P,
        client: &WatchPageClient,
    ) -> Result<VideoReport, SessionError> {
        let video_url = self.guard(&*page)?;

        let player = PlayerResponse::from_page(&*page, self.selectors.scripts)?;
        let track = player.select_track(&self.config.fetch.preferred_language)?.clone();

        let duration = player
            .video_details
            .as_ref()
            .and_then(|d| d.length())
            .filter(|d| *d > 0.0)
            .or(page_duration(&*page, &self.selectors, self.config.extraction.default_duration_seconds)?)
            .unwrap_or(self.config.extraction.default_duration_seconds);

        let segments = client.fetch_track(&track).await?;
        info!("💬 Downloaded {} caption segments", segments.len());
        let transcript = timedtext::build_document(&segments, duration, &self.config.bucketing)?;

        let details = MetadataExtractor::new(&self.config.extraction, &self.selectors, self.delay)
            .extract(page, duration)
            .await;

        Ok(VideoReport {
            video_url,
            details,
            transcript,
            source: TranscriptSource::CaptionTrack {
                language: track.language_code,
            },
        })
    }

    pub fn render(&self, report: &VideoReport, at: DateTime<Utc>) -> Result<String, SessionError> {
        Ok(export::render(
            self.config.output.format,
            &report.details,
            &report.transcript,
            self.config.bucketing.timestamp_style,
            &report.video_url,
            at,
        )?)
    }

    /// Render the report and write it to the output directory
    pub async fn save(&self, report: &VideoReport) -> Result<PathBuf, SessionError> {
        let now = Utc::now();
        let content = self.render(report, now)?;
        let filename = export::output_filename(
            &report.details.metadata.title,
            self.config.output.format,
            self.config.output.max_title_length,
            now,
        );
        Ok(export::save(&self.config.output.base_dir, &filename, &content).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_watch_url() {
        assert!(is_watch_url("https://www.youtube.com/watch?v=abc"));
        assert!(is_watch_url("https://m.youtube.com/watch?v=abc"));
        assert!(!is_watch_url("https://www.youtube.com/@channel"));
        assert!(!is_watch_url("https://notyoutube.com/watch?v=abc"));
        assert!(!is_watch_url("about:blank"));
    }

    #[test]
    fn test_error_messages_pass_through() {
        let err: SessionError = ExtractionError::NoSegmentsLoaded.into();
        assert_eq!(err.to_string(), ExtractionError::NoSegmentsLoaded.to_string());
        assert_eq!(
            SessionError::NotAWatchPage("https://x.test".into()).to_string(),
            "Please open a YouTube video first!"
        );
    }
}
