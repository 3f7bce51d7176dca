/// Transcript extraction from the rendered transcript panel
use super::{BucketPolicy, CaptionSegment, TranscriptDocument};
use crate::config::ExtractionConfig;
use crate::error::{ExtractionError, Result};
use crate::page::{ElementSnapshot, Page};
use crate::polling::{Delay, PollPolicy, Poller};
use crate::selectors::SelectorTable;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Who made the transcript panel visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    /// Segments were already on the page; the panel is left alone
    AlreadyOpen,
    /// The extractor clicked it open and must close it again
    OpenedByExtractor,
}

/// Result of a successful extraction
#[derive(Debug, Clone)]
pub struct TranscriptOutcome {
    pub document: TranscriptDocument,
    /// Duration the bucket width was chosen from
    pub duration_seconds: f64,
    /// Whether that duration came from the page rather than the default
    pub duration_reported: bool,
    /// Segment elements read, including ones without usable text
    pub segments_found: usize,
    pub panel: PanelState,
    /// Whether the close control was found and clicked
    pub panel_closed: bool,
}

enum TriggerOutcome {
    NotFound,
    Exhausted,
    Loaded(Vec<ElementSnapshot>),
}

/// Drives the transcript panel and turns its segments into a document
pub struct TranscriptExtractor<'a> {
    config: &'a ExtractionConfig,
    policy: &'a BucketPolicy,
    selectors: &'a SelectorTable,
    delay: &'a dyn Delay,
}

impl<'a> TranscriptExtractor<'a> {
    pub fn new(
        config: &'a ExtractionConfig,
        policy: &'a BucketPolicy,
        selectors: &'a SelectorTable,
        delay: &'a dyn Delay,
    ) -> Self {
        Self {
            config,
            policy,
            selectors,
            delay,
        }
    }

    /// Run one extraction against `page`.
    ///
    /// If the panel had to be opened, it is closed again before returning,
    /// whether or not the segments held usable text.
    pub async fn extract<P: Page>(&self, page: &mut P) -> Result<TranscriptOutcome> {
        let video = page
            .query_first(self.selectors.video)?
            .ok_or(ExtractionError::VideoElementNotFound)?;

        let reported = page
            .media_duration(video.handle)
            .filter(|d| d.is_finite() && *d > 0.0);
        let duration = reported.unwrap_or(self.config.default_duration_seconds);
        let bucket_width = self.policy.width_for(duration);
        info!("🎬 Video duration {:.0}s → {}s buckets", duration, bucket_width);

        let present = page.query_all(self.selectors.segment)?;
        let (segments, panel) = if present.is_empty() {
            self.open_panel(page).await?
        } else {
            debug!("Transcript panel already open with {} segments", present.len());
            (present, PanelState::AlreadyOpen)
        };

        let result = self.collect(page, segments, reported, bucket_width).await;

        let panel_closed = match panel {
            PanelState::OpenedByExtractor => self.close_panel(page).unwrap_or_else(|e| {
                warn!("Could not close the transcript panel: {}", e);
                false
            }),
            PanelState::AlreadyOpen => false,
        };

        let (document, segments_found) = result?;
        info!("📝 Built transcript: {} buckets from {} segments", document.len(), segments_found);

        Ok(TranscriptOutcome {
            document,
            duration_seconds: duration,
            duration_reported: reported.is_some(),
            segments_found,
            panel,
            panel_closed,
        })
    }

    async fn collect<P: Page>(
        &self,
        page: &mut P,
        segments: Vec<ElementSnapshot>,
        reported_duration: Option<f64>,
        bucket_width: u64,
    ) -> Result<(TranscriptDocument, usize)> {
        let segments = self.load_all_segments(page, segments).await?;
        let captions = self.read_segments(page, &segments, reported_duration)?;

        if captions.is_empty() {
            return Err(ExtractionError::NoNonEmptyText { found: segments.len() });
        }

        Ok((TranscriptDocument::from_segments(&captions, bucket_width), segments.len()))
    }

    /// Try each way of opening the panel until segments show up
    async fn open_panel<P: Page>(&self, page: &mut P) -> Result<(Vec<ElementSnapshot>, PanelState)> {
        info!("🔍 No transcript segments on page, opening the transcript panel");
        self.delay
            .wait(Duration::from_millis(self.config.page_ready_delay_ms))
            .await;

        let mut triggered = false;

        match self.try_transcript_button(page).await? {
            TriggerOutcome::Loaded(segments) => return Ok((segments, PanelState::OpenedByExtractor)),
            TriggerOutcome::Exhausted => triggered = true,
            TriggerOutcome::NotFound => {}
        }

        match self.try_overflow_menu(page).await? {
            TriggerOutcome::Loaded(segments) => return Ok((segments, PanelState::OpenedByExtractor)),
            TriggerOutcome::Exhausted => triggered = true,
            TriggerOutcome::NotFound => {}
        }

        if let Some(segments) = self.poll_segments(page, self.config.settle_poll(), "settle").await? {
            let panel = if triggered {
                PanelState::OpenedByExtractor
            } else {
                PanelState::AlreadyOpen
            };
            return Ok((segments, panel));
        }

        if triggered {
            warn!("Transcript controls were clicked but no segments loaded");
            Err(ExtractionError::NoSegmentsLoaded)
        } else {
            warn!("No transcript control found on the page");
            Err(ExtractionError::TranscriptPanelUnavailable)
        }
    }

    /// Method 1: a button labelled "Transcript" / "Show transcript"
    async fn try_transcript_button<P: Page>(&self, page: &mut P) -> Result<TriggerOutcome> {
        let buttons = page.query_all(self.selectors.buttons)?;
        let button = buttons.into_iter().find(|b| self.is_transcript_toggle(b));

        let Some(button) = button else {
            debug!("No transcript button found");
            return Ok(TriggerOutcome::NotFound);
        };

        debug!("Clicking transcript button #{}", button.handle.0);
        page.click(button.handle)?;
        self.poll_after_trigger(page, "transcript button").await
    }

    /// Method 2: "More actions" overflow menu, then its "Show transcript" entry
    async fn try_overflow_menu<P: Page>(&self, page: &mut P) -> Result<TriggerOutcome> {
        let wanted = self.selectors.more_actions_label.to_lowercase();
        let more = page
            .query_all(self.selectors.buttons)?
            .into_iter()
            .find(|b| {
                b.aria_label()
                    .map(|label| label.to_lowercase().contains(&wanted))
                    .unwrap_or(false)
            });

        let Some(more) = more else {
            debug!("No overflow menu button found");
            return Ok(TriggerOutcome::NotFound);
        };

        page.click(more.handle)?;
        self.delay
            .wait(Duration::from_millis(self.config.menu_open_delay_ms))
            .await;

        // The menu renders new items, so query again rather than reuse the button list
        let option = page
            .query_all(self.selectors.menu_items)?
            .into_iter()
            .find(|item| item.text.to_lowercase().contains(self.selectors.show_transcript_text));

        let Some(option) = option else {
            debug!("Overflow menu has no transcript entry");
            return Ok(TriggerOutcome::NotFound);
        };

        debug!("Clicking overflow menu transcript entry #{}", option.handle.0);
        page.click(option.handle)?;
        self.poll_after_trigger(page, "overflow menu").await
    }

    async fn poll_after_trigger<P: Page>(&self, page: &P, name: &'static str) -> Result<TriggerOutcome> {
        match self.poll_segments(page, self.config.panel_poll(), name).await? {
            Some(segments) => {
                info!("✅ Transcript opened via {} ({} segments)", name, segments.len());
                Ok(TriggerOutcome::Loaded(segments))
            }
            None => Ok(TriggerOutcome::Exhausted),
        }
    }

    async fn poll_segments<P: Page>(
        &self,
        page: &P,
        policy: PollPolicy,
        name: &'static str,
    ) -> Result<Option<Vec<ElementSnapshot>>> {
        let selector = self.selectors.segment;
        let mut poller = Poller::new(name, policy, self.delay);
        poller
            .run(|| {
                let segments = page.query_all(selector)?;
                Ok(if segments.is_empty() { None } else { Some(segments) })
            })
            .await
    }

    fn is_transcript_toggle(&self, button: &ElementSnapshot) -> bool {
        let label = button.aria_label().map(|l| l.trim().to_lowercase());
        let text = button.trimmed_text().to_lowercase();
        self.selectors.transcript_labels.iter().any(|wanted| {
            label.as_deref() == Some(*wanted) || text == *wanted
        })
    }

    /// Scroll the segment list until its length stops changing
    async fn load_all_segments<P: Page>(
        &self,
        page: &mut P,
        mut segments: Vec<ElementSnapshot>,
    ) -> Result<Vec<ElementSnapshot>> {
        let mut container = None;
        for selector in self.selectors.segment_containers {
            if let Some(found) = page.query_first(selector)? {
                container = Some(found);
                break;
            }
        }

        let Some(container) = container else {
            debug!("Transcript container not found, using the {} loaded segments", segments.len());
            return Ok(segments);
        };

        let interval = Duration::from_millis(self.config.scroll_interval_ms);
        let mut previous = segments.len();
        let mut stable = 0;

        for _ in 0..self.config.scroll_max_attempts {
            page.scroll_to_bottom(container.handle)?;
            self.delay.wait(interval).await;

            segments = page.query_all(self.selectors.segment)?;
            if segments.len() == previous {
                stable += 1;
                if stable >= self.config.scroll_stable_checks {
                    break;
                }
            } else {
                stable = 0;
                previous = segments.len();
            }
        }

        debug!("Segment loading settled at {} segments", segments.len());
        Ok(segments)
    }

    /// Turn segment elements into captions, skipping blank text, unreadable
    /// timestamps and anything past the reported end of the video
    fn read_segments<P: Page>(
        &self,
        page: &P,
        segments: &[ElementSnapshot],
        reported_duration: Option<f64>,
    ) -> Result<Vec<CaptionSegment>> {
        let mut captions = Vec::with_capacity(segments.len());

        for segment in segments {
            let timestamp = page
                .query_first_within(segment.handle, self.selectors.segment_timestamp)?
                .map(|e| e.trimmed_text().to_string())
                .unwrap_or_else(|| "0:00".to_string());
            let text = page
                .query_first_within(segment.handle, self.selectors.segment_text)?
                .map(|e| e.trimmed_text().to_string())
                .unwrap_or_default();

            let Some(seconds) = super::parse_timestamp(&timestamp) else {
                debug!("Skipping segment with unreadable timestamp '{}'", timestamp);
                continue;
            };

            if let Some(limit) = reported_duration {
                if seconds as f64 > limit {
                    debug!("Skipping segment at {}s past the {:.0}s duration", seconds, limit);
                    continue;
                }
            }

            if let Some(caption) = CaptionSegment::new(seconds, &text) {
                captions.push(caption);
            }
        }

        Ok(captions)
    }

    /// Click the panel's close control; returns whether one was found
    fn close_panel<P: Page>(&self, page: &mut P) -> Result<bool> {
        let close = page
            .query_all(self.selectors.buttons)?
            .into_iter()
            .find(|b| {
                let label = b.aria_label().unwrap_or_default().to_lowercase();
                label.contains("close") && label.contains("transcript")
            });

        match close {
            Some(button) => {
                page.click(button.handle)?;
                debug!("Closed the transcript panel");
                Ok(true)
            }
            None => {
                warn!("Opened the transcript panel but found no control to close it");
                Ok(false)
            }
        }
    }
}
