/// Best-effort video metadata, description, chapters and tags
///
/// Nothing in here fails an extraction: every field walks its fallback list
/// and ends in a sentinel, and page errors are logged and treated as "not
/// found".

pub mod chapters;

pub use chapters::{Chapter, ChapterLine};

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::page::{find_embedded_json, Page};
use crate::polling::Delay;
use crate::selectors::{Probe, SelectorTable};
use crate::transcript::format_duration;
use crate::transcript::timedtext::PlayerResponse;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_CHANNEL: &str = "Unknown Channel";
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub video_id: String,
    pub channel_name: String,
    pub channel_url: String,
    pub duration_seconds: u64,
    pub duration_formatted: String,
    pub view_count: String,
    pub upload_date: String,
    pub like_count: String,
}

/// Everything read from the page besides the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDetails {
    pub metadata: VideoMetadata,
    pub description: String,
    pub chapters: Vec<Chapter>,
    pub tags: Vec<String>,
}

/// The `v` query parameter of a watch URL
pub fn video_id_from_url(page_url: &str) -> Option<String> {
    let parsed = Url::parse(page_url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Duration of the page's video, or `fallback` when it is not reported
pub fn page_duration<P: Page + ?Sized>(page: &P, selectors: &SelectorTable, fallback: f64) -> Result<Option<f64>> {
    let Some(video) = page.query_first(selectors.video)? else {
        return Ok(None);
    };
    Ok(Some(
        page.media_duration(video.handle)
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(fallback),
    ))
}

pub struct MetadataExtractor<'a> {
    config: &'a ExtractionConfig,
    selectors: &'a SelectorTable,
    delay: &'a dyn Delay,
}

impl<'a> MetadataExtractor<'a> {
    pub fn new(config: &'a ExtractionConfig, selectors: &'a SelectorTable, delay: &'a dyn Delay) -> Self {
        Self {
            config,
            selectors,
            delay,
        }
    }

    pub async fn extract<P: Page>(&self, page: &mut P, duration_seconds: f64) -> PageDetails {
        let location = page.location();
        let player = PlayerResponse::from_page(&*page, self.selectors.scripts).ok();
        let details = player.as_ref().and_then(|p| p.video_details.clone()).unwrap_or_default();

        let title = self
            .probe_field(&*page, self.selectors.title, location.as_deref())
            .or_else(|| non_empty(&details.title))
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let channel_name = self
            .probe_field(&*page, self.selectors.channel_name, location.as_deref())
            .or_else(|| non_empty(&details.author))
            .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string());

        let video_id = location
            .as_deref()
            .and_then(video_id_from_url)
            .or_else(|| non_empty(&details.video_id))
            .unwrap_or_default();

        let duration_seconds = duration_seconds.max(0.0).floor() as u64;

        let metadata = VideoMetadata {
            title,
            video_id,
            channel_name,
            channel_url: self
                .probe_field(&*page, self.selectors.channel_url, location.as_deref())
                .unwrap_or_default(),
            duration_seconds,
            duration_formatted: format_duration(duration_seconds),
            view_count: self
                .probe_field(&*page, self.selectors.view_count, location.as_deref())
                .or_else(|| details.view_count.clone())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            upload_date: self
                .probe_field(&*page, self.selectors.upload_date, location.as_deref())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            like_count: self
                .probe_field(&*page, self.selectors.like_count, location.as_deref())
                .unwrap_or_else(|| UNKNOWN.to_string()),
        };
        info!("📋 Metadata: '{}' by {}", metadata.title, metadata.channel_name);

        let description = match self.description(page).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => details.short_description.clone().unwrap_or_default(),
            Err(e) => {
                warn!("Could not read description: {}", e);
                details.short_description.clone().unwrap_or_default()
            }
        };

        let chapters = chapters::extract_chapters(&*page, self.selectors).unwrap_or_else(|e| {
            warn!("Could not read chapters: {}", e);
            Vec::new()
        });

        let tags = self.tags(&*page, &details.keywords).unwrap_or_else(|e| {
            warn!("Could not extract tags: {}", e);
            Vec::new()
        });

        debug!("Found {} chapters and {} tags", chapters.len(), tags.len());

        PageDetails {
            metadata,
            description,
            chapters,
            tags,
        }
    }

    /// First non-empty probe result, or `None` when every probe misses
    pub fn probe_field<P: Page + ?Sized>(&self, page: &P, probes: &[Probe], base_url: Option<&str>) -> Option<String> {
        probes.iter().find_map(|probe| match run_probe(page, probe, base_url) {
            Ok(value) => value,
            Err(e) => {
                debug!("Probe {:?} failed: {}", probe, e);
                None
            }
        })
    }

    /// Description text, expanding the collapsed view first when possible
    async fn description<P: Page>(&self, page: &mut P) -> Result<String> {
        if self.first_text(&*page, self.selectors.description)?.is_none() {
            return Ok(String::new());
        }

        for selector in self.selectors.description_expand {
            if let Some(button) = page.query_first(selector)? {
                if button.text.to_lowercase().contains("more") {
                    page.click(button.handle)?;
                    self.delay
                        .wait(Duration::from_millis(self.config.description_expand_delay_ms))
                        .await;
                }
                break;
            }
        }

        Ok(self.first_text(&*page, self.selectors.description)?.unwrap_or_default())
    }

    fn first_text<P: Page + ?Sized>(&self, page: &P, selectors: &[&str]) -> Result<Option<String>> {
        for selector in selectors {
            if let Some(element) = page.query_first(selector)? {
                let text = element.trimmed_text();
                if !text.is_empty() {
                    return Ok(Some(text.to_string()));
                }
            }
        }
        Ok(None)
    }

    /// Tags from the keywords meta tag, then the page data, then the player
    /// response keywords
    fn tags<P: Page + ?Sized>(&self, page: &P, player_keywords: &[String]) -> Result<Vec<String>> {
        if let Some(meta) = page.query_first(self.selectors.keywords_meta)? {
            let tags = dedup(meta.attr("content").unwrap_or_default().split(','));
            if !tags.is_empty() {
                return Ok(tags);
            }
        }

        if let Some(data) = find_embedded_json(page, self.selectors.scripts, "ytInitialData")? {
            let runs = data
                .pointer("/contents/twoColumnWatchNextResults/results/results/contents/0/videoPrimaryInfoRenderer/superTitleLink/runs")
                .and_then(|runs| runs.as_array());
            if let Some(runs) = runs {
                let tags = dedup(runs.iter().filter_map(|run| run["text"].as_str()));
                if !tags.is_empty() {
                    return Ok(tags);
                }
            }
        }

        Ok(dedup(player_keywords.iter().map(String::as_str)))
    }
}

fn run_probe<P: Page + ?Sized>(page: &P, probe: &Probe, base_url: Option<&str>) -> Result<Option<String>> {
    let value = match probe {
        Probe::Text(selector) => page
            .query_first(selector)?
            .map(|e| e.trimmed_text().to_string()),
        Probe::Attribute(selector, attr) => page
            .query_first(selector)?
            .and_then(|e| e.attr(attr).map(|v| v.trim().to_string())),
        Probe::Link(selector) => page
            .query_first(selector)?
            .and_then(|e| e.attr("href").map(|href| resolve_link(href.trim(), base_url))),
        Probe::Meta(name) => {
            let by_name = page.query_first(&format!("meta[name=\"{}\"]", name))?;
            let element = match by_name {
                Some(element) => Some(element),
                None => page.query_first(&format!("meta[property=\"{}\"]", name))?,
            };
            element.and_then(|e| e.attr("content").map(|v| v.trim().to_string()))
        }
    };
    Ok(value.filter(|v| !v.is_empty()))
}

/// Resolve a possibly relative href against the page URL
fn resolve_link(href: &str, base_url: Option<&str>) -> String {
    if let Ok(absolute) = Url::parse(href) {
        return absolute.to_string();
    }
    base_url
        .and_then(|base| Url::parse(base).ok())
        .and_then(|base| base.join(href).ok())
        .map(|joined| joined.to_string())
        .unwrap_or_else(|| href.to_string())
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Trim, drop empties and keep the first occurrence of each tag
fn dedup<'s>(tags: impl Iterator<Item = &'s str>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.map(str::trim)
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_from_url() {
        assert_eq!(
            video_id_from_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(video_id_from_url("https://www.youtube.com/watch?list=x"), None);
        assert_eq!(video_id_from_url("not a url"), None);
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(
            resolve_link("/@channel", Some("https://www.youtube.com/watch?v=1")),
            "https://www.youtube.com/@channel"
        );
        assert_eq!(resolve_link("https://a.test/x", None), "https://a.test/x");
        assert_eq!(resolve_link("/@channel", None), "/@channel");
    }

    #[test]
    fn test_dedup_tags() {
        let tags = dedup(" rust, talk ,,rust,async ".split(','));
        assert_eq!(tags, vec!["rust", "talk", "async"]);
    }
}
