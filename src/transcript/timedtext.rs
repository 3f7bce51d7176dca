/// Caption tracks embedded in the watch page's player response
///
/// This route does not need a rendered transcript panel: the served HTML
/// carries `ytInitialPlayerResponse`, which lists caption tracks whose
/// `baseUrl` returns timed text (json3 events or XML `<text>` nodes).
use super::{BucketPolicy, CaptionSegment, TranscriptDocument};
use crate::error::{ExtractionError, Result};
use crate::page::{find_embedded_json, Page};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlayerResponse {
    pub captions: Option<Captions>,
    #[serde(rename = "videoDetails")]
    pub video_details: Option<VideoDetails>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    pub renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TracklistRenderer {
    #[serde(rename = "captionTracks", default)]
    pub tracks: Vec<CaptionTrack>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "languageCode")]
    pub language_code: String,
    /// `asr` for auto-generated tracks
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct VideoDetails {
    #[serde(rename = "videoId", default)]
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "lengthSeconds")]
    pub length_seconds: Option<String>,
    #[serde(rename = "viewCount")]
    pub view_count: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(rename = "shortDescription")]
    pub short_description: Option<String>,
}

impl VideoDetails {
    pub fn length(&self) -> Option<f64> {
        self.length_seconds.as_deref().and_then(|s| s.parse::<f64>().ok())
    }
}

impl PlayerResponse {
    /// Read the player response out of the page's scripts
    pub fn from_page<P: Page + ?Sized>(page: &P, script_selector: &str) -> Result<Self> {
        let value = find_embedded_json(page, script_selector, "ytInitialPlayerResponse")?
            .ok_or(ExtractionError::PlayerResponseMissing)?;
        serde_json::from_value(value)
            .map_err(|e| ExtractionError::dom(format!("unreadable player response: {}", e)))
    }

    pub fn caption_tracks(&self) -> &[CaptionTrack] {
        self.captions
            .as_ref()
            .and_then(|c| c.renderer.as_ref())
            .map(|r| r.tracks.as_slice())
            .unwrap_or(&[])
    }

    /// The track in `language`, else the first one listed
    pub fn select_track(&self, language: &str) -> Result<&CaptionTrack> {
        let tracks = self.caption_tracks();
        let track = tracks
            .iter()
            .find(|t| t.language_code == language)
            .or_else(|| tracks.first())
            .ok_or(ExtractionError::NoCaptionTracks)?;
        debug!("Selected caption track '{}' ({:?})", track.language_code, track.kind);
        Ok(track)
    }
}

#[derive(Debug, Deserialize)]
struct Json3Response {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs")]
    t_start_ms: Option<u64>,
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a json3 timed-text body
pub fn parse_json3(body: &str) -> Result<Vec<CaptionSegment>> {
    let response: Json3Response = serde_json::from_str(body)
        .map_err(|e| ExtractionError::dom(format!("unreadable json3 captions: {}", e)))?;

    Ok(response
        .events
        .into_iter()
        .filter_map(|event| {
            let start = event.t_start_ms?;
            let raw: String = event.segs?.iter().map(|s| s.utf8.as_str()).collect();
            let text = collapse_whitespace(&html_escape::decode_html_entities(&raw));
            CaptionSegment::new(start / 1000, &text)
        })
        .collect())
}

fn xml_text_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<text\b[^>]*?\bstart="([0-9.]+)"[^>]*>(.*?)</text>"#)
            .expect("timed text pattern is valid")
    })
}

/// Parse the XML timed-text format.
///
/// Caption text is escaped twice (once for XML, once as HTML), so entities
/// are decoded twice.
pub fn parse_timedtext_xml(body: &str) -> Vec<CaptionSegment> {
    xml_text_regex()
        .captures_iter(body)
        .filter_map(|captures| {
            let start = captures[1].parse::<f64>().ok()?;
            let once = html_escape::decode_html_entities(&captures[2]).into_owned();
            let twice = html_escape::decode_html_entities(&once);
            CaptionSegment::new(start.floor() as u64, &collapse_whitespace(&twice))
        })
        .collect()
}

/// Parse a caption body in whichever format it arrived
pub fn parse_caption_body(body: &str) -> Result<Vec<CaptionSegment>> {
    if body.trim_start().starts_with('{') {
        parse_json3(body)
    } else {
        Ok(parse_timedtext_xml(body))
    }
}

/// Bucket downloaded captions the same way panel segments are bucketed
pub fn build_document(
    segments: &[CaptionSegment],
    duration_seconds: f64,
    policy: &BucketPolicy,
) -> Result<TranscriptDocument> {
    if segments.is_empty() {
        return Err(ExtractionError::NoNonEmptyText { found: 0 });
    }
    let width = policy.width_for(duration_seconds);
    let document = TranscriptDocument::from_segments(segments, width);
    info!("📝 Built transcript from caption track: {} buckets of {}s", document.len(), width);
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlSnapshot;

    const PLAYER_PAGE: &str = r#"<html><body><script>
        var ytInitialPlayerResponse = {"videoDetails": {"videoId": "abc123", "title": "A talk",
          "author": "Speaker", "lengthSeconds": "95", "keywords": ["rust", "talk"]},
          "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
            {"baseUrl": "https://example.test/tt?lang=de", "languageCode": "de"},
            {"baseUrl": "https://example.test/tt?lang=en", "languageCode": "en", "kind": "asr"}
          ]}}};var other = 1;
        </script></body></html>"#;

    #[test]
    fn test_player_response_from_page() {
        let page = HtmlSnapshot::parse(PLAYER_PAGE, None);
        let response = PlayerResponse::from_page(&page, "script").unwrap();
        let details = response.video_details.as_ref().unwrap();
        assert_eq!(details.video_id, "abc123");
        assert_eq!(details.length(), Some(95.0));
        assert_eq!(response.caption_tracks().len(), 2);
    }

    #[test]
    fn test_select_track_prefers_language() {
        let page = HtmlSnapshot::parse(PLAYER_PAGE, None);
        let response = PlayerResponse::from_page(&page, "script").unwrap();
        assert_eq!(response.select_track("en").unwrap().language_code, "en");
        assert_eq!(response.select_track("fr").unwrap().language_code, "de");
    }

    #[test]
    fn test_missing_player_response() {
        let page = HtmlSnapshot::parse("<html><body></body></html>", None);
        let err = PlayerResponse::from_page(&page, "script").unwrap_err();
        assert_eq!(err, ExtractionError::PlayerResponseMissing);
    }

    #[test]
    fn test_no_caption_tracks() {
        let response = PlayerResponse::default();
        assert_eq!(response.select_track("en").unwrap_err(), ExtractionError::NoCaptionTracks);
    }

    #[test]
    fn test_parse_json3() {
        let body = r#"{"events": [
            {"tStartMs": 0, "dDurationMs": 1000},
            {"tStartMs": 1500, "segs": [{"utf8": "hello"}, {"utf8": " world"}]},
            {"tStartMs": 4200, "segs": [{"utf8": "\n"}]},
            {"tStartMs": 12000, "segs": [{"utf8": "it&#39;s"}]}
        ]}"#;
        let segments = parse_json3(body).unwrap();
        assert_eq!(
            segments,
            vec![
                CaptionSegment::new(1, "hello world").unwrap(),
                CaptionSegment::new(12, "it's").unwrap(),
            ]
        );
    }

    #[test]
    fn test_parse_timedtext_xml() {
        let body = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
            <text start="0.5" dur="2.1">first &amp;amp; line</text>
            <text start="65.9" dur="1">don&amp;#39;t</text>
            <text start="70" dur="1">   </text>
        </transcript>"#;
        let segments = parse_timedtext_xml(body);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], CaptionSegment::new(0, "first & line").unwrap());
        assert_eq!(segments[1], CaptionSegment::new(65, "don't").unwrap());
    }

    #[test]
    fn test_build_document_requires_segments() {
        let policy = BucketPolicy::default();
        assert!(matches!(
            build_document(&[], 100.0, &policy),
            Err(ExtractionError::NoNonEmptyText { found: 0 })
        ));
    }
}
