/// Caption segments, time buckets and the bucketed transcript document
///
/// Both transcript sources (the rendered transcript panel and downloaded
/// caption tracks) produce `CaptionSegment`s; everything after that point is
/// shared and lives here.

pub mod extractor;
pub mod timedtext;

pub use extractor::TranscriptExtractor;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// One timestamped caption read from the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionSegment {
    /// Offset from the start of the video
    pub seconds: u64,
    /// Caption text, trimmed and never empty
    pub text: String,
}

impl CaptionSegment {
    /// Build a segment, rejecting text that is blank after trimming
    pub fn new(seconds: u64, text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            seconds,
            text: text.to_string(),
        })
    }
}

/// How bucket starts are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimestampStyle {
    /// `[m:ss]`, minutes may exceed 59
    #[default]
    Minutes,
    /// `[h:mm:ss]` once the start reaches one hour, `[m:ss]` before that
    Hours,
}

/// Chooses a bucket width from the video duration.
///
/// Thresholds are inclusive: a duration equal to a threshold gets the wider
/// bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketPolicy {
    pub long_threshold_seconds: f64,
    pub long_width: u64,
    pub medium_threshold_seconds: f64,
    pub medium_width: u64,
    pub short_width: u64,
    pub timestamp_style: TimestampStyle,
}

impl Default for BucketPolicy {
    fn default() -> Self {
        Self {
            long_threshold_seconds: 1200.0,
            long_width: 60,
            medium_threshold_seconds: 480.0,
            medium_width: 30,
            short_width: 15,
            timestamp_style: TimestampStyle::Minutes,
        }
    }
}

impl BucketPolicy {
    pub fn width_for(&self, duration_seconds: f64) -> u64 {
        if duration_seconds >= self.long_threshold_seconds {
            self.long_width
        } else if duration_seconds >= self.medium_threshold_seconds {
            self.medium_width
        } else {
            self.short_width
        }
    }
}

/// Parse `M:SS` or `H:MM:SS` into seconds
pub fn parse_timestamp(timestamp: &str) -> Option<u64> {
    let parts: Vec<u64> = timestamp
        .trim()
        .split(':')
        .map(|part| part.trim().parse::<u64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;

    // Overflowing values count as unreadable
    let (hours, minutes, seconds) = match parts.as_slice() {
        [minutes, seconds] => (0, *minutes, *seconds),
        [hours, minutes, seconds] => (*hours, *minutes, *seconds),
        _ => return None,
    };
    hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)
}

/// Format seconds as a bucket label (without brackets)
pub fn format_timestamp(seconds: u64, style: TimestampStyle) -> String {
    match style {
        TimestampStyle::Hours if seconds >= 3600 => {
            format!("{}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60)
        }
        _ => format!("{}:{:02}", seconds / 60, seconds % 60),
    }
}

/// Format a duration the way the JSON export reports it: `MM:SS`, or
/// `HH:MM:SS` from one hour on
pub fn format_duration(seconds: u64) -> String {
    let full = format!("{:02}:{:02}:{:02}", seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    match full.strip_prefix("00:") {
        Some(short) => short.to_string(),
        None => full,
    }
}

/// One rendered bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub start: u64,
    pub text: String,
}

/// Captions grouped into fixed-width time buckets, ascending by start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptDocument {
    bucket_width: u64,
    entries: Vec<TranscriptEntry>,
}

impl TranscriptDocument {
    /// Group segments by `floor(seconds / width) * width`, keeping arrival
    /// order inside each bucket
    pub fn from_segments(segments: &[CaptionSegment], bucket_width: u64) -> Self {
        let width = bucket_width.max(1);
        let mut buckets: BTreeMap<u64, Vec<&str>> = BTreeMap::new();

        for segment in segments {
            let key = segment.seconds / width * width;
            buckets.entry(key).or_default().push(segment.text.as_str());
        }

        let entries = buckets
            .into_iter()
            .map(|(start, texts)| TranscriptEntry {
                start,
                text: texts.join(" "),
            })
            .collect();

        Self {
            bucket_width: width,
            entries,
        }
    }

    pub fn bucket_width(&self) -> u64 {
        self.bucket_width
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_lines(&self, style: TimestampStyle) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| format!("[{}] {}", format_timestamp(entry.start, style), entry.text))
            .collect()
    }

    /// Newline-joined `[timestamp] text` lines
    pub fn render(&self, style: TimestampStyle) -> String {
        self.to_lines(style).join("\n")
    }
}

/// A transcript line parsed back out of rendered text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TranscriptLine {
    Entry { timestamp: String, text: String },
    Raw { raw: String },
}

impl TranscriptLine {
    pub fn start_seconds(&self) -> Option<u64> {
        match self {
            TranscriptLine::Entry { timestamp, .. } => parse_timestamp(timestamp),
            TranscriptLine::Raw { .. } => None,
        }
    }
}

fn transcript_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[(.+?)\]\s+(.+)$").expect("transcript line pattern is valid"))
}

/// Split rendered transcript text back into lines; blank lines are dropped
/// and lines without a bracketed timestamp are kept as `Raw`
pub fn parse_transcript_lines(rendered: &str) -> Vec<TranscriptLine> {
    rendered
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match transcript_line_regex().captures(line) {
            Some(captures) => TranscriptLine::Entry {
                timestamp: captures[1].to_string(),
                text: captures[2].to_string(),
            },
            None => TranscriptLine::Raw { raw: line.to_string() },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(seconds: u64, text: &str) -> CaptionSegment {
        CaptionSegment::new(seconds, text).unwrap()
    }

    #[test]
    fn test_parse_timestamp_examples() {
        assert_eq!(parse_timestamp("1:05"), Some(65));
        assert_eq!(parse_timestamp("0:00"), Some(0));
        assert_eq!(parse_timestamp("1:02:03"), Some(3723));
        assert_eq!(parse_timestamp(" 12:30 "), Some(750));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("5"), None);
        assert_eq!(parse_timestamp("a:bc"), None);
        assert_eq!(parse_timestamp("1:2:3:4"), None);
    }

    #[test]
    fn test_parse_timestamp_rejects_overflow() {
        assert_eq!(parse_timestamp("307445734561825861:00"), None);
        assert_eq!(parse_timestamp("5124095576030432:00:00"), None);
        assert_eq!(parse_timestamp(&format!("0:{}", u64::MAX)), Some(u64::MAX));
        assert_eq!(parse_timestamp(&format!("1:{}", u64::MAX)), None);
    }

    #[test]
    fn test_blank_segments_rejected() {
        assert!(CaptionSegment::new(3, "   ").is_none());
        assert_eq!(seg(3, "  hi ").text, "hi");
    }

    #[test]
    fn test_bucket_width_policy_boundaries() {
        let policy = BucketPolicy::default();
        assert_eq!(policy.width_for(1200.0), 60);
        assert_eq!(policy.width_for(1199.9), 30);
        assert_eq!(policy.width_for(480.0), 30);
        assert_eq!(policy.width_for(479.0), 15);
        assert_eq!(policy.width_for(90.0), 15);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0, TimestampStyle::Minutes), "0:00");
        assert_eq!(format_timestamp(65, TimestampStyle::Minutes), "1:05");
        assert_eq!(format_timestamp(3723, TimestampStyle::Minutes), "62:03");
        assert_eq!(format_timestamp(3723, TimestampStyle::Hours), "1:02:03");
        assert_eq!(format_timestamp(600, TimestampStyle::Hours), "10:00");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(307), "05:07");
        assert_eq!(format_duration(3723), "01:02:03");
        assert_eq!(format_duration(0), "00:00");
    }

    #[test]
    fn test_grouping_preserves_arrival_order() {
        let segments = vec![seg(12, "b"), seg(5, "a"), seg(14, "c"), seg(3, "z")];
        let doc = TranscriptDocument::from_segments(&segments, 10);
        assert_eq!(
            doc.entries(),
            &[
                TranscriptEntry { start: 0, text: "a z".to_string() },
                TranscriptEntry { start: 10, text: "b c".to_string() },
            ]
        );
    }

    #[test]
    fn test_every_segment_lands_in_one_bucket() {
        let segments: Vec<_> = (0..200u64).map(|i| seg(i * 7, &format!("w{}", i))).collect();
        let doc = TranscriptDocument::from_segments(&segments, 30);

        let words: usize = doc.entries().iter().map(|e| e.text.split(' ').count()).sum();
        assert_eq!(words, segments.len());

        for pair in doc.entries().windows(2) {
            assert!(pair[0].start < pair[1].start);
        }
        assert!(doc.entries().iter().all(|e| e.start % 30 == 0));
    }

    #[test]
    fn test_render_lines() {
        let doc = TranscriptDocument::from_segments(&[seg(5, "a"), seg(12, "b")], 10);
        assert_eq!(doc.render(TimestampStyle::Minutes), "[0:00] a\n[0:10] b");
    }

    #[test]
    fn test_rendered_lines_parse_back() {
        let segments = vec![seg(0, "intro"), seg(75, "middle part"), seg(4000, "late [bracket] text")];
        let doc = TranscriptDocument::from_segments(&segments, 15);

        for style in [TimestampStyle::Minutes, TimestampStyle::Hours] {
            let parsed = parse_transcript_lines(&doc.render(style));
            let pairs: Vec<(u64, String)> = parsed
                .iter()
                .map(|line| match line {
                    TranscriptLine::Entry { text, .. } => (line.start_seconds().unwrap(), text.clone()),
                    TranscriptLine::Raw { raw } => panic!("unexpected raw line {}", raw),
                })
                .collect();
            let expected: Vec<(u64, String)> = doc.entries().iter().map(|e| (e.start, e.text.clone())).collect();
            assert_eq!(pairs, expected);
        }
    }

    #[test]
    fn test_malformed_lines_become_raw() {
        let parsed = parse_transcript_lines("[0:00] ok\n\nno timestamp here\n[0:10]");
        assert_eq!(parsed.len(), 3);
        assert!(matches!(parsed[0], TranscriptLine::Entry { .. }));
        assert_eq!(parsed[1], TranscriptLine::Raw { raw: "no timestamp here".to_string() });
        assert_eq!(parsed[2], TranscriptLine::Raw { raw: "[0:10]".to_string() });
    }
}
