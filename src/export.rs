/// Output documents and files
use crate::config::OutputFormat;
use crate::metadata::chapters::{parse_chapter_lines, render_chapters};
use crate::metadata::{ChapterLine, PageDetails};
use crate::transcript::{parse_transcript_lines, TimestampStyle, TranscriptDocument, TranscriptLine};
use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub video_title: String,
    pub video_url: String,
    pub video_id: String,
    pub channel_name: String,
    pub channel_url: String,
    pub duration: u64,
    pub duration_formatted: String,
    pub view_count: String,
    pub upload_date: String,
    pub like_count: String,
    pub extraction_date: String,
}

/// The JSON export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub metadata: ExportMetadata,
    pub description: String,
    pub chapters: Vec<ChapterLine>,
    pub transcript: Vec<TranscriptLine>,
    pub tags: Vec<String>,
}

impl ExportDocument {
    /// Chapter and transcript entries are parsed back out of their rendered
    /// text form, so the JSON mirrors exactly what the text export shows
    pub fn build(
        details: &PageDetails,
        transcript: &TranscriptDocument,
        style: TimestampStyle,
        video_url: &str,
        extracted_at: DateTime<Utc>,
    ) -> Self {
        let m = &details.metadata;
        Self {
            metadata: ExportMetadata {
                video_title: m.title.clone(),
                video_url: video_url.to_string(),
                video_id: m.video_id.clone(),
                channel_name: m.channel_name.clone(),
                channel_url: m.channel_url.clone(),
                duration: m.duration_seconds,
                duration_formatted: m.duration_formatted.clone(),
                view_count: m.view_count.clone(),
                upload_date: m.upload_date.clone(),
                like_count: m.like_count.clone(),
                extraction_date: extracted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
            description: details.description.clone(),
            chapters: parse_chapter_lines(&render_chapters(&details.chapters)),
            transcript: parse_transcript_lines(&transcript.render(style)),
            tags: details.tags.clone(),
        }
    }
}

/// Render the output file body
pub fn render(
    format: OutputFormat,
    details: &PageDetails,
    transcript: &TranscriptDocument,
    style: TimestampStyle,
    video_url: &str,
    extracted_at: DateTime<Utc>,
) -> Result<String> {
    match format {
        OutputFormat::Txt => Ok(transcript.render(style)),
        OutputFormat::Json => {
            let document = ExportDocument::build(details, transcript, style, video_url, extracted_at);
            Ok(serde_json::to_string_pretty(&document)?)
        }
    }
}

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9]+").expect("title pattern is valid"))
}

/// File-name-safe version of a video title
pub fn clean_title(title: &str, max_length: usize) -> String {
    let title = if title.trim().is_empty() { "youtube_video" } else { title };
    non_alphanumeric()
        .replace_all(title, "_")
        .chars()
        .take(max_length)
        .collect()
}

/// `transcript_<title>_<unix millis>.<ext>`
pub fn output_filename(title: &str, format: OutputFormat, max_title_length: usize, at: DateTime<Utc>) -> String {
    format!(
        "transcript_{}_{}.{}",
        clean_title(title, max_title_length),
        at.timestamp_millis(),
        format.extension()
    )
}

/// Write the rendered output into `dir`, creating it when needed
pub async fn save(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir).await?;
        info!("📁 Created directory: {}", dir.display());
    }
    let path = dir.join(filename);
    fs::write(&path, content).await?;
    info!("💾 Wrote {} characters to {}", content.chars().count(), path.display());
    Ok(path)
}
