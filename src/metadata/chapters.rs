/// Chapter markers listed on the watch page
use crate::error::Result;
use crate::page::Page;
use crate::selectors::SelectorTable;
use crate::transcript::parse_timestamp;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use tracing::debug;

/// A named point in the video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Timestamp as shown on the page, e.g. `12:30`
    pub timestamp: String,
    pub title: String,
}

impl Chapter {
    pub fn start_seconds(&self) -> Option<u64> {
        parse_timestamp(&self.timestamp)
    }
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.timestamp, self.title)
    }
}

/// Read chapters from the first page region that yields any.
///
/// Entries missing either the time or the title element are skipped.
pub fn extract_chapters<P: Page + ?Sized>(page: &P, selectors: &SelectorTable) -> Result<Vec<Chapter>> {
    for region in selectors.chapter_regions {
        let mut chapters = Vec::new();

        for item in page.query_all(region)? {
            let time = page.query_first_within(item.handle, selectors.chapter_time)?;
            let title = page.query_first_within(item.handle, selectors.chapter_title)?;

            match (time, title) {
                (Some(time), Some(title)) => chapters.push(Chapter {
                    timestamp: time.trimmed_text().to_string(),
                    title: title.trimmed_text().to_string(),
                }),
                _ => debug!("Skipping partial chapter entry #{}", item.handle.0),
            }
        }

        if !chapters.is_empty() {
            debug!("Found {} chapters via '{}'", chapters.len(), region);
            return Ok(chapters);
        }
    }

    Ok(Vec::new())
}

/// `timestamp - title` lines, newline separated
pub fn render_chapters(chapters: &[Chapter]) -> String {
    chapters
        .iter()
        .map(Chapter::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A chapter line parsed back out of rendered text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChapterLine {
    Entry { timestamp: String, title: String },
    Raw { raw: String },
}

fn chapter_line_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?)\s+-\s+(.+)$").expect("chapter line pattern is valid"))
}

pub fn parse_chapter_lines(rendered: &str) -> Vec<ChapterLine> {
    rendered
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| match chapter_line_regex().captures(line) {
            Some(captures) => ChapterLine::Entry {
                timestamp: captures[1].to_string(),
                title: captures[2].to_string(),
            },
            None => ChapterLine::Raw { raw: line.to_string() },
        })
        .collect()
}
