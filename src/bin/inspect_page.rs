use anyhow::{anyhow, Result};
use std::path::PathBuf;
use tracing::info;
use yt_transcript_rust::metadata::{page_duration, MetadataExtractor};
use yt_transcript_rust::transcript::timedtext::PlayerResponse;
use yt_transcript_rust::{Config, HtmlSnapshot, NoDelay, Page, SelectorTable};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("yt_transcript_rust=info,inspect_page=info")
        .init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: inspect-page <saved-page.html>"))?;

    info!("🔍 Inspecting saved page: {}", path.display());
    let page = HtmlSnapshot::load(&path, None).await?;
    let selectors = SelectorTable::default();
    let config = Config::default();

    info!("🌐 Location: {}", page.location().unwrap_or_else(|| "unknown".to_string()));

    // Transcript panel lookups
    info!("📜 Transcript panel:");
    for (name, selector) in [
        ("video", selectors.video),
        ("segment", selectors.segment),
        ("segment timestamp", selectors.segment_timestamp),
        ("segment text", selectors.segment_text),
        ("duration meta", selectors.duration_meta),
        ("keywords meta", selectors.keywords_meta),
    ] {
        info!("   - {:<18} {:>4} matches  ({})", name, page.count(selector)?, selector);
    }
    for selector in selectors.segment_containers {
        info!("   - {:<18} {:>4} matches  ({})", "container", page.count(selector)?, selector);
    }

    let buttons = page.query_all(selectors.buttons)?;
    let toggles = buttons
        .iter()
        .filter(|b| {
            b.aria_label()
                .map(|label| {
                    let label = label.trim().to_lowercase();
                    selectors.transcript_labels.iter().any(|wanted| *wanted == label)
                })
                .unwrap_or(false)
        })
        .count();
    let overflow = buttons
        .iter()
        .filter(|b| b.aria_label() == Some(selectors.more_actions_label))
        .count();
    info!("   - {} buttons, {} transcript toggles, {} overflow menus", buttons.len(), toggles, overflow);

    // Metadata probes
    info!("📋 Metadata probes:");
    let delay = NoDelay::new();
    let extractor = MetadataExtractor::new(&config.extraction, &selectors, &delay);
    let location = page.location();
    for (field, probes) in selectors.field_probes() {
        for (i, probe) in probes.iter().enumerate() {
            let single = std::slice::from_ref(probe);
            match extractor.probe_field(&page, single, location.as_deref()) {
                Some(value) => info!("   ✅ {}[{}] {:?} -> {}", field, i, probe, value),
                None => info!("   ❌ {}[{}] {:?}", field, i, probe),
            }
        }
    }

    // Embedded data
    info!("🧩 Embedded data:");
    match PlayerResponse::from_page(&page, selectors.scripts) {
        Ok(player) => {
            info!("   - player response found, {} caption tracks", player.caption_tracks().len());
            for track in player.caption_tracks() {
                info!("     • {} {:?}", track.language_code, track.kind);
            }
        }
        Err(e) => info!("   - {}", e),
    }

    match page_duration(&page, &selectors, config.extraction.default_duration_seconds)? {
        Some(seconds) => info!("⏱️  Duration: {}s", seconds),
        None => info!("⏱️  No video element"),
    }

    Ok(())
}
