use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use yt_transcript_rust::{
    Config, ExtractionSession, HtmlSnapshot, OutputFormat, SessionError, TokioDelay, WatchPageClient,
};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("YouTube Transcript Extractor (Rust)")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Extract bucketed transcripts, chapters and metadata from YouTube watch pages")
        .arg(
            Arg::new("html")
                .long("html")
                .value_name("FILE")
                .help("Saved watch page to extract from")
                .conflicts_with("html-dir")
        )
        .arg(
            Arg::new("html-dir")
                .long("html-dir")
                .value_name("DIR")
                .help("Directory of saved watch pages to extract from")
        )
        .arg(
            Arg::new("url")
                .short('u')
                .long("url")
                .value_name("URL")
                .help("Watch page URL; fetched unless --html is given")
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Output format: txt or json")
                .value_parser(["txt", "json"])
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory for transcript files")
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
        )
        .get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(Path::new(path))?,
        None => Config::load().unwrap_or_else(|_| Config::from_env()),
    };

    let level = if matches.get_flag("verbose") {
        "debug".to_string()
    } else {
        config.output.log_level.clone()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("yt_transcript_rust={},warn", level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Some(format) = matches.get_one::<String>("format").and_then(|f| OutputFormat::parse(f)) {
        config.output.format = format;
    }
    if let Some(dir) = matches.get_one::<String>("output-dir") {
        config.output.base_dir = PathBuf::from(dir);
    }
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        std::process::exit(1);
    }

    info!("🚀 YouTube Transcript Extractor (Rust) starting...");
    info!("{}", config.summary());

    let delay = TokioDelay;
    let session = ExtractionSession::new(&config, &delay);

    if let Some(dir) = matches.get_one::<String>("html-dir") {
        let (successful, failed) = run_directory(&session, Path::new(dir)).await;
        info!("✅ Successful: {}", successful);
        info!("❌ Failed: {}", failed);
        if successful == 0 && failed > 0 {
            std::process::exit(1);
        }
        return Ok(());
    }

    if let Err(e) = run_single(&session, &config, &matches).await {
        error!("{}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Extract one page: a saved file through its panel, or a fetched URL
/// through its caption tracks
async fn run_single(session: &ExtractionSession<'_>, config: &Config, matches: &ArgMatches) -> Result<(), SessionError> {
    let url = matches.get_one::<String>("url").cloned();

    let report = match (matches.get_one::<String>("html"), url) {
        (Some(file), url) => {
            let mut page = HtmlSnapshot::load(Path::new(file), url).await?;
            session.extract_page(&mut page).await?
        }
        (None, Some(url)) => {
            let client = WatchPageClient::new(&config.fetch)?;
            let html = client.fetch_page(&url).await?;
            let mut page = HtmlSnapshot::parse(&html, Some(url));
            session.extract_captions(&mut page, &client).await?
        }
        (None, None) => {
            return Err(SessionError::Output(anyhow::anyhow!(
                "Nothing to extract: pass --html, --html-dir or --url"
            )));
        }
    };

    let path = session.save(&report).await?;
    info!("🎉 Transcript saved: {}", path.display());
    Ok(())
}

/// Extract every saved `.html` page under `dir`, one after another
async fn run_directory(session: &ExtractionSession<'_>, dir: &Path) -> (usize, usize) {
    let pages: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
                .unwrap_or(false)
        })
        .collect();

    info!("📁 Found {} saved pages in {}", pages.len(), dir.display());

    let mut successful = 0;
    let mut failed = 0;
    for path in pages {
        let result = async {
            let mut page = HtmlSnapshot::load(&path, None).await?;
            let report = session.extract_page(&mut page).await?;
            Ok::<_, SessionError>(session.save(&report).await?)
        }
        .await;

        match result {
            Ok(saved) => {
                info!("✅ {} -> {}", path.display(), saved.display());
                successful += 1;
            }
            Err(e) => {
                warn!("❌ {}: {}", path.display(), e);
                failed += 1;
            }
        }
    }

    (successful, failed)
}
