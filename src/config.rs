use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::polling::PollPolicy;
use crate::transcript::{BucketPolicy, TimestampStyle};

/// Configuration for the transcript extractor
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Poll budgets and delays for driving the page
    pub extraction: ExtractionConfig,

    /// Bucket width thresholds and timestamp style
    pub bucketing: BucketPolicy,

    /// Output file settings
    pub output: OutputConfig,

    /// HTTP settings for fetching pages and caption tracks
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Wait before looking for transcript controls on a fresh page (ms)
    pub page_ready_delay_ms: u64,

    /// Polls after clicking a transcript control
    pub panel_poll_attempts: u32,

    /// Delay between those polls (ms)
    pub panel_poll_interval_ms: u64,

    /// Wait after opening the overflow menu (ms)
    pub menu_open_delay_ms: u64,

    /// Last-chance polls once every control has been tried
    pub settle_poll_attempts: u32,

    /// Delay between last-chance polls (ms)
    pub settle_poll_interval_ms: u64,

    /// Maximum scroll rounds while loading segments
    pub scroll_max_attempts: u32,

    /// Delay after each scroll (ms)
    pub scroll_interval_ms: u64,

    /// Consecutive unchanged segment counts that end scrolling
    pub scroll_stable_checks: u32,

    /// Wait after expanding the description (ms)
    pub description_expand_delay_ms: u64,

    /// Duration assumed when the page does not report one (seconds)
    pub default_duration_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Txt,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Txt => "txt",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "txt" | "text" => Some(OutputFormat::Txt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the transcript files are written to
    pub base_dir: PathBuf,

    /// Output format
    pub format: OutputFormat,

    /// Maximum length of the title part of a file name
    pub max_title_length: usize,

    /// Log level used when RUST_LOG is not set
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Caption language to prefer when several tracks exist
    pub preferred_language: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            page_ready_delay_ms: 1000,
            panel_poll_attempts: 15,
            panel_poll_interval_ms: 300,
            menu_open_delay_ms: 500,
            settle_poll_attempts: 20,
            settle_poll_interval_ms: 500,
            scroll_max_attempts: 60,
            scroll_interval_ms: 150,
            scroll_stable_checks: 4,
            description_expand_delay_ms: 500,
            default_duration_seconds: 600.0,
        }
    }
}

impl ExtractionConfig {
    pub fn panel_poll(&self) -> PollPolicy {
        PollPolicy::new(self.panel_poll_attempts, self.panel_poll_interval_ms)
    }

    pub fn settle_poll(&self) -> PollPolicy {
        PollPolicy::new(self.settle_poll_attempts, self.settle_poll_interval_ms)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./output"),
            format: OutputFormat::Json,
            max_title_length: 50,
            log_level: "info".to_string(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            preferred_language: "en".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the first config file found, then apply
    /// environment overrides
    pub fn load() -> Result<Self> {
        let mut config_paths = vec![
            PathBuf::from("yt-transcript.toml"),
            PathBuf::from("config/yt-transcript.toml"),
        ];
        if let Ok(home) = std::env::var("HOME") {
            config_paths.push(PathBuf::from(home).join(".config/yt-transcript/config.toml"));
        }

        for path in &config_paths {
            if !path.exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => return Ok(config.with_env_overrides()),
                Err(e) => tracing::warn!("Failed to parse config file {}: {}", path.display(), e),
            }
        }

        Err(anyhow!("No configuration file found"))
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Cannot read config {}: {}", path.display(), e))?;
        let config: Config = toml::from_str(&config_str)?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(format) = std::env::var("YT_TRANSCRIPT_FORMAT") {
            match OutputFormat::parse(&format) {
                Some(format) => self.output.format = format,
                None => tracing::warn!("Ignoring unknown YT_TRANSCRIPT_FORMAT '{}'", format),
            }
        }

        if let Ok(output_dir) = std::env::var("YT_TRANSCRIPT_OUTPUT_DIR") {
            self.output.base_dir = PathBuf::from(output_dir);
        }

        if let Ok(log_level) = std::env::var("YT_TRANSCRIPT_LOG_LEVEL") {
            self.output.log_level = log_level;
        }

        if let Ok(language) = std::env::var("YT_TRANSCRIPT_LANGUAGE") {
            self.fetch.preferred_language = language;
        }

        self
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let b = &self.bucketing;
        if b.long_width == 0 || b.medium_width == 0 || b.short_width == 0 {
            return Err(anyhow!("bucket widths must be greater than 0"));
        }
        if b.medium_threshold_seconds > b.long_threshold_seconds {
            return Err(anyhow!("medium_threshold_seconds must not exceed long_threshold_seconds"));
        }

        if self.extraction.panel_poll_attempts == 0 {
            return Err(anyhow!("panel_poll_attempts must be greater than 0"));
        }
        if self.extraction.scroll_stable_checks == 0 {
            return Err(anyhow!("scroll_stable_checks must be greater than 0"));
        }
        if !(self.extraction.default_duration_seconds > 0.0) {
            return Err(anyhow!("default_duration_seconds must be positive"));
        }

        if self.output.max_title_length == 0 {
            return Err(anyhow!("max_title_length must be greater than 0"));
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Transcript Extractor Configuration:\n\
            - Output Format: {:?}\n\
            - Output Directory: {}\n\
            - Bucket Widths: {}s / {}s / {}s\n\
            - Timestamp Style: {:?}\n\
            - Panel Poll: {} x {}ms\n\
            - Preferred Language: {}",
            self.output.format,
            self.output.base_dir.display(),
            self.bucketing.long_width,
            self.bucketing.medium_width,
            self.bucketing.short_width,
            self.bucketing.timestamp_style,
            self.extraction.panel_poll_attempts,
            self.extraction.panel_poll_interval_ms,
            self.fetch.preferred_language
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.config.output.format = format;
        self
    }

    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output.base_dir = dir;
        self
    }

    pub fn with_short_bucket_width(mut self, width: u64) -> Self {
        self.config.bucketing.short_width = width;
        self
    }

    pub fn with_timestamp_style(mut self, style: TimestampStyle) -> Self {
        self.config.bucketing.timestamp_style = style;
        self
    }

    pub fn with_panel_poll(mut self, attempts: u32, interval_ms: u64) -> Self {
        self.config.extraction.panel_poll_attempts = attempts;
        self.config.extraction.panel_poll_interval_ms = interval_ms;
        self
    }

    pub fn with_preferred_language(mut self, language: &str) -> Self {
        self.config.fetch.preferred_language = language.to_string();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
