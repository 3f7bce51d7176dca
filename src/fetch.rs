/// HTTP access to watch pages and caption tracks
use crate::config::FetchConfig;
use crate::error::ExtractionError;
use crate::transcript::timedtext::{self, CaptionTrack};
use crate::transcript::CaptionSegment;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error(transparent)]
    Captions(#[from] ExtractionError),
}

#[derive(Clone)]
pub struct WatchPageClient {
    client: Client,
    timeout: Duration,
}

impl WatchPageClient {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client, timeout })
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {} (timeout {:?})", url, self.timeout);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    /// Download the HTML of a watch page
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        info!("🌐 Fetching watch page: {}", url);
        let html = self.get_text(url).await?;
        info!("📄 Downloaded {} bytes", html.len());
        Ok(html)
    }

    /// Download a caption track and parse it into segments
    pub async fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<CaptionSegment>, FetchError> {
        let url = json3_url(&track.base_url);
        info!("💬 Fetching '{}' captions", track.language_code);
        let body = self.get_text(&url).await?;
        Ok(timedtext::parse_caption_body(&body)?)
    }
}

/// Ask the timed-text endpoint for json3 output
fn json3_url(base_url: &str) -> String {
    if base_url.contains("fmt=") {
        base_url.to_string()
    } else if base_url.contains('?') {
        format!("{}&fmt=json3", base_url)
    } else {
        format!("{}?fmt=json3", base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json3_url() {
        assert_eq!(json3_url("https://a.test/tt?v=1"), "https://a.test/tt?v=1&fmt=json3");
        assert_eq!(json3_url("https://a.test/tt"), "https://a.test/tt?fmt=json3");
        assert_eq!(json3_url("https://a.test/tt?fmt=srv3"), "https://a.test/tt?fmt=srv3");
    }

    #[tokio::test]
    async fn test_invalid_user_agent_is_an_error() {
        let config = FetchConfig {
            user_agent: "broken\nagent".to_string(),
            ..FetchConfig::default()
        };
        assert!(matches!(WatchPageClient::new(&config), Err(FetchError::Http(_))));
        assert!(WatchPageClient::new(&FetchConfig::default()).is_ok());
    }
}
