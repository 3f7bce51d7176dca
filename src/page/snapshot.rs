/// Static HTML snapshot of a watch page
use super::{bad_selector, find_embedded_json, ElementHandle, ElementSnapshot, Page};
use crate::error::Result;
use crate::selectors::SelectorTable;
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Read-only page backed by a parsed HTML document.
///
/// The document never changes, so clicks and scrolls are recorded and
/// otherwise ignored. A page saved with the transcript panel open already
/// carries its segments; a page saved with it closed will not grow any.
pub struct HtmlSnapshot {
    document: Html,
    selectors: SelectorTable,
    /// Element node per handle, in document order
    nodes: Vec<NodeId>,
    handles: HashMap<NodeId, ElementHandle>,
    location: Option<String>,
    clicks: Vec<ElementHandle>,
    scrolls: Vec<ElementHandle>,
}

impl HtmlSnapshot {
    /// Parse a page. Without an explicit location the page's canonical link
    /// (or `og:url`) is used, which saved watch pages carry.
    pub fn parse(html: &str, location: Option<String>) -> Self {
        let document = Html::parse_document(html);
        let nodes: Vec<NodeId> = document
            .tree
            .root()
            .descendants()
            .filter_map(ElementRef::wrap)
            .map(|element| element.id())
            .collect();
        let handles = nodes
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, ElementHandle(i)))
            .collect();
        debug!("Indexed {} elements", nodes.len());

        let mut page = Self {
            document,
            selectors: SelectorTable::default(),
            nodes,
            handles,
            location: None,
            clicks: Vec::new(),
            scrolls: Vec::new(),
        };
        page.location = location.or_else(|| page.canonical_url());
        page
    }

    /// Use a different lookup table for the duration meta tag and scripts
    pub fn with_selectors(mut self, selectors: SelectorTable) -> Self {
        self.selectors = selectors;
        self
    }

    fn canonical_url(&self) -> Option<String> {
        let lookups = [
            ("link[rel=\"canonical\"]", "href"),
            ("meta[property=\"og:url\"]", "content"),
        ];
        lookups.iter().find_map(|(selector, attr)| {
            let element = self.query_first(selector).ok()??;
            element
                .attr(attr)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
    }

    /// Load a saved page from disk
    pub async fn load(path: &Path, location: Option<String>) -> anyhow::Result<Self> {
        let html = tokio::fs::read_to_string(path).await?;
        info!("📄 Loaded page snapshot: {} ({} bytes)", path.display(), html.len());
        Ok(Self::parse(&html, location))
    }

    /// Elements clicked so far, in order
    pub fn clicks(&self) -> &[ElementHandle] {
        &self.clicks
    }

    pub fn scrolls(&self) -> &[ElementHandle] {
        &self.scrolls
    }

    fn selector(selector: &str) -> Result<Selector> {
        Selector::parse(selector).map_err(|_| bad_selector(selector))
    }

    fn element(&self, handle: ElementHandle) -> Option<ElementRef<'_>> {
        let id = *self.nodes.get(handle.0)?;
        self.document.tree.get(id).and_then(ElementRef::wrap)
    }

    fn snapshots<'a>(&'a self, matches: impl Iterator<Item = ElementRef<'a>>) -> Vec<ElementSnapshot> {
        matches
            .filter_map(|element| {
                let handle = *self.handles.get(&element.id())?;
                Some(ElementSnapshot {
                    handle,
                    tag: element.value().name().to_string(),
                    text: element.text().collect::<String>(),
                    attributes: element
                        .value()
                        .attrs()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                })
            })
            .collect()
    }
}

impl Page for HtmlSnapshot {
    fn location(&self) -> Option<String> {
        self.location.clone()
    }

    fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>> {
        let parsed = Self::selector(selector)?;
        Ok(self.snapshots(self.document.select(&parsed)))
    }

    fn query_within(&self, scope: ElementHandle, selector: &str) -> Result<Vec<ElementSnapshot>> {
        let parsed = Self::selector(selector)?;
        match self.element(scope) {
            Some(element) => Ok(self.snapshots(element.select(&parsed))),
            None => Ok(Vec::new()),
        }
    }

    fn click(&mut self, element: ElementHandle) -> Result<()> {
        debug!("Snapshot click recorded on element #{}", element.0);
        self.clicks.push(element);
        Ok(())
    }

    fn scroll_to_bottom(&mut self, element: ElementHandle) -> Result<()> {
        self.scrolls.push(element);
        Ok(())
    }

    fn media_duration(&self, video: ElementHandle) -> Option<f64> {
        // A saved page has no live media element, so fall back to what the
        // server embedded about the video.
        if let Some(element) = self.element(video) {
            for attr in ["duration", "data-duration"] {
                if let Some(seconds) = element.value().attr(attr).and_then(|v| v.trim().parse::<f64>().ok()) {
                    if seconds.is_finite() && seconds > 0.0 {
                        return Some(seconds);
                    }
                }
            }
        }

        if let Ok(Some(meta)) = self.query_first(self.selectors.duration_meta) {
            if let Some(seconds) = meta.attr("content").and_then(parse_iso8601_duration) {
                return Some(seconds as f64);
            }
        }

        let response = find_embedded_json(self, self.selectors.scripts, "ytInitialPlayerResponse").ok()??;
        let length = &response["videoDetails"]["lengthSeconds"];
        length
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| length.as_f64())
    }
}

/// Parse an ISO-8601 duration such as `PT1H2M3S` into whole seconds
pub fn parse_iso8601_duration(value: &str) -> Option<u64> {
    let re = regex::Regex::new(r"^P(?:(\d+)D)?T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)S)?$").ok()?;
    let captures = re.captures(value.trim())?;
    let part = |i: usize| -> u64 {
        captures
            .get(i)
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(0)
    };
    part(1)
        .checked_mul(86_400)?
        .checked_add(part(2).checked_mul(3600)?)?
        .checked_add(part(3).checked_mul(60)?)?
        .checked_add(part(4))
}
