/// Every CSS selector and UI label the extractors rely on.
///
/// The watch page markup changes often; keeping the lookups in one table means
/// a layout change is fixed here instead of across the extractors.

/// One way of reading a string field off the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Trimmed text content of the first match
    Text(&'static str),
    /// Attribute value of the first match
    Attribute(&'static str, &'static str),
    /// `href` of the first match, resolved against the page URL
    Link(&'static str),
    /// `content` of a `<meta>` tag
    Meta(&'static str),
}

/// Selector lookup table for the watch page
#[derive(Debug, Clone)]
pub struct SelectorTable {
    pub video: &'static str,
    pub segment: &'static str,
    pub segment_timestamp: &'static str,
    pub segment_text: &'static str,
    pub segment_containers: &'static [&'static str],
    pub buttons: &'static str,
    pub menu_items: &'static str,

    /// Exact (lowercased) labels of the transcript toggle
    pub transcript_labels: &'static [&'static str],
    pub more_actions_label: &'static str,
    pub show_transcript_text: &'static str,

    pub title: &'static [Probe],
    pub channel_name: &'static [Probe],
    pub channel_url: &'static [Probe],
    pub view_count: &'static [Probe],
    pub upload_date: &'static [Probe],
    pub like_count: &'static [Probe],

    pub description: &'static [&'static str],
    pub description_expand: &'static [&'static str],

    pub chapter_regions: &'static [&'static str],
    pub chapter_time: &'static str,
    pub chapter_title: &'static str,

    pub keywords_meta: &'static str,
    pub duration_meta: &'static str,
    pub scripts: &'static str,
}

impl Default for SelectorTable {
    fn default() -> Self {
        Self {
            video: "video",
            segment: "ytd-transcript-segment-renderer",
            segment_timestamp: ".segment-timestamp",
            segment_text: ".segment-text",
            segment_containers: &[
                "#segments-container",
                "ytd-transcript-segment-list-renderer #segments-container",
                "[id=\"segments-container\"]",
                "ytd-engagement-panel-section-list-renderer[target-id=\"engagement-panel-searchable-transcript\"] #content",
            ],
            buttons: "button",
            menu_items: "button, ytd-menu-service-item-renderer",

            transcript_labels: &["transcript", "show transcript"],
            more_actions_label: "More actions",
            show_transcript_text: "show transcript",

            title: &[
                Probe::Text("h1.ytd-watch-metadata yt-formatted-string"),
                Probe::Text("h1.title"),
                Probe::Meta("title"),
                Probe::Meta("og:title"),
            ],
            channel_name: &[
                Probe::Text("ytd-channel-name#channel-name yt-formatted-string a"),
                Probe::Text("#channel-name a"),
                Probe::Attribute("span[itemprop=\"author\"] link[itemprop=\"name\"]", "content"),
            ],
            channel_url: &[
                Probe::Link("ytd-channel-name#channel-name yt-formatted-string a"),
                Probe::Link("#channel-name a"),
                Probe::Link("span[itemprop=\"author\"] link[itemprop=\"url\"]"),
            ],
            view_count: &[
                Probe::Text("ytd-video-view-count-renderer .view-count"),
                Probe::Text("#info span.view-count"),
                Probe::Attribute("meta[itemprop=\"interactionCount\"]", "content"),
            ],
            upload_date: &[
                Probe::Text("#info-strings yt-formatted-string"),
                Probe::Text("#date yt-formatted-string"),
                Probe::Attribute("meta[itemprop=\"uploadDate\"]", "content"),
                Probe::Attribute("meta[itemprop=\"datePublished\"]", "content"),
            ],
            like_count: &[
                Probe::Attribute("like-button-view-model button[aria-label*=\"like\"]", "aria-label"),
                Probe::Attribute("ytd-toggle-button-renderer.ytd-menu-renderer button", "aria-label"),
            ],

            description: &[
                "#description-inline-expander yt-attributed-string span",
                "#description yt-formatted-string",
                "ytd-text-inline-expander #content",
            ],
            description_expand: &[
                "#description-inline-expander tp-yt-paper-button#expand",
                "#description tp-yt-paper-button#more",
            ],

            chapter_regions: &[
                "ytd-macro-markers-list-item-renderer",
                "#structured-description ytd-horizontal-card-list-renderer ytd-macro-markers-list-item-renderer",
            ],
            chapter_time: "#time",
            chapter_title: "#details h4",

            keywords_meta: "meta[name=\"keywords\"]",
            duration_meta: "meta[itemprop=\"duration\"]",
            scripts: "script",
        }
    }
}

impl SelectorTable {
    /// All field probes by name, used by the page inspector
    pub fn field_probes(&self) -> Vec<(&'static str, &'static [Probe])> {
        vec![
            ("title", self.title),
            ("channel_name", self.channel_name),
            ("channel_url", self.channel_url),
            ("view_count", self.view_count),
            ("upload_date", self.upload_date),
            ("like_count", self.like_count),
        ]
    }
}
