/// Page access layer
///
/// The extractors never touch HTML directly: they query, click and scroll
/// through the `Page` trait and work on `ElementSnapshot`s, which are copies
/// taken at query time. Re-querying is the only way to observe a change.

pub mod snapshot;

pub use snapshot::HtmlSnapshot;

use crate::error::{ExtractionError, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Opaque reference to an element, valid for the page that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ElementHandle(pub usize);

/// Copy of an element taken at query time
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementSnapshot {
    pub handle: ElementHandle,
    pub tag: String,
    /// Full text content, untrimmed
    pub text: String,
    pub attributes: BTreeMap<String, String>,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn trimmed_text(&self) -> &str {
        self.text.trim()
    }

    pub fn aria_label(&self) -> Option<&str> {
        self.attr("aria-label")
    }
}

/// A rendered watch page the extractors can read and drive
pub trait Page {
    /// URL of the page, if known
    fn location(&self) -> Option<String>;

    /// All elements matching `selector`, in document order
    fn query_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>>;

    /// Descendants of `scope` matching `selector`, in document order
    fn query_within(&self, scope: ElementHandle, selector: &str) -> Result<Vec<ElementSnapshot>>;

    fn click(&mut self, element: ElementHandle) -> Result<()>;

    /// Scroll a container to its bottom edge so lazy content loads
    fn scroll_to_bottom(&mut self, element: ElementHandle) -> Result<()>;

    /// Playback duration of the video element in seconds
    fn media_duration(&self, video: ElementHandle) -> Option<f64>;

    fn query_first(&self, selector: &str) -> Result<Option<ElementSnapshot>> {
        Ok(self.query_all(selector)?.into_iter().next())
    }

    fn query_first_within(&self, scope: ElementHandle, selector: &str) -> Result<Option<ElementSnapshot>> {
        Ok(self.query_within(scope, selector)?.into_iter().next())
    }

    fn count(&self, selector: &str) -> Result<usize> {
        Ok(self.query_all(selector)?.len())
    }
}

/// Find `name = {...}` in a script body and parse the object that follows.
///
/// Accepts `var name =`, `window.name =` and `window["name"] =`. Parsing stops
/// at the end of the first JSON value, so trailing script is ignored.
pub fn embedded_json(script: &str, name: &str) -> Option<Value> {
    let pattern = format!(
        r#"(?:var\s+{0}|window\.{0}|window\[["']{0}["']\])\s*=\s*"#,
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    let start = re.find(script)?.end();
    let rest = &script[start..];
    if !rest.starts_with('{') {
        return None;
    }

    let mut values = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
    match values.next() {
        Some(Ok(value)) => Some(value),
        Some(Err(e)) => {
            debug!("Embedded {} is not valid JSON: {}", name, e);
            None
        }
        None => None,
    }
}

/// Search every script element on the page for an embedded JSON object
pub fn find_embedded_json<P: Page + ?Sized>(page: &P, script_selector: &str, name: &str) -> Result<Option<Value>> {
    for script in page.query_all(script_selector)? {
        if !script.text.contains(name) {
            continue;
        }
        if let Some(value) = embedded_json(&script.text, name) {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// Map a selector parse failure into the catch-all DOM error
pub(crate) fn bad_selector(selector: &str) -> ExtractionError {
    ExtractionError::dom(format!("invalid selector '{}'", selector))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_json_var_form() {
        let script = r#"var ytInitialPlayerResponse = {"a": {"b": "};"}};var meta = 1;"#;
        let value = embedded_json(script, "ytInitialPlayerResponse").unwrap();
        assert_eq!(value["a"]["b"], "};");
    }

    #[test]
    fn test_embedded_json_window_forms() {
        let dotted = r#"window.ytInitialData = {"x": 1};"#;
        assert_eq!(embedded_json(dotted, "ytInitialData").unwrap()["x"], 1);

        let bracket = r#"window["ytInitialData"] = {"x": 2};"#;
        assert_eq!(embedded_json(bracket, "ytInitialData").unwrap()["x"], 2);
    }

    #[test]
    fn test_embedded_json_missing() {
        assert!(embedded_json("var other = {};", "ytInitialData").is_none());
        assert!(embedded_json("var ytInitialData = null;", "ytInitialData").is_none());
    }
}
