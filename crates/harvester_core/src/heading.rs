use serde::Serialize;

use crate::HeadingLevel;

/// A heading found on a page. The text is whitespace-collapsed and never
/// empty; [`Heading::new`] is the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Heading {
    #[serde(rename = "type")]
    level: HeadingLevel,
    text: String,
}

impl Heading {
    /// Normalizes `raw_text` and returns `None` when nothing is left.
    pub fn new(level: HeadingLevel, raw_text: &str) -> Option<Self> {
        let text = collapse_whitespace(raw_text);
        if text.is_empty() {
            return None;
        }
        Some(Self { level, text })
    }

    pub fn level(&self) -> HeadingLevel {
        self.level
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Collapses every whitespace run (newlines included) to one space and trims
/// both ends.
pub fn collapse_whitespace(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
