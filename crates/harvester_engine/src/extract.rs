use std::collections::BTreeSet;

use engine_logging::engine_trace;
use harvester_core::{Heading, HeadingLevel};
use scraper::{Html, Selector};

pub trait HeadingExtractor: Send + Sync {
    fn extract(&self, html: &str, levels: &BTreeSet<HeadingLevel>) -> Vec<Heading>;
}

/// Extracts headings with `scraper`'s html5ever parser, which recovers from
/// any malformed input instead of failing.
///
/// Output is grouped by level: every requested `h1` (in document order),
/// then every `h2`, and so on. Headings whose collapsed text is empty are
/// skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScraperHeadingExtractor;

impl HeadingExtractor for ScraperHeadingExtractor {
    fn extract(&self, html: &str, levels: &BTreeSet<HeadingLevel>) -> Vec<Heading> {
        let doc = Html::parse_document(html);
        if !doc.errors.is_empty() {
            engine_trace!("html parser recovered from {} errors", doc.errors.len());
        }

        let mut headings = Vec::new();
        for &level in levels {
            let Ok(selector) = Selector::parse(level.tag_name()) else {
                continue;
            };
            headings.extend(doc.select(&selector).filter_map(|element| {
                let text: String = element.text().collect();
                Heading::new(level, &text)
            }));
        }
        headings
    }
}
