use std::collections::BTreeSet;

use serde::Deserialize;

use crate::{HeadingLevel, ParseLevelError};

/// Request-level failures. These reject the whole request, as opposed to
/// per-URL failures which become [`crate::UrlOutcome::Failure`] entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("URLs are required")]
    MissingUrls,
    #[error(transparent)]
    InvalidHeadingLevel(#[from] ParseLevelError),
    #[error("malformed request: {0}")]
    Malformed(String),
}

/// Canonical input to a harvest: raw URLs in caller order plus the set of
/// heading levels to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestRequest {
    urls: Vec<String>,
    heading_levels: BTreeSet<HeadingLevel>,
}

impl HarvestRequest {
    /// Builds a request for all six heading levels. Fails when `urls` is empty.
    pub fn new(urls: Vec<String>) -> Result<Self, RequestError> {
        if urls.is_empty() {
            return Err(RequestError::MissingUrls);
        }
        Ok(Self {
            urls,
            heading_levels: HeadingLevel::ALL.into_iter().collect(),
        })
    }

    /// Restricts extraction to `levels`. An empty set keeps all six.
    pub fn with_levels(mut self, levels: impl IntoIterator<Item = HeadingLevel>) -> Self {
        let levels: BTreeSet<_> = levels.into_iter().collect();
        if !levels.is_empty() {
            self.heading_levels = levels;
        }
        self
    }

    /// Parses a JSON body of the form
    /// `{"urls": [..] | "..", "url": [..] | "..", "heading_types": [..] | ".."}`.
    pub fn from_json(body: &str) -> Result<Self, RequestError> {
        let raw: RawHarvestRequest =
            serde_json::from_str(body).map_err(|err| RequestError::Malformed(err.to_string()))?;
        Self::try_from(raw)
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn heading_levels(&self) -> &BTreeSet<HeadingLevel> {
        &self.heading_levels
    }
}

/// Loosely shaped request as callers send it: any list may also be a single
/// value, and URLs may arrive under `urls` or `url`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHarvestRequest {
    #[serde(default)]
    urls: Option<OneOrMany<String>>,
    #[serde(default)]
    url: Option<OneOrMany<String>>,
    #[serde(default)]
    heading_types: Option<OneOrMany<LevelToken>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum LevelToken {
    Number(u64),
    Text(String),
}

impl LevelToken {
    fn into_level(self) -> Result<Option<HeadingLevel>, ParseLevelError> {
        match self {
            LevelToken::Number(n) => u8::try_from(n)
                .ok()
                .and_then(HeadingLevel::from_number)
                .map(Some)
                .ok_or_else(|| ParseLevelError {
                    input: n.to_string(),
                }),
            LevelToken::Text(text) if text.trim().is_empty() => Ok(None),
            LevelToken::Text(text) => text.parse().map(Some),
        }
    }
}

/// A single blank string counts as absent, like an empty list.
fn non_empty_urls(value: Option<OneOrMany<String>>) -> Option<Vec<String>> {
    match value? {
        OneOrMany::One(url) if url.trim().is_empty() => None,
        other => Some(other.into_vec()).filter(|urls| !urls.is_empty()),
    }
}

impl TryFrom<RawHarvestRequest> for HarvestRequest {
    type Error = RequestError;

    fn try_from(raw: RawHarvestRequest) -> Result<Self, Self::Error> {
        let urls = non_empty_urls(raw.urls)
            .or_else(|| non_empty_urls(raw.url))
            .ok_or(RequestError::MissingUrls)?;
        let levels = match raw.heading_types {
            Some(tokens) => parse_level_tokens(tokens.into_vec())?,
            None => BTreeSet::new(),
        };
        Ok(HarvestRequest::new(urls)?.with_levels(levels))
    }
}

fn parse_level_tokens(tokens: Vec<LevelToken>) -> Result<BTreeSet<HeadingLevel>, ParseLevelError> {
    let mut levels = BTreeSet::new();
    for token in tokens {
        if let Some(level) = token.into_level()? {
            levels.insert(level);
        }
    }
    Ok(levels)
}

/// Parses heading level names such as `h1`, `H2` or `3`. Items may also be
/// comma separated lists (`h1,h2`).
pub fn parse_levels<I, S>(items: I) -> Result<BTreeSet<HeadingLevel>, RequestError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut levels = BTreeSet::new();
    for item in items {
        for part in item.as_ref().split(',').filter(|p| !p.trim().is_empty()) {
            levels.insert(part.parse::<HeadingLevel>()?);
        }
    }
    Ok(levels)
}

/// Splits pasted text into URLs: one per line, trimmed, blank lines dropped.
pub fn parse_url_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
