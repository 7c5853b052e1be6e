//! Harvester engine: fetches pages and extracts their headings.
mod decode;
mod engine;
mod extract;
mod fetch;
mod harvest;
mod types;

pub use decode::{decode_body, DecodedBody};
pub use engine::{EngineError, EngineHandle};
pub use extract::{HeadingExtractor, ScraperHeadingExtractor};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher, DEFAULT_USER_AGENT};
pub use harvest::{
    EngineConfig, Harvester, NullProgressSink, ProgressSink, DEFAULT_MAX_CONCURRENCY,
};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput, HarvestEvent};
