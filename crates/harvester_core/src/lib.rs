//! Harvester core: pure data model for heading harvests.
//!
//! Nothing in this crate performs IO. The engine crate fetches pages and
//! produces the types defined here; front ends shape their input into a
//! [`HarvestRequest`] and serialize the resulting [`HarvestResult`].
mod heading;
mod level;
mod normalize;
mod outcome;
mod request;

pub use heading::{collapse_whitespace, Heading};
pub use level::{HeadingLevel, ParseLevelError};
pub use normalize::normalize_url;
pub use outcome::{HarvestResult, UrlOutcome};
pub use request::{parse_levels, parse_url_lines, HarvestRequest, RawHarvestRequest, RequestError};
