//! Upstream listing access
//!
//! This module talks to the paginated listing API:
//! - serde data model for the listing payload, tolerant of shape drift
//! - HTTP client construction with timeouts and compression
//! - one-page fetches that degrade to an empty page on any failure

mod client;
mod models;

pub use client::{build_http_client, ListingClient, PAGE_LIMIT};
pub use models::{
    Clip, ClipPage, ListingData, ListingEnvelope, MediaEmbed, PostData, Preview, RawPost,
    RedditVideo,
};
