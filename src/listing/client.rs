//! Listing HTTP client
//!
//! Fetches one page of the upstream listing at a time. The upstream is
//! best-effort: transport failures, non-2xx statuses and unparsable payloads
//! all degrade to an empty page instead of surfacing an error, so a bad round
//! never breaks the feed pipeline.

use reqwest::Client;
use std::time::Duration;
use url::Url;

use crate::listing::{Clip, ClipPage, ListingEnvelope};
use crate::settings::SortMode;

/// Fixed maximum page width requested from the upstream listing
pub const PAGE_LIMIT: u32 = 100;

const USER_AGENT: &str = concat!("clipstream/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client used for all listing requests
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Client for the paginated upstream listing API
pub struct ListingClient {
    http: Client,
    base_url: Url,
}

impl ListingClient {
    /// Creates a listing client against the given base URL
    ///
    /// # Arguments
    ///
    /// * `http` - The HTTP client to use
    /// * `base_url` - Upstream origin, e.g. `https://www.reddit.com`
    pub fn new(http: Client, base_url: &str) -> Result<Self, url::ParseError> {
        let base_url = Url::parse(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Fetches one page of the listing
    ///
    /// Maps every raw post through the media resolver and returns all of them,
    /// including currently-unplayable ones tagged with `src = None`; filtering
    /// happens one level up. The original `required` count is carried along so
    /// the caller knows how many valid items this round was meant to produce.
    ///
    /// On transport failure, non-2xx response or unparsable payload this
    /// returns `ClipPage::empty(required)` - no error crosses this boundary.
    ///
    /// # Arguments
    ///
    /// * `source` - The source selector (subreddit name)
    /// * `sort` - Listing sort order
    /// * `after` - Pagination cursor of the last-seen item, if any
    /// * `required` - How many valid items the caller still needs
    pub async fn fetch_page(
        &self,
        source: &str,
        sort: SortMode,
        after: Option<&str>,
        required: u32,
    ) -> ClipPage {
        let url = match self.listing_url(source, sort, after) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("failed to build listing URL for r/{}: {}", source, e);
                return ClipPage::empty(required);
            }
        };

        tracing::debug!("fetching {}", url);

        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("listing request failed: {}", e);
                return ClipPage::empty(required);
            }
        };

        if !response.status().is_success() {
            tracing::debug!("listing returned HTTP {}", response.status());
            return ClipPage::empty(required);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("failed to read listing body: {}", e);
                return ClipPage::empty(required);
            }
        };

        let envelope: ListingEnvelope = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!("unparsable listing payload: {}", e);
                return ClipPage::empty(required);
            }
        };

        let clips = envelope
            .data
            .children
            .into_iter()
            .map(|post| Clip::from_post(post.data))
            .collect();

        ClipPage { clips, required }
    }

    /// Builds the listing request URL for the given selector/sort/cursor
    fn listing_url(
        &self,
        source: &str,
        sort: SortMode,
        after: Option<&str>,
    ) -> Result<Url, url::ParseError> {
        let path = format!(
            "/r/{}/{}/.json",
            source.trim_start_matches("r/"),
            sort.as_str()
        );
        let mut url = self.base_url.join(&path)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &PAGE_LIMIT.to_string());
            if let Some(after) = after {
                pairs.append_pair("after", after);
            }
        }
        Ok(url)
    }
}
