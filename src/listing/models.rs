use serde::{Deserialize, Serialize};

use crate::media::best_src;

/// Outer envelope of a listing response
#[derive(Debug, Clone, Deserialize)]
pub struct ListingEnvelope {
    #[serde(default)]
    pub data: ListingData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<RawPost>,
}

/// One raw upstream post record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPost {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub data: PostData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostData {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub secure_media: Option<MediaEmbed>,
    #[serde(default)]
    pub media: Option<MediaEmbed>,
    #[serde(default)]
    pub preview: Option<Preview>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaEmbed {
    #[serde(default)]
    pub reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RedditVideo {
    #[serde(default)]
    pub fallback_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Preview {
    #[serde(default)]
    pub reddit_video_preview: Option<RedditVideo>,
}

/// One feed item
///
/// A clip with `src = None` has no playable media; it is filtered out before
/// it can reach the visible feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clip {
    pub src: Option<String>,
    pub author: String,
    pub name: String,
    pub permalink: String,
    pub title: String,
    pub thumbnail: String,
    pub comments: i64,
    pub loading: bool,
}

impl Clip {
    /// Converts a raw post into a feed item, resolving its playable source
    pub fn from_post(post: PostData) -> Self {
        let src = best_src(&post);
        Self {
            src,
            author: post.author,
            name: post.name,
            permalink: post.permalink,
            title: post.title,
            thumbnail: post.thumbnail,
            comments: post.num_comments,
            loading: false,
        }
    }
}

/// One page of converted clips plus how many valid items the caller wanted
#[derive(Debug, Clone)]
pub struct ClipPage {
    pub clips: Vec<Clip>,
    pub required: u32,
}

impl ClipPage {
    /// An empty page; any fetch failure degrades to this
    pub fn empty(required: u32) -> Self {
        Self {
            clips: Vec::new(),
            required,
        }
    }
}
