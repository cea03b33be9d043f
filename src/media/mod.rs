//! Playable media resolution
//!
//! Given one raw upstream post record, decides whether it carries a playable
//! video asset and normalizes its location to a single canonical URL. This is
//! a total function over the post shape: missing fields mean "feature absent",
//! never an error, and no network access happens here.

use crate::listing::PostData;

/// Resolves the best playable source URL for a post
///
/// Resolution order, first match wins:
/// 1. URL already contains `.mp4` - used unchanged
/// 2. URL contains `.gifv` or `.webm` - extension rewritten to `.mp4`
/// 3. Secure-media video fallback URL
/// 4. Plain media video fallback URL
/// 5. Preview video fallback URL
///
/// # Returns
///
/// * `Some(url)` - A canonical playable URL
/// * `None` - The post has no usable video asset
pub fn best_src(post: &PostData) -> Option<String> {
    if post.url.contains(".mp4") {
        return Some(post.url.clone());
    }

    if post.url.contains(".gifv") {
        return Some(post.url.replace(".gifv", ".mp4"));
    }

    if post.url.contains(".webm") {
        return Some(post.url.replace(".webm", ".mp4"));
    }

    if let Some(video) = post
        .secure_media
        .as_ref()
        .and_then(|media| media.reddit_video.as_ref())
    {
        return Some(video.fallback_url.clone());
    }

    if let Some(video) = post
        .media
        .as_ref()
        .and_then(|media| media.reddit_video.as_ref())
    {
        return Some(video.fallback_url.clone());
    }

    if let Some(video) = post
        .preview
        .as_ref()
        .and_then(|preview| preview.reddit_video_preview.as_ref())
    {
        return Some(video.fallback_url.clone());
    }

    None
}
