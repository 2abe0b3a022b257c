//! URL classification and content-identifier derivation. Pure string work,
//! no HTTP.

use std::sync::LazyLock;

use regex::Regex;

use clipsight_common::SocialPlatform;

static YOUTUBE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https?://)?(?:www\.)?(?:youtube\.com/watch\?v=|youtube\.com/shorts/|youtu\.be/)([\w-]+)")
        .expect("youtube pattern")
});

static INSTAGRAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https?://)?(?:www\.)?instagram\.com/(?:reels?|reel)/([A-Za-z0-9_-]+)")
        .expect("instagram pattern")
});

static TIKTOK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https?://)?(?:www\.)?tiktok\.com/@[\w.-]+/video/(\d+)").expect("tiktok pattern")
});

static TWITTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:https?://)?(?:www\.)?(?:twitter\.com|x\.com)/\w+/status/(\d+)")
        .expect("twitter pattern")
});

/// Instagram shortcodes also appear under /p/ and /tv/ paths, so the
/// identifier pattern is wider than the reel-only classification above.
static INSTAGRAM_SHORTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"instagram\.com/(?:[^/]+/)?(?:p|reels?|tv)/([A-Za-z0-9_-]+)")
        .expect("shortcode pattern")
});

/// The canonical form a URL is classified and keyed by: trimmed, query
/// string dropped, trailing slash dropped.
pub fn canonical_url(url: &str) -> String {
    let trimmed = url.trim();
    let without_query = trimmed.split('?').next().unwrap_or(trimmed);
    without_query.trim_end_matches('/').to_string()
}

/// Classify a URL by its host/path shape. Works on the canonical form so
/// tracking parameters cannot change the answer.
pub fn detect_platform(url: &str) -> SocialPlatform {
    let text = canonical_url(url);

    if YOUTUBE.is_match(&text) {
        return SocialPlatform::YouTube;
    }
    if INSTAGRAM.is_match(&text) {
        return SocialPlatform::Instagram;
    }
    if TIKTOK.is_match(&text) {
        return SocialPlatform::TikTok;
    }
    if TWITTER.is_match(&text) {
        return SocialPlatform::Twitter;
    }

    SocialPlatform::Unknown
}

/// Derive the deterministic content identifier from an Instagram URL.
pub fn instagram_shortcode(url: &str) -> Option<String> {
    let text = canonical_url(url);
    INSTAGRAM_SHORTCODE
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
