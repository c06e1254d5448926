use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use tracing::{info, warn};

use reelcheck_common::ResolvedMedia;

use crate::traits::LinkResolver;

const BROWSER_UA: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const PAGE_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

static POST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://(?:www\.)?instagram\.com/p/([a-zA-Z0-9_-]+)/?(?:\?.*)?$").unwrap()
});
static REEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://(?:www\.)?instagram\.com/reels?/([a-zA-Z0-9_-]+)/?(?:\?.*)?$").unwrap()
});
static SHARE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://(?:www\.)?instagram\.com/share/(?:reel/|p/)?([a-zA-Z0-9_-]+)/?(?:\?.*)?$").unwrap()
});
static REDIRECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(?:reels?|p)/([a-zA-Z0-9_-]+)").unwrap());
static META_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<meta\s+[^>]*property="(og:video(?::width|:height)?)"[^>]*content="([^"]*)""#).unwrap()
});

/// A post link after syntactic validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostLink {
    Direct { shortcode: String },
    /// Share links hide the shortcode behind a redirect.
    Share { token: String },
}

pub fn parse_post_link(url: &str) -> Result<PostLink> {
    let url = url.trim();
    if !url.starts_with("https://") || !url.contains("instagram.com/") {
        bail!("Only https instagram.com links are supported");
    }
    if let Some(caps) = POST_RE.captures(url).or_else(|| REEL_RE.captures(url)) {
        return Ok(PostLink::Direct {
            shortcode: caps[1].to_string(),
        });
    }
    if let Some(caps) = SHARE_RE.captures(url) {
        return Ok(PostLink::Share {
            token: caps[1].to_string(),
        });
    }
    bail!("Link is not an Instagram post, reel or share link")
}

/// Shortcode from the final URL of a followed share redirect.
pub fn shortcode_from_redirect(final_url: &str) -> Option<String> {
    REDIRECT_RE
        .captures(final_url)
        .map(|caps| caps[1].to_string())
}

#[derive(Debug, Default, PartialEq)]
pub struct VideoMeta {
    pub video_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Read `og:video*` meta tags from a post page.
pub fn extract_video_meta(html: &str) -> VideoMeta {
    let mut meta = VideoMeta::default();
    for caps in META_RE.captures_iter(html) {
        let value = caps[2].replace("&amp;", "&");
        match &caps[1] {
            "og:video" if meta.video_url.is_none() && !value.is_empty() => meta.video_url = Some(value),
            "og:video:width" => meta.width = value.parse().ok(),
            "og:video:height" => meta.height = value.parse().ok(),
            _ => {}
        }
    }
    meta
}

pub fn artifact_filename(shortcode: &str) -> String {
    format!("instagram_{shortcode}.mp4")
}

// --- Resolver ---

pub struct InstagramResolver {
    client: reqwest::Client,
}

impl InstagramResolver {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    async fn follow_share(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header("User-Agent", BROWSER_UA)
            .send()
            .await
            .context("Share link request failed")?;
        let final_url = resp.url().to_string();
        shortcode_from_redirect(&final_url)
            .with_context(|| format!("Share link did not lead to a post: {final_url}"))
    }

    async fn fetch_post_page(&self, shortcode: &str) -> Result<String> {
        let page = format!("https://www.instagram.com/p/{shortcode}/");
        let resp = self
            .client
            .get(&page)
            .header("User-Agent", PAGE_UA)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.5")
            .send()
            .await
            .context("Post page request failed")?;
        if !resp.status().is_success() {
            bail!("Post page returned {}", resp.status());
        }
        resp.text().await.context("Failed to read post page")
    }
}

impl Default for InstagramResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkResolver for InstagramResolver {
    async fn resolve(&self, url: &str) -> Result<ResolvedMedia> {
        let shortcode = match parse_post_link(url)? {
            PostLink::Direct { shortcode } => shortcode,
            PostLink::Share { token } => {
                info!(token, "Following share link");
                self.follow_share(url.trim()).await?
            }
        };

        let html = self.fetch_post_page(&shortcode).await?;
        let meta = extract_video_meta(&html);
        let Some(video_url) = meta.video_url else {
            warn!(shortcode, "No og:video on post page");
            bail!("Video link for this post is not public or accessible.");
        };

        info!(shortcode, width = ?meta.width, height = ?meta.height, "Resolved video");
        Ok(ResolvedMedia {
            filename: artifact_filename(&shortcode),
            shortcode,
            video_url,
            width: meta.width,
            height: meta.height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_and_reel_links_yield_shortcode() {
        for url in [
            "https://www.instagram.com/p/C0ffee123/",
            "https://instagram.com/p/C0ffee123",
            "https://www.instagram.com/reel/C0ffee123/?igsh=abc",
            "https://www.instagram.com/reels/C0ffee123/",
        ] {
            assert_eq!(
                parse_post_link(url).unwrap(),
                PostLink::Direct {
                    shortcode: "C0ffee123".to_string()
                },
                "{url}"
            );
        }
    }

    #[test]
    fn share_link_needs_redirect() {
        let link = parse_post_link("https://www.instagram.com/share/BAx_9-z/").unwrap();
        assert_eq!(
            link,
            PostLink::Share {
                token: "BAx_9-z".to_string()
            }
        );
    }

    #[test]
    fn rejects_other_links() {
        for url in [
            "http://www.instagram.com/p/C0ffee123/",
            "https://www.youtube.com/watch?v=abc",
            "https://www.instagram.com/someuser/",
            "https://www.instagram.com/p/",
            "",
        ] {
            assert!(parse_post_link(url).is_err(), "{url}");
        }
    }

    #[test]
    fn redirect_target_yields_shortcode() {
        assert_eq!(
            shortcode_from_redirect("https://www.instagram.com/reel/DEF456/?utm_source=ig"),
            Some("DEF456".to_string())
        );
        assert_eq!(shortcode_from_redirect("https://www.instagram.com/accounts/login/"), None);
    }

    #[test]
    fn reads_og_video_tags() {
        let html = r#"<head>
            <meta property="og:title" content="A reel" />
            <meta property="og:video" content="https://cdn.example/v.mp4?a=1&amp;b=2" />
            <meta property="og:video:width" content="720" />
            <meta property="og:video:height" content="1280" />
        </head>"#;
        let meta = extract_video_meta(html);
        assert_eq!(meta.video_url.as_deref(), Some("https://cdn.example/v.mp4?a=1&b=2"));
        assert_eq!(meta.width, Some(720));
        assert_eq!(meta.height, Some(1280));
    }

    #[test]
    fn image_post_has_no_video() {
        let html = r#"<meta property="og:image" content="https://cdn.example/i.jpg" />"#;
        assert_eq!(extract_video_meta(html), VideoMeta::default());
    }

    #[test]
    fn filename_is_derived_from_shortcode() {
        assert_eq!(artifact_filename("C0ffee123"), "instagram_C0ffee123.mp4");
    }
}
