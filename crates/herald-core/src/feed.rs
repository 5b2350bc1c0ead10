//! RSS/Atom item extraction.
//!
//! Deliberately lenient: feeds in the wild are frequently not well-formed
//! XML, so blocks and fields are located with patterns rather than a strict
//! parser. Field text is run through an HTML fragment parser to strip markup
//! and decode entities.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

use crate::models::RawCandidate;

static ITEM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").unwrap());
static ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<entry\b[^>]*>(.*?)</entry>").unwrap());
static CDATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap());
static LINK_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<link\b([^>]*)>").unwrap());
static MEDIA_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(enclosure|media:content|media:thumbnail)\b([^>]*)>").unwrap()
});

const TEXT_TAGS: &[&str] = &[
    "title",
    "link",
    "guid",
    "description",
    "summary",
    "content",
    "content:encoded",
    "pubDate",
    "updated",
    "published",
    "dc:date",
];

static TAG_RES: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    TEXT_TAGS
        .iter()
        .map(|tag| {
            let escaped = regex::escape(tag);
            let re = Regex::new(&format!(r"(?is)<{escaped}\b[^>]*>(.*?)</{escaped}>")).unwrap();
            (*tag, re)
        })
        .collect()
});

static ATTR_RES: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    ["href", "url", "rel", "type", "medium"]
        .into_iter()
        .map(|name| {
            let re = Regex::new(&format!(r#"(?i)\b{name}\s*=\s*["']([^"']*)["']"#)).unwrap();
            (name, re)
        })
        .collect()
});

/// Extracts raw candidates from RSS `<item>` or Atom `<entry>` blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedExtractor;

impl FeedExtractor {
    /// Items are used when present; otherwise entries. Candidates without a
    /// title or link are dropped.
    pub fn extract(&self, xml: &str) -> Vec<RawCandidate> {
        let mut is_atom = false;
        let mut blocks: Vec<&str> = ITEM_RE
            .captures_iter(xml)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        if blocks.is_empty() {
            is_atom = true;
            blocks = ENTRY_RE
                .captures_iter(xml)
                .filter_map(|c| c.get(1).map(|m| m.as_str()))
                .collect();
        }

        let candidates: Vec<RawCandidate> = blocks
            .into_iter()
            .filter_map(|block| parse_block(block, is_atom))
            .collect();

        tracing::debug!(count = candidates.len(), atom = is_atom, "Parsed feed");
        candidates
    }
}

fn parse_block(block: &str, is_atom: bool) -> Option<RawCandidate> {
    let title = tag_text(block, "title").map(|t| strip_html(&t))?;
    if title.is_empty() {
        return None;
    }

    let link_text = tag_text(block, "link")
        .map(|t| unwrap_cdata(&t).trim().to_string())
        .filter(|t| !t.is_empty() && !t.contains('<'));
    let link = if is_atom {
        link_href(block).or(link_text)
    } else {
        link_text.or_else(|| link_href(block))
    }
    .or_else(|| {
        tag_text(block, "guid")
            .map(|g| unwrap_cdata(&g).trim().to_string())
            .filter(|g| g.starts_with("http://") || g.starts_with("https://"))
    })?;

    let summary = ["description", "summary", "content", "content:encoded"]
        .iter()
        .find_map(|tag| tag_text(block, tag).filter(|s| !s.trim().is_empty()))
        .map(|s| strip_html(&s))
        .unwrap_or_default();

    let published_at_raw = ["pubDate", "updated", "published", "dc:date"]
        .iter()
        .find_map(|tag| {
            tag_text(block, tag)
                .map(|s| unwrap_cdata(&s).trim().to_string())
                .filter(|s| !s.is_empty())
        });

    Some(RawCandidate {
        title,
        url: decode_entities(&link),
        summary,
        published_at_raw,
        image_url: media_url(block),
    })
}

fn tag_text(block: &str, tag: &str) -> Option<String> {
    let re = TAG_RES.get(tag)?;
    re.captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn attr<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    ATTR_RES
        .get(name)?
        .captures(attrs)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// `href` of the first `<link>` that is the entry's own page.
fn link_href(block: &str) -> Option<String> {
    LINK_TAG_RE
        .captures_iter(block)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .filter(|attrs| {
            attr(attrs, "rel").is_none_or(|rel| rel.eq_ignore_ascii_case("alternate"))
        })
        .find_map(|attrs| attr(attrs, "href").map(str::to_string))
        .filter(|href| !href.trim().is_empty())
}

fn media_url(block: &str) -> Option<String> {
    MEDIA_TAG_RE.captures_iter(block).find_map(|c| {
        let tag = c.get(1)?.as_str().to_lowercase();
        let attrs = c.get(2)?.as_str();
        let url = attr(attrs, "url").filter(|u| !u.trim().is_empty())?;
        let is_image = match tag.as_str() {
            "media:thumbnail" => true,
            _ => {
                let mime_ok = attr(attrs, "type").is_none_or(|t| t.starts_with("image/"));
                let medium_ok = attr(attrs, "medium").is_none_or(|m| m == "image");
                mime_ok && medium_ok
            }
        };
        is_image.then(|| decode_entities(url))
    })
}

fn unwrap_cdata(s: &str) -> String {
    CDATA_RE.replace_all(s, "$1").into_owned()
}

fn fragment_text(s: &str) -> String {
    Html::parse_fragment(s).root_element().text().collect()
}

/// Remove markup and decode entities, collapsing whitespace.
///
/// Escaped markup (`&lt;p&gt;`, common in RSS descriptions) decodes to tags
/// on the first pass and is stripped on a second.
pub fn strip_html(s: &str) -> String {
    let mut text = fragment_text(&unwrap_cdata(s));
    if text.contains('<') && text.contains('>') {
        text = fragment_text(&text);
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.trim().to_string();
    }
    fragment_text(s).trim().to_string()
}

/// Parse the publish timestamp formats seen in RSS and Atom feeds.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
<channel>
  <title>Local News</title>
  <link>https://news.example.com/</link>
  <item>
    <title><![CDATA[Flash flood warning for <b>river</b> towns]]></title>
    <link>https://news.example.com/weather/flood-warning</link>
    <description>&lt;p&gt;Residents urged to move to higher ground.&lt;/p&gt;</description>
    <pubDate>Tue, 10 Jun 2025 14:30:00 GMT</pubDate>
    <media:content url="https://cdn.example.com/flood.jpg" medium="image"/>
  </item>
  <item>
    <title></title>
    <link>https://news.example.com/empty</link>
  </item>
</channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Feed</title>
  <link href="https://example.org/"/>
  <entry>
    <title>Crews battle brush fire &amp; evacuations</title>
    <link rel="self" href="https://example.org/feed/1"/>
    <link rel="alternate" href="https://example.org/2025/06/brush-fire"/>
    <summary>Evacuation order lifted for some neighborhoods.</summary>
    <updated>2025-06-10T18:00:00Z</updated>
    <published>2025-06-10T12:00:00Z</published>
  </entry>
</feed>"#;

    #[test]
    fn extracts_rss_items_and_drops_empty_title() {
        let items = FeedExtractor.extract(RSS);
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.title, "Flash flood warning for river towns");
        assert_eq!(item.url, "https://news.example.com/weather/flood-warning");
        assert_eq!(item.summary, "Residents urged to move to higher ground.");
        assert_eq!(
            item.published_at_raw.as_deref(),
            Some("Tue, 10 Jun 2025 14:30:00 GMT")
        );
        assert_eq!(
            item.image_url.as_deref(),
            Some("https://cdn.example.com/flood.jpg")
        );
    }

    #[test]
    fn falls_back_to_atom_entries() {
        let items = FeedExtractor.extract(ATOM);
        assert_eq!(items.len(), 1);

        let entry = &items[0];
        assert_eq!(entry.title, "Crews battle brush fire & evacuations");
        assert_eq!(entry.url, "https://example.org/2025/06/brush-fire");
        assert_eq!(entry.summary, "Evacuation order lifted for some neighborhoods.");
        // `updated` is preferred over `published`.
        assert_eq!(entry.published_at_raw.as_deref(), Some("2025-06-10T18:00:00Z"));
        assert!(entry.image_url.is_none());
    }

    #[test]
    fn drops_items_without_link() {
        let xml = "<rss><channel><item><title>No link here</title></item></channel></rss>";
        assert!(FeedExtractor.extract(xml).is_empty());
    }

    #[test]
    fn uses_permalink_guid_when_link_missing() {
        let xml = "<rss><channel><item><title>Quake felt downtown</title>\
                   <guid isPermaLink=\"true\">https://a.com/quake</guid></item></channel></rss>";
        let items = FeedExtractor.extract(xml);
        assert_eq!(items[0].url, "https://a.com/quake");
    }

    #[test]
    fn enclosure_must_be_an_image() {
        let xml = r#"<rss><channel>
            <item><title>Podcast</title><link>https://a.com/p</link>
              <enclosure url="https://a.com/ep.mp3" type="audio/mpeg"/></item>
            <item><title>Photo</title><link>https://a.com/q</link>
              <enclosure url="https://a.com/pic.png" type="image/png"/></item>
        </channel></rss>"#;
        let items = FeedExtractor.extract(xml);
        assert!(items[0].image_url.is_none());
        assert_eq!(items[1].image_url.as_deref(), Some("https://a.com/pic.png"));
    }

    #[test]
    fn non_feed_documents_yield_nothing() {
        assert!(FeedExtractor.extract("<html><body>hello</body></html>").is_empty());
    }

    #[test]
    fn parses_common_date_formats() {
        let expected = "2025-06-10T14:30:00Z";
        for raw in [
            "Tue, 10 Jun 2025 14:30:00 GMT",
            "Tue, 10 Jun 2025 14:30:00 +0000",
            "2025-06-10T14:30:00Z",
            "2025-06-10T09:30:00-05:00",
            "2025-06-10T14:30:00",
        ] {
            let parsed = parse_published(raw).unwrap_or_else(|| panic!("failed on {raw}"));
            assert_eq!(parsed.to_rfc3339_opts(chrono::SecondsFormat::Secs, true), expected);
        }
        assert!(parse_published("yesterday-ish").is_none());
    }
}
