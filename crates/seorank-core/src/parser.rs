//! HTML signal extraction
//!
//! Everything here is plain text matching over the raw markup (no DOM), so a page that a
//! browser would repair differently may yield different counts. That is acceptable for the
//! coarse signals the readiness score needs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

use crate::types::{CanonicalInfo, ContentSummary, HeadingAnalysis, LengthStatus, MetaInfo};
use crate::url_utils::has_tracking_parameters;

pub const TITLE_LIMIT: usize = 60;
pub const DESCRIPTION_LIMIT: usize = 160;

/// Pages whose visible text is shorter than this are suspected to render client-side.
const JS_CONTENT_THRESHOLD: usize = 100;

/// Number of leading characters compared between the h1 and the title.
const HEADING_MATCH_PREFIX: usize = 20;

static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("invalid title regex"));
static RE_META_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("invalid meta regex"));
static RE_LINK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<link\b[^>]*>").expect("invalid link regex"));
static RE_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("invalid attribute regex")
});
static RE_SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>").expect("invalid script regex")
});
static RE_STYLE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("invalid style regex")
});
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("invalid tag regex"));
static RE_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("invalid whitespace regex"));
static RE_H1_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h1\b").expect("invalid h1 regex"));
static RE_H2_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h2\b").expect("invalid h2 regex"));
static RE_H3_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<h3\b").expect("invalid h3 regex"));
static RE_H1_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1\s*>").expect("invalid h1 block regex")
});

/// All HTML-derived facts the orchestrator needs from one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSignals {
    pub meta: MetaInfo,
    pub headings: HeadingAnalysis,
    pub canonical: CanonicalInfo,
    pub has_noindex: bool,
    pub has_nofollow: bool,
    pub requires_js_for_content: bool,
    pub content_summary: ContentSummary,
}

/// Run every extractor over one HTML snapshot
pub fn extract_signals(html: &str, current_url: &str) -> PageSignals {
    let title = extract_title(html);
    let description = extract_meta_description(html);
    let headings = analyze_headings(html, title.as_deref());
    let (has_noindex, has_nofollow) = check_noindex_nofollow(html);
    let stripped = strip_tags(html);

    PageSignals {
        meta: build_meta_info(title, description),
        headings,
        canonical: extract_canonical(html, current_url),
        has_noindex,
        has_nofollow,
        requires_js_for_content: requires_js_for_content(html, &stripped),
        content_summary: summarize_text(html, &stripped),
    }
}

/// First `<title>` content, trimmed
pub fn extract_title(html: &str) -> Option<String> {
    RE_TITLE
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|title| !title.is_empty())
}

/// Content of `<meta name="description">`, in either attribute order
pub fn extract_meta_description(html: &str) -> Option<String> {
    find_tag_attribute(&RE_META_TAG, html, "name", "description", "content")
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}

/// Inspect `<link rel="canonical">` relative to the URL being measured
pub fn extract_canonical(html: &str, current_url: &str) -> CanonicalInfo {
    let Some(href) = find_tag_attribute(&RE_LINK_TAG, html, "rel", "canonical", "href") else {
        return CanonicalInfo::default();
    };
    let href = href.trim().to_string();

    let resolved = Url::parse(current_url).and_then(|base| base.join(&href));
    match resolved {
        Ok(resolved) => {
            let resolved = resolved.to_string();
            CanonicalInfo {
                exists: true,
                points_to_self: resolved == current_url,
                has_parameter_pollution: has_tracking_parameters(current_url),
                url: Some(resolved),
            }
        }
        Err(_) => CanonicalInfo {
            exists: true,
            url: Some(href),
            points_to_self: false,
            has_parameter_pollution: false,
        },
    }
}

/// `(noindex, nofollow)` from `<meta name="robots">`
pub fn check_noindex_nofollow(html: &str) -> (bool, bool) {
    match find_tag_attribute(&RE_META_TAG, html, "name", "robots", "content") {
        Some(content) => {
            let content = content.to_lowercase();
            (content.contains("noindex"), content.contains("nofollow"))
        }
        None => (false, false),
    }
}

pub fn analyze_headings(html: &str, title: Option<&str>) -> HeadingAnalysis {
    let h1_count = RE_H1_OPEN.find_iter(html).count();
    let h2_count = RE_H2_OPEN.find_iter(html).count();
    let h3_count = RE_H3_OPEN.find_iter(html).count();

    let h1_text = RE_H1_BLOCK
        .captures(html)
        .and_then(|cap| cap.get(1))
        .map(|m| strip_tags(m.as_str()))
        .filter(|text| !text.is_empty());

    let has_unique_h1 = h1_count == 1;
    let h1_matches_title = match (h1_text.as_deref(), title) {
        (Some(h1), Some(title)) => heading_matches_title(h1, title),
        _ => false,
    };

    HeadingAnalysis {
        h1_count,
        h1_text,
        h2_count,
        h3_count,
        has_unique_h1,
        h1_matches_title,
        has_proper_structure: has_unique_h1 && (h2_count > 0 || h3_count > 0),
    }
}

/// Either text's leading characters appear in the other, ignoring case.
fn heading_matches_title(h1: &str, title: &str) -> bool {
    let h1 = h1.to_lowercase();
    let title = title.to_lowercase();
    if h1.is_empty() || title.is_empty() {
        return false;
    }

    let h1_prefix: String = h1.chars().take(HEADING_MATCH_PREFIX).collect();
    let title_prefix: String = title.chars().take(HEADING_MATCH_PREFIX).collect();

    title.contains(&h1_prefix) || h1.contains(&title_prefix)
}

/// Visible text: script and style blocks first, then every remaining tag
pub fn strip_tags(html: &str) -> String {
    let without_scripts = RE_SCRIPT_BLOCK.replace_all(html, " ");
    let without_styles = RE_STYLE_BLOCK.replace_all(&without_scripts, " ");
    let without_tags = RE_TAG.replace_all(&without_styles, " ");

    RE_WHITESPACE
        .replace_all(&without_tags, " ")
        .trim()
        .to_string()
}

/// Coarse client-rendering check over the raw HTML and its stripped text
pub fn requires_js_for_content(html: &str, stripped_text: &str) -> bool {
    let builds_dom = RE_SCRIPT_BLOCK.captures_iter(html).any(|cap| {
        cap.get(1).is_some_and(|body| {
            let body = body.as_str();
            body.contains("document.write") || body.contains("document.createElement")
        })
    });

    builds_dom && stripped_text.chars().count() < JS_CONTENT_THRESHOLD
}

pub fn classify_length(value: Option<&str>, limit: usize) -> LengthStatus {
    match value {
        None => LengthStatus::Missing,
        Some(text) if text.chars().count() > limit => LengthStatus::Long,
        Some(_) => LengthStatus::Within,
    }
}

pub fn build_meta_info(title: Option<String>, description: Option<String>) -> MetaInfo {
    MetaInfo {
        title_length: title.as_deref().map_or(0, |t| t.chars().count()),
        description_length: description.as_deref().map_or(0, |d| d.chars().count()),
        title_limit: TITLE_LIMIT,
        description_limit: DESCRIPTION_LIMIT,
        title_status: classify_length(title.as_deref(), TITLE_LIMIT),
        description_status: classify_length(description.as_deref(), DESCRIPTION_LIMIT),
        title,
        description,
    }
}

pub fn summarize_content(html: &str) -> ContentSummary {
    summarize_text(html, &strip_tags(html))
}

fn summarize_text(html: &str, stripped: &str) -> ContentSummary {
    ContentSummary {
        html_characters: html.chars().count(),
        text_characters: stripped.chars().count(),
        word_count: stripped.split_whitespace().count(),
    }
}

/// Find the first tag whose `key` attribute equals `expected` (case-insensitive) and return
/// its `wanted` attribute.
fn find_tag_attribute(
    tag_pattern: &Regex,
    html: &str,
    key: &str,
    expected: &str,
    wanted: &str,
) -> Option<String> {
    tag_pattern.find_iter(html).find_map(|tag| {
        let attributes = tag_attributes(tag.as_str());
        let matches = attributes
            .get(key)
            .is_some_and(|value| value.trim().eq_ignore_ascii_case(expected));
        if matches {
            attributes.get(wanted).cloned()
        } else {
            None
        }
    })
}

/// Quoted attributes of a single tag, keyed by lower-cased name. First occurrence wins.
fn tag_attributes(tag: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    for cap in RE_ATTRIBUTE.captures_iter(tag) {
        let Some(name) = cap.get(1) else { continue };
        let value = cap
            .get(2)
            .or_else(|| cap.get(3))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        attributes
            .entry(name.as_str().to_ascii_lowercase())
            .or_insert(value);
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title() {
        let html = "<html><head><title>  Example Domain \n</title></head></html>";
        assert_eq!(extract_title(html).as_deref(), Some("Example Domain"));
        assert_eq!(extract_title("<html><head></head></html>"), None);
    }

    #[test]
    fn test_extract_title_with_attributes() {
        let html = r#"<TITLE data-rh="true">Shop</TITLE>"#;
        assert_eq!(extract_title(html).as_deref(), Some("Shop"));
    }

    #[test]
    fn test_meta_description_either_order() {
        let name_first = r#"<meta name="description" content=" Fast pages ">"#;
        let content_first = r#"<meta content='Fast pages' name='Description' />"#;
        assert_eq!(extract_meta_description(name_first).as_deref(), Some("Fast pages"));
        assert_eq!(extract_meta_description(content_first).as_deref(), Some("Fast pages"));
    }

    #[test]
    fn test_meta_description_ignores_other_meta() {
        let html = r#"<meta name="viewport" content="width=device-width"><meta property="og:description" content="x">"#;
        assert_eq!(extract_meta_description(html), None);
    }

    #[test]
    fn test_title_length_classification() {
        let exact = "a".repeat(60);
        let over = "a".repeat(61);
        assert_eq!(classify_length(Some(&exact), TITLE_LIMIT), LengthStatus::Within);
        assert_eq!(classify_length(Some(&over), TITLE_LIMIT), LengthStatus::Long);
        assert_eq!(classify_length(None, TITLE_LIMIT), LengthStatus::Missing);
    }

    #[test]
    fn test_build_meta_info() {
        let meta = build_meta_info(Some("Title".to_string()), Some("d".repeat(161)));
        assert_eq!(meta.title_length, 5);
        assert_eq!(meta.description_length, 161);
        assert_eq!(meta.title_status, LengthStatus::Within);
        assert_eq!(meta.description_status, LengthStatus::Long);
        assert_eq!(meta.title_limit, 60);
        assert_eq!(meta.description_limit, 160);
    }

    #[test]
    fn test_canonical_points_to_self() {
        let html = r#"<link rel="canonical" href="https://a.com/">"#;
        let canonical = extract_canonical(html, "https://a.com/");
        assert!(canonical.exists);
        assert!(canonical.points_to_self);
        assert!(!canonical.has_parameter_pollution);
        assert_eq!(canonical.url.as_deref(), Some("https://a.com/"));
    }

    #[test]
    fn test_canonical_parameter_pollution() {
        let html = r#"<link rel="canonical" href="https://a.com/">"#;
        let canonical = extract_canonical(html, "https://a.com/?utm_source=x");
        assert!(canonical.exists);
        assert!(!canonical.points_to_self);
        assert!(canonical.has_parameter_pollution);
    }

    #[test]
    fn test_canonical_relative_href_and_reversed_attributes() {
        let html = r#"<link href="/docs" rel="canonical">"#;
        let canonical = extract_canonical(html, "https://a.com/docs");
        assert_eq!(canonical.url.as_deref(), Some("https://a.com/docs"));
        assert!(canonical.points_to_self);
    }

    #[test]
    fn test_canonical_unresolvable_degrades() {
        let html = r#"<link rel="canonical" href="https://[bad">"#;
        let canonical = extract_canonical(html, "https://a.com/?utm_source=x");
        assert!(canonical.exists);
        assert_eq!(canonical.url.as_deref(), Some("https://[bad"));
        assert!(!canonical.points_to_self);
        assert!(!canonical.has_parameter_pollution);
    }

    #[test]
    fn test_canonical_missing() {
        let canonical = extract_canonical("<html></html>", "https://a.com/?ref=x");
        assert_eq!(canonical, CanonicalInfo::default());
    }

    #[test]
    fn test_noindex_nofollow() {
        let html = r#"<meta name="robots" content="NOINDEX, follow">"#;
        assert_eq!(check_noindex_nofollow(html), (true, false));

        let html = r#"<meta content="noindex,nofollow" name="robots">"#;
        assert_eq!(check_noindex_nofollow(html), (true, true));

        assert_eq!(check_noindex_nofollow("<p>noindex</p>"), (false, false));
    }

    #[test]
    fn test_analyze_headings_proper_structure() {
        let html = r#"
            <h1 class="hero">Example <em>Domain</em></h1>
            <h2>First</h2>
            <h2>Second</h2>
        "#;
        let headings = analyze_headings(html, Some("Example Domain | Home"));
        assert_eq!(headings.h1_count, 1);
        assert_eq!(headings.h2_count, 2);
        assert_eq!(headings.h3_count, 0);
        assert_eq!(headings.h1_text.as_deref(), Some("Example Domain"));
        assert!(headings.has_unique_h1);
        assert!(headings.h1_matches_title);
        assert!(headings.has_proper_structure);
    }

    #[test]
    fn test_analyze_headings_multiple_h1() {
        let html = "<h1>One</h1><h1>Two</h1><h3>Sub</h3>";
        let headings = analyze_headings(html, Some("Unrelated"));
        assert_eq!(headings.h1_count, 2);
        assert!(!headings.has_unique_h1);
        assert!(!headings.h1_matches_title);
        assert!(!headings.has_proper_structure);
    }

    #[test]
    fn test_heading_prefix_match_either_direction() {
        // Title prefix is contained in a longer h1
        assert!(heading_matches_title(
            "Welcome to the Example Store for everything",
            "Welcome to the Example"
        ));
        // Only the first 20 characters of the h1 have to appear in the title
        assert!(heading_matches_title(
            "Best running shoes 2024 edition",
            "Best running shoes 2 | Shop"
        ));
        assert!(!heading_matches_title("Pricing", "About us"));
        assert!(!heading_matches_title("", "About us"));
    }

    #[test]
    fn test_strip_tags_removes_code_blocks() {
        let html = r#"
            <style>body { color: red; }</style>
            <p>Hello   <b>world</b></p>
            <script type="text/javascript">var hidden = "text";</script>
        "#;
        assert_eq!(strip_tags(html), "Hello world");
    }

    #[test]
    fn test_requires_js_for_content() {
        let shell = r#"<div id="root"></div><script>document.write("<p>hi</p>")</script>"#;
        assert!(requires_js_for_content(shell, &strip_tags(shell)));

        let long_text = format!(
            "<p>{}</p><script>document.createElement('div')</script>",
            "word ".repeat(40)
        );
        assert!(!requires_js_for_content(&long_text, &strip_tags(&long_text)));

        let plain = "<div id=\"root\"></div><script>console.log(1)</script>";
        assert!(!requires_js_for_content(plain, &strip_tags(plain)));
    }

    #[test]
    fn test_summarize_content() {
        let html = "<p>one two</p><p>three</p>";
        let summary = summarize_content(html);
        assert_eq!(summary.html_characters, html.len());
        assert_eq!(summary.text_characters, "one two three".len());
        assert_eq!(summary.word_count, 3);
    }

    #[test]
    fn test_extract_signals_combines_everything() {
        let html = r#"
            <html><head>
              <title>Example</title>
              <meta name="description" content="An example page">
              <link rel="canonical" href="https://example.com/">
            </head>
            <body><h1>Example</h1><h3>Details</h3></body></html>
        "#;
        let signals = extract_signals(html, "https://example.com/");
        assert_eq!(signals.meta.title.as_deref(), Some("Example"));
        assert_eq!(signals.meta.description_status, LengthStatus::Within);
        assert!(signals.canonical.points_to_self);
        assert!(signals.headings.has_proper_structure);
        assert!(!signals.has_noindex);
        assert!(!signals.requires_js_for_content);
        assert_eq!(signals.content_summary.word_count, 3);
    }
}
