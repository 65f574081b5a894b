//! Common types used across seorank

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pagespeed::{LoadingExperience, PageSpeedMeta};

/// Device profile used for the Lighthouse run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Mobile,
    Desktop,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the audited URL is the site root or a sub-page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Root,
    Page,
}

/// A lab value paired with its field-data category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldMetric {
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoreWebVitals {
    pub lcp: FieldMetric,
    pub cls: FieldMetric,
    pub fid: FieldMetric,
    pub field_summary: String,
    pub lab_summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MobileStatus {
    Pass,
    Fail,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileFriendly {
    pub status: MobileStatus,
    pub detail: String,
    pub message: String,
}

/// Length classification for title and meta description
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthStatus {
    Missing,
    Within,
    Long,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaInfo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub title_length: usize,
    pub description_length: usize,
    pub title_limit: usize,
    pub description_limit: usize,
    pub title_status: LengthStatus,
    pub description_status: LengthStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingAnalysis {
    pub h1_count: usize,
    pub h1_text: Option<String>,
    pub h2_count: usize,
    pub h3_count: usize,
    #[serde(rename = "hasUniqueH1")]
    pub has_unique_h1: bool,
    #[serde(rename = "h1MatchesTitle")]
    pub h1_matches_title: bool,
    pub has_proper_structure: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Crawlability {
    pub http_status: Option<u16>,
    pub is_blocked_by_robots: bool,
    pub has_noindex: bool,
    pub has_nofollow: bool,
    pub requires_js_for_content: bool,
    pub is_accessible: bool,
}

impl Crawlability {
    pub fn new(
        http_status: Option<u16>,
        is_blocked_by_robots: bool,
        has_noindex: bool,
        has_nofollow: bool,
        requires_js_for_content: bool,
    ) -> Self {
        Self {
            http_status,
            is_blocked_by_robots,
            has_noindex,
            has_nofollow,
            requires_js_for_content,
            is_accessible: http_status == Some(200) && !is_blocked_by_robots && !has_noindex,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalInfo {
    pub exists: bool,
    pub url: Option<String>,
    pub points_to_self: bool,
    pub has_parameter_pollution: bool,
}

/// Four weighted layers plus the combined score.
///
/// Fields are private and values are only built by [`SeoReadiness::from_layers`], so `overall`
/// always follows from the layers it sits next to. Deserializing reads the layers and recomputes
/// `overall`; a stored `overall` is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ReadinessLayers")]
pub struct SeoReadiness {
    crawlability: u8,
    basic_on_page: u8,
    tech_experience: u8,
    seo_opportunity: u8,
    overall: u8,
}

impl SeoReadiness {
    /// Build from the four layer scores; each is capped at 100.
    pub fn from_layers(
        crawlability: u32,
        basic_on_page: u32,
        tech_experience: u32,
        seo_opportunity: u32,
    ) -> Self {
        let crawlability = crawlability.min(100) as u8;
        let basic_on_page = basic_on_page.min(100) as u8;
        let tech_experience = tech_experience.min(100) as u8;
        let seo_opportunity = seo_opportunity.min(100) as u8;

        Self {
            crawlability,
            basic_on_page,
            tech_experience,
            seo_opportunity,
            overall: crate::readiness::overall_score(
                crawlability,
                basic_on_page,
                tech_experience,
                seo_opportunity,
            ),
        }
    }

    pub fn crawlability(&self) -> u8 {
        self.crawlability
    }

    pub fn basic_on_page(&self) -> u8 {
        self.basic_on_page
    }

    pub fn tech_experience(&self) -> u8 {
        self.tech_experience
    }

    pub fn seo_opportunity(&self) -> u8 {
        self.seo_opportunity
    }

    pub fn overall(&self) -> u8 {
        self.overall
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadinessLayers {
    crawlability: u32,
    basic_on_page: u32,
    tech_experience: u32,
    seo_opportunity: u32,
}

impl From<ReadinessLayers> for SeoReadiness {
    fn from(layers: ReadinessLayers) -> Self {
        Self::from_layers(
            layers.crawlability,
            layers.basic_on_page,
            layers.tech_experience,
            layers.seo_opportunity,
        )
    }
}

/// Result of fetching a site resource such as robots.txt or a sitemap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub url: String,
    pub exists: bool,
    pub status: Option<u16>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub html_characters: usize,
    pub text_characters: usize,
    pub word_count: usize,
}

/// Immutable snapshot of one audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureResponse {
    pub measured_at: DateTime<Utc>,
    pub measured_url: String,
    pub strategy: Strategy,
    pub performance_score: Option<u8>,
    pub performance_label: String,
    pub performance_detail: String,
    pub core_web_vitals: CoreWebVitals,
    pub mobile_friendly: MobileFriendly,
    pub scope: Scope,
    pub root_url: String,
    pub is_https: bool,
    pub robots: ResourceStatus,
    pub sitemap: ResourceStatus,
    pub meta: MetaInfo,
    pub headings: HeadingAnalysis,
    pub crawlability: Crawlability,
    pub canonical: CanonicalInfo,
    pub seo_readiness: SeoReadiness,
    pub content_summary: ContentSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_speed_meta: Option<PageSpeedMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loading_experience: Option<LoadingExperience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_loading_experience: Option<LoadingExperience>,
}
