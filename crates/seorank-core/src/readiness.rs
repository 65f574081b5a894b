//! SEO readiness scoring
//!
//! Combines crawlability, on-page, technical and opportunity signals into four layer scores
//! and one weighted overall score. Point allocations and weights are fixed:
//!
//! | Layer              | Weight |
//! |--------------------|--------|
//! | Crawlability       | 40%    |
//! | Basic on-page      | 35%    |
//! | Tech & experience  | 15%    |
//! | SEO opportunity    | 10%    |

use crate::types::{
    CanonicalInfo, Crawlability, HeadingAnalysis, LengthStatus, MobileStatus, SeoReadiness,
};

pub const CRAWLABILITY_WEIGHT: f64 = 0.40;
pub const BASIC_ON_PAGE_WEIGHT: f64 = 0.35;
pub const TECH_EXPERIENCE_WEIGHT: f64 = 0.15;
pub const SEO_OPPORTUNITY_WEIGHT: f64 = 0.10;

/// Everything the scorer looks at, borrowed from a report under construction
#[derive(Debug, Clone, Copy)]
pub struct ReadinessSignals<'a> {
    pub crawlability: &'a Crawlability,
    pub canonical: &'a CanonicalInfo,
    pub headings: &'a HeadingAnalysis,
    pub title_status: LengthStatus,
    pub description_status: LengthStatus,
    /// Lab LCP in milliseconds
    pub lcp: Option<f64>,
    /// Lab CLS
    pub cls: Option<f64>,
    pub mobile_status: MobileStatus,
    pub is_https: bool,
}

/// Score all four layers and combine them
pub fn score(signals: &ReadinessSignals<'_>) -> SeoReadiness {
    SeoReadiness::from_layers(
        crawlability_score(signals.crawlability, signals.canonical),
        basic_on_page_score(
            signals.title_status,
            signals.description_status,
            signals.headings,
        ),
        tech_experience_score(signals.lcp, signals.cls, signals.mobile_status, signals.is_https),
        seo_opportunity_score(
            signals.headings,
            signals.title_status,
            signals.description_status,
            signals.canonical,
        ),
    )
}

pub fn crawlability_score(crawlability: &Crawlability, canonical: &CanonicalInfo) -> u32 {
    let mut points = 0;

    if crawlability.http_status == Some(200) {
        points += 20;
    }
    if !crawlability.is_blocked_by_robots {
        points += 20;
    }
    if !crawlability.has_noindex {
        points += 20;
    }
    if !crawlability.requires_js_for_content {
        points += 15;
    }
    if canonical.exists && canonical.points_to_self {
        points += 15;
    }
    if !canonical.has_parameter_pollution {
        points += 10;
    }

    points.min(100)
}

pub fn basic_on_page_score(
    title_status: LengthStatus,
    description_status: LengthStatus,
    headings: &HeadingAnalysis,
) -> u32 {
    let mut points = match title_status {
        LengthStatus::Within => 30,
        LengthStatus::Long => 15,
        LengthStatus::Missing => 0,
    };

    points += match description_status {
        LengthStatus::Within => 20,
        LengthStatus::Long => 10,
        LengthStatus::Missing => 0,
    };

    if headings.has_unique_h1 {
        points += 25;
    }
    if headings.h1_matches_title {
        points += 10;
    }
    if headings.has_proper_structure {
        points += 15;
    }

    points.min(100)
}

pub fn tech_experience_score(
    lcp: Option<f64>,
    cls: Option<f64>,
    mobile_status: MobileStatus,
    is_https: bool,
) -> u32 {
    let mut points = match lcp {
        Some(ms) if ms < 4000.0 => 30,
        Some(ms) if ms < 6000.0 => 15,
        _ => 0,
    };

    if cls.is_some_and(|shift| shift < 0.25) {
        points += 20;
    }

    points += match mobile_status {
        MobileStatus::Pass => 30,
        MobileStatus::Unknown => 15,
        MobileStatus::Fail => 0,
    };

    if is_https {
        points += 20;
    }

    points.min(100)
}

pub fn seo_opportunity_score(
    headings: &HeadingAnalysis,
    title_status: LengthStatus,
    description_status: LengthStatus,
    canonical: &CanonicalInfo,
) -> u32 {
    let mut points = 0;

    if headings.has_proper_structure {
        points += 40;
    }
    if title_status != LengthStatus::Missing && description_status != LengthStatus::Missing {
        points += 30;
    }
    if canonical.exists {
        points += 30;
    }

    points.min(100)
}

/// `round(c*0.40 + b*0.35 + t*0.15 + o*0.10)`
pub fn overall_score(
    crawlability: u8,
    basic_on_page: u8,
    tech_experience: u8,
    seo_opportunity: u8,
) -> u8 {
    let weighted = f64::from(crawlability) * CRAWLABILITY_WEIGHT
        + f64::from(basic_on_page) * BASIC_ON_PAGE_WEIGHT
        + f64::from(tech_experience) * TECH_EXPERIENCE_WEIGHT
        + f64::from(seo_opportunity) * SEO_OPPORTUNITY_WEIGHT;

    weighted.round().clamp(0.0, 100.0) as u8
}
