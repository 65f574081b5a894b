//! Measurement orchestration
//!
//! One call to [`Measurer::measure`] probes the page, then runs the PageSpeed request, the HTML
//! snapshot, the robots.txt lookup and the sitemap search concurrently and folds everything
//! into a [`MeasureResponse`].

use chrono::Utc;
use reqwest::Client;
use std::time::Duration;

use crate::error::MeasureError;
use crate::pagespeed::{
    self, build_field_summary, build_lab_summary, mobile_detail, mobile_message,
    PageSpeedResponse, CLS_AUDIT, CLS_FIELD_KEY, FID_AUDIT, FID_FIELD_KEY, LCP_AUDIT,
    LCP_FIELD_KEY, MOBILE_FRIENDLY_AUDIT,
};
use crate::parser;
use crate::readiness::{self, ReadinessSignals};
use crate::resources::{self, PageSnapshot, RobotsFetch};
use crate::robots;
use crate::types::{
    CoreWebVitals, Crawlability, MeasureResponse, MobileFriendly, ResourceStatus, Strategy,
};
use crate::url_utils::{normalize_url, origin_of, scope_of};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_USER_AGENT: &str = concat!("seorank/", env!("CARGO_PKG_VERSION"));

pub const API_KEY_ENV: &str = "PAGESPEED_API_KEY";
pub const ENDPOINT_ENV: &str = "SEORANK_PAGESPEED_ENDPOINT";

/// Settings for outbound requests
#[derive(Debug, Clone)]
pub struct MeasureConfig {
    pub pagespeed_endpoint: String,
    pub api_key: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            pagespeed_endpoint: pagespeed::PAGESPEED_URL.to_string(),
            api_key: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl MeasureConfig {
    /// Defaults overridden by `PAGESPEED_API_KEY` and `SEORANK_PAGESPEED_ENDPOINT`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            config.api_key = Some(key);
        }
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV)
            && !endpoint.trim().is_empty()
        {
            config.pagespeed_endpoint = endpoint;
        }
        config
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.pagespeed_endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

/// Reusable measurement client
#[derive(Debug, Clone)]
pub struct Measurer {
    client: Client,
    config: MeasureConfig,
}

impl Measurer {
    pub fn new(config: MeasureConfig) -> Result<Self, MeasureError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| MeasureError::Client(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &MeasureConfig {
        &self.config
    }

    /// Audit one URL.
    ///
    /// Fails on empty or unparsable input, an unreachable page, or a PageSpeed error. Problems
    /// with the snapshot, robots.txt or sitemap only show up inside the report.
    pub async fn measure(
        &self,
        raw_url: &str,
        strategy: Strategy,
    ) -> Result<MeasureResponse, MeasureError> {
        let url = normalize_url(raw_url)?;
        let measured_url = url.to_string();

        resources::probe_url(&self.client, &measured_url).await?;

        let root_url = origin_of(&url);
        let scope = scope_of(&url);
        let is_https = url.scheme() == "https";

        tracing::debug!(url = %measured_url, %strategy, "probe ok, fanning out");

        let (data, snapshot, robots_fetch, sitemap) = tokio::try_join!(
            pagespeed::fetch_pagespeed(
                &self.client,
                &self.config.pagespeed_endpoint,
                &measured_url,
                strategy,
                self.config.api_key.as_deref(),
            ),
            async {
                Ok::<_, MeasureError>(
                    resources::fetch_page_snapshot(&self.client, &measured_url).await,
                )
            },
            async { Ok::<_, MeasureError>(resources::fetch_robots(&self.client, &root_url).await) },
            async {
                Ok::<_, MeasureError>(resources::locate_sitemap(&self.client, &root_url).await)
            },
        )?;

        let report = assemble_report(ReportInputs {
            measured_url,
            root_url,
            scope,
            is_https,
            strategy,
            data,
            snapshot,
            robots: robots_fetch,
            sitemap,
        });

        tracing::info!(
            url = %report.measured_url,
            overall = report.seo_readiness.overall(),
            performance = ?report.performance_score,
            "measurement complete"
        );

        Ok(report)
    }
}

/// Measure with settings taken from the environment
pub async fn measure_page_speed(
    raw_url: &str,
    strategy: Strategy,
) -> Result<MeasureResponse, MeasureError> {
    Measurer::new(MeasureConfig::from_env())?
        .measure(raw_url, strategy)
        .await
}

struct ReportInputs {
    measured_url: String,
    root_url: String,
    scope: crate::types::Scope,
    is_https: bool,
    strategy: Strategy,
    data: PageSpeedResponse,
    snapshot: PageSnapshot,
    robots: RobotsFetch,
    sitemap: ResourceStatus,
}

fn assemble_report(inputs: ReportInputs) -> MeasureResponse {
    let ReportInputs {
        measured_url,
        root_url,
        scope,
        is_https,
        strategy,
        data,
        snapshot,
        robots: robots_fetch,
        sitemap,
    } = inputs;

    let signals = parser::extract_signals(&snapshot.html, &measured_url);

    // Fail open when robots.txt could not be read
    let blocked = robots_fetch
        .body
        .as_deref()
        .is_some_and(|body| robots::is_disallowed(body, &measured_url));

    let crawlability = Crawlability::new(
        snapshot.status,
        blocked,
        signals.has_noindex,
        signals.has_nofollow,
        signals.requires_js_for_content,
    );

    let lcp = data.metric(LCP_AUDIT, LCP_FIELD_KEY);
    let cls = data.metric(CLS_AUDIT, CLS_FIELD_KEY);
    let fid = data.metric(FID_AUDIT, FID_FIELD_KEY);
    let field_summary = build_field_summary(Some([&lcp, &cls, &fid]));
    let lab_summary = build_lab_summary(lcp.value, cls.value, fid.value);

    let mobile_status = data.mobile_status();
    let mobile_friendly = MobileFriendly {
        status: mobile_status,
        detail: mobile_detail(data.audit(MOBILE_FRIENDLY_AUDIT)),
        message: mobile_message(mobile_status).to_string(),
    };

    let seo_readiness = readiness::score(&ReadinessSignals {
        crawlability: &crawlability,
        canonical: &signals.canonical,
        headings: &signals.headings,
        title_status: signals.meta.title_status,
        description_status: signals.meta.description_status,
        lcp: lcp.value,
        cls: cls.value,
        mobile_status,
        is_https,
    });

    let performance_detail = format!(
        "Measured {measured_url} with PageSpeed Insights ({strategy}). {field_summary}"
    );

    MeasureResponse {
        measured_at: Utc::now(),
        performance_score: data.performance_score(),
        performance_label: format!("Lighthouse ({strategy})"),
        performance_detail,
        core_web_vitals: CoreWebVitals {
            lcp,
            cls,
            fid,
            field_summary,
            lab_summary,
        },
        mobile_friendly,
        scope,
        root_url,
        is_https,
        robots: robots_fetch.status,
        sitemap,
        meta: signals.meta,
        headings: signals.headings,
        crawlability,
        canonical: signals.canonical,
        seo_readiness,
        content_summary: signals.content_summary,
        page_speed_meta: data.page_speed_meta(),
        loading_experience: data.loading_experience,
        origin_loading_experience: data.origin_loading_experience,
        measured_url,
        strategy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LengthStatus, MobileStatus, Scope};
    use serde_json::json;

    fn resource(url: &str, exists: bool) -> ResourceStatus {
        ResourceStatus {
            url: url.to_string(),
            exists,
            status: Some(if exists { 200 } else { 404 }),
            message: if exists { "Available" } else { "Status 404" }.to_string(),
        }
    }

    fn inputs(html: &str, robots_body: Option<&str>, data: PageSpeedResponse) -> ReportInputs {
        ReportInputs {
            measured_url: "https://example.com/".to_string(),
            root_url: "https://example.com".to_string(),
            scope: Scope::Root,
            is_https: true,
            strategy: Strategy::Mobile,
            data,
            snapshot: PageSnapshot {
                html: html.to_string(),
                status: Some(200),
                ok: true,
            },
            robots: RobotsFetch {
                status: resource("https://example.com/robots.txt", robots_body.is_some()),
                body: robots_body.map(str::to_string),
            },
            sitemap: resource("https://example.com/sitemap.xml", true),
        }
    }

    #[test]
    fn test_default_config() {
        let config = MeasureConfig::default();
        assert_eq!(config.pagespeed_endpoint, pagespeed::PAGESPEED_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.api_key.is_none());
        assert!(config.user_agent.starts_with("seorank/"));
    }

    #[test]
    fn test_config_builders() {
        let config = MeasureConfig::default()
            .with_endpoint("http://localhost/psi")
            .with_api_key(Some("k".to_string()));
        assert_eq!(config.pagespeed_endpoint, "http://localhost/psi");
        assert_eq!(config.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_assemble_blocked_page() {
        let html = "<html><head><title>Blocked</title></head><body><h1>Blocked</h1></body></html>";
        let report = assemble_report(inputs(
            html,
            Some("User-agent: *\nDisallow: /"),
            PageSpeedResponse::default(),
        ));

        assert!(report.crawlability.is_blocked_by_robots);
        assert!(!report.crawlability.is_accessible);
        assert_eq!(report.performance_score, None);
        assert_eq!(report.mobile_friendly.status, MobileStatus::Unknown);
        assert_eq!(report.meta.description_status, LengthStatus::Missing);
        assert_eq!(report.performance_label, "Lighthouse (mobile)");
        assert_eq!(
            report.core_web_vitals.field_summary,
            "Field data currently unavailable."
        );
        assert!(report.page_speed_meta.is_none());
    }

    #[test]
    fn test_missing_robots_fails_open() {
        let report = assemble_report(inputs("<p>hi</p>", None, PageSpeedResponse::default()));
        assert!(!report.crawlability.is_blocked_by_robots);
        assert!(!report.robots.exists);
    }

    #[test]
    fn test_assemble_uses_lab_values() {
        let data: PageSpeedResponse = serde_json::from_value(json!({
            "lighthouseResult": {
                "categories": {"performance": {"score": 0.5}},
                "audits": {
                    "largest-contentful-paint": {"numericValue": 5000},
                    "cumulative-layout-shift": {"numericValue": 0.3},
                    "mobile-friendly": {"score": 0}
                }
            }
        }))
        .unwrap();

        let report = assemble_report(inputs("", None, data));
        assert_eq!(report.performance_score, Some(50));
        assert_eq!(report.mobile_friendly.status, MobileStatus::Fail);
        // 15 (LCP) + 0 (CLS) + 0 (mobile) + 20 (https)
        assert_eq!(report.seo_readiness.tech_experience(), 35);
        assert_eq!(
            report.core_web_vitals.lab_summary,
            "Lab data: LCP 5.0s · CLS 0.30 · FID —"
        );
        assert!(report
            .performance_detail
            .starts_with("Measured https://example.com/ with PageSpeed Insights (mobile)."));
    }
}
