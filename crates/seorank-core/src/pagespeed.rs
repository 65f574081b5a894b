//! PageSpeed Insights / Lighthouse response model
//!
//! Only the parts of the (very large) response that the report uses are modelled. Unknown
//! keys in `environment` and `configSettings` are kept so they can be passed through.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};

#[cfg(feature = "measure")]
use crate::error::MeasureError;
#[cfg(feature = "measure")]
use crate::types::Strategy;
use crate::types::{FieldMetric, MobileStatus};

pub const PAGESPEED_URL: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

/// Upstream error bodies are cut to this many characters.
pub const MAX_ERROR_DETAIL: usize = 1024;

pub const LCP_AUDIT: &str = "largest-contentful-paint";
pub const CLS_AUDIT: &str = "cumulative-layout-shift";
pub const FID_AUDIT: &str = "first-input-delay";
pub const MOBILE_FRIENDLY_AUDIT: &str = "mobile-friendly";
pub const RESOURCE_SUMMARY_AUDIT: &str = "resource-summary";

pub const LCP_FIELD_KEY: &str = "LARGEST_CONTENTFUL_PAINT_MS";
pub const CLS_FIELD_KEY: &str = "CUMULATIVE_LAYOUT_SHIFT_SCORE";
pub const FID_FIELD_KEY: &str = "FIRST_INPUT_DELAY_MS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpeedResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub loading_experience: Option<LoadingExperience>,
    #[serde(default)]
    pub origin_loading_experience: Option<LoadingExperience>,
    #[serde(default)]
    pub lighthouse_result: Option<LighthouseResult>,
    #[serde(default, rename = "analysisUTCTimestamp")]
    pub analysis_utc_timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LighthouseResult {
    #[serde(default)]
    pub requested_url: Option<String>,
    #[serde(default)]
    pub final_url: Option<String>,
    #[serde(default)]
    pub lighthouse_version: Option<String>,
    #[serde(default)]
    pub fetch_time: Option<String>,
    #[serde(default)]
    pub environment: Option<LighthouseEnvironment>,
    #[serde(default)]
    pub config_settings: Option<LighthouseConfigSettings>,
    #[serde(default)]
    pub categories: HashMap<String, LighthouseCategory>,
    #[serde(default)]
    pub audits: BTreeMap<String, LighthouseAudit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LighthouseCategory {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LighthouseAudit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LighthouseEnvironment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark_index: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LighthouseConfigSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_factor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Real-user data for a page or an origin. The API uses snake_case here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadingExperience {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub metrics: BTreeMap<String, FieldDataMetric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDataMetric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub distributions: Vec<FieldDistribution>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDistribution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proportion: Option<f64>,
}

/// Lighthouse run metadata kept on the report for later inspection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSpeedMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<LighthouseEnvironment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_settings: Option<LighthouseConfigSettings>,
    #[serde(default)]
    pub audits: BTreeMap<String, LighthouseAudit>,
}

impl PageSpeedResponse {
    /// Performance category score scaled to 0-100
    pub fn performance_score(&self) -> Option<u8> {
        self.lighthouse_result
            .as_ref()
            .and_then(|lh| lh.categories.get("performance"))
            .and_then(|category| category.score)
            .map(|score| (score * 100.0).round().clamp(0.0, 100.0) as u8)
    }

    pub fn audit(&self, key: &str) -> Option<&LighthouseAudit> {
        self.lighthouse_result
            .as_ref()
            .and_then(|lh| lh.audits.get(key))
    }

    /// `numericValue` of a lab audit
    pub fn audit_value(&self, key: &str) -> Option<f64> {
        self.audit(key).and_then(|audit| audit.numeric_value)
    }

    /// Field-data category such as `FAST` or `AVERAGE`
    pub fn field_category(&self, field_key: &str) -> Option<String> {
        self.loading_experience
            .as_ref()
            .and_then(|experience| experience.metrics.get(field_key))
            .and_then(|metric| metric.category.clone())
    }

    /// Lab value paired with the field category for the same metric
    pub fn metric(&self, audit_key: &str, field_key: &str) -> FieldMetric {
        FieldMetric {
            value: self.audit_value(audit_key),
            category: self.field_category(field_key),
        }
    }

    /// `pass` only on a score of exactly 1, `fail` on exactly 0
    pub fn mobile_status(&self) -> MobileStatus {
        match self.audit(MOBILE_FRIENDLY_AUDIT).and_then(|audit| audit.score) {
            Some(score) if score == 1.0 => MobileStatus::Pass,
            Some(score) if score == 0.0 => MobileStatus::Fail,
            _ => MobileStatus::Unknown,
        }
    }

    pub fn page_speed_meta(&self) -> Option<PageSpeedMeta> {
        self.lighthouse_result.as_ref().map(|lh| PageSpeedMeta {
            fetch_time: lh
                .fetch_time
                .clone()
                .or_else(|| self.analysis_utc_timestamp.clone()),
            environment: lh.environment.clone(),
            config_settings: lh.config_settings.clone(),
            audits: lh.audits.clone(),
        })
    }
}

pub fn mobile_detail(audit: Option<&LighthouseAudit>) -> String {
    audit
        .and_then(|a| a.display_value.clone().or_else(|| a.description.clone()))
        .filter(|detail| !detail.is_empty())
        .unwrap_or_else(|| {
            "Lighthouse evaluated viewport, tap targets, and text sizing for mobile experience."
                .to_string()
        })
}

pub fn mobile_message(status: MobileStatus) -> &'static str {
    match status {
        MobileStatus::Pass => "Viewport and tap targets pass mobile-friendly checks.",
        MobileStatus::Fail => "Lighthouse detected mobile-specific issues that need attention.",
        MobileStatus::Unknown => "Mobile-friendly status is not available for this scan.",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabMetricKind {
    /// Milliseconds shown as seconds
    Time,
    /// Unitless shift score
    Shift,
    /// Milliseconds shown as milliseconds
    Delay,
}

pub fn format_lab_metric(value: Option<f64>, kind: LabMetricKind) -> String {
    match (value, kind) {
        (None, _) => "—".to_string(),
        (Some(v), LabMetricKind::Shift) => format!("{v:.2}"),
        (Some(v), LabMetricKind::Time) => format!("{:.1}s", v / 1000.0),
        (Some(v), LabMetricKind::Delay) => format!("{}ms", v.round()),
    }
}

pub fn build_lab_summary(lcp: Option<f64>, cls: Option<f64>, fid: Option<f64>) -> String {
    format!(
        "Lab data: LCP {} · CLS {} · FID {}",
        format_lab_metric(lcp, LabMetricKind::Time),
        format_lab_metric(cls, LabMetricKind::Shift),
        format_lab_metric(fid, LabMetricKind::Delay)
    )
}

/// Field categories that are known, in LCP/CLS/FID order
pub fn build_field_summary(metrics: Option<[&FieldMetric; 3]>) -> String {
    let Some(metrics) = metrics else {
        return "Field data not available yet.".to_string();
    };

    let entries: Vec<String> = ["LCP", "CLS", "FID"]
        .iter()
        .zip(metrics)
        .filter_map(|(label, metric)| {
            metric
                .category
                .as_ref()
                .map(|category| format!("{label} {category}"))
        })
        .collect();

    if entries.is_empty() {
        "Field data currently unavailable.".to_string()
    } else {
        format!("Field data: {}", entries.join(" · "))
    }
}

/// Lab metric shown in the insight listing
#[derive(Debug, Clone, Copy)]
pub struct MetricDefinition {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: LabMetricKind,
}

pub const METRIC_AUDITS: &[MetricDefinition] = &[
    MetricDefinition {
        key: "first-contentful-paint",
        label: "First Contentful Paint",
        kind: LabMetricKind::Time,
    },
    MetricDefinition {
        key: LCP_AUDIT,
        label: "Largest Contentful Paint",
        kind: LabMetricKind::Time,
    },
    MetricDefinition {
        key: "speed-index",
        label: "Speed Index",
        kind: LabMetricKind::Delay,
    },
    MetricDefinition {
        key: "interactive",
        label: "Time to Interactive",
        kind: LabMetricKind::Time,
    },
    MetricDefinition {
        key: "total-blocking-time",
        label: "Total Blocking Time",
        kind: LabMetricKind::Delay,
    },
    MetricDefinition {
        key: "max-potential-fid",
        label: "Max Potential FID",
        kind: LabMetricKind::Delay,
    },
    MetricDefinition {
        key: CLS_AUDIT,
        label: "Cumulative Layout Shift",
        kind: LabMetricKind::Shift,
    },
];

pub const OPPORTUNITY_AUDITS: &[(&str, &str)] = &[
    ("render-blocking-insight", "Render blocking"),
    ("unused-javascript", "Unused JavaScript"),
    ("legacy-javascript-insight", "Legacy JavaScript"),
    ("cache-insight", "Cache hints"),
    ("third-parties-insight", "Third parties"),
];

/// One row of the `resource-summary` audit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSummaryItem {
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub transfer_size: Option<f64>,
    #[serde(default)]
    pub request_count: Option<u64>,
}

impl PageSpeedMeta {
    /// Display value of an audit, falling back to its formatted numeric value
    pub fn metric_display(&self, definition: &MetricDefinition) -> String {
        match self.audits.get(definition.key) {
            Some(LighthouseAudit {
                display_value: Some(display),
                ..
            }) => display.clone(),
            Some(audit) if audit.numeric_value.is_some() => {
                format_lab_metric(audit.numeric_value, definition.kind)
            }
            _ => "—".to_string(),
        }
    }

    pub fn resource_summary(&self) -> Vec<ResourceSummaryItem> {
        self.audits
            .get(RESOURCE_SUMMARY_AUDIT)
            .and_then(|audit| audit.details.as_ref())
            .and_then(|details| details.get("items"))
            .and_then(|items| serde_json::from_value(items.clone()).ok())
            .unwrap_or_default()
    }

    pub fn resource_row(&self, resource_type: &str) -> Option<ResourceSummaryItem> {
        self.resource_summary()
            .into_iter()
            .find(|item| item.resource_type.as_deref() == Some(resource_type))
    }
}

/// Call the PageSpeed API for one URL.
///
/// Any non-success status is fatal for the measurement.
#[cfg(feature = "measure")]
pub async fn fetch_pagespeed(
    client: &reqwest::Client,
    endpoint: &str,
    target_url: &str,
    strategy: Strategy,
    api_key: Option<&str>,
) -> Result<PageSpeedResponse, MeasureError> {
    let mut query = vec![("url", target_url), ("strategy", strategy.as_str())];
    if let Some(key) = api_key {
        query.push(("key", key));
    }

    tracing::debug!(url = target_url, %strategy, "requesting PageSpeed run");

    let response = client
        .get(endpoint)
        .query(&query)
        .send()
        .await
        .map_err(|e| MeasureError::Http(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let detail = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error from PageSpeed Insights.".to_string());
        return Err(MeasureError::Upstream {
            status: status.as_u16(),
            detail: truncate_chars(&detail, MAX_ERROR_DETAIL),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| MeasureError::Http(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| MeasureError::InvalidResponse(e.to_string()))
}

#[cfg(any(feature = "measure", test))]
pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_response() -> PageSpeedResponse {
        serde_json::from_value(json!({
            "id": "https://example.com/",
            "loadingExperience": {
                "metrics": {
                    "LARGEST_CONTENTFUL_PAINT_MS": {"percentile": 2300, "category": "FAST"},
                    "CUMULATIVE_LAYOUT_SHIFT_SCORE": {"percentile": 5, "category": "AVERAGE"}
                },
                "overall_category": "AVERAGE"
            },
            "lighthouseResult": {
                "fetchTime": "2025-01-01T00:00:00.000Z",
                "environment": {"networkUserAgent": "UA", "benchmarkIndex": 1500, "credits": {}},
                "configSettings": {"formFactor": "mobile", "locale": "en-US"},
                "categories": {"performance": {"score": 0.92}},
                "audits": {
                    "largest-contentful-paint": {"numericValue": 2100, "displayValue": "2.1 s"},
                    "cumulative-layout-shift": {"numericValue": 0.05},
                    "mobile-friendly": {"score": 1},
                    "total-blocking-time": {"numericValue": 120.4},
                    "resource-summary": {"details": {"items": [
                        {"resourceType": "total", "transferSize": 204800, "requestCount": 42},
                        {"resourceType": "script", "transferSize": 102400, "requestCount": 12}
                    ]}}
                }
            },
            "analysisUTCTimestamp": "2025-01-01T00:00:01.000Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_performance_score_scaled() {
        assert_eq!(sample_response().performance_score(), Some(92));
        assert_eq!(PageSpeedResponse::default().performance_score(), None);
    }

    #[test]
    fn test_metric_pairs_lab_and_field() {
        let response = sample_response();
        let lcp = response.metric(LCP_AUDIT, LCP_FIELD_KEY);
        assert_eq!(lcp.value, Some(2100.0));
        assert_eq!(lcp.category.as_deref(), Some("FAST"));

        let fid = response.metric(FID_AUDIT, FID_FIELD_KEY);
        assert_eq!(fid, FieldMetric::default());
    }

    #[test]
    fn test_mobile_status() {
        assert_eq!(sample_response().mobile_status(), MobileStatus::Pass);

        let fail: PageSpeedResponse = serde_json::from_value(json!({
            "lighthouseResult": {"audits": {"mobile-friendly": {"score": 0}}}
        }))
        .unwrap();
        assert_eq!(fail.mobile_status(), MobileStatus::Fail);

        let partial: PageSpeedResponse = serde_json::from_value(json!({
            "lighthouseResult": {"audits": {"mobile-friendly": {"score": 0.5}}}
        }))
        .unwrap();
        assert_eq!(partial.mobile_status(), MobileStatus::Unknown);

        let null_score: PageSpeedResponse = serde_json::from_value(json!({
            "lighthouseResult": {"audits": {"mobile-friendly": {"score": null}}}
        }))
        .unwrap();
        assert_eq!(null_score.mobile_status(), MobileStatus::Unknown);
        assert_eq!(PageSpeedResponse::default().mobile_status(), MobileStatus::Unknown);
    }

    #[test]
    fn test_page_speed_meta_keeps_unknown_environment_keys() {
        let meta = sample_response().page_speed_meta().unwrap();
        assert_eq!(meta.fetch_time.as_deref(), Some("2025-01-01T00:00:00.000Z"));
        let environment = meta.environment.unwrap();
        assert_eq!(environment.network_user_agent.as_deref(), Some("UA"));
        assert!(environment.extra.contains_key("credits"));
        assert_eq!(
            meta.config_settings.unwrap().form_factor.as_deref(),
            Some("mobile")
        );
    }

    #[test]
    fn test_lab_summary_formatting() {
        assert_eq!(
            build_lab_summary(Some(2100.0), Some(0.05), Some(12.4)),
            "Lab data: LCP 2.1s · CLS 0.05 · FID 12ms"
        );
        assert_eq!(
            build_lab_summary(None, None, None),
            "Lab data: LCP — · CLS — · FID —"
        );
    }

    #[test]
    fn test_field_summary() {
        let response = sample_response();
        let lcp = response.metric(LCP_AUDIT, LCP_FIELD_KEY);
        let cls = response.metric(CLS_AUDIT, CLS_FIELD_KEY);
        let fid = response.metric(FID_AUDIT, FID_FIELD_KEY);
        assert_eq!(
            build_field_summary(Some([&lcp, &cls, &fid])),
            "Field data: LCP FAST · CLS AVERAGE"
        );

        let empty = FieldMetric::default();
        assert_eq!(
            build_field_summary(Some([&empty, &empty, &empty])),
            "Field data currently unavailable."
        );
        assert_eq!(build_field_summary(None), "Field data not available yet.");
    }

    #[test]
    fn test_metric_display_prefers_display_value() {
        let meta = sample_response().page_speed_meta().unwrap();
        let lcp = METRIC_AUDITS.iter().find(|m| m.key == LCP_AUDIT).unwrap();
        let tbt = METRIC_AUDITS
            .iter()
            .find(|m| m.key == "total-blocking-time")
            .unwrap();
        let fcp = METRIC_AUDITS
            .iter()
            .find(|m| m.key == "first-contentful-paint")
            .unwrap();
        assert_eq!(meta.metric_display(lcp), "2.1 s");
        assert_eq!(meta.metric_display(tbt), "120ms");
        assert_eq!(meta.metric_display(fcp), "—");
    }

    #[test]
    fn test_resource_summary_rows() {
        let meta = sample_response().page_speed_meta().unwrap();
        assert_eq!(meta.resource_summary().len(), 2);
        let total = meta.resource_row("total").unwrap();
        assert_eq!(total.request_count, Some(42));
        assert!(meta.resource_row("third-party").is_none());
    }

    #[test]
    fn test_mobile_detail_fallback() {
        assert!(mobile_detail(None).starts_with("Lighthouse evaluated viewport"));
        let audit = LighthouseAudit {
            description: Some("Checks viewport".to_string()),
            ..Default::default()
        };
        assert_eq!(mobile_detail(Some(&audit)), "Checks viewport");
    }

    #[test]
    fn test_truncate_chars() {
        let long = "x".repeat(2000);
        assert_eq!(truncate_chars(&long, MAX_ERROR_DETAIL).len(), 1024);
        assert_eq!(truncate_chars("short", MAX_ERROR_DETAIL), "short");
    }
}
