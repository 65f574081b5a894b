//! Terminal rendering of reports and leaderboard pages

use std::fmt::Write as FmtWrite;

use seorank_core::pagespeed::{METRIC_AUDITS, OPPORTUNITY_AUDITS};
use seorank_core::types::{LengthStatus, MobileStatus, ResourceStatus};
use seorank_core::{MeasureResponse, PaginatedRankingData, RankingEntry};

const DIVIDER: &str = "─────────────────────────────────────────────────────────────";
const LABEL_WIDTH: usize = 18;

pub fn push_section_header(buf: &mut String, icon: &str, title: &str) {
    let _ = writeln!(buf, "{DIVIDER}");
    let _ = writeln!(buf, "{icon} {title}");
    let _ = writeln!(buf, "{DIVIDER}");
}

pub fn push_key_value(buf: &mut String, label: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let _ = writeln!(buf, "• {:<width$} : {}", label, value, width = LABEL_WIDTH);
}

fn check_mark(ok: bool) -> &'static str {
    if ok { "✅" } else { "❌" }
}

fn length_label(status: LengthStatus, length: usize, limit: usize) -> String {
    match status {
        LengthStatus::Missing => "❌ missing".to_string(),
        LengthStatus::Within => format!("✅ {length}/{limit} characters"),
        LengthStatus::Long => format!("⚠️ {length}/{limit} characters (too long)"),
    }
}

fn mobile_label(status: MobileStatus) -> &'static str {
    match status {
        MobileStatus::Pass => "✅ pass",
        MobileStatus::Fail => "❌ fail",
        MobileStatus::Unknown => "❔ unknown",
    }
}

fn resource_label(resource: &ResourceStatus) -> String {
    format!(
        "{} {} ({})",
        check_mark(resource.exists),
        resource.url,
        resource.message
    )
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "–".to_string())
}

/// Sectioned report for one measurement
pub fn render_report(report: &MeasureResponse) -> String {
    let mut out = String::new();
    let readiness = &report.seo_readiness;

    push_section_header(&mut out, "🔎", &format!("SEO Readiness: {}", report.measured_url));
    push_key_value(&mut out, "Overall", &format!("{}/100", readiness.overall()));
    push_key_value(&mut out, "Crawlability", &format!("{}/100 (40%)", readiness.crawlability()));
    push_key_value(&mut out, "Basic on-page", &format!("{}/100 (35%)", readiness.basic_on_page()));
    push_key_value(
        &mut out,
        "Tech & experience",
        &format!("{}/100 (15%)", readiness.tech_experience()),
    );
    push_key_value(
        &mut out,
        "SEO opportunity",
        &format!("{}/100 (10%)", readiness.seo_opportunity()),
    );
    let _ = writeln!(out);

    push_section_header(&mut out, "⚡", &report.performance_label);
    push_key_value(
        &mut out,
        "Performance",
        &or_dash(report.performance_score.map(|score| format!("{score}/100"))),
    );
    push_key_value(&mut out, "Lab", &report.core_web_vitals.lab_summary);
    push_key_value(&mut out, "Field", &report.core_web_vitals.field_summary);
    push_key_value(&mut out, "Mobile friendly", mobile_label(report.mobile_friendly.status));
    push_key_value(&mut out, "Mobile detail", &report.mobile_friendly.message);
    let _ = writeln!(out);

    push_section_header(&mut out, "🕷️", "Crawlability");
    let crawl = &report.crawlability;
    push_key_value(
        &mut out,
        "HTTP status",
        &or_dash(crawl.http_status.map(|status| status.to_string())),
    );
    push_key_value(&mut out, "Accessible", check_mark(crawl.is_accessible));
    push_key_value(&mut out, "Robots allowed", check_mark(!crawl.is_blocked_by_robots));
    push_key_value(&mut out, "Indexable", check_mark(!crawl.has_noindex));
    push_key_value(&mut out, "Links followed", check_mark(!crawl.has_nofollow));
    push_key_value(&mut out, "Static content", check_mark(!crawl.requires_js_for_content));
    push_key_value(&mut out, "robots.txt", &resource_label(&report.robots));
    push_key_value(&mut out, "Sitemap", &resource_label(&report.sitemap));
    push_key_value(&mut out, "HTTPS", check_mark(report.is_https));
    let _ = writeln!(out);

    push_section_header(&mut out, "📝", "On-page");
    let meta = &report.meta;
    push_key_value(&mut out, "Title", &or_dash(meta.title.clone()));
    push_key_value(
        &mut out,
        "Title length",
        &length_label(meta.title_status, meta.title_length, meta.title_limit),
    );
    push_key_value(&mut out, "Description", &or_dash(meta.description.clone()));
    push_key_value(
        &mut out,
        "Description length",
        &length_label(
            meta.description_status,
            meta.description_length,
            meta.description_limit,
        ),
    );
    let headings = &report.headings;
    push_key_value(
        &mut out,
        "Headings",
        &format!(
            "h1 {} · h2 {} · h3 {}",
            headings.h1_count, headings.h2_count, headings.h3_count
        ),
    );
    push_key_value(&mut out, "H1", &or_dash(headings.h1_text.clone()));
    push_key_value(&mut out, "Unique H1", check_mark(headings.has_unique_h1));
    push_key_value(&mut out, "H1 matches title", check_mark(headings.h1_matches_title));
    push_key_value(&mut out, "Structure", check_mark(headings.has_proper_structure));
    let canonical = &report.canonical;
    push_key_value(
        &mut out,
        "Canonical",
        &match (&canonical.url, canonical.points_to_self) {
            (Some(url), true) => format!("✅ {url} (self)"),
            (Some(url), false) => format!("⚠️ {url}"),
            (None, _) => "❌ missing".to_string(),
        },
    );
    if canonical.has_parameter_pollution {
        push_key_value(&mut out, "Tracking params", "⚠️ present in measured URL");
    }
    push_key_value(
        &mut out,
        "Content",
        &format!(
            "{} words · {} text chars · {} html chars",
            report.content_summary.word_count,
            report.content_summary.text_characters,
            report.content_summary.html_characters
        ),
    );
    let _ = writeln!(out);

    render_insights(&mut out, report);

    out
}

fn render_insights(buf: &mut String, report: &MeasureResponse) {
    let Some(meta) = report.page_speed_meta.as_ref() else {
        return;
    };

    push_section_header(buf, "📊", "Lighthouse Insights");
    for definition in METRIC_AUDITS {
        push_key_value(buf, definition.label, &meta.metric_display(definition));
    }

    for (key, label) in OPPORTUNITY_AUDITS {
        if let Some(display) = meta
            .audits
            .get(*key)
            .and_then(|audit| audit.display_value.clone().or_else(|| audit.title.clone()))
        {
            push_key_value(buf, label, &display);
        }
    }

    if let Some(total) = meta.resource_row("total") {
        let kib = total.transfer_size.map(|bytes| format!("{:.0} KiB", bytes / 1024.0));
        let requests = total.request_count.map(|count| format!("{count} requests"));
        let summary: Vec<String> = [requests, kib].into_iter().flatten().collect();
        push_key_value(buf, "Page weight", &summary.join(" · "));
    }
    let _ = writeln!(buf);
}

/// Where the freshly recorded site landed
pub fn render_rank_position(entry: &RankingEntry, position: Option<usize>, total: usize) -> String {
    let mut out = String::new();
    push_section_header(&mut out, "🏆", "Leaderboard");
    push_key_value(&mut out, "Site", &entry.root_url);
    push_key_value(&mut out, "Score", &entry.score.to_string());
    push_key_value(
        &mut out,
        "Position",
        &match position {
            Some(position) => format!("#{position} of {total}"),
            None => format!("outside the top {total}"),
        },
    );
    out
}

/// One leaderboard page as a table
pub fn render_ranking(data: &PaginatedRankingData) -> String {
    let mut out = String::new();
    push_section_header(
        &mut out,
        "🏆",
        &format!(
            "Leaderboard (page {} of {})",
            data.page,
            data.total_pages.max(1)
        ),
    );

    if data.entries.is_empty() {
        if data.total_entries == 0 {
            let _ = writeln!(out, "No ranked sites yet.");
        } else {
            let _ = writeln!(
                out,
                "No entries on this page; the leaderboard has {} page(s).",
                data.total_pages
            );
        }
        return out;
    }

    let headers = ["#", "Site", "Score", "Perf", "Mobile", "HTTPS", "Measured"];
    let first_rank = data.first_rank();
    let rows: Vec<Vec<String>> = data
        .entries
        .iter()
        .enumerate()
        .map(|(offset, entry)| {
            vec![
                (first_rank + offset).to_string(),
                entry.root_url.clone(),
                entry.score.to_string(),
                or_dash(entry.performance_score.map(|score| score.to_string())),
                check_mark(entry.mobile_friendly).to_string(),
                check_mark(entry.is_https).to_string(),
                entry.measured_at.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let format_row = |cells: &[String]| -> String {
        let parts: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| format!(" {:<width$} ", cell, width = widths[idx]))
            .collect();
        format!("|{}|", parts.join("|"))
    };

    let header_cells: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    let _ = writeln!(out, "{}", format_row(&header_cells));
    let separator: Vec<String> = widths
        .iter()
        .map(|width| format!(" {:-<width$} ", "", width = *width))
        .collect();
    let _ = writeln!(out, "|{}|", separator.join("|"));
    for row in &rows {
        let _ = writeln!(out, "{}", format_row(row));
    }

    let _ = writeln!(
        out,
        "\n{} sites ranked · updated {}",
        data.total_entries,
        data.updated_at.format("%Y-%m-%d %H:%M UTC")
    );
    if data.has_next_page() {
        let _ = writeln!(out, "Next: --page {}", data.page + 1);
    }

    out
}
