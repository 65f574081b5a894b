//! # seorank-core
//!
//! Core library for auditing a page's SEO readiness and keeping a leaderboard of audited sites.
//!
//! This library provides:
//! - Regex based extraction of on-page signals (title, description, headings, canonical, robots meta)
//! - robots.txt policy evaluation
//! - A deterministic, four-layer SEO readiness score
//! - A paginated, capacity-bounded ranking store over any key/value backend
//!
//! ## Features
//!
//! - `default`: everything, including network measurement
//! - `measure`: the PageSpeed Insights client and the measurement orchestrator (pulls `reqwest`)
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use seorank_core::{FsKvStore, RankingStore, Strategy};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let report = seorank_core::measure_page_speed("example.com", Strategy::Mobile).await?;
//! println!("overall readiness: {}", report.seo_readiness.overall());
//!
//! let store = RankingStore::new(Arc::new(FsKvStore::new(".seorank").await?));
//! store.calculate_and_update_ranking(&report).await?;
//! let first_page = store.get_paginated_ranking(1, 20).await;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod kv;
pub mod pagespeed;
pub mod parser;
pub mod ranking;
pub mod readiness;
pub mod robots;
pub mod types;
pub mod url_utils;

#[cfg(feature = "measure")]
pub mod measure;

#[cfg(feature = "measure")]
pub mod resources;

// Re-export commonly used types
pub use error::{KvError, MeasureError, RankingError};
pub use kv::{FsKvStore, KvStore, MemoryKvStore};
pub use ranking::{
    PaginatedRankingData, RankingData, RankingEntry, RankingMeta, RankingStore,
    DEFAULT_PAGE_SIZE, MAX_ENTRIES,
};
pub use types::{MeasureResponse, Scope, SeoReadiness, Strategy};

#[cfg(feature = "measure")]
pub use measure::{measure_page_speed, MeasureConfig, Measurer};
