//! Paginated leaderboard of audited sites
//!
//! The store keeps four kinds of records in a [`KvStore`]:
//!
//! - `ranking:index`: the authoritative order, `[{url, score}]` sorted by score
//! - `ranking:entry:<rootUrl>`: the full [`RankingEntry`] for each indexed site
//! - `ranking:page:<n>`: denormalized page slices, rebuilt wholesale on every write
//! - `ranking:meta`: totals and page size, written last
//!
//! Reading one page costs a meta read plus a page read regardless of how many sites are ranked.
//! Writes are a non-atomic read-modify-write; pages can always be rebuilt from the index.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::RankingError;
use crate::kv::KvStore;
use crate::types::{LengthStatus, MeasureResponse, MobileStatus, Scope, SeoReadiness};

pub const MAX_ENTRIES: usize = 100;
pub const DEFAULT_PAGE_SIZE: usize = 20;

pub const INDEX_KEY: &str = "ranking:index";
pub const META_KEY: &str = "ranking:meta";
pub const ENTRY_PREFIX: &str = "ranking:entry:";
pub const PAGE_PREFIX: &str = "ranking:page:";
/// Single-blob format written by earlier releases
pub const LEGACY_KEY: &str = "seo_ranking";

pub fn entry_key(root_url: &str) -> String {
    format!("{ENTRY_PREFIX}{root_url}")
}

pub fn page_key(page: usize) -> String {
    format!("{PAGE_PREFIX}{page}")
}

/// Lab values only
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingVitals {
    pub lcp: Option<f64>,
    pub cls: Option<f64>,
    pub fid: Option<f64>,
}

/// One ranked site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub url: String,
    pub root_url: String,
    pub score: u8,
    pub measured_at: DateTime<Utc>,
    pub performance_score: Option<u8>,
    pub core_web_vitals: RankingVitals,
    pub mobile_friendly: bool,
    pub is_https: bool,
    pub has_robots: bool,
    pub has_sitemap: bool,
    pub meta_score: u8,
    pub content_score: u8,
    #[serde(default)]
    pub seo_readiness: SeoReadiness,
}

/// Index row; `url` is the site's root URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub url: String,
    pub score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingMeta {
    pub total_entries: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingPage {
    pub page: usize,
    pub entries: Vec<RankingEntry>,
}

/// Whole leaderboard; also the shape of the legacy blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingData {
    pub entries: Vec<RankingEntry>,
    pub updated_at: DateTime<Utc>,
}

impl RankingData {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedRankingData {
    pub entries: Vec<RankingEntry>,
    pub page: usize,
    pub page_size: usize,
    pub total_entries: usize,
    pub total_pages: usize,
    pub updated_at: DateTime<Utc>,
}

impl PaginatedRankingData {
    pub fn empty(page: usize, page_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            page,
            page_size,
            total_entries: 0,
            total_pages: 0,
            updated_at: Utc::now(),
        }
    }

    fn from_meta(meta: &RankingMeta, page: usize, entries: Vec<RankingEntry>) -> Self {
        Self {
            entries,
            page,
            page_size: meta.page_size,
            total_entries: meta.total_entries,
            total_pages: meta.total_pages,
            updated_at: meta.updated_at,
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages
    }

    /// 1-based rank of the first entry on this page
    pub fn first_rank(&self) -> usize {
        (self.page.saturating_sub(1)) * self.page_size + 1
    }
}

/// Project a root-scope report onto a ranking row
pub fn create_ranking_entry(measurement: &MeasureResponse, score: u8) -> RankingEntry {
    let meta_score = if measurement.meta.title_status == LengthStatus::Within
        && measurement.meta.description_status == LengthStatus::Within
    {
        100
    } else {
        50
    };

    let words = measurement.content_summary.word_count as f64;
    let content_score = ((words / 500.0) * 100.0).round().min(100.0) as u8;

    RankingEntry {
        url: measurement.measured_url.clone(),
        root_url: measurement.root_url.clone(),
        score,
        measured_at: measurement.measured_at,
        performance_score: measurement.performance_score,
        core_web_vitals: RankingVitals {
            lcp: measurement.core_web_vitals.lcp.value,
            cls: measurement.core_web_vitals.cls.value,
            fid: measurement.core_web_vitals.fid.value,
        },
        mobile_friendly: measurement.mobile_friendly.status == MobileStatus::Pass,
        is_https: measurement.is_https,
        has_robots: measurement.robots.exists,
        has_sitemap: measurement.sitemap.exists,
        meta_score,
        content_score,
        seo_readiness: measurement.seo_readiness,
    }
}

/// Leaderboard score for a report
pub fn calculate_score(measurement: &MeasureResponse) -> u8 {
    measurement.seo_readiness.overall()
}

/// Leaderboard persisted in a shared key/value store
#[derive(Clone)]
pub struct RankingStore {
    kv: Arc<dyn KvStore>,
}

impl RankingStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Record a root-scope report. Page-scope reports are ignored and leave the store untouched.
    pub async fn calculate_and_update_ranking(
        &self,
        measurement: &MeasureResponse,
    ) -> Result<Option<RankingEntry>, RankingError> {
        if measurement.scope != Scope::Root {
            tracing::debug!(url = %measurement.measured_url, "page scope, not ranked");
            return Ok(None);
        }

        let entry = create_ranking_entry(measurement, calculate_score(measurement));
        self.update_ranking(&entry).await?;
        Ok(Some(entry))
    }

    /// Upsert by root URL and rebuild pages.
    ///
    /// A failed attempt is followed by one legacy migration and a single retry.
    pub async fn update_ranking(&self, entry: &RankingEntry) -> Result<RankingMeta, RankingError> {
        match self.try_update(entry).await {
            Ok(meta) => Ok(meta),
            Err(e) => {
                tracing::warn!(
                    root_url = %entry.root_url,
                    error = %e,
                    "ranking update failed, retrying after migration"
                );
                if let Err(migrate_err) = self.migrate_legacy().await {
                    tracing::warn!(error = %migrate_err, "legacy migration during recovery failed");
                }
                self.try_update(entry).await
            }
        }
    }

    async fn try_update(&self, entry: &RankingEntry) -> Result<RankingMeta, RankingError> {
        let previous_meta = self.read_meta().await?;
        let mut index = self.load_index().await?;
        let previous_urls: Vec<String> = index.iter().map(|row| row.url.clone()).collect();

        index.retain(|row| row.url != entry.root_url);
        index.push(IndexEntry {
            url: entry.root_url.clone(),
            score: entry.score,
        });
        index.sort_by(|a, b| b.score.cmp(&a.score));
        index.truncate(MAX_ENTRIES);

        let survives = index.iter().any(|row| row.url == entry.root_url);
        if survives {
            self.put_json(&entry_key(&entry.root_url), entry).await?;
        }
        self.put_json(INDEX_KEY, &index).await?;

        let page_size = previous_meta
            .as_ref()
            .map(|meta| meta.page_size)
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let stale_pages = previous_meta.map(|meta| meta.total_pages).unwrap_or(0);

        let entries = self.load_entries(&index, survives.then_some(entry)).await?;
        if entries.len() < index.len() {
            // Rows whose entry record vanished give up their slot
            let present: HashSet<&str> = entries.iter().map(|e| e.root_url.as_str()).collect();
            index.retain(|row| present.contains(row.url.as_str()));
            self.put_json(INDEX_KEY, &index).await?;
        }
        let meta = self.write_pages(&entries, page_size, stale_pages).await?;

        let kept: HashSet<&str> = index.iter().map(|row| row.url.as_str()).collect();
        for url in previous_urls.iter().filter(|url| !kept.contains(url.as_str())) {
            self.kv.delete(&entry_key(url)).await?;
            tracing::debug!(root_url = %url, "pruned entry outside the top ranking");
        }

        tracing::info!(
            root_url = %entry.root_url,
            score = entry.score,
            ranked = survives,
            total = meta.total_entries,
            "ranking updated"
        );

        Ok(meta)
    }

    /// Full leaderboard. Failures are logged and read as an empty ranking.
    pub async fn get_ranking(&self) -> RankingData {
        match self.try_get_ranking().await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read ranking");
                RankingData::empty()
            }
        }
    }

    async fn try_get_ranking(&self) -> Result<RankingData, RankingError> {
        let index = self.load_index().await?;
        let entries = self.load_entries(&index, None).await?;
        let updated_at = self
            .read_meta()
            .await?
            .map(|meta| meta.updated_at)
            .unwrap_or_else(Utc::now);

        Ok(RankingData {
            entries,
            updated_at,
        })
    }

    /// One page of the leaderboard.
    ///
    /// `page` is clamped to at least 1 and a zero `page_size` means [`DEFAULT_PAGE_SIZE`].
    /// Failures are logged and read as an empty page.
    pub async fn get_paginated_ranking(
        &self,
        page: usize,
        page_size: usize,
    ) -> PaginatedRankingData {
        let page = page.max(1);
        let page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };

        match self.try_get_page(page, page_size).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(page, page_size, error = %e, "failed to read ranking page");
                PaginatedRankingData::empty(page, page_size)
            }
        }
    }

    async fn try_get_page(
        &self,
        page: usize,
        page_size: usize,
    ) -> Result<PaginatedRankingData, RankingError> {
        let meta = self.read_meta().await?;

        if let Some(meta) = &meta
            && meta.page_size == page_size
        {
            if page > meta.total_pages {
                return Ok(PaginatedRankingData::from_meta(meta, page, Vec::new()));
            }
            if let Some(record) = self.get_json::<RankingPage>(&page_key(page)).await? {
                return Ok(PaginatedRankingData::from_meta(meta, page, record.entries));
            }
            tracing::debug!(page, "page record missing, rebuilding pages");
        }

        let index = match self.read_index().await? {
            Some(index) => index,
            None => {
                if !self.migrate_legacy().await? {
                    return Ok(PaginatedRankingData::empty(page, page_size));
                }
                self.read_index().await?.unwrap_or_default()
            }
        };

        // Migration may have just written pages of its own
        let stale_pages = self
            .read_meta()
            .await?
            .map(|meta| meta.total_pages)
            .unwrap_or(0);

        tracing::debug!(page_size, entries = index.len(), "rebuilding ranking pages");
        let entries = self.load_entries(&index, None).await?;
        let meta = self.write_pages(&entries, page_size, stale_pages).await?;

        let slice = entries
            .chunks(page_size)
            .nth(page - 1)
            .map(<[RankingEntry]>::to_vec)
            .unwrap_or_default();

        Ok(PaginatedRankingData::from_meta(&meta, page, slice))
    }

    /// Split the legacy single-blob record into the paged layout.
    ///
    /// Returns `true` when a migration happened. If paged data already exists, or the record
    /// cannot be decoded, the legacy record is just removed. Two concurrent migrations converge on
    /// the same records.
    pub async fn migrate_legacy(&self) -> Result<bool, RankingError> {
        let Some(raw) = self.kv.get(LEGACY_KEY).await? else {
            return Ok(false);
        };

        if self.read_index().await?.is_some() {
            self.kv.delete(LEGACY_KEY).await?;
            tracing::info!("paged ranking already present, dropped legacy record");
            return Ok(false);
        }

        let legacy: RankingData = match serde_json::from_str(&raw) {
            Ok(legacy) => legacy,
            Err(e) => {
                tracing::warn!(error = %e, "legacy ranking record is unreadable, dropping it");
                self.kv.delete(LEGACY_KEY).await?;
                return Ok(false);
            }
        };

        let mut seen = HashSet::new();
        let mut entries: Vec<RankingEntry> = legacy
            .entries
            .into_iter()
            .filter(|entry| seen.insert(entry.root_url.clone()))
            .collect();
        entries.sort_by(|a, b| b.score.cmp(&a.score));
        entries.truncate(MAX_ENTRIES);

        for entry in &entries {
            self.put_json(&entry_key(&entry.root_url), entry).await?;
        }

        let index: Vec<IndexEntry> = entries
            .iter()
            .map(|entry| IndexEntry {
                url: entry.root_url.clone(),
                score: entry.score,
            })
            .collect();
        self.put_json(INDEX_KEY, &index).await?;

        let meta = self.write_pages(&entries, DEFAULT_PAGE_SIZE, 0).await?;
        self.kv.delete(LEGACY_KEY).await?;

        tracing::info!(entries = meta.total_entries, "migrated legacy ranking");
        Ok(true)
    }

    /// Index, migrating the legacy blob first when there is none
    async fn load_index(&self) -> Result<Vec<IndexEntry>, RankingError> {
        if let Some(index) = self.read_index().await? {
            return Ok(index);
        }
        if self.migrate_legacy().await? {
            return Ok(self.read_index().await?.unwrap_or_default());
        }
        Ok(Vec::new())
    }

    async fn read_index(&self) -> Result<Option<Vec<IndexEntry>>, RankingError> {
        self.get_json(INDEX_KEY).await
    }

    async fn read_meta(&self) -> Result<Option<RankingMeta>, RankingError> {
        self.get_json(META_KEY).await
    }

    /// Batch-read entry records in index order.
    ///
    /// `fresh` replaces whatever the store returns for the same root URL.
    async fn load_entries(
        &self,
        index: &[IndexEntry],
        fresh: Option<&RankingEntry>,
    ) -> Result<Vec<RankingEntry>, RankingError> {
        let keys: Vec<String> = index.iter().map(|row| entry_key(&row.url)).collect();
        let values = self.kv.get_many(&keys).await?;

        let mut entries = Vec::with_capacity(index.len());
        for (row, value) in index.iter().zip(values) {
            if let Some(fresh) = fresh
                && fresh.root_url == row.url
            {
                entries.push(fresh.clone());
                continue;
            }
            match value {
                Some(raw) => entries.push(serde_json::from_str(&raw)?),
                None => {
                    tracing::warn!(root_url = %row.url, "indexed entry has no record, skipping")
                }
            }
        }
        Ok(entries)
    }

    /// Write every page, delete pages past the new end, then write meta.
    async fn write_pages(
        &self,
        entries: &[RankingEntry],
        page_size: usize,
        previous_pages: usize,
    ) -> Result<RankingMeta, RankingError> {
        let total_pages = entries.len().div_ceil(page_size);

        for (i, chunk) in entries.chunks(page_size).enumerate() {
            let record = RankingPage {
                page: i + 1,
                entries: chunk.to_vec(),
            };
            self.put_json(&page_key(record.page), &record).await?;
        }

        for stale in (total_pages + 1)..=previous_pages {
            self.kv.delete(&page_key(stale)).await?;
        }

        let meta = RankingMeta {
            total_entries: entries.len(),
            total_pages,
            page_size,
            updated_at: Utc::now(),
        };
        self.put_json(META_KEY, &meta).await?;

        tracing::debug!(total_pages, page_size, "ranking pages written");
        Ok(meta)
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RankingError> {
        match self.kv.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn put_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), RankingError> {
        let raw = serde_json::to_string(value)?;
        self.kv.put(key, &raw).await?;
        Ok(())
    }
}
