//! The analytics engine: owns the loaded table and the query-result
//! cache, and computes the six derived views.
//!
//! Queries never fail. A missing or unreadable dataset degrades to the
//! zero-valued shape of each view; real errors only exist on the ingest
//! path, which rewrites the backing file.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::dataset;
use crate::ingest;
use crate::labels::{self, Sentiment};
use crate::models::{
    Freq, InfluencerStats, LocationCount, Record, SentimentCounts, SentimentSummary, SortKey,
    Table, TrendPoint,
};
use crate::preprocess;

/// Rule-based topic table: topic name to its trigger words. A record
/// counts at most once per topic, but every topic is checked
/// independently, so one record can land in several topics.
static TOPIC_RULES: &[(&str, &[&str])] = &[
    (
        "customer service",
        &["service", "support", "representative", "agent", "customer"],
    ),
    (
        "flight issues",
        &["delay", "cancel", "flight", "boarding", "late"],
    ),
    (
        "product issue",
        &["broken", "defect", "damage", "issue", "problem"],
    ),
    ("price/fees", &["price", "fee", "expensive", "cost"]),
];

/// Memoization key: the operation plus its normalized arguments
/// (sentiment filters lowercased).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheKey {
    Summary,
    TimeSeries(Freq),
    Keywords(Option<String>, usize),
    Topics(String),
    Influencers(Option<String>, usize, SortKey),
    Geo(usize),
}

#[derive(Debug, Clone)]
enum CacheSlot {
    Summary(SentimentSummary),
    Series(Vec<TrendPoint>),
    Keywords(Vec<(String, u64)>),
    Topics(IndexMap<String, u64>),
    Influencers(Vec<InfluencerStats>),
    Geo(Vec<LocationCount>),
}

/// Aggregation engine over a single semicolon-delimited mention dataset.
///
/// The engine owns the in-memory table and the per-query cache. Both are
/// dropped by [`MetricsEngine::clear`] and after every ingest, so readers
/// always see either the previous table or the next one in full.
pub struct MetricsEngine {
    data_path: PathBuf,
    table: RwLock<Option<Arc<Table>>>,
    cache: RwLock<HashMap<CacheKey, CacheSlot>>,
}

impl MetricsEngine {
    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
            table: RwLock::new(None),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Drop the memoized table and every cached result; the next query
    /// reloads from the backing file.
    pub fn clear(&self) {
        self.table.write().expect("table lock poisoned").take();
        let mut cache = self.cache.write().expect("cache lock poisoned");
        let dropped = cache.len();
        cache.clear();
        info!("Cache cleared - entries_dropped={}", dropped);
    }

    /// Replace the backing dataset with an uploaded CSV, then invalidate
    /// all memoized state. Returns the number of rows written.
    pub fn ingest(&self, upload: &[u8]) -> Result<usize> {
        let rows = ingest::merge_upload(upload, &self.data_path)?;
        self.clear();
        Ok(rows)
    }

    /// Counts per canonical bucket over the whole table, plus the mean of
    /// the {positive: 1, neutral: 0, negative: -1} mapping over records
    /// whose label normalizes into a bucket.
    pub fn sentiment_summary(&self) -> SentimentSummary {
        if let Some(CacheSlot::Summary(hit)) = self.cached(&CacheKey::Summary) {
            return hit;
        }
        let table = self.table();
        if table.is_empty() {
            return SentimentSummary::default();
        }

        let mut counts = SentimentCounts::default();
        let mut score_sum = 0i64;
        let mut scored = 0u64;
        for record in &table.records {
            let Some(raw) = record.sentiment_raw.as_deref() else {
                continue;
            };
            let label = labels::normalize(raw);
            if let Some(score) = label.score() {
                score_sum += score;
                scored += 1;
            }
            match label {
                Sentiment::Positive => counts.positive += 1,
                Sentiment::Neutral => counts.neutral += 1,
                Sentiment::Negative => counts.negative += 1,
                Sentiment::Other(_) => {}
            }
        }
        let avg_score = if scored > 0 {
            score_sum as f64 / scored as f64
        } else {
            0.0
        };
        let summary = SentimentSummary {
            total_mentions: table.len() as u64,
            by_sentiment: counts,
            avg_score,
        };
        debug!(
            "Summary computed - total={}, scored={}, avg_score={:.3}",
            summary.total_mentions, scored, summary.avg_score
        );
        self.store(CacheKey::Summary, CacheSlot::Summary(summary.clone()));
        summary
    }

    /// Per-period canonical bucket counts, sorted by period ascending.
    /// Records without a parseable timestamp or with an unrecognized
    /// label are excluded; periods with no qualifying records are
    /// omitted rather than zero-filled.
    pub fn sentiment_time_series(&self, freq: Freq) -> Vec<TrendPoint> {
        let key = CacheKey::TimeSeries(freq);
        if let Some(CacheSlot::Series(hit)) = self.cached(&key) {
            return hit;
        }
        let table = self.table();
        if table.is_empty() {
            return Vec::new();
        }

        let mut buckets: BTreeMap<NaiveDate, SentimentCounts> = BTreeMap::new();
        for record in &table.records {
            let Some(timestamp) = record.timestamp else {
                continue;
            };
            let Some(raw) = record.sentiment_raw.as_deref() else {
                continue;
            };
            let label = labels::normalize(raw);
            if !label.is_canonical() {
                continue;
            }
            let entry = buckets.entry(bucket_start(timestamp, freq)).or_default();
            match label {
                Sentiment::Positive => entry.positive += 1,
                Sentiment::Neutral => entry.neutral += 1,
                Sentiment::Negative => entry.negative += 1,
                Sentiment::Other(_) => {}
            }
        }
        let series: Vec<TrendPoint> = buckets
            .into_iter()
            .map(|(date, counts)| TrendPoint {
                period: format_period(date, freq),
                positive: counts.positive,
                neutral: counts.neutral,
                negative: counts.negative,
            })
            .collect();
        debug!(
            "Time series computed - freq={}, periods={}",
            freq.as_str(),
            series.len()
        );
        self.store(key, CacheSlot::Series(series.clone()));
        series
    }

    /// The `limit` most frequent text tokens, optionally restricted to
    /// records whose raw sentiment contains `sentiment`. Ties keep the
    /// order in which tokens were first seen.
    pub fn top_keywords(&self, sentiment: Option<&str>, limit: usize) -> Vec<(String, u64)> {
        let key = CacheKey::Keywords(sentiment.map(str::to_lowercase), limit);
        if let Some(CacheSlot::Keywords(hit)) = self.cached(&key) {
            return hit;
        }
        let table = self.table();
        if table.is_empty() {
            return Vec::new();
        }

        let started = Instant::now();
        let rows = filtered(&table, sentiment);
        let token_lists: Vec<Vec<String>> = rows
            .par_iter()
            .map(|record| preprocess::tokens(&record.text))
            .collect();
        let mut counts: IndexMap<String, u64> = IndexMap::new();
        for token in token_lists.into_iter().flatten() {
            *counts.entry(token).or_insert(0) += 1;
        }
        let unique = counts.len();
        let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
        ranked.sort_by_key(|(_, count)| Reverse(*count)); // stable, keeps first-seen order on ties
        ranked.truncate(limit);
        debug!(
            "Keywords computed - rows={}, unique={}, limit={}, duration={:.2}s",
            rows.len(),
            unique,
            limit,
            started.elapsed().as_secs_f64()
        );
        self.store(key, CacheSlot::Keywords(ranked.clone()));
        ranked
    }

    /// Counts per rule-based topic over records whose raw sentiment
    /// contains the required filter. Zero-filled in declaration order.
    pub fn topic_breakdown(&self, sentiment: &str) -> IndexMap<String, u64> {
        let key = CacheKey::Topics(sentiment.to_lowercase());
        if let Some(CacheSlot::Topics(hit)) = self.cached(&key) {
            return hit;
        }
        let mut counts: IndexMap<String, u64> = TOPIC_RULES
            .iter()
            .map(|(topic, _)| (topic.to_string(), 0))
            .collect();
        let table = self.table();
        if table.is_empty() || table.sentiment_column.is_none() {
            return counts;
        }

        let needle = sentiment.to_lowercase();
        for record in &table.records {
            let matches = record
                .sentiment_raw
                .as_deref()
                .is_some_and(|raw| raw.to_lowercase().contains(&needle));
            if !matches {
                continue;
            }
            let text = record.text.to_lowercase();
            for (topic, triggers) in TOPIC_RULES {
                if triggers.iter().any(|trigger| text.contains(trigger)) {
                    if let Some(count) = counts.get_mut(*topic) {
                        *count += 1;
                    }
                }
            }
        }
        debug!(
            "Topics computed - sentiment={}, matched={}",
            needle,
            counts.values().sum::<u64>()
        );
        self.store(key, CacheSlot::Topics(counts.clone()));
        counts
    }

    /// Authors ranked by mention count or summed retweets, ties in
    /// first-seen order. Records without an author are dropped.
    pub fn top_influencers(
        &self,
        sentiment: Option<&str>,
        limit: usize,
        sort_by: SortKey,
    ) -> Vec<InfluencerStats> {
        let key = CacheKey::Influencers(sentiment.map(str::to_lowercase), limit, sort_by);
        if let Some(CacheSlot::Influencers(hit)) = self.cached(&key) {
            return hit;
        }
        let table = self.table();
        if table.is_empty() {
            return Vec::new();
        }

        let mut by_author: IndexMap<&str, (u64, i64)> = IndexMap::new();
        for record in filtered(&table, sentiment) {
            let Some(author) = record.author.as_deref() else {
                continue;
            };
            let entry = by_author.entry(author).or_insert((0, 0));
            entry.0 += 1;
            entry.1 += record.retweet_count.unwrap_or(0);
        }
        let mut ranked: Vec<InfluencerStats> = by_author
            .into_iter()
            .map(|(author, (count, retweets))| InfluencerStats {
                author: author.to_string(),
                count,
                retweets,
            })
            .collect();
        match sort_by {
            SortKey::Retweets => ranked.sort_by_key(|stats| Reverse(stats.retweets)),
            SortKey::Count => ranked.sort_by_key(|stats| Reverse(stats.count)),
        }
        ranked.truncate(limit);
        debug!(
            "Influencers computed - sort_by={}, returned={}",
            sort_by.as_str(),
            ranked.len()
        );
        self.store(key, CacheSlot::Influencers(ranked.clone()));
        ranked
    }

    /// The `limit` most mentioned locations by exact string, ties in
    /// first-seen order.
    pub fn geo_distribution(&self, limit: usize) -> Vec<LocationCount> {
        let key = CacheKey::Geo(limit);
        if let Some(CacheSlot::Geo(hit)) = self.cached(&key) {
            return hit;
        }
        let table = self.table();
        if table.is_empty() {
            return Vec::new();
        }

        let mut by_location: IndexMap<&str, u64> = IndexMap::new();
        for record in &table.records {
            let Some(location) = record.location.as_deref() else {
                continue;
            };
            *by_location.entry(location).or_insert(0) += 1;
        }
        let mut ranked: Vec<LocationCount> = by_location
            .into_iter()
            .map(|(location, count)| LocationCount {
                location: location.to_string(),
                count,
            })
            .collect();
        ranked.sort_by_key(|entry| Reverse(entry.count));
        ranked.truncate(limit);
        debug!("Geo computed - locations={}", ranked.len());
        self.store(key, CacheSlot::Geo(ranked.clone()));
        ranked
    }

    /// Current table, loading and memoizing it on first use. A missing or
    /// unreadable source yields an empty table that is *not* memoized, so
    /// the file is probed again on the next query.
    fn table(&self) -> Arc<Table> {
        if let Some(table) = self.table.read().expect("table lock poisoned").as_ref() {
            return Arc::clone(table);
        }
        let mut slot = self.table.write().expect("table lock poisoned");
        if let Some(table) = slot.as_ref() {
            return Arc::clone(table);
        }
        match dataset::load_table(&self.data_path) {
            Ok(Some(table)) => {
                let table = Arc::new(table);
                *slot = Some(Arc::clone(&table));
                table
            }
            Ok(None) => {
                debug!(
                    "No dataset at {} - serving empty results",
                    self.data_path.display()
                );
                Arc::new(Table::default())
            }
            Err(err) => {
                warn!(
                    "Dataset load failed - path={}, err={:#}",
                    self.data_path.display(),
                    err
                );
                Arc::new(Table::default())
            }
        }
    }

    fn cached(&self, key: &CacheKey) -> Option<CacheSlot> {
        self.cache
            .read()
            .expect("cache lock poisoned")
            .get(key)
            .cloned()
    }

    fn store(&self, key: CacheKey, slot: CacheSlot) {
        self.cache
            .write()
            .expect("cache lock poisoned")
            .insert(key, slot);
    }
}

/// Records passing the optional sentiment containment filter. The filter
/// only applies when the table resolved a sentiment column, so datasets
/// without one serve unfiltered results instead of nothing.
fn filtered<'a>(table: &'a Table, sentiment: Option<&str>) -> Vec<&'a Record> {
    match sentiment {
        Some(filter) if table.sentiment_column.is_some() => {
            let needle = filter.to_lowercase();
            table
                .records
                .iter()
                .filter(|record| {
                    record
                        .sentiment_raw
                        .as_deref()
                        .is_some_and(|raw| raw.to_lowercase().contains(&needle))
                })
                .collect()
        }
        _ => table.records.iter().collect(),
    }
}

/// First date of the bucket containing `ts`: the day itself, the Monday
/// of its ISO week, or the first of its month.
fn bucket_start(ts: NaiveDateTime, freq: Freq) -> NaiveDate {
    let date = ts.date();
    match freq {
        Freq::Day => date,
        Freq::Week => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
        Freq::Month => date.with_day(1).unwrap_or(date),
    }
}

fn format_period(date: NaiveDate, freq: Freq) -> String {
    match freq {
        Freq::Day | Freq::Week => date.format("%Y-%m-%d").to_string(),
        Freq::Month => date.format("%Y-%m").to_string(),
    }
}
