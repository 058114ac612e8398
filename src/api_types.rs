//! Wire types for the HTTP surface: query parameters with their
//! defaults, and the response envelopes the dashboard consumes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::{InfluencerStats, LocationCount};

fn default_freq() -> String {
    "day".to_string()
}
fn default_keywords_top() -> usize {
    50
}
fn default_topics_sentiment() -> String {
    "negative".to_string()
}
fn default_influencers_limit() -> usize {
    20
}
fn default_sort_by() -> String {
    "count".to_string()
}
fn default_geo_top() -> usize {
    100
}

#[derive(Debug, Deserialize)]
pub struct TimeSeriesQuery {
    #[serde(default = "default_freq")]
    pub freq: String,
}

#[derive(Debug, Deserialize)]
pub struct KeywordsQuery {
    pub sentiment: Option<String>,
    #[serde(default = "default_keywords_top")]
    pub top: usize,
}

#[derive(Debug, Deserialize)]
pub struct TopicsQuery {
    #[serde(default = "default_topics_sentiment")]
    pub sentiment: String,
}

#[derive(Debug, Deserialize)]
pub struct InfluencersQuery {
    pub sentiment: Option<String>,
    #[serde(default = "default_influencers_limit")]
    pub limit: usize,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
}

#[derive(Debug, Deserialize)]
pub struct GeoQuery {
    #[serde(default = "default_geo_top")]
    pub top: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeywordsResponse {
    pub keywords: Vec<(String, u64)>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicsResponse {
    pub topics: IndexMap<String, u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InfluencersResponse {
    pub influencers: Vec<InfluencerStats>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GeoResponse {
    pub geo: Vec<LocationCount>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub rows_loaded: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
