use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One ingested mention row. Optional fields are `None` when the source
/// column is missing or the cell was empty/unparsable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub text: String,
    pub sentiment_raw: Option<String>,
    pub timestamp: Option<NaiveDateTime>,
    pub author: Option<String>,
    pub retweet_count: Option<i64>,
    pub location: Option<String>,
}

/// The in-memory dataset: ordered rows plus the resolved sentiment column.
///
/// Row order carries no aggregation meaning but drives first-seen
/// tie-breaking in every ranked view, so it is preserved as loaded.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub records: Vec<Record>,
    pub sentiment_column: Option<String>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub total_mentions: u64,
    pub by_sentiment: SentimentCounts,
    pub avg_score: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: String, // "2015-02-24" for day/week buckets, "2015-02" for month
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluencerStats {
    pub author: String,
    pub count: u64,
    pub retweets: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCount {
    pub location: String,
    pub count: u64,
}

/// Bucket granularity for trend queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Freq {
    Day,
    Week,
    Month,
}

impl Freq {
    /// Accepts `day|week|month` and the single-letter aliases `d|w|m`,
    /// case-insensitive. Anything else is the routing layer's problem.
    pub fn parse(value: &str) -> Option<Freq> {
        match value.to_ascii_lowercase().as_str() {
            "day" | "d" => Some(Freq::Day),
            "week" | "w" => Some(Freq::Week),
            "month" | "m" => Some(Freq::Month),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Freq::Day => "day",
            Freq::Week => "week",
            Freq::Month => "month",
        }
    }
}

/// Ranking key for influencer queries; any value other than `retweets`
/// falls back to mention count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    #[default]
    Count,
    Retweets,
}

impl SortKey {
    pub fn parse(value: &str) -> SortKey {
        if value.eq_ignore_ascii_case("retweets") {
            SortKey::Retweets
        } else {
            SortKey::Count
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Count => "count",
            SortKey::Retweets => "retweets",
        }
    }
}
