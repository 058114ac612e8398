//! Sentiment label taxonomy and normalization.
//!
//! Source exports spell labels inconsistently ("Positive", "pos",
//! "POSITIVO", "1 - negative"), so bucketing goes through substring
//! containment rather than exact matching.

/// Canonical sentiment for a mention, or the lowercased original spelling
/// when it matches none of the three buckets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Other(String),
}

impl Sentiment {
    /// Numeric mapping used by the summary average. `Other` labels carry
    /// no score and are excluded from the mean, not counted as zero.
    pub fn score(&self) -> Option<i64> {
        match self {
            Sentiment::Positive => Some(1),
            Sentiment::Neutral => Some(0),
            Sentiment::Negative => Some(-1),
            Sentiment::Other(_) => None,
        }
    }

    pub fn is_canonical(&self) -> bool {
        !matches!(self, Sentiment::Other(_))
    }
}

/// Fold an arbitrary label spelling into the canonical taxonomy.
///
/// Containment is tested in a fixed priority order, so a label containing
/// both "pos" and "neg" resolves to positive.
pub fn normalize(raw: &str) -> Sentiment {
    let lowered = raw.to_lowercase();
    if lowered.contains("pos") {
        Sentiment::Positive
    } else if lowered.contains("neg") {
        Sentiment::Negative
    } else if lowered.contains("neu") {
        Sentiment::Neutral
    } else {
        Sentiment::Other(lowered)
    }
}
