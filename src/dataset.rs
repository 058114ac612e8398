//! Semicolon-delimited dataset loading with per-row fault tolerance.
//!
//! The loader never fails on data problems: unreadable or over-length rows
//! are skipped and counted, absent columns leave the matching fields
//! absent, and a missing file is a valid "no dataset yet" state.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use crate::models::{Record, Table};

/// Sentiment column preference order; the first header present wins.
pub const SENTIMENT_COLUMNS: [&str; 3] = ["airline_sentiment", "sentiment", "label"];

pub const TEXT_COLUMN: &str = "text";
pub const AUTHOR_COLUMN: &str = "name";
pub const RETWEETS_COLUMN: &str = "retweet_count";
pub const LOCATION_COLUMN: &str = "tweet_location";
pub const TIMESTAMP_COLUMN: &str = "tweet_created";

/// Timestamp formats tried in order: the canonical written form first,
/// then ISO variants, offset-bearing forms, day-first forms, bare dates.
const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%d %H:%M:%S%z"];
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Resolved field indices for one file's header row.
#[derive(Debug, Default)]
pub(crate) struct ColumnMap {
    pub(crate) text: Option<usize>,
    pub(crate) sentiment: Option<usize>,
    pub(crate) author: Option<usize>,
    pub(crate) retweets: Option<usize>,
    pub(crate) location: Option<usize>,
    pub(crate) timestamp: Option<usize>,
    pub(crate) sentiment_header: Option<String>,
}

/// Resolve the expected columns against a header row. The sentiment column
/// is an explicit selection over [`SENTIMENT_COLUMNS`]; everything else is
/// a plain header lookup. Duplicated headers resolve to their first
/// occurrence.
pub(crate) fn resolve_columns(headers: &StringRecord) -> ColumnMap {
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (i, header) in headers.iter().enumerate() {
        index.entry(header).or_insert(i);
    }
    let sentiment_header = SENTIMENT_COLUMNS
        .iter()
        .find(|name| index.contains_key(**name))
        .map(|name| name.to_string());
    ColumnMap {
        text: index.get(TEXT_COLUMN).copied(),
        sentiment: sentiment_header.as_deref().and_then(|name| index.get(name).copied()),
        author: index.get(AUTHOR_COLUMN).copied(),
        retweets: index.get(RETWEETS_COLUMN).copied(),
        location: index.get(LOCATION_COLUMN).copied(),
        timestamp: index.get(TIMESTAMP_COLUMN).copied(),
        sentiment_header,
    }
}

/// Load the dataset at `path`. `Ok(None)` means the file does not exist,
/// a state callers treat as an empty table.
pub fn load_table(path: &Path) -> Result<Option<Table>> {
    if !path.exists() {
        return Ok(None);
    }
    let started = Instant::now();
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening dataset {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("reading headers of {}", path.display()))?
        .clone();
    let columns = resolve_columns(&headers);

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                skipped += 1;
                debug!("Skipping unreadable row - err={}", err);
                continue;
            }
        };
        // over-length rows are misaligned beyond repair; short rows just
        // leave their trailing fields absent
        if row.len() > headers.len() {
            skipped += 1;
            debug!(
                "Skipping over-length row - fields={}, expected={}",
                row.len(),
                headers.len()
            );
            continue;
        }
        records.push(build_record(&row, &columns));
    }

    info!(
        "Dataset loaded - path={}, rows={}, skipped={}, sentiment_column={}, duration={:.2}s",
        path.display(),
        records.len(),
        skipped,
        columns.sentiment_header.as_deref().unwrap_or("none"),
        started.elapsed().as_secs_f64()
    );
    Ok(Some(Table {
        records,
        sentiment_column: columns.sentiment_header,
    }))
}

fn build_record(row: &StringRecord, columns: &ColumnMap) -> Record {
    let location = field(row, columns.location).filter(|value| value != "nan");
    Record {
        text: field(row, columns.text).unwrap_or_default(),
        sentiment_raw: field(row, columns.sentiment),
        timestamp: field(row, columns.timestamp)
            .as_deref()
            .and_then(parse_timestamp),
        author: field(row, columns.author),
        retweet_count: field(row, columns.retweets)
            .as_deref()
            .and_then(parse_count),
        location,
    }
}

/// A cell by resolved index; empty cells count as absent.
fn field(row: &StringRecord, idx: Option<usize>) -> Option<String> {
    let value = row.get(idx?)?;
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Numeric coercion for the retweet column: integer first, then float
/// truncation; absent on failure.
pub(crate) fn parse_count(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f as i64)
}

/// Parse a timestamp cell through the known format list. Offset-bearing
/// values keep their local clock time and drop the offset.
pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.naive_local());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date.and_time(NaiveTime::MIN));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_dataset(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp dataset");
        writeln!(file, "{}", lines.join("\n")).expect("write dataset");
        file
    }

    #[test]
    fn loads_rows_and_resolves_priority_column() {
        let file = write_dataset(&[
            "text;airline_sentiment;sentiment;name;retweet_count;tweet_location;tweet_created",
            "late again;negative;ignored;ana;3;NYC;2015-02-24 11:35:52",
            "great crew;positive;ignored;bo;0;LA;2015-02-25 09:00:00",
        ]);
        let table = load_table(file.path()).unwrap().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.sentiment_column.as_deref(), Some("airline_sentiment"));
        assert_eq!(table.records[0].sentiment_raw.as_deref(), Some("negative"));
        assert_eq!(table.records[0].retweet_count, Some(3));
        assert_eq!(table.records[0].author.as_deref(), Some("ana"));
        assert!(table.records[0].timestamp.is_some());
    }

    #[test]
    fn falls_back_through_the_sentiment_column_order() {
        let file = write_dataset(&["text;label", "ok;neutral"]);
        let table = load_table(file.path()).unwrap().unwrap();
        assert_eq!(table.sentiment_column.as_deref(), Some("label"));
        assert_eq!(table.records[0].sentiment_raw.as_deref(), Some("neutral"));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let table = load_table(&dir.path().join("absent.csv")).unwrap();
        assert!(table.is_none());
    }

    #[test]
    fn over_length_rows_are_skipped() {
        let file = write_dataset(&[
            "text;sentiment",
            "fine;positive",
            "broken;extra;fields;here",
            "also fine;negative",
        ]);
        let table = load_table(file.path()).unwrap().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[1].text, "also fine");
    }

    #[test]
    fn short_rows_load_with_absent_fields() {
        let file = write_dataset(&["text;sentiment;name", "just text"]);
        let table = load_table(file.path()).unwrap().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records[0].text, "just text");
        assert!(table.records[0].sentiment_raw.is_none());
        assert!(table.records[0].author.is_none());
    }

    #[test]
    fn missing_columns_leave_fields_absent() {
        let file = write_dataset(&["text", "hello there"]);
        let table = load_table(file.path()).unwrap().unwrap();
        assert!(table.sentiment_column.is_none());
        let record = &table.records[0];
        assert!(record.sentiment_raw.is_none());
        assert!(record.timestamp.is_none());
        assert!(record.location.is_none());
    }

    #[test]
    fn empty_cells_and_textual_null_become_absent() {
        let file = write_dataset(&[
            "text;sentiment;tweet_location;retweet_count",
            "a;;nan;",
            "b;positive;Madrid;7",
        ]);
        let table = load_table(file.path()).unwrap().unwrap();
        assert!(table.records[0].sentiment_raw.is_none());
        assert!(table.records[0].location.is_none());
        assert!(table.records[0].retweet_count.is_none());
        assert_eq!(table.records[1].location.as_deref(), Some("Madrid"));
    }

    #[test]
    fn timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2015, 2, 24)
            .unwrap()
            .and_hms_opt(11, 35, 52)
            .unwrap();
        assert_eq!(parse_timestamp("2015-02-24 11:35:52"), Some(expected));
        assert_eq!(parse_timestamp("2015-02-24T11:35:52"), Some(expected));
        assert_eq!(parse_timestamp("2015-02-24 11:35:52 -0800"), Some(expected));
        assert_eq!(parse_timestamp("24/02/2015 11:35:52"), Some(expected));
        assert_eq!(
            parse_timestamp("2015-02-24"),
            Some(NaiveDate::from_ymd_opt(2015, 2, 24).unwrap().and_time(NaiveTime::MIN))
        );
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn retweet_coercion() {
        assert_eq!(parse_count("12"), Some(12));
        assert_eq!(parse_count(" 3 "), Some(3));
        assert_eq!(parse_count("3.0"), Some(3));
        assert_eq!(parse_count("many"), None);
        assert_eq!(parse_count("nan"), None);
    }
}
