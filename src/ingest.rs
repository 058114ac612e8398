//! Upload-side merger: parses an uploaded CSV export and rewrites the
//! backing dataset in the canonical schema.
//!
//! This is the one path that writes to disk, so unlike the query side its
//! failures are real errors. The new file is written next to the target
//! and renamed over it, so a concurrent reload sees either the old
//! dataset or the new one, never a half-written file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::{debug, info};

use crate::dataset::{
    self, ColumnMap, AUTHOR_COLUMN, LOCATION_COLUMN, RETWEETS_COLUMN, TEXT_COLUMN,
    TIMESTAMP_COLUMN,
};

/// Header row of the rewritten dataset. The upload's sentiment column is
/// resolved by the usual preference order and lands under `sentiment`, so
/// no empty high-priority column can shadow the real labels on reload.
const CANONICAL_HEADERS: [&str; 6] = [
    TEXT_COLUMN,
    "sentiment",
    AUTHOR_COLUMN,
    RETWEETS_COLUMN,
    LOCATION_COLUMN,
    TIMESTAMP_COLUMN,
];

/// Rewrite the dataset at `dest` from an uploaded semicolon-delimited
/// CSV. The upload is decoded leniently, malformed rows are dropped, and
/// timestamps are normalized to `%Y-%m-%d %H:%M:%S` (day-first forms
/// accepted). Returns the number of data rows written.
pub fn merge_upload(upload: &[u8], dest: &Path) -> Result<usize> {
    let decoded = String::from_utf8_lossy(upload);
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(decoded.as_bytes());
    let headers = reader
        .headers()
        .context("reading upload headers")?
        .clone();
    let columns = dataset::resolve_columns(&headers);

    let mut rows: Vec<[String; 6]> = Vec::new();
    let mut skipped = 0usize;
    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                skipped += 1;
                debug!("Skipping unreadable upload row - err={}", err);
                continue;
            }
        };
        if row.len() > headers.len() {
            skipped += 1;
            debug!(
                "Skipping over-length upload row - fields={}, expected={}",
                row.len(),
                headers.len()
            );
            continue;
        }
        rows.push(coerce_row(&row, &columns));
    }

    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating dataset directory {}", parent.display()))?;
        }
    }
    let staging = dest.with_extension("csv.tmp");
    {
        let mut writer = WriterBuilder::new()
            .delimiter(b';')
            .from_path(&staging)
            .with_context(|| format!("creating dataset file {}", staging.display()))?;
        writer
            .write_record(CANONICAL_HEADERS)
            .context("writing dataset headers")?;
        for row in &rows {
            writer.write_record(row).context("writing dataset row")?;
        }
        writer.flush().context("flushing dataset file")?;
    }
    fs::rename(&staging, dest)
        .with_context(|| format!("replacing dataset {}", dest.display()))?;

    info!(
        "Dataset replaced - path={}, rows={}, skipped={}, sentiment_column={}",
        dest.display(),
        rows.len(),
        skipped,
        columns.sentiment_header.as_deref().unwrap_or("none")
    );
    Ok(rows.len())
}

/// One upload row in canonical column order. Cells pass through verbatim
/// except the timestamp, which is re-parsed and rewritten (or emptied
/// when unparseable); absent columns come out empty.
fn coerce_row(row: &StringRecord, columns: &ColumnMap) -> [String; 6] {
    let cell = |idx: Option<usize>| {
        idx.and_then(|i| row.get(i))
            .unwrap_or_default()
            .to_string()
    };
    let timestamp = columns
        .timestamp
        .and_then(|i| row.get(i))
        .and_then(dataset::parse_timestamp)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();
    [
        cell(columns.text),
        cell(columns.sentiment),
        cell(columns.author),
        cell(columns.retweets),
        cell(columns.location),
        timestamp,
    ]
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn rewrites_upload_into_canonical_schema() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("data").join("mentions.csv");
        let upload = b"text;sentiment;name;tweet_created\n\
            late flight;negative;ana;24/02/2015 11:35:52\n\
            all good;positive;bo;2015-02-25 09:00:00\n";

        let rows = merge_upload(upload, &dest).unwrap();
        assert_eq!(rows, 2);

        let table = dataset::load_table(&dest).unwrap().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.sentiment_column.as_deref(), Some("sentiment"));
        assert_eq!(table.records[0].sentiment_raw.as_deref(), Some("negative"));
        let ts = table.records[0].timestamp.unwrap();
        assert_eq!(ts.format("%Y-%m-%d %H:%M:%S").to_string(), "2015-02-24 11:35:52");
    }

    #[test]
    fn labels_survive_reload_when_upload_uses_a_lower_priority_header() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("mentions.csv");
        let upload = b"text;label\nmeh;neutral\n";

        merge_upload(upload, &dest).unwrap();
        let table = dataset::load_table(&dest).unwrap().unwrap();
        assert_eq!(table.sentiment_column.as_deref(), Some("sentiment"));
        assert_eq!(table.records[0].sentiment_raw.as_deref(), Some("neutral"));
    }

    #[test]
    fn missing_columns_come_out_empty_and_bad_rows_drop() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("mentions.csv");
        let upload = b"text\nhello\nbroken;row;here\nworld\n";

        let rows = merge_upload(upload, &dest).unwrap();
        assert_eq!(rows, 2);
        let table = dataset::load_table(&dest).unwrap().unwrap();
        assert_eq!(table.records[0].text, "hello");
        assert!(table.records[0].sentiment_raw.is_none());
        assert!(table.records[0].timestamp.is_none());
    }

    #[test]
    fn unparseable_timestamps_are_emptied() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("mentions.csv");
        let upload = b"text;tweet_created\nx;someday soon\n";

        merge_upload(upload, &dest).unwrap();
        let table = dataset::load_table(&dest).unwrap().unwrap();
        assert!(table.records[0].timestamp.is_none());
    }

    #[test]
    fn empty_upload_writes_header_only_file() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("mentions.csv");

        let rows = merge_upload(b"", &dest).unwrap();
        assert_eq!(rows, 0);
        let table = dataset::load_table(&dest).unwrap().unwrap();
        assert!(table.is_empty());
        assert_eq!(table.sentiment_column.as_deref(), Some("sentiment"));
    }

    #[test]
    fn invalid_utf8_decodes_lossily() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("mentions.csv");
        let upload = b"text;sentiment\ncaf\xff late;negative\n";

        let rows = merge_upload(upload, &dest).unwrap();
        assert_eq!(rows, 1);
        let table = dataset::load_table(&dest).unwrap().unwrap();
        assert_eq!(table.records[0].sentiment_raw.as_deref(), Some("negative"));
    }
}
