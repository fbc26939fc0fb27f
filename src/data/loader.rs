// ============================================================
// Layer 4: CSV Loader
// ============================================================
// Loads the source table from a comma-separated file using the
// `csv` crate.
//
// Expected layout: a header row naming the columns, then one
// row per example. Only two columns matter, the category name
// and the free text; any other columns are ignored, and the
// two may appear in either order.
//
//   category,text
//   tech,"tv future in the hands of viewers with home theatre..."
//   business,"worldcom boss left books alone ..."
//
// Quoted fields may contain commas and newlines.
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::{error::DataError, record::TextRecord, traits::RecordSource};

pub struct CsvLoader {
    path:         PathBuf,
    text_column:  String,
    label_column: String,
}

impl CsvLoader {
    pub fn new(
        path:         impl AsRef<Path>,
        text_column:  impl Into<String>,
        label_column: impl Into<String>,
    ) -> Self {
        Self {
            path:         path.as_ref().to_path_buf(),
            text_column:  text_column.into(),
            label_column: label_column.into(),
        }
    }

    /// Parse records from any reader. Split out from `load_all`
    /// so in-memory tables can be parsed the same way.
    pub fn read_from<R: std::io::Read>(&self, reader: R) -> Result<Vec<TextRecord>, DataError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| DataError::MalformedRow { line: 1, reason: e.to_string() })?
            .clone();

        let text_idx  = column_index(&headers, &self.text_column)?;
        let label_idx = column_index(&headers, &self.label_column)?;

        let mut records = Vec::new();
        for (row_id, row) in rdr.records().enumerate() {
            let row = row.map_err(|e| DataError::MalformedRow {
                line:   e.position().map(|p| p.line()).unwrap_or(0),
                reason: e.to_string(),
            })?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);

            let (Some(label), Some(text)) = (row.get(label_idx), row.get(text_idx)) else {
                return Err(DataError::MalformedRow {
                    line,
                    reason: format!("expected at least {} fields, found {}",
                        label_idx.max(text_idx) + 1, row.len()),
                });
            };

            let label = label.trim();
            if label.is_empty() {
                return Err(DataError::MalformedRow {
                    line,
                    reason: format!("empty '{}' field", self.label_column),
                });
            }

            records.push(TextRecord::new(row_id, label, text));
        }

        if records.is_empty() {
            return Err(DataError::EmptyTable);
        }
        Ok(records)
    }
}

impl RecordSource for CsvLoader {
    fn load_all(&self) -> Result<Vec<TextRecord>> {
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("Cannot open '{}'", self.path.display()))?;

        let records = self
            .read_from(file)
            .with_context(|| format!("Cannot parse '{}'", self.path.display()))?;

        tracing::info!("Loaded {} rows from '{}'", records.len(), self.path.display());
        Ok(records)
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize, DataError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| DataError::MissingColumn(name.to_string()))
}

/// Render the first `n` rows as a small aligned table, like a
/// dataframe head.
pub fn head(records: &[TextRecord], n: usize) -> String {
    let rows: Vec<&TextRecord> = records.iter().take(n).collect();
    let width = rows.iter().map(|r| r.category.len()).max().unwrap_or(0).max(8);

    let mut out = format!("{:>5}  {:<width$}  text\n", "", "category", width = width);
    for r in rows {
        out.push_str(&format!(
            "{:>5}  {:<width$}  {}\n",
            r.row_id,
            r.category,
            r.preview(60).replace('\n', " "),
            width = width,
        ));
    }
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn loader() -> CsvLoader {
        CsvLoader::new("unused.csv", "text", "category")
    }

    #[test]
    fn test_reads_rows_in_file_order() {
        let csv = "category,text\ntech,new phones\nsport,\"a match, won\"\n";
        let records = loader().read_from(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], TextRecord::new(0, "tech", "new phones"));
        assert_eq!(records[1], TextRecord::new(1, "sport", "a match, won"));
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let csv = "text,id,category\nhello,7,business\n";
        let records = loader().read_from(csv.as_bytes()).unwrap();
        assert_eq!(records[0].category, "business");
        assert_eq!(records[0].text, "hello");
    }

    #[test]
    fn test_missing_column() {
        let csv = "label,text\ntech,hello\n";
        let err = loader().read_from(csv.as_bytes()).unwrap_err();
        assert_eq!(err, DataError::MissingColumn("category".into()));
    }

    #[test]
    fn test_short_row_is_malformed() {
        let csv = "category,text\ntech\n";
        let err = loader().read_from(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::MalformedRow { .. }));
    }

    #[test]
    fn test_empty_label_is_malformed() {
        let csv = "category,text\n ,hello\n";
        let err = loader().read_from(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::MalformedRow { .. }));
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let csv = "category,text\n";
        let err = loader().read_from(csv.as_bytes()).unwrap_err();
        assert_eq!(err, DataError::EmptyTable);
    }

    #[test]
    fn test_load_all_from_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("bbc_text.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "category,text").unwrap();
        writeln!(f, "tech,one").unwrap();
        writeln!(f, "politics,two").unwrap();

        let records = CsvLoader::new(&path, "text", "category").load_all().unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = CsvLoader::new("/definitely/not/here.csv", "text", "category").load_all();
        assert!(err.is_err());
    }

    #[test]
    fn test_head_limits_rows() {
        let records: Vec<TextRecord> = (0..10)
            .map(|i| TextRecord::new(i, "tech", format!("row {i}")))
            .collect();
        let table = head(&records, 5);
        // header + 5 rows
        assert_eq!(table.lines().count(), 6);
        assert!(table.contains("row 4"));
        assert!(!table.contains("row 5"));
    }
}
