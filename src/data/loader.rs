// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Loads (slides, summary, reflection) rows from a CSV file
// using the csv crate.
//
// Expected header (column order does not matter):
//   slides,summary,reflection[,id]
//
// Row policy:
//   - A missing or empty text cell reads as ""            (kept)
//   - A short row (fewer cells than the header) reads the
//     missing cells as ""                                 (kept)
//   - If the file has an `id` column, a row with an empty
//     id cannot be traced back to its presentation        (rejected)
//   - A row the CSV parser cannot read at all             (rejected)
//
// Rejected rows are logged and counted, never fatal. A file
// without a `slides` column is a data error.
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use std::{fs::File, io::Read, path::PathBuf};

use crate::domain::corpus_row::CorpusRow;
use crate::domain::error::SummarizerError;
use crate::domain::traits::CorpusSource;

/// Loads corpus rows from a CSV file.
/// Implements the CorpusSource trait from Layer 3.
pub struct CsvCorpusLoader {
    path: PathBuf,
}

/// Column positions resolved from the header row.
struct Columns {
    id:         Option<usize>,
    slides:     usize,
    summary:    Option<usize>,
    reflection: Option<usize>,
}

impl CsvCorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse rows from any reader. Split out from `load_rows` so
    /// the row policy can be tested without touching the disk.
    pub fn read_from<R: Read>(reader: R) -> Result<Vec<CorpusRow>> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers().context("Cannot read corpus header")?.clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };

        let cols = Columns {
            id:         find("id"),
            slides:     find("slides").ok_or_else(|| {
                SummarizerError::Data("corpus has no 'slides' column".to_string())
            })?,
            summary:    find("summary"),
            reflection: find("reflection"),
        };

        let mut rows     = Vec::new();
        let mut rejected = 0usize;

        for (line, record) in rdr.records().enumerate() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Skipping unreadable corpus row {}: {}", line + 1, e);
                    rejected += 1;
                    continue;
                }
            };

            let cell = |idx: Option<usize>| -> String {
                idx.and_then(|i| record.get(i))
                    .unwrap_or("")
                    .to_string()
            };

            let id = match cols.id {
                Some(_) => {
                    let id = cell(cols.id);
                    if id.trim().is_empty() {
                        tracing::warn!("Skipping corpus row {}: empty id", line + 1);
                        rejected += 1;
                        continue;
                    }
                    Some(id)
                }
                None => None,
            };

            rows.push(CorpusRow {
                id,
                slides:     cell(Some(cols.slides)),
                summary:    cell(cols.summary),
                reflection: cell(cols.reflection),
            });
        }

        if rejected > 0 {
            tracing::warn!("Rejected {} corpus rows", rejected);
        }
        Ok(rows)
    }
}

impl CorpusSource for CsvCorpusLoader {
    fn load_rows(&self) -> Result<Vec<CorpusRow>> {
        let file = File::open(&self.path)
            .with_context(|| format!("Cannot open corpus '{}'", self.path.display()))?;
        let rows = Self::read_from(file)
            .with_context(|| format!("Cannot parse corpus '{}'", self.path.display()))?;
        tracing::info!("Loaded {} corpus rows from '{}'", rows.len(), self.path.display());
        Ok(rows)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_all_columns() {
        let csv  = "slides,summary,reflection\nintro to rust,rust basics,liked it\n";
        let rows = CsvCorpusLoader::read_from(csv.as_bytes()).unwrap();
        assert_eq!(rows, vec![CorpusRow::new("intro to rust", "rust basics", "liked it")]);
    }

    #[test]
    fn test_missing_cells_become_empty_strings() {
        let csv  = "summary,slides,reflection\n,only slides\n";
        let rows = CsvCorpusLoader::read_from(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].slides, "only slides");
        assert_eq!(rows[0].summary, "");
        assert_eq!(rows[0].reflection, "");
    }

    #[test]
    fn test_missing_target_columns_are_tolerated() {
        let csv  = "slides\nfirst deck\nsecond deck\n";
        let rows = CsvCorpusLoader::read_from(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].target_text(), " ");
    }

    #[test]
    fn test_missing_slides_column_is_an_error() {
        let csv = "summary,reflection\na,b\n";
        assert!(CsvCorpusLoader::read_from(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_rows_with_empty_id_are_rejected() {
        let csv  = "id,slides,summary,reflection\np1,deck one,s,r\n,deck two,s,r\n";
        let rows = CsvCorpusLoader::read_from(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id.as_deref(), Some("p1"));
    }

    #[test]
    fn test_load_rows_from_file() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.csv");
        std::fs::write(&path, "slides,summary,reflection\n\"a, b\",c,d\n").unwrap();
        let rows = CsvCorpusLoader::new(&path).load_rows().unwrap();
        assert_eq!(rows[0].slides, "a, b");
    }
}
