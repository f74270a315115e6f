//! Accumulated embedding table and its CSV persistence.

use std::path::Path;

use anyhow::{Context, Result};

/// One output row: the embedding components followed by the document id.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRow {
    pub vector: Vec<f32>,
    pub doc_id: String,
}

/// All rows produced so far, in processing order.
#[derive(Debug, Clone)]
pub struct EmbeddingTable {
    dims: usize,
    rows: Vec<EmbeddingRow>,
}

impl EmbeddingTable {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            rows: Vec::new(),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[EmbeddingRow] {
        &self.rows
    }

    /// Append a batch. The whole batch is rejected if any vector has the
    /// wrong length, so the table never holds a partial batch.
    pub fn extend_batch(&mut self, batch: Vec<EmbeddingRow>) -> Result<()> {
        if let Some(bad) = batch.iter().find(|row| row.vector.len() != self.dims) {
            anyhow::bail!(
                "embedding for doc_id {} has {} dimensions, expected {}",
                bad.doc_id,
                bad.vector.len(),
                self.dims
            );
        }
        self.rows.extend(batch);
        Ok(())
    }

    /// Header: `0`, `1`, ..., `dims - 1`, `doc_id`.
    pub fn header(&self) -> Vec<String> {
        (0..self.dims)
            .map(|i| i.to_string())
            .chain(std::iter::once("doc_id".to_string()))
            .collect()
    }

    /// Overwrite `dest` with the full table.
    ///
    /// Writes to a sibling temp file and renames it into place, so readers
    /// only ever see a complete table.
    pub fn write_csv(&self, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create output dir: {}", parent.display()))?;
        }

        let tmp_path = dest.with_extension("tmp");
        {
            let mut wtr = csv::Writer::from_path(&tmp_path)
                .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;
            wtr.write_record(self.header())?;

            let mut record = Vec::with_capacity(self.dims + 1);
            for row in &self.rows {
                record.clear();
                record.extend(row.vector.iter().map(|x| x.to_string()));
                record.push(row.doc_id.clone());
                wtr.write_record(&record)?;
            }
            wtr.flush().context("error writing embeddings")?;
        }

        std::fs::rename(&tmp_path, dest)
            .with_context(|| format!("failed to move embeddings into {}", dest.display()))?;

        tracing::debug!(rows = self.rows.len(), dest = %dest.display(), "embedding table written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(doc_id: &str, vector: Vec<f32>) -> EmbeddingRow {
        EmbeddingRow {
            vector,
            doc_id: doc_id.into(),
        }
    }

    #[test]
    fn header_lists_components_then_doc_id() {
        let table = EmbeddingTable::new(3);
        assert_eq!(table.header(), vec!["0", "1", "2", "doc_id"]);
    }

    #[test]
    fn wrong_dimension_rejects_whole_batch() {
        let mut table = EmbeddingTable::new(2);
        let err = table.extend_batch(vec![row("a", vec![1.0, 0.0]), row("b", vec![1.0])]);
        assert!(err.is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn write_then_read_back() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out").join("embeddings.csv");

        let mut table = EmbeddingTable::new(2);
        table
            .extend_batch(vec![row("1", vec![0.6, 0.8]), row("2", vec![-1.0, 0.0])])
            .unwrap();
        table.write_csv(&dest).unwrap();

        let contents = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(contents, "0,1,doc_id\n0.6,0.8,1\n-1,0,2\n");
        assert!(!dest.with_extension("tmp").exists());
    }

    #[test]
    fn rewrite_replaces_previous_contents() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("embeddings.csv");

        let mut table = EmbeddingTable::new(1);
        table.extend_batch(vec![row("a", vec![1.0])]).unwrap();
        table.write_csv(&dest).unwrap();
        table.extend_batch(vec![row("b", vec![0.5])]).unwrap();
        table.write_csv(&dest).unwrap();

        let contents = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(contents, "0,doc_id\n1,a\n0.5,b\n");
    }

    #[test]
    fn empty_table_writes_header_only() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("embeddings.csv");
        EmbeddingTable::new(2).write_csv(&dest).unwrap();
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "0,1,doc_id\n");
    }
}
