//! The embedding pipeline: batch, encode, infer, pool, persist.
//!
//! Everything runs sequentially on the calling thread. After each batch the
//! full accumulated table is rewritten, so the output file always holds a
//! complete prefix of the processed batches.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::embedding::pooling::TokenStrategy;
use crate::embedding::{TextEncoder, TokenModel, EMBEDDING_DIM};
use crate::table::{EmbeddingRow, EmbeddingTable, TextRecord};

/// Per-run settings not carried by the tokenizer or model.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub batch_size: usize,
    pub strategy: TokenStrategy,
    pub output: PathBuf,
}

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: usize,
    pub rows: usize,
}

/// Number of batches for `total` texts: `ceil(total / batch_size)`.
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    total.div_ceil(batch_size)
}

/// Embed `texts` and write them to `options.output`.
///
/// The output file is rewritten after every batch and once more at the end.
/// An error in any batch aborts the run and leaves the last complete rewrite
/// on disk.
pub fn run<E, M>(texts: &[TextRecord], encoder: &E, model: &M, options: &PipelineOptions) -> Result<RunSummary>
where
    E: TextEncoder + ?Sized,
    M: TokenModel + ?Sized,
{
    anyhow::ensure!(options.batch_size > 0, "batch size must be positive");

    let n_batches = batch_count(texts.len(), options.batch_size);
    info!(
        texts = texts.len(),
        batches = n_batches,
        batch_size = options.batch_size,
        strategy = %options.strategy,
        "starting embedding run"
    );

    let mut table = EmbeddingTable::new(EMBEDDING_DIM);

    for (batch_idx, batch) in texts.chunks(options.batch_size).enumerate() {
        println!("Processing batch n.: {batch_idx}");

        let rows = embed_batch(batch, encoder, model, options.strategy)
            .with_context(|| format!("batch {batch_idx} failed"))?;
        table.extend_batch(rows)?;
        table.write_csv(&options.output)?;

        debug!(batch = batch_idx, rows = table.len(), "batch persisted");
    }

    table.write_csv(&options.output)?;
    info!(rows = table.len(), output = %options.output.display(), "embedding run complete");

    Ok(RunSummary {
        batches: n_batches,
        rows: table.len(),
    })
}

/// Embed one batch, one text at a time, preserving input order.
pub fn embed_batch<E, M>(
    batch: &[TextRecord],
    encoder: &E,
    model: &M,
    strategy: TokenStrategy,
) -> Result<Vec<EmbeddingRow>>
where
    E: TextEncoder + ?Sized,
    M: TokenModel + ?Sized,
{
    let encoded: Vec<_> = batch.iter().map(|record| encoder.encode(&record.text)).collect();

    batch
        .iter()
        .zip(&encoded)
        .map(|(record, enc)| {
            let hidden = model
                .forward(enc)
                .with_context(|| format!("inference failed for doc_id {}", record.doc_id))?;
            let vector = strategy.pool(hidden.view(), &enc.attention_mask);
            Ok(EmbeddingRow {
                vector: vector.to_vec(),
                doc_id: record.doc_id.clone(),
            })
        })
        .collect()
}
