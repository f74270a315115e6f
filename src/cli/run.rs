//! CLI `run` command — embed the text table and write the embedding table.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::config::{expand_tilde, SwisstextConfig};
use crate::embedding::device::{select_device, Capabilities};
use crate::embedding::local::{HfTokenizer, ModelFiles, OnnxModel};
use crate::pipeline::{self, PipelineOptions};
use crate::table;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Text table with `doc_id` and `text_data` columns
    #[arg(long)]
    pub texts: Option<PathBuf>,
    /// Model parameter table with `name`, `token` and `truncation` columns
    #[arg(long)]
    pub params: Option<PathBuf>,
    /// Where to write the embedding table
    #[arg(long)]
    pub output: Option<PathBuf>,
    /// Texts per batch (the output is rewritten after each)
    #[arg(long)]
    pub batch_size: Option<usize>,
}

/// Load inputs, fetch the model if needed, and run the pipeline.
pub async fn run(config: &SwisstextConfig, args: RunArgs) -> Result<()> {
    let texts_path = args.texts.unwrap_or_else(|| expand_tilde(&config.paths.texts));
    let params_path = args.params.unwrap_or_else(|| expand_tilde(&config.paths.params));
    let output = args.output.unwrap_or_else(|| expand_tilde(&config.paths.output));
    let batch_size = args.batch_size.unwrap_or(config.pipeline.batch_size);
    let max_length = config.pipeline.max_length;

    // Inputs are read before anything touches the output file.
    let texts = table::read_texts(&texts_path)?;
    let params = table::read_model_params(&params_path)?;
    tracing::info!(
        texts = texts.len(),
        model = %params.model_name,
        token = %params.token_strategy,
        truncation = %params.truncation_side,
        "inputs loaded"
    );

    let files = ModelFiles::in_cache(&config.resolved_cache_dir(), &params.model_name);
    let files = if files.is_complete() {
        files
    } else {
        super::model_download(config, &params.model_name).await?
    };

    let preference = config.model.device;
    let options = PipelineOptions {
        batch_size,
        strategy: params.token_strategy,
        output,
    };
    let side = params.truncation_side;
    let output = options.output.clone();

    let summary = tokio::task::spawn_blocking(move || {
        let device = select_device(preference, Capabilities::probe());
        let encoder = HfTokenizer::from_file(&files.tokenizer, max_length, side)?;
        let model = OnnxModel::from_file(&files.model, device)?;
        pipeline::run(&texts, &encoder, &model, &options)
    })
    .await
    .context("embedding task panicked")??;

    println!(
        "Embedded {} texts in {} batch(es) into {}",
        summary.rows,
        summary.batches,
        output.display()
    );
    Ok(())
}
