//! Input tables: texts to embed and model parameters.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::embedding::pooling::TokenStrategy;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("model parameter table has no rows")]
    NoModelParams,
    #[error("unknown truncation side: {0:?}. Supported: left, right")]
    UnknownTruncationSide(String),
    #[error("model name is empty")]
    EmptyModelName,
}

/// One text to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecord {
    pub doc_id: String,
    /// Lower-cased text.
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct RawTextRow {
    doc_id: String,
    text_data: String,
}

/// Which end of an over-long token sequence is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncationSide {
    Left,
    Right,
}

impl std::str::FromStr for TruncationSide {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(InputError::UnknownTruncationSide(other.to_string())),
        }
    }
}

impl std::fmt::Display for TruncationSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Left => "left",
            Self::Right => "right",
        })
    }
}

/// Model selection for a run, taken from the first parameter row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelParams {
    pub model_name: String,
    pub token_strategy: TokenStrategy,
    pub truncation_side: TruncationSide,
}

#[derive(Debug, Deserialize)]
struct RawParamsRow {
    name: String,
    token: String,
    truncation: String,
}

/// Read the text table (`doc_id`, `text_data`) from a CSV file.
pub fn read_texts(path: &Path) -> Result<Vec<TextRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open text table: {}", path.display()))?;
    read_texts_from(file).with_context(|| format!("failed to read {}", path.display()))
}

/// Read text records from any CSV source. Texts are lower-cased.
pub fn read_texts_from(reader: impl Read) -> Result<Vec<TextRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    rdr.deserialize::<RawTextRow>()
        .map(|row| {
            let row = row.context("malformed text row")?;
            Ok(TextRecord {
                doc_id: row.doc_id,
                text: row.text_data.to_lowercase(),
            })
        })
        .collect()
}

/// Read the model-parameter table (`name`, `token`, `truncation`) from a CSV file.
pub fn read_model_params(path: &Path) -> Result<ModelParams> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open model parameter table: {}", path.display()))?;
    read_model_params_from(file).with_context(|| format!("failed to read {}", path.display()))
}

/// Only the first row is used; later rows are ignored.
pub fn read_model_params_from(reader: impl Read) -> Result<ModelParams> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let row = rdr
        .deserialize::<RawParamsRow>()
        .next()
        .ok_or(InputError::NoModelParams)?
        .context("malformed model parameter row")?;

    let model_name = row.name.trim().to_string();
    if model_name.is_empty() {
        return Err(InputError::EmptyModelName.into());
    }

    Ok(ModelParams {
        model_name,
        token_strategy: TokenStrategy::from_param(&row.token),
        truncation_side: row.truncation.parse()?,
    })
}
