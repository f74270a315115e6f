//! CSV tables in and out of the pipeline.
//!
//! - [`input`] reads the text table and the model-parameter table
//! - [`output`] accumulates embedding rows and rewrites the output file

pub mod input;
pub mod output;

pub use input::{read_model_params, read_texts, InputError, ModelParams, TextRecord, TruncationSide};
pub use output::{EmbeddingRow, EmbeddingTable};
