//! Batch text embeddings with pretrained transformer models.
//!
//! `swisstext` reads a table of texts, encodes each one with a Hugging Face
//! tokenizer, runs an ONNX export of the model, pools the token states into
//! one L2-normalized 768-dim vector per text, and writes the vectors to a CSV
//! table keyed by `doc_id`.
//!
//! | `token` parameter | Pooling |
//! |-------------------|---------|
//! | `cls_token` | Hidden state of the first token |
//! | anything else | Attention-masked mean over all tokens |
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`embedding`] — Tokenizer and model seams, pooling, device selection
//! - [`pipeline`] — The batch loop with per-batch checkpointing
//! - [`table`] — CSV input tables and the accumulated output table

pub mod config;
pub mod embedding;
pub mod pipeline;
pub mod table;
