//! Text-to-vector embedding building blocks.
//!
//! The pipeline talks to a tokenizer through [`TextEncoder`] and to a
//! transformer through [`TokenModel`]. The ONNX Runtime implementations live
//! in [`local`]; tests substitute their own.

pub mod device;
pub mod local;
pub mod pooling;

use anyhow::Result;
use ndarray::Array2;

/// Hidden size of the supported encoder models (BERT-base family).
pub const EMBEDDING_DIM: usize = 768;

/// Default fixed sequence length every text is padded or truncated to.
pub const MAX_SEQ_LEN: usize = 512;

/// A single tokenized text, padded/truncated to a fixed length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
}

impl EncodedText {
    /// An encoding made only of padding: no position is attended.
    pub fn all_padding(len: usize, pad_id: i64) -> Self {
        Self {
            input_ids: vec![pad_id; len],
            attention_mask: vec![0; len],
            token_type_ids: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

/// Turns raw text into a fixed-length encoding.
///
/// Encoding never fails: implementations degrade to
/// [`EncodedText::all_padding`] when the underlying tokenizer rejects a text.
pub trait TextEncoder {
    fn encode(&self, text: &str) -> EncodedText;
}

/// Runs one forward pass and returns per-token hidden states.
///
/// The result has shape `[seq_len, hidden]` for the single encoded text.
pub trait TokenModel {
    fn forward(&self, encoded: &EncodedText) -> Result<Array2<f32>>;
}

impl<T: TextEncoder + ?Sized> TextEncoder for &T {
    fn encode(&self, text: &str) -> EncodedText {
        (**self).encode(text)
    }
}

impl<T: TokenModel + ?Sized> TokenModel for &T {
    fn forward(&self, encoded: &EncodedText) -> Result<Array2<f32>> {
        (**self).forward(encoded)
    }
}
