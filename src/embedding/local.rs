//! Local ONNX Runtime model and Hugging Face tokenizer.
//!
//! [`HfTokenizer`] implements [`TextEncoder`] with fixed-length padding and
//! side-configurable truncation. [`OnnxModel`] implements [`TokenModel`] by
//! running the exported encoder graph and returning `last_hidden_state`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{
    PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationDirection,
    TruncationParams, TruncationStrategy,
};

use super::device::Device;
use super::{EncodedText, TextEncoder, TokenModel, EMBEDDING_DIM};
use crate::table::TruncationSide;

/// On-disk location of a pretrained model's files inside the cache.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub dir: PathBuf,
    pub model: PathBuf,
    pub tokenizer: PathBuf,
}

impl ModelFiles {
    /// `org/model` is cached as `<cache_dir>/org--model/`.
    pub fn in_cache(cache_dir: &Path, model_name: &str) -> Self {
        let dir = cache_dir.join(model_name.trim().replace('/', "--"));
        Self {
            model: dir.join("model.onnx"),
            tokenizer: dir.join("tokenizer.json"),
            dir,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.model.exists() && self.tokenizer.exists()
    }
}

/// Tokenizer producing exactly `max_length` tokens per text.
pub struct HfTokenizer {
    tokenizer: Tokenizer,
    max_length: usize,
    pad_id: i64,
}

impl HfTokenizer {
    pub fn from_file(path: &Path, max_length: usize, side: TruncationSide) -> Result<Self> {
        anyhow::ensure!(
            path.exists(),
            "Tokenizer not found at {}. Run `swisstext model download` first.",
            path.display()
        );
        let tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;
        let encoder = Self::with_tokenizer(tokenizer, max_length, side)?;
        tracing::info!(tokenizer = %path.display(), max_length, truncation = %side, "tokenizer loaded");
        Ok(encoder)
    }

    /// Configure an already-built tokenizer for fixed-length encoding.
    pub fn with_tokenizer(
        mut tokenizer: Tokenizer,
        max_length: usize,
        side: TruncationSide,
    ) -> Result<Self> {
        let direction = match side {
            TruncationSide::Left => TruncationDirection::Left,
            TruncationSide::Right => TruncationDirection::Right,
        };
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                direction,
                strategy: TruncationStrategy::LongestFirst,
                stride: 0,
            }))
            .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;

        // Keep whatever pad token the tokenizer already declares.
        let base = tokenizer.get_padding().cloned().unwrap_or_default();
        let pad_id = base.pad_id as i64;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::Fixed(max_length),
            direction: PaddingDirection::Right,
            ..base
        }));

        Ok(Self {
            tokenizer,
            max_length,
            pad_id,
        })
    }
}

impl TextEncoder for HfTokenizer {
    fn encode(&self, text: &str) -> EncodedText {
        let encoding = match self.tokenizer.encode(text, true) {
            Ok(encoding) => encoding,
            Err(e) => {
                tracing::warn!(error = %e, "tokenization failed, using padding-only encoding");
                return EncodedText::all_padding(self.max_length, self.pad_id);
            }
        };

        let widen = |xs: &[u32]| xs.iter().map(|&x| x as i64).collect::<Vec<i64>>();
        let encoded = EncodedText {
            input_ids: widen(encoding.get_ids()),
            attention_mask: widen(encoding.get_attention_mask()),
            token_type_ids: widen(encoding.get_type_ids()),
        };

        if encoded.len() != self.max_length {
            tracing::warn!(
                len = encoded.len(),
                expected = self.max_length,
                "unexpected encoding length, using padding-only encoding"
            );
            return EncodedText::all_padding(self.max_length, self.pad_id);
        }
        encoded
    }
}

/// Encoder graph loaded into an ONNX Runtime session.
pub struct OnnxModel {
    session: Mutex<Session>,
    wants_token_type_ids: bool,
    device: Device,
}

impl OnnxModel {
    pub fn from_file(path: &Path, device: Device) -> Result<Self> {
        anyhow::ensure!(
            path.exists(),
            "ONNX model not found at {}. Run `swisstext model download` first.",
            path.display()
        );

        let mut builder = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?;
        if device.is_accelerator() {
            builder = builder.with_execution_providers([device.execution_provider()])?;
        }
        let session = builder
            .commit_from_file(path)
            .context("failed to load ONNX model")?;

        // BERT exports take token_type_ids; MPNet and RoBERTa exports do not.
        let wants_token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        tracing::info!(model = %path.display(), %device, wants_token_type_ids, "ONNX model loaded");

        Ok(Self {
            session: Mutex::new(session),
            wants_token_type_ids,
            device,
        })
    }

    pub fn device(&self) -> Device {
        self.device
    }
}

impl TokenModel for OnnxModel {
    fn forward(&self, encoded: &EncodedText) -> Result<Array2<f32>> {
        let seq_len = encoded.len();
        let shape = vec![1i64, seq_len as i64];

        let input_ids = Tensor::from_array((
            shape.clone(),
            encoded.input_ids.clone().into_boxed_slice(),
        ))?;
        let attention_mask = Tensor::from_array((
            shape.clone(),
            encoded.attention_mask.clone().into_boxed_slice(),
        ))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;

        let outputs = if self.wants_token_type_ids {
            let token_type_ids = Tensor::from_array((
                shape,
                encoded.token_type_ids.clone().into_boxed_slice(),
            ))?;
            session.run(ort::inputs! {
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids,
            })?
        } else {
            session.run(ort::inputs! {
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
            })?
        };

        // The output name varies by export. Try common names, fall back to index 0.
        let hidden = outputs
            .get("last_hidden_state")
            .or_else(|| outputs.get("token_embeddings"))
            .unwrap_or_else(|| &outputs[0]);

        let (shape, data) = hidden
            .try_extract_tensor::<f32>()
            .context("failed to extract last_hidden_state tensor")?;

        let dims: &[i64] = &shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] == 1 && dims[2] == EMBEDDING_DIM as i64,
            "unexpected hidden state shape: {dims:?}, expected [1, seq, {EMBEDDING_DIM}]"
        );

        let rows = dims[1] as usize;
        Array2::from_shape_vec((rows, EMBEDDING_DIM), data.to_vec())
            .context("hidden state does not match its declared shape")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::pooling::TokenStrategy;

    fn test_files() -> ModelFiles {
        let cache = crate::config::expand_tilde("~/.swisstext/models");
        ModelFiles::in_cache(&cache, "sentence-transformers/all-mpnet-base-v2")
    }

    #[test]
    fn cache_layout_flattens_org_prefix() {
        let files = ModelFiles::in_cache(Path::new("/cache"), "org/name");
        assert_eq!(files.dir, PathBuf::from("/cache/org--name"));
        assert_eq!(files.model, PathBuf::from("/cache/org--name/model.onnx"));
        assert_eq!(files.tokenizer, PathBuf::from("/cache/org--name/tokenizer.json"));
        assert!(!files.is_complete());
    }

    #[test]
    fn missing_tokenizer_is_an_error() {
        let err = HfTokenizer::from_file(Path::new("/nonexistent/tokenizer.json"), 512, TruncationSide::Right);
        assert!(err.is_err());
    }

    #[test]
    #[ignore] // Requires model files — run with: cargo test -- --ignored
    fn test_encode_is_fixed_length() {
        let files = test_files();
        let tok = HfTokenizer::from_file(&files.tokenizer, 512, TruncationSide::Right).unwrap();
        let long = "word ".repeat(2000);
        for text in ["", "hello", long.as_str()] {
            let enc = tok.encode(text);
            assert_eq!(enc.len(), 512);
            assert_eq!(enc.attention_mask.len(), 512);
        }
    }

    #[test]
    #[ignore]
    fn test_left_truncation_keeps_tail() {
        let files = test_files();
        let left = HfTokenizer::from_file(&files.tokenizer, 16, TruncationSide::Left).unwrap();
        let right = HfTokenizer::from_file(&files.tokenizer, 16, TruncationSide::Right).unwrap();
        let text = "alpha ".repeat(20) + "omega";
        assert_ne!(left.encode(&text).input_ids, right.encode(&text).input_ids);
    }

    #[test]
    #[ignore]
    fn test_forward_produces_768_dims() {
        let files = test_files();
        let tok = HfTokenizer::from_file(&files.tokenizer, 512, TruncationSide::Right).unwrap();
        let model = OnnxModel::from_file(&files.model, Device::Cpu).unwrap();
        let enc = tok.encode("hello world");
        let hidden = model.forward(&enc).unwrap();
        assert_eq!(hidden.dim(), (512, EMBEDDING_DIM));
        let pooled = TokenStrategy::MeanPooling.pool(hidden.view(), &enc.attention_mask);
        assert!((pooled.dot(&pooled).sqrt() - 1.0).abs() < 1e-4);
    }
}
