#![allow(dead_code)]

use std::cell::Cell;
use std::path::Path;

use anyhow::Result;
use ndarray::Array2;
use swisstext::embedding::{EncodedText, TextEncoder, TokenModel, EMBEDDING_DIM};
use swisstext::table::TextRecord;

pub const CLS_ID: i64 = 101;

/// Byte-level encoder: `[CLS]` then one token per byte, right-truncated and
/// zero-padded to `max_len`.
pub struct ByteEncoder {
    pub max_len: usize,
}

impl TextEncoder for ByteEncoder {
    fn encode(&self, text: &str) -> EncodedText {
        let mut ids: Vec<i64> = std::iter::once(CLS_ID)
            .chain(text.bytes().map(|b| 1000 + b as i64))
            .take(self.max_len)
            .collect();
        let attended = ids.len();
        ids.resize(self.max_len, 0);

        let mut mask = vec![1i64; attended];
        mask.resize(self.max_len, 0);

        EncodedText {
            input_ids: ids,
            attention_mask: mask,
            token_type_ids: vec![0; self.max_len],
        }
    }
}

/// Deterministic stand-in for a transformer: each hidden state depends on the
/// token id and its position.
pub struct HashModel;

impl HashModel {
    pub fn hidden_state(id: i64, position: usize, dim: usize) -> f32 {
        let h = (id as usize * 31 + dim * 7 + position * 13) % 97;
        h as f32 / 97.0 - 0.5
    }
}

impl TokenModel for HashModel {
    fn forward(&self, encoded: &EncodedText) -> Result<Array2<f32>> {
        Ok(Array2::from_shape_fn((encoded.len(), EMBEDDING_DIM), |(p, d)| {
            Self::hidden_state(encoded.input_ids[p], p, d)
        }))
    }
}

/// Succeeds for the first `ok_calls` forward passes, then fails.
pub struct FailingModel {
    pub ok_calls: usize,
    pub calls: Cell<usize>,
}

impl FailingModel {
    pub fn after(ok_calls: usize) -> Self {
        Self {
            ok_calls,
            calls: Cell::new(0),
        }
    }
}

impl TokenModel for FailingModel {
    fn forward(&self, encoded: &EncodedText) -> Result<Array2<f32>> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        anyhow::ensure!(n < self.ok_calls, "simulated inference failure");
        HashModel.forward(encoded)
    }
}

/// `n` texts with doc ids `0..n`.
pub fn numbered_texts(n: usize) -> Vec<TextRecord> {
    (0..n)
        .map(|i| TextRecord {
            doc_id: i.to_string(),
            text: format!("text number {i}"),
        })
        .collect()
}

/// Parsed output table: header plus `(vector, doc_id)` rows.
pub struct OutputTable {
    pub header: Vec<String>,
    pub rows: Vec<(Vec<f32>, String)>,
}

pub fn read_output(path: &Path) -> OutputTable {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    let header = rdr.headers().unwrap().iter().map(String::from).collect();
    let rows = rdr
        .records()
        .map(|record| {
            let record = record.unwrap();
            let fields: Vec<&str> = record.iter().collect();
            let (doc_id, components) = fields.split_last().unwrap();
            let vector = components.iter().map(|x| x.parse::<f32>().unwrap()).collect();
            (vector, doc_id.to_string())
        })
        .collect();
    OutputTable { header, rows }
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
