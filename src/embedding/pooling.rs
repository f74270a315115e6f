//! Reduce per-token hidden states to a single vector per text.

use ndarray::{Array1, ArrayView2, Axis};

/// Lower bound for the mask sum in mean pooling.
const MASK_EPSILON: f32 = 1e-9;

/// How a token matrix becomes one text vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStrategy {
    /// Take the hidden state at position 0 (the `[CLS]` token).
    ClsToken,
    /// Average the hidden states of attended positions.
    MeanPooling,
}

impl TokenStrategy {
    /// `"cls_token"` selects first-token extraction, anything else mean pooling.
    pub fn from_param(value: &str) -> Self {
        if value.trim() == "cls_token" {
            Self::ClsToken
        } else {
            Self::MeanPooling
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClsToken => "cls_token",
            Self::MeanPooling => "mean_pooling",
        }
    }

    /// Pool and L2-normalize one text's token matrix.
    pub fn pool(&self, token_embeddings: ArrayView2<'_, f32>, attention_mask: &[i64]) -> Array1<f32> {
        match self {
            Self::ClsToken => extract_cls(token_embeddings, true),
            Self::MeanPooling => mean_pooling(token_embeddings, attention_mask, true),
        }
    }
}

impl std::fmt::Display for TokenStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Masked mean over the sequence axis of a `[seq_len, hidden]` matrix.
///
/// Mask positions beyond the matrix are ignored; matrix rows beyond the mask
/// count as unattended. The divisor is clamped at `1e-9`, so an all-zero mask
/// yields a zero vector.
pub fn mean_pooling(
    token_embeddings: ArrayView2<'_, f32>,
    attention_mask: &[i64],
    normalize: bool,
) -> Array1<f32> {
    let mut sum = Array1::<f32>::zeros(token_embeddings.ncols());
    let mut count = 0.0f32;

    for (row, &mask) in token_embeddings.axis_iter(Axis(0)).zip(attention_mask) {
        let weight = mask as f32;
        if weight != 0.0 {
            sum.scaled_add(weight, &row);
            count += weight;
        }
    }

    let pooled = sum / count.max(MASK_EPSILON);
    if normalize {
        l2_normalize(pooled)
    } else {
        pooled
    }
}

/// The hidden state at sequence position 0, independent of the mask.
pub fn extract_cls(token_embeddings: ArrayView2<'_, f32>, normalize: bool) -> Array1<f32> {
    let cls = if token_embeddings.nrows() == 0 {
        Array1::zeros(token_embeddings.ncols())
    } else {
        token_embeddings.row(0).to_owned()
    };
    if normalize {
        l2_normalize(cls)
    } else {
        cls
    }
}

/// L2-normalize a vector. A zero vector is returned unchanged.
pub fn l2_normalize(v: Array1<f32>) -> Array1<f32> {
    let norm = v.dot(&v).sqrt();
    if norm > 0.0 {
        v / norm
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn norm(v: &Array1<f32>) -> f32 {
        v.dot(v).sqrt()
    }

    #[test]
    fn test_l2_normalize() {
        let normalized = l2_normalize(array![3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
        assert!((norm(&normalized) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let normalized = l2_normalize(Array1::zeros(3));
        assert_eq!(normalized, array![0.0, 0.0, 0.0]);
    }

    #[test]
    fn mean_pooling_full_mask_is_arithmetic_mean() {
        let tokens = array![[1.0, 2.0], [3.0, 4.0], [5.0, 9.0]];
        let pooled = mean_pooling(tokens.view(), &[1, 1, 1], false);
        assert!((pooled[0] - 3.0).abs() < 1e-6);
        assert!((pooled[1] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn mean_pooling_skips_padding() {
        let tokens = array![[2.0, 0.0], [4.0, 2.0], [100.0, 100.0]];
        let pooled = mean_pooling(tokens.view(), &[1, 1, 0], false);
        assert_eq!(pooled, array![3.0, 1.0]);
    }

    #[test]
    fn mean_pooling_zero_mask_does_not_divide_by_zero() {
        let tokens = array![[1.0, 2.0], [3.0, 4.0]];
        let pooled = mean_pooling(tokens.view(), &[0, 0], true);
        assert!(pooled.iter().all(|x| x.is_finite()));
        assert_eq!(pooled, array![0.0, 0.0]);
    }

    #[test]
    fn mean_pooling_normalized_has_unit_norm() {
        let tokens = Array2::from_shape_fn((8, 16), |(i, j)| (i * 16 + j) as f32 * 0.01 - 0.3);
        let pooled = mean_pooling(tokens.view(), &[1, 1, 1, 1, 1, 0, 0, 0], true);
        assert_eq!(pooled.len(), 16);
        assert!((norm(&pooled) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cls_ignores_mask() {
        let tokens = array![[0.5, -1.5], [9.0, 9.0]];
        let with_mask = TokenStrategy::ClsToken.pool(tokens.view(), &[0, 0]);
        let raw = extract_cls(tokens.view(), false);
        assert_eq!(raw, array![0.5, -1.5]);
        assert_eq!(with_mask, l2_normalize(array![0.5, -1.5]));
        assert!((norm(&with_mask) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn strategy_from_param() {
        assert_eq!(TokenStrategy::from_param("cls_token"), TokenStrategy::ClsToken);
        assert_eq!(TokenStrategy::from_param("mean_pooling"), TokenStrategy::MeanPooling);
        assert_eq!(TokenStrategy::from_param("anything"), TokenStrategy::MeanPooling);
    }
}
