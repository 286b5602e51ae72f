// SPDX-FileCopyrightText: 2026 Lexrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ONNX sequence classifier for intent labels.
//!
//! Runs a fine-tuned Chinese BERT classification head exported to ONNX.
//! The output logits are indexed by [`Intent::ALL`] order; the softmax
//! maximum becomes the reported confidence.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use lexrelay_core::error::RelayError;
use lexrelay_core::traits::IntentClassifier;
use lexrelay_core::types::{Classification, Intent};

/// ONNX-based intent classifier.
#[derive(Debug)]
pub struct OnnxClassifier {
    /// ONNX Runtime session (not Send, wrapped in Mutex for safety).
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
}

// Safety: Session is accessed through Mutex which provides synchronization.
// The tokenizer is thread-safe for encoding operations.
unsafe impl Send for OnnxClassifier {}
unsafe impl Sync for OnnxClassifier {}

impl OnnxClassifier {
    /// Loads `model.onnx` and `tokenizer.json` from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self, RelayError> {
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            RelayError::Classifier(format!(
                "failed to load tokenizer from {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        let model_path = model_dir.join("model.onnx");
        let session = Session::builder()
            .map_err(|e| RelayError::Classifier(format!("failed to create ONNX session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| RelayError::Classifier(format!("failed to set optimization level: {e}")))?
            .with_intra_threads(1)
            .map_err(|e| RelayError::Classifier(format!("failed to set thread count: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| {
                RelayError::Classifier(format!(
                    "failed to load ONNX model from {}: {e}",
                    model_path.display()
                ))
            })?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    fn classify_text(&self, text: &str) -> Result<Classification, RelayError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| RelayError::Classifier(format!("tokenization failed: {e}")))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let token_type_ids: Vec<i64> = encoding
            .get_type_ids()
            .iter()
            .map(|&t| t as i64)
            .collect();

        let seq_len = input_ids.len();

        let input_ids_array = Array2::from_shape_vec((1, seq_len), input_ids)
            .map_err(|e| RelayError::Classifier(format!("failed to shape input_ids: {e}")))?;
        let attention_mask_array = Array2::from_shape_vec((1, seq_len), attention_mask)
            .map_err(|e| RelayError::Classifier(format!("failed to shape attention_mask: {e}")))?;
        let token_type_ids_array = Array2::from_shape_vec((1, seq_len), token_type_ids)
            .map_err(|e| RelayError::Classifier(format!("failed to shape token_type_ids: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| RelayError::Classifier(format!("ONNX session lock poisoned: {e}")))?;

        let input_ids_tensor = TensorRef::from_array_view(&input_ids_array)
            .map_err(|e| RelayError::Classifier(format!("failed to build input_ids tensor: {e}")))?;
        let attention_mask_tensor = TensorRef::from_array_view(&attention_mask_array)
            .map_err(|e| RelayError::Classifier(format!("failed to build attention_mask tensor: {e}")))?;
        let token_type_ids_tensor = TensorRef::from_array_view(&token_type_ids_array)
            .map_err(|e| RelayError::Classifier(format!("failed to build token_type_ids tensor: {e}")))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            ])
            .map_err(|e| RelayError::Classifier(format!("ONNX inference failed: {e}")))?;

        // Logits: shape [1, num_labels].
        let (_shape, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RelayError::Classifier(format!("failed to extract logits: {e}")))?;

        if logits.len() != Intent::ALL.len() {
            return Err(RelayError::Classifier(format!(
                "model emitted {} logits, expected {}",
                logits.len(),
                Intent::ALL.len()
            )));
        }

        let probabilities = softmax(logits);
        let (max_index, confidence) = probabilities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, p)| (i, *p))
            .ok_or_else(|| RelayError::Classifier("empty probability vector".into()))?;

        Ok(Classification {
            intent: Intent::ALL[max_index],
            confidence,
        })
    }
}

#[async_trait]
impl IntentClassifier for OnnxClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, RelayError> {
        self.classify_text(text)
    }

    fn name(&self) -> &'static str {
        "onnx"
    }
}

/// Numerically stable softmax.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_sums_to_one_and_preserves_argmax() {
        let probs = softmax(&[1.0, 3.0, 2.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[1] > probs[2] && probs[2] > probs[0]);
    }

    #[test]
    fn softmax_is_stable_for_large_logits() {
        let probs = softmax(&[1000.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!(probs[0] > probs[1]);
    }

    #[test]
    fn load_fails_cleanly_without_model_files() {
        let err = OnnxClassifier::load(Path::new("/nonexistent/model/dir")).unwrap_err();
        assert!(matches!(err, RelayError::Classifier(_)));
    }

    // Inference against a real model is exercised in deployments with an
    // intent_model_dir configured; the label-count guard above catches a
    // mismatched export at first use.
}
