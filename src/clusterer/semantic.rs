use std::path::Path;
use std::sync::{Arc, OnceLock};

use anyhow::Result;
use async_trait::async_trait;
use candle_core::{safetensors, DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, HiddenAct, PositionEmbeddingType};
use tokenizers::Tokenizer;
use tracing::{error, info, warn};

use crate::TARGET_CLUSTERER;

/// Sentence-embedding collaborator backing §4.4 Step 3's optional semantic
/// signal. Disabled by default (`semantic_weight = 0.0`); vectors, when
/// produced, are persisted as a BLOB column on the article row in the Store
/// itself rather than a separate vector database (see DESIGN.md).
#[async_trait]
pub trait SemanticEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Option<Vec<f32>>;
}

pub struct NullEmbedder;

#[async_trait]
impl SemanticEmbedder for NullEmbedder {
    async fn embed(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }
}

pub struct E5Config {
    pub model_path: String,
    pub tokenizer_path: String,
    pub dimensions: usize,
    pub max_length: usize,
    pub device: Device,
}

impl Default for E5Config {
    fn default() -> Self {
        E5Config {
            model_path: "models/e5-large-v2.safetensors".to_string(),
            tokenizer_path: "models/e5-tokenizer.json".to_string(),
            dimensions: 1024,
            max_length: 512,
            device: Device::Cpu,
        }
    }
}

static MODEL: OnceLock<Arc<BertModel>> = OnceLock::new();
static TOKENIZER: OnceLock<Arc<Tokenizer>> = OnceLock::new();

/// Mean-pooled, L2-normalized E5 sentence embedder, ported from the
/// teacher's `vector::embedding`/`vector::config` BERT loading shape.
/// Lazily initialized on first `embed` call; falls back to `None` (never a
/// hard error) if the model files aren't present on disk.
pub struct CandleEmbedder {
    config: E5Config,
}

impl CandleEmbedder {
    pub fn new(config: E5Config) -> Self {
        CandleEmbedder { config }
    }

    fn ensure_loaded(&self) -> Result<()> {
        if MODEL.get().is_some() && TOKENIZER.get().is_some() {
            return Ok(());
        }
        if !Path::new(&self.config.model_path).exists() || !Path::new(&self.config.tokenizer_path).exists() {
            return Err(anyhow::anyhow!("E5 model files not present on disk"));
        }

        let bert_config = BertConfig {
            hidden_size: self.config.dimensions,
            intermediate_size: 4096,
            max_position_embeddings: self.config.max_length,
            num_attention_heads: 16,
            num_hidden_layers: 24,
            vocab_size: 30522,
            layer_norm_eps: 1e-12,
            pad_token_id: 0,
            hidden_act: HiddenAct::Gelu,
            hidden_dropout_prob: 0.0,
            type_vocab_size: 2,
            initializer_range: 0.02,
            position_embedding_type: PositionEmbeddingType::Absolute,
            use_cache: false,
            classifier_dropout: None,
            model_type: None,
        };

        let tensors = safetensors::load_buffer(&std::fs::read(&self.config.model_path)?, &self.config.device)?;
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &self.config.device);
        let model = BertModel::load(vb, &bert_config)?;
        let tokenizer = Tokenizer::from_file(&self.config.tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;

        let _ = MODEL.set(Arc::new(model));
        let _ = TOKENIZER.set(Arc::new(tokenizer));
        info!(target: TARGET_CLUSTERER, "semantic embedder loaded");
        Ok(())
    }
}

#[async_trait]
impl SemanticEmbedder for CandleEmbedder {
    async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        if let Err(e) = self.ensure_loaded() {
            warn!(target: TARGET_CLUSTERER, error = %e, "semantic embedder unavailable");
            return None;
        }
        let model = MODEL.get()?.clone();
        let tokenizer = TOKENIZER.get()?.clone();
        let config = self.config.model_path.clone();
        let dimensions = self.config.dimensions;
        let max_length = self.config.max_length;
        let device = self.config.device.clone();
        let prefixed = format!("query: {text}");

        let result = tokio::task::spawn_blocking(move || {
            embed_blocking(&prefixed, &model, &tokenizer, max_length, dimensions, &device)
        })
        .await;

        match result {
            Ok(Ok(vector)) => Some(vector),
            Ok(Err(e)) => {
                error!(target: TARGET_CLUSTERER, model = %config, error = %e, "embedding failed");
                None
            }
            Err(e) => {
                error!(target: TARGET_CLUSTERER, error = %e, "embedding task panicked");
                None
            }
        }
    }
}

fn embed_blocking(
    text: &str,
    model: &BertModel,
    tokenizer: &Tokenizer,
    max_length: usize,
    dimensions: usize,
    device: &Device,
) -> Result<Vec<f32>> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;

    let max_len = max_length.saturating_sub(1).max(1);
    let input_ids: Vec<i64> = encoding.get_ids().iter().take(max_len).map(|&x| x as i64).collect();
    let attention_mask: Vec<i64> = encoding
        .get_attention_mask()
        .iter()
        .take(max_len)
        .map(|&x| x as i64)
        .collect();

    let input_ids = Tensor::new(input_ids, device)?.unsqueeze(0)?;
    let attention_mask = Tensor::new(attention_mask, device)?.unsqueeze(0)?;

    let hidden_state = model.forward(&input_ids, &attention_mask, None)?;
    let mask_float = attention_mask.to_dtype(DType::F32)?;
    let mask_expanded = mask_float.unsqueeze(2)?.expand(hidden_state.shape())?;
    let masked_hidden = hidden_state.mul(&mask_expanded)?;
    let summed = masked_hidden.sum(1)?;
    let valid_counts = mask_float.sum(1)?.unsqueeze(1)?.clamp(1.0, f32::MAX)?;
    let valid_counts_expanded = valid_counts.expand(summed.shape())?;
    let mean_pooled = summed.div(&valid_counts_expanded)?;

    let norm = mean_pooled.sqr()?.sum(1)?.sqrt()?.unsqueeze(1)?;
    let norm_expanded = norm.expand(mean_pooled.shape())?;
    let normalized = mean_pooled.div(&norm_expanded)?;

    let vector = normalized.squeeze(0)?.to_vec1::<f32>()?;
    if vector.len() != dimensions {
        return Err(anyhow::anyhow!(
            "unexpected embedding dimensions: got {}, expected {}",
            vector.len(),
            dimensions
        ));
    }
    Ok(vector)
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_embedder_always_returns_none() {
        let embedder = NullEmbedder;
        assert!(embedder.embed("any text").await.is_none());
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.1, 0.2, 0.3];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-6);
    }
}
