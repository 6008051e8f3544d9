//! Sentence-embedding capability used by the similarity scorer.
//!
//! The scorer only sees `dyn Embedder`. Two backends exist:
//! - `MiniLmEmbedder`: all-MiniLM-L6-v2 run locally through candle (default).
//! - `HashEmbedder`: deterministic feature hashing, no model files; used offline and in tests.
//!
//! Exactly one instance is built in `main` before the listener binds and shared as
//! `Arc<dyn Embedder>`. Implementations hold no per-call mutable state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use thiserror::Error;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::config::{Config, EmbeddingBackend};

pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
/// Word-piece limit the sentence-transformers checkpoint was trained with.
pub const MAX_SEQ_LEN: usize = 256;

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Model load failed: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("Tokenization failed: {reason}")]
    TokenizationFailed { reason: String },

    #[error("Inference failed: {0}")]
    Inference(#[from] candle_core::Error),
}

/// Text → fixed-length vector. Must be deterministic for identical input.
pub trait Embedder: Send + Sync {
    /// Backend label, reported by `/health`.
    fn name(&self) -> &str;

    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Where the MiniLM weights come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// A directory holding `config.json`, `tokenizer.json` and `model.safetensors`.
    Local(PathBuf),
    /// A Hugging Face hub repository, cached under the usual hub cache directory.
    Hub { model_id: String, revision: String },
}

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

impl ModelFiles {
    fn from_dir(dir: &Path) -> Result<Self, EmbeddingError> {
        if !dir.is_dir() {
            return Err(EmbeddingError::ModelLoadFailed {
                reason: format!("Model directory not found: {}", dir.display()),
            });
        }
        let require = |name: &str| {
            let path = dir.join(name);
            if path.is_file() {
                Ok(path)
            } else {
                Err(EmbeddingError::ModelLoadFailed {
                    reason: format!("Missing {name} in {}", dir.display()),
                })
            }
        };
        Ok(Self {
            config: require(CONFIG_FILE)?,
            tokenizer: require(TOKENIZER_FILE)?,
            weights: require(WEIGHTS_FILE)?,
        })
    }

    fn from_hub(model_id: &str, revision: &str) -> Result<Self, EmbeddingError> {
        let hub_err = |e: hf_hub::api::sync::ApiError| EmbeddingError::ModelLoadFailed {
            reason: format!("Hugging Face hub error for {model_id}@{revision}: {e}"),
        };
        let api = Api::new().map_err(hub_err)?;
        let repo = api.repo(Repo::with_revision(
            model_id.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));
        Ok(Self {
            config: repo.get(CONFIG_FILE).map_err(hub_err)?,
            tokenizer: repo.get(TOKENIZER_FILE).map_err(hub_err)?,
            weights: repo.get(WEIGHTS_FILE).map_err(hub_err)?,
        })
    }
}

/// all-MiniLM-L6-v2 sentence embeddings: BERT forward pass, attention-masked mean
/// pooling, L2 normalisation.
pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimensions: usize,
    label: String,
}

impl std::fmt::Debug for MiniLmEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniLmEmbedder")
            .field("label", &self.label)
            .field("dimensions", &self.dimensions)
            .field("device", &format!("{:?}", self.device))
            .finish()
    }
}

impl MiniLmEmbedder {
    pub fn load(source: &ModelSource) -> Result<Self, EmbeddingError> {
        let (files, label) = match source {
            ModelSource::Local(dir) => (ModelFiles::from_dir(dir)?, dir.display().to_string()),
            ModelSource::Hub { model_id, revision } => {
                info!(
                    model_id = %model_id,
                    revision = %revision,
                    "Fetching embedding model from the hub"
                );
                (ModelFiles::from_hub(model_id, revision)?, model_id.clone())
            }
        };

        let load_err = |what: &str, e: &dyn std::fmt::Display| EmbeddingError::ModelLoadFailed {
            reason: format!("Failed to load {what}: {e}"),
        };

        let config_text =
            std::fs::read_to_string(&files.config).map_err(|e| load_err(CONFIG_FILE, &e))?;
        let config: BertConfig =
            serde_json::from_str(&config_text).map_err(|e| load_err(CONFIG_FILE, &e))?;
        let dimensions = serde_json::from_str::<serde_json::Value>(&config_text)
            .ok()
            .and_then(|v| v.get("hidden_size").and_then(|h| h.as_u64()))
            .ok_or_else(|| load_err(CONFIG_FILE, &"hidden_size missing"))?
            as usize;

        let mut tokenizer =
            Tokenizer::from_file(&files.tokenizer).map_err(|e| load_err(TOKENIZER_FILE, &e))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| load_err(TOKENIZER_FILE, &e))?;

        let device = Device::Cpu;
        let weights = std::fs::read(&files.weights).map_err(|e| load_err(WEIGHTS_FILE, &e))?;
        let vb = VarBuilder::from_buffered_safetensors(weights, DTYPE, &device)
            .map_err(|e| load_err(WEIGHTS_FILE, &e))?;
        let model = BertModel::load(vb, &config).map_err(|e| load_err("BERT model", &e))?;

        info!(model = %label, dimensions, "Embedding model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            dimensions,
            label,
        })
    }
}

impl Embedder for MiniLmEmbedder {
    fn name(&self) -> &str {
        &self.label
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let encoding =
            self.tokenizer
                .encode(text, true)
                .map_err(|e| EmbeddingError::TokenizationFailed {
                    reason: e.to_string(),
                })?;

        let token_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let type_ids = token_ids.zeros_like()?;
        let attention_mask =
            Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        // (1, tokens, hidden)
        let hidden = self
            .model
            .forward(&token_ids, &type_ids, Some(&attention_mask))?;

        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = hidden.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?;
        let pooled = summed.broadcast_div(&counts)?.squeeze(0)?;

        debug!(tokens = encoding.get_ids().len(), "Embedded text");

        Ok(l2_normalize(pooled.to_vec1::<f32>()?))
    }
}

/// Bag-of-words feature hashing into a fixed number of buckets.
///
/// Lowercased alphanumeric tokens are hashed with FNV-1a; the count vector is
/// L2-normalised. Texts sharing vocabulary score high, paraphrases do not.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        "hash"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0_f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = fnv1a(token.to_lowercase().as_bytes()) % self.dimensions as u64;
            vector[bucket as usize] += 1.0;
        }
        Ok(l2_normalize(vector))
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(PRIME))
}

/// Zero vectors are returned unchanged.
fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
    v
}

/// Builds the process-wide embedder selected by configuration.
pub fn create_embedder(config: &Config) -> anyhow::Result<Arc<dyn Embedder>> {
    match config.embedding_backend {
        EmbeddingBackend::Hash => {
            info!(
                dimensions = config.hash_embedding_dimensions,
                "Using hash embedder (no model weights)"
            );
            Ok(Arc::new(HashEmbedder::new(config.hash_embedding_dimensions)))
        }
        EmbeddingBackend::MiniLm => {
            let source = match &config.embedding_model_dir {
                Some(dir) => ModelSource::Local(dir.clone()),
                None => ModelSource::Hub {
                    model_id: config.embedding_model.clone(),
                    revision: config.embedding_revision.clone(),
                },
            };
            Ok(Arc::new(MiniLmEmbedder::load(&source)?))
        }
    }
}
