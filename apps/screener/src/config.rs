use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::screening::embedding::DEFAULT_MODEL_ID;
use crate::screening::ranker::{ScreeningPolicy, DEFAULT_MIN_JD_CHARS, DEFAULT_TOP_N};

/// Which sentence-embedding backend the process loads at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    MiniLm,
    Hash,
}

impl FromStr for EmbeddingBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minilm" => Ok(EmbeddingBackend::MiniLm),
            "hash" => Ok(EmbeddingBackend::Hash),
            other => bail!("unknown embedding backend '{other}' (expected 'minilm' or 'hash')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_revision: String,
    pub embedding_model_dir: Option<PathBuf>,
    pub hash_embedding_dimensions: usize,
    pub min_jd_chars: usize,
    pub top_n: usize,
    pub max_upload_bytes: usize,
    pub max_concurrent_analyses: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Config {
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            embedding_backend: parse_or(&lookup, "EMBEDDING_BACKEND", EmbeddingBackend::MiniLm)?,
            embedding_model: lookup("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            embedding_revision: lookup("EMBEDDING_REVISION").unwrap_or_else(|| "main".to_string()),
            embedding_model_dir: lookup("EMBEDDING_MODEL_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            hash_embedding_dimensions: parse_or(&lookup, "HASH_EMBEDDING_DIMENSIONS", 384)?,
            min_jd_chars: parse_or(&lookup, "MIN_JD_CHARS", DEFAULT_MIN_JD_CHARS)?,
            top_n: parse_or(&lookup, "TOP_N", DEFAULT_TOP_N)?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 25 * 1024 * 1024)?,
            max_concurrent_analyses: parse_or(&lookup, "MAX_CONCURRENT_ANALYSES", 4)?,
        };

        if config.hash_embedding_dimensions == 0 {
            bail!("HASH_EMBEDDING_DIMENSIONS must be greater than zero");
        }
        if config.max_concurrent_analyses == 0 {
            bail!("MAX_CONCURRENT_ANALYSES must be greater than zero");
        }

        Ok(config)
    }

    pub fn screening_policy(&self) -> ScreeningPolicy {
        ScreeningPolicy {
            min_jd_chars: self.min_jd_chars,
            top_n: self.top_n,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
