use std::sync::Arc;

use crate::config::Config;
use crate::screening::embedding::Embedder;
use crate::screening::ranker::ScreeningPolicy;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Loaded once at startup; read-only afterwards.
    pub embedder: Arc<dyn Embedder>,
    pub policy: ScreeningPolicy,
}

impl AppState {
    pub fn new(config: Config, embedder: Arc<dyn Embedder>) -> Self {
        let policy = config.screening_policy();
        Self {
            config,
            embedder,
            policy,
        }
    }
}
