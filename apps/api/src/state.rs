use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Immutable after startup; every request is an independent action.
#[derive(Clone)]
pub struct AppState {
    /// Model backend. `GeminiClient` in production.
    pub llm: Arc<dyn TextGenerator>,
    pub config: Config,
}
