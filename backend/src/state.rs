//! Shared application state, injected into handlers as `web::Data`.

use crate::config::AppConfig;
use crate::synthesis::Completion;
use std::sync::Arc;

/// Built once in `main` and cloned per worker. Requests share only this
/// read-only configuration and the completion client; there is no
/// cross-request mutable state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub model: Arc<dyn Completion>,
}
