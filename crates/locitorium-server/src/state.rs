//! Shared application state.

use locitorium_core::AppConfig;

/// State shared by all route handlers.
///
/// Only the base configuration lives here. Each request derives its own
/// configuration from it and builds fresh clients, so requests never share
/// mutable state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Configuration for one request, with an optional model override.
    pub fn request_config(&self, model: Option<&str>) -> AppConfig {
        match model.map(str::trim).filter(|m| !m.is_empty()) {
            Some(model) => self.config.clone().with_model(model),
            None => self.config.clone(),
        }
    }
}
