//! Application state
//!
//! Holds the shared state for the Axum application: the interaction
//! dispatcher (and through it the lifecycle controller), configuration,
//! and the database pool when one is in use.

use std::sync::Arc;

use ticket_common::AppConfig;
use ticket_db::PgPool;
use ticket_service::{InteractionDispatcher, LifecycleController};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<InteractionDispatcher>,
    config: Arc<AppConfig>,
    /// `None` when running on in-memory repositories
    pool: Option<PgPool>,
}

impl AppState {
    pub fn new(
        dispatcher: impl Into<Arc<InteractionDispatcher>>,
        config: AppConfig,
        pool: Option<PgPool>,
    ) -> Self {
        Self {
            dispatcher: dispatcher.into(),
            config: Arc::new(config),
            pool,
        }
    }

    pub fn dispatcher(&self) -> &InteractionDispatcher {
        &self.dispatcher
    }

    /// Shared handle for background tasks
    pub fn dispatcher_handle(&self) -> Arc<InteractionDispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn controller(&self) -> &Arc<LifecycleController> {
        self.dispatcher.controller()
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn pool(&self) -> Option<&PgPool> {
        self.pool.as_ref()
    }

    /// Shared secret expected from the interaction forwarder
    pub fn interaction_token(&self) -> &str {
        &self.config.platform.interaction_token
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("dispatcher", &"InteractionDispatcher")
            .field("config", &"AppConfig")
            .field("pool", &self.pool.is_some())
            .finish()
    }
}
