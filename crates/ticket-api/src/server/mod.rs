//! Server setup and initialization
//!
//! Provides the application builder, dependency wiring and the server runner.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ticket_common::{AppConfig, AppError};
use ticket_db::{create_pool, run_migrations, PgSettingsRepository, PgTicketRepository};
use ticket_service::{InteractionDispatcher, LifecycleController, ServiceContextBuilder};

use crate::middleware::apply_middleware;
use crate::platform::RestPlatform;
use crate::routes::create_router;
use crate::state::AppState;

const MIGRATIONS_DIR: &str = "./migrations";

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let router = create_router();
    let router = apply_middleware(router);
    router.with_state(state)
}

/// Initialize all dependencies and create AppState
///
/// Active tickets found in the store get their controls and watchers back
/// before the first request is served.
pub async fn create_app_state(config: AppConfig) -> Result<AppState, AppError> {
    info!("Connecting to PostgreSQL...");
    let db_config = ticket_db::DatabaseConfig::from(&config.database);
    let pool = create_pool(&db_config)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    run_migrations(&pool, MIGRATIONS_DIR)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    let platform = RestPlatform::new(&config.platform)?;

    let context = ServiceContextBuilder::new()
        .ticket_repo(Arc::new(PgTicketRepository::new(pool.clone())))
        .settings_repo(Arc::new(PgSettingsRepository::new(pool.clone())))
        .platform(Arc::new(platform))
        .bot_user_id(config.platform.bot_user_id)
        .timings(config.tickets)
        .build()
        .map_err(|e| AppError::Config(e.to_string()))?;

    let controller = Arc::new(LifecycleController::new(context));
    let restored = controller.restore().await.map_err(AppError::from)?;
    info!(watchers = restored, "Ticket state restored");

    let dispatcher = InteractionDispatcher::new(controller);
    Ok(AppState::new(dispatcher, config, Some(pool)))
}

/// Periodically drop expired interaction keys and pending selections
pub fn spawn_housekeeping(state: &AppState, token: CancellationToken) {
    let dispatcher = state.dispatcher_handle();
    let period = state
        .config()
        .tickets
        .interaction_timeout
        .max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {
                    let now = dispatcher.controller().context().now();
                    let keys = dispatcher.controller().interactions().purge_expired(now);
                    let selections = dispatcher.setup().purge_expired();
                    if keys + selections > 0 {
                        debug!(keys, selections, "Purged expired interactions");
                    }
                }
            }
        }
    });
}

/// Run the HTTP server until `shutdown` resolves
pub async fn run_server<F>(app: Router, addr: SocketAddr, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .api
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid API address: {e}")))?;

    let state = create_app_state(config).await?;
    let controller = Arc::clone(state.controller());

    let token = CancellationToken::new();
    spawn_housekeeping(&state, token.clone());

    let app = create_app(state);
    let result = run_server(app, addr, shutdown_signal()).await;

    token.cancel();
    controller.shutdown();
    info!("Server stopped");
    result
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
