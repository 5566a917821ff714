//! DSA Roadmap Tracker Backend
//!
//! REST backend with SQLite persistence, LeetCode metadata lookup and a JSON
//! snapshot that is synced into the database at startup.

mod api;
mod config;
mod db;
mod errors;
mod export;
mod import;
mod metadata;
mod models;
mod sync;

use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use export::{ChangeNotifier, SnapshotExporter};
use metadata::{LeetCodeClient, MetadataFetcher};
use sync::{FixedDelay, NoDelay, Reconciler, Throttle};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub fetcher: Arc<dyn MetadataFetcher>,
    pub exporter: Arc<SnapshotExporter>,
    pub changes: ChangeNotifier,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let json_layer = config
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json());
    let text_layer = (!config.log_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    tracing::info!("Starting DSA Roadmap Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Snapshot path: {:?}", config.snapshot_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    let fetcher: Arc<dyn MetadataFetcher> =
        Arc::new(LeetCodeClient::new(config.metadata_endpoint.clone())?);

    // Sync the snapshot before accepting any requests
    if let Some(snapshot) = sync::load_snapshot(&config.snapshot_path).await {
        tracing::info!("Syncing {} topics from snapshot...", snapshot.len());
        let throttle: Arc<dyn Throttle> = if config.sync_delay.is_zero() {
            Arc::new(NoDelay)
        } else {
            Arc::new(FixedDelay(config.sync_delay))
        };
        let reconciler = Reconciler::new(repo.clone(), fetcher.clone(), throttle);
        let report = reconciler.run(&snapshot).await;
        tracing::info!("Snapshot sync created {} rows", report.rows_created());
    }

    let counts = repo.count_rows().await?;
    tracing::info!(
        "Store holds {} topics, {} subtopics, {} problems",
        counts.topics,
        counts.subtopics,
        counts.problems
    );

    let exporter = Arc::new(SnapshotExporter::new(
        repo.clone(),
        config.snapshot_path.clone(),
    ));

    let changes = if config.auto_export {
        let (notifier, rx) = ChangeNotifier::channel();
        tokio::spawn(export::run_auto_export(exporter.clone(), rx));
        notifier
    } else {
        tracing::info!("Auto-export disabled (DSA_AUTO_EXPORT)");
        ChangeNotifier::disabled()
    };

    // Create application state
    let state = AppState {
        repo,
        fetcher,
        exporter,
        changes,
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Topics
        .route("/topics", get(api::list_topics).post(api::create_topic))
        .route("/topics/{id}", delete(api::delete_topic))
        .route("/topics/{id}/subtopics", get(api::list_subtopics))
        // Subtopics
        .route("/subtopics", post(api::create_subtopic))
        .route("/subtopics/{id}", delete(api::delete_subtopic))
        .route("/subtopics/{id}/problems", get(api::list_problems))
        .route("/subtopics/{id}/stats", get(api::subtopic_stats))
        // Problems
        .route("/problems", post(api::create_problem))
        .route("/problems/bulk", post(api::bulk_import_problems))
        .route("/problems/{id}", delete(api::delete_problem))
        .route("/problems/{id}/done", patch(api::toggle_done))
        .route("/problems/{id}/bookmark", patch(api::toggle_bookmark))
        .route("/problems/{id}/code", patch(api::update_code))
        .route("/bookmarks", get(api::list_bookmarks))
        // Metadata provider
        .route("/metadata/fetch", post(api::fetch_metadata))
        // Snapshot
        .route("/export", get(api::get_export))
        .route("/export/save", post(api::save_export));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
