//! HTTP route assembly.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::catalog::{self, TaskManifest};
use crate::config::Config;
use crate::segment::service::Segmenter;
use crate::store::{create_review_store, ReviewStore};
use crate::upload::GithubUploader;

use super::{questionnaires, segmentation, tasks, upload};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// The task manifest, loaded once at startup.
    pub manifest: TaskManifest,
    /// Derives and persists the current segmentation.
    pub segmenter: Segmenter,
    /// Record + segmentation storage backend.
    pub store: Box<dyn ReviewStore>,
    /// Upload client; `None` when no GitHub target is configured.
    pub uploader: Option<GithubUploader>,
}

/// Build the router for an already-assembled state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/tasks", tasks::routes())
        .nest("/api/segmentation", segmentation::routes())
        .nest("/api/questionnaires", questionnaires::routes())
        .nest("/api/upload", upload::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let manifest = catalog::load_manifest(&config.manifest_path)?;
    tracing::info!(
        "Loaded {} tasks from {}",
        manifest.len(),
        config.manifest_path.display()
    );

    let store = create_review_store(config.store_type, config.data_dir.clone())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize review store: {}", e))?;

    let uploader = match config.upload.clone() {
        Some(upload_config) => {
            tracing::info!(
                "Uploads enabled: {}/{} ({})",
                upload_config.owner,
                upload_config.repo,
                upload_config.storage_path
            );
            Some(GithubUploader::new(upload_config))
        }
        None => {
            tracing::info!("Uploads disabled (no GITHUB_TOKEN configured)");
            None
        }
    };

    let segmenter = Segmenter::new(config.parts_count);

    let addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState {
        config,
        manifest,
        segmenter,
        store,
        uploader,
    });

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}
