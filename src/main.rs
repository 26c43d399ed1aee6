//! Generative-UI shopping assistant
//!
//! Relays a remote reasoning pipeline's event feed to the browser as a
//! streaming chat transcript plus a rich display pane of product views.

mod aggregator;
mod api;
mod carousel;
mod catalog;
mod config;
mod db;
mod feed;
mod orchestrator;
mod profile;
mod render;
mod session;
mod stream;

use api::{create_router, AppState};
use carousel::CarouselHandle;
use catalog::Catalog;
use config::AppConfig;
use db::Database;
use feed::RemotePipeline;
use orchestrator::Orchestrator;
use profile::ProfileStore;
use render::{FieldPresentation, ToolRenderers};
use session::ChatSession;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn field_presentation(config: &AppConfig) -> FieldPresentation {
    let Some(path) = &config.fields_path else {
        return FieldPresentation::for_product_type(&config.product_type);
    };
    match FieldPresentation::load(path) {
        Ok(fields) => fields,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to load field table, using built-in");
            FieldPresentation::for_product_type(&config.product_type)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genui_assistant=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = AppConfig::from_env();

    tracing::info!(path = %config.db_path.display(), "Opening database");
    let db = Database::open(&config.db_path)?;

    let catalog = Catalog::new(&config.data_dir);
    let pipeline = Arc::new(RemotePipeline::new(config.pipeline_url.clone()));
    tracing::info!(url = %config.pipeline_url, product_type = %config.product_type, "Pipeline configured");

    let orchestrator = Orchestrator::new(pipeline, ToolRenderers::new(field_presentation(&config)));
    let carousel = CarouselHandle::spawn(0, config.carousel);
    let session = ChatSession::new(orchestrator, db, catalog, config.product_type.clone(), carousel);
    session.refresh_catalog().await;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let profiles = ProfileStore::new(&config.data_dir, config.user_profile.clone());
    tracing::info!(profile = %profiles.current(), "User profile selected");

    let app = create_router(AppState::new(session, profiles)).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(compression),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Shopping assistant listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
