//! HTTP surface. Every request ticks the scheduler before it is routed, so
//! scheduled report runs fire as a side effect of traffic, never from a
//! background task.

use std::sync::Arc;

use axum::extract::State;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;

pub mod handlers;
pub mod scheduler;
pub mod state;

pub use scheduler::Scheduler;
pub use state::AppState;

async fn tick_scheduler(
    State(state): State<Arc<AppState>>,
    request: axum::extract::Request,
    next: Next,
) -> Response {
    state.scheduler.tick().await;
    next.run(request).await
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/crawl", post(handlers::crawl))
        .route("/api/analyze", post(handlers::analyze))
        .route("/api/report", post(handlers::report))
        .route("/api/profiles", get(handlers::list_profiles))
        .route("/api/profiles", post(handlers::save_profile))
        .route("/api/profiles/:name", delete(handlers::delete_profile))
        .route("/api/schedule", get(handlers::get_schedule))
        .route("/api/schedule", put(handlers::put_schedule))
        .route("/api/schedule", delete(handlers::delete_schedule))
        .route("/api/clause", get(handlers::get_clause))
        .route("/api/document", get(handlers::get_document))
        .route("/api/document", put(handlers::put_document))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            tick_scheduler,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(addr: &str, state: Arc<AppState>) -> ti_core::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app)
        .await
        .map_err(ti_core::Error::Io)?;
    Ok(())
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState, Scheduler};
}
