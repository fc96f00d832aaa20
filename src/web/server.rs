use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::tracker::LiveTracker;

use super::api::tracker as tracker_handlers;
use super::api_doc::ApiDoc;
use super::ui::handlers as ui_handlers;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<Mutex<LiveTracker>>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // UI routes
        .route("/", get(ui_handlers::dashboard))
        .route("/toggle", post(ui_handlers::toggle))
        // Tracker API endpoints
        .route("/api/tracker/toggle", post(tracker_handlers::toggle))
        .route("/api/tracker/start", post(tracker_handlers::start))
        .route("/api/tracker/stop", post(tracker_handlers::stop))
        .route("/api/tracker/status", get(tracker_handlers::status))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(tracker: LiveTracker, bind_addr: &str) -> std::io::Result<()> {
    let state = AppState {
        tracker: Arc::new(Mutex::new(tracker)),
    };
    let app = router(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await
}
