use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::tracker::{LocationData, LocationEnvelope, LocationRequest};

use super::route::Route;

const NOT_FOUND: i64 = 404;

pub fn router(route: Arc<Route>) -> Router {
    Router::new()
        .route("/api/getVehicleLocation", post(get_vehicle_location))
        .layer(TraceLayer::new_for_http())
        .with_state(route)
}

/// Serves one recorded point per page. Missing pages are reported in
/// `responseCode`, not the HTTP status.
async fn get_vehicle_location(
    State(route): State<Arc<Route>>,
    Json(request): Json<LocationRequest>,
) -> Json<LocationEnvelope<LocationData>> {
    let envelope = match route.page(&request.vehicle_id, request.page_no) {
        Some([longitude, latitude]) => LocationEnvelope {
            response_code: 200,
            response_data: Some(LocationData::new(
                longitude,
                latitude,
                Some(route.len(&request.vehicle_id)),
            )),
        },
        None => {
            log::debug!(
                "No page {} for vehicle '{}'",
                request.page_no,
                request.vehicle_id
            );
            LocationEnvelope {
                response_code: NOT_FOUND,
                response_data: None,
            }
        }
    };
    Json(envelope)
}

pub async fn run_replay(route: Route, bind_addr: &str) -> std::io::Result<()> {
    let vehicles = route.vehicles.len();
    let app = router(Arc::new(route));

    log::info!(
        "Replaying {} vehicle route(s) on {}",
        vehicles,
        bind_addr
    );

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await
}
