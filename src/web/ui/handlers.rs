use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
};

use crate::web::api::error::ApiResult;
use crate::web::server::AppState;

use super::templates::StatusTemplate;

pub async fn dashboard(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.tracker.lock().await.status();
    StatusTemplate::from(status)
}

pub async fn toggle(State(state): State<AppState>) -> ApiResult<Redirect> {
    state.tracker.lock().await.toggle().await?;
    Ok(Redirect::to("/"))
}
