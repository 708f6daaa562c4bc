use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;

pub const INDEX_PAGE: &str = "app.html";

pub async fn handler_index(State(state): State<AppState>) -> Response {
    let page = state.static_dir.join(INDEX_PAGE);
    match tokio::fs::read_to_string(&page).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            log::warn!("Cannot serve {}: {e}", page.display());
            (StatusCode::NOT_FOUND, "Page not found").into_response()
        }
    }
}

pub async fn handler_favicon() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn handler_health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model_loaded": state.use_case.artifacts().is_loaded(),
    }))
}
