//! Router composition: merges each route module's sub-router, attaches
//! shared state, and layers CORS/tracing on top.

use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::state::AppState;

const INDEX_HTML: &str = include_str!("static/index.html");

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .merge(routes::processes::router())
        .merge(routes::workspaces::router())
        .merge(routes::queue::router())
        .merge(routes::stats::router())
        .merge(routes::health::router())
        .merge(routes::ws::router())
        .fallback(fallback)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn fallback(uri: Uri) -> impl IntoResponse {
    if uri.path().starts_with("/api/") {
        (
            StatusCode::NOT_FOUND,
            axum::Json(serde_json::json!({ "error": format!("no route for {}", uri.path()) })),
        )
            .into_response()
    } else {
        Html(INDEX_HTML).into_response()
    }
}
