//! The `/ws` upgrade endpoint. Performs the handshake ourselves and hands
//! the raw post-upgrade duplex stream to [`crate::ws::WsHub`].

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use hyper_util::rt::TokioIo;

use crate::state::AppState;
use crate::ws::handshake;

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}

async fn upgrade(State(state): State<AppState>, mut req: Request) -> Response {
    if !handshake::is_upgrade_request(req.headers()) {
        return (StatusCode::BAD_REQUEST, "expected a websocket upgrade").into_response();
    }
    let Some(key) = req
        .headers()
        .get("sec-websocket-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
    else {
        return (StatusCode::BAD_REQUEST, "missing Sec-WebSocket-Key").into_response();
    };

    let accept = handshake::accept_key(&key);
    let hub = state.ws_hub.clone();
    let on_upgrade = hyper::upgrade::on(&mut req);

    tokio::spawn(async move {
        match on_upgrade.await {
            Ok(upgraded) => {
                let io = TokioIo::new(upgraded);
                hub.handle_connection(io).await;
            }
            Err(error) => {
                tracing::warn!(%error, "websocket upgrade failed");
            }
        }
    });

    Response::builder()
        .status(StatusCode::SWITCHING_PROTOCOLS)
        .header(header::CONNECTION, "Upgrade")
        .header(header::UPGRADE, "websocket")
        .header("Sec-WebSocket-Accept", accept)
        .body(Body::empty())
        .expect("static response is well-formed")
}
