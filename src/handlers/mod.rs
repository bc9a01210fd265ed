pub mod health_handler;
pub mod identity;
pub mod oauth;
pub mod tooltip;

use axum::{
    Router,
    body::Body,
    http::Request,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{Span, info_span};

use crate::models::AppState;

pub use health_handler::health_handler;
pub use oauth::{callback_handler, command_handler, commands_handler};
pub use tooltip::tooltip_handler;

/// Request span carrying only method and path. The query string of
/// `/auth-callback` holds the OAuth code and state and stays out of the logs.
fn request_span(request: &Request<Body>) -> Span {
    info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path()
    )
}

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route("/tooltip", get(tooltip_handler))
        .route("/auth-callback", get(callback_handler))
        .route("/command", post(command_handler))
        .route("/commands", get(commands_handler))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .with_state(app_state)
}
