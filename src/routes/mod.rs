//! Router assembly. Resource routes are mounted under `/api`; operational
//! routes sit at the root.

mod certificates;
mod common;
mod directory;

pub use certificates::certificate_routes;
pub use common::common_routes;
pub use directory::{college_routes, doctor_routes, hospital_routes, program_routes, student_routes};

use crate::state::AppState;
use axum::{extract::DefaultBodyLimit, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/certificates", certificate_routes())
        .nest("/colleges", college_routes())
        .nest("/students", student_routes())
        .nest("/doctors", doctor_routes())
        .nest("/hospitals", hospital_routes())
        .nest("/programs", program_routes())
}

/// The full application: routes, body limit, CORS and request tracing.
pub fn app(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .merge(common_routes())
        .nest("/api", api_routes())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
