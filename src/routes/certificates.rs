use crate::handlers::certificate::{issue, list, list_validations, log_validation, read, revoke, validate};
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};

/// Mounted at `/certificates`.
pub fn certificate_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(issue))
        .route("/validate/:certificate_number", get(validate))
        .route("/validate/:certificate_number/log", post(log_validation))
        .route("/:id", get(read))
        .route("/:id/validations", get(list_validations))
        .route("/:id/revoke", put(revoke))
}
