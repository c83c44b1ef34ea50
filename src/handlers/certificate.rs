//! Certificate handlers: issue, list, read, validate, log validation, revoke.

use super::{parse_id, typed_body};
use crate::error::AppError;
use crate::extractors::Origin;
use crate::model::common::bool_param;
use crate::model::{CertificateFilter, CertificateStatus, IssueCertificate, LogValidation, RevokeCertificate};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use uuid::Uuid;

const NOT_FOUND: &str = "Certificate not found";

fn id_param(params: &HashMap<String, String>, key: &str) -> Result<Option<Uuid>, AppError> {
    match params.get(key).map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{} must be a UUID", key))),
        None => Ok(None),
    }
}

pub async fn issue(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let req: IssueCertificate = typed_body(body)?;
    let cert = state.certificates.issue(req).await?;
    Ok(Json(state.certificates.view(&cert).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Value>>, AppError> {
    let filter = CertificateFilter {
        student_id: id_param(&params, "studentId")?,
        program_id: id_param(&params, "programId")?,
        is_valid: bool_param(&params, "isValid"),
    };
    let certs = state.certificates.list(&filter).await?;
    Ok(Json(state.certificates.views(&certs).await?))
}

pub async fn read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let cert = state.certificates.get(id).await?;
    Ok(Json(state.certificates.view(&cert).await?))
}

/// Unknown numbers get `{valid:false}` rather than the usual error body so
/// verifiers can treat every answer the same way.
pub async fn validate(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Response, AppError> {
    let outcome = match state.certificates.validate(&number).await {
        Ok(outcome) => outcome,
        Err(AppError::NotFound(message)) => {
            return Ok((
                StatusCode::NOT_FOUND,
                Json(json!({"valid": false, "message": message})),
            )
                .into_response());
        }
        Err(e) => return Err(e),
    };
    Ok(Json(json!({
        "valid": outcome.status == CertificateStatus::Valid,
        "validationResult": outcome.status,
        "message": outcome.message,
        "certificate": outcome.summary,
    }))
    .into_response())
}

pub async fn log_validation(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Origin(origin): Origin,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let body: LogValidation = typed_body(body)?;
    let entry = state.certificates.log_validation(&number, body, origin).await?;
    Ok(Json(json!({
        "message": "Validation logged successfully",
        "validationResult": entry.validation_result,
        "validationId": entry.id,
    })))
}

pub async fn list_validations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id, NOT_FOUND)?;
    Ok(Json(state.certificates.list_validations(id).await?))
}

pub async fn revoke(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, NOT_FOUND)?;
    let req: RevokeCertificate = typed_body(body)?;
    let cert = state.certificates.revoke(id, req).await?;
    Ok(Json(json!({
        "message": "Certificate revoked successfully",
        "certificate": state.certificates.view(&cert).await?,
    })))
}
