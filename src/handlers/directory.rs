//! Reference-data handlers. The CRUD handlers are generic over the document
//! type; routes pick the type, e.g. `get(read::<College>)`.

use super::parse_id;
use crate::error::AppError;
use crate::model::{College, Doctor, DoctorHospitalAssignment, Document, Student, StudentEnrollment};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

pub async fn create<D: Document>(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let doc: D = state.directory.create(body).await?;
    Ok(Json(state.directory.view(&doc).await?))
}

pub async fn list<D: Document>(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Value>>, AppError> {
    let docs: Vec<D> = state.directory.list(&params).await?;
    Ok(Json(state.directory.views(&docs).await?))
}

pub async fn read<D: Document>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, D::NOT_FOUND)?;
    let doc: D = state.directory.get(id).await?;
    Ok(Json(state.directory.view(&doc).await?))
}

pub async fn update<D: Document>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, D::NOT_FOUND)?;
    let doc: D = state.directory.update(id, body).await?;
    Ok(Json(state.directory.view(&doc).await?))
}

/// Copy the allowed fields of `body` and set `owner_field` to the path id.
fn child_body(body: Value, owner_field: &str, owner: Uuid, allowed: &[&str]) -> Result<Value, AppError> {
    let Value::Object(mut fields) = body else {
        return Err(AppError::BadRequest("request body must be a JSON object".into()));
    };
    let mut out = Map::new();
    for key in allowed {
        if let Some(v) = fields.remove(*key) {
            out.insert((*key).to_string(), v);
        }
    }
    out.insert(owner_field.to_string(), Value::String(owner.to_string()));
    Ok(Value::Object(out))
}

fn owned_by(field: &str, owner: Uuid) -> Map<String, Value> {
    let mut filter = Map::new();
    filter.insert(field.to_string(), Value::String(owner.to_string()));
    filter
}

/// GET /colleges/:id/students
pub async fn college_students(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Student>>, AppError> {
    let id = parse_id(&id, College::NOT_FOUND)?;
    Ok(Json(state.directory.list_where(&owned_by("collegeId", id)).await?))
}

/// POST /students/:id/enroll
pub async fn enroll(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, Student::NOT_FOUND)?;
    let _student: Student = state.directory.get(id).await?;
    let body = child_body(
        body,
        "studentId",
        id,
        &["programId", "classroomStartDate", "classroomEndDate"],
    )?;
    let enrollment: StudentEnrollment = state.directory.create(body).await?;
    Ok(Json(state.directory.view(&enrollment).await?))
}

/// GET /students/:id/enrollments
pub async fn enrollments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Value>>, AppError> {
    let id = parse_id(&id, Student::NOT_FOUND)?;
    let docs: Vec<StudentEnrollment> = state.directory.list_where(&owned_by("studentId", id)).await?;
    Ok(Json(state.directory.views(&docs).await?))
}

/// POST /doctors/:id/assign-hospital
pub async fn assign_hospital(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    let id = parse_id(&id, Doctor::NOT_FOUND)?;
    let _doctor: Doctor = state.directory.get(id).await?;
    let body = child_body(
        body,
        "doctorId",
        id,
        &["hospitalId", "department", "position", "workingHours", "workingDays"],
    )?;
    let assignment: DoctorHospitalAssignment = state.directory.create(body).await?;
    Ok(Json(state.directory.view(&assignment).await?))
}

/// GET /doctors/:id/hospitals: active assignments with the hospital expanded.
pub async fn doctor_hospitals(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Value>>, AppError> {
    let id = parse_id(&id, Doctor::NOT_FOUND)?;
    let mut filter = owned_by("doctorId", id);
    filter.insert("isActive".into(), Value::Bool(true));
    let docs: Vec<DoctorHospitalAssignment> = state.directory.list_where(&filter).await?;
    Ok(Json(state.directory.views(&docs).await?))
}
