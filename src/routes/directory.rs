//! Reference-data routes. Each collection gets the generic handlers for its
//! document type plus any collection-specific sub-resources.

use crate::handlers::directory::{
    assign_hospital, college_students, create, doctor_hospitals, enroll, enrollments, list, read, update,
};
use crate::model::{College, Doctor, Hospital, Student, TrainingProgram};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};

pub fn college_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<College>).post(create::<College>))
        .route("/:id", get(read::<College>).put(update::<College>))
        .route("/:id/students", get(college_students))
}

pub fn student_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<Student>).post(create::<Student>))
        .route("/:id", get(read::<Student>).put(update::<Student>))
        .route("/:id/enroll", post(enroll))
        .route("/:id/enrollments", get(enrollments))
}

pub fn doctor_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<Doctor>).post(create::<Doctor>))
        .route("/:id", get(read::<Doctor>).put(update::<Doctor>))
        .route("/:id/assign-hospital", post(assign_hospital))
        .route("/:id/hospitals", get(doctor_hospitals))
}

pub fn hospital_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<Hospital>).post(create::<Hospital>))
        .route("/:id", get(read::<Hospital>))
}

pub fn program_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<TrainingProgram>).post(create::<TrainingProgram>))
        .route("/:id", get(read::<TrainingProgram>).put(update::<TrainingProgram>))
}
