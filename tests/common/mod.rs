//! Shared helpers for integration tests. Import with `mod common;`.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use training_registry::settings::DEFAULT_BODY_LIMIT;
use training_registry::{app, AppState};

/// Router over a fresh in-memory store.
pub fn test_app() -> Router {
    app(AppState::in_memory(), DEFAULT_BODY_LIMIT)
}

pub async fn send_with(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send_with(app, method, uri, body, &[]).await
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

pub async fn post(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PUT, uri, Some(body)).await
}

pub fn id_of(v: &Value) -> String {
    v["id"].as_str().expect("response has an id").to_string()
}

pub fn college_body(name: &str, accreditation: &str) -> Value {
    json!({
        "collegeName": name,
        "address": {"street": "1 College Rd", "city": "Pune", "state": "Maharashtra", "pincode": "411001"},
        "contactEmail": "admin@college.edu",
        "contactPhone": "9876543210",
        "accreditationNumber": accreditation,
        "establishedYear": 1990
    })
}

pub fn student_body(college_id: &str, email: &str, enrollment_number: &str) -> Value {
    json!({
        "firstName": "John",
        "lastName": "Doe",
        "email": email,
        "phone": "1234567890",
        "dateOfBirth": "2000-01-01",
        "collegeId": college_id,
        "enrollmentNumber": enrollment_number,
        "address": {"street": "123 Test St", "city": "Pune", "state": "Maharashtra", "pincode": "411001"},
        "emergencyContact": {"name": "Jane Doe", "relationship": "Mother", "phone": "9876543210"}
    })
}

pub fn program_body(name: &str, code: &str) -> Value {
    json!({
        "programName": name,
        "programCode": code,
        "description": "Hands-on clinical training",
        "startDate": "2024-01-01",
        "endDate": "2024-12-31",
        "fees": {"amount": 45000},
        "classroomPhase": {"location": "Main Campus"}
    })
}

pub fn doctor_body(email: &str, license: &str, specialization: &str, senior: bool) -> Value {
    json!({
        "firstName": "Asha",
        "lastName": "Rao",
        "email": email,
        "phone": "9876543210",
        "specialization": specialization,
        "experience": 10,
        "isSeniorDoctor": senior,
        "licenseNumber": license,
        "qualifications": [{"degree": "MBBS", "institution": "AIIMS", "year": 2010}]
    })
}

pub fn hospital_body(name: &str) -> Value {
    json!({
        "facilityName": name,
        "zoneName": "Zone 1",
        "wardName": "Kasba",
        "zoneNo": 1,
        "wardNo": 15,
        "type": "Hospital",
        "class": "Public",
        "totalBeds": 120
    })
}

pub fn enrollment_body(program_id: &str) -> Value {
    json!({
        "programId": program_id,
        "classroomStartDate": "2024-02-01",
        "classroomEndDate": "2024-05-31"
    })
}

/// A college, a student in it, and a program; returns (student id, program id).
pub async fn seed_student_and_program(app: &Router) -> (String, String) {
    let (status, college) = post(app, "/api/colleges", college_body("Test Medical College", "ACC-001")).await;
    assert_eq!(status, StatusCode::OK, "{}", college);
    let (status, student) = post(
        app,
        "/api/students",
        student_body(&id_of(&college), "john@test.com", "EN001"),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", student);
    let (status, program) = post(app, "/api/programs", program_body("General Surgery", "GS-01")).await;
    assert_eq!(status, StatusCode::OK, "{}", program);
    (id_of(&student), id_of(&program))
}

/// Issue a certificate and return its JSON view.
pub async fn issue(app: &Router, student_id: &str, program_id: &str, extra: Value) -> Value {
    let mut body = json!({
        "studentId": student_id,
        "programId": program_id,
        "grade": "A",
        "finalScore": 85
    });
    if let (Some(obj), Value::Object(more)) = (body.as_object_mut(), extra) {
        obj.extend(more);
    }
    let (status, cert) = post(app, "/api/certificates", body).await;
    assert_eq!(status, StatusCode::OK, "{}", cert);
    cert
}

pub fn log_body() -> Value {
    json!({
        "validatorName": "HR Manager",
        "validatorEmail": "hr@company.com",
        "validatorOrganization": "Test Company",
        "validationPurpose": "Employment Verification",
        "additionalNotes": "Verification for job application"
    })
}
