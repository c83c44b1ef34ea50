mod common;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Duration, Utc};
use common::*;
use regex::Regex;
use serde_json::{json, Value};

fn validate_uri(cert: &Value) -> String {
    format!(
        "/api/certificates/validate/{}",
        cert["certificateNumber"].as_str().unwrap()
    )
}

fn yesterday() -> String {
    (Utc::now() - Duration::days(1)).to_rfc3339()
}

#[tokio::test]
async fn test_issue_generates_number_and_tokens() {
    let app = test_app();
    let (student, program) = seed_student_and_program(&app).await;
    let number = Regex::new(r"^CERT-[A-Z0-9]{8}$").unwrap();
    for _ in 0..5 {
        let cert = issue(&app, &student, &program, json!({})).await;
        assert!(number.is_match(cert["certificateNumber"].as_str().unwrap()), "{}", cert);
        assert!(!cert["digitalSignature"].as_str().unwrap().is_empty());
        assert!(!cert["qrCode"].as_str().unwrap().is_empty());
        assert_eq!(cert["isValid"], true);
        assert_eq!(cert["validationCount"], 0);
        assert_eq!(cert["certificateType"], "Completion");
        assert_eq!(cert["status"], "Valid");
        assert!(cert["revokedAt"].is_null());
        assert!(cert["revokedBy"].is_null());
        assert!(cert["revokeReason"].is_null());
        assert_eq!(cert["studentId"]["id"], student.as_str());
        assert_eq!(cert["programId"]["programName"], "General Surgery");
    }
}

#[tokio::test]
async fn test_issue_rejects_bad_input() {
    let app = test_app();
    let (student, program) = seed_student_and_program(&app).await;

    for bad in [
        json!({"studentId": student, "programId": program, "grade": "F", "finalScore": 50}),
        json!({"studentId": student, "programId": program, "grade": "A", "finalScore": 100.5}),
        json!({"studentId": student, "programId": program, "grade": "A", "finalScore": -1}),
        json!({"studentId": student, "programId": program, "grade": "A"}),
        json!({"studentId": student, "programId": program, "grade": "A", "finalScore": 70, "certificateType": "Honorary"}),
    ] {
        let (status, body) = post(&app, "/api/certificates", bad).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
        assert_eq!(body["error"]["code"], "validation_error");
    }

    let missing_student = json!({
        "studentId": uuid::Uuid::new_v4(),
        "programId": program,
        "grade": "A",
        "finalScore": 85
    });
    let (status, _) = post(&app, "/api/certificates", missing_student).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, list) = get(&app, "/api/certificates").await;
    assert_eq!(list.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_score_boundaries_accepted() {
    let app = test_app();
    let (student, program) = seed_student_and_program(&app).await;
    for score in [0, 100] {
        let cert = issue(&app, &student, &program, json!({"finalScore": score, "grade": "Pass"})).await;
        assert_eq!(cert["finalScore"], score as f64);
    }
}

#[tokio::test]
async fn test_end_to_end_issue_then_validate() {
    let app = test_app();
    let (student, program) = seed_student_and_program(&app).await;
    let cert = issue(&app, &student, &program, json!({})).await;

    let (status, body) = get(&app, &validate_uri(&cert)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["validationResult"], "Valid");
    assert_eq!(body["message"], "Certificate is valid");
    assert_eq!(body["certificate"]["grade"], "A");
    assert_eq!(body["certificate"]["finalScore"], 85.0);
    assert_eq!(body["certificate"]["studentName"], "John Doe");
    assert_eq!(body["certificate"]["programName"], "General Surgery");
    assert_eq!(body["certificate"]["certificateNumber"], cert["certificateNumber"]);
    assert_eq!(body["certificate"]["validationCount"], 1);

    let (_, again) = get(&app, &validate_uri(&cert)).await;
    assert_eq!(again["certificate"]["validationCount"], 2);

    let (_, stored) = get(&app, &format!("/api/certificates/{}", id_of(&cert))).await;
    assert_eq!(stored["validationCount"], 2);
}

#[tokio::test]
async fn test_validate_unknown_number_is_404_with_valid_false() {
    let app = test_app();
    let (status, body) = get(&app, "/api/certificates/validate/CERT-DEADBEEF").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"valid": false, "message": "Certificate not found"}));
}

#[tokio::test]
async fn test_validate_expired() {
    let app = test_app();
    let (student, program) = seed_student_and_program(&app).await;
    let cert = issue(&app, &student, &program, json!({"expiryDate": yesterday()})).await;
    assert_eq!(cert["status"], "Expired");

    let (status, body) = get(&app, &validate_uri(&cert)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(body["validationResult"], "Expired");
    assert!(body["message"].as_str().unwrap().starts_with("Certificate expired on"));
}

#[tokio::test]
async fn test_future_expiry_still_valid() {
    let app = test_app();
    let (student, program) = seed_student_and_program(&app).await;
    let next_year = (Utc::now() + Duration::days(365)).format("%Y-%m-%d").to_string();
    let cert = issue(&app, &student, &program, json!({"expiryDate": next_year})).await;
    let (_, body) = get(&app, &validate_uri(&cert)).await;
    assert_eq!(body["validationResult"], "Valid");
}

#[tokio::test]
async fn test_revoked_wins_over_expired() {
    let app = test_app();
    let (student, program) = seed_student_and_program(&app).await;
    let cert = issue(&app, &student, &program, json!({"expiryDate": yesterday()})).await;

    let revoke_uri = format!("/api/certificates/{}/revoke", id_of(&cert));
    let (status, body) = put(
        &app,
        &revoke_uri,
        json!({"revokedBy": "registrar", "revokeReason": "Academic misconduct"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Certificate revoked successfully");
    assert_eq!(body["certificate"]["status"], "Revoked");

    let (_, body) = get(&app, &validate_uri(&cert)).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["validationResult"], "Revoked");
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Certificate was revoked on"), "{}", message);
    assert!(message.contains("Reason: Academic misconduct"), "{}", message);
}

#[tokio::test]
async fn test_revoke_twice_overwrites() {
    let app = test_app();
    let (student, program) = seed_student_and_program(&app).await;
    let cert = issue(&app, &student, &program, json!({})).await;
    let uri = format!("/api/certificates/{}/revoke", id_of(&cert));

    let (_, first) = put(&app, &uri, json!({"revokedBy": "clerk", "revokeReason": "Typo in name"})).await;
    assert_eq!(first["certificate"]["isValid"], false);
    assert!(!first["certificate"]["revokedAt"].is_null());

    let (status, second) = put(&app, &uri, json!({"revokedBy": "dean", "revokeReason": "Fraud"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["certificate"]["revokedBy"], "dean");
    assert_eq!(second["certificate"]["revokeReason"], "Fraud");
    let t1: DateTime<Utc> = serde_json::from_value(first["certificate"]["revokedAt"].clone()).unwrap();
    let t2: DateTime<Utc> = serde_json::from_value(second["certificate"]["revokedAt"].clone()).unwrap();
    assert!(t2 >= t1);

    let (status, body) = put(
        &app,
        &format!("/api/certificates/{}/revoke", uuid::Uuid::new_v4()),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Certificate not found");
}

#[tokio::test]
async fn test_log_validation_appends_one_record_matching_validate() {
    let app = test_app();
    let (student, program) = seed_student_and_program(&app).await;
    let cert = issue(&app, &student, &program, json!({"expiryDate": yesterday()})).await;
    let log_uri = format!("{}/log", validate_uri(&cert));
    let history_uri = format!("/api/certificates/{}/validations", id_of(&cert));

    let (_, plain) = get(&app, &validate_uri(&cert)).await;
    let (status, logged) = send_with(
        &app,
        Method::POST,
        &log_uri,
        Some(log_body()),
        &[("x-forwarded-for", "203.0.113.9, 10.0.0.2"), ("user-agent", "Test Agent")],
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", logged);
    assert_eq!(logged["message"], "Validation logged successfully");
    assert_eq!(logged["validationResult"], plain["validationResult"]);

    let (_, history) = get(&app, &history_uri).await;
    let history = history.as_array().unwrap().clone();
    assert_eq!(history.len(), 1);
    let entry = &history[0];
    assert_eq!(entry["id"], logged["validationId"]);
    assert_eq!(entry["validationResult"], "Expired");
    assert_eq!(entry["validatorEmail"], "hr@company.com");
    assert_eq!(entry["validationPurpose"], "Employment Verification");
    assert_eq!(entry["ipAddress"], "203.0.113.9");
    assert_eq!(entry["userAgent"], "Test Agent");

    // One count from the plain validate, one from the log.
    let (_, stored) = get(&app, &format!("/api/certificates/{}", id_of(&cert))).await;
    assert_eq!(stored["validationCount"], 2);
}

#[tokio::test]
async fn test_log_validation_defaults_and_errors() {
    let app = test_app();
    let (student, program) = seed_student_and_program(&app).await;
    let cert = issue(&app, &student, &program, json!({})).await;
    let log_uri = format!("{}/log", validate_uri(&cert));

    let (status, _) = post(&app, &log_uri, log_body()).await;
    assert_eq!(status, StatusCode::OK);
    let (_, history) = get(&app, &format!("/api/certificates/{}/validations", id_of(&cert))).await;
    assert_eq!(history[0]["ipAddress"], "unknown");
    assert_eq!(history[0]["userAgent"], "Unknown");

    let mut bad = log_body();
    bad["validationPurpose"] = json!("Curiosity");
    let (status, _) = post(&app, &log_uri, bad).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let mut bad = log_body();
    bad["additionalNotes"] = json!("n".repeat(501));
    let (status, _) = post(&app, &log_uri, bad).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = post(&app, "/api/certificates/validate/CERT-00000000/log", log_body()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, history) = get(&app, &format!("/api/certificates/{}/validations", id_of(&cert))).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_validations_newest_first() {
    let app = test_app();
    let (student, program) = seed_student_and_program(&app).await;
    let cert = issue(&app, &student, &program, json!({})).await;
    let log_uri = format!("{}/log", validate_uri(&cert));

    let mut ids = Vec::new();
    for _ in 0..4 {
        let (_, logged) = post(&app, &log_uri, log_body()).await;
        ids.push(logged["validationId"].clone());
    }
    let (_, history) = get(&app, &format!("/api/certificates/{}/validations", id_of(&cert))).await;
    let history = history.as_array().unwrap();
    let dates: Vec<DateTime<Utc>> = history
        .iter()
        .map(|v| serde_json::from_value(v["validationDate"].clone()).unwrap())
        .collect();
    assert!(dates.windows(2).all(|w| w[0] >= w[1]), "{:?}", dates);
    ids.reverse();
    let listed: Vec<Value> = history.iter().map(|v| v["id"].clone()).collect();
    assert_eq!(listed, ids);
}

#[tokio::test]
async fn test_list_filters_and_order() {
    let app = test_app();
    let (student, program) = seed_student_and_program(&app).await;
    let first = issue(&app, &student, &program, json!({})).await;
    let second = issue(&app, &student, &program, json!({})).await;
    put(
        &app,
        &format!("/api/certificates/{}/revoke", id_of(&first)),
        json!({"revokeReason": "Duplicate"}),
    )
    .await;

    let (status, all) = get(&app, "/api/certificates").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<String> = all.as_array().unwrap().iter().map(id_of).collect();
    assert_eq!(ids, vec![id_of(&second), id_of(&first)]);

    let (_, valid) = get(&app, "/api/certificates?isValid=true").await;
    let ids: Vec<String> = valid.as_array().unwrap().iter().map(id_of).collect();
    assert_eq!(ids, vec![id_of(&second)]);

    // Any value other than "true" selects invalid certificates.
    for query in ["isValid=false", "isValid=no"] {
        let (_, invalid) = get(&app, &format!("/api/certificates?{}", query)).await;
        let ids: Vec<String> = invalid.as_array().unwrap().iter().map(id_of).collect();
        assert_eq!(ids, vec![id_of(&first)], "{}", query);
    }

    let (_, by_student) = get(&app, &format!("/api/certificates?studentId={}", student)).await;
    assert_eq!(by_student.as_array().unwrap().len(), 2);

    let (_, other) = get(&app, &format!("/api/certificates?programId={}", uuid::Uuid::new_v4())).await;
    assert!(other.as_array().unwrap().is_empty());

    let (status, _) = get(&app, "/api/certificates?studentId=not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_read_by_id() {
    let app = test_app();
    let (student, program) = seed_student_and_program(&app).await;
    let cert = issue(&app, &student, &program, json!({})).await;

    let (status, body) = get(&app, &format!("/api/certificates/{}", id_of(&cert))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["certificateNumber"], cert["certificateNumber"]);
    assert_eq!(body["studentId"]["firstName"], "John");

    for missing in [uuid::Uuid::new_v4().to_string(), "12345".to_string()] {
        let (status, body) = get(&app, &format!("/api/certificates/{}", missing)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["message"], "Certificate not found");
    }
}
