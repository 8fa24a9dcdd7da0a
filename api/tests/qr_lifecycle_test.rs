mod helpers;

use axum::http::StatusCode;
use helpers::app::{
    CENTER_LAT, CENTER_LON, bearer, json_request, make_test_app, response_json, seed,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use tower::ServiceExt;

fn put_request(uri: &str, auth: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method("PUT")
        .uri(uri)
        .header("Authorization", auth)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn generate_body(subject_id: i64) -> serde_json::Value {
    json!({
        "title": "Lecture 5",
        "subject_id": subject_id,
        "latitude": CENTER_LAT,
        "longitude": CENTER_LON,
        "radius_meters": 40.0,
        "duration_minutes": 1,
    })
}

fn scan_body(token: &str) -> serde_json::Value {
    json!({
        "token": token,
        // ~10 m north of the geofence center
        "latitude": CENTER_LAT + 0.00009,
        "longitude": CENTER_LON,
        "device_id": "pixel-7-test",
    })
}

#[tokio::test]
async fn generate_requires_teacher_role() {
    let (app, app_state) = make_test_app().await;
    let ctx = seed(app_state.db(), 1).await;

    let req = json_request(
        "POST",
        "/api/qr/generate",
        Some(&bearer(&ctx.students[0])),
        generate_body(ctx.subject.id),
    );
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = json_request("POST", "/api/qr/generate", None, generate_body(ctx.subject.id));
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn generate_returns_code_with_scannable_image() {
    let (app, app_state) = make_test_app().await;
    let ctx = seed(app_state.db(), 2).await;

    let req = json_request(
        "POST",
        "/api/qr/generate",
        Some(&bearer(&ctx.teacher)),
        generate_body(ctx.subject.id),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = response_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "QR generated");

    let data = &body["data"];
    assert!(!data["token"].as_str().unwrap().is_empty());
    assert_eq!(data["subject_id"], ctx.subject.id);
    assert_eq!(data["geo"]["radius_meters"], 40.0);
    assert!(!data["expires_at"].as_str().unwrap().is_empty());
    assert!(
        data["qr_image"]
            .as_str()
            .unwrap()
            .starts_with("data:image/svg+xml;base64,")
    );
}

#[tokio::test]
async fn generate_rejects_invalid_geofence() {
    let (app, app_state) = make_test_app().await;
    let ctx = seed(app_state.db(), 1).await;

    let mut body = generate_body(ctx.subject.id);
    body["latitude"] = json!(95.0);

    let req = json_request(
        "POST",
        "/api/qr/generate",
        Some(&bearer(&ctx.teacher)),
        body,
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = response_json(resp).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn generate_rejects_subjects_of_other_teachers() {
    let (app, app_state) = make_test_app().await;
    let ctx = seed(app_state.db(), 1).await;

    let other = db::models::user::Model::create(
        app_state.db(),
        "t_other",
        "other@test.edu",
        "password",
        db::models::user::Role::Teacher,
    )
    .await
    .unwrap();

    let req = json_request(
        "POST",
        "/api/qr/generate",
        Some(&bearer(&other)),
        generate_body(ctx.subject.id),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

async fn issue_token(app: &axum::Router, auth: &str, subject_id: i64) -> serde_json::Value {
    let req = json_request("POST", "/api/qr/generate", Some(auth), generate_body(subject_id));
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    response_json(resp).await["data"].clone()
}

#[tokio::test]
async fn scan_marks_present_once_then_rejects_duplicates() {
    let (app, app_state) = make_test_app().await;
    let ctx = seed(app_state.db(), 2).await;

    let qr = issue_token(&app, &bearer(&ctx.teacher), ctx.subject.id).await;
    let token = qr["token"].as_str().unwrap();

    let req = json_request(
        "POST",
        "/api/qr/scan",
        Some(&bearer(&ctx.students[0])),
        scan_body(token),
    );
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = response_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "present");
    assert_eq!(body["data"]["student_id"], ctx.students[0].id);

    let req = json_request(
        "POST",
        "/api/qr/scan",
        Some(&bearer(&ctx.students[0])),
        scan_body(token),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = response_json(resp).await;
    assert_eq!(body["message"], "attendance already marked");
}

#[tokio::test]
async fn scan_rejects_out_of_range_and_unknown_tokens() {
    let (app, app_state) = make_test_app().await;
    let ctx = seed(app_state.db(), 1).await;

    let qr = issue_token(&app, &bearer(&ctx.teacher), ctx.subject.id).await;
    let token = qr["token"].as_str().unwrap();

    // ~100 m away from a 40 m geofence
    let mut body = scan_body(token);
    body["latitude"] = json!(CENTER_LAT + 0.0009);
    let req = json_request("POST", "/api/qr/scan", Some(&bearer(&ctx.students[0])), body);
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = json_request(
        "POST",
        "/api/qr/scan",
        Some(&bearer(&ctx.students[0])),
        scan_body("not-a-real-token"),
    );
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Teachers cannot scan their own codes.
    let req = json_request(
        "POST",
        "/api/qr/scan",
        Some(&bearer(&ctx.teacher)),
        scan_body(token),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn usage_cap_closes_code_after_last_scan() {
    let (app, app_state) = make_test_app().await;
    let ctx = seed(app_state.db(), 2).await;

    let mut body = generate_body(ctx.subject.id);
    body["max_uses"] = json!(1);
    let req = json_request("POST", "/api/qr/generate", Some(&bearer(&ctx.teacher)), body);
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let qr = response_json(resp).await["data"].clone();
    let token = qr["token"].as_str().unwrap();

    let req = json_request(
        "POST",
        "/api/qr/scan",
        Some(&bearer(&ctx.students[0])),
        scan_body(token),
    );
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = json_request(
        "POST",
        "/api/qr/scan",
        Some(&bearer(&ctx.students[1])),
        scan_body(token),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = response_json(resp).await;
    assert_eq!(body["message"], "QR code expired or inactive");
}

#[tokio::test]
async fn deactivate_finalizes_and_stays_idempotent() {
    let (app, app_state) = make_test_app().await;
    let ctx = seed(app_state.db(), 3).await;

    let qr = issue_token(&app, &bearer(&ctx.teacher), ctx.subject.id).await;
    let qr_id = qr["id"].as_i64().unwrap();
    let token = qr["token"].as_str().unwrap();

    let req = json_request(
        "POST",
        "/api/qr/scan",
        Some(&bearer(&ctx.students[0])),
        scan_body(token),
    );
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Ownership is enforced for manual deactivation.
    let intruder = db::models::user::Model::create(
        app_state.db(),
        "t_intruder",
        "intruder@test.edu",
        "password",
        db::models::user::Role::Teacher,
    )
    .await
    .unwrap();
    let req = put_request(&format!("/api/qr/deactivate/{qr_id}"), &bearer(&intruder));
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = put_request(&format!("/api/qr/deactivate/{qr_id}"), &bearer(&ctx.teacher));
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = response_json(resp).await;
    assert_eq!(body["data"]["present"], 1);
    assert_eq!(body["data"]["absent"], 2);
    assert_eq!(body["data"]["active"], false);

    // Re-invocation sweeps nothing new and reports the same totals.
    let req = put_request(&format!("/api/qr/deactivate/{qr_id}"), &bearer(&ctx.teacher));
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = response_json(resp).await;
    assert_eq!(body["data"]["present"], 1);
    assert_eq!(body["data"]["absent"], 2);

    let record_count = db::models::attendance_record::Entity::find()
        .filter(db::models::attendance_record::Column::TokenId.eq(qr_id))
        .count(app_state.db())
        .await
        .unwrap();
    assert_eq!(record_count, 3);

    // A late scan against the closed code is rejected.
    let req = json_request(
        "POST",
        "/api/qr/scan",
        Some(&bearer(&ctx.students[1])),
        scan_body(token),
    );
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_code_cannot_be_deactivated() {
    let (app, app_state) = make_test_app().await;
    let ctx = seed(app_state.db(), 1).await;

    let req = put_request("/api/qr/deactivate/424242", &bearer(&ctx.teacher));
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
