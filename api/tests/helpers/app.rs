#![allow(dead_code)]

use api::routes::routes;
use api::state::AppState;
use axum::{Router, body::Body, http::Request};
use db::models::{
    subject,
    subject_enrollment,
    user::{self, Role},
};
use db::test_utils::setup_test_db;
use serde_json::Value;

/// University gate coordinates used across the HTTP tests.
pub const CENTER_LAT: f64 = 26.223084;
pub const CENTER_LON: f64 = 68.330521;

/// Builds the full API router on a fresh in-memory database.
pub async fn make_test_app() -> (Router, AppState) {
    let app_state = AppState::new(setup_test_db().await);
    let router = Router::new().nest("/api", routes(app_state.clone()));
    (router, app_state)
}

pub struct TestCtx {
    pub admin: user::Model,
    pub teacher: user::Model,
    pub students: Vec<user::Model>,
    pub subject: subject::Model,
}

/// Seeds an admin, a teacher, one subject, and `n_students` enrolled students.
pub async fn seed(db: &sea_orm::DatabaseConnection, n_students: usize) -> TestCtx {
    let admin = user::Model::create(db, "registrar", "registrar@test.edu", "password", Role::Admin)
        .await
        .expect("create admin");
    let teacher = user::Model::create(db, "t_aslam", "aslam@test.edu", "password", Role::Teacher)
        .await
        .expect("create teacher");
    let subject = subject::Model::create(db, "CS-301", "Operating Systems", teacher.id)
        .await
        .expect("create subject");

    let mut students = Vec::new();
    for i in 0..n_students {
        let student = user::Model::create(
            db,
            &format!("s_{i:03}"),
            &format!("s{i:03}@test.edu"),
            "password",
            Role::Student,
        )
        .await
        .expect("create student");
        subject_enrollment::Model::enroll(db, subject.id, student.id)
            .await
            .expect("enroll student");
        students.push(student);
    }

    TestCtx {
        admin,
        teacher,
        students,
        subject,
    }
}

pub fn bearer(user: &user::Model) -> String {
    let (token, _expiry) = api::auth::generate_jwt(user.id, user.role);
    format!("Bearer {token}")
}

pub fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("Authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("Authorization", auth);
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn response_json(resp: axum::http::Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
