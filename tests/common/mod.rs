//! Shared fixtures for the HTTP integration tests: an in-memory SQLite
//! database with migrations applied, the full application, and request
//! helpers.
#![allow(dead_code)]

use actix_http::Request;
use actix_web::body::BoxBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{Method, StatusCode};
use actix_web::{test, web, App};
use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};

use taskflow::auth::Authentication;
use taskflow::config::Config;
use taskflow::migrator::Migrator;
use taskflow::AppState;

pub const PASSWORD: &str = "password1";

pub trait TestApp:
    Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>
{
}

impl<S> TestApp for S where
    S: Service<Request, Response = ServiceResponse<BoxBody>, Error = actix_web::Error>
{
}

pub async fn test_state() -> web::Data<AppState> {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    web::Data::new(AppState {
        db,
        config: Config {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            frontend_origin: "http://localhost:3000".to_string(),
            // Minimum cost keeps the hashing fast under test.
            bcrypt_cost: 4,
        },
    })
}

pub async fn init_app(state: &web::Data<AppState>) -> impl TestApp {
    test::init_service(
        App::new()
            .wrap(Authentication)
            .app_data(state.clone())
            .configure(taskflow::configure),
    )
    .await
}

pub async fn send(
    app: &impl TestApp,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = test::TestRequest::with_uri(path).method(method);
    if let Some(token) = token {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    if let Some(body) = body {
        req = req.set_json(body);
    }

    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response is not JSON")
    };
    (status, value)
}

/// Registers a user and logs them in. Returns `(token, user_id)`.
pub async fn register_and_login(app: &impl TestApp, email: &str, name: &str) -> (String, String) {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": email, "password": PASSWORD, "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    let user_id = body["data"]["id"].as_str().expect("user id").to_string();

    let (status, body) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    let token = body["data"]["token"].as_str().expect("token").to_string();

    (token, user_id)
}

/// Creates a project and returns its id.
pub async fn create_project(app: &impl TestApp, token: &str, name: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/projects",
        Some(token),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create project failed: {body}");
    body["data"]["id"].as_str().expect("project id").to_string()
}

pub async fn add_member(
    app: &impl TestApp,
    token: &str,
    project_id: &str,
    user_id: &str,
    role: &str,
) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        &format!("/projects/{project_id}/members"),
        Some(token),
        Some(json!({ "userId": user_id, "role": role })),
    )
    .await
}

/// Creates a task with defaults and returns its id.
pub async fn create_task(
    app: &impl TestApp,
    token: &str,
    project_id: &str,
    title: &str,
) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/tasks",
        Some(token),
        Some(json!({ "title": title, "projectId": project_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create task failed: {body}");
    body["data"]["id"].as_str().expect("task id").to_string()
}
