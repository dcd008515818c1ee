//! TaskFlow: a multi-tenant project/task tracking API.
//!
//! Users register and sign in, create projects, invite members with
//! role-based permissions, and manage tasks within projects. Route
//! registration lives here so the binary and the integration tests build
//! the exact same application.

pub mod access;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod entities;
pub mod error;
pub mod members;
pub mod migrator;
pub mod models;
pub mod projects;
pub mod response;
pub mod tasks;
pub mod validation;

use actix_web::web;

pub use app_state::AppState;
pub use auth::Authentication;
pub use error::ApiError;

/// Registers every route plus the extractor error handlers that keep
/// framework-level failures inside the uniform envelope. An id that does not
/// parse as a UUID is indistinguishable from an absent resource, so path
/// errors report 404; malformed query strings report 400.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| ApiError::bad_request(format!("Invalid JSON body: {err}")).into()),
    )
    .app_data(
        web::PathConfig::default().error_handler(|_err, _req| ApiError::not_found("Resource").into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| ApiError::bad_request(format!("Invalid query string: {err}")).into()),
    )
    .service(
        web::scope("/auth")
            .route("/register", web::post().to(auth::register))
            .route("/login", web::post().to(auth::login)),
    )
    .service(
        web::scope("/projects")
            .route("", web::post().to(projects::create_project))
            .route("", web::get().to(projects::list_projects))
            .service(
                web::scope("/{project_id}")
                    .route("", web::get().to(projects::get_project))
                    .route("", web::patch().to(projects::update_project))
                    .route("", web::delete().to(projects::delete_project))
                    .service(
                        web::scope("/members")
                            .route("", web::get().to(members::list_members))
                            .route("", web::post().to(members::add_member))
                            .route("/{user_id}", web::patch().to(members::update_member_role))
                            .route("/{user_id}", web::delete().to(members::remove_member)),
                    )
                    .service(
                        web::scope("/tasks")
                            .route("", web::get().to(tasks::list_project_tasks)),
                    ),
            ),
    )
    .service(
        web::scope("/tasks")
            .route("", web::get().to(tasks::list_tasks))
            .route("", web::post().to(tasks::create_task))
            .service(
                web::scope("/{task_id}")
                    .route("", web::get().to(tasks::get_task))
                    .route("", web::patch().to(tasks::update_task))
                    .route("", web::delete().to(tasks::delete_task))
                    .route("/status", web::patch().to(tasks::update_task_status)),
            ),
    );
}
