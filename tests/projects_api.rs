//! Project CRUD, ownership, visibility masking, and pagination.

mod common;

use actix_web::http::{Method, StatusCode};
use common::*;
use serde_json::json;

#[actix_web::test]
async fn create_project_sets_the_caller_as_owner() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let (token, user_id) = register_and_login(&app, "a@example.com", "A").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/projects",
        Some(&token),
        Some(json!({ "name": "Roadmap", "description": "Q3 planning" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], json!("Roadmap"));
    assert_eq!(body["data"]["ownerId"], json!(user_id));
    assert_eq!(body["data"]["status"], json!("active"));
    assert_eq!(body["data"]["owner"]["id"], json!(user_id));
}

#[actix_web::test]
async fn creator_gets_exactly_one_owner_membership() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let (token, user_id) = register_and_login(&app, "a@example.com", "A").await;
    let project_id = create_project(&app, &token, "Roadmap").await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/projects/{project_id}/members"),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let members = body["data"].as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["userId"], json!(user_id));
    assert_eq!(members[0]["role"], json!("OWNER"));
}

#[actix_web::test]
async fn detail_embeds_members_and_task_count() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let (token, user_id) = register_and_login(&app, "a@example.com", "A").await;
    let project_id = create_project(&app, &token, "Roadmap").await;
    create_task(&app, &token, &project_id, "First task").await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/projects/{project_id}"),
        Some(&token),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["owner"]["id"], json!(user_id));
    assert_eq!(body["data"]["members"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["taskCount"], json!(1));
}

#[actix_web::test]
async fn non_members_see_not_found() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let (token_a, _) = register_and_login(&app, "a@example.com", "A").await;
    let (token_b, _) = register_and_login(&app, "b@example.com", "B").await;
    let project_id = create_project(&app, &token_a, "Roadmap").await;

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/projects/{project_id}"),
        Some(&token_b),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
}

#[actix_web::test]
async fn membership_promotion_scenario() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let (token_a, user_a) = register_and_login(&app, "a@example.com", "A").await;
    let (token_b, user_b) = register_and_login(&app, "b@example.com", "B").await;

    // A creates "Roadmap".
    let (status, body) = send(
        &app,
        Method::POST,
        "/projects",
        Some(&token_a),
        Some(json!({ "name": "Roadmap" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], json!("Roadmap"));
    assert_eq!(body["data"]["ownerId"], json!(user_a));
    let project_id = body["data"]["id"].as_str().unwrap().to_string();

    // B cannot even see it.
    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/projects/{project_id}"),
        Some(&token_b),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A adds B as MEMBER.
    let (status, _) = add_member(&app, &token_a, &project_id, &user_b, "MEMBER").await;
    assert_eq!(status, StatusCode::CREATED);

    // MEMBER is not enough to edit the project.
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/projects/{project_id}"),
        Some(&token_b),
        Some(json!({ "name": "Renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // A promotes B to ADMIN; now the edit succeeds.
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/projects/{project_id}/members/{user_b}"),
        Some(&token_a),
        Some(json!({ "role": "ADMIN" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/projects/{project_id}"),
        Some(&token_b),
        Some(json!({ "name": "Renamed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], json!("Renamed"));
}

#[actix_web::test]
async fn empty_string_clears_description_and_absent_fields_stay() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let (token, _) = register_and_login(&app, "a@example.com", "A").await;

    let (_, body) = send(
        &app,
        Method::POST,
        "/projects",
        Some(&token),
        Some(json!({ "name": "Roadmap", "description": "keep me" })),
    )
    .await;
    let project_id = body["data"]["id"].as_str().unwrap().to_string();

    // Omitting description leaves it untouched.
    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/projects/{project_id}"),
        Some(&token),
        Some(json!({ "status": "on_hold" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], json!("keep me"));
    assert_eq!(body["data"]["status"], json!("on_hold"));

    // An empty string clears it while name and status stay.
    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/projects/{project_id}"),
        Some(&token),
        Some(json!({ "description": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["description"], json!(null));
    assert_eq!(body["data"]["name"], json!("Roadmap"));
    assert_eq!(body["data"]["status"], json!("on_hold"));

    // Explicit null clears too.
    let (_, body) = send(
        &app,
        Method::PATCH,
        &format!("/projects/{project_id}"),
        Some(&token),
        Some(json!({ "description": "back", "name": "Roadmap" })),
    )
    .await;
    assert_eq!(body["data"]["description"], json!("back"));
    let (_, body) = send(
        &app,
        Method::PATCH,
        &format!("/projects/{project_id}"),
        Some(&token),
        Some(json!({ "description": null })),
    )
    .await;
    assert_eq!(body["data"]["description"], json!(null));
}

#[actix_web::test]
async fn only_the_owning_user_can_delete() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let (token_a, _) = register_and_login(&app, "a@example.com", "A").await;
    let (token_b, user_b) = register_and_login(&app, "b@example.com", "B").await;
    let (token_c, _) = register_and_login(&app, "c@example.com", "C").await;
    let project_id = create_project(&app, &token_a, "Roadmap").await;
    add_member(&app, &token_a, &project_id, &user_b, "ADMIN").await;

    // ADMIN role is not ownership.
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/projects/{project_id}"),
        Some(&token_b),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Strangers get the mask.
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/projects/{project_id}"),
        Some(&token_c),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The owner succeeds, and the project is gone afterwards.
    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/projects/{project_id}"),
        Some(&token_a),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/projects/{project_id}"),
        Some(&token_a),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn deleting_a_project_removes_its_tasks() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let (token, _) = register_and_login(&app, "a@example.com", "A").await;
    let project_id = create_project(&app, &token, "Roadmap").await;
    let task_id = create_task(&app, &token, &project_id, "Orphan-to-be").await;

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/projects/{project_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/tasks/{task_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn list_is_scoped_to_memberships_and_paginated() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let (token_a, user_a) = register_and_login(&app, "a@example.com", "A").await;
    let (token_b, _) = register_and_login(&app, "b@example.com", "B").await;

    for name in ["One", "Two", "Three"] {
        create_project(&app, &token_a, name).await;
    }
    let b_project = create_project(&app, &token_b, "Theirs").await;
    add_member(&app, &token_b, &b_project, &user_a, "VIEWER").await;

    // A sees their three plus B's shared one.
    let (status, body) = send(&app, Method::GET, "/projects", Some(&token_a), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], json!(4));

    // B only sees their own.
    let (_, body) = send(&app, Method::GET, "/projects", Some(&token_b), None).await;
    assert_eq!(body["data"]["total"], json!(1));
    assert_eq!(body["data"]["items"][0]["memberCount"], json!(2));

    // Pagination math.
    let (_, body) = send(
        &app,
        Method::GET,
        "/projects?page=1&pageSize=3",
        Some(&token_a),
        None,
    )
    .await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"]["totalPages"], json!(2));
    let (_, body) = send(
        &app,
        Method::GET,
        "/projects?page=2&pageSize=3",
        Some(&token_a),
        None,
    )
    .await;
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn access_is_resolved_before_the_body_is_validated() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let (token_a, _) = register_and_login(&app, "a@example.com", "A").await;
    let (token_b, user_b) = register_and_login(&app, "b@example.com", "B").await;
    let (token_c, _) = register_and_login(&app, "c@example.com", "C").await;
    let project_id = create_project(&app, &token_a, "Roadmap").await;
    add_member(&app, &token_a, &project_id, &user_b, "VIEWER").await;

    let invalid = json!({ "name": "" });

    // Stranger: masked, not told the body is bad.
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/projects/{project_id}"),
        Some(&token_c),
        Some(invalid.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Viewer: forbidden before validation.
    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/projects/{project_id}"),
        Some(&token_b),
        Some(invalid.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Owner: now the payload gets validated.
    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/projects/{project_id}"),
        Some(&token_a),
        Some(invalid),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["details"]["name"].is_string());
}

#[actix_web::test]
async fn unparseable_ids_report_not_found() {
    let state = test_state().await;
    let app = init_app(&state).await;
    let (token, _) = register_and_login(&app, "a@example.com", "A").await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/projects/not-a-uuid",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("NOT_FOUND"));
}
