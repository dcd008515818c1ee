//! Project membership endpoints.
//!
//! The OWNER member row mirrors `projects.owner_id` and is immutable: it can
//! never be granted, re-assigned, or removed through this API.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::access::ProjectAccess;
use crate::app_state::AppState;
use crate::auth::Principal;
use crate::entities::project_member::{self, ProjectRole};
use crate::entities::{ProjectMember, User};
use crate::error::ApiError;
use crate::models::MemberView;
use crate::response;
use crate::validation;

// GET /projects/{project_id}/members
pub async fn list_members(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let access = ProjectAccess::load(&state.db, path.into_inner(), &principal).await?;
    access.require(ProjectRole::Viewer)?;

    let rows = ProjectMember::find()
        .filter(project_member::Column::ProjectId.eq(access.project.id))
        .order_by_asc(project_member::Column::JoinedAt)
        .all(&state.db)
        .await?;

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        let user = User::find_by_id(row.user_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))?;
        views.push(MemberView::new(row, user));
    }
    Ok(response::ok(views))
}

// POST /projects/{project_id}/members
pub async fn add_member(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let data = validation::validate_add_member(&body)?;

    let access = ProjectAccess::load(&state.db, path.into_inner(), &principal).await?;
    access.require(ProjectRole::Admin)?;

    if data.role == ProjectRole::Owner {
        return Err(ApiError::forbidden_msg("The OWNER role cannot be granted"));
    }

    let target = User::find_by_id(data.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let existing = ProjectMember::find_by_id((access.project.id, data.user_id))
        .one(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict(
            "User is already a member of this project",
        ));
    }

    let member = project_member::ActiveModel {
        project_id: Set(access.project.id),
        user_id: Set(data.user_id),
        role: Set(data.role),
        joined_at: Set(Utc::now()),
    }
    .insert(&state.db)
    .await?;

    info!(
        "User {} added to project {} as {:?} by {}",
        member.user_id, member.project_id, member.role, principal.user_id
    );
    Ok(response::created(MemberView::new(member, target)))
}

// PATCH /projects/{project_id}/members/{user_id}
pub async fn update_member_role(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let (project_id, member_id) = path.into_inner();
    let access = ProjectAccess::load(&state.db, project_id, &principal).await?;
    access.require(ProjectRole::Admin)?;

    let member = ProjectMember::find_by_id((project_id, member_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Member"))?;
    if member.role == ProjectRole::Owner {
        return Err(ApiError::forbidden_msg(
            "The project owner's membership cannot be changed",
        ));
    }

    let data = validation::validate_update_member_role(&body)?;
    if data.role == ProjectRole::Owner {
        return Err(ApiError::forbidden_msg("The OWNER role cannot be granted"));
    }

    let mut active: project_member::ActiveModel = member.into();
    active.role = Set(data.role);
    let updated = active.update(&state.db).await?;

    let user = User::find_by_id(updated.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(response::ok(MemberView::new(updated, user)))
}

// DELETE /projects/{project_id}/members/{user_id}
// ADMIN and above may remove others; any member may remove themselves.
pub async fn remove_member(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, member_id) = path.into_inner();
    let access = ProjectAccess::load(&state.db, project_id, &principal).await?;

    let member = ProjectMember::find_by_id((project_id, member_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Member"))?;
    if member.role == ProjectRole::Owner {
        return Err(ApiError::forbidden_msg(
            "The project owner cannot be removed",
        ));
    }
    if member_id != principal.user_id {
        access.require(ProjectRole::Admin)?;
    }

    ProjectMember::delete_by_id((project_id, member_id))
        .exec(&state.db)
        .await?;

    info!(
        "User {} removed from project {} by {}",
        member_id, project_id, principal.user_id
    );
    Ok(response::no_content())
}
