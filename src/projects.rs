//! Project CRUD endpoints.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::access::ProjectAccess;
use crate::app_state::AppState;
use crate::auth::Principal;
use crate::entities::project::{self, ProjectStatus};
use crate::entities::project_member::{self, ProjectRole};
use crate::entities::task;
use crate::entities::{Project, ProjectMember, Task, User};
use crate::error::ApiError;
use crate::models::{MemberView, ProjectView, UserSummary};
use crate::response::{self, PageQuery};
use crate::validation;

async fn base_view<C: ConnectionTrait>(
    db: &C,
    project: project::Model,
) -> Result<ProjectView, ApiError> {
    let owner = User::find_by_id(project.owner_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    Ok(ProjectView::new(project, UserSummary::from(owner)))
}

async fn member_views<C: ConnectionTrait>(
    db: &C,
    project_id: Uuid,
) -> Result<Vec<MemberView>, ApiError> {
    let rows = ProjectMember::find()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .order_by_asc(project_member::Column::JoinedAt)
        .all(db)
        .await?;

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        let user = User::find_by_id(row.user_id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::not_found("User"))?;
        views.push(MemberView::new(row, user));
    }
    Ok(views)
}

// POST /projects
// The creator becomes the owner and gets the OWNER member row in the same
// transaction.
pub async fn create_project(
    principal: Principal,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let data = validation::validate_create_project(&body)?;

    let now = Utc::now();
    let txn = state.db.begin().await?;
    let created = project::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(data.name),
        description: Set(data.description),
        status: Set(ProjectStatus::Active),
        owner_id: Set(principal.user_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    project_member::ActiveModel {
        project_id: Set(created.id),
        user_id: Set(principal.user_id),
        role: Set(ProjectRole::Owner),
        joined_at: Set(now),
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    info!("Project {} created by {}", created.id, principal.user_id);
    let view = base_view(&state.db, created).await?;
    Ok(response::created(view))
}

// GET /projects
// Paginated, scoped to projects the caller owns or belongs to, most
// recently updated first.
pub async fn list_projects(
    principal: Principal,
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page();
    let page_size = query.page_size();

    let member_project_ids: Vec<Uuid> = ProjectMember::find()
        .filter(project_member::Column::UserId.eq(principal.user_id))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|m| m.project_id)
        .collect();

    let scope = Condition::any()
        .add(project::Column::OwnerId.eq(principal.user_id))
        .add(project::Column::Id.is_in(member_project_ids));

    let paginator = Project::find()
        .filter(scope)
        .order_by_desc(project::Column::UpdatedAt)
        .paginate(&state.db, page_size);
    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(page - 1).await?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let member_count = ProjectMember::find()
            .filter(project_member::Column::ProjectId.eq(row.id))
            .count(&state.db)
            .await?;
        let task_count = Task::find()
            .filter(task::Column::ProjectId.eq(row.id))
            .count(&state.db)
            .await?;
        items.push(
            base_view(&state.db, row)
                .await?
                .with_member_count(member_count)
                .with_task_count(task_count),
        );
    }

    Ok(response::ok(response::page(items, total, page, page_size)))
}

// GET /projects/{project_id}
pub async fn get_project(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let access = ProjectAccess::load(&state.db, path.into_inner(), &principal).await?;
    access.require(ProjectRole::Viewer)?;

    let members = member_views(&state.db, access.project.id).await?;
    let task_count = Task::find()
        .filter(task::Column::ProjectId.eq(access.project.id))
        .count(&state.db)
        .await?;

    let view = base_view(&state.db, access.project)
        .await?
        .with_members(members)
        .with_task_count(task_count);
    Ok(response::ok(view))
}

// PATCH /projects/{project_id}
// Access is resolved before the body is validated, so strangers see 404 and
// under-privileged members see 403 even when the payload is malformed.
pub async fn update_project(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let access = ProjectAccess::load(&state.db, path.into_inner(), &principal).await?;
    access.require(ProjectRole::Admin)?;

    let data = validation::validate_update_project(&body)?;

    let mut active: project::ActiveModel = access.project.into();
    if let Some(name) = data.name {
        active.name = Set(name);
    }
    if let Some(description) = data.description {
        active.description = Set(description);
    }
    if let Some(status) = data.status {
        active.status = Set(status);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    let view = base_view(&state.db, updated).await?;
    Ok(response::ok(view))
}

// DELETE /projects/{project_id}
// Only the owning user may delete, not merely someone holding the OWNER
// role elsewhere; deletion removes member and task rows with the project.
pub async fn delete_project(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let access = ProjectAccess::load(&state.db, path.into_inner(), &principal).await?;
    if !access.is_owner(&principal) {
        return Err(ApiError::forbidden_msg(
            "Only the project owner can delete a project",
        ));
    }

    let project_id = access.project.id;
    let txn = state.db.begin().await?;
    Task::delete_many()
        .filter(task::Column::ProjectId.eq(project_id))
        .exec(&txn)
        .await?;
    ProjectMember::delete_many()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .exec(&txn)
        .await?;
    Project::delete_by_id(project_id).exec(&txn).await?;
    txn.commit().await?;

    info!("Project {} deleted by {}", project_id, principal.user_id);
    Ok(response::no_content())
}
