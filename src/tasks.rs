//! Task CRUD endpoints, plus the status-only shortcut and the filtered,
//! paginated task lists.

use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::access::{ProjectAccess, TaskAccess};
use crate::app_state::AppState;
use crate::auth::Principal;
use crate::entities::project;
use crate::entities::project_member::{self, ProjectRole};
use crate::entities::task::{self, TaskStatus};
use crate::entities::{Project, ProjectMember, Task, User};
use crate::error::ApiError;
use crate::models::{ProjectRef, TaskView, UserSummary};
use crate::response;
use crate::validation;

/// Query parameters for the task lists. `page`/`pageSize` mirror
/// `PageQuery`; the rest are optional filters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub status: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

impl TaskListQuery {
    fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    fn page_size(&self) -> u64 {
        self.page_size.unwrap_or(10).clamp(1, 100)
    }

    fn status(&self) -> Result<Option<TaskStatus>, ApiError> {
        self.status
            .as_deref()
            .map(validation::parse_task_status)
            .transpose()
    }
}

async fn render<C: ConnectionTrait>(
    db: &C,
    task: task::Model,
    project: &project::Model,
) -> Result<TaskView, ApiError> {
    let creator = User::find_by_id(task.creator_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;
    let assignee = match task.assignee_id {
        Some(id) => User::find_by_id(id).one(db).await?.map(UserSummary::from),
        None => None,
    };
    Ok(TaskView::new(
        task,
        ProjectRef::from(project),
        UserSummary::from(creator),
        assignee,
    ))
}

/// Confirms the would-be assignee exists and belongs to the project.
async fn ensure_assignable<C: ConnectionTrait>(
    db: &C,
    project: &project::Model,
    user_id: Uuid,
) -> Result<(), ApiError> {
    if User::find_by_id(user_id).one(db).await?.is_none() {
        return Err(ApiError::not_found("Assignee"));
    }
    if project.owner_id == user_id {
        return Ok(());
    }
    if ProjectMember::find_by_id((project.id, user_id))
        .one(db)
        .await?
        .is_none()
    {
        return Err(ApiError::forbidden_msg(
            "Assignee must be a member of the project",
        ));
    }
    Ok(())
}

/// Projects the principal may read: owned ones plus memberships.
async fn readable_project_ids<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
) -> Result<Vec<Uuid>, ApiError> {
    let mut ids: Vec<Uuid> = Project::find()
        .select_only()
        .column(project::Column::Id)
        .filter(project::Column::OwnerId.eq(principal.user_id))
        .into_tuple()
        .all(db)
        .await?;
    for member in ProjectMember::find()
        .filter(project_member::Column::UserId.eq(principal.user_id))
        .all(db)
        .await?
    {
        if !ids.contains(&member.project_id) {
            ids.push(member.project_id);
        }
    }
    Ok(ids)
}

async fn list_with_query(
    principal: Principal,
    state: &AppState,
    query: TaskListQuery,
) -> Result<HttpResponse, ApiError> {
    let page = query.page();
    let page_size = query.page_size();
    let status = query.status()?;

    let mut find = Task::find();
    match query.project_id {
        // An inaccessible project reports 404 here, like every other path
        // that names a project the caller has no relationship to.
        Some(project_id) => {
            ProjectAccess::load(&state.db, project_id, &principal).await?;
            find = find.filter(task::Column::ProjectId.eq(project_id));
        }
        None => {
            let ids = readable_project_ids(&state.db, &principal).await?;
            find = find.filter(task::Column::ProjectId.is_in(ids));
        }
    }
    if let Some(status) = status {
        find = find.filter(task::Column::Status.eq(status));
    }
    if let Some(assignee_id) = query.assignee_id {
        find = find.filter(task::Column::AssigneeId.eq(assignee_id));
    }

    let paginator = find
        .order_by_desc(task::Column::CreatedAt)
        .paginate(&state.db, page_size);
    let total = paginator.num_items().await?;
    let rows = paginator.fetch_page(page - 1).await?;

    let mut projects: HashMap<Uuid, project::Model> = HashMap::new();
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let project = match projects.get(&row.project_id) {
            Some(p) => p.clone(),
            None => {
                let p = Project::find_by_id(row.project_id)
                    .one(&state.db)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Project"))?;
                projects.insert(row.project_id, p.clone());
                p
            }
        };
        items.push(render(&state.db, row, &project).await?);
    }

    Ok(response::ok(response::page(items, total, page, page_size)))
}

// GET /tasks
pub async fn list_tasks(
    principal: Principal,
    state: web::Data<AppState>,
    query: web::Query<TaskListQuery>,
) -> Result<HttpResponse, ApiError> {
    list_with_query(principal, &state, query.into_inner()).await
}

// GET /projects/{project_id}/tasks
pub async fn list_project_tasks(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<TaskListQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut query = query.into_inner();
    query.project_id = Some(path.into_inner());
    list_with_query(principal, &state, query).await
}

// POST /tasks
pub async fn create_task(
    principal: Principal,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let data = validation::validate_create_task(&body)?;

    let access = ProjectAccess::load(&state.db, data.project_id, &principal).await?;
    access.require(ProjectRole::Member)?;

    if let Some(assignee_id) = data.assignee_id {
        ensure_assignable(&state.db, &access.project, assignee_id).await?;
    }

    let now = Utc::now();
    let created = task::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(data.title),
        description: Set(data.description),
        status: Set(TaskStatus::Todo),
        priority: Set(data.priority),
        project_id: Set(access.project.id),
        assignee_id: Set(data.assignee_id),
        creator_id: Set(principal.user_id),
        due_date: Set(data.due_date),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    info!(
        "Task {} created in project {} by {}",
        created.id, created.project_id, principal.user_id
    );
    let view = render(&state.db, created, &access.project).await?;
    Ok(response::created(view))
}

// GET /tasks/{task_id}
pub async fn get_task(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let TaskAccess { task, access } =
        TaskAccess::load(&state.db, path.into_inner(), &principal).await?;
    access.require(ProjectRole::Viewer)?;

    let view = render(&state.db, task, &access.project).await?;
    Ok(response::ok(view))
}

// PATCH /tasks/{task_id}
pub async fn update_task(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let TaskAccess { task, access } =
        TaskAccess::load(&state.db, path.into_inner(), &principal).await?;
    access.require(ProjectRole::Member)?;

    let data = validation::validate_update_task(&body)?;

    if let Some(Some(assignee_id)) = data.assignee_id {
        ensure_assignable(&state.db, &access.project, assignee_id).await?;
    }

    let mut active: task::ActiveModel = task.into();
    if let Some(title) = data.title {
        active.title = Set(title);
    }
    if let Some(description) = data.description {
        active.description = Set(description);
    }
    if let Some(status) = data.status {
        active.status = Set(status);
    }
    if let Some(priority) = data.priority {
        active.priority = Set(priority);
    }
    if let Some(assignee_id) = data.assignee_id {
        active.assignee_id = Set(assignee_id);
    }
    if let Some(due_date) = data.due_date {
        active.due_date = Set(due_date);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    let view = render(&state.db, updated, &access.project).await?;
    Ok(response::ok(view))
}

// PATCH /tasks/{task_id}/status
pub async fn update_task_status(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let TaskAccess { task, access } =
        TaskAccess::load(&state.db, path.into_inner(), &principal).await?;
    access.require(ProjectRole::Member)?;

    let data = validation::validate_update_task_status(&body)?;

    let mut active: task::ActiveModel = task.into();
    active.status = Set(data.status);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&state.db).await?;

    let view = render(&state.db, updated, &access.project).await?;
    Ok(response::ok(view))
}

// DELETE /tasks/{task_id}
// ADMIN and above may delete any task; the creator may delete their own as
// long as they can still see the project at all.
pub async fn delete_task(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let TaskAccess { task, access } =
        TaskAccess::load(&state.db, path.into_inner(), &principal).await?;
    if task.creator_id != principal.user_id {
        access.require(ProjectRole::Admin)?;
    }

    let task_id = task.id;
    Task::delete_by_id(task_id).exec(&state.db).await?;

    info!("Task {} deleted by {}", task_id, principal.user_id);
    Ok(response::no_content())
}
