//! Request payload validation.
//!
//! One pure function per resource operation: parse the raw JSON body, check
//! field bounds and enum membership, and hand back typed data. Nothing here
//! touches the store. Partial-update payloads distinguish an absent field
//! (leave unchanged) from an explicit `null` (clear), so nullable fields are
//! carried as `Option<Option<T>>`.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::entities::project::ProjectStatus;
use crate::entities::project_member::ProjectRole;
use crate::entities::task::{TaskPriority, TaskStatus};
use crate::error::ApiError;

/// Maps a present field to `Some(...)`, so after `#[serde(default)]` an
/// absent field stays `None` while an explicit `null` becomes `Some(None)`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

fn parse<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body)
        .map_err(|err| ApiError::bad_request(format!("Invalid request body: {err}")))
}

fn fail(errors: Map<String, Value>) -> ApiError {
    ApiError::validation("Validation failed", Value::Object(errors))
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap())
}

// ─── Projects ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateProjectRaw {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Debug)]
pub struct CreateProjectData {
    pub name: String,
    pub description: Option<String>,
}

pub fn validate_create_project(body: &[u8]) -> Result<CreateProjectData, ApiError> {
    let raw: CreateProjectRaw = parse(body)?;
    let mut errors = Map::new();

    let name = raw.name.map(|n| n.trim().to_string()).unwrap_or_default();
    if name.is_empty() {
        errors.insert("name".into(), json!("Name is required"));
    } else if name.chars().count() > 100 {
        errors.insert("name".into(), json!("Name must be 100 characters or fewer"));
    }

    let description = raw
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if let Some(d) = &description {
        if d.chars().count() > 500 {
            errors.insert(
                "description".into(),
                json!("Description must be 500 characters or fewer"),
            );
        }
    }

    if !errors.is_empty() {
        return Err(fail(errors));
    }
    Ok(CreateProjectData { name, description })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectData {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
}

pub fn validate_update_project(body: &[u8]) -> Result<UpdateProjectData, ApiError> {
    let mut data: UpdateProjectData = parse(body)?;
    let mut errors = Map::new();

    if let Some(name) = data.name.take() {
        let name = name.trim().to_string();
        if name.is_empty() {
            errors.insert("name".into(), json!("Name cannot be empty"));
        } else if name.chars().count() > 100 {
            errors.insert("name".into(), json!("Name must be 100 characters or fewer"));
        }
        data.name = Some(name);
    }

    // An empty string clears the description, same as an explicit null.
    data.description = match data.description.take() {
        Some(Some(d)) => {
            let d = d.trim().to_string();
            if d.is_empty() {
                Some(None)
            } else {
                if d.chars().count() > 500 {
                    errors.insert(
                        "description".into(),
                        json!("Description must be 500 characters or fewer"),
                    );
                }
                Some(Some(d))
            }
        }
        other => other,
    };

    if !errors.is_empty() {
        return Err(fail(errors));
    }
    Ok(data)
}

// ─── Members ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddMemberRaw {
    user_id: Option<Uuid>,
    role: Option<ProjectRole>,
}

#[derive(Debug)]
pub struct AddMemberData {
    pub user_id: Uuid,
    pub role: ProjectRole,
}

pub fn validate_add_member(body: &[u8]) -> Result<AddMemberData, ApiError> {
    let raw: AddMemberRaw = parse(body)?;
    let mut errors = Map::new();

    if raw.user_id.is_none() {
        errors.insert("userId".into(), json!("User id is required"));
    }
    if raw.role.is_none() {
        errors.insert("role".into(), json!("Role is required"));
    }
    if !errors.is_empty() {
        return Err(fail(errors));
    }
    Ok(AddMemberData {
        user_id: raw.user_id.unwrap(),
        role: raw.role.unwrap(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateMemberRoleRaw {
    role: Option<ProjectRole>,
}

#[derive(Debug)]
pub struct UpdateMemberRoleData {
    pub role: ProjectRole,
}

pub fn validate_update_member_role(body: &[u8]) -> Result<UpdateMemberRoleData, ApiError> {
    let raw: UpdateMemberRoleRaw = parse(body)?;
    match raw.role {
        Some(role) => Ok(UpdateMemberRoleData { role }),
        None => {
            let mut errors = Map::new();
            errors.insert("role".into(), json!("Role is required"));
            Err(fail(errors))
        }
    }
}

// ─── Tasks ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskRaw {
    title: Option<String>,
    description: Option<String>,
    priority: Option<TaskPriority>,
    assignee_id: Option<Uuid>,
    due_date: Option<DateTime<Utc>>,
    project_id: Option<Uuid>,
}

#[derive(Debug)]
pub struct CreateTaskData {
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Uuid,
}

/// Status is not accepted at creation; new tasks always start as `TODO`.
pub fn validate_create_task(body: &[u8]) -> Result<CreateTaskData, ApiError> {
    let raw: CreateTaskRaw = parse(body)?;
    let mut errors = Map::new();

    let title = raw.title.map(|t| t.trim().to_string()).unwrap_or_default();
    if title.is_empty() {
        errors.insert("title".into(), json!("Title is required"));
    } else if title.chars().count() > 200 {
        errors.insert("title".into(), json!("Title must be 200 characters or fewer"));
    }

    let description = raw
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    if let Some(d) = &description {
        if d.chars().count() > 1000 {
            errors.insert(
                "description".into(),
                json!("Description must be 1000 characters or fewer"),
            );
        }
    }

    if raw.project_id.is_none() {
        errors.insert("projectId".into(), json!("Project id is required"));
    }

    if !errors.is_empty() {
        return Err(fail(errors));
    }
    Ok(CreateTaskData {
        title,
        description,
        priority: raw.priority.unwrap_or(TaskPriority::Medium),
        assignee_id: raw.assignee_id,
        due_date: raw.due_date,
        project_id: raw.project_id.unwrap(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskData {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

pub fn validate_update_task(body: &[u8]) -> Result<UpdateTaskData, ApiError> {
    let mut data: UpdateTaskData = parse(body)?;
    let mut errors = Map::new();

    if let Some(title) = data.title.take() {
        let title = title.trim().to_string();
        if title.is_empty() {
            errors.insert("title".into(), json!("Title cannot be empty"));
        } else if title.chars().count() > 200 {
            errors.insert("title".into(), json!("Title must be 200 characters or fewer"));
        }
        data.title = Some(title);
    }

    data.description = match data.description.take() {
        Some(Some(d)) => {
            let d = d.trim().to_string();
            if d.is_empty() {
                Some(None)
            } else {
                if d.chars().count() > 1000 {
                    errors.insert(
                        "description".into(),
                        json!("Description must be 1000 characters or fewer"),
                    );
                }
                Some(Some(d))
            }
        }
        other => other,
    };

    if !errors.is_empty() {
        return Err(fail(errors));
    }
    Ok(data)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTaskStatusRaw {
    status: Option<TaskStatus>,
}

#[derive(Debug)]
pub struct UpdateTaskStatusData {
    pub status: TaskStatus,
}

pub fn validate_update_task_status(body: &[u8]) -> Result<UpdateTaskStatusData, ApiError> {
    let raw: UpdateTaskStatusRaw = parse(body)?;
    match raw.status {
        Some(status) => Ok(UpdateTaskStatusData { status }),
        None => {
            let mut errors = Map::new();
            errors.insert("status".into(), json!("Status is required"));
            Err(fail(errors))
        }
    }
}

/// Parses a task status from a query-string value.
pub fn parse_task_status(raw: &str) -> Result<TaskStatus, ApiError> {
    match raw {
        "TODO" => Ok(TaskStatus::Todo),
        "IN_PROGRESS" => Ok(TaskStatus::InProgress),
        "REVIEW" => Ok(TaskStatus::Review),
        "DONE" => Ok(TaskStatus::Done),
        other => Err(ApiError::bad_request(format!(
            "Unknown task status: {other}"
        ))),
    }
}

// ─── Auth ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRaw {
    email: Option<String>,
    password: Option<String>,
    name: Option<String>,
}

#[derive(Debug)]
pub struct RegisterData {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

pub fn validate_register(body: &[u8]) -> Result<RegisterData, ApiError> {
    let raw: RegisterRaw = parse(body)?;
    let mut errors = Map::new();

    let email = raw
        .email
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_default();
    if !email_regex().is_match(&email) {
        errors.insert("email".into(), json!("A valid email address is required"));
    }

    let password = raw.password.unwrap_or_default();
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if password.chars().count() < 8 || !has_letter || !has_digit {
        errors.insert(
            "password".into(),
            json!("Password must be at least 8 characters and contain a letter and a digit"),
        );
    }

    if !errors.is_empty() {
        return Err(fail(errors));
    }
    Ok(RegisterData {
        email,
        password,
        name: raw.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRaw {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug)]
pub struct LoginData {
    pub email: String,
    pub password: String,
}

pub fn validate_login(body: &[u8]) -> Result<LoginData, ApiError> {
    let raw: LoginRaw = parse(body)?;
    let mut errors = Map::new();

    let email = raw
        .email
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_default();
    if email.is_empty() {
        errors.insert("email".into(), json!("Email is required"));
    }
    let password = raw.password.unwrap_or_default();
    if password.is_empty() {
        errors.insert("password".into(), json!("Password is required"));
    }

    if !errors.is_empty() {
        return Err(fail(errors));
    }
    Ok(LoginData { email, password })
}
