//! API-facing view models.
//!
//! Handlers never serialize entity rows directly; they reshape them into
//! these structs so responses embed related user/project summaries and the
//! password hash can never leak.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::project::{self, ProjectStatus};
use crate::entities::project_member::{self, ProjectRole};
use crate::entities::task::{self, TaskPriority, TaskStatus};
use crate::entities::user;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
}

impl From<user::Model> for UserSummary {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            image: user.image,
        }
    }
}

/// Minimal project reference embedded in task responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRef {
    pub id: Uuid,
    pub name: String,
}

impl From<&project::Model> for ProjectRef {
    fn from(project: &project::Model) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
    pub joined_at: DateTime<Utc>,
    pub user: UserSummary,
}

impl MemberView {
    pub fn new(member: project_member::Model, user: user::Model) -> Self {
        Self {
            project_id: member.project_id,
            user_id: member.user_id,
            role: member.role,
            joined_at: member.joined_at,
            user: UserSummary::from(user),
        }
    }
}

/// Project response. List rows carry the counts, the detail view carries the
/// member list as well; create/update responses embed the owner only.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub owner_id: Uuid,
    pub owner: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<MemberView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_count: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProjectView {
    pub fn new(project: project::Model, owner: UserSummary) -> Self {
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            status: project.status,
            owner_id: project.owner_id,
            owner,
            members: None,
            member_count: None,
            task_count: None,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }

    pub fn with_members(mut self, members: Vec<MemberView>) -> Self {
        self.members = Some(members);
        self
    }

    pub fn with_member_count(mut self, count: u64) -> Self {
        self.member_count = Some(count);
        self
    }

    pub fn with_task_count(mut self, count: u64) -> Self {
        self.task_count = Some(count);
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub project_id: Uuid,
    pub project: ProjectRef,
    pub assignee_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<UserSummary>,
    pub creator_id: Uuid,
    pub creator: UserSummary,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    pub fn new(
        task: task::Model,
        project: ProjectRef,
        creator: UserSummary,
        assignee: Option<UserSummary>,
    ) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            project_id: task.project_id,
            project,
            assignee_id: task.assignee_id,
            assignee,
            creator_id: task.creator_id,
            creator,
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}
