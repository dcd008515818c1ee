//! Project access resolution.
//!
//! Every resource operation answers the same two questions through this
//! module: does the principal have any relationship to the project (owner or
//! member row), and does that relationship rank high enough for the
//! operation? A principal with no relationship at all observes `NotFound`,
//! never `Forbidden`, so strangers cannot probe which projects exist.

use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

use crate::auth::Principal;
use crate::entities::{project, project_member::ProjectRole, task, Project, ProjectMember, Task};
use crate::error::ApiError;

/// Succeeds iff `actual` ranks at least as high as `required` under
/// `VIEWER < MEMBER < ADMIN < OWNER`.
pub fn check_role(actual: ProjectRole, required: ProjectRole) -> Result<(), ApiError> {
    if actual >= required {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

/// A project together with the principal's effective role in it.
///
/// The owner's effective role is always `OWNER`; everyone else carries the
/// role of their member row. Loading never mutates anything.
#[derive(Debug)]
pub struct ProjectAccess {
    pub project: project::Model,
    pub role: ProjectRole,
}

impl ProjectAccess {
    pub async fn load<C: ConnectionTrait>(
        db: &C,
        project_id: Uuid,
        principal: &Principal,
    ) -> Result<Self, ApiError> {
        let project = Project::find_by_id(project_id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::not_found("Project"))?;

        let role = if project.owner_id == principal.user_id {
            ProjectRole::Owner
        } else {
            ProjectMember::find_by_id((project_id, principal.user_id))
                .one(db)
                .await?
                .map(|member| member.role)
                .ok_or_else(|| ApiError::not_found("Project"))?
        };

        Ok(Self { project, role })
    }

    pub fn require(&self, required: ProjectRole) -> Result<(), ApiError> {
        check_role(self.role, required)
    }

    pub fn is_owner(&self, principal: &Principal) -> bool {
        self.project.owner_id == principal.user_id
    }
}

/// A task resolved through its project's access rules. A task whose project
/// the principal cannot read reports "Task not found".
#[derive(Debug)]
pub struct TaskAccess {
    pub task: task::Model,
    pub access: ProjectAccess,
}

impl TaskAccess {
    pub async fn load<C: ConnectionTrait>(
        db: &C,
        task_id: Uuid,
        principal: &Principal,
    ) -> Result<Self, ApiError> {
        let task = Task::find_by_id(task_id)
            .one(db)
            .await?
            .ok_or_else(|| ApiError::not_found("Task"))?;

        let access = match ProjectAccess::load(db, task.project_id, principal).await {
            Err(ApiError::NotFound(_)) => return Err(ApiError::not_found("Task")),
            other => other?,
        };

        Ok(Self { task, access })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_check_follows_rank_order() {
        let roles = [
            ProjectRole::Viewer,
            ProjectRole::Member,
            ProjectRole::Admin,
            ProjectRole::Owner,
        ];
        for (i, actual) in roles.iter().enumerate() {
            for (j, required) in roles.iter().enumerate() {
                assert_eq!(
                    check_role(*actual, *required).is_ok(),
                    i >= j,
                    "check_role({actual:?}, {required:?})"
                );
            }
        }
    }

    #[test]
    fn insufficient_rank_is_forbidden() {
        match check_role(ProjectRole::Viewer, ProjectRole::Admin) {
            Err(ApiError::Forbidden(_)) => {}
            other => panic!("expected Forbidden, got {other:?}"),
        }
    }

    #[test]
    fn owner_outranks_everything() {
        for required in [
            ProjectRole::Viewer,
            ProjectRole::Member,
            ProjectRole::Admin,
            ProjectRole::Owner,
        ] {
            assert!(check_role(ProjectRole::Owner, required).is_ok());
        }
    }
}
