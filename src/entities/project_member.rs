//! ProjectMember entity: who belongs to a project and with which role

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role of a user within one project.
///
/// Declaration order is the permission rank: later variants outrank earlier
/// ones, so the derived `Ord` is the authorization comparison.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectRole {
    /// Read-only access to the project and its tasks
    #[sea_orm(string_value = "VIEWER")]
    Viewer,

    /// May create and edit tasks
    #[sea_orm(string_value = "MEMBER")]
    Member,

    /// May edit the project and manage members
    #[sea_orm(string_value = "ADMIN")]
    Admin,

    /// Exactly one per project, mirrors `projects.owner_id`
    #[sea_orm(string_value = "OWNER")]
    Owner,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_members")]
pub struct Model {
    /// Project UUID (composite primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub project_id: Uuid,

    /// User UUID (composite primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,

    pub role: ProjectRole,

    pub joined_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Project,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
