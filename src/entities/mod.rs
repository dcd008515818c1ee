//! Database entities

pub mod project;
pub mod project_member;
pub mod task;
pub mod user;

pub use project::Entity as Project;
pub use project_member::Entity as ProjectMember;
pub use task::Entity as Task;
pub use user::Entity as User;
