pub use super::admin_permission::Entity as AdminPermission;
pub use super::admin_role_permission::Entity as AdminRolePermission;
pub use super::admin_user::Entity as AdminUser;
pub use super::agent::Entity as Agent;
pub use super::daily_activity::Entity as DailyActivity;
pub use super::management_team::Entity as ManagementTeam;
pub use super::management_team_member::Entity as ManagementTeamMember;
pub use super::panchayath::Entity as Panchayath;
pub use super::registration_request::Entity as RegistrationRequest;
pub use super::task::Entity as Task;
pub use super::task_remark::Entity as TaskRemark;
