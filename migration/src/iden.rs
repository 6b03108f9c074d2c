use sea_orm_migration::prelude::*;

// Define table names
#[derive(DeriveIden)]
pub enum Panchayath {
    #[sea_orm(iden = "panchayaths")]
    Table,
    Id,
    Name,
    District,
    State,
}

#[derive(DeriveIden)]
pub enum Agent {
    #[sea_orm(iden = "agents")]
    Table,
    Id,
    Name,
    Phone,
    Role,
    PanchayathId,
}

#[derive(DeriveIden)]
pub enum ManagementTeam {
    #[sea_orm(iden = "management_teams")]
    Table,
    Id,
    Name,
    Description,
}

#[derive(DeriveIden)]
pub enum ManagementTeamMember {
    #[sea_orm(iden = "management_team_members")]
    Table,
    Id,
    TeamId,
    AgentId,
}

#[derive(DeriveIden)]
pub enum Task {
    #[sea_orm(iden = "tasks")]
    Table,
    Id,
    Title,
    Description,
    Status,
    Priority,
    DueDate,
    AllocatedToAgent,
    AllocatedToTeam,
}

#[derive(DeriveIden)]
pub enum TaskRemark {
    #[sea_orm(iden = "task_remarks")]
    Table,
    Id,
    TaskId,
    Remark,
    UpdatedBy,
}

#[derive(DeriveIden)]
pub enum DailyActivity {
    #[sea_orm(iden = "daily_activities")]
    Table,
    Id,
    AgentId,
    MobileNumber,
    ActivityDate,
    ActivityDescription,
}

#[derive(DeriveIden)]
pub enum RegistrationRequest {
    #[sea_orm(iden = "user_registration_requests")]
    Table,
    Id,
    Username,
    MobileNumber,
    PanchayathId,
    Status,
    ApprovedBy,
}

#[derive(DeriveIden)]
pub enum AdminUser {
    #[sea_orm(iden = "admin_users")]
    Table,
    Id,
    Username,
    PasswordDigest,
    Role,
}

#[derive(DeriveIden)]
pub enum AdminPermission {
    #[sea_orm(iden = "admin_permissions")]
    Table,
    Id,
    Name,
    Description,
}

#[derive(DeriveIden)]
pub enum AdminRolePermission {
    #[sea_orm(iden = "admin_role_permissions")]
    Table,
    Id,
    Role,
    PermissionId,
}
