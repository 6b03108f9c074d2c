use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create Panchayath Table
        let table = table_auto(Panchayath::Table)
            .col(pk_uuid(Panchayath::Id))
            .col(string(Panchayath::Name))
            .col(string(Panchayath::District))
            .col(string(Panchayath::State))
            .to_owned();
        manager.create_table(table).await?;

        // Create Agent Table
        let table = table_auto(Agent::Table)
            .col(pk_uuid(Agent::Id))
            .col(string(Agent::Name))
            .col(string_uniq(Agent::Phone))
            .col(string(Agent::Role))
            .col(uuid(Agent::PanchayathId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_agent_panchayath")
                    .from(Agent::Table, Agent::PanchayathId)
                    .to(Panchayath::Table, Panchayath::Id)
                    .on_delete(ForeignKeyAction::Restrict),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create ManagementTeam Table
        let table = table_auto(ManagementTeam::Table)
            .col(pk_uuid(ManagementTeam::Id))
            .col(string(ManagementTeam::Name))
            .col(string_null(ManagementTeam::Description))
            .to_owned();
        manager.create_table(table).await?;

        // Create ManagementTeamMember Table
        let table = table_auto(ManagementTeamMember::Table)
            .col(pk_uuid(ManagementTeamMember::Id))
            .col(uuid(ManagementTeamMember::TeamId))
            .col(uuid(ManagementTeamMember::AgentId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_team_member_team")
                    .from(ManagementTeamMember::Table, ManagementTeamMember::TeamId)
                    .to(ManagementTeam::Table, ManagementTeam::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_team_member_agent")
                    .from(ManagementTeamMember::Table, ManagementTeamMember::AgentId)
                    .to(Agent::Table, Agent::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create Task Table
        let table = table_auto(Task::Table)
            .col(pk_uuid(Task::Id))
            .col(string(Task::Title))
            .col(string_null(Task::Description))
            .col(string(Task::Status).default("pending"))
            .col(string(Task::Priority).default("normal"))
            .col(timestamp_null(Task::DueDate))
            .col(uuid_null(Task::AllocatedToAgent))
            .col(uuid_null(Task::AllocatedToTeam))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_task_agent")
                    .from(Task::Table, Task::AllocatedToAgent)
                    .to(Agent::Table, Agent::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .foreign_key(
                ForeignKey::create()
                    .name("fk_task_team")
                    .from(Task::Table, Task::AllocatedToTeam)
                    .to(ManagementTeam::Table, ManagementTeam::Id)
                    .on_delete(ForeignKeyAction::SetNull),
            )
            .check(
                Expr::col(Task::AllocatedToAgent)
                    .is_null()
                    .or(Expr::col(Task::AllocatedToTeam).is_null()),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create TaskRemark Table
        let table = table_auto(TaskRemark::Table)
            .col(pk_uuid(TaskRemark::Id))
            .col(uuid(TaskRemark::TaskId))
            .col(text(TaskRemark::Remark))
            .col(string_null(TaskRemark::UpdatedBy))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_task_remark_task")
                    .from(TaskRemark::Table, TaskRemark::TaskId)
                    .to(Task::Table, Task::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // Create DailyActivity Table
        let table = table_auto(DailyActivity::Table)
            .col(pk_uuid(DailyActivity::Id))
            .col(uuid(DailyActivity::AgentId))
            .col(string(DailyActivity::MobileNumber))
            .col(date(DailyActivity::ActivityDate))
            .col(text(DailyActivity::ActivityDescription))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_daily_activity_agent")
                    .from(DailyActivity::Table, DailyActivity::AgentId)
                    .to(Agent::Table, Agent::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        // One entry per agent per calendar date
        manager
            .create_index(
                Index::create()
                    .name("idx_daily_activity_agent_date")
                    .table(DailyActivity::Table)
                    .col(DailyActivity::AgentId)
                    .col(DailyActivity::ActivityDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_team_member_unique")
                    .table(ManagementTeamMember::Table)
                    .col(ManagementTeamMember::TeamId)
                    .col(ManagementTeamMember::AgentId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create indices for common lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_agent_panchayath")
                    .table(Agent::Table)
                    .col(Agent::PanchayathId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_task_status")
                    .table(Task::Table)
                    .col(Task::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_task_remark_task")
                    .table(TaskRemark::Table)
                    .col(TaskRemark::TaskId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop all tables in reverse order to avoid foreign key constraints
        manager
            .drop_table(Table::drop().table(DailyActivity::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(TaskRemark::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Task::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ManagementTeamMember::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ManagementTeam::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Agent::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Panchayath::Table).to_owned())
            .await?;

        Ok(())
    }
}
