use sea_orm_migration::{prelude::*, schema::*};

use crate::iden::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create RegistrationRequest Table
        let table = table_auto(RegistrationRequest::Table)
            .col(pk_uuid(RegistrationRequest::Id))
            .col(string(RegistrationRequest::Username))
            .col(string(RegistrationRequest::MobileNumber))
            .col(uuid(RegistrationRequest::PanchayathId))
            .col(string(RegistrationRequest::Status).default("pending"))
            .col(string_null(RegistrationRequest::ApprovedBy))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_registration_panchayath")
                    .from(
                        RegistrationRequest::Table,
                        RegistrationRequest::PanchayathId,
                    )
                    .to(Panchayath::Table, Panchayath::Id)
                    .on_delete(ForeignKeyAction::Restrict),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_registration_username_mobile")
                    .table(RegistrationRequest::Table)
                    .col(RegistrationRequest::Username)
                    .col(RegistrationRequest::MobileNumber)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create AdminUser Table
        let table = table_auto(AdminUser::Table)
            .col(pk_auto(AdminUser::Id))
            .col(string_uniq(AdminUser::Username))
            .col(string(AdminUser::PasswordDigest))
            .col(string(AdminUser::Role).default("admin"))
            .to_owned();
        manager.create_table(table).await?;

        // Create AdminPermission Table
        let table = table_auto(AdminPermission::Table)
            .col(pk_uuid(AdminPermission::Id))
            .col(string_uniq(AdminPermission::Name))
            .col(string_null(AdminPermission::Description))
            .to_owned();
        manager.create_table(table).await?;

        // Create AdminRolePermission Table
        let table = table_auto(AdminRolePermission::Table)
            .col(pk_uuid(AdminRolePermission::Id))
            .col(string(AdminRolePermission::Role))
            .col(uuid(AdminRolePermission::PermissionId))
            .foreign_key(
                ForeignKey::create()
                    .name("fk_role_permission_permission")
                    .from(
                        AdminRolePermission::Table,
                        AdminRolePermission::PermissionId,
                    )
                    .to(AdminPermission::Table, AdminPermission::Id)
                    .on_delete(ForeignKeyAction::Cascade),
            )
            .to_owned();
        manager.create_table(table).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_role_permission_unique")
                    .table(AdminRolePermission::Table)
                    .col(AdminRolePermission::Role)
                    .col(AdminRolePermission::PermissionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdminRolePermission::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(AdminPermission::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(AdminUser::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(RegistrationRequest::Table).to_owned())
            .await?;

        Ok(())
    }
}
