pub use sea_orm_migration::prelude::*;

mod iden;
mod m20260110_000001_create_core_tables;
mod m20260215_093000_registration_and_admin;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260110_000001_create_core_tables::Migration),
            Box::new(m20260215_093000_registration_and_admin::Migration),
        ]
    }
}
