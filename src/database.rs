use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{NotSet, Set},
    Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    sqlx::PgPool,
};

use crate::auth::user::password_digest;
use crate::entities::{admin_user, prelude::AdminUser};

pub async fn setup_database(db_url: &str) -> anyhow::Result<(DatabaseConnection, PgPool)> {
    let db = Database::connect(db_url)
        .await
        .expect("Cannot connect to db");
    Migrator::up(&db, None).await?;

    let pool = PgPool::connect(db_url).await?;

    Ok((db, pool))
}

/// Creates the first admin user from the environment when the table is
/// empty, so a fresh deployment can be logged into.
pub async fn seed_bootstrap_admin(
    db: &DatabaseConnection,
    username: Option<&str>,
    password: Option<&str>,
) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (username, password) else {
        return Ok(());
    };

    if AdminUser::find().count(db).await? > 0 {
        return Ok(());
    }

    let now = Utc::now().naive_utc();
    admin_user::ActiveModel {
        id: NotSet,
        username: Set(username.to_owned()),
        password_digest: Set(password_digest(password)),
        role: Set("superadmin".to_owned()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    tracing::info!(username, "seeded bootstrap admin user");
    Ok(())
}
