//! Connection settings and tenant (studio) primitives shared by the suite.

use std::time::Duration;

use chrono::Utc;
use entity::{studio_users, studios};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbErr, EntityTrait, QueryFilter, Set,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Shared connection pool alias.
pub type DbPool = DatabaseConnection;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database url missing (env {0})")]
    MissingUrl(String),
    #[error("database error: {0}")]
    Db(#[from] DbErr),
}

pub type DbResult<T> = Result<T, DbError>;

/// Environment-driven pool settings.
#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_url_key")]
    env_key: String,
    #[serde(default = "default_max_connections")]
    max_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    acquire_timeout_secs: u64,
}

fn default_url_key() -> String {
    "DATABASE_URL".to_string()
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    3
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            env_key: default_url_key(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

impl DatabaseSettings {
    pub fn new(env_key: impl Into<String>) -> Self {
        Self {
            env_key: env_key.into(),
            ..Self::default()
        }
    }

    /// Reads `DATABASE_MAX_CONNECTIONS` on top of the defaults.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(max) = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
        {
            settings.max_connections = max;
        }
        settings
    }

    pub fn database_url(&self) -> DbResult<String> {
        std::env::var(&self.env_key).map_err(|_| DbError::MissingUrl(self.env_key.clone()))
    }
}

pub async fn connect(settings: &DatabaseSettings) -> DbResult<DbPool> {
    let url = settings.database_url()?;
    let mut options = ConnectOptions::new(url);
    options
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .sqlx_logging(false);
    let pool = Database::connect(options).await?;
    info!("database connection established");
    Ok(pool)
}

pub async fn find_studio_by_slug<C>(conn: &C, slug: &str) -> DbResult<Option<studios::Model>>
where
    C: ConnectionTrait,
{
    let studio = studios::Entity::find()
        .filter(studios::Column::Slug.eq(slug))
        .one(conn)
        .await?;
    Ok(studio)
}

/// Creates the studio on first boot; returns the existing row otherwise.
pub async fn ensure_studio<C>(conn: &C, slug: &str, name: &str) -> DbResult<studios::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = find_studio_by_slug(conn, slug).await? {
        return Ok(existing);
    }
    let model = studios::ActiveModel {
        id: Set(Uuid::new_v4()),
        slug: Set(slug.to_string()),
        name: Set(name.to_string()),
        created_at: Set(Utc::now().into()),
    };
    let studio = model.insert(conn).await?;
    info!(studio = %studio.slug, "studio provisioned");
    Ok(studio)
}

/// Maps a platform user onto the studio-scoped identity, if they belong to it.
pub async fn find_studio_user<C>(
    conn: &C,
    studio_id: Uuid,
    platform_user_id: Uuid,
) -> DbResult<Option<studio_users::Model>>
where
    C: ConnectionTrait,
{
    let user = studio_users::Entity::find()
        .filter(studio_users::Column::StudioId.eq(studio_id))
        .filter(studio_users::Column::PlatformUserId.eq(platform_user_id))
        .filter(studio_users::Column::IsActive.eq(true))
        .one(conn)
        .await?;
    Ok(user)
}

pub async fn ensure_studio_user<C>(
    conn: &C,
    studio_id: Uuid,
    platform_user_id: Uuid,
    display_name: &str,
) -> DbResult<studio_users::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = find_studio_user(conn, studio_id, platform_user_id).await? {
        return Ok(existing);
    }
    let model = studio_users::ActiveModel {
        id: Set(Uuid::new_v4()),
        studio_id: Set(studio_id),
        platform_user_id: Set(platform_user_id),
        display_name: Set(display_name.to_string()),
        is_active: Set(true),
        created_at: Set(Utc::now().into()),
    };
    Ok(model.insert(conn).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_to_database_url() {
        let settings = DatabaseSettings::default();
        assert_eq!(settings.env_key, "DATABASE_URL");
        assert_eq!(settings.max_connections, 10);
    }

    #[test]
    fn missing_url_names_the_variable() {
        let settings = DatabaseSettings::new("STUDIO_SUITE_TEST_UNSET_URL");
        let err = settings.database_url().unwrap_err();
        assert!(err.to_string().contains("STUDIO_SUITE_TEST_UNSET_URL"));
    }

    #[tokio::test]
    async fn ensure_studio_is_idempotent() {
        let conn = Database::connect("sqlite::memory:").await.unwrap();
        conn.execute_unprepared(
            "CREATE TABLE studios (id BLOB PRIMARY KEY, slug TEXT NOT NULL UNIQUE, \
             name TEXT NOT NULL, created_at TEXT NOT NULL)",
        )
        .await
        .unwrap();
        let first = ensure_studio(&conn, "lumen", "Lumen Foto").await.unwrap();
        let second = ensure_studio(&conn, "lumen", "Otro nombre").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Lumen Foto");
    }
}
