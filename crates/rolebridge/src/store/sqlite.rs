//! SQLite-backed [`UserStore`].

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rolebridge_types::{AppRole, AppUser, PlatformUserId};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, warn};

use super::{RoleFilter, StoreError, UserStore};

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Store handle with connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Open (or create) the database at `path` and apply migrations.
    /// `:memory:` opens a private in-memory database.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let pool = if path == ":memory:" {
            // Unique shared-cache name per call so parallel tests don't collide.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:rolebridge-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );

            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .create_if_missing(true)
                .foreign_keys(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .foreign_keys(true);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await?
        };

        info!(path = %path, "Database connected");

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations checked/applied");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace a user together with its role assignments.
    pub async fn put_user(&self, user: &AppUser) -> Result<(), StoreError> {
        let platform_id = user.platform_id.map(to_db_id).transpose()?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, platform_id) VALUES (?, ?)
            ON CONFLICT (id) DO UPDATE SET platform_id = excluded.platform_id
            "#,
        )
        .bind(&user.id)
        .bind(platform_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM user_roles WHERE user_id = ?")
            .bind(&user.id)
            .execute(&mut *tx)
            .await?;

        for role_id in &user.role_ids {
            sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES (?, ?)")
                .bind(&user.id)
                .bind(role_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Insert or replace a role definition.
    pub async fn put_role(&self, role: &AppRole) -> Result<(), StoreError> {
        let guild_role_id = role.guild_role_id.map(to_db_id).transpose()?;
        sqlx::query(
            r#"
            INSERT INTO roles (id, name, guild_role_id) VALUES (?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                guild_role_id = excluded.guild_role_id
            "#,
        )
        .bind(&role.id)
        .bind(&role.name)
        .bind(guild_role_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn role_ids_for(&self, user_id: &str) -> Result<BTreeSet<String>, StoreError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT role_id FROM user_roles WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn hydrate(&self, row: Option<(String, Option<i64>)>) -> Result<Option<AppUser>, StoreError> {
        let Some((id, platform_id)) = row else {
            return Ok(None);
        };
        let role_ids = self.role_ids_for(&id).await?;
        Ok(Some(AppUser {
            id,
            platform_id: platform_id.map(from_db_id).transpose()?,
            role_ids,
        }))
    }
}

#[async_trait]
impl UserStore for SqliteStore {
    async fn user_by_id(&self, id: &str) -> Result<Option<AppUser>, StoreError> {
        let row: Option<(String, Option<i64>)> =
            sqlx::query_as("SELECT id, platform_id FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        self.hydrate(row).await
    }

    async fn user_by_platform_id(
        &self,
        platform_id: PlatformUserId,
    ) -> Result<Option<AppUser>, StoreError> {
        let row: Option<(String, Option<i64>)> =
            sqlx::query_as("SELECT id, platform_id FROM users WHERE platform_id = ?")
                .bind(to_db_id(platform_id)?)
                .fetch_optional(&self.pool)
                .await?;
        self.hydrate(row).await
    }

    async fn roles(&self, filter: RoleFilter) -> Result<Vec<AppRole>, StoreError> {
        let sql = match filter {
            RoleFilter::All => "SELECT id, name, guild_role_id FROM roles ORDER BY id",
            RoleFilter::Linked => {
                "SELECT id, name, guild_role_id FROM roles WHERE guild_role_id IS NOT NULL ORDER BY id"
            }
        };
        let rows: Vec<(String, String, Option<i64>)> =
            sqlx::query_as(sql).fetch_all(&self.pool).await?;

        rows.into_iter()
            .map(|(id, name, guild_role_id)| {
                Ok(AppRole {
                    id,
                    name,
                    guild_role_id: guild_role_id.map(from_db_id).transpose()?,
                })
            })
            .collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn to_db_id(id: u64) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::IdOutOfRange(id))
}

fn from_db_id(id: i64) -> Result<u64, StoreError> {
    u64::try_from(id).map_err(|_| StoreError::InvalidId(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteStore {
        SqliteStore::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_unknown_user_is_none() {
        let store = store().await;
        assert!(store.user_by_id("missing").await.unwrap().is_none());
        assert!(store.user_by_platform_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_roundtrip_with_roles() {
        let store = store().await;
        store.put_role(&AppRole::new("admin", "Admin").linked_to(10)).await.unwrap();
        store.put_role(&AppRole::new("mod", "Moderator")).await.unwrap();

        let user = AppUser::new("u1")
            .with_platform_id(42)
            .with_role("admin")
            .with_role("mod");
        store.put_user(&user).await.unwrap();

        assert_eq!(store.user_by_id("u1").await.unwrap(), Some(user.clone()));
        assert_eq!(store.user_by_platform_id(42).await.unwrap(), Some(user));
    }

    #[tokio::test]
    async fn test_put_user_replaces_assignments() {
        let store = store().await;
        store.put_role(&AppRole::new("admin", "Admin")).await.unwrap();
        store.put_role(&AppRole::new("mod", "Moderator")).await.unwrap();

        store
            .put_user(&AppUser::new("u1").with_role("admin").with_role("mod"))
            .await
            .unwrap();
        store
            .put_user(&AppUser::new("u1").with_role("mod"))
            .await
            .unwrap();

        let user = store.user_by_id("u1").await.unwrap().unwrap();
        assert!(!user.has_role("admin"));
        assert!(user.has_role("mod"));
        assert_eq!(user.platform_id, None);
    }

    #[tokio::test]
    async fn test_assignment_to_unknown_role_is_rejected() {
        let store = store().await;
        let result = store.put_user(&AppUser::new("u1").with_role("ghost")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_roles_filter() {
        let store = store().await;
        store.put_role(&AppRole::new("a", "Linked").linked_to(10)).await.unwrap();
        store.put_role(&AppRole::new("b", "Unlinked")).await.unwrap();

        let all = store.roles(RoleFilter::All).await.unwrap();
        assert_eq!(all.len(), 2);

        let linked = store.roles(RoleFilter::Linked).await.unwrap();
        assert_eq!(linked, vec![AppRole::new("a", "Linked").linked_to(10)]);
    }

    #[tokio::test]
    async fn test_id_out_of_range() {
        let store = store().await;
        let result = store.user_by_platform_id(u64::MAX).await;
        assert!(matches!(result, Err(StoreError::IdOutOfRange(u64::MAX))));
    }

    #[tokio::test]
    async fn test_ping() {
        let store = store().await;
        store.ping().await.unwrap();
    }
}
