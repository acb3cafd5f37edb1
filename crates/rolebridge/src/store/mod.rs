//! Application user and role store.
//!
//! The store owns role definitions and assignments; the service only reads
//! them (the write helpers on [`SqliteStore`] exist for provisioning and tests).

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use rolebridge_types::{AppRole, AppUser, PlatformUserId};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("invalid stored id {0}")]
    InvalidId(i64),
    #[error("id {0} does not fit the database integer type")]
    IdOutOfRange(u64),
}

/// Which application roles to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoleFilter {
    #[default]
    All,
    /// Only roles linked to a guild role.
    Linked,
}

/// Read access to application users and roles.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn user_by_id(&self, id: &str) -> Result<Option<AppUser>, StoreError>;

    /// The user whose linked platform account is `platform_id`.
    async fn user_by_platform_id(
        &self,
        platform_id: PlatformUserId,
    ) -> Result<Option<AppUser>, StoreError>;

    async fn roles(&self, filter: RoleFilter) -> Result<Vec<AppRole>, StoreError>;

    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<(), StoreError>;
}
