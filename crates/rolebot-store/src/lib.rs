//! SQLite adapter for the role table.
//!
//! This crate implements the `rolebot-core` RoleStore port over sqlx. The
//! schema is created idempotently on connect; the unique index over
//! `(group_id, user_id, role)` is what turns a racing duplicate insert into
//! a harmless 0-row no-op instead of silent corruption.

use std::path::Path;

use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    QueryBuilder, Sqlite,
};
use tracing::info;

use rolebot_core::{
    domain::{ChatId, RoleRecord, UserId},
    store::{RoleFilter, RoleStore},
    Error, Result,
};

pub struct SqliteRoleStore {
    pool: SqlitePool,
}

impl SqliteRoleStore {
    /// Open (creating if missing) the database file and ensure the schema.
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(map_err)?;

        let store = Self { pool };
        store.init_schema().await?;
        info!("role table ready at {}", path.display());
        Ok(store)
    }

    /// In-memory database, mainly for tests.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(map_err)?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS roletable (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 user_id INTEGER NOT NULL,
                 group_id INTEGER NOT NULL,
                 role TEXT NOT NULL
             )",
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        // Uniqueness of (group_id, user_id, role) is an invariant, not a
        // caller courtesy.
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS roletable_membership
                 ON roletable(group_id, user_id, role)",
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS roletable_group_role
                 ON roletable(group_id, role)",
        )
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(())
    }
}

fn map_err(e: sqlx::Error) -> Error {
    Error::Storage(e.to_string())
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &RoleFilter) {
    let mut sep = " WHERE ";
    if let Some(group_id) = filter.group_id {
        qb.push(sep).push("group_id = ").push_bind(group_id.0);
        sep = " AND ";
    }
    if let Some(user_id) = filter.user_id {
        qb.push(sep).push("user_id = ").push_bind(user_id.0);
        sep = " AND ";
    }
    if let Some(role) = &filter.role {
        qb.push(sep).push("role = ").push_bind(role.clone());
    }
}

#[async_trait]
impl RoleStore for SqliteRoleStore {
    async fn exists(&self, group_id: ChatId, role: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM roletable WHERE group_id = ? AND role = ?",
        )
        .bind(group_id.0)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(count > 0)
    }

    async fn select(&self, filter: &RoleFilter) -> Result<Vec<RoleRecord>> {
        let mut qb = QueryBuilder::new("SELECT id, user_id, group_id, role FROM roletable");
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY id");

        let rows: Vec<(i64, i64, i64, String)> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, group_id, role)| RoleRecord {
                id,
                user_id: UserId(user_id),
                group_id: ChatId(group_id),
                role,
            })
            .collect())
    }

    async fn insert(&self, user_id: UserId, group_id: ChatId, role: &str) -> Result<u64> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO roletable(user_id, group_id, role) VALUES (?, ?, ?)",
        )
        .bind(user_id.0)
        .bind(group_id.0)
        .bind(role)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, filter: &RoleFilter) -> Result<u64> {
        let mut qb = QueryBuilder::new("DELETE FROM roletable");
        push_filter(&mut qb, filter);

        let result = qb.build().execute(&self.pool).await.map_err(map_err)?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolebot_core::domain::{RoleName, SENTINEL_USER};

    const GROUP: ChatId = ChatId(-100);
    const OTHER_GROUP: ChatId = ChatId(-200);

    fn role(name: &str) -> RoleName {
        RoleName::parse_mention(&format!("@{name}")).expect("valid role")
    }

    #[tokio::test]
    async fn create_exists_purge_round_trip() {
        let store = SqliteRoleStore::connect_in_memory().await.unwrap();

        assert!(!store.exists(GROUP, "devteam").await.unwrap());
        assert_eq!(store.insert(SENTINEL_USER, GROUP, "devteam").await.unwrap(), 1);
        assert!(store.exists(GROUP, "devteam").await.unwrap());
        // Same role name in another group is a different role.
        assert!(!store.exists(OTHER_GROUP, "devteam").await.unwrap());

        store.insert(UserId(1), GROUP, "devteam").await.unwrap();
        let deleted = store
            .delete(&RoleFilter::group_role(GROUP, &role("devteam")))
            .await
            .unwrap();
        assert_eq!(deleted, 2);
        assert!(!store.exists(GROUP, "devteam").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_no_op() {
        let store = SqliteRoleStore::connect_in_memory().await.unwrap();

        assert_eq!(store.insert(UserId(1), GROUP, "devteam").await.unwrap(), 1);
        assert_eq!(store.insert(UserId(1), GROUP, "devteam").await.unwrap(), 0);

        let rows = store
            .select(&RoleFilter::membership(GROUP, UserId(1), &role("devteam")))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        // Same user, different role or group: still fine.
        assert_eq!(store.insert(UserId(1), GROUP, "opsteam").await.unwrap(), 1);
        assert_eq!(
            store.insert(UserId(1), OTHER_GROUP, "devteam").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn select_filters_and_preserves_insertion_order() {
        let store = SqliteRoleStore::connect_in_memory().await.unwrap();
        store.insert(UserId(3), GROUP, "devteam").await.unwrap();
        store.insert(UserId(1), GROUP, "devteam").await.unwrap();
        store.insert(UserId(2), GROUP, "opsteam").await.unwrap();
        store.insert(UserId(1), OTHER_GROUP, "devteam").await.unwrap();

        let rows = store
            .select(&RoleFilter::group_role(GROUP, &role("devteam")))
            .await
            .unwrap();
        let users: Vec<i64> = rows.iter().map(|r| r.user_id.0).collect();
        assert_eq!(users, vec![3, 1]);

        let rows = store.select(&RoleFilter::user(UserId(1))).await.unwrap();
        assert_eq!(rows.len(), 2);

        // Empty filter returns every row.
        let all = store.select(&RoleFilter::default()).await.unwrap();
        assert_eq!(all.len(), 4);
        let ids: Vec<i64> = all.iter().map(|r| r.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn delete_counts_matching_rows() {
        let store = SqliteRoleStore::connect_in_memory().await.unwrap();
        store.insert(UserId(1), GROUP, "devteam").await.unwrap();
        store.insert(UserId(2), GROUP, "devteam").await.unwrap();
        store.insert(UserId(1), GROUP, "opsteam").await.unwrap();

        let deleted = store
            .delete(&RoleFilter::membership(GROUP, UserId(1), &role("devteam")))
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let deleted = store
            .delete(&RoleFilter::membership(GROUP, UserId(1), &role("devteam")))
            .await
            .unwrap();
        assert_eq!(deleted, 0);

        assert_eq!(store.select(&RoleFilter::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn schema_init_is_idempotent() {
        let store = SqliteRoleStore::connect_in_memory().await.unwrap();
        store.insert(UserId(1), GROUP, "devteam").await.unwrap();
        store.init_schema().await.unwrap();
        assert!(store.exists(GROUP, "devteam").await.unwrap());
    }
}
