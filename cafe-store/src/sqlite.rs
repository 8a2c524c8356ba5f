//! sqlite-backed [`Datastore`]. Schemas match `spec.md` §6 byte-for-byte in
//! spirit: `sessions(cafeId PK, access, refresh, expiry)`,
//! `cafe_requests(id PK, targetId, cafeId, type, date, attempts DEFAULT 0,
//! status DEFAULT 0)`, `nonces(value PK, address, date)`.
//!
//! Grounded on the example pack's "single small connection pool behind a
//! trait object" shape (`TaceoLabs-oprf-service`'s `PostgresSecretManager`):
//! this table set is single-writer per `spec.md` §5, so the pool is capped
//! small rather than sized for read fan-out.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, Row, SqlitePool};

use cafe_types::{CafeId, RequestId, RequestKind, RequestStatus, TargetId};

use crate::error::StoreError;
use crate::model::{Nonce, Request, Session};
use crate::traits::Datastore;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    cafe_id TEXT PRIMARY KEY,
    access TEXT NOT NULL,
    refresh TEXT NOT NULL,
    expiry TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cafe_requests (
    id TEXT PRIMARY KEY,
    target_id TEXT NOT NULL,
    cafe_id TEXT NOT NULL,
    type INTEGER NOT NULL,
    date TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    status INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_cafe_requests_pending
    ON cafe_requests (target_id, cafe_id, type)
    WHERE status = 0;

CREATE TABLE IF NOT EXISTS nonces (
    value TEXT PRIMARY KEY,
    address TEXT NOT NULL,
    date TEXT NOT NULL
);
"#;

/// A sqlite-backed [`Datastore`]. The pool is capped to a single connection:
/// every table here has exactly one writer (`spec.md` §5 "Shared
/// resources"), so there is no benefit to a larger pool and it keeps
/// sqlite's file-level locking simple.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))
            .map_err(sqlx::Error::from)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }
}

fn kind_to_i64(kind: RequestKind) -> i64 {
    match kind {
        RequestKind::Store => 0,
        RequestKind::Unstore => 1,
        RequestKind::StoreThread => 2,
        RequestKind::UnstoreThread => 3,
        RequestKind::Inbox => 4,
        RequestKind::PublishPeer => 5,
    }
}

fn kind_from_i64(v: i64) -> Result<RequestKind, StoreError> {
    Ok(match v {
        0 => RequestKind::Store,
        1 => RequestKind::Unstore,
        2 => RequestKind::StoreThread,
        3 => RequestKind::UnstoreThread,
        4 => RequestKind::Inbox,
        5 => RequestKind::PublishPeer,
        other => return Err(StoreError::CorruptRow(format!("unknown request kind {other}"))),
    })
}

fn status_to_i64(status: RequestStatus) -> i64 {
    match status {
        RequestStatus::Pending => 0,
        RequestStatus::InFlight => 1,
        RequestStatus::Failed => 2,
    }
}

fn status_from_i64(v: i64) -> Result<RequestStatus, StoreError> {
    Ok(match v {
        0 => RequestStatus::Pending,
        1 => RequestStatus::InFlight,
        2 => RequestStatus::Failed,
        other => return Err(StoreError::CorruptRow(format!("unknown request status {other}"))),
    })
}

fn request_id_from_str(s: &str) -> Result<RequestId, StoreError> {
    RequestId::from_str(s).map_err(|e| StoreError::CorruptRow(e.to_string()))
}

struct SessionRow {
    cafe_id: String,
    access: String,
    refresh: String,
    expiry: DateTime<Utc>,
}

impl FromRow<'_, sqlx::sqlite::SqliteRow> for SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            cafe_id: row.try_get("cafe_id")?,
            access: row.try_get("access")?,
            refresh: row.try_get("refresh")?,
            expiry: row.try_get("expiry")?,
        })
    }
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            cafe_id: CafeId(row.cafe_id),
            access: row.access,
            refresh: row.refresh,
            expiry: row.expiry,
        }
    }
}

struct RequestRow {
    id: String,
    target_id: String,
    cafe_id: String,
    r#type: i64,
    date: DateTime<Utc>,
    attempts: i64,
    status: i64,
}

impl FromRow<'_, sqlx::sqlite::SqliteRow> for RequestRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            target_id: row.try_get("target_id")?,
            cafe_id: row.try_get("cafe_id")?,
            r#type: row.try_get("type")?,
            date: row.try_get("date")?,
            attempts: row.try_get("attempts")?,
            status: row.try_get("status")?,
        })
    }
}

impl RequestRow {
    fn into_request(self) -> Result<Request, StoreError> {
        Ok(Request {
            id: request_id_from_str(&self.id)?,
            target_id: TargetId(self.target_id),
            cafe_id: CafeId(self.cafe_id),
            kind: kind_from_i64(self.r#type)?,
            created_at: self.date,
            attempts: self.attempts as u32,
            status: status_from_i64(self.status)?,
        })
    }
}

struct NonceRow {
    value: String,
    address: String,
    date: DateTime<Utc>,
}

impl FromRow<'_, sqlx::sqlite::SqliteRow> for NonceRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            value: row.try_get("value")?,
            address: row.try_get("address")?,
            date: row.try_get("date")?,
        })
    }
}

impl From<NonceRow> for Nonce {
    fn from(row: NonceRow) -> Self {
        Nonce { value: row.value, address: row.address, created_at: row.date }
    }
}

#[async_trait]
impl Datastore for SqliteStore {
    async fn get_session(&self, cafe_id: &CafeId) -> Result<Option<Session>, StoreError> {
        let row: Option<SessionRow> =
            sqlx::query_as("SELECT cafe_id, access, refresh, expiry FROM sessions WHERE cafe_id = ?")
                .bind(&cafe_id.0)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Into::into))
    }

    async fn put_session(&self, session: Session) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions (cafe_id, access, refresh, expiry) VALUES (?, ?, ?, ?)
             ON CONFLICT(cafe_id) DO UPDATE SET access = excluded.access,
                 refresh = excluded.refresh, expiry = excluded.expiry",
        )
        .bind(&session.cafe_id.0)
        .bind(&session.access)
        .bind(&session.refresh)
        .bind(session.expiry)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_session(&self, cafe_id: &CafeId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE cafe_id = ?")
            .bind(&cafe_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let rows: Vec<SessionRow> =
            sqlx::query_as("SELECT cafe_id, access, refresh, expiry FROM sessions").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_request(&self, request: Request) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO cafe_requests (id, target_id, cafe_id, type, date, attempts, status)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.id.to_string())
        .bind(&request.target_id.0)
        .bind(&request.cafe_id.0)
        .bind(kind_to_i64(request.kind))
        .bind(request.created_at)
        .bind(request.attempts as i64)
        .bind(status_to_i64(request.status))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<Request>, StoreError> {
        let row: Option<RequestRow> = sqlx::query_as(
            "SELECT id, target_id, cafe_id, type, date, attempts, status FROM cafe_requests WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(RequestRow::into_request).transpose()
    }

    async fn delete_request(&self, id: RequestId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM cafe_requests WHERE id = ?").bind(id.to_string()).execute(&self.pool).await?;
        Ok(())
    }

    async fn find_pending_request(
        &self,
        target_id: &TargetId,
        cafe_id: &CafeId,
        kind: RequestKind,
    ) -> Result<Option<Request>, StoreError> {
        let row: Option<RequestRow> = sqlx::query_as(
            "SELECT id, target_id, cafe_id, type, date, attempts, status FROM cafe_requests
             WHERE target_id = ? AND cafe_id = ? AND type = ? AND status = 0",
        )
        .bind(&target_id.0)
        .bind(&cafe_id.0)
        .bind(kind_to_i64(kind))
        .fetch_optional(&self.pool)
        .await?;
        row.map(RequestRow::into_request).transpose()
    }

    async fn list_pending_requests(&self) -> Result<Vec<Request>, StoreError> {
        let rows: Vec<RequestRow> = sqlx::query_as(
            "SELECT id, target_id, cafe_id, type, date, attempts, status FROM cafe_requests WHERE status = 0",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RequestRow::into_request).collect()
    }

    async fn list_failed_requests(&self) -> Result<Vec<Request>, StoreError> {
        let rows: Vec<RequestRow> = sqlx::query_as(
            "SELECT id, target_id, cafe_id, type, date, attempts, status FROM cafe_requests WHERE status = 2",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(RequestRow::into_request).collect()
    }

    async fn mark_in_flight(&self, id: RequestId) -> Result<(), StoreError> {
        sqlx::query("UPDATE cafe_requests SET status = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revert_to_pending(
        &self,
        id: RequestId,
        attempts: u32,
        touched_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE cafe_requests SET status = 0, attempts = ?, date = ? WHERE id = ?")
            .bind(attempts as i64)
            .bind(touched_at)
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn mark_failed(&self, id: RequestId) -> Result<(), StoreError> {
        sqlx::query("UPDATE cafe_requests SET status = 2 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fail_all_for_cafe(&self, cafe_id: &CafeId) -> Result<(), StoreError> {
        sqlx::query("UPDATE cafe_requests SET status = 2 WHERE cafe_id = ? AND status != 2")
            .bind(&cafe_id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn retry_failed(&self, id: RequestId) -> Result<(), StoreError> {
        sqlx::query("UPDATE cafe_requests SET status = 0, attempts = 0 WHERE id = ? AND status = 2")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn put_nonce(&self, nonce: Nonce) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO nonces (value, address, date) VALUES (?, ?, ?)
             ON CONFLICT(value) DO UPDATE SET address = excluded.address, date = excluded.date",
        )
        .bind(&nonce.value)
        .bind(&nonce.address)
        .bind(nonce.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn take_nonce(&self, value: &str) -> Result<Option<Nonce>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let row: Option<NonceRow> = sqlx::query_as("SELECT value, address, date FROM nonces WHERE value = ?")
            .bind(value)
            .fetch_optional(&mut *tx)
            .await?;
        if row.is_some() {
            sqlx::query("DELETE FROM nonces WHERE value = ?").bind(value).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(row.map(Into::into))
    }

    async fn purge_expired_nonces(&self, older_than: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM nonces WHERE date < ?").bind(older_than).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_types::RequestId;

    fn sample_request(id: (u64, u64)) -> Request {
        Request {
            id: RequestId(id.0, id.1),
            target_id: TargetId("QmA".into()),
            cafe_id: CafeId("cafe1".into()),
            kind: RequestKind::Store,
            created_at: Utc::now(),
            attempts: 0,
            status: RequestStatus::Pending,
        }
    }

    #[tokio::test]
    async fn insert_then_find_pending_round_trips() {
        let store = SqliteStore::in_memory().await.unwrap();
        let request = sample_request((1, 1));
        store.insert_request(request.clone()).await.unwrap();
        let found = store
            .find_pending_request(&request.target_id, &request.cafe_id, request.kind)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, request.id);
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let store = SqliteStore::in_memory().await.unwrap();
        let request = sample_request((2, 1));
        store.insert_request(request.clone()).await.unwrap();
        store.delete_request(request.id).await.unwrap();
        assert!(store.get_request(request.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn mark_in_flight_then_revert_bumps_attempts() {
        let store = SqliteStore::in_memory().await.unwrap();
        let request = sample_request((3, 1));
        store.insert_request(request.clone()).await.unwrap();
        store.mark_in_flight(request.id).await.unwrap();
        assert!(store.list_pending_requests().await.unwrap().is_empty());
        store.revert_to_pending(request.id, 1, Utc::now()).await.unwrap();
        let pending = store.list_pending_requests().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 1);
    }

    #[tokio::test]
    async fn nonce_is_consumed_on_take() {
        let store = SqliteStore::in_memory().await.unwrap();
        let nonce = Nonce { value: "n1".into(), address: "addr".into(), created_at: Utc::now() };
        store.put_nonce(nonce.clone()).await.unwrap();
        let taken = store.take_nonce("n1").await.unwrap().unwrap();
        assert_eq!(taken.address, "addr");
        assert!(store.take_nonce("n1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn session_upsert_overwrites() {
        let store = SqliteStore::in_memory().await.unwrap();
        let cafe_id = CafeId("cafe1".into());
        store
            .put_session(Session { cafe_id: cafe_id.clone(), access: "a1".into(), refresh: "r1".into(), expiry: Utc::now() })
            .await
            .unwrap();
        store
            .put_session(Session { cafe_id: cafe_id.clone(), access: "a2".into(), refresh: "r2".into(), expiry: Utc::now() })
            .await
            .unwrap();
        let sessions = store.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].access, "a2");
    }

    #[tokio::test]
    async fn fail_all_for_cafe_marks_pending_rows_failed() {
        let store = SqliteStore::in_memory().await.unwrap();
        let request = sample_request((4, 1));
        store.insert_request(request.clone()).await.unwrap();
        store.fail_all_for_cafe(&request.cafe_id).await.unwrap();
        assert!(store.list_pending_requests().await.unwrap().is_empty());
        assert_eq!(store.list_failed_requests().await.unwrap().len(), 1);
    }
}
