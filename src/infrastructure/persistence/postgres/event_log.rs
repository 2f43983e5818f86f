//! # PostgreSQL Event Log
//!
//! PostgreSQL implementation of [`EventLog`] using sqlx.
//!
//! Journal entries go to `fsm_journal`, snapshots to `fsm_snapshots`; both use
//! JSONB payloads. The schema ships in `migrations/`.

use crate::domain::value_objects::{EventId, PersistenceId, Timestamp};
use crate::infrastructure::persistence::traits::{
    EventLog, EventLogError, EventLogResult, JournalEntry, SnapshotRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// PostgreSQL implementation of [`EventLog`].
///
/// Append-only: entries are inserted, never updated or deleted. An append is
/// only accepted if it is exactly one past the stored maximum sequence number
/// for its persistence id.
///
/// # Examples
///
/// ```ignore
/// use sqlx::PgPool;
/// use rfq_fsm::infrastructure::persistence::postgres::PostgresEventLog;
///
/// let pool = PgPool::connect("postgres://...").await?;
/// let log = PostgresEventLog::new(pool);
/// ```
#[derive(Debug, Clone)]
pub struct PostgresEventLog {
    pool: PgPool,
}

impl PostgresEventLog {
    /// Creates a new PostgreSQL event log.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_sqlx_error(err: sqlx::Error) -> EventLogError {
    match err {
        sqlx::Error::PoolTimedOut => EventLogError::timeout("connection pool timed out"),
        sqlx::Error::Io(e) => EventLogError::connection(e.to_string()),
        sqlx::Error::PoolClosed => EventLogError::connection("connection pool closed"),
        other => EventLogError::query(other.to_string()),
    }
}

fn to_i64(value: u64) -> EventLogResult<i64> {
    i64::try_from(value).map_err(|e| EventLogError::serialization(e.to_string()))
}

fn to_u64(value: i64) -> EventLogResult<u64> {
    u64::try_from(value).map_err(|e| EventLogError::deserialization(e.to_string()))
}

#[async_trait]
impl EventLog for PostgresEventLog {
    async fn append(&self, entry: JournalEntry) -> EventLogResult<()> {
        let sequence_nr = to_i64(entry.sequence_nr)?;
        let timeout_ms = entry.state_timeout_ms.map(to_i64).transpose()?;

        let result = sqlx::query(
            r#"
            INSERT INTO fsm_journal (
                persistence_id, sequence_nr, event_id, event_name,
                payload, state, state_timeout_ms, recorded_at
            )
            SELECT $1, $2, $3, $4, $5, $6, $7, $8
            WHERE COALESCE(
                (SELECT MAX(sequence_nr) FROM fsm_journal WHERE persistence_id = $1), 0
            ) + 1 = $2
            "#,
        )
        .bind(entry.persistence_id.as_str())
        .bind(sequence_nr)
        .bind(entry.event_id.as_uuid())
        .bind(entry.event_name.as_deref())
        .bind(&entry.payload)
        .bind(&entry.state)
        .bind(timeout_ms)
        .bind(*entry.recorded_at.as_datetime())
        .execute(&self.pool)
        .await;

        let inserted = match result {
            Ok(done) => done.rows_affected(),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => 0,
            Err(e) => return Err(map_sqlx_error(e)),
        };

        if inserted == 0 {
            let highest = self.highest_sequence_nr(&entry.persistence_id).await?;
            return Err(EventLogError::sequence_conflict(
                &entry.persistence_id,
                highest.saturating_add(1),
                entry.sequence_nr,
            ));
        }

        Ok(())
    }

    async fn read_from(
        &self,
        persistence_id: &PersistenceId,
        after_sequence_nr: u64,
    ) -> EventLogResult<Vec<JournalEntry>> {
        let rows: Vec<JournalRow> = sqlx::query_as(
            r#"
            SELECT persistence_id, sequence_nr, event_id, event_name,
                   payload, state, state_timeout_ms, recorded_at
            FROM fsm_journal
            WHERE persistence_id = $1 AND sequence_nr > $2
            ORDER BY sequence_nr ASC
            "#,
        )
        .bind(persistence_id.as_str())
        .bind(to_i64(after_sequence_nr)?)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JournalRow::try_into_entry).collect()
    }

    async fn write_snapshot(&self, snapshot: SnapshotRecord) -> EventLogResult<()> {
        sqlx::query(
            r#"
            INSERT INTO fsm_snapshots (
                persistence_id, sequence_nr, state, data, state_timeout_ms, taken_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (persistence_id, sequence_nr)
            DO UPDATE SET
                state = EXCLUDED.state,
                data = EXCLUDED.data,
                state_timeout_ms = EXCLUDED.state_timeout_ms,
                taken_at = EXCLUDED.taken_at
            "#,
        )
        .bind(snapshot.persistence_id.as_str())
        .bind(to_i64(snapshot.sequence_nr)?)
        .bind(&snapshot.state)
        .bind(&snapshot.data)
        .bind(snapshot.state_timeout_ms.map(to_i64).transpose()?)
        .bind(*snapshot.taken_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn read_latest_snapshot(
        &self,
        persistence_id: &PersistenceId,
    ) -> EventLogResult<Option<SnapshotRecord>> {
        let row: Option<SnapshotRow> = sqlx::query_as(
            r#"
            SELECT persistence_id, sequence_nr, state, data, state_timeout_ms, taken_at
            FROM fsm_snapshots
            WHERE persistence_id = $1
            ORDER BY sequence_nr DESC, taken_at DESC
            LIMIT 1
            "#,
        )
        .bind(persistence_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(SnapshotRow::try_into_record).transpose()
    }

    async fn highest_sequence_nr(&self, persistence_id: &PersistenceId) -> EventLogResult<u64> {
        let (max,): (Option<i64>,) =
            sqlx::query_as("SELECT MAX(sequence_nr) FROM fsm_journal WHERE persistence_id = $1")
                .bind(persistence_id.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        max.map_or(Ok(0), to_u64)
    }
}

/// Row type for journal queries.
#[derive(Debug, sqlx::FromRow)]
struct JournalRow {
    persistence_id: String,
    sequence_nr: i64,
    event_id: Uuid,
    event_name: Option<String>,
    payload: Option<serde_json::Value>,
    state: serde_json::Value,
    state_timeout_ms: Option<i64>,
    recorded_at: DateTime<Utc>,
}

impl JournalRow {
    fn try_into_entry(self) -> EventLogResult<JournalEntry> {
        Ok(JournalEntry {
            persistence_id: PersistenceId::new(self.persistence_id),
            sequence_nr: to_u64(self.sequence_nr)?,
            event_id: EventId::new(self.event_id),
            event_name: self.event_name,
            payload: self.payload,
            state: self.state,
            state_timeout_ms: self.state_timeout_ms.map(to_u64).transpose()?,
            recorded_at: Timestamp::from(self.recorded_at),
        })
    }
}

/// Row type for snapshot queries.
#[derive(Debug, sqlx::FromRow)]
struct SnapshotRow {
    persistence_id: String,
    sequence_nr: i64,
    state: serde_json::Value,
    data: serde_json::Value,
    state_timeout_ms: Option<i64>,
    taken_at: DateTime<Utc>,
}

impl SnapshotRow {
    fn try_into_record(self) -> EventLogResult<SnapshotRecord> {
        Ok(SnapshotRecord {
            persistence_id: PersistenceId::new(self.persistence_id),
            sequence_nr: to_u64(self.sequence_nr)?,
            state: self.state,
            data: self.data,
            state_timeout_ms: self.state_timeout_ms.map(to_u64).transpose()?,
            taken_at: Timestamp::from(self.taken_at),
        })
    }
}
