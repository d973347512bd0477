//! Event Store repository
//!
//! All reads and writes against the `machine_events` table. The bulk path
//! (`save_all`) issues one statement per batch via `UNNEST`, matching each
//! row's expected version in the same `ON CONFLICT ... WHERE` clause so a
//! lost race never silently overwrites a newer row. The single-row path
//! (`save_one`) is the per-event fallback the Upsert Engine falls back to
//! when a bulk attempt reports a conflict.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::Event;
use crate::store::error::StoreError;

/// Which column `top_defect_lines` groups by. The caller resolves this
/// once, outside the store, from whichever of `factory_id`/`machine_id`
/// the request asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    FactoryId,
    MachineId,
}

impl GroupBy {
    fn column(self) -> &'static str {
        match self {
            GroupBy::FactoryId => "factory_id",
            GroupBy::MachineId => "machine_id",
        }
    }
}

/// One line in the top-defect-lines ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct DefectLine {
    pub key: String,
    pub total_defects: i64,
    pub event_count: i64,
}

/// Outcome of a bulk `save_all` attempt. `conflicted` carries the event_ids
/// whose expected version no longer matched what was stored; the engine
/// re-reads and retries those one at a time.
#[derive(Debug, Clone, Default)]
pub struct SaveAllOutcome {
    pub succeeded: Vec<String>,
    pub conflicted: Vec<String>,
}

#[derive(Clone)]
pub struct EventStore {
    pool: PgPool,
}

impl EventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, event_id: &str) -> Result<Option<Event>, StoreError> {
        let row = sqlx::query_as!(
            EventRow,
            r#"
            SELECT event_id, machine_id, factory_id, event_time, received_time,
                   duration_ms, defect_count, version
            FROM machine_events
            WHERE event_id = $1
            "#,
            event_id
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    pub async fn find_all_by_ids(&self, event_ids: &[String]) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query_as!(
            EventRow,
            r#"
            SELECT event_id, machine_id, factory_id, event_time, received_time,
                   duration_ms, defect_count, version
            FROM machine_events
            WHERE event_id = ANY($1)
            "#,
            event_ids
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Bulk-upsert `events` in a single statement. Each event's `version`
    /// field is the version the caller expects the existing row (if any)
    /// to be at; a brand-new `event_id` always succeeds since `ON CONFLICT`
    /// never fires for it. A successful write always bumps the stored
    /// version by one over whatever was already there.
    pub async fn save_all(&self, events: &[Event]) -> Result<SaveAllOutcome, StoreError> {
        if events.is_empty() {
            return Ok(SaveAllOutcome::default());
        }

        let event_ids: Vec<String> = events.iter().map(|e| e.event_id.clone()).collect();
        let machine_ids: Vec<String> = events.iter().map(|e| e.machine_id.clone()).collect();
        let factory_ids: Vec<String> = events.iter().map(|e| e.factory_id.clone()).collect();
        let event_times: Vec<DateTime<Utc>> = events.iter().map(|e| e.event_time).collect();
        let received_times: Vec<DateTime<Utc>> = events.iter().map(|e| e.received_time).collect();
        let durations: Vec<i64> = events.iter().map(|e| e.duration_ms).collect();
        let defects: Vec<i32> = events.iter().map(|e| e.defect_count).collect();
        let versions: Vec<i64> = events.iter().map(|e| e.version).collect();

        let returned_ids: Vec<String> = sqlx::query_scalar!(
            r#"
            INSERT INTO machine_events
                (event_id, machine_id, factory_id, event_time, received_time,
                 duration_ms, defect_count, version)
            SELECT * FROM UNNEST(
                $1::text[], $2::text[], $3::text[], $4::timestamptz[],
                $5::timestamptz[], $6::bigint[], $7::int[], $8::bigint[]
            )
            ON CONFLICT (event_id) DO UPDATE SET
                machine_id = EXCLUDED.machine_id,
                factory_id = EXCLUDED.factory_id,
                event_time = EXCLUDED.event_time,
                received_time = EXCLUDED.received_time,
                duration_ms = EXCLUDED.duration_ms,
                defect_count = EXCLUDED.defect_count,
                version = machine_events.version + 1
            WHERE machine_events.version = EXCLUDED.version
            RETURNING event_id
            "#,
            &event_ids,
            &machine_ids,
            &factory_ids,
            &event_times,
            &received_times,
            &durations,
            &defects,
            &versions,
        )
        .fetch_all(&self.pool)
        .await?;

        let succeeded: std::collections::HashSet<&str> =
            returned_ids.iter().map(String::as_str).collect();

        let mut outcome = SaveAllOutcome::default();
        for id in event_ids {
            if succeeded.contains(id.as_str()) {
                outcome.succeeded.push(id);
            } else {
                outcome.conflicted.push(id);
            }
        }

        Ok(outcome)
    }

    /// Single-row upsert, used for per-row fallback after a bulk conflict.
    /// Returns the new stored version on success. On a lost race, fetches
    /// the row's current version so the caller can decide whether to
    /// reclassify and retry, or give up as a genuine conflict.
    pub async fn save_one(&self, event: &Event) -> Result<i64, StoreError> {
        let new_version: Option<i64> = sqlx::query_scalar!(
            r#"
            INSERT INTO machine_events
                (event_id, machine_id, factory_id, event_time, received_time,
                 duration_ms, defect_count, version)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (event_id) DO UPDATE SET
                machine_id = EXCLUDED.machine_id,
                factory_id = EXCLUDED.factory_id,
                event_time = EXCLUDED.event_time,
                received_time = EXCLUDED.received_time,
                duration_ms = EXCLUDED.duration_ms,
                defect_count = EXCLUDED.defect_count,
                version = machine_events.version + 1
            WHERE machine_events.version = $8
            RETURNING version
            "#,
            event.event_id,
            event.machine_id,
            event.factory_id,
            event.event_time,
            event.received_time,
            event.duration_ms,
            event.defect_count,
            event.version,
        )
        .fetch_optional(&self.pool)
        .await?;

        match new_version {
            Some(version) => Ok(version),
            None => {
                let actual = self
                    .find_by_id(&event.event_id)
                    .await?
                    .map(|e| e.version)
                    .unwrap_or(event.version);

                Err(StoreError::VersionConflict {
                    event_id: event.event_id.clone(),
                    expected: event.version,
                    actual,
                })
            }
        }
    }

    pub async fn find_by_machine_and_range(
        &self,
        machine_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Event>, StoreError> {
        let rows = sqlx::query_as!(
            EventRow,
            r#"
            SELECT event_id, machine_id, factory_id, event_time, received_time,
                   duration_ms, defect_count, version
            FROM machine_events
            WHERE machine_id = $1 AND event_time >= $2 AND event_time < $3
            ORDER BY event_time
            "#,
            machine_id,
            start,
            end,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Ranking of total defects per `group_by` key over `[start, end)`,
    /// highest total first. `total_defects` only sums rows where
    /// `defect_count >= 0` (I4); `event_count` counts every row in the
    /// group regardless of whether its defect count is known.
    pub async fn top_defect_lines(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        group_by: GroupBy,
    ) -> Result<Vec<DefectLine>, StoreError> {
        let query = format!(
            r#"
            SELECT {column} AS key,
                   COALESCE(SUM(defect_count) FILTER (WHERE defect_count >= 0), 0)::bigint AS total_defects,
                   COUNT(*)::bigint AS event_count
            FROM machine_events
            WHERE event_time >= $1 AND event_time < $2
            GROUP BY {column}
            ORDER BY total_defects DESC
            "#,
            column = group_by.column()
        );

        let rows: Vec<(String, i64, i64)> = sqlx::query_as(&query)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(key, total_defects, event_count)| DefectLine {
                key,
                total_defects,
                event_count,
            })
            .collect())
    }

    /// Total of `defect_count` across the whole store, ignoring rows where
    /// `defect_count == -1` (I4). Not windowed; a fleet-wide figure rather
    /// than a per-machine or per-range one.
    pub async fn sum_known_defects(&self) -> Result<i64, StoreError> {
        let total: Option<i64> = sqlx::query_scalar!(
            r#"
            SELECT SUM(defect_count)::bigint
            FROM machine_events
            WHERE defect_count >= 0
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(0))
    }
}

struct EventRow {
    event_id: String,
    machine_id: String,
    factory_id: String,
    event_time: DateTime<Utc>,
    received_time: DateTime<Utc>,
    duration_ms: i64,
    defect_count: i32,
    version: i64,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            event_id: row.event_id,
            machine_id: row.machine_id,
            factory_id: row.factory_id,
            event_time: row.event_time,
            received_time: row.received_time,
            duration_ms: row.duration_ms,
            defect_count: row.defect_count,
            version: row.version,
        }
    }
}
