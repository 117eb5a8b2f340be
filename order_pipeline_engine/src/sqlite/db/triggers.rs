use chrono::Utc;
use log::{debug, trace};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, types::Json, FromRow, QueryBuilder, Row, SqliteConnection};

use crate::{
    db_types::{NewTriggerRecord, TriggerRecord, TriggerUpdate},
    traits::StorageError,
};

impl FromRow<'_, SqliteRow> for TriggerRecord {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let body: Json<Value> = row.try_get("body")?;
        Ok(Self {
            id: row.try_get("id")?,
            message_id: row.try_get("message_id")?,
            event_source: row.try_get("event_source")?,
            event_time: row.try_get("event_time")?,
            body: body.0,
            status: row.try_get("status")?,
            error: row.try_get("error")?,
            order_id: row.try_get("order_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

pub async fn insert_trigger(
    trigger: NewTriggerRecord,
    conn: &mut SqliteConnection,
) -> Result<TriggerRecord, sqlx::Error> {
    let now = Utc::now();
    let record: TriggerRecord = sqlx::query_as(
        r#"
            INSERT INTO trigger_records (
                message_id,
                event_source,
                event_time,
                body,
                status,
                error,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(trigger.message_id)
    .bind(trigger.event_source)
    .bind(trigger.event_time)
    .bind(Json(trigger.body))
    .bind(trigger.status)
    .bind(trigger.error)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    trace!("📝️ Trigger #{} stored for message {}", record.id, record.message_id);
    Ok(record)
}

pub async fn fetch_trigger(id: i64, conn: &mut SqliteConnection) -> Result<Option<TriggerRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM trigger_records WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn update_trigger(
    id: i64,
    update: TriggerUpdate,
    conn: &mut SqliteConnection,
) -> Result<TriggerRecord, StorageError> {
    if update.is_empty() {
        debug!("📝️ No fields to update for trigger #{id}. Update request skipped.");
        return fetch_trigger(id, conn).await?.ok_or(StorageError::TriggerNotFound(id));
    }
    let mut builder = QueryBuilder::new("UPDATE trigger_records SET updated_at = ");
    builder.push_bind(Utc::now());
    if let Some(status) = update.status {
        builder.push(", status = ");
        builder.push_bind(status);
    }
    if let Some(error) = update.error {
        builder.push(", error = ");
        builder.push_bind(error);
    }
    if let Some(order_id) = update.order_id {
        builder.push(", order_id = ");
        builder.push_bind(order_id);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);
    builder.push(" RETURNING *");
    trace!("📝️ Executing query: {}", builder.sql());
    let record = builder.build_query_as::<TriggerRecord>().fetch_optional(conn).await?;
    record.ok_or(StorageError::TriggerNotFound(id))
}

pub async fn fetch_triggers_for_message(
    message_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<TriggerRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM trigger_records WHERE message_id = $1 ORDER BY id ASC")
        .bind(message_id)
        .fetch_all(conn)
        .await
}
