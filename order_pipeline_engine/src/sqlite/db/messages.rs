use log::trace;
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, types::Json, FromRow, Row, SqliteConnection};

use crate::db_types::{MessageRecord, NewMessageRecord};

impl FromRow<'_, SqliteRow> for MessageRecord {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let body: Json<Value> = row.try_get("body")?;
        Ok(Self {
            id: row.try_get("id")?,
            message_id: row.try_get("message_id")?,
            body: body.0,
            message_type: row.try_get("message_type")?,
            status: row.try_get("status")?,
            error: row.try_get("error")?,
            order_id: row.try_get("order_id")?,
            processed_at: row.try_get("processed_at")?,
        })
    }
}

/// Appends a processing record. Records are never updated, so a redelivered message simply gains another row.
pub async fn insert_message_record(
    record: NewMessageRecord,
    conn: &mut SqliteConnection,
) -> Result<MessageRecord, sqlx::Error> {
    let record: MessageRecord = sqlx::query_as(
        r#"
            INSERT INTO message_records (
                message_id,
                body,
                message_type,
                status,
                error,
                order_id,
                processed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(record.message_id)
    .bind(Json(record.body))
    .bind(record.message_type)
    .bind(record.status)
    .bind(record.error)
    .bind(record.order_id)
    .bind(record.processed_at)
    .fetch_one(conn)
    .await?;
    trace!("📝️ Message record #{} ({}) stored for message {}", record.id, record.status, record.message_id);
    Ok(record)
}

pub async fn fetch_message_records(
    message_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<MessageRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM message_records WHERE message_id = $1 ORDER BY id ASC")
        .bind(message_id)
        .fetch_all(conn)
        .await
}

pub async fn fetch_recent_message_records(
    limit: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<MessageRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM message_records ORDER BY id DESC LIMIT $1").bind(limit).fetch_all(conn).await
}
