use serde_json::Value;
use sqlx::{sqlite::SqliteRow, types::Json, FromRow, Row, SqliteConnection};

use crate::db_types::{NewRawRecord, RawRecord};

impl FromRow<'_, SqliteRow> for RawRecord {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let payload: Json<Value> = row.try_get("payload")?;
        Ok(Self {
            id: row.try_get("id")?,
            message_id: row.try_get("message_id")?,
            payload: payload.0,
            received_at: row.try_get("received_at")?,
        })
    }
}

pub async fn insert_raw_record(record: NewRawRecord, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let id = sqlx::query_scalar(
        "INSERT INTO raw_records (message_id, payload, received_at) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(record.message_id)
    .bind(Json(record.payload))
    .bind(record.received_at)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

pub async fn fetch_raw_records(message_id: &str, conn: &mut SqliteConnection) -> Result<Vec<RawRecord>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM raw_records WHERE message_id = $1 ORDER BY id ASC")
        .bind(message_id)
        .fetch_all(conn)
        .await
}
