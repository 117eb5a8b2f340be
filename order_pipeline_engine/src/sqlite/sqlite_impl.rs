//! `SqliteDatabase` is the SQLite storage backend for the order pipeline.
//!
//! It implements all the storage traits defined in the [`crate::traits`] module. Every call acquires its own
//! connection from the pool; there are no multi-record transactions.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{db_url, messages, new_pool, orders, raw_records, triggers};
use crate::{
    db_types::{
        MessageRecord,
        NewMessageRecord,
        NewOrder,
        NewRawRecord,
        NewTriggerRecord,
        Order,
        OrderId,
        RawRecord,
        TriggerRecord,
        TriggerUpdate,
    },
    traits::{AuditManagement, OrderManagement, OrderQueryFilter, StorageError, TriggerManagement},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({})", self.url)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `OPL_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("📝️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("📝️ Database migrations complete");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        debug!("📝️ Database connection pool closed");
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StorageError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    async fn update_order(&self, order: &Order) -> Result<Order, StorageError> {
        let mut conn = self.pool.acquire().await?;
        orders::update_order(order, &mut conn).await
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }
}

impl AuditManagement for SqliteDatabase {
    async fn insert_raw_record(&self, record: NewRawRecord) -> Result<i64, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let id = raw_records::insert_raw_record(record, &mut conn).await?;
        Ok(id)
    }

    async fn insert_message_record(&self, record: NewMessageRecord) -> Result<MessageRecord, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let record = messages::insert_message_record(record, &mut conn).await?;
        Ok(record)
    }

    async fn fetch_message_records(&self, message_id: &str) -> Result<Vec<MessageRecord>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let records = messages::fetch_message_records(message_id, &mut conn).await?;
        Ok(records)
    }

    async fn fetch_raw_records(&self, message_id: &str) -> Result<Vec<RawRecord>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let records = raw_records::fetch_raw_records(message_id, &mut conn).await?;
        Ok(records)
    }

    async fn fetch_recent_message_records(&self, limit: i64) -> Result<Vec<MessageRecord>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let records = messages::fetch_recent_message_records(limit, &mut conn).await?;
        Ok(records)
    }
}

impl TriggerManagement for SqliteDatabase {
    async fn insert_trigger(&self, trigger: NewTriggerRecord) -> Result<TriggerRecord, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let record = triggers::insert_trigger(trigger, &mut conn).await?;
        Ok(record)
    }

    async fn update_trigger(&self, id: i64, update: TriggerUpdate) -> Result<TriggerRecord, StorageError> {
        let mut conn = self.pool.acquire().await?;
        triggers::update_trigger(id, update, &mut conn).await
    }

    async fn fetch_triggers_for_message(&self, message_id: &str) -> Result<Vec<TriggerRecord>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        let records = triggers::fetch_triggers_for_message(message_id, &mut conn).await?;
        Ok(records)
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;
    use crate::test_utils::{prepare_test_env, random_db_path};

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        db.run_migrations().await.unwrap();
        assert_eq!(db.url(), url);
        let id = db.insert_raw_record(NewRawRecord::new("m1", json!({"body": "{}"}))).await.unwrap();
        assert_eq!(db.fetch_raw_records("m1").await.unwrap()[0].id, id);
        db.close().await;
    }
}
