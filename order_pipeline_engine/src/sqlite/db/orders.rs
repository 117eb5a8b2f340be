use log::{debug, trace};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, types::Json, FromRow, QueryBuilder, Row, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, ShippingAddress},
    traits::{OrderQueryFilter, StorageError},
};

impl FromRow<'_, SqliteRow> for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let items: Json<Value> = row.try_get("items")?;
        let shipping_address: Option<Json<ShippingAddress>> = row.try_get("shipping_address")?;
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            customer_id: row.try_get("customer_id")?,
            items: items.0,
            total_amount: row.try_get("total_amount")?,
            shipping_address: shipping_address.map(|a| a.0),
            status: row.try_get("status")?,
            payment_status: row.try_get("payment_status")?,
            error_message: row.try_get("error_message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Inserts a new order into the database using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
///
/// New orders always start in `NEW` status with a `PENDING` payment.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, StorageError> {
    if let Some(existing) = fetch_order_by_order_id(&order.order_id, conn).await? {
        return Err(StorageError::OrderAlreadyExists(existing.order_id));
    }
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                customer_id,
                items,
                total_amount,
                shipping_address,
                status,
                payment_status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, 'NEW', 'PENDING', $6, $7)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.customer_id)
    .bind(Json(order.items))
    .bind(order.total_amount)
    .bind(order.shipping_address.map(Json))
    .bind(order.created_at)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    debug!("📝️ Order [{}] inserted with id {}", order.order_id, order.id);
    Ok(order)
}

/// Returns the order with the given `order_id`, if it exists.
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Writes the status, payment status, error message and `updated_at` of `order`.
///
/// The update is conditional on the stored status not being terminal. When no row is updated, the order is fetched
/// again to report whether it was missing or terminal.
pub async fn update_order(order: &Order, conn: &mut SqliteConnection) -> Result<Order, StorageError> {
    let updated: Option<Order> = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                payment_status = $2,
                error_message = $3,
                updated_at = $4
            WHERE order_id = $5 AND status NOT IN ('DELIVERED', 'FAILED')
            RETURNING *;
        "#,
    )
    .bind(order.status)
    .bind(order.payment_status)
    .bind(order.error_message.as_deref())
    .bind(order.updated_at)
    .bind(order.order_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(o) => {
            trace!("📝️ Order [{}] is now {} (payment {})", o.order_id, o.status, o.payment_status);
            Ok(o)
        },
        None => match fetch_order_by_order_id(&order.order_id, conn).await? {
            Some(_) => Err(StorageError::OrderNotUpdatable(order.order_id.clone())),
            None => Err(StorageError::OrderNotFound(order.order_id.clone())),
        },
    }
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(customer_id) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(customer_id);
    }
    if !query.statuses.is_empty() {
        where_clause.push("status IN (");
        for (i, status) in query.statuses.iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status.as_str());
        }
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }
    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {:?}", orders.len());
    Ok(orders)
}
