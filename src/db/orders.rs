//! Order repository.
//!
//! An order and its line items are written in one transaction. Totals are
//! always recomputed from the items before they reach the database.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use std::collections::HashMap;
use std::time::Instant;

use super::observe;
use crate::error::{AppError, AppResult};
use crate::ids::{format_id, parse_id, parse_optional_id};
use crate::models::{
    DeleteOutcome, ListParams, Order, OrderItem, OrderStatus, PaymentStatus, UpdatePaymentRequest,
};
use crate::segmentation::OrderSummary;

const ORDER_COLUMNS: &str = "id, customer_id, status, payment_status, payment_method, \
     shipping_address, shipping_cost, subtotal, total, notes, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, unit_price, line_total";

// =============================================================================
// ROW TYPES
// =============================================================================
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct OrderRecord {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub status: String,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_cost: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct OrderItemRecord {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl From<OrderItemRecord> for OrderItem {
    fn from(row: OrderItemRecord) -> Self {
        Self {
            id: format_id(row.id),
            order_id: format_id(row.order_id),
            product_id: format_id(row.product_id),
            quantity: row.quantity,
            unit_price: row.unit_price,
            line_total: row.line_total,
        }
    }
}

impl OrderRecord {
    /// Domain order with its items; fails only on a status value the
    /// CHECK constraint should have rejected.
    pub fn into_domain(self, items: Vec<OrderItemRecord>) -> AppResult<Order> {
        Ok(Order {
            id: format_id(self.id),
            customer_id: self.customer_id.map(format_id),
            status: self.status.parse::<OrderStatus>().map_err(AppError::Internal)?,
            payment_status: self
                .payment_status
                .parse::<PaymentStatus>()
                .map_err(AppError::Internal)?,
            payment_method: self.payment_method,
            shipping_address: self.shipping_address,
            shipping_cost: self.shipping_cost,
            subtotal: self.subtotal,
            total: self.total,
            notes: self.notes,
            items: items.into_iter().map(OrderItem::from).collect(),
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        })
    }

    pub fn from_domain(order: &Order) -> AppResult<Self> {
        let now = Utc::now();
        Ok(Self {
            id: parse_optional_id(Some(&order.id))?.unwrap_or(0),
            customer_id: parse_optional_id(order.customer_id.as_deref())?,
            status: order.status.as_str().to_string(),
            payment_status: order.payment_status.as_str().to_string(),
            payment_method: order.payment_method.clone(),
            shipping_address: order.shipping_address.clone(),
            shipping_cost: order.shipping_cost,
            subtotal: order.subtotal,
            total: order.total,
            notes: order.notes.clone(),
            created_at: order.created_at.unwrap_or(now),
            updated_at: order.updated_at.unwrap_or(now),
        })
    }
}

/// Recompute totals and check the items before writing
fn prepare(order: &Order) -> AppResult<(OrderRecord, Vec<(i64, i32, Decimal, Decimal)>)> {
    if order.items.is_empty() {
        return Err(AppError::ValidationFailure("an order needs at least one item".into()));
    }
    if order.shipping_cost.is_sign_negative() {
        return Err(AppError::ValidationFailure("shipping_cost must not be negative".into()));
    }

    let mut order = order.clone();
    order.recalculate().map_err(AppError::ValidationFailure)?;

    let mut items = Vec::with_capacity(order.items.len());
    for item in &order.items {
        if item.quantity <= 0 {
            return Err(AppError::ValidationFailure(format!(
                "quantity must be positive for product {}",
                item.product_id
            )));
        }
        if item.unit_price.is_sign_negative() {
            return Err(AppError::ValidationFailure(format!(
                "unit_price must not be negative for product {}",
                item.product_id
            )));
        }
        items.push((parse_id(&item.product_id)?, item.quantity, item.unit_price, item.line_total));
    }

    Ok((OrderRecord::from_domain(&order)?, items))
}

async fn insert_items(
    conn: &mut PgConnection,
    order_id: i64,
    items: &[(i64, i32, Decimal, Decimal)],
) -> AppResult<Vec<OrderItemRecord>> {
    let mut rows = Vec::with_capacity(items.len());
    for (product_id, quantity, unit_price, line_total) in items {
        let row = sqlx::query_as::<_, OrderItemRecord>(&format!(
            "INSERT INTO order_items (order_id, product_id, quantity, unit_price, line_total)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {ITEM_COLUMNS}"
        ))
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(line_total)
        .fetch_one(&mut *conn)
        .await?;
        rows.push(row);
    }
    Ok(rows)
}

// =============================================================================
// REPOSITORY
// =============================================================================
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<Order>> {
        let id = parse_id(id)?;
        let started = Instant::now();
        let row = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = sqlx::query_as::<_, OrderItemRecord>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        observe("select", started);

        row.into_domain(items).map(Some)
    }

    /// Orders newest first, with items, optionally for one customer
    pub async fn list(&self, customer_id: Option<&str>, params: &ListParams) -> AppResult<(Vec<Order>, i64)> {
        let customer_id = parse_optional_id(customer_id)?;
        let (limit, offset) = params.limit_offset();
        let started = Instant::now();

        let rows = sqlx::query_as::<_, OrderRecord>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE ($1::bigint IS NULL OR customer_id = $1)
             ORDER BY created_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(customer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM orders WHERE ($1::bigint IS NULL OR customer_id = $1)")
                .bind(customer_id)
                .fetch_one(self.pool)
                .await?;

        let order_ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, OrderItemRecord>(&format!(
            "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ANY($1) ORDER BY id"
        ))
        .bind(&order_ids)
        .fetch_all(self.pool)
        .await?;
        observe("select", started);

        let mut by_order: HashMap<i64, Vec<OrderItemRecord>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        let orders = rows
            .into_iter()
            .map(|row| {
                let items = by_order.remove(&row.id).unwrap_or_default();
                row.into_domain(items)
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok((orders, total.0))
    }

    pub async fn create(&self, order: &Order) -> AppResult<Order> {
        let (record, items) = prepare(&Order {
            id: String::new(),
            ..order.clone()
        })?;
        let started = Instant::now();

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, OrderRecord>(&format!(
            "INSERT INTO orders (customer_id, status, payment_status, payment_method,
                                 shipping_address, shipping_cost, subtotal, total, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(record.customer_id)
        .bind(&record.status)
        .bind(&record.payment_status)
        .bind(&record.payment_method)
        .bind(&record.shipping_address)
        .bind(record.shipping_cost)
        .bind(record.subtotal)
        .bind(record.total)
        .bind(&record.notes)
        .fetch_one(&mut *tx)
        .await?;

        let item_rows = insert_items(&mut tx, row.id, &items).await?;
        tx.commit().await?;
        observe("insert", started);

        tracing::info!(order_id = row.id, items = item_rows.len(), total = %row.total, "Order created");
        row.into_domain(item_rows)
    }

    /// Replace an order's header and items; totals are recomputed.
    pub async fn update(&self, order: &Order) -> AppResult<Order> {
        let id = parse_id(&order.id)?;
        let (record, items) = prepare(order)?;

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query_as::<_, OrderRecord>(&format!(
            "UPDATE orders
             SET customer_id = $2, status = $3, payment_status = $4, payment_method = $5,
                 shipping_address = $6, shipping_cost = $7, subtotal = $8, total = $9,
                 notes = $10, updated_at = NOW()
             WHERE id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(id)
        .bind(record.customer_id)
        .bind(&record.status)
        .bind(&record.payment_status)
        .bind(&record.payment_method)
        .bind(&record.shipping_address)
        .bind(record.shipping_cost)
        .bind(record.subtotal)
        .bind(record.total)
        .bind(&record.notes)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order not found: {id}")))?;

        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let item_rows = insert_items(&mut tx, id, &items).await?;
        tx.commit().await?;

        row.into_domain(item_rows)
    }

    /// Record a payment state change without touching items
    pub async fn update_payment(&self, id: &str, request: &UpdatePaymentRequest) -> AppResult<Order> {
        let order_id = parse_id(id)?;
        let result = sqlx::query(
            "UPDATE orders
             SET payment_status = $2, payment_method = COALESCE($3, payment_method), updated_at = NOW()
             WHERE id = $1",
        )
        .bind(order_id)
        .bind(request.payment_status.as_str())
        .bind(&request.payment_method)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Order not found: {order_id}")));
        }
        tracing::info!(order_id, payment_status = %request.payment_status, "Order payment updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order not found: {order_id}")))
    }

    /// Delete an order; its items cascade.
    pub async fn delete(&self, id: &str) -> AppResult<DeleteOutcome> {
        let id = parse_id(id)?;
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(DeleteOutcome::from_rows_affected(result.rows_affected()))
    }

    /// Date and total of a customer's orders for RFM scoring. Cancelled
    /// orders don't count.
    pub async fn summaries_for_customer(&self, customer_id: &str) -> AppResult<Vec<OrderSummary>> {
        let customer_id = parse_id(customer_id)?;
        let rows: Vec<(DateTime<Utc>, Decimal)> = sqlx::query_as(
            "SELECT created_at, total FROM orders
             WHERE customer_id = $1 AND status <> 'CANCELLED'
             ORDER BY created_at ASC",
        )
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(created_at, total)| OrderSummary { created_at, total })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: &str, quantity: i32, cents: i64) -> OrderItem {
        OrderItem {
            product_id: product_id.into(),
            quantity,
            unit_price: Decimal::new(cents, 2),
            ..OrderItem::default()
        }
    }

    #[test]
    fn test_prepare_recomputes_totals() {
        let order = Order {
            customer_id: Some("4".into()),
            shipping_cost: Decimal::new(990, 2),
            // Client-supplied totals are ignored
            total: Decimal::new(1, 0),
            items: vec![item("1", 3, 250), item("2", 1, 10000)],
            ..Order::default()
        };
        let (record, items) = prepare(&order).unwrap();

        assert_eq!(record.customer_id, Some(4));
        assert_eq!(record.subtotal, Decimal::new(10750, 2));
        assert_eq!(record.total, Decimal::new(11740, 2));
        assert_eq!(items[0], (1, 3, Decimal::new(250, 2), Decimal::new(750, 2)));
        assert_eq!(record.status, "PENDING");
    }

    #[test]
    fn test_prepare_rejects_bad_items() {
        let empty = Order::default();
        assert!(matches!(prepare(&empty), Err(AppError::ValidationFailure(_))));

        let zero = Order {
            items: vec![item("1", 0, 100)],
            ..Order::default()
        };
        assert!(matches!(prepare(&zero), Err(AppError::ValidationFailure(_))));

        let bad_product = Order {
            items: vec![item("abc", 1, 100)],
            ..Order::default()
        };
        assert!(matches!(prepare(&bad_product), Err(AppError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_unknown_status_maps_to_internal() {
        let now = Utc::now();
        let record = OrderRecord {
            id: 1,
            customer_id: None,
            status: "LOST".into(),
            payment_status: "PAID".into(),
            payment_method: None,
            shipping_address: None,
            shipping_cost: Decimal::ZERO,
            subtotal: Decimal::ZERO,
            total: Decimal::ZERO,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(record.into_domain(vec![]), Err(AppError::Internal(_))));
    }
}
