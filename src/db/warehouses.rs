//! Warehouse, stock and inventory transaction repository.
//!
//! Stock only changes through inventory transactions. Each transaction locks
//! the stock row it touches, so concurrent OUT movements can't take the
//! quantity below zero.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::require;
use crate::error::{AppError, AppResult};
use crate::ids::{format_id, parse_id, parse_optional_id};
use crate::metrics;
use crate::models::{
    DeleteOutcome, InventoryTransaction, RecordTransactionRequest, Stock, TransactionKind, Warehouse,
};

const WAREHOUSE_COLUMNS: &str = "id, name, location, capacity, is_active, created_at, updated_at";
const STOCK_COLUMNS: &str = "id, warehouse_id, product_id, quantity, updated_at";
const TRANSACTION_COLUMNS: &str = "id, product_id, warehouse_id, kind, quantity, user_id, note, created_at";

// =============================================================================
// ROW TYPES
// =============================================================================
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct WarehouseRecord {
    pub id: i64,
    pub name: String,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WarehouseRecord> for Warehouse {
    fn from(row: WarehouseRecord) -> Self {
        Self {
            id: format_id(row.id),
            name: row.name,
            location: row.location,
            capacity: row.capacity,
            is_active: row.is_active,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

impl WarehouseRecord {
    pub fn from_domain(warehouse: &Warehouse) -> AppResult<Self> {
        if warehouse.capacity.is_some_and(|c| c < 0) {
            return Err(AppError::ValidationFailure("capacity must not be negative".into()));
        }
        let now = Utc::now();
        Ok(Self {
            id: parse_optional_id(Some(&warehouse.id))?.unwrap_or(0),
            name: warehouse.name.clone(),
            location: warehouse.location.clone(),
            capacity: warehouse.capacity,
            is_active: warehouse.is_active,
            created_at: warehouse.created_at.unwrap_or(now),
            updated_at: warehouse.updated_at.unwrap_or(now),
        })
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StockRecord {
    pub id: i64,
    pub warehouse_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub updated_at: DateTime<Utc>,
}

impl From<StockRecord> for Stock {
    fn from(row: StockRecord) -> Self {
        Self {
            id: format_id(row.id),
            warehouse_id: format_id(row.warehouse_id),
            product_id: format_id(row.product_id),
            quantity: row.quantity,
            updated_at: Some(row.updated_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct TransactionRecord {
    pub id: i64,
    pub product_id: i64,
    pub warehouse_id: i64,
    pub kind: String,
    pub quantity: i32,
    pub user_id: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRecord> for InventoryTransaction {
    type Error = AppError;

    fn try_from(row: TransactionRecord) -> AppResult<Self> {
        Ok(Self {
            id: format_id(row.id),
            product_id: format_id(row.product_id),
            warehouse_id: format_id(row.warehouse_id),
            kind: row.kind.parse::<TransactionKind>().map_err(AppError::Internal)?,
            quantity: row.quantity,
            user_id: row.user_id,
            note: row.note,
            created_at: Some(row.created_at),
        })
    }
}

/// Stock level after applying `delta`, or `InsufficientStock`
pub fn apply_delta(available: i32, kind: TransactionKind, quantity: i32) -> AppResult<i32> {
    if quantity <= 0 {
        return Err(AppError::ValidationFailure("quantity must be positive".into()));
    }
    match kind {
        TransactionKind::In => available
            .checked_add(quantity)
            .ok_or_else(|| AppError::ValidationFailure("stock quantity overflow".into())),
        TransactionKind::Out if quantity > available => Err(AppError::InsufficientStock {
            available,
            requested: quantity,
        }),
        TransactionKind::Out => Ok(available - quantity),
    }
}

// =============================================================================
// REPOSITORY
// =============================================================================
pub struct WarehouseRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WarehouseRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // -------------------------------------------------------------------------
    // WAREHOUSES
    // -------------------------------------------------------------------------

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<Warehouse>> {
        let id = parse_id(id)?;
        let row = sqlx::query_as::<_, WarehouseRecord>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Warehouse::from))
    }

    pub async fn list(&self) -> AppResult<Vec<Warehouse>> {
        let rows = sqlx::query_as::<_, WarehouseRecord>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouses ORDER BY name ASC, id ASC"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Warehouse::from).collect())
    }

    pub async fn create(&self, warehouse: &Warehouse) -> AppResult<Warehouse> {
        require("name", &warehouse.name)?;
        let record = WarehouseRecord::from_domain(&Warehouse {
            id: String::new(),
            ..warehouse.clone()
        })?;

        let row = sqlx::query_as::<_, WarehouseRecord>(&format!(
            "INSERT INTO warehouses (name, location, capacity, is_active)
             VALUES ($1, $2, $3, $4)
             RETURNING {WAREHOUSE_COLUMNS}"
        ))
        .bind(&record.name)
        .bind(&record.location)
        .bind(record.capacity)
        .bind(record.is_active)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(warehouse_id = row.id, name = %row.name, "Warehouse created");
        Ok(row.into())
    }

    pub async fn update(&self, warehouse: &Warehouse) -> AppResult<Warehouse> {
        require("name", &warehouse.name)?;
        let id = parse_id(&warehouse.id)?;
        let record = WarehouseRecord::from_domain(warehouse)?;

        let row = sqlx::query_as::<_, WarehouseRecord>(&format!(
            "UPDATE warehouses
             SET name = $2, location = $3, capacity = $4, is_active = $5, updated_at = NOW()
             WHERE id = $1
             RETURNING {WAREHOUSE_COLUMNS}"
        ))
        .bind(id)
        .bind(&record.name)
        .bind(&record.location)
        .bind(record.capacity)
        .bind(record.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Warehouse not found: {id}")))?;

        Ok(row.into())
    }

    /// Delete a warehouse; its stock rows and transactions cascade.
    pub async fn delete(&self, id: &str) -> AppResult<DeleteOutcome> {
        let id = parse_id(id)?;
        let result = sqlx::query("DELETE FROM warehouses WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(DeleteOutcome::from_rows_affected(result.rows_affected()))
    }

    // -------------------------------------------------------------------------
    // STOCK
    // -------------------------------------------------------------------------

    pub async fn list_stock(&self, warehouse_id: &str) -> AppResult<Vec<Stock>> {
        let warehouse_id = parse_id(warehouse_id)?;
        let rows = sqlx::query_as::<_, StockRecord>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock WHERE warehouse_id = $1 ORDER BY product_id"
        ))
        .bind(warehouse_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Stock::from).collect())
    }

    /// Apply a stock movement and log it, atomically.
    ///
    /// Returns the transaction and the resulting stock row.
    pub async fn record_transaction(
        &self,
        warehouse_id: &str,
        user_id: &str,
        request: &RecordTransactionRequest,
    ) -> AppResult<(InventoryTransaction, Stock)> {
        let warehouse_id = parse_id(warehouse_id)?;
        let product_id = parse_id(&request.product_id)?;
        require("user_id", user_id)?;

        let mut tx = self.pool.begin().await?;

        // Make sure the row exists, then lock it for the read-modify-write
        sqlx::query(
            "INSERT INTO stock (warehouse_id, product_id, quantity)
             VALUES ($1, $2, 0)
             ON CONFLICT (warehouse_id, product_id) DO NOTHING",
        )
        .bind(warehouse_id)
        .bind(product_id)
        .execute(&mut *tx)
        .await?;

        let current = sqlx::query_as::<_, StockRecord>(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock
             WHERE warehouse_id = $1 AND product_id = $2
             FOR UPDATE"
        ))
        .bind(warehouse_id)
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        let level = match apply_delta(current.quantity, request.kind, request.quantity) {
            Ok(level) => level,
            Err(err) => {
                tracing::warn!(warehouse_id, product_id, error = %err, "Stock movement rejected");
                return Err(err);
            }
        };

        let stock = sqlx::query_as::<_, StockRecord>(&format!(
            "UPDATE stock SET quantity = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {STOCK_COLUMNS}"
        ))
        .bind(current.id)
        .bind(level)
        .fetch_one(&mut *tx)
        .await?;

        let logged = sqlx::query_as::<_, TransactionRecord>(&format!(
            "INSERT INTO inventory_transactions (product_id, warehouse_id, kind, quantity, user_id, note)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(product_id)
        .bind(warehouse_id)
        .bind(request.kind.as_str())
        .bind(request.quantity)
        .bind(user_id)
        .bind(&request.note)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let transaction = InventoryTransaction::try_from(logged)?;
        metrics::set_stock_level(&format_id(warehouse_id), &format_id(product_id), level);
        tracing::info!(
            warehouse_id,
            product_id,
            delta = transaction.signed_delta(),
            level,
            "Inventory transaction recorded"
        );
        Ok((transaction, stock.into()))
    }

    /// Receive `quantity` units of a product (an IN transaction)
    pub async fn add_stock(
        &self,
        warehouse_id: &str,
        user_id: &str,
        product_id: &str,
        quantity: i32,
    ) -> AppResult<Stock> {
        let request = RecordTransactionRequest {
            product_id: product_id.to_string(),
            kind: TransactionKind::In,
            quantity,
            note: Some("bulk stock entry".into()),
        };
        let (_, stock) = self.record_transaction(warehouse_id, user_id, &request).await?;
        Ok(stock)
    }

    /// Movements of a warehouse, newest first
    pub async fn list_transactions(&self, warehouse_id: &str, limit: i64) -> AppResult<Vec<InventoryTransaction>> {
        let warehouse_id = parse_id(warehouse_id)?;
        let rows = sqlx::query_as::<_, TransactionRecord>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM inventory_transactions
             WHERE warehouse_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        ))
        .bind(warehouse_id)
        .bind(limit.clamp(1, 500))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(InventoryTransaction::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_delta() {
        assert_eq!(apply_delta(5, TransactionKind::In, 3).unwrap(), 8);
        assert_eq!(apply_delta(5, TransactionKind::Out, 5).unwrap(), 0);
        assert!(matches!(
            apply_delta(5, TransactionKind::Out, 6),
            Err(AppError::InsufficientStock { available: 5, requested: 6 })
        ));
        assert!(matches!(
            apply_delta(5, TransactionKind::In, 0),
            Err(AppError::ValidationFailure(_))
        ));
    }

    #[test]
    fn test_negative_capacity_is_rejected() {
        let warehouse = Warehouse {
            name: "Depo".into(),
            capacity: Some(-1),
            ..Warehouse::default()
        };
        assert!(matches!(
            WarehouseRecord::from_domain(&warehouse),
            Err(AppError::ValidationFailure(_))
        ));
    }

    #[test]
    fn test_transaction_kind_is_parsed() {
        let row = TransactionRecord {
            id: 1,
            product_id: 2,
            warehouse_id: 3,
            kind: "OUT".into(),
            quantity: 4,
            user_id: "admin".into(),
            note: None,
            created_at: Utc::now(),
        };
        let tx = InventoryTransaction::try_from(row).unwrap();
        assert_eq!(tx.signed_delta(), -4);
        assert_eq!(tx.warehouse_id, "3");
    }
}
