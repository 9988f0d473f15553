//! Product catalog repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::time::Instant;

use super::{observe, require};
use crate::error::{AppError, AppResult};
use crate::ids::{format_id, parse_id, parse_optional_id};
use crate::models::{DeleteOutcome, ListParams, Product};

const PRODUCT_COLUMNS: &str = "id, name, sku, description, price, category, image_url, is_active, \
     is_exported, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ProductRecord {
    pub id: i64,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub is_exported: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRecord> for Product {
    fn from(row: ProductRecord) -> Self {
        Self {
            id: format_id(row.id),
            name: row.name,
            sku: row.sku,
            description: row.description,
            price: row.price,
            category: row.category,
            image_url: row.image_url,
            is_active: row.is_active,
            is_exported: row.is_exported,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

impl ProductRecord {
    pub fn from_domain(product: &Product) -> AppResult<Self> {
        if product.price.is_sign_negative() {
            return Err(AppError::ValidationFailure("price must not be negative".into()));
        }
        let now = Utc::now();
        Ok(Self {
            id: parse_optional_id(Some(&product.id))?.unwrap_or(0),
            name: product.name.clone(),
            sku: product.sku.trim().to_uppercase(),
            description: product.description.clone(),
            price: product.price.round_dp(2),
            category: product.category.clone(),
            image_url: product.image_url.clone(),
            is_active: product.is_active,
            is_exported: product.is_exported,
            created_at: product.created_at.unwrap_or(now),
            updated_at: product.updated_at.unwrap_or(now),
        })
    }
}

pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<Product>> {
        let id = parse_id(id)?;
        let started = Instant::now();
        let row = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        observe("select", started);

        Ok(row.map(Product::from))
    }

    /// Page through the catalog, optionally narrowed to one category
    pub async fn list(&self, category: Option<&str>, params: &ListParams) -> AppResult<(Vec<Product>, i64)> {
        let (limit, offset) = params.limit_offset();
        let started = Instant::now();

        let rows = sqlx::query_as::<_, ProductRecord>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE ($1::text IS NULL OR category = $1)
             ORDER BY name ASC, id ASC
             LIMIT $2 OFFSET $3"
        ))
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM products WHERE ($1::text IS NULL OR category = $1)")
                .bind(category)
                .fetch_one(self.pool)
                .await?;
        observe("select", started);

        Ok((rows.into_iter().map(Product::from).collect(), total.0))
    }

    pub async fn create(&self, product: &Product) -> AppResult<Product> {
        require("name", &product.name)?;
        require("sku", &product.sku)?;
        let record = ProductRecord::from_domain(&Product {
            id: String::new(),
            ..product.clone()
        })?;
        let started = Instant::now();

        let row = sqlx::query_as::<_, ProductRecord>(&format!(
            "INSERT INTO products (name, sku, description, price, category, image_url,
                                   is_active, is_exported)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&record.name)
        .bind(&record.sku)
        .bind(&record.description)
        .bind(record.price)
        .bind(&record.category)
        .bind(&record.image_url)
        .bind(record.is_active)
        .bind(record.is_exported)
        .fetch_one(self.pool)
        .await?;
        observe("insert", started);

        tracing::info!(product_id = row.id, sku = %row.sku, "Product created");
        Ok(row.into())
    }

    pub async fn update(&self, product: &Product) -> AppResult<Product> {
        require("name", &product.name)?;
        require("sku", &product.sku)?;
        let id = parse_id(&product.id)?;
        let record = ProductRecord::from_domain(product)?;
        let started = Instant::now();

        let row = sqlx::query_as::<_, ProductRecord>(&format!(
            "UPDATE products
             SET name = $2, sku = $3, description = $4, price = $5, category = $6,
                 image_url = $7, is_active = $8, is_exported = $9, updated_at = NOW()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(&record.name)
        .bind(&record.sku)
        .bind(&record.description)
        .bind(record.price)
        .bind(&record.category)
        .bind(&record.image_url)
        .bind(record.is_active)
        .bind(record.is_exported)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {id}")))?;
        observe("update", started);

        Ok(row.into())
    }

    /// Flip the export flag of a single product
    pub async fn set_exported(&self, id: &str, exported: bool) -> AppResult<Product> {
        let id = parse_id(id)?;
        let row = sqlx::query_as::<_, ProductRecord>(&format!(
            "UPDATE products SET is_exported = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(id)
        .bind(exported)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {id}")))?;

        Ok(row.into())
    }

    pub async fn delete(&self, id: &str) -> AppResult<DeleteOutcome> {
        let id = parse_id(id)?;
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(DeleteOutcome::from_rows_affected(result.rows_affected()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_normalizes_sku_and_price() {
        let product = Product {
            id: "3".into(),
            name: "Kupa".into(),
            sku: " mug-01 ".into(),
            price: Decimal::new(12999, 3),
            is_active: true,
            ..Product::default()
        };
        let record = ProductRecord::from_domain(&product).unwrap();
        assert_eq!(record.id, 3);
        assert_eq!(record.sku, "MUG-01");
        assert_eq!(record.price, Decimal::new(1300, 2));

        let back = Product::from(record);
        assert_eq!(back.name, "Kupa");
        assert!(back.created_at.is_some());
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let product = Product {
            name: "Broken".into(),
            sku: "B-1".into(),
            price: Decimal::new(-1, 0),
            ..Product::default()
        };
        assert!(matches!(
            ProductRecord::from_domain(&product),
            Err(AppError::ValidationFailure(_))
        ));
    }
}
