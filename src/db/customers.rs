//! Customer repository.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::require;
use crate::error::{AppError, AppResult};
use crate::ids::{format_id, parse_id, parse_optional_id};
use crate::models::{Customer, DeleteOutcome, ListParams};

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, address, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct CustomerRecord {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CustomerRecord> for Customer {
    fn from(row: CustomerRecord) -> Self {
        Self {
            id: format_id(row.id),
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        }
    }
}

impl CustomerRecord {
    pub fn from_domain(customer: &Customer) -> AppResult<Self> {
        let now = Utc::now();
        Ok(Self {
            id: parse_optional_id(Some(&customer.id))?.unwrap_or(0),
            name: customer.name.clone(),
            email: customer.email.trim().to_lowercase(),
            phone: customer.phone.clone(),
            address: customer.address.clone(),
            created_at: customer.created_at.unwrap_or(now),
            updated_at: customer.updated_at.unwrap_or(now),
        })
    }
}

pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> AppResult<Option<Customer>> {
        let id = parse_id(id)?;
        let row = sqlx::query_as::<_, CustomerRecord>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }

    pub async fn list(&self, params: &ListParams) -> AppResult<(Vec<Customer>, i64)> {
        let (limit, offset) = params.limit_offset();
        let rows = sqlx::query_as::<_, CustomerRecord>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers
             ORDER BY created_at DESC, id DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers")
            .fetch_one(self.pool)
            .await?;

        Ok((rows.into_iter().map(Customer::from).collect(), total.0))
    }

    pub async fn create(&self, customer: &Customer) -> AppResult<Customer> {
        require("name", &customer.name)?;
        require("email", &customer.email)?;
        let record = CustomerRecord::from_domain(&Customer {
            id: String::new(),
            ..customer.clone()
        })?;

        let row = sqlx::query_as::<_, CustomerRecord>(&format!(
            "INSERT INTO customers (name, email, phone, address)
             VALUES ($1, $2, $3, $4)
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.address)
        .fetch_one(self.pool)
        .await?;

        tracing::info!(customer_id = row.id, "Customer created");
        Ok(row.into())
    }

    pub async fn update(&self, customer: &Customer) -> AppResult<Customer> {
        require("name", &customer.name)?;
        require("email", &customer.email)?;
        let id = parse_id(&customer.id)?;
        let record = CustomerRecord::from_domain(customer)?;

        let row = sqlx::query_as::<_, CustomerRecord>(&format!(
            "UPDATE customers
             SET name = $2, email = $3, phone = $4, address = $5, updated_at = NOW()
             WHERE id = $1
             RETURNING {CUSTOMER_COLUMNS}"
        ))
        .bind(id)
        .bind(&record.name)
        .bind(&record.email)
        .bind(&record.phone)
        .bind(&record.address)
        .fetch_optional(self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Customer not found: {id}")))?;

        Ok(row.into())
    }

    /// Customers with orders can't be deleted (ValidationFailure)
    pub async fn delete(&self, id: &str) -> AppResult<DeleteOutcome> {
        let id = parse_id(id)?;
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
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
    fn test_email_is_normalized() {
        let customer = Customer {
            name: "Ayşe".into(),
            email: " Ayse@Example.COM ".into(),
            ..Customer::default()
        };
        let record = CustomerRecord::from_domain(&customer).unwrap();
        assert_eq!(record.email, "ayse@example.com");
        assert_eq!(record.id, 0);
    }
}
