//! Conventional commerce entities: products, orders, customers, warehouses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// PRODUCT
// =============================================================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub category: Option<String>,
    pub image_url: Option<String>,
    #[serde(default = "super::default_true")]
    pub is_active: bool,
    /// Included in the product export feed
    pub is_exported: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkExportRequest {
    pub product_ids: Vec<String>,
    pub exported: bool,
}

// =============================================================================
// ORDER
// =============================================================================

macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("unknown {}: {}", stringify!($name), other)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(OrderStatus {
    Pending => "PENDING",
    Processing => "PROCESSING",
    Shipped => "SHIPPED",
    Delivered => "DELIVERED",
    Cancelled => "CANCELLED",
});

text_enum!(PaymentStatus {
    Pending => "PENDING",
    Paid => "PAID",
    Failed => "FAILED",
    Refunded => "REFUNDED",
});

text_enum!(TransactionKind {
    In => "IN",
    Out => "OUT",
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    pub id: String,
    pub customer_id: Option<String>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_cost: Decimal,
    /// Sum of line totals, computed server side
    pub subtotal: Decimal,
    /// subtotal + shipping_cost, computed server side
    pub total: Decimal,
    pub notes: Option<String>,
    pub items: Vec<OrderItem>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Largest amount a NUMERIC(12, 2) money column holds
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

fn bounded(amount: Option<Decimal>, what: &str) -> Result<Decimal, String> {
    let max = max_amount();
    amount
        .filter(|a| *a <= max)
        .ok_or_else(|| format!("{what} exceeds {max}"))
}

impl Order {
    /// Recompute line totals, subtotal and total from the items.
    ///
    /// Fails, leaving the amounts unusable, when any of them leaves the
    /// range the money columns can store.
    pub fn recalculate(&mut self) -> Result<(), String> {
        let mut subtotal = Decimal::ZERO;
        for item in &mut self.items {
            let line = item.unit_price.checked_mul(Decimal::from(item.quantity));
            item.line_total = bounded(line, "line total")?;
            subtotal = bounded(subtotal.checked_add(item.line_total), "subtotal")?;
        }
        self.subtotal = subtotal;
        self.total = bounded(subtotal.checked_add(self.shipping_cost), "total")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePaymentRequest {
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
}

// =============================================================================
// CUSTOMER
// =============================================================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// WAREHOUSE & STOCK
// =============================================================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Warehouse {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    pub capacity: Option<i32>,
    #[serde(default = "super::default_true")]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Quantity of one product held in one warehouse
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: String,
    pub warehouse_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A stock movement attributed to a user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryTransaction {
    pub id: String,
    pub product_id: String,
    pub warehouse_id: String,
    pub kind: TransactionKind,
    /// Always positive; the direction comes from `kind`
    pub quantity: i32,
    pub user_id: String,
    pub note: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl InventoryTransaction {
    /// Signed change applied to the stock row
    pub fn signed_delta(&self) -> i32 {
        match self.kind {
            TransactionKind::In => self.quantity,
            TransactionKind::Out => -self.quantity,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordTransactionRequest {
    pub product_id: String,
    pub kind: TransactionKind,
    pub quantity: i32,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkStockRequest {
    pub items: Vec<BulkStockItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkStockItem {
    pub product_id: String,
    pub quantity: i32,
}
