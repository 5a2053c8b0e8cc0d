use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything the orchestrators can name in a log line.
///
/// Entities report their primary identifier; composite values report
/// something an operator can grep for.
pub trait Identified {
    fn entity_id(&self) -> String;
}

impl<T: Identified> Identified for Vec<T> {
    fn entity_id(&self) -> String {
        let ids: Vec<String> = self.iter().map(Identified::entity_id).collect();
        format!("[{}]", ids.join(","))
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Never serialized, so it cannot leak through logs or output.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_seller: bool,
    pub super_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identified for User {
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

/// A product listed by a seller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub seller_id: i64,
    pub category_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub inventory_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identified for Product {
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

/// A node in the category tree. Root categories have no parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Identified for Category {
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

/// Lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identified for Order {
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

/// A line of an order, priced at the time of purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub price_at_time: f64,
}

impl Identified for OrderItem {
    fn entity_id(&self) -> String {
        self.id.to_string()
    }
}

/// A product sitting in a user's shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: i64,
    pub user_id: i64,
    pub product_id: i64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identified for CartItem {
    /// Cart items are addressed by (user, product), not by their row id.
    fn entity_id(&self) -> String {
        format!("{}-{}", self.user_id, self.product_id)
    }
}

/// Outcome of a delete, routed through the write orchestrator like any
/// other write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
    pub id: String,
    pub deleted: bool,
}

impl Deletion {
    pub fn new(id: impl ToString, deleted: bool) -> Self {
        Self {
            id: id.to_string(),
            deleted,
        }
    }
}

impl Identified for Deletion {
    fn entity_id(&self) -> String {
        self.id.clone()
    }
}

/// Outcome of a conditional inventory decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockReduction {
    pub product_id: i64,
    /// False when the product is missing or has too little stock.
    pub reduced: bool,
}

impl StockReduction {
    pub fn new(product_id: i64, reduced: bool) -> Self {
        Self {
            product_id,
            reduced,
        }
    }
}

impl Identified for StockReduction {
    fn entity_id(&self) -> String {
        self.product_id.to_string()
    }
}
