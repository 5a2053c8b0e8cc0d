//! Secondary-store record shapes.
//!
//! The key-value store does not share the relational schema: identifiers are
//! strings, items carry their partition/sort keys, and lookups that would be
//! joins on the primary are served by denormalized fields. Each record is
//! built from the primary's entity (so generated ids and timestamps match)
//! and converts back into the entity for callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::commerce::{CartItem, Category, Order, OrderItem, OrderStatus, Product, User};

use super::{keys, RepositoryError, Result};

/// Stringify a relational identifier for the key-value store.
pub fn transform_id(id: i64) -> String {
    id.to_string()
}

/// Parse a stringified identifier back into its relational form.
pub fn parse_id(field: &str, value: &str) -> Result<i64> {
    value
        .parse()
        .map_err(|e| RepositoryError::InvalidData(format!("Invalid id {}: {}: {}", field, value, e)))
}

/// A secondary-store shape that converts back into its entity.
pub trait Record: Serialize + Send + Sync + 'static {
    type Entity: Send;

    /// Entity kind, for example `Category`.
    const KIND: &'static str;

    /// Partition and sort key of the item.
    fn key(&self) -> (&str, &str);

    /// Stringified primary id. With [`Record::KIND`] it identifies the item
    /// independently of its key, which moves when keyed fields change.
    fn record_id(&self) -> &str;

    fn into_entity(self) -> Result<Self::Entity>;
}

// ============================================================================
// User
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub pk: String,
    pub sk: String,
    /// `EMAIL#<email>`, key of the email lookup index.
    pub gsi_email: String,
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_seller: bool,
    pub super_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn from_user(user: &User) -> Self {
        let id = transform_id(user.id);
        Self {
            pk: keys::user_pk(&id),
            sk: keys::PROFILE_SK.to_string(),
            gsi_email: keys::email_pk(&user.email),
            id,
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_seller: user.is_seller,
            super_admin: user.super_admin,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }

    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_id("id", &self.id)?,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            is_seller: self.is_seller,
            super_admin: self.super_admin,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ============================================================================
// Product
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub pk: String,
    pub sk: String,
    pub id: String,
    pub seller_id: String,
    pub category_id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub inventory_quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRecord {
    pub fn from_product(product: &Product) -> Self {
        let id = transform_id(product.id);
        let seller_id = transform_id(product.seller_id);
        Self {
            pk: keys::product_pk(&id),
            sk: keys::product_sk(&seller_id),
            id,
            seller_id,
            category_id: transform_id(product.category_id),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            inventory_quantity: product.inventory_quantity,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }

    pub fn into_product(self) -> Result<Product> {
        Ok(Product {
            id: parse_id("id", &self.id)?,
            seller_id: parse_id("seller_id", &self.seller_id)?,
            category_id: parse_id("category_id", &self.category_id)?,
            name: self.name,
            description: self.description,
            price: self.price,
            inventory_quantity: self.inventory_quantity,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ============================================================================
// Category
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub pk: String,
    pub sk: String,
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
    /// Name of the parent category, or `ROOT`.
    pub parent_name: String,
    pub category_name: String,
    pub created_at: DateTime<Utc>,
}

impl CategoryRecord {
    /// `parent_name` is `None` for root categories or when the parent could
    /// not be resolved; both land in the `ROOT` partition.
    pub fn from_category(category: &Category, parent_name: Option<&str>) -> Self {
        let parent_name = parent_name.unwrap_or(keys::ROOT_PARENT).to_string();
        Self {
            pk: keys::category_pk(&parent_name),
            sk: keys::category_sk(&category.name),
            id: transform_id(category.id),
            name: category.name.clone(),
            parent_id: category.parent_id.map(transform_id),
            parent_name,
            category_name: category.name.clone(),
            created_at: category.created_at,
        }
    }

    pub fn into_category(self) -> Result<Category> {
        let parent_id = match self.parent_id {
            Some(ref p) => Some(parse_id("parent_id", p)?),
            None => None,
        };
        Ok(Category {
            id: parse_id("id", &self.id)?,
            name: self.name,
            parent_id,
            created_at: self.created_at,
        })
    }
}

// ============================================================================
// Order
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineRecord {
    pub pk: String,
    pub sk: String,
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i32,
    pub price_at_time: f64,
}

impl OrderLineRecord {
    pub fn from_order_item(item: &OrderItem) -> Self {
        let id = transform_id(item.id);
        let order_id = transform_id(item.order_id);
        Self {
            pk: keys::order_line_pk(&order_id),
            sk: keys::order_line_sk(&id),
            id,
            order_id,
            product_id: transform_id(item.product_id),
            quantity: item.quantity,
            price_at_time: item.price_at_time,
        }
    }

    pub fn into_order_item(self) -> Result<OrderItem> {
        Ok(OrderItem {
            id: parse_id("id", &self.id)?,
            order_id: parse_id("order_id", &self.order_id)?,
            product_id: parse_id("product_id", &self.product_id)?,
            quantity: self.quantity,
            price_at_time: self.price_at_time,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub pk: String,
    pub sk: String,
    pub id: String,
    pub user_id: String,
    /// Owner's email, denormalized so orders can be listed per user.
    pub user_email: String,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub order_items: Vec<OrderLineRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRecord {
    pub fn from_order(order: &Order, user_email: &str, items: &[OrderItem]) -> Self {
        let id = transform_id(order.id);
        Self {
            pk: keys::owner_pk(user_email),
            sk: keys::order_sk(&id),
            id,
            user_id: transform_id(order.user_id),
            user_email: user_email.to_string(),
            total_amount: order.total_amount,
            status: order.status,
            order_items: items.iter().map(OrderLineRecord::from_order_item).collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }

    pub fn into_order(self) -> Result<Order> {
        Ok(Order {
            id: parse_id("id", &self.id)?,
            user_id: parse_id("user_id", &self.user_id)?,
            total_amount: self.total_amount,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ============================================================================
// Cart
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartRecord {
    pub pk: String,
    pub sk: String,
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub user_email: String,
    pub product_name: String,
    pub product_price: f64,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartRecord {
    pub fn from_cart_item(item: &CartItem, user_email: &str, product: &Product) -> Self {
        let product_id = transform_id(item.product_id);
        Self {
            pk: keys::owner_pk(user_email),
            sk: keys::cart_sk(&product_id),
            id: transform_id(item.id),
            user_id: transform_id(item.user_id),
            product_id,
            user_email: user_email.to_string(),
            product_name: product.name.clone(),
            product_price: product.price,
            quantity: item.quantity,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }

    pub fn into_cart_item(self) -> Result<CartItem> {
        Ok(CartItem {
            id: parse_id("id", &self.id)?,
            user_id: parse_id("user_id", &self.user_id)?,
            product_id: parse_id("product_id", &self.product_id)?,
            quantity: self.quantity,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl Record for UserRecord {
    type Entity = User;
    const KIND: &'static str = "User";

    fn key(&self) -> (&str, &str) {
        (&self.pk, &self.sk)
    }

    fn record_id(&self) -> &str {
        &self.id
    }

    fn into_entity(self) -> Result<User> {
        self.into_user()
    }
}

impl Record for ProductRecord {
    type Entity = Product;
    const KIND: &'static str = "Product";

    fn key(&self) -> (&str, &str) {
        (&self.pk, &self.sk)
    }

    fn record_id(&self) -> &str {
        &self.id
    }

    fn into_entity(self) -> Result<Product> {
        self.into_product()
    }
}

impl Record for CategoryRecord {
    type Entity = Category;
    const KIND: &'static str = "Category";

    fn key(&self) -> (&str, &str) {
        (&self.pk, &self.sk)
    }

    fn record_id(&self) -> &str {
        &self.id
    }

    fn into_entity(self) -> Result<Category> {
        self.into_category()
    }
}

impl Record for OrderRecord {
    type Entity = Order;
    const KIND: &'static str = "Order";

    fn key(&self) -> (&str, &str) {
        (&self.pk, &self.sk)
    }

    fn record_id(&self) -> &str {
        &self.id
    }

    fn into_entity(self) -> Result<Order> {
        self.into_order()
    }
}

impl Record for OrderLineRecord {
    type Entity = OrderItem;
    const KIND: &'static str = "OrderItem";

    fn key(&self) -> (&str, &str) {
        (&self.pk, &self.sk)
    }

    fn record_id(&self) -> &str {
        &self.id
    }

    fn into_entity(self) -> Result<OrderItem> {
        self.into_order_item()
    }
}

impl Record for CartRecord {
    type Entity = CartItem;
    const KIND: &'static str = "CartItem";

    fn key(&self) -> (&str, &str) {
        (&self.pk, &self.sk)
    }

    fn record_id(&self) -> &str {
        &self.id
    }

    fn into_entity(self) -> Result<CartItem> {
        self.into_cart_item()
    }
}
