use async_trait::async_trait;

use crate::commerce::{
    CartItem, Category, CreateCategory, CreateProduct, CreateUser, Order, OrderItem, OrderStatus,
    Product, UpdateCategory, UpdateProduct, UpdateUser, User,
};

use super::{Record, Result};

/// Repository for user operations.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Gets a user by their ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Gets a user by their username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Gets a user by their email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Creates a new user, assigning its ID and timestamps.
    async fn create(&self, request: &CreateUser) -> Result<User>;

    /// Applies a patch. Returns `None` if the user does not exist.
    async fn update(&self, id: i64, patch: &UpdateUser) -> Result<Option<User>>;

    /// Deletes a user. Returns whether anything was removed.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Marks a user as a seller.
    async fn upgrade_to_seller(&self, id: i64) -> Result<Option<User>>;

    async fn promote_to_super_admin(&self, id: i64) -> Result<Option<User>>;

    async fn demote_from_super_admin(&self, id: i64) -> Result<Option<User>>;
}

/// Repository for product operations.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Product>>;

    /// Gets all products in a category.
    async fn find_by_category(&self, category_id: i64) -> Result<Vec<Product>>;

    async fn create(&self, seller_id: i64, request: &CreateProduct) -> Result<Product>;

    /// Updates a product owned by `seller_id`.
    async fn update(
        &self,
        id: i64,
        seller_id: i64,
        patch: &UpdateProduct,
    ) -> Result<Option<Product>>;

    /// Deletes a product owned by `seller_id`.
    async fn delete(&self, id: i64, seller_id: i64) -> Result<bool>;

    /// Sets the inventory quantity.
    async fn update_inventory(&self, id: i64, quantity: i32) -> Result<Option<Product>>;

    /// Takes `quantity` units out of stock if at least that many are left.
    ///
    /// Returns `false` without changing anything when stock is short or the
    /// product does not exist.
    async fn reduce_inventory(&self, id: i64, quantity: i32) -> Result<bool>;
}

/// Repository for category operations.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Gets the children of `parent_id`, or the root categories for `None`.
    async fn find_by_parent_id(&self, parent_id: Option<i64>) -> Result<Vec<Category>>;

    async fn create(&self, request: &CreateCategory) -> Result<Category>;

    async fn update(&self, id: i64, patch: &UpdateCategory) -> Result<Option<Category>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Repository for order operations.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Order>>;

    /// Gets all orders placed by a user.
    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Order>>;

    /// Gets the line items of an order.
    async fn find_items(&self, order_id: i64) -> Result<Vec<OrderItem>>;

    /// Creates a pending order.
    async fn create_order(&self, user_id: i64, total_amount: f64) -> Result<Order>;

    async fn create_order_item(
        &self,
        order_id: i64,
        product_id: i64,
        quantity: i32,
        price_at_time: f64,
    ) -> Result<OrderItem>;

    async fn update_status(&self, order_id: i64, status: OrderStatus) -> Result<Option<Order>>;
}

/// Repository for shopping cart operations.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn get_items(&self, user_id: i64) -> Result<Vec<CartItem>>;

    async fn get_item(&self, user_id: i64, product_id: i64) -> Result<Option<CartItem>>;

    /// Adds a product to the cart, or increases its quantity if present.
    async fn add_item(&self, user_id: i64, product_id: i64, quantity: i32) -> Result<CartItem>;

    async fn update_quantity(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<Option<CartItem>>;

    async fn remove_item(&self, user_id: i64, product_id: i64) -> Result<bool>;

    /// Empties a user's cart. Returns whether anything was removed.
    async fn clear(&self, user_id: i64) -> Result<bool>;
}

/// Upsert of a transformed record into the secondary store.
///
/// The record carries the identifiers the primary generated, so the
/// secondary never assigns its own IDs on this path. Items are matched by
/// [`Record::KIND`] and [`Record::record_id`]: a record whose key changed
/// (a renamed category, an order whose owner changed email) replaces the
/// item stored under the old key.
#[async_trait]
pub trait MirrorStore<R: Record>: Send + Sync {
    async fn put_record(&self, record: R) -> Result<R::Entity>;
}
