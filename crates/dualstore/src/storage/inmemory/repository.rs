//! In-memory repository implementation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use dualstore_core::commerce::{
    CartItem, Category, CreateCategory, CreateProduct, CreateUser, Order, OrderItem, OrderStatus,
    Product, UpdateCategory, UpdateProduct, UpdateUser, User,
};
use dualstore_core::storage::{
    keys, transform_id, CartRecord, CartRepository, CategoryRecord, CategoryRepository,
    MirrorStore, OrderLineRecord, OrderRecord, OrderRepository, ProductRecord, ProductRepository,
    Record, RepositoryError, Result, UserRecord, UserRepository,
};

/// Auto-increment counters, one per table.
#[derive(Debug, Default)]
struct Sequences {
    users: AtomicI64,
    products: AtomicI64,
    categories: AtomicI64,
    orders: AtomicI64,
    order_items: AtomicI64,
    cart_items: AtomicI64,
}

fn next_id(sequence: &AtomicI64) -> i64 {
    sequence.fetch_add(1, Ordering::SeqCst) + 1
}

/// Keeps the counter ahead of ids assigned elsewhere, so mirrored rows and
/// locally created rows never collide.
fn observe_id(sequence: &AtomicI64, id: i64) {
    sequence.fetch_max(id, Ordering::SeqCst);
}

type ItemKey = (String, String);

/// Items written through [`MirrorStore`], plus where each record currently
/// lives. A record is identified by its kind and id, not by its key.
#[derive(Debug, Default)]
struct Mirrored {
    items: BTreeMap<ItemKey, Value>,
    keys: BTreeMap<(&'static str, String), ItemKey>,
}

impl Mirrored {
    fn put(&mut self, kind: &'static str, id: &str, key: ItemKey, value: Value) {
        if let Some(previous) = self.keys.insert((kind, id.to_string()), key.clone()) {
            if previous != key {
                self.items.remove(&previous);
            }
        }
        self.items.insert(key, value);
    }

    fn forget(&mut self, kind: &'static str, id: &str) {
        if let Some(key) = self.keys.remove(&(kind, id.to_string())) {
            self.items.remove(&key);
        }
    }

    /// Re-keys every item of the `from` partition into `to`, rewriting the
    /// denormalized owner email on the way.
    fn move_partition(&mut self, from: &str, to: &str, email: &str) {
        let moved: Vec<ItemKey> = self
            .items
            .keys()
            .filter(|(pk, _)| pk == from)
            .cloned()
            .collect();
        for key in moved {
            let Some(mut value) = self.items.remove(&key) else {
                continue;
            };
            if let Some(fields) = value.as_object_mut() {
                fields.insert("pk".to_string(), Value::from(to));
                fields.insert("user_email".to_string(), Value::from(email));
            }
            self.items.insert((to.to_string(), key.1), value);
        }
        for key in self.keys.values_mut().filter(|(pk, _)| pk == from) {
            key.0 = to.to_string();
        }
    }
}

/// In-memory store usable as either side of a migration.
///
/// Tables are `BTreeMap`s behind `Arc<RwLock<_>>`, so list reads come back
/// in id order. Clones share state. Two extras exist for exercising
/// failure paths: an availability switch that makes every call fail with
/// `ConnectionFailed`, and a call counter.
#[derive(Debug, Clone)]
pub struct InMemoryRepository {
    name: &'static str,
    users: Arc<RwLock<BTreeMap<i64, User>>>,
    products: Arc<RwLock<BTreeMap<i64, Product>>>,
    categories: Arc<RwLock<BTreeMap<i64, Category>>>,
    orders: Arc<RwLock<BTreeMap<i64, Order>>>,
    order_items: Arc<RwLock<BTreeMap<i64, OrderItem>>>,
    cart_items: Arc<RwLock<BTreeMap<(i64, i64), CartItem>>>,
    mirrored: Arc<RwLock<Mirrored>>,
    sequences: Arc<Sequences>,
    unavailable: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::named("store")
    }

    /// Creates a new empty repository whose errors mention `name`.
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            users: Arc::new(RwLock::new(BTreeMap::new())),
            products: Arc::new(RwLock::new(BTreeMap::new())),
            categories: Arc::new(RwLock::new(BTreeMap::new())),
            orders: Arc::new(RwLock::new(BTreeMap::new())),
            order_items: Arc::new(RwLock::new(BTreeMap::new())),
            cart_items: Arc::new(RwLock::new(BTreeMap::new())),
            mirrored: Arc::new(RwLock::new(Mirrored::default())),
            sequences: Arc::new(Sequences::default()),
            unavailable: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// While set, every call fails with `ConnectionFailed("<name> unavailable")`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of repository calls made so far, failed ones included.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the mirrored item stored under `pk`/`sk`, as JSON.
    pub async fn mirrored_item(&self, pk: &str, sk: &str) -> Option<Value> {
        let mirrored = self.mirrored.read().await;
        mirrored.items.get(&(pk.to_string(), sk.to_string())).cloned()
    }

    pub async fn mirrored_count(&self) -> usize {
        self.mirrored.read().await.items.len()
    }

    fn begin(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::ConnectionFailed(format!(
                "{} unavailable",
                self.name
            )));
        }
        Ok(())
    }

    async fn store_item<R: Record>(&self, record: &R) -> Result<()> {
        let value = serde_json::to_value(record)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let (pk, sk) = record.key();
        let mut mirrored = self.mirrored.write().await;
        mirrored.put(
            R::KIND,
            record.record_id(),
            (pk.to_string(), sk.to_string()),
            value,
        );
        Ok(())
    }

    async fn forget_item(&self, kind: &'static str, id: i64) {
        self.mirrored.write().await.forget(kind, &transform_id(id));
    }

    async fn modify_user(
        &self,
        id: i64,
        apply: impl FnOnce(&mut User) + Send,
    ) -> Result<Option<User>> {
        self.begin()?;
        let mut users = self.users.write().await;
        Ok(users.get_mut(&id).map(|user| {
            apply(user);
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        self.begin()?;
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.begin()?;
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.begin()?;
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, request: &CreateUser) -> Result<User> {
        self.begin()?;
        let mut users = self.users.write().await;
        if let Some(existing) = users
            .values()
            .find(|u| u.username == request.username || u.email == request.email)
        {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "User",
                id: existing.username.clone(),
            });
        }

        let now = Utc::now();
        let user = User {
            id: next_id(&self.sequences.users),
            username: request.username.clone(),
            email: request.email.clone(),
            password_hash: request.password_hash.clone(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            is_seller: false,
            super_admin: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: i64, patch: &UpdateUser) -> Result<Option<User>> {
        self.begin()?;
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = &patch.email {
            user.email = email.clone();
        }
        if let Some(first_name) = &patch.first_name {
            user.first_name = Some(first_name.clone());
        }
        if let Some(last_name) = &patch.last_name {
            user.last_name = Some(last_name.clone());
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        self.begin()?;
        let removed = self.users.write().await.remove(&id).is_some();
        if removed {
            self.forget_item(UserRecord::KIND, id).await;
        }
        Ok(removed)
    }

    async fn upgrade_to_seller(&self, id: i64) -> Result<Option<User>> {
        self.modify_user(id, |user| user.is_seller = true).await
    }

    async fn promote_to_super_admin(&self, id: i64) -> Result<Option<User>> {
        self.modify_user(id, |user| user.super_admin = true).await
    }

    async fn demote_from_super_admin(&self, id: i64) -> Result<Option<User>> {
        self.modify_user(id, |user| user.super_admin = false).await
    }
}

#[async_trait]
impl ProductRepository for InMemoryRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Product>> {
        self.begin()?;
        let products = self.products.read().await;
        Ok(products.get(&id).cloned())
    }

    async fn find_by_category(&self, category_id: i64) -> Result<Vec<Product>> {
        self.begin()?;
        let products = self.products.read().await;
        Ok(products
            .values()
            .filter(|p| p.category_id == category_id)
            .cloned()
            .collect())
    }

    async fn create(&self, seller_id: i64, request: &CreateProduct) -> Result<Product> {
        self.begin()?;
        let now = Utc::now();
        let product = Product {
            id: next_id(&self.sequences.products),
            seller_id,
            category_id: request.category_id,
            name: request.name.clone(),
            description: request.description.clone(),
            price: request.price,
            inventory_quantity: request.inventory_quantity,
            created_at: now,
            updated_at: now,
        };
        let mut products = self.products.write().await;
        products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update(
        &self,
        id: i64,
        seller_id: i64,
        patch: &UpdateProduct,
    ) -> Result<Option<Product>> {
        self.begin()?;
        let mut products = self.products.write().await;
        let Some(product) = products.get_mut(&id).filter(|p| p.seller_id == seller_id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            product.name = name.clone();
        }
        if let Some(description) = &patch.description {
            product.description = Some(description.clone());
        }
        if let Some(category_id) = patch.category_id {
            product.category_id = category_id;
        }
        if let Some(price) = patch.price {
            product.price = price;
        }
        if let Some(quantity) = patch.inventory_quantity {
            product.inventory_quantity = quantity;
        }
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete(&self, id: i64, seller_id: i64) -> Result<bool> {
        self.begin()?;
        {
            let mut products = self.products.write().await;
            if !products.get(&id).is_some_and(|p| p.seller_id == seller_id) {
                return Ok(false);
            }
            products.remove(&id);
        }
        self.forget_item(ProductRecord::KIND, id).await;
        Ok(true)
    }

    async fn update_inventory(&self, id: i64, quantity: i32) -> Result<Option<Product>> {
        self.begin()?;
        let mut products = self.products.write().await;
        Ok(products.get_mut(&id).map(|product| {
            product.inventory_quantity = quantity;
            product.updated_at = Utc::now();
            product.clone()
        }))
    }

    async fn reduce_inventory(&self, id: i64, quantity: i32) -> Result<bool> {
        self.begin()?;
        let mut products = self.products.write().await;
        match products.get_mut(&id) {
            Some(product) if product.inventory_quantity >= quantity => {
                product.inventory_quantity -= quantity;
                product.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl CategoryRepository for InMemoryRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>> {
        self.begin()?;
        let categories = self.categories.read().await;
        Ok(categories.get(&id).cloned())
    }

    async fn find_by_parent_id(&self, parent_id: Option<i64>) -> Result<Vec<Category>> {
        self.begin()?;
        let categories = self.categories.read().await;
        Ok(categories
            .values()
            .filter(|c| c.parent_id == parent_id)
            .cloned()
            .collect())
    }

    async fn create(&self, request: &CreateCategory) -> Result<Category> {
        self.begin()?;
        let mut categories = self.categories.write().await;
        if let Some(parent_id) = request.parent_id {
            if !categories.contains_key(&parent_id) {
                return Err(RepositoryError::not_found("Category", parent_id));
            }
        }
        if categories
            .values()
            .any(|c| c.parent_id == request.parent_id && c.name == request.name)
        {
            return Err(RepositoryError::AlreadyExists {
                entity_type: "Category",
                id: request.name.clone(),
            });
        }

        let category = Category {
            id: next_id(&self.sequences.categories),
            name: request.name.clone(),
            parent_id: request.parent_id,
            created_at: Utc::now(),
        };
        categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(&self, id: i64, patch: &UpdateCategory) -> Result<Option<Category>> {
        self.begin()?;
        let mut categories = self.categories.write().await;
        let Some(category) = categories.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            category.name = name.clone();
        }
        if let Some(parent_id) = patch.parent_id {
            category.parent_id = Some(parent_id);
        }
        Ok(Some(category.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        self.begin()?;
        let removed = self.categories.write().await.remove(&id).is_some();
        if removed {
            self.forget_item(CategoryRecord::KIND, id).await;
        }
        Ok(removed)
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Order>> {
        self.begin()?;
        let orders = self.orders.read().await;
        Ok(orders.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Order>> {
        self.begin()?;
        let orders = self.orders.read().await;
        Ok(orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        self.begin()?;
        let items = self.order_items.read().await;
        Ok(items
            .values()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn create_order(&self, user_id: i64, total_amount: f64) -> Result<Order> {
        self.begin()?;
        let now = Utc::now();
        let order = Order {
            id: next_id(&self.sequences.orders),
            user_id,
            total_amount,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let mut orders = self.orders.write().await;
        orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn create_order_item(
        &self,
        order_id: i64,
        product_id: i64,
        quantity: i32,
        price_at_time: f64,
    ) -> Result<OrderItem> {
        self.begin()?;
        if !self.orders.read().await.contains_key(&order_id) {
            return Err(RepositoryError::not_found("Order", order_id));
        }
        let item = OrderItem {
            id: next_id(&self.sequences.order_items),
            order_id,
            product_id,
            quantity,
            price_at_time,
        };
        let mut items = self.order_items.write().await;
        items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update_status(&self, order_id: i64, status: OrderStatus) -> Result<Option<Order>> {
        self.begin()?;
        let mut orders = self.orders.write().await;
        Ok(orders.get_mut(&order_id).map(|order| {
            order.status = status;
            order.updated_at = Utc::now();
            order.clone()
        }))
    }
}

#[async_trait]
impl CartRepository for InMemoryRepository {
    async fn get_items(&self, user_id: i64) -> Result<Vec<CartItem>> {
        self.begin()?;
        let cart_items = self.cart_items.read().await;
        Ok(cart_items
            .range((user_id, i64::MIN)..=(user_id, i64::MAX))
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn get_item(&self, user_id: i64, product_id: i64) -> Result<Option<CartItem>> {
        self.begin()?;
        let cart_items = self.cart_items.read().await;
        Ok(cart_items.get(&(user_id, product_id)).cloned())
    }

    async fn add_item(&self, user_id: i64, product_id: i64, quantity: i32) -> Result<CartItem> {
        self.begin()?;
        let now = Utc::now();
        let mut cart_items = self.cart_items.write().await;
        let item = cart_items
            .entry((user_id, product_id))
            .and_modify(|item| {
                item.quantity += quantity;
                item.updated_at = now;
            })
            .or_insert_with(|| CartItem {
                id: next_id(&self.sequences.cart_items),
                user_id,
                product_id,
                quantity,
                created_at: now,
                updated_at: now,
            });
        Ok(item.clone())
    }

    async fn update_quantity(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<Option<CartItem>> {
        self.begin()?;
        let mut cart_items = self.cart_items.write().await;
        Ok(cart_items.get_mut(&(user_id, product_id)).map(|item| {
            item.quantity = quantity;
            item.updated_at = Utc::now();
            item.clone()
        }))
    }

    async fn remove_item(&self, user_id: i64, product_id: i64) -> Result<bool> {
        self.begin()?;
        let removed = self.cart_items.write().await.remove(&(user_id, product_id));
        let Some(item) = removed else {
            return Ok(false);
        };
        self.forget_item(CartRecord::KIND, item.id).await;
        Ok(true)
    }

    async fn clear(&self, user_id: i64) -> Result<bool> {
        self.begin()?;
        let removed: Vec<i64> = {
            let mut cart_items = self.cart_items.write().await;
            let owned: Vec<(i64, i64)> = cart_items
                .range((user_id, i64::MIN)..=(user_id, i64::MAX))
                .map(|(key, _)| *key)
                .collect();
            owned
                .iter()
                .filter_map(|key| cart_items.remove(key))
                .map(|item| item.id)
                .collect()
        };
        for id in &removed {
            self.forget_item(CartRecord::KIND, *id).await;
        }
        Ok(!removed.is_empty())
    }
}

#[async_trait]
impl MirrorStore<UserRecord> for InMemoryRepository {
    /// An email change also moves the user's orders and cart lines, which
    /// are partitioned by owner email.
    async fn put_record(&self, record: UserRecord) -> Result<User> {
        self.begin()?;
        self.store_item(&record).await?;
        let user = record.into_entity()?;
        observe_id(&self.sequences.users, user.id);
        let previous = self.users.write().await.insert(user.id, user.clone());
        if let Some(previous) = previous.filter(|p| p.email != user.email) {
            self.mirrored.write().await.move_partition(
                &keys::owner_pk(&previous.email),
                &keys::owner_pk(&user.email),
                &user.email,
            );
        }
        Ok(user)
    }
}

#[async_trait]
impl MirrorStore<ProductRecord> for InMemoryRepository {
    async fn put_record(&self, record: ProductRecord) -> Result<Product> {
        self.begin()?;
        self.store_item(&record).await?;
        let product = record.into_entity()?;
        observe_id(&self.sequences.products, product.id);
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(product)
    }
}

#[async_trait]
impl MirrorStore<CategoryRecord> for InMemoryRepository {
    async fn put_record(&self, record: CategoryRecord) -> Result<Category> {
        self.begin()?;
        self.store_item(&record).await?;
        let category = record.into_entity()?;
        observe_id(&self.sequences.categories, category.id);
        self.categories
            .write()
            .await
            .insert(category.id, category.clone());
        Ok(category)
    }
}

#[async_trait]
impl MirrorStore<OrderRecord> for InMemoryRepository {
    async fn put_record(&self, record: OrderRecord) -> Result<Order> {
        self.begin()?;
        self.store_item(&record).await?;
        let lines = record
            .order_items
            .iter()
            .cloned()
            .map(OrderLineRecord::into_order_item)
            .collect::<Result<Vec<_>>>()?;
        let order = record.into_entity()?;

        observe_id(&self.sequences.orders, order.id);
        self.orders.write().await.insert(order.id, order.clone());

        let mut items = self.order_items.write().await;
        for line in lines {
            observe_id(&self.sequences.order_items, line.id);
            items.insert(line.id, line);
        }
        Ok(order)
    }
}

#[async_trait]
impl MirrorStore<OrderLineRecord> for InMemoryRepository {
    async fn put_record(&self, record: OrderLineRecord) -> Result<OrderItem> {
        self.begin()?;
        self.store_item(&record).await?;
        let item = record.into_entity()?;
        observe_id(&self.sequences.order_items, item.id);
        self.order_items.write().await.insert(item.id, item.clone());
        Ok(item)
    }
}

#[async_trait]
impl MirrorStore<CartRecord> for InMemoryRepository {
    async fn put_record(&self, record: CartRecord) -> Result<CartItem> {
        self.begin()?;
        self.store_item(&record).await?;
        let item = record.into_entity()?;
        observe_id(&self.sequences.cart_items, item.id);
        self.cart_items
            .write()
            .await
            .insert((item.user_id, item.product_id), item.clone());
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> CreateUser {
        CreateUser::new("alice", "alice@example.com", "hash").with_name("Alice", "Liddell")
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let repo = InMemoryRepository::new();

        let user = UserRepository::create(&repo, &alice()).await.unwrap();
        assert_eq!(user.id, 1);
        assert!(!user.is_seller);

        let by_email = repo.find_by_email("alice@example.com").await.unwrap();
        assert_eq!(by_email, Some(user.clone()));

        let patch = UpdateUser {
            last_name: Some("Hargreaves".to_string()),
            ..Default::default()
        };
        let updated = UserRepository::update(&repo, user.id, &patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.last_name.as_deref(), Some("Hargreaves"));
        assert_eq!(updated.first_name.as_deref(), Some("Alice"));

        let seller = repo.upgrade_to_seller(user.id).await.unwrap().unwrap();
        assert!(seller.is_seller);

        assert!(UserRepository::delete(&repo, user.id).await.unwrap());
        assert!(!UserRepository::delete(&repo, user.id).await.unwrap());
        assert_eq!(UserRepository::find_by_id(&repo, user.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_user_is_rejected() {
        let repo = InMemoryRepository::new();
        UserRepository::create(&repo, &alice()).await.unwrap();

        let result = UserRepository::create(&repo, &alice()).await;

        assert!(matches!(
            result,
            Err(RepositoryError::AlreadyExists {
                entity_type: "User",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let repo = InMemoryRepository::named("secondary");
        repo.set_unavailable(true);

        let err = UserRepository::find_by_id(&repo, 1).await.unwrap_err();

        assert_eq!(
            err,
            RepositoryError::ConnectionFailed("secondary unavailable".to_string())
        );
        assert_eq!(repo.call_count(), 1);

        repo.set_unavailable(false);
        assert!(UserRepository::find_by_id(&repo, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_mirrored_record_keeps_primary_id() {
        let primary = InMemoryRepository::named("primary");
        let secondary = InMemoryRepository::named("secondary");
        for name in ["a", "b", "c"] {
            let request = CreateUser::new(name, format!("{name}@example.com"), "hash");
            UserRepository::create(&primary, &request).await.unwrap();
        }
        let user = UserRepository::find_by_id(&primary, 3).await.unwrap().unwrap();

        let mirrored = secondary.put_record(UserRecord::from_user(&user)).await.unwrap();

        assert_eq!(mirrored, user);
        let item = secondary
            .mirrored_item(&keys::user_pk("3"), keys::PROFILE_SK)
            .await
            .unwrap();
        assert_eq!(item["id"], "3");
        assert_eq!(item["gsi_email"], keys::email_pk("c@example.com"));

        // Locally assigned ids continue past mirrored ones.
        let next = UserRepository::create(&secondary, &alice()).await.unwrap();
        assert_eq!(next.id, 4);
    }

    fn category(id: i64, name: &str, parent_id: Option<i64>) -> Category {
        Category {
            id,
            name: name.to_string(),
            parent_id,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_renamed_category_replaces_its_mirrored_item() {
        let secondary = InMemoryRepository::named("secondary");
        secondary
            .put_record(CategoryRecord::from_category(&category(2, "Fiction", None), None))
            .await
            .unwrap();

        secondary
            .put_record(CategoryRecord::from_category(&category(2, "Novels", None), None))
            .await
            .unwrap();

        assert_eq!(secondary.mirrored_count().await, 1);
        let root = keys::category_pk(keys::ROOT_PARENT);
        assert!(secondary
            .mirrored_item(&root, &keys::category_sk("Fiction"))
            .await
            .is_none());
        let item = secondary
            .mirrored_item(&root, &keys::category_sk("Novels"))
            .await
            .unwrap();
        assert_eq!(item["id"], "2");
    }

    #[tokio::test]
    async fn test_reparented_category_leaves_old_partition() {
        let secondary = InMemoryRepository::named("secondary");
        secondary
            .put_record(CategoryRecord::from_category(&category(2, "Fiction", None), None))
            .await
            .unwrap();

        secondary
            .put_record(CategoryRecord::from_category(
                &category(2, "Fiction", Some(1)),
                Some("Books"),
            ))
            .await
            .unwrap();

        assert_eq!(secondary.mirrored_count().await, 1);
        assert!(secondary
            .mirrored_item(
                &keys::category_pk(keys::ROOT_PARENT),
                &keys::category_sk("Fiction")
            )
            .await
            .is_none());
        assert!(secondary
            .mirrored_item(&keys::category_pk("Books"), &keys::category_sk("Fiction"))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn test_email_change_moves_orders_and_cart_lines() {
        let primary = InMemoryRepository::named("primary");
        let secondary = InMemoryRepository::named("secondary");
        let user = UserRepository::create(&primary, &alice()).await.unwrap();
        let request = CreateProduct {
            name: "Lamp".to_string(),
            description: None,
            category_id: 1,
            price: 25.0,
            inventory_quantity: 3,
        };
        let product = ProductRepository::create(&primary, user.id, &request)
            .await
            .unwrap();
        let order = primary.create_order(user.id, 25.0).await.unwrap();
        let line = primary.add_item(user.id, product.id, 1).await.unwrap();

        secondary.put_record(UserRecord::from_user(&user)).await.unwrap();
        secondary
            .put_record(OrderRecord::from_order(&order, &user.email, &[]))
            .await
            .unwrap();
        secondary
            .put_record(CartRecord::from_cart_item(&line, &user.email, &product))
            .await
            .unwrap();

        let patch = UpdateUser {
            email: Some("liddell@example.com".to_string()),
            ..Default::default()
        };
        let moved = UserRepository::update(&primary, user.id, &patch)
            .await
            .unwrap()
            .unwrap();
        secondary.put_record(UserRecord::from_user(&moved)).await.unwrap();

        assert_eq!(secondary.mirrored_count().await, 3);
        let old_pk = keys::owner_pk("alice@example.com");
        let new_pk = keys::owner_pk("liddell@example.com");
        let order_sk = keys::order_sk(&transform_id(order.id));
        let cart_sk = keys::cart_sk(&transform_id(product.id));
        assert!(secondary.mirrored_item(&old_pk, &order_sk).await.is_none());
        assert!(secondary.mirrored_item(&old_pk, &cart_sk).await.is_none());

        let order_item = secondary.mirrored_item(&new_pk, &order_sk).await.unwrap();
        assert_eq!(order_item["pk"], new_pk);
        assert_eq!(order_item["user_email"], "liddell@example.com");
        let cart_item = secondary.mirrored_item(&new_pk, &cart_sk).await.unwrap();
        assert_eq!(cart_item["user_email"], "liddell@example.com");

        // A later order write lands on the moved item, not beside it.
        let completed = primary
            .update_status(order.id, OrderStatus::Completed)
            .await
            .unwrap()
            .unwrap();
        secondary
            .put_record(OrderRecord::from_order(&completed, &moved.email, &[]))
            .await
            .unwrap();
        assert_eq!(secondary.mirrored_count().await, 3);
    }

    #[tokio::test]
    async fn test_deletes_drop_mirrored_items() {
        let secondary = InMemoryRepository::named("secondary");
        let user = UserRepository::create(&InMemoryRepository::new(), &alice())
            .await
            .unwrap();
        secondary.put_record(UserRecord::from_user(&user)).await.unwrap();
        secondary
            .put_record(CategoryRecord::from_category(&category(1, "Books", None), None))
            .await
            .unwrap();
        let now = Utc::now();
        let product = Product {
            id: 9,
            seller_id: user.id,
            category_id: 1,
            name: "Lamp".to_string(),
            description: None,
            price: 12.0,
            inventory_quantity: 3,
            created_at: now,
            updated_at: now,
        };
        let line = CartItem {
            id: 5,
            user_id: user.id,
            product_id: product.id,
            quantity: 1,
            created_at: now,
            updated_at: now,
        };
        secondary
            .put_record(ProductRecord::from_product(&product))
            .await
            .unwrap();
        secondary
            .put_record(CartRecord::from_cart_item(&line, &user.email, &product))
            .await
            .unwrap();
        assert_eq!(secondary.mirrored_count().await, 4);

        assert!(secondary.clear(user.id).await.unwrap());
        assert!(ProductRepository::delete(&secondary, product.id, user.id)
            .await
            .unwrap());
        assert!(CategoryRepository::delete(&secondary, 1).await.unwrap());
        assert!(UserRepository::delete(&secondary, user.id).await.unwrap());

        assert_eq!(secondary.mirrored_count().await, 0);
    }

    #[tokio::test]
    async fn test_reduce_inventory_requires_stock() {
        let repo = InMemoryRepository::new();
        let request = CreateProduct {
            name: "Lamp".to_string(),
            description: None,
            category_id: 1,
            price: 25.0,
            inventory_quantity: 3,
        };
        let product = ProductRepository::create(&repo, 7, &request).await.unwrap();

        assert!(!repo.reduce_inventory(product.id, 4).await.unwrap());
        assert!(repo.reduce_inventory(product.id, 3).await.unwrap());
        assert!(!repo.reduce_inventory(product.id, 1).await.unwrap());
        assert!(!repo.reduce_inventory(99, 1).await.unwrap());

        let stocked = ProductRepository::find_by_id(&repo, product.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stocked.inventory_quantity, 0);
    }

    #[tokio::test]
    async fn test_super_admin_promotion_and_demotion() {
        let repo = InMemoryRepository::new();
        let user = UserRepository::create(&repo, &alice()).await.unwrap();
        assert!(!user.super_admin);

        let promoted = repo.promote_to_super_admin(user.id).await.unwrap().unwrap();
        assert!(promoted.super_admin);

        let demoted = repo.demote_from_super_admin(user.id).await.unwrap().unwrap();
        assert!(!demoted.super_admin);

        assert_eq!(repo.promote_to_super_admin(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_category_children_and_roots() {
        let repo = InMemoryRepository::new();
        let books = CategoryRepository::create(&repo, &CreateCategory::root("Books"))
            .await
            .unwrap();
        let fiction = CategoryRepository::create(&repo, &CreateCategory::child("Fiction", books.id))
            .await
            .unwrap();

        assert_eq!(repo.find_by_parent_id(None).await.unwrap(), vec![books.clone()]);
        assert_eq!(
            repo.find_by_parent_id(Some(books.id)).await.unwrap(),
            vec![fiction]
        );

        let orphan = CategoryRepository::create(&repo, &CreateCategory::child("Lost", 99)).await;
        assert!(matches!(orphan, Err(RepositoryError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_product_ownership_is_enforced() {
        let repo = InMemoryRepository::new();
        let request = CreateProduct {
            name: "Lamp".to_string(),
            description: None,
            category_id: 1,
            price: 25.0,
            inventory_quantity: 3,
        };
        let product = ProductRepository::create(&repo, 7, &request).await.unwrap();

        let patch = UpdateProduct {
            price: Some(30.0),
            ..Default::default()
        };
        assert_eq!(
            ProductRepository::update(&repo, product.id, 8, &patch)
                .await
                .unwrap(),
            None
        );
        assert!(!ProductRepository::delete(&repo, product.id, 8).await.unwrap());

        let updated = ProductRepository::update(&repo, product.id, 7, &patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.price, 30.0);
        assert!(ProductRepository::delete(&repo, product.id, 7).await.unwrap());
    }

    #[tokio::test]
    async fn test_cart_add_accumulates_and_clear_is_per_user() {
        let repo = InMemoryRepository::new();

        repo.add_item(1, 10, 1).await.unwrap();
        let item = repo.add_item(1, 10, 2).await.unwrap();
        repo.add_item(2, 10, 1).await.unwrap();

        assert_eq!(item.quantity, 3);
        assert_eq!(repo.get_items(1).await.unwrap().len(), 1);

        assert!(repo.clear(1).await.unwrap());
        assert!(!repo.clear(1).await.unwrap());
        assert_eq!(repo.get_items(2).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_order_items_require_order() {
        let repo = InMemoryRepository::new();

        let missing = repo.create_order_item(1, 1, 1, 9.99).await;
        assert!(matches!(missing, Err(RepositoryError::NotFound { .. })));

        let order = repo.create_order(1, 19.98).await.unwrap();
        repo.create_order_item(order.id, 1, 2, 9.99).await.unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(repo.find_items(order.id).await.unwrap().len(), 1);

        let shipped = repo
            .update_status(order.id, OrderStatus::Completed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Completed);
    }
}
