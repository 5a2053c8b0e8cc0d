use std::sync::Arc;

use dualstore_core::commerce::{Order, OrderItem, OrderStatus};
use dualstore_core::migration::validation::{compare_lists, compare_order_items, compare_orders};
use dualstore_core::migration::{MigrationConfig, Result};
use dualstore_core::storage::{
    self, MirrorStore, OrderLineRecord, OrderRecord, OrderRepository, RepositoryError,
    UserRepository,
};

use super::{absent_as_none, require};
use crate::orchestrator::{DualReader, DualWriter, ReadOperation, WriteOperation};

const ENTITY: &str = "Order";
const ITEM_ENTITY: &str = "OrderItem";

/// Order operations across both stores.
///
/// Secondary order records live under the owner's email partition and embed
/// the order's line items, so each mirrored write reads the owner from `users`
/// and the current lines from the primary.
pub struct OrderAdapter<P, S, U> {
    primary: Arc<P>,
    secondary: Arc<S>,
    users: Arc<U>,
    writer: DualWriter,
    reader: DualReader,
    item_writer: DualWriter,
    item_reader: DualReader,
}

impl<P, S, U> OrderAdapter<P, S, U>
where
    P: OrderRepository,
    S: OrderRepository + MirrorStore<OrderRecord> + MirrorStore<OrderLineRecord>,
    U: UserRepository,
{
    pub fn new(
        primary: Arc<P>,
        secondary: Arc<S>,
        users: Arc<U>,
        config: Arc<MigrationConfig>,
    ) -> Self {
        Self {
            primary,
            secondary,
            users,
            writer: DualWriter::new(Arc::clone(&config), ENTITY),
            reader: DualReader::new(Arc::clone(&config), ENTITY),
            item_writer: DualWriter::new(Arc::clone(&config), ITEM_ENTITY),
            item_reader: DualReader::new(config, ITEM_ENTITY),
        }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Order>> {
        let op = ReadOperation::new(
            id,
            move || self.primary.find_by_id(id),
            move || self.secondary.find_by_id(id),
        );
        self.reader
            .execute(op, compare_orders, "find_by_id")
            .await
            .into_result()
    }

    pub async fn find_by_user(&self, user_id: i64) -> Result<Vec<Order>> {
        let op = ReadOperation::new(
            format!("user:{user_id}"),
            move || async move { self.primary.find_by_user(user_id).await.map(Some) },
            move || async move { self.secondary.find_by_user(user_id).await.map(Some) },
        );
        let orders = self
            .reader
            .execute(
                op,
                |primary: &Vec<Order>, secondary: &Vec<Order>| {
                    compare_lists(primary, secondary, compare_orders)
                },
                "find_by_user",
            )
            .await
            .into_result()?;
        Ok(orders.unwrap_or_default())
    }

    pub async fn find_items(&self, order_id: i64) -> Result<Vec<OrderItem>> {
        let op = ReadOperation::new(
            format!("order:{order_id}"),
            move || async move { self.primary.find_items(order_id).await.map(Some) },
            move || async move { self.secondary.find_items(order_id).await.map(Some) },
        );
        let items = self
            .item_reader
            .execute(
                op,
                |primary: &Vec<OrderItem>, secondary: &Vec<OrderItem>| {
                    compare_lists(primary, secondary, compare_order_items)
                },
                "find_items",
            )
            .await
            .into_result()?;
        Ok(items.unwrap_or_default())
    }

    /// Creates a pending order. A failed mirror leaves the primary order in
    /// place.
    pub async fn create_order(&self, user_id: i64, total_amount: f64) -> Result<Order> {
        let op = WriteOperation::new(
            move || self.primary.create_order(user_id, total_amount),
            move |order: Order| async move { self.mirror_order(&order).await },
        )
        .with_secondary_only(move || self.secondary.create_order(user_id, total_amount));

        self.writer
            .execute(op, "create_order")
            .await
            .into_result()
            .map_err(Into::into)
    }

    pub async fn create_order_item(
        &self,
        order_id: i64,
        product_id: i64,
        quantity: i32,
        price_at_time: f64,
    ) -> Result<OrderItem> {
        let op = WriteOperation::new(
            move || {
                self.primary
                    .create_order_item(order_id, product_id, quantity, price_at_time)
            },
            move |item: OrderItem| async move { self.mirror_line(item).await },
        )
        .with_secondary_only(move || {
            self.secondary
                .create_order_item(order_id, product_id, quantity, price_at_time)
        });

        self.item_writer
            .execute(op, "create_order_item")
            .await
            .into_result()
            .map_err(Into::into)
    }

    pub async fn update_status(&self, order_id: i64, status: OrderStatus) -> Result<Option<Order>> {
        let op = WriteOperation::new(
            move || async move {
                self.primary
                    .update_status(order_id, status)
                    .await
                    .and_then(|updated| require(ENTITY, order_id, updated))
            },
            move |order: Order| async move { self.mirror_order(&order).await },
        )
        .with_secondary_only(move || async move {
            self.secondary
                .update_status(order_id, status)
                .await
                .and_then(|updated| require(ENTITY, order_id, updated))
        });

        absent_as_none(self.writer.execute(op, "update_status").await.into_result())
    }

    /// Writes the line item, then rewrites its order so the embedded lines
    /// include it.
    async fn mirror_line(&self, item: OrderItem) -> storage::Result<OrderItem> {
        let record = OrderLineRecord::from_order_item(&item);
        MirrorStore::<OrderLineRecord>::put_record(&*self.secondary, record).await?;
        if let Some(order) = self.primary.find_by_id(item.order_id).await? {
            self.mirror_order(&order).await?;
        }
        Ok(item)
    }

    async fn mirror_order(&self, order: &Order) -> storage::Result<Order> {
        let owner = self
            .users
            .find_by_id(order.user_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User", order.user_id))?;
        let items = self.primary.find_items(order.id).await?;
        let record = OrderRecord::from_order(order, &owner.email, &items);
        MirrorStore::<OrderRecord>::put_record(&*self.secondary, record).await
    }
}
