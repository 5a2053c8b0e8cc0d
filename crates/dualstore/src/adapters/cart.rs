use std::sync::Arc;

use dualstore_core::commerce::{CartItem, Deletion};
use dualstore_core::migration::validation::{compare_cart_items, compare_lists};
use dualstore_core::migration::{MigrationConfig, Result};
use dualstore_core::storage::{
    self, CartRecord, CartRepository, MirrorStore, ProductRepository, RepositoryError,
    UserRepository,
};

use super::{absent_as_none, require};
use crate::orchestrator::{DualReader, DualWriter, ReadOperation, WriteOperation};

const ENTITY: &str = "CartItem";

fn item_key(user_id: i64, product_id: i64) -> String {
    format!("{user_id}-{product_id}")
}

/// Shopping cart operations across both stores.
///
/// Secondary cart records carry the owner's email and the product's name and
/// price, resolved through the primary `users` and `products` repositories.
pub struct CartAdapter<P, S, U, R> {
    primary: Arc<P>,
    secondary: Arc<S>,
    users: Arc<U>,
    products: Arc<R>,
    writer: DualWriter,
    reader: DualReader,
}

impl<P, S, U, R> CartAdapter<P, S, U, R>
where
    P: CartRepository,
    S: CartRepository + MirrorStore<CartRecord>,
    U: UserRepository,
    R: ProductRepository,
{
    pub fn new(
        primary: Arc<P>,
        secondary: Arc<S>,
        users: Arc<U>,
        products: Arc<R>,
        config: Arc<MigrationConfig>,
    ) -> Self {
        Self {
            primary,
            secondary,
            users,
            products,
            writer: DualWriter::new(Arc::clone(&config), ENTITY),
            reader: DualReader::new(config, ENTITY),
        }
    }

    pub async fn get_items(&self, user_id: i64) -> Result<Vec<CartItem>> {
        let op = ReadOperation::new(
            format!("user:{user_id}"),
            move || async move { self.primary.get_items(user_id).await.map(Some) },
            move || async move { self.secondary.get_items(user_id).await.map(Some) },
        );
        let items = self
            .reader
            .execute(
                op,
                |primary: &Vec<CartItem>, secondary: &Vec<CartItem>| {
                    compare_lists(primary, secondary, compare_cart_items)
                },
                "get_items",
            )
            .await
            .into_result()?;
        Ok(items.unwrap_or_default())
    }

    pub async fn get_item(&self, user_id: i64, product_id: i64) -> Result<Option<CartItem>> {
        let op = ReadOperation::new(
            item_key(user_id, product_id),
            move || self.primary.get_item(user_id, product_id),
            move || self.secondary.get_item(user_id, product_id),
        );
        self.reader
            .execute(op, compare_cart_items, "get_item")
            .await
            .into_result()
    }

    /// Adds `quantity` of a product to the cart.
    ///
    /// If the mirror write fails, the primary is put back the way it was:
    /// a new line is removed, an existing line gets its old quantity back.
    pub async fn add_item(&self, user_id: i64, product_id: i64, quantity: i32) -> Result<CartItem> {
        let op = WriteOperation::new(
            move || self.primary.add_item(user_id, product_id, quantity),
            move |item: CartItem| async move { self.mirror(&item).await },
        )
        .with_secondary_only(move || self.secondary.add_item(user_id, product_id, quantity))
        .with_rollback(move |item: CartItem| async move {
            if item.quantity > quantity {
                self.primary
                    .update_quantity(user_id, product_id, item.quantity - quantity)
                    .await
                    .map(|_| ())
            } else {
                self.primary
                    .remove_item(user_id, product_id)
                    .await
                    .map(|_| ())
            }
        });

        self.writer
            .execute(op, "add_item")
            .await
            .into_result()
            .map_err(Into::into)
    }

    pub async fn update_quantity(
        &self,
        user_id: i64,
        product_id: i64,
        quantity: i32,
    ) -> Result<Option<CartItem>> {
        let op = WriteOperation::new(
            move || async move {
                self.primary
                    .update_quantity(user_id, product_id, quantity)
                    .await
                    .and_then(|updated| require(ENTITY, item_key(user_id, product_id), updated))
            },
            move |item: CartItem| async move { self.mirror(&item).await },
        )
        .with_secondary_only(move || async move {
            self.secondary
                .update_quantity(user_id, product_id, quantity)
                .await
                .and_then(|updated| require(ENTITY, item_key(user_id, product_id), updated))
        });

        absent_as_none(
            self.writer
                .execute(op, "update_quantity")
                .await
                .into_result(),
        )
    }

    pub async fn remove_item(&self, user_id: i64, product_id: i64) -> Result<bool> {
        let key = item_key(user_id, product_id);
        let op = WriteOperation::new(
            {
                let key = key.clone();
                move || async move {
                    let removed = self.primary.remove_item(user_id, product_id).await;
                    removed.map(|removed| Deletion::new(key, removed))
                }
            },
            {
                let key = key.clone();
                move |deletion: Deletion| async move {
                    if deletion.deleted {
                        let removed = self.secondary.remove_item(user_id, product_id).await;
                        removed.map(|removed| Deletion::new(key, removed))
                    } else {
                        Ok(deletion)
                    }
                }
            },
        )
        .with_secondary_only(move || async move {
            let removed = self.secondary.remove_item(user_id, product_id).await;
            removed.map(|removed| Deletion::new(key, removed))
        });

        let deletion = self.writer.execute(op, "remove_item").await.into_result()?;
        Ok(deletion.deleted)
    }

    /// Empties the user's cart. The secondary is only cleared when the
    /// primary had something to clear.
    pub async fn clear(&self, user_id: i64) -> Result<bool> {
        let op = WriteOperation::new(
            move || async move {
                let cleared = self.primary.clear(user_id).await;
                cleared.map(|cleared| Deletion::new(user_id, cleared))
            },
            move |deletion: Deletion| async move {
                if deletion.deleted {
                    let cleared = self.secondary.clear(user_id).await;
                    cleared.map(|cleared| Deletion::new(user_id, cleared))
                } else {
                    Ok(deletion)
                }
            },
        )
        .with_secondary_only(move || async move {
            let cleared = self.secondary.clear(user_id).await;
            cleared.map(|cleared| Deletion::new(user_id, cleared))
        });

        let deletion = self.writer.execute(op, "clear").await.into_result()?;
        Ok(deletion.deleted)
    }

    async fn mirror(&self, item: &CartItem) -> storage::Result<CartItem> {
        let owner = self
            .users
            .find_by_id(item.user_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User", item.user_id))?;
        let product = self
            .products
            .find_by_id(item.product_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Product", item.product_id))?;
        let record = CartRecord::from_cart_item(item, &owner.email, &product);
        self.secondary.put_record(record).await
    }
}
