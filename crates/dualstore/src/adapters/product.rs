use std::sync::Arc;

use dualstore_core::commerce::{CreateProduct, Deletion, Product, StockReduction, UpdateProduct};
use dualstore_core::migration::validation::{compare_lists, compare_products};
use dualstore_core::migration::{MigrationConfig, Result};
use dualstore_core::storage::{self, MirrorStore, ProductRecord, ProductRepository};

use super::{absent_as_none, require};
use crate::orchestrator::{DualReader, DualWriter, ReadOperation, WriteOperation};

const ENTITY: &str = "Product";

/// Product operations across both stores.
pub struct ProductAdapter<P, S> {
    primary: Arc<P>,
    secondary: Arc<S>,
    writer: DualWriter,
    reader: DualReader,
}

impl<P, S> ProductAdapter<P, S>
where
    P: ProductRepository,
    S: ProductRepository + MirrorStore<ProductRecord>,
{
    pub fn new(primary: Arc<P>, secondary: Arc<S>, config: Arc<MigrationConfig>) -> Self {
        Self {
            primary,
            secondary,
            writer: DualWriter::new(Arc::clone(&config), ENTITY),
            reader: DualReader::new(config, ENTITY),
        }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Product>> {
        let op = ReadOperation::new(
            id,
            move || self.primary.find_by_id(id),
            move || self.secondary.find_by_id(id),
        );
        self.reader
            .execute(op, compare_products, "find_by_id")
            .await
            .into_result()
    }

    pub async fn find_by_category(&self, category_id: i64) -> Result<Vec<Product>> {
        let op = ReadOperation::new(
            format!("category:{category_id}"),
            move || async move { self.primary.find_by_category(category_id).await.map(Some) },
            move || async move { self.secondary.find_by_category(category_id).await.map(Some) },
        );
        let products = self
            .reader
            .execute(
                op,
                |primary: &Vec<Product>, secondary: &Vec<Product>| {
                    compare_lists(primary, secondary, compare_products)
                },
                "find_by_category",
            )
            .await
            .into_result()?;
        Ok(products.unwrap_or_default())
    }

    pub async fn create(&self, seller_id: i64, request: &CreateProduct) -> Result<Product> {
        let op = WriteOperation::new(
            move || self.primary.create(seller_id, request),
            move |product: Product| {
                self.secondary
                    .put_record(ProductRecord::from_product(&product))
            },
        )
        .with_secondary_only(move || self.secondary.create(seller_id, request))
        .with_rollback(move |product: Product| self.primary.delete(product.id, product.seller_id));

        self.writer
            .execute(op, "create")
            .await
            .into_result()
            .map_err(Into::into)
    }

    /// Updates a product owned by `seller_id`. Returns `None` when no such
    /// product exists.
    pub async fn update(
        &self,
        id: i64,
        seller_id: i64,
        patch: &UpdateProduct,
    ) -> Result<Option<Product>> {
        let op = WriteOperation::new(
            move || async move {
                self.primary
                    .update(id, seller_id, patch)
                    .await
                    .and_then(|updated| require(ENTITY, id, updated))
            },
            move |product: Product| {
                self.secondary
                    .put_record(ProductRecord::from_product(&product))
            },
        )
        .with_secondary_only(move || async move {
            self.secondary
                .update(id, seller_id, patch)
                .await
                .and_then(|updated| require(ENTITY, id, updated))
        });

        absent_as_none(self.writer.execute(op, "update").await.into_result())
    }

    pub async fn update_inventory(&self, id: i64, quantity: i32) -> Result<Option<Product>> {
        let op = WriteOperation::new(
            move || async move {
                self.primary
                    .update_inventory(id, quantity)
                    .await
                    .and_then(|updated| require(ENTITY, id, updated))
            },
            move |product: Product| {
                self.secondary
                    .put_record(ProductRecord::from_product(&product))
            },
        )
        .with_secondary_only(move || async move {
            self.secondary
                .update_inventory(id, quantity)
                .await
                .and_then(|updated| require(ENTITY, id, updated))
        });

        absent_as_none(
            self.writer
                .execute(op, "update_inventory")
                .await
                .into_result(),
        )
    }

    /// Takes `quantity` units out of stock. Returns `false` when the primary
    /// has too little stock, in which case the secondary is not written.
    pub async fn reduce_inventory(&self, id: i64, quantity: i32) -> Result<bool> {
        let op = WriteOperation::new(
            move || async move {
                let reduced = self.primary.reduce_inventory(id, quantity).await;
                reduced.map(|reduced| StockReduction::new(id, reduced))
            },
            move |reduction: StockReduction| async move { self.mirror_reduction(reduction).await },
        )
        .with_secondary_only(move || async move {
            let reduced = self.secondary.reduce_inventory(id, quantity).await;
            reduced.map(|reduced| StockReduction::new(id, reduced))
        });

        let reduction = self
            .writer
            .execute(op, "reduce_inventory")
            .await
            .into_result()?;
        Ok(reduction.reduced)
    }

    pub async fn delete(&self, id: i64, seller_id: i64) -> Result<bool> {
        let op = WriteOperation::new(
            move || async move {
                let deleted = self.primary.delete(id, seller_id).await;
                deleted.map(|deleted| Deletion::new(id, deleted))
            },
            move |deletion: Deletion| async move {
                if deletion.deleted {
                    let deleted = self.secondary.delete(id, seller_id).await;
                    deleted.map(|deleted| Deletion::new(id, deleted))
                } else {
                    Ok(deletion)
                }
            },
        )
        .with_secondary_only(move || async move {
            let deleted = self.secondary.delete(id, seller_id).await;
            deleted.map(|deleted| Deletion::new(id, deleted))
        });

        let deletion = self.writer.execute(op, "delete").await.into_result()?;
        Ok(deletion.deleted)
    }

    /// Copies the primary's product after a successful reduction.
    async fn mirror_reduction(
        &self,
        reduction: StockReduction,
    ) -> storage::Result<StockReduction> {
        if !reduction.reduced {
            return Ok(reduction);
        }
        if let Some(product) = self.primary.find_by_id(reduction.product_id).await? {
            self.secondary
                .put_record(ProductRecord::from_product(&product))
                .await?;
        }
        Ok(reduction)
    }
}
