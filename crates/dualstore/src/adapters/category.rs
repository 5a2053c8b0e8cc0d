use std::sync::Arc;

use dualstore_core::commerce::{Category, CreateCategory, Deletion, UpdateCategory};
use dualstore_core::migration::validation::{compare_categories, compare_lists};
use dualstore_core::migration::{MigrationConfig, Result};
use dualstore_core::storage::{self, CategoryRecord, CategoryRepository, MirrorStore};

use super::{absent_as_none, require};
use crate::orchestrator::{DualReader, DualWriter, ReadOperation, WriteOperation};

const ENTITY: &str = "Category";

/// Category operations across both stores.
///
/// The secondary partitions categories by their parent's name, which is
/// looked up on the primary for every mirrored write.
pub struct CategoryAdapter<P, S> {
    primary: Arc<P>,
    secondary: Arc<S>,
    writer: DualWriter,
    reader: DualReader,
}

impl<P, S> CategoryAdapter<P, S>
where
    P: CategoryRepository,
    S: CategoryRepository + MirrorStore<CategoryRecord>,
{
    pub fn new(primary: Arc<P>, secondary: Arc<S>, config: Arc<MigrationConfig>) -> Self {
        Self {
            primary,
            secondary,
            writer: DualWriter::new(Arc::clone(&config), ENTITY),
            reader: DualReader::new(config, ENTITY),
        }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Category>> {
        let op = ReadOperation::new(
            id,
            move || self.primary.find_by_id(id),
            move || self.secondary.find_by_id(id),
        );
        self.reader
            .execute(op, compare_categories, "find_by_id")
            .await
            .into_result()
    }

    /// Lists the children of `parent_id`, or the root categories for `None`.
    pub async fn find_by_parent_id(&self, parent_id: Option<i64>) -> Result<Vec<Category>> {
        let lookup = match parent_id {
            Some(id) => format!("parent:{id}"),
            None => "parent:ROOT".to_string(),
        };
        let op = ReadOperation::new(
            lookup,
            move || async move { self.primary.find_by_parent_id(parent_id).await.map(Some) },
            move || async move { self.secondary.find_by_parent_id(parent_id).await.map(Some) },
        );
        let categories = self
            .reader
            .execute(
                op,
                |primary: &Vec<Category>, secondary: &Vec<Category>| {
                    compare_lists(primary, secondary, compare_categories)
                },
                "find_by_parent_id",
            )
            .await
            .into_result()?;
        Ok(categories.unwrap_or_default())
    }

    pub async fn create(&self, request: &CreateCategory) -> Result<Category> {
        let op = WriteOperation::new(
            move || self.primary.create(request),
            move |category: Category| async move { self.mirror(&category).await },
        )
        .with_secondary_only(move || self.secondary.create(request))
        .with_rollback(move |category: Category| self.primary.delete(category.id));

        self.writer
            .execute(op, "create")
            .await
            .into_result()
            .map_err(Into::into)
    }

    pub async fn update(&self, id: i64, patch: &UpdateCategory) -> Result<Option<Category>> {
        let op = WriteOperation::new(
            move || async move {
                self.primary
                    .update(id, patch)
                    .await
                    .and_then(|updated| require(ENTITY, id, updated))
            },
            move |category: Category| async move { self.mirror(&category).await },
        )
        .with_secondary_only(move || async move {
            self.secondary
                .update(id, patch)
                .await
                .and_then(|updated| require(ENTITY, id, updated))
        });

        absent_as_none(self.writer.execute(op, "update").await.into_result())
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let op = WriteOperation::new(
            move || async move {
                let deleted = self.primary.delete(id).await;
                deleted.map(|deleted| Deletion::new(id, deleted))
            },
            move |deletion: Deletion| async move {
                if deletion.deleted {
                    let deleted = self.secondary.delete(id).await;
                    deleted.map(|deleted| Deletion::new(id, deleted))
                } else {
                    Ok(deletion)
                }
            },
        )
        .with_secondary_only(move || async move {
            let deleted = self.secondary.delete(id).await;
            deleted.map(|deleted| Deletion::new(id, deleted))
        });

        let deletion = self.writer.execute(op, "delete").await.into_result()?;
        Ok(deletion.deleted)
    }

    /// A parent missing from the primary files the category under `ROOT`.
    async fn mirror(&self, category: &Category) -> storage::Result<Category> {
        let parent = match category.parent_id {
            Some(parent_id) => self.primary.find_by_id(parent_id).await?,
            None => None,
        };
        let record =
            CategoryRecord::from_category(category, parent.as_ref().map(|p| p.name.as_str()));
        self.secondary.put_record(record).await
    }
}

#[cfg(test)]
mod tests {
    use dualstore_core::migration::MigrationPhase;
    use dualstore_core::storage::keys;

    use super::*;
    use crate::storage::InMemoryRepository;

    fn setup(
        phase: MigrationPhase,
    ) -> (
        Arc<InMemoryRepository>,
        Arc<InMemoryRepository>,
        CategoryAdapter<InMemoryRepository, InMemoryRepository>,
    ) {
        let primary = Arc::new(InMemoryRepository::named("primary"));
        let secondary = Arc::new(InMemoryRepository::named("secondary"));
        let config = Arc::new(MigrationConfig::with_phase(phase));
        let adapter = CategoryAdapter::new(Arc::clone(&primary), Arc::clone(&secondary), config);
        (primary, secondary, adapter)
    }

    #[tokio::test]
    async fn test_root_category_is_mirrored_under_root_partition() {
        let (_, secondary, adapter) = setup(MigrationPhase::DUAL_WRITE);

        adapter.create(&CreateCategory::root("Books")).await.unwrap();

        let item = secondary
            .mirrored_item(&keys::category_pk("ROOT"), &keys::category_sk("Books"))
            .await
            .unwrap();
        assert_eq!(item["parent_name"], "ROOT");
        assert_eq!(item["parent_id"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_child_category_carries_parent_name() {
        let (_, secondary, adapter) = setup(MigrationPhase::DUAL_WRITE);
        let books = adapter.create(&CreateCategory::root("Books")).await.unwrap();

        let fiction = adapter
            .create(&CreateCategory::child("Fiction", books.id))
            .await
            .unwrap();

        let item = secondary
            .mirrored_item(&keys::category_pk("Books"), &keys::category_sk("Fiction"))
            .await
            .unwrap();
        assert_eq!(item["parent_name"], "Books");
        assert_eq!(item["parent_id"], books.id.to_string());
        assert_eq!(
            CategoryRepository::find_by_id(&*secondary, fiction.id)
                .await
                .unwrap(),
            Some(fiction)
        );
    }

    #[tokio::test]
    async fn test_dual_read_of_children_validates_lists() {
        let (_, _, adapter) = setup(MigrationPhase::DUAL_WRITE);
        let books = adapter.create(&CreateCategory::root("Books")).await.unwrap();
        adapter
            .create(&CreateCategory::child("Fiction", books.id))
            .await
            .unwrap();
        adapter
            .create(&CreateCategory::child("Poetry", books.id))
            .await
            .unwrap();

        let config = Arc::new(MigrationConfig::with_phase(MigrationPhase::DUAL_READ));
        let reader = CategoryAdapter::new(
            Arc::clone(&adapter.primary),
            Arc::clone(&adapter.secondary),
            config,
        );

        let children = reader.find_by_parent_id(Some(books.id)).await.unwrap();
        let roots = reader.find_by_parent_id(None).await.unwrap();

        assert_eq!(children.len(), 2);
        assert_eq!(roots, vec![books]);
    }

    #[tokio::test]
    async fn test_rollback_on_mirror_failure() {
        let (primary, secondary, adapter) = setup(MigrationPhase::DUAL_WRITE);
        secondary.set_unavailable(true);

        assert!(adapter.create(&CreateCategory::root("Books")).await.is_err());

        assert!(primary.find_by_parent_id(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_renames_in_both_stores() {
        let (primary, secondary, adapter) = setup(MigrationPhase::DUAL_WRITE);
        let books = adapter.create(&CreateCategory::root("Books")).await.unwrap();
        let patch = UpdateCategory {
            name: Some("Literature".to_string()),
            parent_id: None,
        };

        let renamed = adapter.update(books.id, &patch).await.unwrap().unwrap();

        assert_eq!(renamed.name, "Literature");
        assert_eq!(
            CategoryRepository::find_by_id(&*primary, books.id)
                .await
                .unwrap(),
            CategoryRepository::find_by_id(&*secondary, books.id)
                .await
                .unwrap()
        );
        assert_eq!(secondary.mirrored_count().await, 1);
        assert!(secondary
            .mirrored_item(&keys::category_pk("ROOT"), &keys::category_sk("Books"))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_reparent_moves_mirrored_item() {
        let (_, secondary, adapter) = setup(MigrationPhase::DUAL_WRITE);
        let books = adapter.create(&CreateCategory::root("Books")).await.unwrap();
        let fiction = adapter.create(&CreateCategory::root("Fiction")).await.unwrap();
        let patch = UpdateCategory {
            name: None,
            parent_id: Some(books.id),
        };

        adapter.update(fiction.id, &patch).await.unwrap().unwrap();

        assert_eq!(secondary.mirrored_count().await, 2);
        assert!(secondary
            .mirrored_item(&keys::category_pk("ROOT"), &keys::category_sk("Fiction"))
            .await
            .is_none());
        let item = secondary
            .mirrored_item(&keys::category_pk("Books"), &keys::category_sk("Fiction"))
            .await
            .unwrap();
        assert_eq!(item["parent_id"], "1");
    }
}
