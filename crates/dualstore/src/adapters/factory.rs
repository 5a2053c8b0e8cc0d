use std::sync::Arc;

use dualstore_core::migration::MigrationConfig;
use dualstore_core::storage::{
    CartRecord, CartRepository, CategoryRecord, CategoryRepository, MirrorStore, OrderLineRecord,
    OrderRecord, OrderRepository, ProductRecord, ProductRepository, UserRecord, UserRepository,
};

use super::{CartAdapter, CategoryAdapter, OrderAdapter, ProductAdapter, UserAdapter};

/// A store serving every entity repository.
pub trait PrimaryStore:
    UserRepository + ProductRepository + CategoryRepository + OrderRepository + CartRepository
{
}

impl<T> PrimaryStore for T where
    T: UserRepository + ProductRepository + CategoryRepository + OrderRepository + CartRepository
{
}

/// A store that can also take mirrored records of every entity.
pub trait SecondaryStore:
    PrimaryStore
    + MirrorStore<UserRecord>
    + MirrorStore<ProductRecord>
    + MirrorStore<CategoryRecord>
    + MirrorStore<OrderRecord>
    + MirrorStore<OrderLineRecord>
    + MirrorStore<CartRecord>
{
}

impl<T> SecondaryStore for T where
    T: PrimaryStore
        + MirrorStore<UserRecord>
        + MirrorStore<ProductRecord>
        + MirrorStore<CategoryRecord>
        + MirrorStore<OrderRecord>
        + MirrorStore<OrderLineRecord>
        + MirrorStore<CartRecord>
{
}

/// Builds adapters that share one pair of stores and one configuration.
///
/// Order and cart adapters resolve owners and products through the primary.
pub struct AdapterFactory<P, S> {
    primary: Arc<P>,
    secondary: Arc<S>,
    config: Arc<MigrationConfig>,
}

impl<P: PrimaryStore, S: SecondaryStore> AdapterFactory<P, S> {
    pub fn new(primary: Arc<P>, secondary: Arc<S>, config: Arc<MigrationConfig>) -> Self {
        Self {
            primary,
            secondary,
            config,
        }
    }

    pub fn config(&self) -> &Arc<MigrationConfig> {
        &self.config
    }

    pub fn users(&self) -> UserAdapter<P, S> {
        UserAdapter::new(
            Arc::clone(&self.primary),
            Arc::clone(&self.secondary),
            Arc::clone(&self.config),
        )
    }

    pub fn products(&self) -> ProductAdapter<P, S> {
        ProductAdapter::new(
            Arc::clone(&self.primary),
            Arc::clone(&self.secondary),
            Arc::clone(&self.config),
        )
    }

    pub fn categories(&self) -> CategoryAdapter<P, S> {
        CategoryAdapter::new(
            Arc::clone(&self.primary),
            Arc::clone(&self.secondary),
            Arc::clone(&self.config),
        )
    }

    pub fn orders(&self) -> OrderAdapter<P, S, P> {
        OrderAdapter::new(
            Arc::clone(&self.primary),
            Arc::clone(&self.secondary),
            Arc::clone(&self.primary),
            Arc::clone(&self.config),
        )
    }

    pub fn carts(&self) -> CartAdapter<P, S, P, P> {
        CartAdapter::new(
            Arc::clone(&self.primary),
            Arc::clone(&self.secondary),
            Arc::clone(&self.primary),
            Arc::clone(&self.primary),
            Arc::clone(&self.config),
        )
    }
}
