pub mod keys;
mod error;
mod records;
mod traits;

pub use error::{RepositoryError, Result};
pub use records::{
    parse_id, transform_id, CartRecord, CategoryRecord, OrderLineRecord, OrderRecord,
    ProductRecord, Record, UserRecord,
};
pub use traits::{
    CartRepository, CategoryRepository, MirrorStore, OrderRepository, ProductRepository,
    UserRepository,
};
