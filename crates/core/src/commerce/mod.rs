mod requests;
mod types;

pub use requests::{
    CreateCategory, CreateProduct, CreateUser, UpdateCategory, UpdateProduct, UpdateUser,
};
pub use types::{
    CartItem, Category, Deletion, Identified, Order, OrderItem, OrderStatus, Product, StockReduction, User,
};
