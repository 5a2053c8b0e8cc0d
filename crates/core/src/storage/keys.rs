//! Secondary-store key generation functions.
//!
//! Pure functions for generating partition and sort keys following the
//! single-table design of the key-value store.

// ============================================================================
// Key prefixes
// ============================================================================

pub const USER_PREFIX: &str = "USER#";
pub const EMAIL_PREFIX: &str = "EMAIL#";
pub const PRODUCT_PREFIX: &str = "PRODUCT#";
pub const SELLER_PREFIX: &str = "SELLER#";
pub const PARENT_PREFIX: &str = "PARENT#";
pub const CATEGORY_PREFIX: &str = "CATEGORY#";
pub const ORDER_PREFIX: &str = "ORDER#";
pub const ITEM_PREFIX: &str = "ITEM#";
pub const CART_PREFIX: &str = "CART#";

/// Sort key for a user profile item.
pub const PROFILE_SK: &str = "PROFILE";

/// Partition name used for categories without a parent.
pub const ROOT_PARENT: &str = "ROOT";

/// Pattern: `USER#<user_id>`
pub fn user_pk(user_id: &str) -> String {
    format!("{USER_PREFIX}{user_id}")
}

/// Pattern: `EMAIL#<email>`
pub fn email_pk(email: &str) -> String {
    format!("{EMAIL_PREFIX}{email}")
}

/// Pattern: `PRODUCT#<product_id>`
pub fn product_pk(product_id: &str) -> String {
    format!("{PRODUCT_PREFIX}{product_id}")
}

/// Pattern: `SELLER#<seller_id>`
pub fn product_sk(seller_id: &str) -> String {
    format!("{SELLER_PREFIX}{seller_id}")
}

/// Categories are partitioned by their parent's name.
///
/// Pattern: `PARENT#<parent_name>`
pub fn category_pk(parent_name: &str) -> String {
    format!("{PARENT_PREFIX}{parent_name}")
}

/// Pattern: `CATEGORY#<category_name>`
pub fn category_sk(category_name: &str) -> String {
    format!("{CATEGORY_PREFIX}{category_name}")
}

/// Orders and cart items live under the owner's email partition.
pub fn owner_pk(user_email: &str) -> String {
    email_pk(user_email)
}

/// Pattern: `ORDER#<order_id>`
pub fn order_sk(order_id: &str) -> String {
    format!("{ORDER_PREFIX}{order_id}")
}

/// Pattern: `ORDER#<order_id>` (partition for the order's line items)
pub fn order_line_pk(order_id: &str) -> String {
    format!("{ORDER_PREFIX}{order_id}")
}

/// Pattern: `ITEM#<item_id>`
pub fn order_line_sk(item_id: &str) -> String {
    format!("{ITEM_PREFIX}{item_id}")
}

/// Pattern: `CART#<product_id>`
pub fn cart_sk(product_id: &str) -> String {
    format!("{CART_PREFIX}{product_id}")
}
