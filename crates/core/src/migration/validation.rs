//! Field-level comparison of primary and secondary reads.
//!
//! Pure functions: each comparator turns two versions of an entity into an
//! ordered list of human-readable mismatches. An empty list means the stores
//! agree.

use std::collections::HashSet;
use std::fmt::Display;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use crate::commerce::{CartItem, Category, Identified, Order, OrderItem, Product, User};

/// Label used for the primary store in mismatch messages.
pub const PRIMARY_LABEL: &str = "MySQL";
/// Label used for the secondary store in mismatch messages.
pub const SECONDARY_LABEL: &str = "DynamoDB";

/// Accumulates field mismatches between two versions of a record.
#[derive(Debug, Default)]
#[must_use]
pub struct FieldComparison {
    errors: Vec<String>,
}

impl FieldComparison {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compares text, quoting both values.
    pub fn text(mut self, field: &str, primary: &str, secondary: &str) -> Self {
        if primary != secondary {
            self.errors.push(format!(
                "{field} mismatch: {PRIMARY_LABEL}=\"{primary}\", {SECONDARY_LABEL}=\"{secondary}\""
            ));
        }
        self
    }

    /// Compares optional text; an absent value renders as `null`.
    pub fn optional_text(
        mut self,
        field: &str,
        primary: Option<&str>,
        secondary: Option<&str>,
    ) -> Self {
        if primary != secondary {
            self.errors.push(format!(
                "{field} mismatch: {PRIMARY_LABEL}={}, {SECONDARY_LABEL}={}",
                quoted_or_null(primary),
                quoted_or_null(secondary)
            ));
        }
        self
    }

    /// Compares numbers, booleans and other unquoted values.
    pub fn value<V: PartialEq + Display>(mut self, field: &str, primary: V, secondary: V) -> Self {
        if primary != secondary {
            self.errors.push(format!(
                "{field} mismatch: {PRIMARY_LABEL}={primary}, {SECONDARY_LABEL}={secondary}"
            ));
        }
        self
    }

    pub fn optional_value<V: PartialEq + Display>(
        mut self,
        field: &str,
        primary: Option<V>,
        secondary: Option<V>,
    ) -> Self {
        if primary != secondary {
            self.errors.push(format!(
                "{field} mismatch: {PRIMARY_LABEL}={}, {SECONDARY_LABEL}={}",
                display_or_null(primary.as_ref()),
                display_or_null(secondary.as_ref())
            ));
        }
        self
    }

    /// Timestamps are equal when they denote the same millisecond, whatever
    /// their sub-millisecond precision.
    pub fn timestamp(
        mut self,
        field: &str,
        primary: &DateTime<Utc>,
        secondary: &DateTime<Utc>,
    ) -> Self {
        if primary.timestamp_millis() != secondary.timestamp_millis() {
            self.errors.push(format!(
                "{field} mismatch: {PRIMARY_LABEL}=\"{}\", {SECONDARY_LABEL}=\"{}\"",
                primary.to_rfc3339_opts(SecondsFormat::Millis, true),
                secondary.to_rfc3339_opts(SecondsFormat::Millis, true)
            ));
        }
        self
    }

    /// Never writes either value into the message.
    pub fn sensitive<V: PartialEq + ?Sized>(mut self, field: &str, primary: &V, secondary: &V) -> Self {
        if primary != secondary {
            self.errors
                .push(format!("{field} mismatch: values differ (security: not logged)"));
        }
        self
    }

    pub fn finish(self) -> Vec<String> {
        self.errors
    }
}

fn quoted_or_null(value: Option<&str>) -> String {
    value.map_or_else(|| "null".to_string(), |v| format!("\"{v}\""))
}

fn display_or_null<V: Display>(value: Option<&V>) -> String {
    value.map_or_else(|| "null".to_string(), |v| v.to_string())
}

/// Applies the null rules, then the entity comparator.
///
/// - both absent: no mismatches
/// - one absent: a single message naming the absent side, no field detail
/// - both present: whatever `compare` reports
pub fn validate_results<T, F>(primary: Option<&T>, secondary: Option<&T>, compare: F) -> Vec<String>
where
    F: Fn(&T, &T) -> Vec<String>,
{
    match (primary, secondary) {
        (None, None) => Vec::new(),
        (None, Some(_)) => vec![format!(
            "{PRIMARY_LABEL} result is null but {SECONDARY_LABEL} result is not null"
        )],
        (Some(_), None) => vec![format!(
            "{SECONDARY_LABEL} result is null but {PRIMARY_LABEL} result is not null"
        )],
        (Some(p), Some(s)) => compare(p, s),
    }
}

/// Compares two lists of entities, pairing elements by ID.
pub fn compare_lists<T, F>(primary: &[T], secondary: &[T], compare: F) -> Vec<String>
where
    T: Identified,
    F: Fn(&T, &T) -> Vec<String>,
{
    let mut errors = Vec::new();

    if primary.len() != secondary.len() {
        errors.push(format!(
            "count mismatch: {PRIMARY_LABEL}={}, {SECONDARY_LABEL}={}",
            primary.len(),
            secondary.len()
        ));
    }

    let mut seen = HashSet::new();
    for p in primary {
        let id = p.entity_id();
        match secondary.iter().find(|s| s.entity_id() == id) {
            Some(s) => errors.extend(compare(p, s).into_iter().map(|e| format!("[{id}] {e}"))),
            None => errors.push(format!("[{id}] missing in {SECONDARY_LABEL}")),
        }
        seen.insert(id);
    }

    for s in secondary {
        let id = s.entity_id();
        if !seen.contains(&id) {
            errors.push(format!("[{id}] missing in {PRIMARY_LABEL}"));
        }
    }

    errors
}

pub fn compare_users(primary: &User, secondary: &User) -> Vec<String> {
    FieldComparison::new()
        .value("id", primary.id, secondary.id)
        .text("username", &primary.username, &secondary.username)
        .text("email", &primary.email, &secondary.email)
        .sensitive("password_hash", &primary.password_hash, &secondary.password_hash)
        .optional_text(
            "first_name",
            primary.first_name.as_deref(),
            secondary.first_name.as_deref(),
        )
        .optional_text(
            "last_name",
            primary.last_name.as_deref(),
            secondary.last_name.as_deref(),
        )
        .value("is_seller", primary.is_seller, secondary.is_seller)
        .value("super_admin", primary.super_admin, secondary.super_admin)
        .timestamp("created_at", &primary.created_at, &secondary.created_at)
        .timestamp("updated_at", &primary.updated_at, &secondary.updated_at)
        .finish()
}

pub fn compare_products(primary: &Product, secondary: &Product) -> Vec<String> {
    FieldComparison::new()
        .value("id", primary.id, secondary.id)
        .value("seller_id", primary.seller_id, secondary.seller_id)
        .value("category_id", primary.category_id, secondary.category_id)
        .text("name", &primary.name, &secondary.name)
        .optional_text(
            "description",
            primary.description.as_deref(),
            secondary.description.as_deref(),
        )
        .value("price", primary.price, secondary.price)
        .value(
            "inventory_quantity",
            primary.inventory_quantity,
            secondary.inventory_quantity,
        )
        .timestamp("created_at", &primary.created_at, &secondary.created_at)
        .timestamp("updated_at", &primary.updated_at, &secondary.updated_at)
        .finish()
}

pub fn compare_categories(primary: &Category, secondary: &Category) -> Vec<String> {
    FieldComparison::new()
        .value("id", primary.id, secondary.id)
        .text("name", &primary.name, &secondary.name)
        .optional_value("parent_id", primary.parent_id, secondary.parent_id)
        .timestamp("created_at", &primary.created_at, &secondary.created_at)
        .finish()
}

pub fn compare_orders(primary: &Order, secondary: &Order) -> Vec<String> {
    FieldComparison::new()
        .value("id", primary.id, secondary.id)
        .value("user_id", primary.user_id, secondary.user_id)
        .value("total_amount", primary.total_amount, secondary.total_amount)
        .text("status", primary.status.as_str(), secondary.status.as_str())
        .timestamp("created_at", &primary.created_at, &secondary.created_at)
        .timestamp("updated_at", &primary.updated_at, &secondary.updated_at)
        .finish()
}

pub fn compare_order_items(primary: &OrderItem, secondary: &OrderItem) -> Vec<String> {
    FieldComparison::new()
        .value("id", primary.id, secondary.id)
        .value("order_id", primary.order_id, secondary.order_id)
        .value("product_id", primary.product_id, secondary.product_id)
        .value("quantity", primary.quantity, secondary.quantity)
        .value("price_at_time", primary.price_at_time, secondary.price_at_time)
        .finish()
}

pub fn compare_cart_items(primary: &CartItem, secondary: &CartItem) -> Vec<String> {
    FieldComparison::new()
        .value("id", primary.id, secondary.id)
        .value("user_id", primary.user_id, secondary.user_id)
        .value("product_id", primary.product_id, secondary.product_id)
        .value("quantity", primary.quantity, secondary.quantity)
        .timestamp("created_at", &primary.created_at, &secondary.created_at)
        .timestamp("updated_at", &primary.updated_at, &secondary.updated_at)
        .finish()
}

/// A read whose two stores disagreed.
///
/// The ID label is always `ID`, even when the lookup key was a username or
/// an email.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Data validation failed for {entity_type} ID {id}: {}", errors.join(", "))]
pub struct ValidationFailure {
    pub entity_type: &'static str,
    pub id: String,
    pub errors: Vec<String>,
}

impl ValidationFailure {
    pub fn new(entity_type: &'static str, id: impl ToString, errors: Vec<String>) -> Self {
        Self {
            entity_type,
            id: id.to_string(),
            errors,
        }
    }

    /// Operator hints derived from which fields diverged.
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        let fields: Vec<&str> = self
            .errors
            .iter()
            .filter_map(|e| mismatch_field(e))
            .collect();

        let mut actions = Vec::new();
        if fields.contains(&"id") {
            actions.push("Check ID mapping between MySQL and DynamoDB");
        }
        if fields.iter().any(|f| f.contains("_at")) {
            actions.push("Verify timestamp synchronization between databases");
        }
        if fields.contains(&"password_hash") {
            actions.push("Check password hashing consistency");
        }
        if self.errors.len() > 3 {
            actions.push("Consider full data resynchronization for this entity");
        }
        actions
    }
}

/// Extracts `field` from `"[id] field mismatch: ..."` or `"field mismatch: ..."`.
fn mismatch_field(message: &str) -> Option<&str> {
    let message = match message.strip_prefix('[') {
        Some(rest) => rest.split_once("] ").map(|(_, tail)| tail)?,
        None => message,
    };
    message.split_once(" mismatch:").map(|(field, _)| field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::commerce::OrderStatus;

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()
    }

    fn sample_user() -> User {
        User {
            id: 1,
            username: "a".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "hashed_password".to_string(),
            first_name: Some("Test".to_string()),
            last_name: Some("User".to_string()),
            is_seller: false,
            super_admin: false,
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }

    fn sample_category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            parent_id: None,
            created_at: timestamp(),
        }
    }

    #[test]
    fn test_identical_users_have_no_mismatches() {
        assert!(compare_users(&sample_user(), &sample_user()).is_empty());
    }

    #[test]
    fn test_username_mismatch_message() {
        let mut other = sample_user();
        other.username = "b".to_string();

        assert_eq!(
            compare_users(&sample_user(), &other),
            vec![r#"username mismatch: MySQL="a", DynamoDB="b""#.to_string()]
        );
    }

    #[test]
    fn test_password_hash_is_never_logged() {
        let mut other = sample_user();
        other.password_hash = "leaked".to_string();

        let errors = compare_users(&sample_user(), &other);

        assert_eq!(
            errors,
            vec!["password_hash mismatch: values differ (security: not logged)".to_string()]
        );
        assert!(!errors[0].contains("leaked"));
        assert!(!errors[0].contains("hashed_password"));
    }

    #[test]
    fn test_mismatches_accumulate_in_field_order() {
        let mut other = sample_user();
        other.id = 2;
        other.email = "other@example.com".to_string();
        other.is_seller = true;
        other.last_name = None;

        let errors = compare_users(&sample_user(), &other);

        assert_eq!(
            errors,
            vec![
                "id mismatch: MySQL=1, DynamoDB=2".to_string(),
                r#"email mismatch: MySQL="test@example.com", DynamoDB="other@example.com""#
                    .to_string(),
                r#"last_name mismatch: MySQL="User", DynamoDB=null"#.to_string(),
                "is_seller mismatch: MySQL=false, DynamoDB=true".to_string(),
            ]
        );
    }

    #[test]
    fn test_timestamps_compare_by_millisecond() {
        let mut other = sample_user();
        other.created_at = timestamp() + Duration::microseconds(400);
        assert!(compare_users(&sample_user(), &other).is_empty());

        other.created_at = timestamp() + Duration::milliseconds(1);
        assert_eq!(
            compare_users(&sample_user(), &other),
            vec![
                r#"created_at mismatch: MySQL="2023-01-01T00:00:00.000Z", DynamoDB="2023-01-01T00:00:00.001Z""#
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_validate_results_null_rules() {
        let user = sample_user();

        assert!(validate_results::<User, _>(None, None, compare_users).is_empty());
        assert_eq!(
            validate_results(None, Some(&user), compare_users),
            vec!["MySQL result is null but DynamoDB result is not null".to_string()]
        );
        assert_eq!(
            validate_results(Some(&user), None, compare_users),
            vec!["DynamoDB result is null but MySQL result is not null".to_string()]
        );
    }

    #[test]
    fn test_validate_results_skips_fields_when_one_side_is_null() {
        let calls = std::cell::Cell::new(0);
        let user = sample_user();

        let errors = validate_results(Some(&user), None, |a: &User, b: &User| {
            calls.set(calls.get() + 1);
            compare_users(a, b)
        });

        assert_eq!(errors.len(), 1);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_category_parent_mismatch_renders_null() {
        let root = sample_category(2, "Fiction");
        let mut child = root.clone();
        child.parent_id = Some(1);

        assert_eq!(
            compare_categories(&root, &child),
            vec!["parent_id mismatch: MySQL=null, DynamoDB=1".to_string()]
        );
    }

    #[test]
    fn test_order_status_mismatch() {
        let order = Order {
            id: 1,
            user_id: 1,
            total_amount: 10.0,
            status: OrderStatus::Pending,
            created_at: timestamp(),
            updated_at: timestamp(),
        };
        let mut other = order.clone();
        other.status = OrderStatus::Completed;

        assert_eq!(
            compare_orders(&order, &other),
            vec![r#"status mismatch: MySQL="pending", DynamoDB="completed""#.to_string()]
        );
    }

    #[test]
    fn test_compare_lists_pairs_by_id() {
        let primary = vec![sample_category(1, "Books"), sample_category(2, "Music")];
        let secondary = vec![sample_category(2, "Songs"), sample_category(3, "Games")];

        let errors = compare_lists(&primary, &secondary, compare_categories);

        assert_eq!(
            errors,
            vec![
                "[1] missing in DynamoDB".to_string(),
                r#"[2] name mismatch: MySQL="Music", DynamoDB="Songs""#.to_string(),
                "[3] missing in MySQL".to_string(),
            ]
        );
    }

    #[test]
    fn test_compare_lists_reports_count() {
        let primary = vec![sample_category(1, "Books")];

        let errors = compare_lists(&primary, &[], compare_categories);

        assert_eq!(
            errors,
            vec![
                "count mismatch: MySQL=1, DynamoDB=0".to_string(),
                "[1] missing in DynamoDB".to_string(),
            ]
        );
    }

    #[test]
    fn test_validation_failure_message() {
        let failure = ValidationFailure::new(
            "User",
            1,
            vec![r#"username mismatch: MySQL="a", DynamoDB="b""#.to_string()],
        );

        assert_eq!(
            failure.to_string(),
            r#"Data validation failed for User ID 1: username mismatch: MySQL="a", DynamoDB="b""#
        );
    }

    #[test]
    fn test_validation_failure_joins_with_comma() {
        let failure = ValidationFailure::new(
            "User",
            "alice",
            vec!["first".to_string(), "second".to_string()],
        );

        assert_eq!(
            failure.to_string(),
            "Data validation failed for User ID alice: first, second"
        );
    }

    #[test]
    fn test_suggested_actions() {
        let failure = ValidationFailure::new(
            "User",
            1,
            vec![
                "id mismatch: MySQL=1, DynamoDB=2".to_string(),
                "[1] updated_at mismatch: MySQL=\"x\", DynamoDB=\"y\"".to_string(),
                "password_hash mismatch: values differ (security: not logged)".to_string(),
                "email mismatch: MySQL=\"a\", DynamoDB=\"b\"".to_string(),
            ],
        );

        assert_eq!(
            failure.suggested_actions(),
            vec![
                "Check ID mapping between MySQL and DynamoDB",
                "Verify timestamp synchronization between databases",
                "Check password hashing consistency",
                "Consider full data resynchronization for this entity",
            ]
        );
    }

    #[test]
    fn test_mismatch_field_parsing() {
        assert_eq!(mismatch_field("email mismatch: x"), Some("email"));
        assert_eq!(mismatch_field("[3] quantity mismatch: x"), Some("quantity"));
        assert_eq!(mismatch_field("[3] missing in MySQL"), None);
    }
}
