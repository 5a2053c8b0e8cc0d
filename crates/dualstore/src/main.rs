use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use dualstore::{
    adapters::{AdapterFactory, PrimaryStore, SecondaryStore},
    config::{Config, LogFormat},
    storage::InMemoryRepository,
};
use dualstore_core::commerce::{CreateCategory, CreateProduct, CreateUser, OrderStatus};
use dualstore_core::migration::MigrationConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// dualstore - Run a scripted workload through the migration layer
#[derive(Parser, Debug)]
#[command(name = "dualstore")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Migration phase, 1 (primary only) through 5 (secondary only)
    #[arg(long, short)]
    phase: Option<u8>,

    /// Override the phase's read validation flag
    #[arg(long, action = clap::ArgAction::Set)]
    validation: Option<bool>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    /// Flags win over `MIGRATION_PHASE`, `MIGRATION_VALIDATION` and `LOG_FORMAT`.
    fn merge(self, mut config: Config) -> Config {
        if let Some(phase) = self.phase {
            config.phase = phase;
        }
        if self.validation.is_some() {
            config.validation = self.validation;
        }
        if let Some(log_format) = self.log_format {
            config.log_format = log_format;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().merge(Config::from_env());

    init_tracing(config.log_format);

    let flags = Arc::new(MigrationConfig::new());
    config.apply(&flags)?;

    let primary = Arc::new(InMemoryRepository::named("primary"));
    let secondary = Arc::new(InMemoryRepository::named("secondary"));
    let factory = AdapterFactory::new(primary, secondary, Arc::clone(&flags));

    tracing::info!(phase = %flags.migration_phase(), "Running workload");
    let report = run_workload(&factory).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing(format: LogFormat) {
    let registry = tracing_subscriber::registry().with(
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "dualstore=debug,dualstore_core=debug".into()),
    );

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

/// Creates one of each entity, then reads everything back through the
/// adapters.
async fn run_workload<P, S>(factory: &AdapterFactory<P, S>) -> Result<serde_json::Value>
where
    P: PrimaryStore,
    S: SecondaryStore,
{
    let users = factory.users();
    let seller = users
        .create(
            &CreateUser::new("ada", "ada@example.com", "$2b$10$workload")
                .with_name("Ada", "Lovelace"),
        )
        .await?;
    let seller = users.upgrade_to_seller(seller.id).await?.unwrap_or(seller);

    let categories = factory.categories();
    let lighting = categories.create(&CreateCategory::root("Lighting")).await?;
    let lamps = categories
        .create(&CreateCategory::child("Desk Lamps", lighting.id))
        .await?;

    let products = factory.products();
    let lamp = products
        .create(
            seller.id,
            &CreateProduct {
                name: "Brass desk lamp".to_string(),
                description: Some("Adjustable arm, warm bulb".to_string()),
                category_id: lamps.id,
                price: 49.5,
                inventory_quantity: 10,
            },
        )
        .await?;

    let carts = factory.carts();
    let line = carts.add_item(seller.id, lamp.id, 2).await?;

    let orders = factory.orders();
    let order = orders
        .create_order(seller.id, lamp.price * f64::from(line.quantity))
        .await?;
    orders
        .create_order_item(order.id, lamp.id, line.quantity, lamp.price)
        .await?;
    if !products.reduce_inventory(lamp.id, line.quantity).await? {
        return Err(anyhow::anyhow!("Not enough stock for {}", lamp.name));
    }
    let order = orders
        .update_status(order.id, OrderStatus::Completed)
        .await?
        .unwrap_or(order);
    carts.clear(seller.id).await?;

    Ok(serde_json::json!({
        "flags": factory.config().snapshot(),
        "user": users.find_by_email(&seller.email).await?,
        "categories": categories.find_by_parent_id(Some(lighting.id)).await?,
        "products": products.find_by_category(lamps.id).await?,
        "cart": carts.get_items(seller.id).await?,
        "orders": orders.find_by_user(seller.id).await?,
        "order_items": orders.find_items(order.id).await?,
    }))
}
