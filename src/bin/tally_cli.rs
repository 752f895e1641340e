use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use tally::{
    auth::user,
    config::{self, AppConfig},
    db::{self, DbPool},
    openapi::ApiDocV1,
    services::{materials::MaterialService, orders::OrderService, products::ProductService},
};
use tracing::debug;
use utoipa::OpenApi;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Openapi(args) => export_openapi(args),
        Commands::Migrate => {
            let context = CliContext::initialize().await?;
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
            Ok(())
        }
        Commands::Requirements(args) => {
            let context = CliContext::initialize().await?;
            show_requirements(&context, args, cli.json).await
        }
        Commands::Buildable(args) => {
            let context = CliContext::initialize().await?;
            show_buildable(&context, args, cli.json).await
        }
        Commands::Orders(args) => {
            let context = CliContext::initialize().await?;
            show_orders(&context, args, cli.json).await
        }
    }
}

#[derive(Parser)]
#[command(name = "tally", about = "Tally CLI for schema management and stock reports", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Write the OpenAPI document to disk
    Openapi(OpenapiArgs),
    /// Material demand from open orders, with shortages
    Requirements(AccountArgs),
    /// How many units of each active product current stock can build
    Buildable(AccountArgs),
    /// Orders in listing order
    Orders(AccountArgs),
}

#[derive(Args)]
struct OpenapiArgs {
    #[arg(long, default_value = "openapi/tally.v1.json", help = "Output file")]
    output: PathBuf,
}

#[derive(Args)]
struct AccountArgs {
    #[arg(long, help = "Email address of the account to report on")]
    email: String,
}

struct CliContext {
    db: Arc<DbPool>,
    config: AppConfig,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load configuration")?;
        config::init_tracing(config.log_level(), config.log_json);
        debug!(backend = config.database_backend(), "Connecting");
        let db = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        Ok(Self {
            db: Arc::new(db),
            config,
        })
    }

    async fn user_id(&self, email: &str) -> Result<Uuid> {
        let email = email.trim().to_lowercase();
        user::Entity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?
            .map(|account| account.id)
            .ok_or_else(|| anyhow!("no account registered for {}", email))
    }
}

fn export_openapi(args: OpenapiArgs) -> Result<()> {
    let json = serde_json::to_string_pretty(&ApiDocV1::openapi())?;
    if let Some(parent) = args.output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, json)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!("OpenAPI document written to {}", args.output.display());
    Ok(())
}

async fn show_requirements(context: &CliContext, args: AccountArgs, json: bool) -> Result<()> {
    let user_id = context.user_id(&args.email).await?;
    let service = MaterialService::new(context.db.clone(), context.config.default_pack_size);
    let requirements = service.requirements(user_id).await?;

    if json {
        return print_json(&requirements);
    }
    println!(
        "{:<28} {:<10} {:<6} {:>8} {:>8} {:>8}  STATUS",
        "MATERIAL", "COLOR", "SIZE", "ON HAND", "NEEDED", "SHORT"
    );
    for row in requirements {
        println!(
            "{:<28} {:<10} {:<6} {:>8} {:>8} {:>8}  {}",
            row.material.name,
            row.material.color.as_deref().unwrap_or("-"),
            row.material.size.as_deref().unwrap_or("-"),
            row.material.quantity,
            row.requirement.total_required,
            row.requirement.shortage,
            row.requirement.status,
        );
    }
    Ok(())
}

async fn show_buildable(context: &CliContext, args: AccountArgs, json: bool) -> Result<()> {
    let user_id = context.user_id(&args.email).await?;
    let products = ProductService::new(context.db.clone())
        .list_products(user_id)
        .await?;

    if json {
        return print_json(&products);
    }
    println!("{:<32} {:<16} {:>8}  CAN MAKE", "PRODUCT", "CATEGORY", "MAX");
    for view in products {
        println!(
            "{:<32} {:<16} {:>8}  {}",
            view.product.name,
            view.product.category.as_deref().unwrap_or("-"),
            view.buildability.max_quantity,
            if view.buildability.can_make { "yes" } else { "no" },
        );
    }
    Ok(())
}

async fn show_orders(context: &CliContext, args: AccountArgs, json: bool) -> Result<()> {
    let user_id = context.user_id(&args.email).await?;
    let orders = OrderService::new(context.db.clone(), context.config.enforce_status_transitions)
        .list_orders(user_id)
        .await?;

    if json {
        return print_json(&orders);
    }
    println!("{:<36} {:<12} {:>3} {:<12} NAME", "ID", "STATUS", "PRI", "DUE");
    for view in orders {
        println!(
            "{:<36} {:<12} {:>3} {:<12} {}",
            view.order.id,
            view.order.status,
            view.order
                .priority
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".into()),
            view.order
                .due_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".into()),
            view.order.name,
        );
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
