//! Stockroom CLI - Database migrations and catalog tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations (shop schema and session table)
//! sr-cli migrate
//!
//! # Seed a product with its initial stock ledger counters
//! sr-cli product add --title "Enamel mug" --price 12.50 --stock 5 --max-order 3
//!
//! # Print the stock ledger
//! sr-cli product list
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `product add` - Create a catalog product
//! - `product list` - List products with stock and per-order limits

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;

mod commands;

#[derive(Parser)]
#[command(name = "sr-cli")]
#[command(author, version, about = "Stockroom CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage catalog products
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Create a product
    Add {
        /// Display title
        #[arg(short, long)]
        title: String,

        /// Unit price, e.g. 12.50
        #[arg(short, long)]
        price: Decimal,

        /// Initial quantity in stock
        #[arg(short, long, default_value_t = 0)]
        stock: i32,

        /// Maximum units per order
        #[arg(short, long = "max-order", default_value_t = 1)]
        max_order: i32,

        /// Image shown in carts
        #[arg(long)]
        image_url: Option<String>,
    },
    /// List products and their stock ledger counters
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Product { action } => match action {
            ProductAction::Add {
                title,
                price,
                stock,
                max_order,
                image_url,
            } => {
                let input = commands::product::new_product(&title, price, image_url, stock, max_order)?;
                commands::product::add(input).await?;
            }
            ProductAction::List => commands::product::list().await?,
        },
    }
    Ok(())
}
