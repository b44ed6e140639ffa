//! Catalog seeding and stock ledger listing.
//!
//! # Usage
//!
//! ```bash
//! sr-cli product add --title "Enamel mug" --price 12.50 --stock 5 --max-order 3
//! sr-cli product list
//! ```

use rust_decimal::Decimal;

use stockroom_core::{Price, Product};
use stockroom_storefront::db::{NewProduct, ProductRepository};

use super::{CommandError, connect};

/// Validate seed arguments before touching the database.
///
/// # Errors
///
/// Returns `CommandError::InvalidArgument` for values the ledger constraints
/// would reject.
pub fn new_product(
    title: &str,
    price: Decimal,
    image_url: Option<String>,
    stock: i32,
    max_order: i32,
) -> Result<NewProduct, CommandError> {
    if title.trim().is_empty() {
        return Err(CommandError::InvalidArgument("title cannot be empty".to_owned()));
    }
    if price.is_sign_negative() {
        return Err(CommandError::InvalidArgument(format!("price must not be negative (got {price})")));
    }
    if stock < 0 {
        return Err(CommandError::InvalidArgument(format!("stock must not be negative (got {stock})")));
    }
    if max_order <= 0 {
        return Err(CommandError::InvalidArgument(format!(
            "max order quantity must be positive (got {max_order})"
        )));
    }

    Ok(NewProduct {
        title: title.trim().to_owned(),
        price: Price::new(price.round_dp(2)),
        image_url,
        quantity_in_stock: stock,
        max_order_quantity: max_order,
    })
}

/// Insert a product with its initial stock.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the insert fails.
pub async fn add(input: NewProduct) -> Result<Product, CommandError> {
    let pool = connect().await?;
    let product = ProductRepository::new(&pool).create(&input).await?;

    tracing::info!(
        product_id = %product.id,
        title = %product.title,
        price = %product.price,
        quantity_in_stock = product.quantity_in_stock,
        max_order_quantity = product.max_order_quantity,
        "Product created"
    );
    Ok(product)
}

/// Print every product with its ledger counters.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list() -> Result<(), CommandError> {
    let pool = connect().await?;
    let products = ProductRepository::new(&pool).list().await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{:>6}  {:>10}  {:>6}  {:>9}  TITLE", "ID", "PRICE", "STOCK", "MAX/ORDER");
        for p in &products {
            println!(
                "{:>6}  {:>10}  {:>6}  {:>9}  {}",
                p.id, p.price, p.quantity_in_stock, p.max_order_quantity, p.title
            );
        }
    }

    tracing::info!(count = products.len(), "Listed products");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_product_rounds_price() {
        let product = new_product(" Mug ", Decimal::new(12_499, 3), None, 5, 3).unwrap();
        assert_eq!(product.title, "Mug");
        assert_eq!(product.price.amount(), Decimal::new(1250, 2));
    }

    #[test]
    fn test_new_product_rejects_ledger_violations() {
        assert!(new_product("Mug", Decimal::ONE, None, -1, 3).is_err());
        assert!(new_product("Mug", Decimal::ONE, None, 5, 0).is_err());
        assert!(new_product("Mug", Decimal::NEGATIVE_ONE, None, 5, 3).is_err());
        assert!(new_product("  ", Decimal::ONE, None, 5, 3).is_err());
    }

    #[test]
    fn test_zero_stock_is_allowed() {
        assert!(new_product("Sold out", Decimal::ONE, None, 0, 1).is_ok());
    }
}
