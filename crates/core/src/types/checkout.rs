//! Cart and checkout arithmetic shared by the storefront and admin.
//!
//! Cart rows are resolved against current product data at read time, so the
//! rules here take the product's live price, stock and state rather than
//! anything stored alongside the cart.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Price, ProductId, ProductState};

/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// A cart row joined with the product it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub unit_price: Price,
    pub quantity: u32,
    /// Units on hand when the cart was read.
    pub stock: i32,
    pub state: ProductState,
}

impl CartLine {
    /// Price of the whole line.
    #[must_use]
    pub fn total(&self) -> Price {
        self.unit_price.line_total(self.quantity)
    }
}

/// A checkout rule that a cart or a single line breaks.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutRuleError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    #[error("quantity must be at most {max}")]
    QuantityTooLarge { max: u32 },

    #[error("only {available} units in stock")]
    InsufficientStock { available: u32 },

    #[error("product {0} is not available")]
    Unavailable(ProductId),

    #[error("cart is empty")]
    EmptyCart,

    #[error("cart mixes currencies")]
    MixedCurrencies,
}

/// Check a requested quantity against the product's stock.
///
/// # Errors
///
/// Returns an error for zero, for more than [`MAX_LINE_QUANTITY`], or for more
/// units than are in stock. Negative stock counts as none.
pub fn validate_quantity(requested: u32, stock: i32) -> Result<(), CheckoutRuleError> {
    if requested == 0 {
        return Err(CheckoutRuleError::ZeroQuantity);
    }
    if requested > MAX_LINE_QUANTITY {
        return Err(CheckoutRuleError::QuantityTooLarge {
            max: MAX_LINE_QUANTITY,
        });
    }
    let available = u32::try_from(stock).unwrap_or(0);
    if requested > available {
        return Err(CheckoutRuleError::InsufficientStock { available });
    }
    Ok(())
}

/// Check that a line can still be bought as-is.
///
/// # Errors
///
/// Returns [`CheckoutRuleError::Unavailable`] when the product is no longer
/// purchasable, otherwise the result of [`validate_quantity`].
pub fn validate_line(line: &CartLine) -> Result<(), CheckoutRuleError> {
    if !line.state.is_purchasable() {
        return Err(CheckoutRuleError::Unavailable(line.product_id));
    }
    validate_quantity(line.quantity, line.stock)
}

/// Sum of all line totals.
///
/// # Errors
///
/// Returns an error for an empty cart or lines in different currencies.
pub fn order_subtotal(lines: &[CartLine]) -> Result<Price, CheckoutRuleError> {
    let first = lines.first().ok_or(CheckoutRuleError::EmptyCart)?;
    lines.iter().try_fold(
        Price::zero(first.unit_price.currency_code),
        |acc, line| {
            acc.checked_add(&line.total())
                .ok_or(CheckoutRuleError::MixedCurrencies)
        },
    )
}

/// Subtotal plus shipping.
///
/// # Errors
///
/// Same as [`order_subtotal`].
pub fn order_total(lines: &[CartLine], shipping_cost: Decimal) -> Result<Price, CheckoutRuleError> {
    let subtotal = order_subtotal(lines)?;
    Ok(Price::new(
        subtotal.amount + shipping_cost,
        subtotal.currency_code,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::CurrencyCode;

    fn line(id: i32, price: i64, quantity: u32, stock: i32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            unit_price: Price::ars(Decimal::new(price, 0)),
            quantity,
            stock,
            state: ProductState::Active,
        }
    }

    #[test]
    fn test_validate_quantity_bounds() {
        assert_eq!(validate_quantity(0, 5), Err(CheckoutRuleError::ZeroQuantity));
        assert_eq!(validate_quantity(5, 5), Ok(()));
        assert_eq!(
            validate_quantity(6, 5),
            Err(CheckoutRuleError::InsufficientStock { available: 5 })
        );
        assert_eq!(
            validate_quantity(1, -3),
            Err(CheckoutRuleError::InsufficientStock { available: 0 })
        );
        assert!(matches!(
            validate_quantity(100, 1000),
            Err(CheckoutRuleError::QuantityTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_line_rejects_sold_product() {
        let mut sold = line(7, 1500, 1, 0);
        sold.state = ProductState::Sold;
        assert_eq!(
            validate_line(&sold),
            Err(CheckoutRuleError::Unavailable(ProductId::new(7)))
        );
        assert_eq!(validate_line(&line(1, 1500, 2, 3)), Ok(()));
    }

    #[test]
    fn test_order_total_sums_lines_and_shipping() {
        let lines = vec![line(1, 2500, 2, 10), line(2, 800, 3, 3)];
        assert_eq!(
            order_subtotal(&lines).unwrap().amount,
            Decimal::new(7400, 0)
        );
        assert_eq!(
            order_total(&lines, Decimal::new(1200, 0)).unwrap().amount,
            Decimal::new(8600, 0)
        );
    }

    #[test]
    fn test_order_total_errors() {
        assert_eq!(order_subtotal(&[]), Err(CheckoutRuleError::EmptyCart));

        let mut usd = line(2, 10, 1, 1);
        usd.unit_price.currency_code = CurrencyCode::USD;
        assert_eq!(
            order_subtotal(&[line(1, 10, 1, 1), usd]),
            Err(CheckoutRuleError::MixedCurrencies)
        );
    }
}
