//! Cart contents, resolved against live product data.

use vivero_core::{
    CartItemId, CartLine, CheckoutRuleError, Price, ProductId, ProductState, order_subtotal,
    validate_line,
};

/// A cart row joined with its product at read time.
#[derive(Debug, Clone)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub slug: String,
    pub name: String,
    pub image_url: Option<String>,
    pub unit_price: Price,
    pub quantity: u32,
    pub stock: i32,
    pub state: ProductState,
}

impl CartItem {
    #[must_use]
    pub const fn line(&self) -> CartLine {
        CartLine {
            product_id: self.product_id,
            unit_price: self.unit_price,
            quantity: self.quantity,
            stock: self.stock,
            state: self.state,
        }
    }

    #[must_use]
    pub fn total(&self) -> Price {
        self.unit_price.line_total(self.quantity)
    }

    /// Why this line cannot be checked out as-is, if anything.
    #[must_use]
    pub fn problem(&self) -> Option<CheckoutRuleError> {
        validate_line(&self.line()).err()
    }
}

/// Cart items plus the derived totals the cart page shows.
#[derive(Debug, Clone)]
pub struct CartSummary {
    pub items: Vec<CartItem>,
    pub subtotal: Price,
    /// Total units across all lines.
    pub item_count: u32,
}

impl CartSummary {
    #[must_use]
    pub fn new(items: Vec<CartItem>) -> Self {
        let lines: Vec<CartLine> = items.iter().map(CartItem::line).collect();
        let subtotal = order_subtotal(&lines).unwrap_or_else(|_| Price::ars(0.into()));
        let item_count = items.iter().map(|i| i.quantity).sum();
        Self {
            items,
            subtotal,
            item_count,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when every line can be bought right now.
    #[must_use]
    pub fn is_checkout_ready(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|i| i.problem().is_none())
    }

    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.items.iter().map(CartItem::line).collect()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn item(id: i32, price: i64, quantity: u32, stock: i32) -> CartItem {
        CartItem {
            id: CartItemId::new(id),
            product_id: ProductId::new(id),
            slug: format!("p-{id}"),
            name: format!("Planta {id}"),
            image_url: None,
            unit_price: Price::ars(Decimal::new(price, 0)),
            quantity,
            stock,
            state: ProductState::Active,
        }
    }

    #[test]
    fn test_summary_totals() {
        let summary = CartSummary::new(vec![item(1, 1000, 2, 5), item(2, 350, 1, 1)]);
        assert_eq!(summary.subtotal.amount, Decimal::new(2350, 0));
        assert_eq!(summary.item_count, 3);
        assert!(summary.is_checkout_ready());
    }

    #[test]
    fn test_quantity_over_stock_blocks_checkout() {
        let summary = CartSummary::new(vec![item(1, 1000, 4, 3)]);
        assert_eq!(
            summary.items[0].problem(),
            Some(CheckoutRuleError::InsufficientStock { available: 3 })
        );
        assert!(!summary.is_checkout_ready());
    }

    #[test]
    fn test_empty_summary() {
        let summary = CartSummary::new(vec![]);
        assert!(summary.is_empty());
        assert!(!summary.is_checkout_ready());
        assert_eq!(summary.subtotal.amount, Decimal::ZERO);
    }
}
