//! Domain models for the store.
//!
//! These are validated domain types, separate from the row types the
//! repositories decode. Admin and CLI reuse them through the library.

pub mod address;
pub mod cart;
pub mod content;
pub mod error_log;
pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use address::{Address, AddressInput};
pub use cart::{CartItem, CartSummary};
pub use content::{Service, ServiceInput, Slide, SlideInput};
pub use error_log::{ErrorLog, ErrorLogFilter, NewErrorLog};
pub use order::{NewOrder, Order, OrderFilter, OrderItem, OrderStats, OrderSummary};
pub use product::{Product, ProductFilter, ProductInput, slugify};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{ProfileUpdate, User, UserFilter};

/// Default number of rows per listing page.
pub const PAGE_SIZE: u32 = 24;

/// A required form field was left blank.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} is required")]
pub struct MissingField {
    pub field: &'static str,
}

/// Fail with [`MissingField`] when `value` is empty after trimming.
///
/// # Errors
///
/// Returns `MissingField` naming `field`.
pub fn require(field: &'static str, value: &str) -> Result<(), MissingField> {
    if value.trim().is_empty() {
        Err(MissingField { field })
    } else {
        Ok(())
    }
}

/// Treat blank optional form values as absent.
#[must_use]
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

/// One page of a listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        if self.per_page == 0 {
            return 1;
        }
        let total = u64::try_from(self.total).unwrap_or(0);
        let pages = total.div_ceil(u64::from(self.per_page)).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    #[must_use]
    pub const fn prev_page(&self) -> u32 {
        self.page.saturating_sub(1)
    }

    #[must_use]
    pub const fn next_page(&self) -> u32 {
        self.page.saturating_add(1)
    }
}

/// SQL `LIMIT` / `OFFSET` for a 1-based page.
#[must_use]
pub fn limit_offset(page: u32, per_page: u32) -> (i64, i64) {
    let page = page.max(1);
    (
        i64::from(per_page),
        i64::from(page - 1) * i64::from(per_page),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_blank() {
        assert_eq!(require("name", "  "), Err(MissingField { field: "name" }));
        assert!(require("name", "Ficus").is_ok());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".to_owned())), None);
        assert_eq!(non_blank(Some(" a ".to_owned())), Some("a".to_owned()));
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_page_math() {
        let page: Page<()> = Page {
            items: vec![],
            page: 2,
            per_page: 10,
            total: 25,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_prev());
        assert!(page.has_next());

        let empty: Page<()> = Page {
            items: vec![],
            page: 1,
            per_page: 10,
            total: 0,
        };
        assert_eq!(empty.total_pages(), 1);
        assert!(!empty.has_next());
    }

    #[test]
    fn test_limit_offset() {
        assert_eq!(limit_offset(1, 24), (24, 0));
        assert_eq!(limit_offset(3, 24), (24, 48));
        assert_eq!(limit_offset(0, 24), (24, 0));
    }
}
