//! Admin view helpers over storefront data.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use vivero_admin::routes::views::{Pager, SelectOption, query_string};
use vivero_core::{OrderStatus, ProductState};
use vivero_storefront::models::Page;

#[test]
fn test_status_filter_marks_current() {
    let options = SelectOption::order_statuses(Some(OrderStatus::Shipped));
    let selected: Vec<_> = options.iter().filter(|o| o.selected).collect();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].value, "shipped");
}

#[test]
fn test_product_state_filter_without_selection() {
    let options = SelectOption::product_states(None);
    assert_eq!(options.len(), ProductState::ALL.len());
    assert!(options.iter().all(|o| !o.selected));
}

#[test]
fn test_pager_keeps_filters() {
    let query = query_string(&[
        ("status", Some("pending")),
        ("q", Some("ana gómez")),
        ("role", None),
    ]);
    let page: Page<()> = Page {
        items: vec![],
        page: 2,
        per_page: 25,
        total: 80,
    };
    let pager = Pager::new(&page, "/orders", &query);
    assert_eq!(query, "status=pending&q=ana%20g%C3%B3mez");
    assert_eq!(pager.total_pages, 4);
    assert!(pager.prev_link.as_deref().unwrap().contains("status=pending"));
    assert!(pager.next_link.as_deref().unwrap().ends_with("page=3"));
}
