//! HTTP request handlers

pub mod auth;
pub mod category;
pub mod company;
pub mod health;
pub mod product;
pub mod purchase_order;
pub mod sales_invoice;
pub mod stock;

pub use auth::{login, refresh, register};
pub use category::{
    create_category, delete_category, get_category, list_categories, update_category,
};
pub use company::{
    create_company, delete_company, get_company, list_companies, update_company,
};
pub use health::health_check;
pub use product::{
    add_bundle_items, create_product, delete_product, get_product, list_bundle_items,
    list_products, remove_bundle_item, update_product,
};
pub use purchase_order::{
    create_purchase_order, delete_purchase_order, get_purchase_order, get_purchase_order_lines,
    list_purchase_orders, update_purchase_order,
};
pub use sales_invoice::{
    create_sales_invoice, delete_sales_invoice, get_sales_invoice, get_sales_invoice_lines,
    list_sales_invoices, update_sales_invoice,
};
pub use stock::{delete_entry, list_entries, stock_in, stock_out, update_entry};

use serde::Deserialize;
use uuid::Uuid;

use shared::types::Pagination;

/// Company scoping query for endpoints whose body carries no company id.
/// Ignored for non-super-admin users, who are always pinned to their own.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    pub company_id: Option<Uuid>,
}

/// Pagination is opt-in: without a `page` parameter the full set is returned
pub(crate) fn pagination(page: Option<u32>, per_page: Option<u32>) -> Option<Pagination> {
    page.map(|page| Pagination {
        page,
        per_page: per_page.unwrap_or_else(|| Pagination::default().per_page),
    })
}
