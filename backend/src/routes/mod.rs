//! Route definitions for the Inventory ERP Platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (login and refresh are public, register requires auth)
        .nest("/auth", auth_routes())
        // Protected routes - company management
        .nest("/companies", company_routes())
        // Protected routes - catalog
        .nest("/categories", category_routes())
        .nest("/products", product_routes())
        // Protected routes - order documents
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/sales-invoices", sales_invoice_routes())
        // Protected routes - stock ledger
        .nest("/stock", stock_routes())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route(
            "/register",
            post(handlers::register).route_layer(middleware::from_fn(auth_middleware)),
        )
}

fn company_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_companies).post(handlers::create_company),
        )
        .route(
            "/:company_id",
            get(handlers::get_company)
                .put(handlers::update_company)
                .delete(handlers::delete_company),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/:category_id",
            get(handlers::get_category)
                .put(handlers::update_category)
                .delete(handlers::delete_category),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_products).post(handlers::create_product),
        )
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route(
            "/:product_id/bundle-items",
            get(handlers::list_bundle_items).post(handlers::add_bundle_items),
        )
        .route(
            "/:product_id/bundle-items/:item_id",
            axum::routing::delete(handlers::remove_bundle_item),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}

fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchase_orders).post(handlers::create_purchase_order),
        )
        .route(
            "/:order_id",
            get(handlers::get_purchase_order)
                .put(handlers::update_purchase_order)
                .delete(handlers::delete_purchase_order),
        )
        .route("/:order_id/lines", get(handlers::get_purchase_order_lines))
        .route_layer(middleware::from_fn(auth_middleware))
}

fn sales_invoice_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_sales_invoices).post(handlers::create_sales_invoice),
        )
        .route(
            "/:invoice_id",
            get(handlers::get_sales_invoice)
                .put(handlers::update_sales_invoice)
                .delete(handlers::delete_sales_invoice),
        )
        .route("/:invoice_id/lines", get(handlers::get_sales_invoice_lines))
        .route_layer(middleware::from_fn(auth_middleware))
}

fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/entries", get(handlers::list_entries))
        .route("/in", post(handlers::stock_in))
        .route("/out", post(handlers::stock_out))
        .route(
            "/entries/:entry_id",
            put(handlers::update_entry).delete(handlers::delete_entry),
        )
        .route_layer(middleware::from_fn(auth_middleware))
}
