//! HTTP handlers for product and bundle membership endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::bundle::AddBundleItemsInput;
use crate::services::product::{CreateProductInput, ProductFilter, UpdateProductInput};
use crate::services::{scope, BundleService, ProductService};
use crate::AppState;
use shared::models::{BundleItem, Product};
use shared::types::ListResult;

use super::{pagination, ScopeQuery};

#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    pub company_id: Option<Uuid>,
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    pub company_id: Option<Uuid>,
    #[serde(default)]
    pub force: bool,
}

pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(q): Query<ScopeQuery>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    check_permission(&current_user.0, "products", "add")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = ProductService::new(state.db);
    let product = service.create(company_id, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(q): Query<ListProductsQuery>,
) -> AppResult<Json<ListResult<Product>>> {
    check_permission(&current_user.0, "products", "view")?;
    let company_id = scope::read_scope(&current_user.0, q.company_id)?;
    let filter = ProductFilter {
        search: q.search,
        category_id: q.category_id,
    };
    let service = ProductService::new(state.db);
    let result = service
        .list(company_id, filter, pagination(q.page, q.per_page))
        .await?;
    Ok(Json(result))
}

pub async fn get_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
) -> AppResult<Json<Product>> {
    check_permission(&current_user.0, "products", "view")?;
    let company_id = scope::read_scope(&current_user.0, q.company_id)?;
    let service = ProductService::new(state.db);
    let product = service.get(company_id, product_id).await?;
    Ok(Json(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    check_permission(&current_user.0, "products", "update")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = ProductService::new(state.db);
    let product = service.update(company_id, product_id, input).await?;
    Ok(Json(product))
}

/// Delete a product; `?force=true` overrides the stock-exists guard
pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Query(q): Query<DeleteQuery>,
) -> AppResult<Json<()>> {
    check_permission(&current_user.0, "products", "delete")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = ProductService::new(state.db);
    service.delete(company_id, product_id, q.force).await?;
    Ok(Json(()))
}

pub async fn list_bundle_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
) -> AppResult<Json<Vec<BundleItem>>> {
    check_permission(&current_user.0, "products", "view")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = BundleService::new(state.db);
    let items = service.list(company_id, product_id).await?;
    Ok(Json(items))
}

/// Add components to a bundle; already-present components are skipped
pub async fn add_bundle_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
    Json(input): Json<AddBundleItemsInput>,
) -> AppResult<(StatusCode, Json<Vec<BundleItem>>)> {
    check_permission(&current_user.0, "products", "update")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = BundleService::new(state.db);
    let added = service.add(company_id, product_id, input).await?;
    Ok((StatusCode::CREATED, Json(added)))
}

pub async fn remove_bundle_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((product_id, item_id)): Path<(Uuid, Uuid)>,
    Query(q): Query<ScopeQuery>,
) -> AppResult<Json<()>> {
    check_permission(&current_user.0, "products", "update")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = BundleService::new(state.db);
    service.remove(company_id, product_id, item_id).await?;
    Ok(Json(()))
}
