//! HTTP handlers for category endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::category::CreateCategoryInput;
use crate::services::{scope, CategoryService};
use crate::AppState;
use shared::models::Category;
use shared::types::ListResult;

use super::{pagination, ScopeQuery};

#[derive(Debug, Default, Deserialize)]
pub struct ListCategoriesQuery {
    pub company_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    pub company_id: Option<Uuid>,
    #[serde(default)]
    pub force: bool,
}

pub async fn create_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(q): Query<ScopeQuery>,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<(StatusCode, Json<Category>)> {
    check_permission(&current_user.0, "categories", "add")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = CategoryService::new(state.db);
    let category = service.create(company_id, input).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_categories(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(q): Query<ListCategoriesQuery>,
) -> AppResult<Json<ListResult<Category>>> {
    check_permission(&current_user.0, "categories", "view")?;
    let company_id = scope::read_scope(&current_user.0, q.company_id)?;
    let service = CategoryService::new(state.db);
    let result = service
        .list(company_id, q.search.as_deref(), pagination(q.page, q.per_page))
        .await?;
    Ok(Json(result))
}

pub async fn get_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
) -> AppResult<Json<Category>> {
    check_permission(&current_user.0, "categories", "view")?;
    let company_id = scope::read_scope(&current_user.0, q.company_id)?;
    let service = CategoryService::new(state.db);
    let category = service.get(company_id, category_id).await?;
    Ok(Json(category))
}

pub async fn update_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
    Json(input): Json<CreateCategoryInput>,
) -> AppResult<Json<Category>> {
    check_permission(&current_user.0, "categories", "update")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = CategoryService::new(state.db);
    let category = service.update(company_id, category_id, input).await?;
    Ok(Json(category))
}

/// Delete a category; `?force=true` cascades its products away
pub async fn delete_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(category_id): Path<Uuid>,
    Query(q): Query<DeleteQuery>,
) -> AppResult<Json<()>> {
    check_permission(&current_user.0, "categories", "delete")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = CategoryService::new(state.db);
    service.delete(company_id, category_id, q.force).await?;
    Ok(Json(()))
}
