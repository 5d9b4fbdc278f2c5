//! HTTP handlers for purchase order endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser};
use crate::services::purchase_order::{PurchaseOrder, PurchaseOrderFilter};
use crate::services::reconciliation::{DocumentOutcome, LineSnapshot};
use crate::services::{scope, PurchaseOrderService};
use crate::AppState;
use shared::models::OrderDocumentInput;
use shared::types::{DateRange, ListResult};

use super::{pagination, ScopeQuery};

#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    pub company_id: Option<Uuid>,
    pub search: Option<String>,
    pub supplier: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn create_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(q): Query<ScopeQuery>,
    Json(input): Json<OrderDocumentInput>,
) -> AppResult<(StatusCode, Json<DocumentOutcome<PurchaseOrder>>)> {
    check_permission(&current_user.0, "purchase_orders", "add")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = PurchaseOrderService::new(state.db);
    let outcome = service.create(company_id, input).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn list_purchase_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(q): Query<ListOrdersQuery>,
) -> AppResult<Json<ListResult<PurchaseOrder>>> {
    check_permission(&current_user.0, "purchase_orders", "view")?;
    let company_id = scope::read_scope(&current_user.0, q.company_id)?;
    let filter = PurchaseOrderFilter {
        search: q.search,
        supplier: q.supplier,
        date_range: match (q.start_date, q.end_date) {
            (Some(start), Some(end)) => Some(DateRange { start, end }),
            _ => None,
        },
    };
    let service = PurchaseOrderService::new(state.db);
    let result = service
        .list(company_id, filter, pagination(q.page, q.per_page))
        .await?;
    Ok(Json(result))
}

pub async fn get_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
) -> AppResult<Json<PurchaseOrder>> {
    check_permission(&current_user.0, "purchase_orders", "view")?;
    let company_id = scope::read_scope(&current_user.0, q.company_id)?;
    let service = PurchaseOrderService::new(state.db);
    let order = service.get(company_id, order_id).await?;
    Ok(Json(order))
}

pub async fn update_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
    Json(input): Json<OrderDocumentInput>,
) -> AppResult<Json<DocumentOutcome<PurchaseOrder>>> {
    check_permission(&current_user.0, "purchase_orders", "update")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = PurchaseOrderService::new(state.db);
    let outcome = service.update(company_id, order_id, input).await?;
    Ok(Json(outcome))
}

pub async fn delete_purchase_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
) -> AppResult<Json<DocumentOutcome<()>>> {
    check_permission(&current_user.0, "purchase_orders", "delete")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = PurchaseOrderService::new(state.db);
    let outcome = service.delete(company_id, order_id).await?;
    Ok(Json(outcome))
}

/// Per-line snapshots recorded when the order's stock effect was applied
pub async fn get_purchase_order_lines(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
) -> AppResult<Json<Vec<LineSnapshot>>> {
    check_permission(&current_user.0, "purchase_orders", "view")?;
    let company_id = scope::read_scope(&current_user.0, q.company_id)?;
    let service = PurchaseOrderService::new(state.db);
    let lines = service.lines(company_id, order_id).await?;
    Ok(Json(lines))
}
