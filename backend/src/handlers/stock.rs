//! HTTP handlers for stock ledger endpoints

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
use crate::services::ledger::{LedgerFilter, ManualAdjustmentInput, UpdateManualEntryInput};
use crate::services::{scope, LedgerService};
use crate::AppState;
use shared::models::{LedgerEntry, LedgerSource, StockDirection};
use shared::types::{DateRange, ListResult};

use super::{pagination, ScopeQuery};

#[derive(Debug, Default, Deserialize)]
pub struct ListEntriesQuery {
    pub company_id: Option<Uuid>,
    pub direction: Option<StockDirection>,
    pub source_type: Option<LedgerSource>,
    pub product: Option<String>,
    pub reference: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list_entries(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(q): Query<ListEntriesQuery>,
) -> AppResult<Json<ListResult<LedgerEntry>>> {
    check_permission(&current_user.0, "stock", "view")?;
    let company_id = scope::read_scope(&current_user.0, q.company_id)?;
    let filter = LedgerFilter {
        direction: q.direction,
        source_type: q.source_type,
        product: q.product,
        reference: q.reference,
        date_range: match (q.start_date, q.end_date) {
            (Some(start), Some(end)) => Some(DateRange { start, end }),
            _ => None,
        },
    };
    let service = LedgerService::new(state.db);
    let result = service
        .list(company_id, filter, pagination(q.page, q.per_page))
        .await?;
    Ok(Json(result))
}

/// Record a manual inbound stock movement
pub async fn stock_in(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(q): Query<ScopeQuery>,
    Json(input): Json<ManualAdjustmentInput>,
) -> AppResult<(StatusCode, Json<LedgerEntry>)> {
    check_permission(&current_user.0, "stock", "add")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = LedgerService::new(state.db);
    let entry = service
        .adjust(company_id, StockDirection::In, input)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Record a manual outbound stock movement
pub async fn stock_out(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(q): Query<ScopeQuery>,
    Json(input): Json<ManualAdjustmentInput>,
) -> AppResult<(StatusCode, Json<LedgerEntry>)> {
    check_permission(&current_user.0, "stock", "add")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = LedgerService::new(state.db);
    let entry = service
        .adjust(company_id, StockDirection::Out, input)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Edit a manual entry; the stock difference is applied to the product
pub async fn update_entry(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(entry_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
    Json(input): Json<UpdateManualEntryInput>,
) -> AppResult<Json<LedgerEntry>> {
    check_permission(&current_user.0, "stock", "update")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = LedgerService::new(state.db);
    let entry = service.update_entry(company_id, entry_id, input).await?;
    Ok(Json(entry))
}

/// Delete a manual entry, reverting its stock effect
pub async fn delete_entry(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(entry_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
) -> AppResult<Json<()>> {
    check_permission(&current_user.0, "stock", "delete")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = LedgerService::new(state.db);
    service.delete_entry(company_id, entry_id).await?;
    Ok(Json(()))
}
