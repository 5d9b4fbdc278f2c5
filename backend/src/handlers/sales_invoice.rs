//! HTTP handlers for sales invoice endpoints

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
use crate::services::reconciliation::{DocumentOutcome, LineSnapshot};
use crate::services::sales_invoice::{SalesInvoice, SalesInvoiceFilter};
use crate::services::{scope, SalesInvoiceService};
use crate::AppState;
use shared::models::OrderDocumentInput;
use shared::types::{DateRange, ListResult};

use super::{pagination, ScopeQuery};

#[derive(Debug, Default, Deserialize)]
pub struct ListInvoicesQuery {
    pub company_id: Option<Uuid>,
    pub search: Option<String>,
    pub customer: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn create_sales_invoice(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(q): Query<ScopeQuery>,
    Json(input): Json<OrderDocumentInput>,
) -> AppResult<(StatusCode, Json<DocumentOutcome<SalesInvoice>>)> {
    check_permission(&current_user.0, "sales_invoices", "add")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = SalesInvoiceService::new(state.db);
    let outcome = service.create(company_id, input).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn list_sales_invoices(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(q): Query<ListInvoicesQuery>,
) -> AppResult<Json<ListResult<SalesInvoice>>> {
    check_permission(&current_user.0, "sales_invoices", "view")?;
    let company_id = scope::read_scope(&current_user.0, q.company_id)?;
    let filter = SalesInvoiceFilter {
        search: q.search,
        customer: q.customer,
        date_range: match (q.start_date, q.end_date) {
            (Some(start), Some(end)) => Some(DateRange { start, end }),
            _ => None,
        },
    };
    let service = SalesInvoiceService::new(state.db);
    let result = service
        .list(company_id, filter, pagination(q.page, q.per_page))
        .await?;
    Ok(Json(result))
}

pub async fn get_sales_invoice(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
) -> AppResult<Json<SalesInvoice>> {
    check_permission(&current_user.0, "sales_invoices", "view")?;
    let company_id = scope::read_scope(&current_user.0, q.company_id)?;
    let service = SalesInvoiceService::new(state.db);
    let invoice = service.get(company_id, invoice_id).await?;
    Ok(Json(invoice))
}

pub async fn update_sales_invoice(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
    Json(input): Json<OrderDocumentInput>,
) -> AppResult<Json<DocumentOutcome<SalesInvoice>>> {
    check_permission(&current_user.0, "sales_invoices", "update")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = SalesInvoiceService::new(state.db);
    let outcome = service.update(company_id, invoice_id, input).await?;
    Ok(Json(outcome))
}

pub async fn delete_sales_invoice(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
) -> AppResult<Json<DocumentOutcome<()>>> {
    check_permission(&current_user.0, "sales_invoices", "delete")?;
    let company_id = scope::write_scope(&current_user.0, q.company_id)?;
    let service = SalesInvoiceService::new(state.db);
    let outcome = service.delete(company_id, invoice_id).await?;
    Ok(Json(outcome))
}

/// Per-line snapshots recorded when the invoice's stock effect was applied
pub async fn get_sales_invoice_lines(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(invoice_id): Path<Uuid>,
    Query(q): Query<ScopeQuery>,
) -> AppResult<Json<Vec<LineSnapshot>>> {
    check_permission(&current_user.0, "sales_invoices", "view")?;
    let company_id = scope::read_scope(&current_user.0, q.company_id)?;
    let service = SalesInvoiceService::new(state.db);
    let lines = service.lines(company_id, invoice_id).await?;
    Ok(Json(lines))
}
