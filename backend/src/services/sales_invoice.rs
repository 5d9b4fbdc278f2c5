//! Sales invoice service
//!
//! The outbound counterpart to purchase orders: create applies the outbound
//! stock effect, edit reverts and reapplies in one transaction, delete
//! reverts then removes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::reconciliation::{
    self, DocumentOutcome, DocumentRef, LineSnapshot,
};
use crate::services::sequence::{self, SEQ_SALES_INVOICE};
use shared::models::{Counterparty, LedgerSource, LineItem, OrderDocumentInput, OrderKind};
use shared::types::{DateRange, ListResult, PaginatedResponse, Pagination, PaginationMeta};
use shared::validation;

/// Sales invoice service
#[derive(Clone)]
pub struct SalesInvoiceService {
    db: PgPool,
}

/// A sales invoice as returned by the API
#[derive(Debug, Serialize)]
pub struct SalesInvoice {
    pub id: Uuid,
    pub invoice_id: i64,
    pub company_id: Uuid,
    pub number: String,
    pub invoice_date: NaiveDate,
    pub customer: Counterparty,
    pub items: Vec<LineItem>,
    pub total_amount: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for listing sales invoices
#[derive(Debug, Default, Deserialize)]
pub struct SalesInvoiceFilter {
    /// Free text matched against number and customer name
    pub search: Option<String>,
    pub customer: Option<String>,
    pub date_range: Option<DateRange>,
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    invoice_id: i64,
    company_id: Uuid,
    number: String,
    invoice_date: NaiveDate,
    customer_name: String,
    customer_gstin: Option<String>,
    customer_phone: Option<String>,
    customer_email: Option<String>,
    customer_address: Option<String>,
    items: serde_json::Value,
    total_amount: Decimal,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn line_items(&self) -> Vec<LineItem> {
        serde_json::from_value(self.items.clone()).unwrap_or_default()
    }
}

impl From<InvoiceRow> for SalesInvoice {
    fn from(row: InvoiceRow) -> Self {
        let items = row.line_items();
        SalesInvoice {
            id: row.id,
            invoice_id: row.invoice_id,
            company_id: row.company_id,
            number: row.number,
            invoice_date: row.invoice_date,
            customer: Counterparty {
                name: row.customer_name,
                gstin: row.customer_gstin,
                phone: row.customer_phone,
                email: row.customer_email,
                address: row.customer_address,
            },
            items,
            total_amount: row.total_amount,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const INVOICE_COLUMNS: &str = "id, invoice_id, company_id, number, invoice_date, customer_name, \
     customer_gstin, customer_phone, customer_email, customer_address, items, \
     total_amount, active, created_at, updated_at";

impl SalesInvoiceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        company_id: Uuid,
        input: OrderDocumentInput,
    ) -> AppResult<DocumentOutcome<SalesInvoice>> {
        validation::validate_name(&input.counterparty.name).map_err(|msg| {
            AppError::Validation {
                field: "counterparty.name".to_string(),
                message: msg.to_string(),
            }
        })?;

        let items_json = serde_json::to_value(&input.items)
            .map_err(|e| AppError::Internal(format!("Line item encoding failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        let invoice_id = sequence::next_value(&mut *tx, company_id, SEQ_SALES_INVOICE).await?;

        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            INSERT INTO sales_invoices (
                invoice_id, company_id, number, invoice_date, customer_name,
                customer_gstin, customer_phone, customer_email, customer_address,
                items, total_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(invoice_id)
        .bind(company_id)
        .bind(&input.number)
        .bind(input.date)
        .bind(&input.counterparty.name)
        .bind(&input.counterparty.gstin)
        .bind(&input.counterparty.phone)
        .bind(&input.counterparty.email)
        .bind(&input.counterparty.address)
        .bind(&items_json)
        .bind(input.total_amount)
        .fetch_one(&mut *tx)
        .await?;

        let doc = DocumentRef {
            kind: OrderKind::SalesInvoice,
            id: row.id,
            company_id,
            number: &row.number,
            date: row.invoice_date,
        };
        let warnings = reconciliation::apply_document(&mut tx, &doc, &input.items).await?;

        tx.commit().await?;

        Ok(DocumentOutcome {
            document: row.into(),
            warnings,
        })
    }

    pub async fn get(&self, company_id: Option<Uuid>, id: Uuid) -> AppResult<SalesInvoice> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            SELECT {} FROM sales_invoices
            WHERE id = $1 AND ($2::uuid IS NULL OR company_id = $2)
            "#,
            INVOICE_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Sales invoice".to_string()))?;

        Ok(row.into())
    }

    pub async fn list(
        &self,
        company_id: Option<Uuid>,
        filter: SalesInvoiceFilter,
        pagination: Option<Pagination>,
    ) -> AppResult<ListResult<SalesInvoice>> {
        let pattern = filter.search.as_deref().map(|s| format!("%{}%", s));
        let customer = filter.customer.as_deref().map(|s| format!("%{}%", s));
        let (start, end) = match &filter.date_range {
            Some(range) => (Some(range.start), Some(range.end)),
            None => (None, None),
        };

        let where_clause = r#"
            FROM sales_invoices
            WHERE ($1::uuid IS NULL OR company_id = $1)
              AND ($2::text IS NULL OR number ILIKE $2 OR customer_name ILIKE $2)
              AND ($3::text IS NULL OR customer_name ILIKE $3)
              AND ($4::date IS NULL OR invoice_date >= $4)
              AND ($5::date IS NULL OR invoice_date <= $5)
        "#;

        let select = format!(
            "SELECT {} {} ORDER BY created_at DESC",
            INVOICE_COLUMNS, where_clause
        );

        match pagination {
            Some(page) => {
                let total =
                    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", where_clause))
                        .bind(company_id)
                        .bind(&pattern)
                        .bind(&customer)
                        .bind(start)
                        .bind(end)
                        .fetch_one(&self.db)
                        .await?;

                let rows =
                    sqlx::query_as::<_, InvoiceRow>(&format!("{} LIMIT $6 OFFSET $7", select))
                        .bind(company_id)
                        .bind(&pattern)
                        .bind(&customer)
                        .bind(start)
                        .bind(end)
                        .bind(page.limit())
                        .bind(page.offset())
                        .fetch_all(&self.db)
                        .await?;

                Ok(ListResult::Paged(PaginatedResponse {
                    data: rows.into_iter().map(Into::into).collect(),
                    pagination: PaginationMeta::new(page.page, page.per_page, total as u64),
                }))
            }
            None => {
                let rows = sqlx::query_as::<_, InvoiceRow>(&select)
                    .bind(company_id)
                    .bind(&pattern)
                    .bind(&customer)
                    .bind(start)
                    .bind(end)
                    .fetch_all(&self.db)
                    .await?;

                Ok(ListResult::All(rows.into_iter().map(Into::into).collect()))
            }
        }
    }

    /// Update a sales invoice. The old stock effect is reverted and the new
    /// one applied within the same transaction.
    pub async fn update(
        &self,
        company_id: Uuid,
        id: Uuid,
        input: OrderDocumentInput,
    ) -> AppResult<DocumentOutcome<SalesInvoice>> {
        let items_json = serde_json::to_value(&input.items)
            .map_err(|e| AppError::Internal(format!("Line item encoding failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM sales_invoices WHERE id = $1 AND company_id = $2 FOR UPDATE",
            INVOICE_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sales invoice".to_string()))?;

        let old_items = existing.line_items();
        let old_doc = DocumentRef {
            kind: OrderKind::SalesInvoice,
            id: existing.id,
            company_id,
            number: &existing.number,
            date: existing.invoice_date,
        };
        let mut warnings = reconciliation::revert_document(&mut tx, &old_doc, &old_items).await?;

        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            UPDATE sales_invoices
            SET number = $3, invoice_date = $4, customer_name = $5, customer_gstin = $6,
                customer_phone = $7, customer_email = $8, customer_address = $9,
                items = $10, total_amount = $11, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {}
            "#,
            INVOICE_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .bind(&input.number)
        .bind(input.date)
        .bind(&input.counterparty.name)
        .bind(&input.counterparty.gstin)
        .bind(&input.counterparty.phone)
        .bind(&input.counterparty.email)
        .bind(&input.counterparty.address)
        .bind(&items_json)
        .bind(input.total_amount)
        .fetch_one(&mut *tx)
        .await?;

        let new_doc = DocumentRef {
            kind: OrderKind::SalesInvoice,
            id: row.id,
            company_id,
            number: &row.number,
            date: row.invoice_date,
        };
        warnings.extend(reconciliation::apply_document(&mut tx, &new_doc, &input.items).await?);

        tx.commit().await?;

        Ok(DocumentOutcome {
            document: row.into(),
            warnings,
        })
    }

    /// Delete a sales invoice, reverting its stock effect first
    pub async fn delete(
        &self,
        company_id: Uuid,
        id: Uuid,
    ) -> AppResult<DocumentOutcome<()>> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM sales_invoices WHERE id = $1 AND company_id = $2 FOR UPDATE",
            INVOICE_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Sales invoice".to_string()))?;

        let items = existing.line_items();
        let doc = DocumentRef {
            kind: OrderKind::SalesInvoice,
            id: existing.id,
            company_id,
            number: &existing.number,
            date: existing.invoice_date,
        };
        let warnings = reconciliation::revert_document(&mut tx, &doc, &items).await?;

        sqlx::query("DELETE FROM sales_invoices WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(DocumentOutcome {
            document: (),
            warnings,
        })
    }

    /// Per-line snapshots written when the invoice's effect was applied
    pub async fn lines(&self, company_id: Option<Uuid>, id: Uuid) -> AppResult<Vec<LineSnapshot>> {
        // 404 before returning an empty snapshot list for a foreign document
        self.get(company_id, id).await?;
        reconciliation::list_snapshots(&self.db, LedgerSource::SalesInvoice, id).await
    }
}
