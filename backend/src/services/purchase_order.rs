//! Purchase order service
//!
//! Creating, editing and deleting a purchase order keeps the stock ledger in
//! step: create applies the inbound effect, edit reverts the old content and
//! applies the new inside one transaction, delete reverts then removes.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::reconciliation::{
    self, DocumentOutcome, DocumentRef, LineSnapshot,
};
use crate::services::sequence::{self, SEQ_PURCHASE_ORDER};
use shared::models::{Counterparty, LedgerSource, LineItem, OrderDocumentInput, OrderKind};
use shared::types::{DateRange, ListResult, PaginatedResponse, Pagination, PaginationMeta};
use shared::validation;

/// Purchase order service
#[derive(Clone)]
pub struct PurchaseOrderService {
    db: PgPool,
}

/// A purchase order as returned by the API
#[derive(Debug, Serialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub order_id: i64,
    pub company_id: Uuid,
    pub number: String,
    pub order_date: NaiveDate,
    pub supplier: Counterparty,
    pub items: Vec<LineItem>,
    pub total_amount: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Filters for listing purchase orders
#[derive(Debug, Default, Deserialize)]
pub struct PurchaseOrderFilter {
    /// Free text matched against number and supplier name
    pub search: Option<String>,
    pub supplier: Option<String>,
    pub date_range: Option<DateRange>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_id: i64,
    company_id: Uuid,
    number: String,
    order_date: NaiveDate,
    supplier_name: String,
    supplier_gstin: Option<String>,
    supplier_phone: Option<String>,
    supplier_email: Option<String>,
    supplier_address: Option<String>,
    items: serde_json::Value,
    total_amount: Decimal,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn line_items(&self) -> Vec<LineItem> {
        serde_json::from_value(self.items.clone()).unwrap_or_default()
    }
}

impl From<OrderRow> for PurchaseOrder {
    fn from(row: OrderRow) -> Self {
        let items = row.line_items();
        PurchaseOrder {
            id: row.id,
            order_id: row.order_id,
            company_id: row.company_id,
            number: row.number,
            order_date: row.order_date,
            supplier: Counterparty {
                name: row.supplier_name,
                gstin: row.supplier_gstin,
                phone: row.supplier_phone,
                email: row.supplier_email,
                address: row.supplier_address,
            },
            items,
            total_amount: row.total_amount,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ORDER_COLUMNS: &str = "id, order_id, company_id, number, order_date, supplier_name, \
     supplier_gstin, supplier_phone, supplier_email, supplier_address, items, \
     total_amount, active, created_at, updated_at";

impl PurchaseOrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        company_id: Uuid,
        input: OrderDocumentInput,
    ) -> AppResult<DocumentOutcome<PurchaseOrder>> {
        validation::validate_name(&input.counterparty.name).map_err(|msg| {
            AppError::Validation {
                field: "counterparty.name".to_string(),
                message: msg.to_string(),
            }
        })?;

        let items_json = serde_json::to_value(&input.items)
            .map_err(|e| AppError::Internal(format!("Line item encoding failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        let order_id = sequence::next_value(&mut *tx, company_id, SEQ_PURCHASE_ORDER).await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO purchase_orders (
                order_id, company_id, number, order_date, supplier_name,
                supplier_gstin, supplier_phone, supplier_email, supplier_address,
                items, total_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id)
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
            kind: OrderKind::PurchaseOrder,
            id: row.id,
            company_id,
            number: &row.number,
            date: row.order_date,
        };
        let warnings = reconciliation::apply_document(&mut tx, &doc, &input.items).await?;

        tx.commit().await?;

        Ok(DocumentOutcome {
            document: row.into(),
            warnings,
        })
    }

    pub async fn get(&self, company_id: Option<Uuid>, id: Uuid) -> AppResult<PurchaseOrder> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {} FROM purchase_orders
            WHERE id = $1 AND ($2::uuid IS NULL OR company_id = $2)
            "#,
            ORDER_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        Ok(row.into())
    }

    pub async fn list(
        &self,
        company_id: Option<Uuid>,
        filter: PurchaseOrderFilter,
        pagination: Option<Pagination>,
    ) -> AppResult<ListResult<PurchaseOrder>> {
        let pattern = filter.search.as_deref().map(|s| format!("%{}%", s));
        let supplier = filter.supplier.as_deref().map(|s| format!("%{}%", s));
        let (start, end) = match &filter.date_range {
            Some(range) => (Some(range.start), Some(range.end)),
            None => (None, None),
        };

        let where_clause = r#"
            FROM purchase_orders
            WHERE ($1::uuid IS NULL OR company_id = $1)
              AND ($2::text IS NULL OR number ILIKE $2 OR supplier_name ILIKE $2)
              AND ($3::text IS NULL OR supplier_name ILIKE $3)
              AND ($4::date IS NULL OR order_date >= $4)
              AND ($5::date IS NULL OR order_date <= $5)
        "#;

        let select = format!(
            "SELECT {} {} ORDER BY created_at DESC",
            ORDER_COLUMNS, where_clause
        );

        match pagination {
            Some(page) => {
                let total =
                    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", where_clause))
                        .bind(company_id)
                        .bind(&pattern)
                        .bind(&supplier)
                        .bind(start)
                        .bind(end)
                        .fetch_one(&self.db)
                        .await?;

                let rows =
                    sqlx::query_as::<_, OrderRow>(&format!("{} LIMIT $6 OFFSET $7", select))
                        .bind(company_id)
                        .bind(&pattern)
                        .bind(&supplier)
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
                let rows = sqlx::query_as::<_, OrderRow>(&select)
                    .bind(company_id)
                    .bind(&pattern)
                    .bind(&supplier)
                    .bind(start)
                    .bind(end)
                    .fetch_all(&self.db)
                    .await?;

                Ok(ListResult::All(rows.into_iter().map(Into::into).collect()))
            }
        }
    }

    /// Update a purchase order. The old stock effect is reverted and the new
    /// one applied within the same transaction.
    pub async fn update(
        &self,
        company_id: Uuid,
        id: Uuid,
        input: OrderDocumentInput,
    ) -> AppResult<DocumentOutcome<PurchaseOrder>> {
        let items_json = serde_json::to_value(&input.items)
            .map_err(|e| AppError::Internal(format!("Line item encoding failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM purchase_orders WHERE id = $1 AND company_id = $2 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let old_items = existing.line_items();
        let old_doc = DocumentRef {
            kind: OrderKind::PurchaseOrder,
            id: existing.id,
            company_id,
            number: &existing.number,
            date: existing.order_date,
        };
        let mut warnings = reconciliation::revert_document(&mut tx, &old_doc, &old_items).await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE purchase_orders
            SET number = $3, order_date = $4, supplier_name = $5, supplier_gstin = $6,
                supplier_phone = $7, supplier_email = $8, supplier_address = $9,
                items = $10, total_amount = $11, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {}
            "#,
            ORDER_COLUMNS
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
            kind: OrderKind::PurchaseOrder,
            id: row.id,
            company_id,
            number: &row.number,
            date: row.order_date,
        };
        warnings.extend(reconciliation::apply_document(&mut tx, &new_doc, &input.items).await?);

        tx.commit().await?;

        Ok(DocumentOutcome {
            document: row.into(),
            warnings,
        })
    }

    /// Delete a purchase order, reverting its stock effect first
    pub async fn delete(
        &self,
        company_id: Uuid,
        id: Uuid,
    ) -> AppResult<DocumentOutcome<()>> {
        let mut tx = self.db.begin().await?;

        let existing = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM purchase_orders WHERE id = $1 AND company_id = $2 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".to_string()))?;

        let items = existing.line_items();
        let doc = DocumentRef {
            kind: OrderKind::PurchaseOrder,
            id: existing.id,
            company_id,
            number: &existing.number,
            date: existing.order_date,
        };
        let warnings = reconciliation::revert_document(&mut tx, &doc, &items).await?;

        sqlx::query("DELETE FROM purchase_orders WHERE id = $1 AND company_id = $2")
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

    /// Per-line snapshots written when the order's effect was applied
    pub async fn lines(&self, company_id: Option<Uuid>, id: Uuid) -> AppResult<Vec<LineSnapshot>> {
        // 404 before returning an empty snapshot list for a foreign document
        self.get(company_id, id).await?;
        reconciliation::list_snapshots(&self.db, LedgerSource::PurchaseOrder, id).await
    }
}
