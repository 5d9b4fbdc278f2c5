//! Stock ledger service
//!
//! Manual stock adjustments and the ledger query surface. Manual entries
//! carry source_type 'manual' with no document reference; editing one applies
//! the quantity difference to the product, deleting one reverts its effect.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{LedgerEntry, LedgerSource, StockDirection, StockTrackingMode};
use shared::types::{DateRange, ListResult, PaginatedResponse, Pagination, PaginationMeta};
use shared::validation;

/// Stock ledger service
#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// Input for a manual stock adjustment
#[derive(Debug, Deserialize)]
pub struct ManualAdjustmentInput {
    pub product_id: Uuid,
    /// Accepts a JSON number or a numeric string
    #[serde(default)]
    pub quantity: serde_json::Value,
    pub unit_price: Option<Decimal>,
    pub reference: Option<String>,
    pub entry_date: Option<NaiveDate>,
}

/// Input for editing a manual ledger entry
#[derive(Debug, Deserialize)]
pub struct UpdateManualEntryInput {
    #[serde(default)]
    pub quantity: serde_json::Value,
    pub unit_price: Option<Decimal>,
    pub reference: Option<String>,
    pub entry_date: Option<NaiveDate>,
}

/// Filters for listing ledger entries
#[derive(Debug, Default, Deserialize)]
pub struct LedgerFilter {
    pub direction: Option<StockDirection>,
    pub source_type: Option<LedgerSource>,
    /// Substring match on the product name snapshot
    pub product: Option<String>,
    /// Substring match on the reference
    pub reference: Option<String>,
    pub date_range: Option<DateRange>,
}

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    company_id: Uuid,
    product_id: Uuid,
    product_numeric_id: i64,
    product_name: String,
    direction: String,
    quantity: Decimal,
    unit_price: Decimal,
    total: Decimal,
    source_type: String,
    source_document_id: Option<Uuid>,
    source_line_index: Option<i32>,
    reference: Option<String>,
    entry_date: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EntryRow {
    fn direction(&self) -> StockDirection {
        StockDirection::parse(&self.direction).unwrap_or(StockDirection::In)
    }
}

impl From<EntryRow> for LedgerEntry {
    fn from(row: EntryRow) -> Self {
        let direction = row.direction();
        let source_type = LedgerSource::parse(&row.source_type).unwrap_or(LedgerSource::Manual);
        LedgerEntry {
            id: row.id,
            company_id: row.company_id,
            product_id: row.product_id,
            product_numeric_id: row.product_numeric_id,
            product_name: row.product_name,
            direction,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total: row.total,
            source_type,
            source_document_id: row.source_document_id,
            source_line_index: row.source_line_index,
            reference: row.reference,
            entry_date: row.entry_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AdjustableProductRow {
    id: Uuid,
    product_id: i64,
    name: String,
    tracking_mode: String,
}

const ENTRY_COLUMNS: &str = "id, company_id, product_id, product_numeric_id, product_name, \
     direction, quantity, unit_price, total, source_type, source_document_id, \
     source_line_index, reference, entry_date, created_at, updated_at";

impl LedgerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a manual stock movement and apply it to the product
    pub async fn adjust(
        &self,
        company_id: Uuid,
        direction: StockDirection,
        input: ManualAdjustmentInput,
    ) -> AppResult<LedgerEntry> {
        let quantity = validation::coerce_decimal(&input.quantity);
        validation::validate_adjustment_quantity(quantity)
            .map_err(|_| AppError::InvalidQuantity)?;

        let unit_price = input.unit_price.unwrap_or(Decimal::ZERO);
        let total = quantity * unit_price;

        let mut tx = self.db.begin().await?;

        let product = self
            .lock_product(&mut tx, company_id, input.product_id)
            .await?;

        let row = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            INSERT INTO stock_ledger (
                company_id, product_id, product_numeric_id, product_name,
                direction, quantity, unit_price, total, source_type,
                reference, entry_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'manual', $9,
                    COALESCE($10, CURRENT_DATE))
            RETURNING {}
            "#,
            ENTRY_COLUMNS
        ))
        .bind(company_id)
        .bind(product.id)
        .bind(product.product_id)
        .bind(&product.name)
        .bind(direction.as_str())
        .bind(quantity)
        .bind(unit_price)
        .bind(total)
        .bind(&input.reference)
        .bind(input.entry_date)
        .fetch_one(&mut *tx)
        .await?;

        apply_delta(&mut tx, product.id, direction.sign() * quantity).await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Edit a manual entry; the stock difference is applied to the product
    pub async fn update_entry(
        &self,
        company_id: Uuid,
        id: Uuid,
        input: UpdateManualEntryInput,
    ) -> AppResult<LedgerEntry> {
        let quantity = validation::coerce_decimal(&input.quantity);
        validation::validate_adjustment_quantity(quantity)
            .map_err(|_| AppError::InvalidQuantity)?;

        let mut tx = self.db.begin().await?;

        let existing = self.lock_manual_entry(&mut tx, company_id, id).await?;
        let product = self
            .lock_product(&mut tx, company_id, existing.product_id)
            .await?;

        let direction = existing.direction();
        let diff = direction.sign() * (quantity - existing.quantity);

        let unit_price = input.unit_price.unwrap_or(existing.unit_price);
        let total = quantity * unit_price;

        let row = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            UPDATE stock_ledger
            SET quantity = $3, unit_price = $4, total = $5,
                reference = COALESCE($6, reference),
                entry_date = COALESCE($7, entry_date),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {}
            "#,
            ENTRY_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(total)
        .bind(&input.reference)
        .bind(input.entry_date)
        .fetch_one(&mut *tx)
        .await?;

        apply_delta(&mut tx, product.id, diff).await?;

        tx.commit().await?;

        Ok(row.into())
    }

    /// Delete a manual entry, reverting its stock effect
    pub async fn delete_entry(&self, company_id: Uuid, id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let existing = self.lock_manual_entry(&mut tx, company_id, id).await?;
        let direction = existing.direction();

        // The product may have been force deleted; the entry still goes away
        let revert = -direction.sign() * existing.quantity;
        sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $2,
                stock_state = CASE
                    WHEN stock_quantity + $2 > 0 THEN 'in_stock'
                    ELSE 'out_of_stock'
                END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(existing.product_id)
        .bind(revert)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM stock_ledger WHERE id = $1 AND company_id = $2")
            .bind(id)
            .bind(company_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    pub async fn list(
        &self,
        company_id: Option<Uuid>,
        filter: LedgerFilter,
        pagination: Option<Pagination>,
    ) -> AppResult<ListResult<LedgerEntry>> {
        let direction = filter.direction.map(|d| d.as_str());
        let source_type = filter.source_type.map(|s| s.as_str());
        let product = filter.product.as_deref().map(|s| format!("%{}%", s));
        let reference = filter.reference.as_deref().map(|s| format!("%{}%", s));
        let (start, end) = match &filter.date_range {
            Some(range) => (Some(range.start), Some(range.end)),
            None => (None, None),
        };

        let where_clause = r#"
            FROM stock_ledger
            WHERE ($1::uuid IS NULL OR company_id = $1)
              AND ($2::text IS NULL OR direction = $2)
              AND ($3::text IS NULL OR source_type = $3)
              AND ($4::text IS NULL OR product_name ILIKE $4)
              AND ($5::text IS NULL OR reference ILIKE $5)
              AND ($6::date IS NULL OR entry_date >= $6)
              AND ($7::date IS NULL OR entry_date <= $7)
        "#;

        let select = format!(
            "SELECT {} {} ORDER BY created_at DESC",
            ENTRY_COLUMNS, where_clause
        );

        match pagination {
            Some(page) => {
                let total =
                    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", where_clause))
                        .bind(company_id)
                        .bind(direction)
                        .bind(source_type)
                        .bind(&product)
                        .bind(&reference)
                        .bind(start)
                        .bind(end)
                        .fetch_one(&self.db)
                        .await?;

                let rows =
                    sqlx::query_as::<_, EntryRow>(&format!("{} LIMIT $8 OFFSET $9", select))
                        .bind(company_id)
                        .bind(direction)
                        .bind(source_type)
                        .bind(&product)
                        .bind(&reference)
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
                let rows = sqlx::query_as::<_, EntryRow>(&select)
                    .bind(company_id)
                    .bind(direction)
                    .bind(source_type)
                    .bind(&product)
                    .bind(&reference)
                    .bind(start)
                    .bind(end)
                    .fetch_all(&self.db)
                    .await?;

                Ok(ListResult::All(rows.into_iter().map(Into::into).collect()))
            }
        }
    }

    /// Lock the product row and verify its stock is adjustable
    async fn lock_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<AdjustableProductRow> {
        let product = sqlx::query_as::<_, AdjustableProductRow>(
            r#"
            SELECT id, product_id, name, tracking_mode
            FROM products
            WHERE id = $1 AND company_id = $2
            FOR UPDATE
            "#,
        )
        .bind(product_id)
        .bind(company_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        match StockTrackingMode::parse(&product.tracking_mode) {
            Some(mode) if !mode.adjustable() => {
                Err(AppError::TrackingDisabled(product.name.clone()))
            }
            _ => Ok(product),
        }
    }

    async fn lock_manual_entry(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        company_id: Uuid,
        id: Uuid,
    ) -> AppResult<EntryRow> {
        let entry = sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {} FROM stock_ledger WHERE id = $1 AND company_id = $2 FOR UPDATE",
            ENTRY_COLUMNS
        ))
        .bind(id)
        .bind(company_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock entry".to_string()))?;

        if entry.source_type != LedgerSource::Manual.as_str() {
            return Err(AppError::ValidationError(
                "Only manual stock entries can be modified".to_string(),
            ));
        }

        Ok(entry)
    }
}

async fn apply_delta(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    delta: Decimal,
) -> AppResult<()> {
    if delta == Decimal::ZERO {
        return Ok(());
    }

    sqlx::query(
        r#"
        UPDATE products
        SET stock_quantity = stock_quantity + $2,
            stock_state = CASE
                WHEN stock_quantity + $2 > 0 THEN 'in_stock'
                ELSE 'out_of_stock'
            END,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(product_id)
    .bind(delta)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
