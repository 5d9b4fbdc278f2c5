//! Stock reconciliation executor
//!
//! Order documents affect stock by resolving their line items against the
//! catalog, planning the effect with the pure planner, and executing the
//! plan inside the caller's transaction. Editing a document reverts the old
//! effect and applies the new one in the same transaction, so a failure
//! midway leaves stock untouched.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::sequence::{self, SEQ_PRODUCT};
use shared::models::{LedgerSource, LineItem, OrderKind, StockTrackingMode};
use shared::reconciliation::{
    plan_apply, plan_revert, LineWarning, ProductRef, ReconciliationPlan, Resolution, ResolvedLine,
};

/// Identity of the document whose effect is being applied or reverted
#[derive(Debug, Clone, Copy)]
pub struct DocumentRef<'a> {
    pub kind: OrderKind,
    pub id: Uuid,
    pub company_id: Uuid,
    pub number: &'a str,
    pub date: NaiveDate,
}

impl DocumentRef<'_> {
    fn source(&self) -> LedgerSource {
        match self.kind {
            OrderKind::PurchaseOrder => LedgerSource::PurchaseOrder,
            OrderKind::SalesInvoice => LedgerSource::SalesInvoice,
        }
    }
}

/// Result of a document mutation plus the lines that had no stock effect
#[derive(Debug, Serialize)]
pub struct DocumentOutcome<T> {
    pub document: T,
    pub warnings: Vec<LineWarning>,
}

/// A per-line snapshot written when a document's effect was applied
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LineSnapshot {
    pub id: Uuid,
    pub line_index: i32,
    pub category_name: String,
    pub product_name: String,
    pub product_uuid: Option<Uuid>,
    pub hsn_code: Option<String>,
    pub grade: Option<String>,
    pub model_number: Option<String>,
    pub finish_glaze: Option<String>,
    pub unit: Option<String>,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub sale_price: Option<Decimal>,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Fetch the line snapshots for a document, ordered by line index
pub async fn list_snapshots(
    db: &PgPool,
    source: LedgerSource,
    document_id: Uuid,
) -> AppResult<Vec<LineSnapshot>> {
    let rows = sqlx::query_as::<_, LineSnapshot>(
        r#"
        SELECT id, line_index, category_name, product_name, product_uuid,
               hsn_code, grade, model_number, finish_glaze, unit,
               quantity, rate, sale_price, total, created_at
        FROM order_line_snapshots
        WHERE source_type = $1 AND document_id = $2
        ORDER BY line_index
        "#,
    )
    .bind(source.as_str())
    .bind(document_id)
    .fetch_all(db)
    .await?;

    Ok(rows)
}

#[derive(Debug, sqlx::FromRow)]
struct ResolvedProductRow {
    id: Uuid,
    product_id: i64,
    name: String,
    sale_price: Option<Decimal>,
    tracking_mode: String,
}

impl ResolvedProductRow {
    fn to_ref(&self) -> ProductRef {
        ProductRef {
            id: self.id,
            numeric_id: self.product_id,
            name: self.name.clone(),
            sale_price: self.sale_price.unwrap_or(Decimal::ZERO),
        }
    }
}

/// Apply a document's stock effect.
///
/// Missing categories and products are created from the line item, existing
/// products get their supplied descriptive attributes refreshed. Returns the
/// warnings for lines that had no effect.
pub async fn apply_document(
    tx: &mut Transaction<'_, Postgres>,
    doc: &DocumentRef<'_>,
    items: &[LineItem],
) -> AppResult<Vec<LineWarning>> {
    let lines = resolve_lines(tx, doc.company_id, items, true).await?;
    let plan = plan_apply(doc.kind.direction(), &lines);

    execute_deltas(tx, doc.company_id, &plan).await?;
    insert_entries(tx, doc, &plan).await?;
    insert_snapshots(tx, doc, items, &lines).await?;

    Ok(plan.warnings)
}

/// Revert a document's stock effect.
///
/// Resolution is lookup-only; lines whose product no longer exists are
/// skipped with a warning. The document's ledger rows and line snapshots are
/// removed wholesale.
pub async fn revert_document(
    tx: &mut Transaction<'_, Postgres>,
    doc: &DocumentRef<'_>,
    items: &[LineItem],
) -> AppResult<Vec<LineWarning>> {
    let lines = resolve_lines(tx, doc.company_id, items, false).await?;
    let plan = plan_revert(doc.kind.direction(), &lines);

    execute_deltas(tx, doc.company_id, &plan).await?;

    sqlx::query("DELETE FROM stock_ledger WHERE source_type = $1 AND source_document_id = $2")
        .bind(doc.source().as_str())
        .bind(doc.id)
        .execute(&mut **tx)
        .await?;

    sqlx::query("DELETE FROM order_line_snapshots WHERE source_type = $1 AND document_id = $2")
        .bind(doc.source().as_str())
        .bind(doc.id)
        .execute(&mut **tx)
        .await?;

    Ok(plan.warnings)
}

/// Resolve line items to products, locking touched product rows
async fn resolve_lines(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    items: &[LineItem],
    create_missing: bool,
) -> AppResult<Vec<ResolvedLine>> {
    let mut lines = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let resolution = resolve_item(tx, company_id, item, create_missing).await?;
        lines.push(ResolvedLine {
            index,
            quantity: item.quantity,
            rate: item.rate,
            total: item.total,
            resolution,
        });
    }

    Ok(lines)
}

async fn resolve_item(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    item: &LineItem,
    create_missing: bool,
) -> AppResult<Resolution> {
    let category_name = item.category.trim();
    let product_name = item.product.trim();

    if category_name.is_empty() || product_name.is_empty() {
        return Ok(Resolution::Unresolved {
            reason: "Line is missing a product or category name".to_string(),
        });
    }

    let category_id = match find_category(tx, company_id, category_name).await? {
        Some(id) => id,
        None if create_missing => {
            sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO categories (company_id, name) VALUES ($1, $2) RETURNING id",
            )
            .bind(company_id)
            .bind(category_name)
            .fetch_one(&mut **tx)
            .await?
        }
        None => {
            return Ok(Resolution::Unresolved {
                reason: format!("Category '{}' not found", category_name),
            });
        }
    };

    let product = match find_product(tx, company_id, category_id, product_name).await? {
        Some(row) => {
            if create_missing {
                refresh_attributes(tx, row.id, item).await?;
            }
            row
        }
        None if create_missing => {
            create_product(tx, company_id, category_id, item, product_name).await?
        }
        None => {
            return Ok(Resolution::Unresolved {
                reason: format!(
                    "Product '{}' not found in category '{}'",
                    product_name, category_name
                ),
            });
        }
    };

    match StockTrackingMode::parse(&product.tracking_mode) {
        Some(StockTrackingMode::Untracked) => Ok(Resolution::Untracked(product.to_ref())),
        Some(StockTrackingMode::Bundle) => {
            let components = load_components(tx, company_id, product.id).await?;
            Ok(Resolution::Bundle {
                product: product.to_ref(),
                components,
            })
        }
        _ => Ok(Resolution::Tracked(product.to_ref())),
    }
}

async fn find_category(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    name: &str,
) -> AppResult<Option<Uuid>> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM categories WHERE company_id = $1 AND name = $2",
    )
    .bind(company_id)
    .bind(name)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(id)
}

async fn find_product(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    category_id: Uuid,
    name: &str,
) -> AppResult<Option<ResolvedProductRow>> {
    let row = sqlx::query_as::<_, ResolvedProductRow>(
        r#"
        SELECT id, product_id, name, sale_price, tracking_mode
        FROM products
        WHERE company_id = $1 AND category_id = $2 AND name = $3
        FOR UPDATE
        "#,
    )
    .bind(company_id)
    .bind(category_id)
    .bind(name)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row)
}

/// Non-destructive refresh: only supplied attributes overwrite.
///
/// Runs on every apply, including the re-apply inside a document edit, so
/// attributes carried on the edited lines land on the product again.
async fn refresh_attributes(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    item: &LineItem,
) -> AppResult<()> {
    let sale_price = (item.sale_price > Decimal::ZERO).then_some(item.sale_price);

    sqlx::query(
        r#"
        UPDATE products
        SET hsn_code = COALESCE($2, hsn_code),
            grade = COALESCE($3, grade),
            model_number = COALESCE($4, model_number),
            finish_glaze = COALESCE($5, finish_glaze),
            sale_price = COALESCE($6, sale_price),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(product_id)
    .bind(&item.hsn_code)
    .bind(&item.grade)
    .bind(&item.model_number)
    .bind(&item.finish_glaze)
    .bind(sale_price)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn create_product(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    category_id: Uuid,
    item: &LineItem,
    name: &str,
) -> AppResult<ResolvedProductRow> {
    let numeric_id = sequence::next_value(&mut **tx, company_id, SEQ_PRODUCT).await?;
    let sale_price = (item.sale_price > Decimal::ZERO).then_some(item.sale_price);

    let row = sqlx::query_as::<_, ResolvedProductRow>(
        r#"
        INSERT INTO products (
            product_id, company_id, category_id, name, hsn_code, grade,
            model_number, finish_glaze, sale_price, tracking_mode, stock_state
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'tracked', 'out_of_stock')
        RETURNING id, product_id, name, sale_price, tracking_mode
        "#,
    )
    .bind(numeric_id)
    .bind(company_id)
    .bind(category_id)
    .bind(name)
    .bind(&item.hsn_code)
    .bind(&item.grade)
    .bind(&item.model_number)
    .bind(&item.finish_glaze)
    .bind(sale_price)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row)
}

async fn load_components(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    bundle_product_id: Uuid,
) -> AppResult<Vec<ProductRef>> {
    let rows = sqlx::query_as::<_, ResolvedProductRow>(
        r#"
        SELECT p.id, p.product_id, p.name, p.sale_price, p.tracking_mode
        FROM bundle_items bi
        JOIN products p ON p.id = bi.component_product_id
        WHERE bi.company_id = $1 AND bi.bundle_product_id = $2
        ORDER BY bi.created_at
        FOR UPDATE OF p
        "#,
    )
    .bind(company_id)
    .bind(bundle_product_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows.iter().map(ResolvedProductRow::to_ref).collect())
}

/// Apply the plan's net deltas and recompute stock states
async fn execute_deltas(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    plan: &ReconciliationPlan,
) -> AppResult<()> {
    for (product_id, delta) in plan.merged_deltas() {
        if delta == Decimal::ZERO {
            continue;
        }

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $3,
                stock_state = CASE
                    WHEN stock_quantity + $3 > 0 THEN 'in_stock'
                    ELSE 'out_of_stock'
                END,
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            "#,
        )
        .bind(product_id)
        .bind(company_id)
        .bind(delta)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }
    }

    Ok(())
}

async fn insert_entries(
    tx: &mut Transaction<'_, Postgres>,
    doc: &DocumentRef<'_>,
    plan: &ReconciliationPlan,
) -> AppResult<()> {
    for entry in &plan.entries {
        sqlx::query(
            r#"
            INSERT INTO stock_ledger (
                company_id, product_id, product_numeric_id, product_name,
                direction, quantity, unit_price, total, source_type,
                source_document_id, source_line_index, reference, entry_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(doc.company_id)
        .bind(entry.product_id)
        .bind(entry.product_numeric_id)
        .bind(&entry.product_name)
        .bind(entry.direction.as_str())
        .bind(entry.quantity)
        .bind(entry.unit_price)
        .bind(entry.total)
        .bind(doc.source().as_str())
        .bind(doc.id)
        .bind(entry.line_index)
        .bind(doc.number)
        .bind(doc.date)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Per-line snapshots for reporting; removed again on revert
async fn insert_snapshots(
    tx: &mut Transaction<'_, Postgres>,
    doc: &DocumentRef<'_>,
    items: &[LineItem],
    lines: &[ResolvedLine],
) -> AppResult<()> {
    for (item, line) in items.iter().zip(lines) {
        let product_uuid = match &line.resolution {
            Resolution::Tracked(p) | Resolution::Untracked(p) => Some(p.id),
            Resolution::Bundle { product, .. } => Some(product.id),
            Resolution::Unresolved { .. } => None,
        };

        sqlx::query(
            r#"
            INSERT INTO order_line_snapshots (
                company_id, source_type, document_id, line_index, category_name,
                product_name, product_uuid, hsn_code, grade, model_number,
                finish_glaze, unit, quantity, rate, sale_price, total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16)
            "#,
        )
        .bind(doc.company_id)
        .bind(doc.source().as_str())
        .bind(doc.id)
        .bind(line.index as i32)
        .bind(item.category.trim())
        .bind(item.product.trim())
        .bind(product_uuid)
        .bind(&item.hsn_code)
        .bind(&item.grade)
        .bind(&item.model_number)
        .bind(&item.finish_glaze)
        .bind(&item.unit)
        .bind(item.quantity)
        .bind(item.rate)
        .bind((item.sale_price > Decimal::ZERO).then_some(item.sale_price))
        .bind(item.total)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}
