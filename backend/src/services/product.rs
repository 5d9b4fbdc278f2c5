//! Product management service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::sequence::{self, SEQ_PRODUCT};
use shared::models::{Product, StockDirection, StockState, StockTrackingMode};
use shared::types::{ListResult, PaginatedResponse, Pagination, PaginationMeta};
use shared::validation;

/// Product management service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductInput {
    pub category_id: Uuid,
    pub name: String,
    pub hsn_code: Option<String>,
    pub grade: Option<String>,
    pub model_number: Option<String>,
    pub design_name: Option<String>,
    pub finish_glaze: Option<String>,
    pub sale_price: Option<Decimal>,
    #[serde(default = "default_tracking_mode")]
    pub tracking_mode: StockTrackingMode,
    /// When positive on a tracked product, an opening-stock ledger entry is
    /// written alongside the product
    pub opening_stock: Option<Decimal>,
}

fn default_tracking_mode() -> StockTrackingMode {
    StockTrackingMode::Tracked
}

/// Input for updating a product; absent fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateProductInput {
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub hsn_code: Option<String>,
    pub grade: Option<String>,
    pub model_number: Option<String>,
    pub design_name: Option<String>,
    pub finish_glaze: Option<String>,
    pub sale_price: Option<Decimal>,
    pub tracking_mode: Option<StockTrackingMode>,
}

/// Filters for listing products
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    /// Free text matched against name, HSN code, model number, design name
    /// and category name
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    pub id: Uuid,
    pub product_id: i64,
    pub company_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub hsn_code: Option<String>,
    pub grade: Option<String>,
    pub model_number: Option<String>,
    pub design_name: Option<String>,
    pub finish_glaze: Option<String>,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: Decimal,
    pub tracking_mode: String,
    pub stock_state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    pub fn tracking_mode(&self) -> StockTrackingMode {
        StockTrackingMode::parse(&self.tracking_mode).unwrap_or(StockTrackingMode::Tracked)
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let tracking_mode = row.tracking_mode();
        Product {
            id: row.id,
            product_id: row.product_id,
            company_id: row.company_id,
            category_id: row.category_id,
            name: row.name,
            hsn_code: row.hsn_code,
            grade: row.grade,
            model_number: row.model_number,
            design_name: row.design_name,
            finish_glaze: row.finish_glaze,
            sale_price: row.sale_price,
            stock_quantity: row.stock_quantity,
            tracking_mode,
            stock_state: StockState::from_quantity(row.stock_quantity),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

pub(crate) const PRODUCT_COLUMNS: &str = "id, product_id, company_id, category_id, name, \
     hsn_code, grade, model_number, design_name, finish_glaze, sale_price, \
     stock_quantity, tracking_mode, stock_state, created_at, updated_at";

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, company_id: Uuid, input: CreateProductInput) -> AppResult<Product> {
        validation::validate_name(&input.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;

        let category_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1 AND company_id = $2)",
        )
        .bind(input.category_id)
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        if !category_exists {
            return Err(AppError::NotFound("Category".to_string()));
        }

        let opening_stock = input.opening_stock.unwrap_or(Decimal::ZERO);
        if opening_stock < Decimal::ZERO {
            return Err(AppError::InvalidQuantity);
        }
        let stocked =
            opening_stock > Decimal::ZERO && input.tracking_mode == StockTrackingMode::Tracked;
        let initial_quantity = if stocked { opening_stock } else { Decimal::ZERO };

        let mut tx = self.db.begin().await?;

        let numeric_id = sequence::next_value(&mut *tx, company_id, SEQ_PRODUCT).await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            INSERT INTO products (
                product_id, company_id, category_id, name, hsn_code, grade,
                model_number, design_name, finish_glaze, sale_price,
                stock_quantity, tracking_mode, stock_state
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(numeric_id)
        .bind(company_id)
        .bind(input.category_id)
        .bind(input.name.trim())
        .bind(&input.hsn_code)
        .bind(&input.grade)
        .bind(&input.model_number)
        .bind(&input.design_name)
        .bind(&input.finish_glaze)
        .bind(input.sale_price)
        .bind(initial_quantity)
        .bind(input.tracking_mode.as_str())
        .bind(StockState::from_quantity(initial_quantity).as_str())
        .fetch_one(&mut *tx)
        .await?;

        if stocked {
            sqlx::query(
                r#"
                INSERT INTO stock_ledger (
                    company_id, product_id, product_numeric_id, product_name,
                    direction, quantity, unit_price, total, source_type,
                    reference, entry_date
                )
                VALUES ($1, $2, $3, $4, $5, $6, 0, 0, 'manual', 'OPENING_STOCK', CURRENT_DATE)
                "#,
            )
            .bind(company_id)
            .bind(row.id)
            .bind(row.product_id)
            .bind(&row.name)
            .bind(StockDirection::In.as_str())
            .bind(opening_stock)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(row.into())
    }

    pub async fn get(&self, company_id: Option<Uuid>, product_id: Uuid) -> AppResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {} FROM products
            WHERE id = $1 AND ($2::uuid IS NULL OR company_id = $2)
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(row.into())
    }

    pub async fn list(
        &self,
        company_id: Option<Uuid>,
        filter: ProductFilter,
        pagination: Option<Pagination>,
    ) -> AppResult<ListResult<Product>> {
        let pattern = filter.search.as_deref().map(|s| format!("%{}%", s));

        let where_clause = r#"
            FROM products p
            JOIN categories c ON c.id = p.category_id
            WHERE ($1::uuid IS NULL OR p.company_id = $1)
              AND ($2::uuid IS NULL OR p.category_id = $2)
              AND ($3::text IS NULL
                   OR p.name ILIKE $3
                   OR p.hsn_code ILIKE $3
                   OR p.model_number ILIKE $3
                   OR p.design_name ILIKE $3
                   OR c.name ILIKE $3)
        "#;

        let select = format!(
            "SELECT p.id, p.product_id, p.company_id, p.category_id, p.name, \
             p.hsn_code, p.grade, p.model_number, p.design_name, p.finish_glaze, \
             p.sale_price, p.stock_quantity, p.tracking_mode, p.stock_state, \
             p.created_at, p.updated_at {} ORDER BY p.created_at DESC",
            where_clause
        );

        match pagination {
            Some(page) => {
                let total =
                    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) {}", where_clause))
                        .bind(company_id)
                        .bind(filter.category_id)
                        .bind(&pattern)
                        .fetch_one(&self.db)
                        .await?;

                let rows = sqlx::query_as::<_, ProductRow>(&format!(
                    "{} LIMIT $4 OFFSET $5",
                    select
                ))
                .bind(company_id)
                .bind(filter.category_id)
                .bind(&pattern)
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
                let rows = sqlx::query_as::<_, ProductRow>(&select)
                    .bind(company_id)
                    .bind(filter.category_id)
                    .bind(&pattern)
                    .fetch_all(&self.db)
                    .await?;

                Ok(ListResult::All(rows.into_iter().map(Into::into).collect()))
            }
        }
    }

    pub async fn update(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> AppResult<Product> {
        if let Some(category_id) = input.category_id {
            let category_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1 AND company_id = $2)",
            )
            .bind(category_id)
            .bind(company_id)
            .fetch_one(&self.db)
            .await?;

            if !category_exists {
                return Err(AppError::NotFound("Category".to_string()));
            }
        }

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            UPDATE products
            SET category_id = COALESCE($3, category_id),
                name = COALESCE($4, name),
                hsn_code = COALESCE($5, hsn_code),
                grade = COALESCE($6, grade),
                model_number = COALESCE($7, model_number),
                design_name = COALESCE($8, design_name),
                finish_glaze = COALESCE($9, finish_glaze),
                sale_price = COALESCE($10, sale_price),
                tracking_mode = COALESCE($11, tracking_mode),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(company_id)
        .bind(input.category_id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.hsn_code)
        .bind(&input.grade)
        .bind(&input.model_number)
        .bind(&input.design_name)
        .bind(&input.finish_glaze)
        .bind(input.sale_price)
        .bind(input.tracking_mode.map(|m| m.as_str()))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        Ok(row.into())
    }

    /// Delete a product.
    ///
    /// When ledger entries reference it the delete fails with `STOCK_EXISTS`
    /// unless `force`, in which case the entries cascade away.
    pub async fn delete(&self, company_id: Uuid, product_id: Uuid, force: bool) -> AppResult<()> {
        let entry_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM stock_ledger WHERE company_id = $1 AND product_id = $2",
        )
        .bind(company_id)
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        if entry_count > 0 && !force {
            return Err(AppError::Conflict {
                code: "STOCK_EXISTS".to_string(),
                message: format!("Product has {} stock ledger entries", entry_count),
            });
        }

        let result = sqlx::query("DELETE FROM products WHERE id = $1 AND company_id = $2")
            .bind(product_id)
            .bind(company_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".to_string()));
        }

        Ok(())
    }
}
