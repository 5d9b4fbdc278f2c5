//! Category management service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::Category;
use shared::types::{ListResult, PaginatedResponse, Pagination, PaginationMeta};
use shared::validation;

/// Category management service
#[derive(Clone)]
pub struct CategoryService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryInput {
    pub name: String,
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            company_id: row.company_id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl CategoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, company_id: Uuid, input: CreateCategoryInput) -> AppResult<Category> {
        validation::validate_name(&input.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;

        let existing = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM categories WHERE company_id = $1 AND name = $2",
        )
        .bind(company_id)
        .bind(input.name.trim())
        .fetch_one(&self.db)
        .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry("category".to_string()));
        }

        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            INSERT INTO categories (company_id, name)
            VALUES ($1, $2)
            RETURNING id, company_id, name, created_at, updated_at
            "#,
        )
        .bind(company_id)
        .bind(input.name.trim())
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    pub async fn get(&self, company_id: Option<Uuid>, category_id: Uuid) -> AppResult<Category> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            SELECT id, company_id, name, created_at, updated_at
            FROM categories
            WHERE id = $1 AND ($2::uuid IS NULL OR company_id = $2)
            "#,
        )
        .bind(category_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))?;

        Ok(row.into())
    }

    pub async fn list(
        &self,
        company_id: Option<Uuid>,
        search: Option<&str>,
        pagination: Option<Pagination>,
    ) -> AppResult<ListResult<Category>> {
        let pattern = search.map(|s| format!("%{}%", s));

        match pagination {
            Some(page) => {
                let total = sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT COUNT(*) FROM categories
                    WHERE ($1::uuid IS NULL OR company_id = $1)
                      AND ($2::text IS NULL OR name ILIKE $2)
                    "#,
                )
                .bind(company_id)
                .bind(&pattern)
                .fetch_one(&self.db)
                .await?;

                let rows = sqlx::query_as::<_, CategoryRow>(
                    r#"
                    SELECT id, company_id, name, created_at, updated_at
                    FROM categories
                    WHERE ($1::uuid IS NULL OR company_id = $1)
                      AND ($2::text IS NULL OR name ILIKE $2)
                    ORDER BY created_at DESC
                    LIMIT $3 OFFSET $4
                    "#,
                )
                .bind(company_id)
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
                let rows = sqlx::query_as::<_, CategoryRow>(
                    r#"
                    SELECT id, company_id, name, created_at, updated_at
                    FROM categories
                    WHERE ($1::uuid IS NULL OR company_id = $1)
                      AND ($2::text IS NULL OR name ILIKE $2)
                    ORDER BY created_at DESC
                    "#,
                )
                .bind(company_id)
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
        category_id: Uuid,
        input: CreateCategoryInput,
    ) -> AppResult<Category> {
        validation::validate_name(&input.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;

        let row = sqlx::query_as::<_, CategoryRow>(
            r#"
            UPDATE categories
            SET name = $3, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING id, company_id, name, created_at, updated_at
            "#,
        )
        .bind(category_id)
        .bind(company_id)
        .bind(input.name.trim())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Category".to_string()))?;

        Ok(row.into())
    }

    /// Delete a category.
    ///
    /// With dependents the delete fails with a conflict unless `force`, in
    /// which case products and their ledger entries cascade away.
    pub async fn delete(&self, company_id: Uuid, category_id: Uuid, force: bool) -> AppResult<()> {
        let product_count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM products WHERE company_id = $1 AND category_id = $2",
        )
        .bind(company_id)
        .bind(category_id)
        .fetch_one(&self.db)
        .await?;

        if product_count > 0 && !force {
            return Err(AppError::Conflict {
                code: "CATEGORY_IN_USE".to_string(),
                message: format!("Category has {} products", product_count),
            });
        }

        let mut tx = self.db.begin().await?;

        if force {
            // Products cascade their ledger entries and bundle rows via FKs
            sqlx::query("DELETE FROM products WHERE company_id = $1 AND category_id = $2")
                .bind(company_id)
                .bind(category_id)
                .execute(&mut *tx)
                .await?;
        }

        let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND company_id = $2")
            .bind(category_id)
            .bind(company_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category".to_string()));
        }

        tx.commit().await?;

        Ok(())
    }
}
