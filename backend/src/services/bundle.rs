//! Bundle membership service
//!
//! A bundle product carries a multiset of component products. Reconciliation
//! fans order lines for the bundle out to the components.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{BundleItem, StockTrackingMode};

/// Bundle membership service
#[derive(Clone)]
pub struct BundleService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct AddBundleItemsInput {
    pub component_product_ids: Vec<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
struct BundleItemRow {
    id: Uuid,
    company_id: Uuid,
    bundle_product_id: Uuid,
    component_product_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<BundleItemRow> for BundleItem {
    fn from(row: BundleItemRow) -> Self {
        BundleItem {
            id: row.id,
            company_id: row.company_id,
            bundle_product_id: row.bundle_product_id,
            component_product_id: row.component_product_id,
            created_at: row.created_at,
        }
    }
}

impl BundleService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Resolve the bundle product, checking it exists and is a bundle
    async fn require_bundle(&self, company_id: Uuid, bundle_product_id: Uuid) -> AppResult<()> {
        let mode = sqlx::query_scalar::<_, String>(
            "SELECT tracking_mode FROM products WHERE id = $1 AND company_id = $2",
        )
        .bind(bundle_product_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))?;

        if StockTrackingMode::parse(&mode) != Some(StockTrackingMode::Bundle) {
            return Err(AppError::ValidationError(
                "Product is not a bundle".to_string(),
            ));
        }

        Ok(())
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        bundle_product_id: Uuid,
    ) -> AppResult<Vec<BundleItem>> {
        self.require_bundle(company_id, bundle_product_id).await?;

        let rows = sqlx::query_as::<_, BundleItemRow>(
            r#"
            SELECT id, company_id, bundle_product_id, component_product_id, created_at
            FROM bundle_items
            WHERE company_id = $1 AND bundle_product_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(company_id)
        .bind(bundle_product_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add components to a bundle; already-present components are skipped
    pub async fn add(
        &self,
        company_id: Uuid,
        bundle_product_id: Uuid,
        input: AddBundleItemsInput,
    ) -> AppResult<Vec<BundleItem>> {
        self.require_bundle(company_id, bundle_product_id).await?;

        let mut tx = self.db.begin().await?;
        let mut added = Vec::new();

        for component_id in input.component_product_ids {
            if component_id == bundle_product_id {
                return Err(AppError::ValidationError(
                    "A bundle cannot contain itself".to_string(),
                ));
            }

            let component_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM products WHERE id = $1 AND company_id = $2)",
            )
            .bind(component_id)
            .bind(company_id)
            .fetch_one(&mut *tx)
            .await?;

            if !component_exists {
                return Err(AppError::NotFound("Product".to_string()));
            }

            let already_present = sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS(
                    SELECT 1 FROM bundle_items
                    WHERE company_id = $1 AND bundle_product_id = $2 AND component_product_id = $3
                )
                "#,
            )
            .bind(company_id)
            .bind(bundle_product_id)
            .bind(component_id)
            .fetch_one(&mut *tx)
            .await?;

            if already_present {
                continue;
            }

            let row = sqlx::query_as::<_, BundleItemRow>(
                r#"
                INSERT INTO bundle_items (company_id, bundle_product_id, component_product_id)
                VALUES ($1, $2, $3)
                RETURNING id, company_id, bundle_product_id, component_product_id, created_at
                "#,
            )
            .bind(company_id)
            .bind(bundle_product_id)
            .bind(component_id)
            .fetch_one(&mut *tx)
            .await?;

            added.push(row.into());
        }

        tx.commit().await?;

        Ok(added)
    }

    pub async fn remove(
        &self,
        company_id: Uuid,
        bundle_product_id: Uuid,
        item_id: Uuid,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM bundle_items WHERE id = $1 AND company_id = $2 AND bundle_product_id = $3",
        )
        .bind(item_id)
        .bind(company_id)
        .bind(bundle_product_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Bundle item".to_string()));
        }

        Ok(())
    }
}
