//! Per-tenant sequence allocation
//!
//! Human-facing numeric ids (product numbers, order numbers) come from named
//! per-company counters. Allocation is a single atomic upsert, safe under
//! concurrent writers.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::error::AppResult;

pub const SEQ_PRODUCT: &str = "product";
pub const SEQ_PURCHASE_ORDER: &str = "purchase_order";
pub const SEQ_SALES_INVOICE: &str = "sales_invoice";

/// Allocate the next value of a named per-company sequence
pub async fn next_value<'e, E>(executor: E, company_id: Uuid, name: &str) -> AppResult<i64>
where
    E: PgExecutor<'e>,
{
    let value = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO sequences (company_id, name, value)
        VALUES ($1, $2, 1)
        ON CONFLICT (company_id, name)
        DO UPDATE SET value = sequences.value + 1
        RETURNING value
        "#,
    )
    .bind(company_id)
    .bind(name)
    .fetch_one(executor)
    .await?;

    Ok(value)
}
