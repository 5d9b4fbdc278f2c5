//! Company (tenant) management service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{Company, CreateCompanyInput};
use shared::validation;

/// Company management service
#[derive(Clone)]
pub struct CompanyService {
    db: PgPool,
}

/// Input for updating a company; absent fields are left unchanged
#[derive(Debug, Deserialize)]
pub struct UpdateCompanyInput {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub gstin: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    name: String,
    contact_person: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    gstin: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Company {
            id: row.id,
            name: row.name,
            contact_person: row.contact_person,
            phone: row.phone,
            email: row.email,
            address: row.address,
            gstin: row.gstin,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COMPANY_COLUMNS: &str =
    "id, name, contact_person, phone, email, address, gstin, active, created_at, updated_at";

impl CompanyService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateCompanyInput) -> AppResult<Company> {
        validation::validate_name(&input.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;
        if let Some(gstin) = &input.gstin {
            validation::validate_gstin(gstin).map_err(|msg| AppError::Validation {
                field: "gstin".to_string(),
                message: msg.to_string(),
            })?;
        }

        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            r#"
            INSERT INTO companies (name, contact_person, phone, email, address, gstin)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            COMPANY_COLUMNS
        ))
        .bind(&input.name)
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.gstin)
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }

    pub async fn get(&self, company_id: Uuid) -> AppResult<Company> {
        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {} FROM companies WHERE id = $1",
            COMPANY_COLUMNS
        ))
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Company".to_string()))?;

        Ok(row.into())
    }

    pub async fn list(&self) -> AppResult<Vec<Company>> {
        let rows = sqlx::query_as::<_, CompanyRow>(&format!(
            "SELECT {} FROM companies ORDER BY created_at DESC",
            COMPANY_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn update(&self, company_id: Uuid, input: UpdateCompanyInput) -> AppResult<Company> {
        if let Some(gstin) = &input.gstin {
            validation::validate_gstin(gstin).map_err(|msg| AppError::Validation {
                field: "gstin".to_string(),
                message: msg.to_string(),
            })?;
        }

        let row = sqlx::query_as::<_, CompanyRow>(&format!(
            r#"
            UPDATE companies
            SET name = COALESCE($2, name),
                contact_person = COALESCE($3, contact_person),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                address = COALESCE($6, address),
                gstin = COALESCE($7, gstin),
                active = COALESCE($8, active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            COMPANY_COLUMNS
        ))
        .bind(company_id)
        .bind(&input.name)
        .bind(&input.contact_person)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(&input.gstin)
        .bind(input.active)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Company".to_string()))?;

        Ok(row.into())
    }

    pub async fn delete(&self, company_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(company_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Company".to_string()));
        }

        Ok(())
    }
}
