//! HTTP handlers for company management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::{check_permission, CurrentUser};
use crate::services::company::UpdateCompanyInput;
use crate::services::CompanyService;
use crate::AppState;
use shared::models::{Company, CreateCompanyInput};

/// Create a company. Super admin only.
pub async fn create_company(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateCompanyInput>,
) -> AppResult<(StatusCode, Json<Company>)> {
    if !current_user.0.is_super_admin() {
        return Err(AppError::InsufficientPermissions);
    }
    let service = CompanyService::new(state.db);
    let company = service.create(input).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

/// List companies. Super admins see all, others only their own.
pub async fn list_companies(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Company>>> {
    check_permission(&current_user.0, "companies", "view")?;
    let service = CompanyService::new(state.db);

    if current_user.0.is_super_admin() {
        return Ok(Json(service.list().await?));
    }

    let company_id = current_user
        .0
        .company_id
        .ok_or(AppError::InsufficientPermissions)?;
    Ok(Json(vec![service.get(company_id).await?]))
}

/// Get a company by id
pub async fn get_company(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(company_id): Path<Uuid>,
) -> AppResult<Json<Company>> {
    check_permission(&current_user.0, "companies", "view")?;
    if !current_user.0.is_super_admin() && current_user.0.company_id != Some(company_id) {
        return Err(AppError::InsufficientPermissions);
    }
    let service = CompanyService::new(state.db);
    let company = service.get(company_id).await?;
    Ok(Json(company))
}

/// Update a company. Super admin only.
pub async fn update_company(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(company_id): Path<Uuid>,
    Json(input): Json<UpdateCompanyInput>,
) -> AppResult<Json<Company>> {
    if !current_user.0.is_super_admin() {
        return Err(AppError::InsufficientPermissions);
    }
    let service = CompanyService::new(state.db);
    let company = service.update(company_id, input).await?;
    Ok(Json(company))
}

/// Delete a company. Super admin only.
pub async fn delete_company(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(company_id): Path<Uuid>,
) -> AppResult<Json<()>> {
    if !current_user.0.is_super_admin() {
        return Err(AppError::InsufficientPermissions);
    }
    let service = CompanyService::new(state.db);
    service.delete(company_id).await?;
    Ok(Json(()))
}
