//! Tenant scoping helpers
//!
//! Every query filters by company explicitly. Super admins may target any
//! company (or all companies for reads); everyone else is pinned to their
//! own.

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Resolve the company filter for a read.
///
/// Super admins get the requested company, or `None` meaning all tenants.
/// Other users always get their own company; a mismatched request is an
/// error rather than silently widened.
pub fn read_scope(user: &AuthUser, requested: Option<Uuid>) -> AppResult<Option<Uuid>> {
    if user.is_super_admin() {
        return Ok(requested);
    }
    let own = user
        .company_id
        .ok_or_else(|| AppError::Unauthorized("User has no company".to_string()))?;
    match requested {
        Some(req) if req != own => Err(AppError::InsufficientPermissions),
        _ => Ok(Some(own)),
    }
}

/// Resolve the company a write targets.
///
/// Super admins must name a company; other users write to their own.
pub fn write_scope(user: &AuthUser, requested: Option<Uuid>) -> AppResult<Uuid> {
    if user.is_super_admin() {
        return requested.ok_or_else(|| AppError::Validation {
            field: "company_id".to_string(),
            message: "A company is required".to_string(),
        });
    }
    let own = user
        .company_id
        .ok_or_else(|| AppError::Unauthorized("User has no company".to_string()))?;
    match requested {
        Some(req) if req != own => Err(AppError::InsufficientPermissions),
        _ => Ok(own),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::Role;

    fn super_admin() -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            company_id: None,
            role: Role::SuperAdmin,
            permissions: vec![],
        }
    }

    fn member(company: Uuid) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            company_id: Some(company),
            role: Role::Admin,
            permissions: vec![],
        }
    }

    #[test]
    fn test_super_admin_read_scope() {
        let company = Uuid::new_v4();
        assert_eq!(read_scope(&super_admin(), None).unwrap(), None);
        assert_eq!(
            read_scope(&super_admin(), Some(company)).unwrap(),
            Some(company)
        );
    }

    #[test]
    fn test_member_read_scope_is_pinned() {
        let company = Uuid::new_v4();
        let user = member(company);
        assert_eq!(read_scope(&user, None).unwrap(), Some(company));
        assert_eq!(read_scope(&user, Some(company)).unwrap(), Some(company));
        assert!(read_scope(&user, Some(Uuid::new_v4())).is_err());
    }

    #[test]
    fn test_super_admin_write_requires_company() {
        let company = Uuid::new_v4();
        assert!(write_scope(&super_admin(), None).is_err());
        assert_eq!(write_scope(&super_admin(), Some(company)).unwrap(), company);
    }

    #[test]
    fn test_member_write_scope_is_pinned() {
        let company = Uuid::new_v4();
        let user = member(company);
        assert_eq!(write_scope(&user, None).unwrap(), company);
        assert!(write_scope(&user, Some(Uuid::new_v4())).is_err());
    }
}
