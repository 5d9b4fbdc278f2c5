//! Authentication middleware
//!
//! JWT authentication and permission checks

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use shared::models::Role;

use crate::error::{AppError, ErrorResponse};

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
    /// Absent for super admins
    pub company_id: Option<uuid::Uuid>,
    pub role: Role,
    /// Flattened "module:action" permission claims
    pub permissions: Vec<String>,
}

impl AuthUser {
    pub fn is_super_admin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Check if user has a specific permission; super admins bypass checks
    pub fn has_permission(&self, module: &str, action: &str) -> bool {
        if self.is_super_admin() {
            return true;
        }
        let permission = format!("{}:{}", module, action);
        self.permissions.contains(&permission)
    }
}

/// Authentication middleware that validates JWT tokens
/// Note: The token is validated inline against the secret resolved from the
/// environment to avoid a state dependency in the middleware layer.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    // Extract Authorization header
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => {
            return unauthorized_response("Missing or invalid Authorization header");
        }
    };

    // Get JWT secret from environment (fallback for middleware without state)
    let jwt_secret = std::env::var("ERP__JWT__SECRET")
        .or_else(|_| std::env::var("ERP_JWT_SECRET"))
        .unwrap_or_else(|_| "development-secret-key".to_string());

    let claims = match decode_jwt(token, &jwt_secret) {
        Ok(claims) => claims,
        Err(msg) => {
            return unauthorized_response(&msg);
        }
    };

    let user_id = match uuid::Uuid::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return unauthorized_response("Invalid user ID in token"),
    };

    let company_id = match &claims.company_id {
        Some(raw) => match uuid::Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => return unauthorized_response("Invalid company ID in token"),
        },
        None => None,
    };

    let role = match Role::parse(&claims.role) {
        Some(role) => role,
        None => return unauthorized_response("Invalid role in token"),
    };

    let auth_user = AuthUser {
        user_id,
        company_id,
        role,
        permissions: claims.permissions,
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub(crate) struct Claims {
    pub sub: String,
    pub company_id: Option<String>,
    pub role: String,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Decode and validate JWT token
fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

/// Create unauthorized response
fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: crate::error::ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: crate::error::ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message: "Authentication required".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

/// Permission guard for use in handlers
/// Returns an error if the user doesn't have the required permission
pub fn check_permission(user: &AuthUser, module: &str, action: &str) -> Result<(), AppError> {
    if user.has_permission(module, action) {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, permissions: Vec<&str>) -> AuthUser {
        AuthUser {
            user_id: uuid::Uuid::new_v4(),
            company_id: (role != Role::SuperAdmin).then(uuid::Uuid::new_v4),
            role,
            permissions: permissions.into_iter().map(String::from).collect(),
        }
    }

    #[test]
    fn test_super_admin_bypasses_permission_checks() {
        let admin = user(Role::SuperAdmin, vec![]);
        assert!(admin.has_permission("products", "delete"));
        assert!(check_permission(&admin, "stock", "add").is_ok());
    }

    #[test]
    fn test_regular_user_requires_exact_permission() {
        let u = user(Role::User, vec!["products:view", "stock:add"]);
        assert!(u.has_permission("products", "view"));
        assert!(u.has_permission("stock", "add"));
        assert!(!u.has_permission("products", "delete"));
        assert!(check_permission(&u, "products", "delete").is_err());
    }
}
