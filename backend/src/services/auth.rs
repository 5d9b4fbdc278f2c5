//! Authentication service for user registration, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::Claims;
use crate::middleware::AuthUser;
use shared::models::{PermissionSet, Role};
use shared::validation;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

/// Input for registering a new user account
#[derive(Debug, Deserialize)]
pub struct RegisterUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    /// Required unless the new user is a super admin
    pub company_id: Option<Uuid>,
    #[serde(default)]
    pub permissions: PermissionSet,
}

/// Response after successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub company_id: Option<Uuid>,
    pub role: Role,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User info from database
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    company_id: Option<Uuid>,
    password_hash: String,
    role: String,
    permissions: serde_json::Value,
    active: bool,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
        }
    }

    /// Register a new user account
    ///
    /// Super admins may create users for any company; admins only within
    /// their own company, and only non-super-admin roles. Regular users
    /// cannot register accounts at all.
    pub async fn register(
        &self,
        current_user: &AuthUser,
        input: RegisterUserInput,
    ) -> AppResult<RegisterResponse> {
        validation::validate_email(&input.email).map_err(|msg| AppError::Validation {
            field: "email".to_string(),
            message: msg.to_string(),
        })?;
        validation::validate_password(&input.password).map_err(|msg| AppError::Validation {
            field: "password".to_string(),
            message: msg.to_string(),
        })?;
        validation::validate_name(&input.name).map_err(|msg| AppError::Validation {
            field: "name".to_string(),
            message: msg.to_string(),
        })?;

        let company_id = registration_company(current_user, input.role, input.company_id)?;

        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(&input.email)
            .fetch_one(&self.db)
            .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let permissions = serde_json::to_value(&input.permissions)
            .map_err(|e| AppError::Internal(format!("Permission encoding failed: {}", e)))?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (company_id, email, password_hash, name, role, permissions)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&input.name)
        .bind(input.role.as_str())
        .bind(&permissions)
        .fetch_one(&self.db)
        .await?;

        Ok(RegisterResponse {
            user_id,
            company_id,
            role: input.role,
        })
    }

    /// Authenticate user with email and password
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthTokens> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, company_id, password_hash, role, permissions, active
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !user.active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let tokens = self.generate_tokens(&user)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        Ok(tokens)
    }

    /// Refresh access token using refresh token
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthTokens> {
        let token_hash = Self::hash_token(refresh_token);

        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT u.id, u.company_id, u.password_hash, u.role, u.permissions, u.active
            FROM refresh_tokens rt
            JOIN users u ON u.id = rt.user_id
            WHERE rt.token_hash = $1
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.active = true
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

        // Rotate: revoke the presented token before issuing a new one
        sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&self.db)
            .await?;

        let tokens = self.generate_tokens(&user)?;
        self.store_refresh_token(user.id, &tokens.refresh_token).await?;

        Ok(tokens)
    }

    /// Generate access and refresh tokens
    fn generate_tokens(&self, user: &UserRow) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let access_exp = now + Duration::seconds(self.access_token_expiry);

        let permission_set: PermissionSet =
            serde_json::from_value(user.permissions.clone()).unwrap_or_default();

        let access_claims = Claims {
            sub: user.id.to_string(),
            company_id: user.company_id.map(|id| id.to_string()),
            role: user.role.clone(),
            permissions: permission_set.to_claims(),
            exp: access_exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &access_claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        // Refresh token (simple random token)
        let refresh_token = Uuid::new_v4().to_string();

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Validate access token and return claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Store refresh token in database
    async fn store_refresh_token(&self, user_id: Uuid, token: &str) -> AppResult<()> {
        let token_hash = Self::hash_token(token);
        let expires_at = Utc::now() + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(&token_hash)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Hash a token for storage
    fn hash_token(token: &str) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }
}

/// Company the new account lands in, gated by the caller's role.
///
/// Only super admins and admins may register users; admins are pinned to
/// their own company and cannot mint super admins.
fn registration_company(
    current_user: &AuthUser,
    role: Role,
    requested_company: Option<Uuid>,
) -> AppResult<Option<Uuid>> {
    match (current_user.is_super_admin(), role) {
        (true, Role::SuperAdmin) => Ok(None),
        (true, _) => Ok(Some(requested_company.ok_or_else(|| AppError::Validation {
            field: "company_id".to_string(),
            message: "A company is required for this role".to_string(),
        })?)),
        (false, _) if current_user.role != Role::Admin => Err(AppError::InsufficientPermissions),
        (false, Role::SuperAdmin) => Err(AppError::InsufficientPermissions),
        (false, _) => Ok(current_user.company_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(role: Role, company_id: Option<Uuid>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            company_id,
            role,
            permissions: Vec::new(),
        }
    }

    #[test]
    fn test_hash_token_is_deterministic() {
        let a = AuthService::hash_token("refresh-token");
        let b = AuthService::hash_token("refresh-token");
        assert_eq!(a, b);
        assert_ne!(a, AuthService::hash_token("other-token"));
    }

    #[test]
    fn test_regular_users_cannot_register_accounts() {
        let company = Uuid::new_v4();
        let user = caller(Role::User, Some(company));

        for role in [Role::User, Role::Admin, Role::SuperAdmin] {
            assert!(matches!(
                registration_company(&user, role, Some(company)),
                Err(AppError::InsufficientPermissions)
            ));
        }
    }

    #[test]
    fn test_admins_register_within_their_own_company() {
        let company = Uuid::new_v4();
        let other = Uuid::new_v4();
        let admin = caller(Role::Admin, Some(company));

        // A requested company is ignored; the caller's own wins
        let scoped = registration_company(&admin, Role::User, Some(other)).unwrap();
        assert_eq!(scoped, Some(company));

        assert!(matches!(
            registration_company(&admin, Role::SuperAdmin, None),
            Err(AppError::InsufficientPermissions)
        ));
    }

    #[test]
    fn test_super_admin_targets_any_company() {
        let company = Uuid::new_v4();
        let root = caller(Role::SuperAdmin, None);

        let scoped = registration_company(&root, Role::Admin, Some(company)).unwrap();
        assert_eq!(scoped, Some(company));

        assert_eq!(registration_company(&root, Role::SuperAdmin, None).unwrap(), None);

        assert!(matches!(
            registration_company(&root, Role::User, None),
            Err(AppError::Validation { .. })
        ));
    }
}
