//! User, role and permission models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// A user account on the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Absent for super admins, who are not bound to a tenant
    pub company_id: Option<Uuid>,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User roles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SUPER_ADMIN" => Some(Role::SuperAdmin),
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            _ => None,
        }
    }
}

/// Modules that permissions are granted over
pub const PERMISSION_MODULES: &[&str] = &[
    "companies",
    "users",
    "categories",
    "products",
    "purchase_orders",
    "sales_invoices",
    "stock",
];

/// Actions that can be granted per module
pub const PERMISSION_ACTIONS: &[&str] = &["view", "add", "update", "delete"];

/// Per-user permission grants, keyed by module name
///
/// Flattened into `"module:action"` strings for JWT claims.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionSet(pub BTreeMap<String, BTreeSet<String>>);

impl PermissionSet {
    pub fn grant(&mut self, module: &str, action: &str) {
        self.0
            .entry(module.to_string())
            .or_default()
            .insert(action.to_string());
    }

    pub fn has(&self, module: &str, action: &str) -> bool {
        self.0
            .get(module)
            .map(|actions| actions.contains(action))
            .unwrap_or(false)
    }

    /// Flatten to `"module:action"` claim strings
    pub fn to_claims(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(module, actions)| {
                actions.iter().map(move |action| format!("{}:{}", module, action))
            })
            .collect()
    }

    /// Rebuild from `"module:action"` claim strings; malformed entries are skipped
    pub fn from_claims(claims: &[String]) -> Self {
        let mut set = Self::default();
        for claim in claims {
            if let Some((module, action)) = claim.split_once(':') {
                if !module.is_empty() && !action.is_empty() {
                    set.grant(module, action);
                }
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        for role in [Role::SuperAdmin, Role::Admin, Role::User] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("OWNER"), None);
    }

    #[test]
    fn test_permission_set_grant_and_check() {
        let mut set = PermissionSet::default();
        set.grant("products", "view");
        set.grant("products", "add");
        assert!(set.has("products", "view"));
        assert!(set.has("products", "add"));
        assert!(!set.has("products", "delete"));
        assert!(!set.has("stock", "view"));
    }

    #[test]
    fn test_permission_claims_round_trip() {
        let mut set = PermissionSet::default();
        set.grant("stock", "add");
        set.grant("stock", "view");
        set.grant("products", "view");
        let claims = set.to_claims();
        assert_eq!(claims, vec!["products:view", "stock:add", "stock:view"]);
        assert_eq!(PermissionSet::from_claims(&claims), set);
    }

    #[test]
    fn test_permission_claims_skip_malformed() {
        let claims = vec![
            "products:view".to_string(),
            "broken".to_string(),
            ":view".to_string(),
            "stock:".to_string(),
        ];
        let set = PermissionSet::from_claims(&claims);
        assert!(set.has("products", "view"));
        assert_eq!(set.to_claims().len(), 1);
    }
}
