//! Tenancy and authorization tests
//!
//! Property-based and unit tests for:
//! - Role parsing and the permission claim format
//! - Permission set claim round trips
//! - Field validation for registration payloads

use proptest::prelude::*;

use shared::models::{PermissionSet, Role, PERMISSION_ACTIONS, PERMISSION_MODULES};
use shared::validation;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate valid email addresses
fn email_strategy() -> impl Strategy<Value = String> {
    "[a-z]{5,10}@[a-z]{3,8}\\.(com|org|net|co\\.in)"
}

/// Generate valid passwords (8+ chars)
fn password_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9!@#$%]{8,20}"
}

/// Generate a known permission module
fn module_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(PERMISSION_MODULES)
}

/// Generate a known permission action
fn action_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(PERMISSION_ACTIONS)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Roles round trip through their string form
    #[test]
    fn test_role_round_trip() {
        for role in [Role::SuperAdmin, Role::Admin, Role::User] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("MANAGER"), None);
    }

    /// Granting a permission makes exactly that permission available
    #[test]
    fn test_permission_grant() {
        let mut set = PermissionSet::default();
        set.grant("products", "view");

        assert!(set.has("products", "view"));
        assert!(!set.has("products", "delete"));
        assert!(!set.has("stock", "view"));
    }

    /// Claims are flattened to module:action strings
    #[test]
    fn test_claims_format() {
        let mut set = PermissionSet::default();
        set.grant("stock", "add");
        set.grant("stock", "view");

        let claims = set.to_claims();
        assert!(claims.contains(&"stock:add".to_string()));
        assert!(claims.contains(&"stock:view".to_string()));
        assert_eq!(claims.len(), 2);
    }

    /// Malformed claim strings are skipped when rebuilding
    #[test]
    fn test_malformed_claims_skipped() {
        let claims = vec![
            "products:view".to_string(),
            "no-colon".to_string(),
            ":view".to_string(),
            "stock:".to_string(),
        ];

        let set = PermissionSet::from_claims(&claims);
        assert!(set.has("products", "view"));
        assert_eq!(set.to_claims().len(), 1);
    }

    /// Registration field validation
    #[test]
    fn test_registration_validation() {
        assert!(validation::validate_email("owner@tiles.com").is_ok());
        assert!(validation::validate_email("not-an-email").is_err());
        assert!(validation::validate_password("longenough").is_ok());
        assert!(validation::validate_password("short").is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Valid emails and passwords always validate
        #[test]
        fn prop_generated_credentials_validate(
            email in email_strategy(),
            password in password_strategy(),
        ) {
            prop_assert!(validation::validate_email(&email).is_ok());
            prop_assert!(validation::validate_password(&password).is_ok());
        }

        /// Claims survive a round trip through the JWT representation
        #[test]
        fn prop_claims_round_trip(
            grants in prop::collection::vec((module_strategy(), action_strategy()), 0..12)
        ) {
            let mut set = PermissionSet::default();
            for (module, action) in &grants {
                set.grant(module, action);
            }

            let rebuilt = PermissionSet::from_claims(&set.to_claims());
            for (module, action) in &grants {
                prop_assert!(rebuilt.has(module, action));
            }
            prop_assert_eq!(rebuilt.to_claims(), set.to_claims());
        }

        /// A permission is never implied by a different module or action
        #[test]
        fn prop_no_cross_module_leakage(
            module in module_strategy(),
            action in action_strategy(),
        ) {
            let mut set = PermissionSet::default();
            set.grant(module, action);

            for other_module in PERMISSION_MODULES {
                for other_action in PERMISSION_ACTIONS {
                    let expected = *other_module == module && *other_action == action;
                    prop_assert_eq!(set.has(other_module, other_action), expected);
                }
            }
        }
    }
}
