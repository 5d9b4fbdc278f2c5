//! Validation utilities for the Inventory ERP Platform

use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;

// ============================================================================
// Quantity Coercion
// ============================================================================

/// Coerce a loosely typed quantity value into a `Decimal`.
///
/// Order document payloads carry quantities and prices as either JSON numbers
/// or numeric strings. Anything that does not parse as a number coerces to
/// zero so a malformed line has no stock effect.
pub fn coerce_decimal(value: &serde_json::Value) -> Decimal {
    match value {
        serde_json::Value::Number(n) => {
            Decimal::from_str(&n.to_string()).unwrap_or(Decimal::ZERO)
        }
        serde_json::Value::String(s) => coerce_decimal_str(s),
        _ => Decimal::ZERO,
    }
}

/// Coerce a string into a `Decimal`, falling back to zero.
pub fn coerce_decimal_str(s: &str) -> Decimal {
    Decimal::from_str(s.trim()).unwrap_or(Decimal::ZERO)
}

/// Serde helper for fields that accept a number or a numeric string.
pub fn deserialize_loose_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(coerce_decimal(&value))
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Validate a required name field (non-empty after trimming)
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name is required");
    }
    if name.len() > 200 {
        return Err("Name must be at most 200 characters");
    }
    Ok(())
}

/// Validate GSTIN format (15 alphanumeric characters)
pub fn validate_gstin(gstin: &str) -> Result<(), &'static str> {
    if gstin.len() != 15 {
        return Err("GSTIN must be 15 characters");
    }
    if !gstin.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("GSTIN must be alphanumeric");
    }
    Ok(())
}

/// Validate a manual stock adjustment quantity (must be strictly positive)
pub fn validate_adjustment_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Invalid quantity");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coerce_decimal_number() {
        assert_eq!(coerce_decimal(&serde_json::json!(7)), Decimal::from(7));
        assert_eq!(
            coerce_decimal(&serde_json::json!(2.5)),
            Decimal::from_str("2.5").unwrap()
        );
    }

    #[test]
    fn test_coerce_decimal_numeric_string() {
        assert_eq!(coerce_decimal(&serde_json::json!("7")), Decimal::from(7));
        assert_eq!(
            coerce_decimal(&serde_json::json!(" 12.50 ")),
            Decimal::from_str("12.50").unwrap()
        );
    }

    #[test]
    fn test_coerce_decimal_non_numeric() {
        assert_eq!(coerce_decimal(&serde_json::json!("abc")), Decimal::ZERO);
        assert_eq!(coerce_decimal(&serde_json::json!(null)), Decimal::ZERO);
        assert_eq!(coerce_decimal(&serde_json::json!(true)), Decimal::ZERO);
        assert_eq!(coerce_decimal(&serde_json::json!("")), Decimal::ZERO);
    }

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("user.name@domain.co.in").is_ok());
    }

    #[test]
    fn test_validate_email_invalid() {
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("no@domain").is_err());
        assert!(validate_email("@.").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Glazed Tile 600x600").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_gstin() {
        assert!(validate_gstin("22AAAAA0000A1Z5").is_ok());
        assert!(validate_gstin("22AAAAA0000A1Z").is_err()); // Too short
        assert!(validate_gstin("22AAAAA0000A1Z-").is_err()); // Special char
    }

    #[test]
    fn test_validate_adjustment_quantity() {
        assert!(validate_adjustment_quantity(Decimal::from(1)).is_ok());
        assert!(validate_adjustment_quantity(Decimal::ZERO).is_err());
        assert!(validate_adjustment_quantity(Decimal::from(-3)).is_err());
    }
}
