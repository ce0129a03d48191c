//! # Error Types
//!
//! Domain-specific error types for loom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  loom-core errors (this file)                                          │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  loom-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  loom-ledger errors                                                    │
//! │  └── LedgerError      - What callers see (code + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → LedgerError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every stock error carries the offending numbers in its message so a
//! caller can show them as-is ("Available: 3, Requested: 5").

use serde::Serialize;
use thiserror::Error;

// =============================================================================
// Error Kind
// =============================================================================

/// The three distinguishable failure families of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Product, variant or sale id does not resolve.
    NotFound,
    /// Availability or bound check failed.
    InvalidStock,
    /// Malformed input rejected before persistence.
    Validation,
}

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Retail product id does not resolve.
    #[error("Retail product with id {0} not found")]
    ProductNotFound(String),

    /// No variant with this `(size, color)` on the product.
    ///
    /// ## When This Occurs
    /// - Typo in size or color
    /// - Variant was dropped by an update while sale records still name it
    #[error("Variant {color} {size} not found in this product")]
    VariantNotFound { size: String, color: String },

    /// Sale record id does not resolve on the product.
    #[error("Sale with id {0} not found")]
    SaleNotFound(String),

    /// Trying to sell more than is available.
    ///
    /// ## User Workflow
    /// ```text
    /// Sell M/Black (qty: 7)
    ///      │
    ///      ▼
    /// Check stock: quantity=10, sold=4 → available=6
    ///      │
    ///      ▼
    /// InsufficientStock { available: 6, requested: 7 }
    /// ```
    #[error("Not enough stock. Available: {available}, Requested: {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// Restock would drive sold quantity below zero.
    #[error("Cannot restock more than sold quantity. Sold: {sold}, Requested: {requested}")]
    RestockExceedsSold { sold: i64, requested: i64 },

    /// Returning a sale whose quantity exceeds what the variant has sold.
    #[error("Cannot return more than sold quantity. Sold: {sold}, Sale quantity: {sale_quantity}")]
    ReturnExceedsSold { sold: i64, sale_quantity: i64 },

    /// Variant update would set quantity below units already sold.
    #[error("Quantity for variant {color} {size} cannot be below sold quantity. Sold: {sold}, Quantity: {quantity}")]
    QuantityBelowSold {
        size: String,
        color: String,
        sold: i64,
        quantity: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Classifies the error into one of the ledger failure families.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ProductNotFound(_)
            | CoreError::VariantNotFound { .. }
            | CoreError::SaleNotFound(_) => ErrorKind::NotFound,
            CoreError::InsufficientStock { .. }
            | CoreError::RestockExceedsSold { .. }
            | CoreError::ReturnExceedsSold { .. }
            | CoreError::QuantityBelowSold { .. } => ErrorKind::InvalidStock,
            CoreError::Validation(_) => ErrorKind::Validation,
        }
    }

    /// Creates a VariantNotFound error.
    pub fn variant_not_found(size: impl Into<String>, color: impl Into<String>) -> Self {
        CoreError::VariantNotFound {
            size: size.into(),
            color: color.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements.
/// Used for early validation before anything touches the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_error_messages_carry_numbers() {
        let err = CoreError::InsufficientStock {
            available: 6,
            requested: 7,
        };
        assert_eq!(err.to_string(), "Not enough stock. Available: 6, Requested: 7");

        let err = CoreError::RestockExceedsSold {
            sold: 2,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Cannot restock more than sold quantity. Sold: 2, Requested: 3"
        );
    }

    #[test]
    fn test_variant_not_found_message() {
        let err = CoreError::variant_not_found("M", "Black");
        assert_eq!(err.to_string(), "Variant Black M not found in this product");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_kinds() {
        assert_eq!(CoreError::SaleNotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::ReturnExceedsSold {
                sold: 2,
                sale_quantity: 4
            }
            .kind(),
            ErrorKind::InvalidStock
        );
        let validation: CoreError = ValidationError::Required {
            field: "name".to_string(),
        }
        .into();
        assert_eq!(validation.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "size".to_string(),
        };
        assert_eq!(err.to_string(), "size is required");

        let err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        assert_eq!(err.to_string(), "quantity must be positive");
    }
}
