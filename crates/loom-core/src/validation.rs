//! # Validation Module
//!
//! Input validation for every ledger operation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  └── Shape and types of the input                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required text, lengths                                            │
//! │  └── Quantity and price bounds                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Ledger rules (stock availability, restock bounds)            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Database (SQLite)                                            │
//! │  ├── CHECK (sold_quantity BETWEEN 0 AND quantity)                      │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use loom_core::validation::{validate_sale_quantity, validate_price};
//!
//! assert!(validate_sale_quantity(5).is_ok());
//! assert!(validate_sale_quantity(0).is_err());
//! assert!(validate_price("price", -1).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{
    NewRetailProduct, NewStandaloneSale, NewVariant, QuickSell, RestockVariant,
    RetailProductUpdate, SellVariant,
};
use crate::{MAX_PRICE_CENTS, MAX_STOCK_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 2000;
const MAX_LABEL_LEN: usize = 100;
const MAX_IMAGE_REF_LEN: usize = 500;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a required, trimmed, length-bounded text field.
pub fn validate_required_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a product name.
///
/// ## Example
/// ```rust
/// use loom_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Heavyweight Hoodie").is_ok());
/// assert!(validate_product_name("   ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, MAX_NAME_LEN)
}

/// Validates a variant key. Both parts are required.
pub fn validate_variant_key(size: &str, color: &str) -> ValidationResult<()> {
    validate_required_text("size", size, MAX_LABEL_LEN)?;
    validate_required_text("color", color, MAX_LABEL_LEN)
}

/// Validates a stocked quantity (may be zero).
pub fn validate_stock_quantity(quantity: i64) -> ValidationResult<()> {
    if !(0..=MAX_STOCK_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_STOCK_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a quantity that moves stock: sells, restocks and sales.
///
/// ## Rules
/// - At least 1
/// - At most [`MAX_STOCK_QUANTITY`]
pub fn validate_sale_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if quantity > MAX_STOCK_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_STOCK_QUANTITY,
        });
    }
    Ok(())
}

/// Validates an amount in cents.
///
/// ## Rules
/// - At least 0
/// - At most [`MAX_PRICE_CENTS`]
pub fn validate_price(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }
    Ok(())
}

fn validate_images(images: &[String]) -> ValidationResult<()> {
    for image in images {
        validate_required_text("images", image, MAX_IMAGE_REF_LEN)?;
    }
    Ok(())
}

fn validate_variants(variants: &[NewVariant]) -> ValidationResult<()> {
    for variant in variants {
        validate_variant_key(&variant.size, &variant.color)?;
        validate_stock_quantity(variant.quantity)?;
    }
    Ok(())
}

fn validate_description(description: &str) -> ValidationResult<()> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Operation Validators
// =============================================================================

/// Validates a create request.
///
/// Duplicate `(size, color)` pairs are accepted and stored as given.
pub fn validate_new_product(input: &NewRetailProduct) -> ValidationResult<()> {
    validate_product_name(&input.name)?;
    validate_description(&input.description)?;
    validate_price("price", input.price_cents)?;
    if let Some(cost) = input.cost_price_cents {
        validate_price("cost_price", cost)?;
    }
    validate_required_text("category", &input.category, MAX_LABEL_LEN)?;
    validate_images(&input.images)?;
    validate_variants(&input.variants)
}

/// Validates the supplied fields of a partial update.
pub fn validate_update(input: &RetailProductUpdate) -> ValidationResult<()> {
    if let Some(name) = &input.name {
        validate_product_name(name)?;
    }
    if let Some(description) = &input.description {
        validate_description(description)?;
    }
    if let Some(price) = input.price_cents {
        validate_price("price", price)?;
    }
    if let Some(category) = &input.category {
        validate_required_text("category", category, MAX_LABEL_LEN)?;
    }
    if let Some(images) = &input.images {
        validate_images(images)?;
    }
    if let Some(variants) = &input.variants {
        validate_variants(variants)?;
    }
    Ok(())
}

/// Validates a sell or external sale request.
pub fn validate_sell(input: &SellVariant) -> ValidationResult<()> {
    validate_variant_key(&input.size, &input.color)?;
    validate_sale_quantity(input.quantity)?;
    if let Some(price) = input.sold_price_cents {
        validate_price("sold_price", price)?;
    }
    Ok(())
}

/// Validates a restock request.
pub fn validate_restock(input: &RestockVariant) -> ValidationResult<()> {
    validate_variant_key(&input.size, &input.color)?;
    validate_sale_quantity(input.quantity)
}

/// Validates a quick sell request.
pub fn validate_quick_sell(input: &QuickSell) -> ValidationResult<()> {
    validate_required_text("category", &input.category, MAX_LABEL_LEN)?;
    validate_variant_key(&input.size, &input.color)?;
    validate_sale_quantity(input.quantity)?;
    validate_price("sold_price", input.sold_price_cents)
}

/// Validates a standalone point-of-sale record.
pub fn validate_standalone_sale(input: &NewStandaloneSale) -> ValidationResult<()> {
    validate_required_text("category", &input.category, MAX_LABEL_LEN)?;
    validate_variant_key(&input.size, &input.color)?;
    validate_sale_quantity(input.quantity)?;
    validate_price("sold_price", input.sold_price_cents)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn new_product() -> NewRetailProduct {
        NewRetailProduct {
            name: "Basic Tee".to_string(),
            description: "Cotton".to_string(),
            price_cents: 1500,
            cost_price_cents: None,
            category: "T-Shirt".to_string(),
            material: Some("Cotton".to_string()),
            images: vec![],
            variants: vec![NewVariant::new("M", "Black", 10)],
        }
    }

    #[test]
    fn test_new_product_ok() {
        assert!(validate_new_product(&new_product()).is_ok());
    }

    #[test]
    fn test_new_product_rejects_negative_quantity() {
        let mut input = new_product();
        input.variants.push(NewVariant::new("L", "Black", -1));
        assert!(matches!(
            validate_new_product(&input),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_new_product_rejects_negative_cost() {
        let mut input = new_product();
        input.cost_price_cents = Some(-5);
        assert!(validate_new_product(&input).is_err());
    }

    #[test]
    fn test_zero_stock_variant_allowed() {
        let mut input = new_product();
        input.variants = vec![NewVariant::new("XS", "White", 0)];
        assert!(validate_new_product(&input).is_ok());
    }

    #[test]
    fn test_sale_quantity_bounds() {
        assert!(validate_sale_quantity(1).is_ok());
        assert!(matches!(
            validate_sale_quantity(0),
            Err(ValidationError::MustBePositive { .. })
        ));
        assert!(validate_sale_quantity(MAX_STOCK_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_price_bounds() {
        assert!(validate_price("price", 0).is_ok());
        assert!(validate_price("price", MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price("sold_price", MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { max: MAX_PRICE_CENTS, .. })
        ));
        assert!(validate_price("sold_price", i64::MAX / 2 + 1).is_err());
    }

    #[test]
    fn test_sell_requires_variant_key() {
        let input = SellVariant {
            size: "".to_string(),
            color: "Black".to_string(),
            quantity: 1,
            sold_price_cents: None,
        };
        assert!(matches!(
            validate_sell(&input),
            Err(ValidationError::Required { field }) if field == "size"
        ));
    }

    #[test]
    fn test_update_only_checks_supplied_fields() {
        assert!(validate_update(&RetailProductUpdate::default()).is_ok());

        let update = RetailProductUpdate {
            price_cents: Some(-1),
            ..Default::default()
        };
        assert!(validate_update(&update).is_err());
    }
}
