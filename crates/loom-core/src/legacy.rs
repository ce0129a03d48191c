//! # Legacy Documents
//!
//! Retail products exported from the previous document store.
//!
//! ## Why
//! Older documents were written before `costPrice`, `isExternal` and
//! per-sale `_id` existed. Instead of defaulting lazily on every read, the
//! import turns each document into a complete [`RetailProduct`] once.
//!
//! ## Defaults
//! ```text
//! ┌──────────────────────────┬─────────────────────────────────────────────┐
//! │ Missing field            │ Imported as                                 │
//! ├──────────────────────────┼─────────────────────────────────────────────┤
//! │ costPrice                │ 0                                           │
//! │ isExternal               │ false                                       │
//! │ salesHistory[]._id       │ fresh UUID                                  │
//! │ variants[].soldQuantity  │ 0                                           │
//! │ soldDate / createdAt     │ import time                                 │
//! │ updatedAt                │ createdAt                                   │
//! │ images / material        │ [] / none                                   │
//! └──────────────────────────┴─────────────────────────────────────────────┘
//! ```
//!
//! Prices are floats in the export and are rounded to whole cents.
//! ObjectIds are not UUIDs, so every product and sale gets a new id; the
//! old product id is kept on [`LegacyImport`] for logging.
//!
//! ## Accepted Shapes
//! Both `"_id": "64f..."` and `"_id": {"$oid": "64f..."}` parse, as do
//! dates written as plain RFC 3339 strings, `{"$date": "..."}` and
//! `{"$date": {"$numberLong": "..."}}`.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{RetailProduct, SaleRecord, Variant};
use crate::validation::{
    validate_price, validate_product_name, validate_required_text, validate_sale_quantity,
    validate_stock_quantity, validate_variant_key,
};

// =============================================================================
// Extended JSON Scalars
// =============================================================================

/// An `_id` as plain string or `{"$oid": ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LegacyId {
    Oid {
        #[serde(rename = "$oid")]
        oid: String,
    },
    Plain(String),
}

impl LegacyId {
    pub fn as_str(&self) -> &str {
        match self {
            LegacyId::Oid { oid } => oid,
            LegacyId::Plain(id) => id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DateValue {
    Text(String),
    Millis(i64),
    Long {
        #[serde(rename = "$numberLong")]
        number_long: String,
    },
}

/// A timestamp in any of the shapes the exporter produces.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LegacyDate {
    Wrapped {
        #[serde(rename = "$date")]
        date: DateValue,
    },
    Plain(String),
}

impl LegacyDate {
    /// Converts to UTC, failing with `InvalidFormat` naming `field`.
    pub fn to_utc(&self, field: &str) -> CoreResult<DateTime<Utc>> {
        let invalid = |reason: String| {
            CoreError::Validation(ValidationError::InvalidFormat {
                field: field.to_string(),
                reason,
            })
        };

        let parse_text = |text: &str| {
            DateTime::parse_from_rfc3339(text)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| invalid(e.to_string()))
        };

        let from_millis = |millis: i64| {
            Utc.timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| invalid(format!("timestamp {} out of range", millis)))
        };

        match self {
            LegacyDate::Plain(text) => parse_text(text),
            LegacyDate::Wrapped { date } => match date {
                DateValue::Text(text) => parse_text(text),
                DateValue::Millis(millis) => from_millis(*millis),
                DateValue::Long { number_long } => {
                    let millis = number_long
                        .parse::<i64>()
                        .map_err(|e| invalid(e.to_string()))?;
                    from_millis(millis)
                }
            },
        }
    }
}

fn resolve_date(
    date: &Option<LegacyDate>,
    field: &str,
    fallback: DateTime<Utc>,
) -> CoreResult<DateTime<Utc>> {
    match date {
        Some(date) => date.to_utc(field),
        None => Ok(fallback),
    }
}

// =============================================================================
// Documents
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyVariant {
    pub size: String,
    pub color: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub sold_quantity: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySaleRecord {
    #[serde(rename = "_id", default)]
    pub id: Option<LegacyId>,
    pub size: String,
    pub color: String,
    pub quantity: i64,
    pub sold_price: f64,
    #[serde(default)]
    pub sold_date: Option<LegacyDate>,
    #[serde(default)]
    pub is_external: Option<bool>,
}

/// One exported retail product document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRetailProduct {
    #[serde(rename = "_id", default)]
    pub id: Option<LegacyId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub cost_price: Option<f64>,
    pub category: String,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<LegacyVariant>,
    #[serde(default)]
    pub sales_history: Vec<LegacySaleRecord>,
    #[serde(default)]
    pub created_at: Option<LegacyDate>,
    #[serde(default)]
    pub updated_at: Option<LegacyDate>,
}

/// A converted product ready to be inserted.
#[derive(Debug, Clone)]
pub struct LegacyImport {
    /// The id the document had in the old store.
    pub legacy_id: Option<String>,
    pub product: RetailProduct,
}

/// Parses an exported JSON array of retail product documents.
pub fn parse_documents(json: &str) -> Result<Vec<LegacyRetailProduct>, serde_json::Error> {
    serde_json::from_str(json)
}

fn non_negative_cents(field: &str, amount: f64) -> CoreResult<i64> {
    if !amount.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "not a finite number".to_string(),
        }
        .into());
    }
    let cents = Money::from_legacy_amount(amount).cents();
    validate_price(field, cents)?;
    Ok(cents)
}

impl LegacyRetailProduct {
    /// Converts the document, applying the defaults above.
    ///
    /// ## Errors
    /// Validation when the document breaks an invariant the ledger relies
    /// on, e.g. `soldQuantity > quantity`. Nothing is clamped.
    pub fn into_import(self, now: DateTime<Utc>) -> CoreResult<LegacyImport> {
        validate_product_name(&self.name)?;
        validate_required_text("category", &self.category, 100)?;

        let price_cents = non_negative_cents("price", self.price)?;
        let cost_price_cents = match self.cost_price {
            Some(cost) => non_negative_cents("cost_price", cost)?,
            None => 0,
        };

        let variants = self
            .variants
            .into_iter()
            .map(|v| {
                validate_variant_key(&v.size, &v.color)?;
                validate_stock_quantity(v.quantity)?;
                let sold_quantity = v.sold_quantity.unwrap_or(0);
                if v.quantity < 0 || sold_quantity < 0 || sold_quantity > v.quantity {
                    return Err(CoreError::Validation(ValidationError::InvalidFormat {
                        field: format!("variant {} {}", v.color, v.size),
                        reason: format!(
                            "sold quantity {} outside 0..={}",
                            sold_quantity, v.quantity
                        ),
                    }));
                }
                Ok(Variant {
                    size: v.size,
                    color: v.color,
                    quantity: v.quantity,
                    sold_quantity,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let sales_history = self
            .sales_history
            .into_iter()
            .map(|s| -> CoreResult<SaleRecord> {
                validate_sale_quantity(s.quantity)?;
                Ok(SaleRecord {
                    id: Uuid::new_v4().to_string(),
                    sold_price_cents: non_negative_cents("salesHistory.soldPrice", s.sold_price)?,
                    sold_at: resolve_date(&s.sold_date, "salesHistory.soldDate", now)?,
                    is_external: s.is_external.unwrap_or(false),
                    size: s.size,
                    color: s.color,
                    quantity: s.quantity,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

        let created_at = resolve_date(&self.created_at, "createdAt", now)?;
        let updated_at = resolve_date(&self.updated_at, "updatedAt", created_at)?;

        Ok(LegacyImport {
            legacy_id: self.id.map(|id| id.as_str().to_string()),
            product: RetailProduct {
                id: Uuid::new_v4().to_string(),
                name: self.name,
                description: self.description,
                price_cents,
                cost_price_cents,
                category: self.category,
                material: self.material,
                images: self.images,
                variants,
                sales_history,
                created_at,
                updated_at,
            },
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_PRICE_CENTS;

    const OLD_DOCUMENT: &str = r#"[
        {
            "_id": {"$oid": "64f1c2a9e4b0a1b2c3d4e5f6"},
            "name": "Classic Hoodie",
            "description": "Fleece hoodie",
            "price": 39.99,
            "category": "Hoodie",
            "variants": [
                {"size": "M", "color": "Grey", "quantity": 10, "soldQuantity": 3},
                {"size": "L", "color": "Grey", "quantity": 4}
            ],
            "salesHistory": [
                {"size": "M", "color": "Grey", "quantity": 3, "soldPrice": 35.5,
                 "soldDate": {"$date": "2024-03-01T10:00:00Z"}}
            ],
            "createdAt": {"$date": {"$numberLong": "1704067200000"}}
        }
    ]"#;

    #[test]
    fn old_documents_import_with_defaults() {
        let now = Utc::now();
        let docs = parse_documents(OLD_DOCUMENT).unwrap();
        let import = docs.into_iter().next().unwrap().into_import(now).unwrap();

        assert_eq!(import.legacy_id.as_deref(), Some("64f1c2a9e4b0a1b2c3d4e5f6"));
        let p = import.product;
        assert_eq!(p.price_cents, 3999);
        assert_eq!(p.cost_price_cents, 0);
        assert!(p.images.is_empty());
        assert_eq!(p.variants[1].sold_quantity, 0);

        let sale = &p.sales_history[0];
        assert!(!sale.is_external);
        assert_eq!(sale.sold_price_cents, 3550);
        assert!(Uuid::parse_str(&sale.id).is_ok());
        assert_eq!(sale.sold_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");

        assert_eq!(p.created_at.timestamp_millis(), 1_704_067_200_000);
        assert_eq!(p.updated_at, p.created_at);
    }

    #[test]
    fn plain_ids_and_dates_parse() {
        let json = r#"[{
            "_id": "abc123",
            "name": "Cap",
            "price": 12,
            "costPrice": 4.25,
            "category": "Cap",
            "salesHistory": [
                {"_id": "s1", "size": "One Size", "color": "Red", "quantity": 1,
                 "soldPrice": 12, "soldDate": "2024-05-05T08:30:00Z", "isExternal": true}
            ]
        }]"#;
        let import = parse_documents(json)
            .unwrap()
            .remove(0)
            .into_import(Utc::now())
            .unwrap();

        assert_eq!(import.legacy_id.as_deref(), Some("abc123"));
        assert_eq!(import.product.cost_price_cents, 425);
        assert!(import.product.sales_history[0].is_external);
    }

    #[test]
    fn oversold_variant_is_rejected() {
        let json = r#"[{
            "name": "Tee", "price": 10, "category": "T-Shirt",
            "variants": [{"size": "S", "color": "Blue", "quantity": 2, "soldQuantity": 5}]
        }]"#;
        let err = parse_documents(json)
            .unwrap()
            .remove(0)
            .into_import(Utc::now())
            .unwrap_err();

        assert!(err.to_string().contains("variant Blue S"));
    }

    #[test]
    fn out_of_range_prices_are_rejected() {
        let json = r#"[
            {"name": "Tee", "price": 1e300, "category": "T-Shirt"},
            {"name": "Tee", "price": 10, "category": "T-Shirt",
             "salesHistory": [{"size": "S", "color": "Blue", "quantity": 1, "soldPrice": 5e12}]}
        ]"#;
        for doc in parse_documents(json).unwrap() {
            let err = doc.into_import(Utc::now()).unwrap_err();
            assert!(matches!(
                err,
                CoreError::Validation(ValidationError::OutOfRange { max: MAX_PRICE_CENTS, .. })
            ));
        }
    }

    #[test]
    fn missing_sold_date_uses_import_time() {
        let now = Utc::now();
        let json = r#"[{
            "name": "Tee", "price": 10, "category": "T-Shirt",
            "salesHistory": [{"size": "S", "color": "Blue", "quantity": 1, "soldPrice": 10}]
        }]"#;
        let import = parse_documents(json).unwrap().remove(0).into_import(now).unwrap();
        assert_eq!(import.product.sales_history[0].sold_at, now);
        assert_eq!(import.product.created_at, now);
    }
}
