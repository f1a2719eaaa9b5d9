//! Schema Validator - required-column contracts per entity kind
//!
//! Validation problems are returned as data. The caller decides whether they
//! block progress; the upload gate in `state` refuses a table with any.

use crate::tabular::Record;
use std::fmt;
use thiserror::Error;

/// Column contract for orders.
pub const ORDER_COLUMNS: &[&str] = &[
    "Order_ID",
    "Customer_ID",
    "Product_ID",
    "Order_Date",
    "Quantity",
    "Discount",
    "Payment_Method",
    "Channel",
    "Status",
];

/// Column contract for customers.
pub const CUSTOMER_COLUMNS: &[&str] = &[
    "Customer_ID",
    "Customer_Segment",
    "City",
    "Registration_Date",
];

/// Column contract for products.
pub const PRODUCT_COLUMNS: &[&str] = &[
    "Product_ID",
    "Product_Name",
    "Category",
    "Unit_Price",
    "Cost_Price",
];

/// The three tables the dashboard joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Orders,
    Customers,
    Products,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::Orders, Self::Customers, Self::Products];

    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            Self::Orders => ORDER_COLUMNS,
            Self::Customers => CUSTOMER_COLUMNS,
            Self::Products => PRODUCT_COLUMNS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Customers => "customers",
            Self::Products => "products",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A validation problem; `Display` is the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{source_label}: file is empty")]
    EmptySource { source_label: String },

    #[error("{source_label}: missing column \"{column}\"")]
    MissingColumn {
        source_label: String,
        column: String,
    },
}

/// Check `records` against `required`.
///
/// An empty record set yields exactly one `EmptySource`. Otherwise only the
/// first record's keys are inspected, and each absent required column yields
/// one `MissingColumn`, in contract order. An empty result means the table is
/// ready.
pub fn validate(records: &[Record], required: &[&str], source_label: &str) -> Vec<ValidationError> {
    let Some(first) = records.first() else {
        return vec![ValidationError::EmptySource {
            source_label: source_label.to_string(),
        }];
    };

    required
        .iter()
        .filter(|column| !first.contains_key(**column))
        .map(|column| ValidationError::MissingColumn {
            source_label: source_label.to_string(),
            column: column.to_string(),
        })
        .collect()
}

/// `validate` against the fixed contract of `kind`.
pub fn validate_kind(records: &[Record], kind: EntityKind, source_label: &str) -> Vec<ValidationError> {
    validate(records, kind.required_columns(), source_label)
}
