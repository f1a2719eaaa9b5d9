//! Domain records: raw table rows, merged rows and aggregate outputs.
//!
//! Serialized field names follow the source column headers (`Order_ID`,
//! `Unit_Price`, ...) so merged rows round-trip to the same column layout.

use crate::tabular::Record;
use serde::{Deserialize, Serialize};

/// Status value of a fulfilled order.
pub const COMPLETED_STATUS: &str = "הושלם";

/// Status value of a cancelled order.
pub const CANCELLED_STATUS: &str = "בוטל";

/// City filter value meaning "no city restriction".
pub const ALL_CITIES: &str = "כל הערים";

fn field(record: &Record, name: &str) -> String {
    record.get(name).cloned().unwrap_or_default()
}

// =============================================================================
// RAW ENTITIES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawOrder {
    #[serde(rename = "Order_ID")]
    pub order_id: String,
    #[serde(rename = "Customer_ID")]
    pub customer_id: String,
    #[serde(rename = "Product_ID")]
    pub product_id: String,
    #[serde(rename = "Order_Date")]
    pub order_date: String,
    #[serde(rename = "Quantity")]
    pub quantity: String,
    /// `None` when the column is absent; blank text is kept as-is.
    #[serde(rename = "Discount", default)]
    pub discount: Option<String>,
    #[serde(rename = "Payment_Method")]
    pub payment_method: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Status")]
    pub status: String,
}

impl RawOrder {
    pub fn from_record(record: &Record) -> Self {
        Self {
            order_id: field(record, "Order_ID"),
            customer_id: field(record, "Customer_ID"),
            product_id: field(record, "Product_ID"),
            order_date: field(record, "Order_Date"),
            quantity: field(record, "Quantity"),
            discount: record.get("Discount").cloned(),
            payment_method: field(record, "Payment_Method"),
            channel: field(record, "Channel"),
            status: field(record, "Status"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCustomer {
    #[serde(rename = "Customer_ID")]
    pub customer_id: String,
    #[serde(rename = "Customer_Segment")]
    pub customer_segment: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Registration_Date")]
    pub registration_date: String,
}

impl RawCustomer {
    pub fn from_record(record: &Record) -> Self {
        Self {
            customer_id: field(record, "Customer_ID"),
            customer_segment: field(record, "Customer_Segment"),
            city: field(record, "City"),
            registration_date: field(record, "Registration_Date"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProduct {
    #[serde(rename = "Product_ID")]
    pub product_id: String,
    #[serde(rename = "Product_Name")]
    pub product_name: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Unit_Price")]
    pub unit_price: String,
    #[serde(rename = "Cost_Price")]
    pub cost_price: String,
}

impl RawProduct {
    pub fn from_record(record: &Record) -> Self {
        Self {
            product_id: field(record, "Product_ID"),
            product_name: field(record, "Product_Name"),
            category: field(record, "Category"),
            unit_price: field(record, "Unit_Price"),
            cost_price: field(record, "Cost_Price"),
        }
    }
}

// =============================================================================
// MERGED ROW
// =============================================================================

/// One order enriched with its customer and product, plus derived figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    #[serde(rename = "Order_ID")]
    pub order_id: String,
    #[serde(rename = "Customer_ID")]
    pub customer_id: String,
    #[serde(rename = "Product_ID")]
    pub product_id: String,
    #[serde(rename = "Order_Date")]
    pub order_date: String,
    #[serde(rename = "Quantity")]
    pub quantity: i64,
    #[serde(rename = "Discount")]
    pub discount: f64,
    #[serde(rename = "Payment_Method")]
    pub payment_method: String,
    #[serde(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Customer_Segment")]
    pub customer_segment: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Registration_Date")]
    pub registration_date: String,
    #[serde(rename = "Product_Name")]
    pub product_name: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Unit_Price")]
    pub unit_price: f64,
    #[serde(rename = "Cost_Price")]
    pub cost_price: f64,
    #[serde(rename = "Revenue")]
    pub revenue: f64,
    #[serde(rename = "Profit")]
    pub profit: f64,
}

impl MergedRow {
    pub fn is_completed(&self) -> bool {
        self.status.trim() == COMPLETED_STATUS
    }

    pub fn is_cancelled(&self) -> bool {
        self.status.trim() == CANCELLED_STATUS
    }
}

// =============================================================================
// AGGREGATES
// =============================================================================

/// Summary card figures.
///
/// Revenue, profit and the order count cover completed orders only; the
/// cancellation rate (a percentage) covers every order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_revenue: f64,
    pub total_profit: f64,
    pub completed_orders: usize,
    pub cancellation_rate: f64,
}

/// One bar of a grouped revenue chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub name: String,
    pub value: i64,
}
