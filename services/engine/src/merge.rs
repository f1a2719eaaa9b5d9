//! Merge Engine - left join of orders with customers and products
//!
//! Every order yields exactly one merged row, in input order. Customer and
//! product lookups go through maps keyed by the trimmed identifier, built
//! once per call. On duplicate identifiers the later row wins.
//!
//! Derived figures:
//!   Revenue = Unit_Price * Quantity * (1 - Discount)
//!   Profit  = (Unit_Price - Cost_Price) * Quantity * (1 - Discount)
//! An unmatched product leaves both prices, and so both figures, at zero.

use crate::model::{MergedRow, RawCustomer, RawOrder, RawProduct};
use crate::numeric::{parse_discount, parse_f64_or_zero, parse_int_or_zero};
use std::collections::HashMap;
use tracing::debug;

/// Index rows by trimmed key; later rows overwrite earlier ones.
fn index_by<'a, T>(rows: &'a [T], key: impl Fn(&T) -> &str) -> HashMap<&'a str, &'a T> {
    rows.iter().map(|row| (key(row).trim(), row)).collect()
}

/// Join every order with its customer and product.
pub fn merge(orders: &[RawOrder], customers: &[RawCustomer], products: &[RawProduct]) -> Vec<MergedRow> {
    let customer_map = index_by(customers, |c| c.customer_id.as_str());
    let product_map = index_by(products, |p| p.product_id.as_str());

    let mut unmatched_customers = 0usize;
    let mut unmatched_products = 0usize;

    let rows: Vec<MergedRow> = orders
        .iter()
        .map(|order| {
            let customer = customer_map.get(order.customer_id.trim()).copied();
            let product = product_map.get(order.product_id.trim()).copied();
            if customer.is_none() {
                unmatched_customers += 1;
            }
            if product.is_none() {
                unmatched_products += 1;
            }
            merge_row(order, customer, product)
        })
        .collect();

    debug!(
        orders = orders.len(),
        customers = customer_map.len(),
        products = product_map.len(),
        unmatched_customers,
        unmatched_products,
        "merged tables"
    );

    rows
}

fn merge_row(order: &RawOrder, customer: Option<&RawCustomer>, product: Option<&RawProduct>) -> MergedRow {
    let quantity = parse_int_or_zero(&order.quantity);
    let discount = parse_discount(order.discount.as_deref());
    let unit_price = product.map_or(0.0, |p| parse_f64_or_zero(&p.unit_price));
    let cost_price = product.map_or(0.0, |p| parse_f64_or_zero(&p.cost_price));

    let revenue = unit_price * quantity as f64 * (1.0 - discount);
    let profit = (unit_price - cost_price) * quantity as f64 * (1.0 - discount);

    MergedRow {
        order_id: order.order_id.clone(),
        customer_id: order.customer_id.clone(),
        product_id: order.product_id.clone(),
        order_date: order.order_date.clone(),
        quantity,
        discount,
        payment_method: order.payment_method.clone(),
        channel: order.channel.clone(),
        status: order.status.clone(),
        customer_segment: customer.map(|c| c.customer_segment.clone()).unwrap_or_default(),
        city: customer.map(|c| c.city.clone()).unwrap_or_default(),
        registration_date: customer.map(|c| c.registration_date.clone()).unwrap_or_default(),
        product_name: product.map(|p| p.product_name.clone()).unwrap_or_default(),
        category: product.map(|p| p.category.clone()).unwrap_or_default(),
        unit_price,
        cost_price,
        revenue,
        profit,
    }
}
