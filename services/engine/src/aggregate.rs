//! Aggregation Engine - KPIs, city filter and grouped revenue.
//!
//! All functions are pure reads over merged rows. Status matching is exact
//! after trimming (see `MergedRow::is_completed`).

use crate::model::{Breakdown, Kpis, MergedRow, ALL_CITIES};
use crate::numeric::round_half_up;
use std::borrow::Cow;
use std::collections::{BTreeSet, HashMap};

/// Summary figures for the given rows.
pub fn compute_kpis(rows: &[MergedRow]) -> Kpis {
    let mut kpis = Kpis::default();
    let mut cancelled = 0usize;

    for row in rows {
        if row.is_completed() {
            kpis.total_revenue += row.revenue;
            kpis.total_profit += row.profit;
            kpis.completed_orders += 1;
        } else if row.is_cancelled() {
            cancelled += 1;
        }
    }

    if !rows.is_empty() {
        kpis.cancellation_rate = cancelled as f64 / rows.len() as f64 * 100.0;
    }
    kpis
}

/// Distinct non-empty cities, sorted.
pub fn unique_cities(rows: &[MergedRow]) -> Vec<String> {
    rows.iter()
        .filter(|row| !row.city.is_empty())
        .map(|row| row.city.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Rows whose City equals `city` exactly; all rows for the `ALL_CITIES` sentinel.
pub fn filter_by_city<'a>(rows: &'a [MergedRow], city: &str) -> Cow<'a, [MergedRow]> {
    if city == ALL_CITIES {
        return Cow::Borrowed(rows);
    }
    Cow::Owned(rows.iter().filter(|row| row.city == city).cloned().collect())
}

/// Completed-order revenue per product category, largest first.
pub fn revenue_by_category(rows: &[MergedRow]) -> Vec<Breakdown> {
    revenue_by(rows, |row| &row.category)
}

/// Completed-order revenue per customer segment, largest first.
pub fn revenue_by_segment(rows: &[MergedRow]) -> Vec<Breakdown> {
    revenue_by(rows, |row| &row.customer_segment)
}

/// Sum completed revenue per group, round each sum, sort descending.
///
/// The sort is stable, so equal values keep the order in which their group
/// was first seen.
fn revenue_by(rows: &[MergedRow], group: impl Fn(&MergedRow) -> &String) -> Vec<Breakdown> {
    let mut order: Vec<&str> = Vec::new();
    let mut sums: HashMap<&str, f64> = HashMap::new();

    for row in rows.iter().filter(|row| row.is_completed()) {
        let name = group(row).as_str();
        let sum = sums.entry(name).or_insert_with(|| {
            order.push(name);
            0.0
        });
        *sum += row.revenue;
    }

    let mut breakdown: Vec<Breakdown> = order
        .into_iter()
        .map(|name| Breakdown {
            name: name.to_string(),
            value: round_half_up(sums[name]),
        })
        .collect();
    breakdown.sort_by(|a, b| b.value.cmp(&a.value));
    breakdown
}
