//! Upload gate and dashboard state.
//!
//! `UploadSet` holds one slot per table and only opens once all three have
//! passed validation. `DashboardState` is the explicit state record of the
//! dashboard (idle or ready, plus the selected city); transitions consume the
//! old state and return the new one.

use crate::aggregate::{compute_kpis, filter_by_city, revenue_by_category, revenue_by_segment, unique_cities};
use crate::merge::merge;
use crate::model::{Breakdown, Kpis, MergedRow, RawCustomer, RawOrder, RawProduct, ALL_CITIES};
use crate::schema::{validate_kind, EntityKind, ValidationError};
use crate::tabular::Record;
use serde::Serialize;
use std::borrow::Cow;
use tracing::info;

// =============================================================================
// UPLOAD GATE
// =============================================================================

/// State of one upload slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Slot {
    #[default]
    Waiting,
    Parsed {
        source_label: String,
        records: Vec<Record>,
    },
    Failed {
        source_label: String,
    },
}

impl Slot {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Slot::Parsed { .. })
    }

    fn records(&self) -> Option<&[Record]> {
        match self {
            Slot::Parsed { records, .. } => Some(records),
            _ => None,
        }
    }
}

/// The three typed tables, ready to merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub orders: Vec<RawOrder>,
    pub customers: Vec<RawCustomer>,
    pub products: Vec<RawProduct>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSet {
    orders: Slot,
    customers: Slot,
    products: Slot,
}

impl UploadSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slot(&self, kind: EntityKind) -> &Slot {
        match kind {
            EntityKind::Orders => &self.orders,
            EntityKind::Customers => &self.customers,
            EntityKind::Products => &self.products,
        }
    }

    fn slot_mut(&mut self, kind: EntityKind) -> &mut Slot {
        match kind {
            EntityKind::Orders => &mut self.orders,
            EntityKind::Customers => &mut self.customers,
            EntityKind::Products => &mut self.products,
        }
    }

    /// Validate `records` against `kind` and fill its slot.
    ///
    /// On validation errors the slot is marked failed, its previous data is
    /// dropped and the errors are returned.
    pub fn accept(
        &mut self,
        kind: EntityKind,
        source_label: &str,
        records: Vec<Record>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors = validate_kind(&records, kind, source_label);
        let slot = self.slot_mut(kind);

        if !errors.is_empty() {
            *slot = Slot::Failed {
                source_label: source_label.to_string(),
            };
            return Err(errors);
        }

        info!(table = %kind, source = source_label, rows = records.len(), "table accepted");
        *slot = Slot::Parsed {
            source_label: source_label.to_string(),
            records,
        };
        Ok(())
    }

    /// True once every slot holds validated data.
    pub fn is_ready(&self) -> bool {
        EntityKind::ALL.iter().all(|kind| self.slot(*kind).is_parsed())
    }

    /// Convert the validated records into typed tables, if all are present.
    pub fn tables(&self) -> Option<Tables> {
        let orders = self.orders.records()?;
        let customers = self.customers.records()?;
        let products = self.products.records()?;

        Some(Tables {
            orders: orders.iter().map(RawOrder::from_record).collect(),
            customers: customers.iter().map(RawCustomer::from_record).collect(),
            products: products.iter().map(RawProduct::from_record).collect(),
        })
    }
}

// =============================================================================
// DASHBOARD STATE
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub dataset: Option<Vec<MergedRow>>,
    pub selected_city: String,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            dataset: None,
            selected_city: ALL_CITIES.to_string(),
        }
    }
}

/// Everything the dashboard renders for the current selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView<'a> {
    pub selected_city: &'a str,
    pub cities: Vec<String>,
    pub kpis: Kpis,
    pub revenue_by_category: Vec<Breakdown>,
    pub revenue_by_segment: Vec<Breakdown>,
    pub rows: Cow<'a, [MergedRow]>,
}

impl DashboardState {
    pub fn is_ready(&self) -> bool {
        self.dataset.is_some()
    }

    /// Merge the tables into a fresh dataset and clear the city filter.
    pub fn load(self, tables: &Tables) -> Self {
        Self {
            dataset: Some(merge(&tables.orders, &tables.customers, &tables.products)),
            selected_city: ALL_CITIES.to_string(),
        }
    }

    /// Back to idle.
    pub fn reset(self) -> Self {
        Self::default()
    }

    pub fn select_city(self, city: &str) -> Self {
        Self {
            selected_city: city.to_string(),
            ..self
        }
    }

    /// Derived view, or `None` while idle.
    ///
    /// The city list comes from the whole dataset; every other figure from
    /// the rows left after the city filter.
    pub fn view(&self) -> Option<DashboardView<'_>> {
        let dataset = self.dataset.as_deref()?;
        let rows = filter_by_city(dataset, &self.selected_city);

        Some(DashboardView {
            selected_city: &self.selected_city,
            cities: unique_cities(dataset),
            kpis: compute_kpis(&rows),
            revenue_by_category: revenue_by_category(&rows),
            revenue_by_segment: revenue_by_segment(&rows),
            rows,
        })
    }
}
