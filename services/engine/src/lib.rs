//! Engine - merges orders, customers and products into dashboard figures
//!
//! Pipeline:
//! - `tabular`: raw CSV text, byte streams or workbooks into header-keyed records
//! - `schema`: required-column check per table (errors returned as data)
//! - `merge`: left join of orders with customers and products, Revenue/Profit
//! - `aggregate`: KPIs, city filter, unique cities, revenue by category/segment
//! - `state`: upload gate and the dashboard state record
//!
//! Every operation is a synchronous pure function of its inputs. Nothing here
//! holds process-wide state, so calls may run concurrently and repeat freely.

pub mod aggregate;
pub mod error;
pub mod merge;
pub mod model;
pub mod numeric;
pub mod schema;
pub mod state;
pub mod tabular;

pub use aggregate::{compute_kpis, filter_by_city, revenue_by_category, revenue_by_segment, unique_cities};
pub use error::{EngineError, Result};
pub use merge::merge;
pub use model::{
    Breakdown, Kpis, MergedRow, RawCustomer, RawOrder, RawProduct, ALL_CITIES, CANCELLED_STATUS,
    COMPLETED_STATUS,
};
pub use schema::{validate, validate_kind, EntityKind, ValidationError};
pub use state::{DashboardState, DashboardView, Slot, Tables, UploadSet};
pub use tabular::{load_table, parse_reader, parse_text, parse_workbook, ParsedTable, ParseDiagnostic, Record};
