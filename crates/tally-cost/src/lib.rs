//! # tally-cost
//!
//! Client-side cost analysis over model usage records.
//!
//! This crate provides:
//! - [`RecordStore`] - The loaded records plus account/month scope
//! - [`filter`] - Toggleable filter groups (OR within a group, AND across)
//! - [`sort`] - Single-key sorting with an ascending/descending/unsorted cycle
//! - [`aggregate`] - Headline totals and per-model-per-project chart series
//! - [`Palette`] - Deterministic model colours
//! - [`DashboardState`] - A reducer tying the above together
//!
//! Everything here is synchronous and pure; records arrive already fetched.
//!
//! ## Example
//!
//! ```no_run
//! use tally_cost::{load_records_file, Action, DashboardState, MetricAxis};
//!
//! fn main() -> tally_cost::Result<()> {
//!     let records = load_records_file("usage.json")?;
//!     let state = DashboardState::default().reduce(Action::Load(records));
//!
//!     let view = state.view(MetricAxis::Cost);
//!     println!("Projected monthly cost: ${:.2}", view.totals.projected_cost);
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod decode;
pub mod error;
pub mod filter;
pub mod models;
pub mod palette;
pub mod sort;
pub mod state;
pub mod store;

// Re-export main types
pub use aggregate::{
    chart_series, metric_total, per_model_per_project, totals_by_metric, ChartSeries, MetricAxis,
    Totals,
};
pub use decode::{decode_records, decode_value, load_records_file};
pub use error::{CostError, Result, ValidationError};
pub use filter::{FilterGroup, FilterOption};
pub use models::{BillingMonth, CostRecord, RecordField};
pub use palette::{ModelColor, Palette};
pub use sort::{SortState, SpecialHandling};
pub use state::{Action, DashboardState, DashboardView, Settings};
pub use store::{AccountScope, RecordStore, Scope};
