//! Dashboard state as an explicit reducer.
//!
//! [`DashboardState::reduce`] is the only way state changes. Everything a
//! dashboard renders comes from [`DashboardState::view`], which recomputes
//! the visible records, totals and chart series from scratch on every call.
//!
//! ```
//! use tally_cost::{Action, CostRecord, DashboardState, MetricAxis, RecordField};
//!
//! let state = DashboardState::default()
//!     .reduce(Action::Load(vec![
//!         CostRecord::new("1", "acme", "A", "gpt").with_cost(1.0),
//!         CostRecord::new("2", "acme", "B", "gpt").with_cost(2.0),
//!     ]))
//!     .reduce(Action::ToggleOption {
//!         field: RecordField::Project,
//!         label: "A".into(),
//!     });
//!
//! let view = state.view(MetricAxis::Cost);
//! assert_eq!(view.records.len(), 1);
//! assert_eq!(view.totals.projected_cost, 30.0);
//! ```

use serde::{Deserialize, Serialize};
use tally_core::TallyConfig;
use tracing::{debug, warn};

use crate::aggregate::{chart_series, ChartSeries, MetricAxis, Totals};
use crate::error::{CostError, Result};
use crate::filter::{
    active_filter_count, apply_filters, build_groups, clear_all, clear_group, select_option,
    toggle_group_collapse, toggle_option, FilterGroup, DEFAULT_GROUP_FIELDS,
};
use crate::models::{BillingMonth, CostRecord, RecordField};
use crate::palette::Palette;
use crate::sort::{sort_records, SortState, SpecialHandling};
use crate::store::{AccountScope, RecordStore, Scope};

/// Engine settings derived from [`TallyConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub extrapolation_factor: f64,
    pub group_fields: Vec<RecordField>,
    pub palette: Palette,
    pub default_account: AccountScope,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            extrapolation_factor: tally_core::config::DEFAULT_EXTRAPOLATION_FACTOR,
            group_fields: DEFAULT_GROUP_FIELDS.to_vec(),
            palette: Palette::default(),
            default_account: AccountScope::All,
        }
    }
}

impl Settings {
    /// Resolve field names and palette colours from configuration.
    pub fn from_config(config: &TallyConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| CostError::Config(e.to_string()))?;
        let group_fields = config
            .filter_fields
            .iter()
            .map(|name| {
                name.parse::<RecordField>()
                    .map_err(|e| CostError::Config(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        let palette = Palette::from_hex(&config.palette, config.opacity_step)?;
        let default_account = config
            .default_account
            .parse::<AccountScope>()
            .unwrap_or_default();

        Ok(Self {
            extrapolation_factor: config.extrapolation_factor,
            group_fields,
            palette,
            default_account,
        })
    }
}

/// A state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Replace the raw records
    Load(Vec<CostRecord>),
    SetAccountScope(AccountScope),
    SetMonthScope(Option<BillingMonth>),
    ToggleOption { field: RecordField, label: String },
    SelectOption { field: RecordField, label: String },
    ToggleGroupCollapse(RecordField),
    ClearGroup(RecordField),
    ClearAll,
    /// Advance the sort cycle on a field
    Sort {
        field: RecordField,
        handling: Option<SpecialHandling>,
    },
}

/// Records, scope, filter groups and sort state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardState {
    store: RecordStore,
    groups: Vec<FilterGroup>,
    sort: SortState,
    settings: Settings,
}

impl DashboardState {
    /// Empty state using `settings`; the default account scope applies.
    pub fn new(settings: Settings) -> Self {
        let mut store = RecordStore::new();
        store.set_account_scope(settings.default_account.clone());
        Self {
            store,
            groups: Vec::new(),
            sort: SortState::default(),
            settings,
        }
    }

    /// Apply one action, returning the next state.
    pub fn reduce(mut self, action: Action) -> Self {
        debug!(action = action_name(&action), "reducing dashboard action");
        match action {
            Action::Load(records) => {
                self.store.load(records);
                self.rebuild_groups();
            }
            Action::SetAccountScope(account) => {
                self.store.set_account_scope(account);
                self.rebuild_groups();
            }
            Action::SetMonthScope(month) => {
                self.store.set_month_scope(month);
                self.rebuild_groups();
            }
            Action::ToggleOption { field, label } => {
                if !toggle_option(&mut self.groups, field, &label) {
                    warn!(%field, label = %label, "toggle ignored: no such filter option");
                }
            }
            Action::SelectOption { field, label } => {
                select_option(&mut self.groups, field, &label);
            }
            Action::ToggleGroupCollapse(field) => {
                toggle_group_collapse(&mut self.groups, field);
            }
            Action::ClearGroup(field) => {
                clear_group(&mut self.groups, field);
            }
            Action::ClearAll => clear_all(&mut self.groups),
            Action::Sort { field, handling } => {
                self.sort = self.sort.toggle(field, handling);
            }
        }
        self
    }

    /// Scoped, filtered and sorted records.
    pub fn visible(&self) -> Vec<&CostRecord> {
        let mut records = apply_filters(self.store.scoped(), &self.groups);
        sort_records(&mut records, &self.sort);
        records
    }

    /// Derive everything the dashboard renders.
    pub fn view(&self, axis: MetricAxis) -> DashboardView {
        let visible = self.visible();
        let totals = Totals::from_records(&visible, self.settings.extrapolation_factor);
        let series = chart_series(
            &visible,
            self.store.projects(),
            self.store.models(),
            axis,
            &self.settings.palette,
        );

        DashboardView {
            scope: self.store.scope().clone(),
            sort: self.sort,
            axis,
            active_filter_count: active_filter_count(&self.groups),
            groups: self.groups.clone(),
            accounts: self.store.accounts().to_vec(),
            models: self.store.models().to_vec(),
            projects: self.store.projects().to_vec(),
            totals,
            series,
            records: visible.into_iter().cloned().collect(),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn groups(&self) -> &[FilterGroup] {
        &self.groups
    }

    pub fn sort_state(&self) -> SortState {
        self.sort
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn rebuild_groups(&mut self) {
        let scoped = self.store.scoped();
        let groups = build_groups(&scoped, &self.settings.group_fields);
        self.groups = groups;
    }
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::Load(_) => "load",
        Action::SetAccountScope(_) => "set_account_scope",
        Action::SetMonthScope(_) => "set_month_scope",
        Action::ToggleOption { .. } => "toggle_option",
        Action::SelectOption { .. } => "select_option",
        Action::ToggleGroupCollapse(_) => "toggle_group_collapse",
        Action::ClearGroup(_) => "clear_group",
        Action::ClearAll => "clear_all",
        Action::Sort { .. } => "sort",
    }
}

/// Snapshot of everything derived from a [`DashboardState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub scope: Scope,
    pub sort: SortState,
    pub axis: MetricAxis,
    pub active_filter_count: usize,
    pub groups: Vec<FilterGroup>,
    pub accounts: Vec<String>,
    pub models: Vec<String>,
    pub projects: Vec<String>,
    pub totals: Totals,
    pub series: Vec<ChartSeries>,
    pub records: Vec<CostRecord>,
}
