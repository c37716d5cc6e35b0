//! Authoritative record set plus the scope applied before group filtering.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tally_core::ALL_ACCOUNTS;
use tracing::{debug, info};

use crate::models::{BillingMonth, CostRecord};
use crate::sort::locale_cmp;

/// Account narrowing applied before filter groups.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountScope {
    /// No account restriction
    #[default]
    All,
    /// Only records charged to this account
    Account(String),
}

impl AccountScope {
    /// Whether `record` passes this scope.
    pub fn matches(&self, record: &CostRecord) -> bool {
        match self {
            AccountScope::All => true,
            AccountScope::Account(account) => record.account == *account,
        }
    }
}

impl FromStr for AccountScope {
    type Err = std::convert::Infallible;

    /// `"All"` is the sentinel; any other string names an account.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == ALL_ACCOUNTS {
            Ok(AccountScope::All)
        } else {
            Ok(AccountScope::Account(s.to_string()))
        }
    }
}

impl fmt::Display for AccountScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountScope::All => f.write_str(ALL_ACCOUNTS),
            AccountScope::Account(account) => f.write_str(account),
        }
    }
}

/// Scope filters: account and optional billing month.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scope {
    pub account: AccountScope,
    pub month: Option<BillingMonth>,
}

impl Scope {
    /// Whether `record` passes every scope filter.
    pub fn matches(&self, record: &CostRecord) -> bool {
        self.account.matches(record) && self.month.is_none_or(|m| record.in_month(m))
    }
}

/// Holds the raw records and the derived unique-value lists.
///
/// Unique lists are recomputed on every load and scope change so that
/// dropdowns and chart ordering never lag behind the data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecordStore {
    records: Vec<CostRecord>,
    scope: Scope,
    accounts: Vec<String>,
    models: Vec<String>,
    projects: Vec<String>,
}

impl RecordStore {
    /// Create an empty store with no scope restriction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `records`.
    pub fn with_records(records: Vec<CostRecord>) -> Self {
        let mut store = Self::new();
        store.load(records);
        store
    }

    /// Replace the raw record set.
    pub fn load(&mut self, records: Vec<CostRecord>) {
        info!(count = records.len(), "loading cost records");
        self.records = records;
        self.recompute_unique();
    }

    /// Narrow to one account, or lift the restriction with [`AccountScope::All`].
    pub fn set_account_scope(&mut self, account: AccountScope) {
        debug!(%account, "account scope changed");
        self.scope.account = account;
        self.recompute_unique();
    }

    /// Narrow to one billing month, or lift the restriction with `None`.
    pub fn set_month_scope(&mut self, month: Option<BillingMonth>) {
        debug!(?month, "billing month scope changed");
        self.scope.month = month;
        self.recompute_unique();
    }

    /// Current scope.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// All raw records, in load order.
    pub fn records(&self) -> &[CostRecord] {
        &self.records
    }

    /// Records passing the scope, in load order.
    pub fn scoped(&self) -> Vec<&CostRecord> {
        self.records.iter().filter(|r| self.scope.matches(r)).collect()
    }

    /// Distinct accounts across all raw records.
    pub fn accounts(&self) -> &[String] {
        &self.accounts
    }

    /// Distinct model ids across the scoped records.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Distinct projects across the scoped records.
    pub fn projects(&self) -> &[String] {
        &self.projects
    }

    /// Number of raw records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are loaded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn recompute_unique(&mut self) {
        self.accounts = unique_sorted(self.records.iter().map(|r| r.account.as_str()));
        let scoped = self.scoped();
        let models = unique_sorted(scoped.iter().map(|r| r.model_id.as_str()));
        let projects = unique_sorted(scoped.iter().map(|r| r.project.as_str()));
        self.models = models;
        self.projects = projects;
        debug!(
            accounts = self.accounts.len(),
            models = self.models.len(),
            projects = self.projects.len(),
            "unique value lists recomputed"
        );
    }
}

/// Deduplicate and sort with [`locale_cmp`], dropping empty strings.
pub fn unique_sorted<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let distinct: BTreeSet<&str> = values.into_iter().filter(|v| !v.is_empty()).collect();
    let mut out: Vec<String> = distinct.into_iter().map(str::to_string).collect();
    out.sort_by(|a, b| locale_cmp(a, b));
    out
}
