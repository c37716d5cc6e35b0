//! Toggleable filter groups built from the scoped record set.
//!
//! Each group is an OR-set over one field; groups combine with AND. A group
//! with no active option imposes no constraint.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{CostRecord, RecordField};
use crate::store::unique_sorted;

/// Fields grouped when no configuration says otherwise.
pub const DEFAULT_GROUP_FIELDS: [RecordField; 4] = [
    RecordField::Project,
    RecordField::BillingType,
    RecordField::ModelProvider,
    RecordField::ModelId,
];

/// One toggleable value within a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub label: String,
    pub is_active: bool,
    /// Display-only cursor marker
    pub is_selected: bool,
}

impl FilterOption {
    fn new(label: String) -> Self {
        Self {
            label,
            is_active: false,
            is_selected: false,
        }
    }
}

/// The filter options for one record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterGroup {
    pub field: RecordField,
    pub name: String,
    pub options: Vec<FilterOption>,
    /// Collapsed in the UI; no filtering effect
    pub is_closed: bool,
}

impl FilterGroup {
    /// Labels of the active options.
    pub fn active_labels(&self) -> impl Iterator<Item = &str> {
        self.options
            .iter()
            .filter(|o| o.is_active)
            .map(|o| o.label.as_str())
    }

    /// Number of active options.
    pub fn active_count(&self) -> usize {
        self.options.iter().filter(|o| o.is_active).count()
    }

    /// Whether `record` satisfies this group.
    pub fn matches(&self, record: &CostRecord) -> bool {
        if self.active_count() == 0 {
            return true;
        }
        let values = record.filter_values(self.field);
        self.active_labels()
            .any(|label| values.iter().any(|v| v == label))
    }

    fn option_mut(&mut self, label: &str) -> Option<&mut FilterOption> {
        self.options.iter_mut().find(|o| o.label == label)
    }
}

/// Build one group per field from the distinct values in `records`.
///
/// Options are sorted, inactive and unselected; groups start collapsed.
pub fn build_groups(records: &[&CostRecord], fields: &[RecordField]) -> Vec<FilterGroup> {
    let groups: Vec<FilterGroup> = fields
        .iter()
        .map(|&field| {
            let values: Vec<String> = records.iter().flat_map(|r| r.filter_values(field)).collect();
            let options = unique_sorted(values.iter().map(String::as_str))
                .into_iter()
                .map(FilterOption::new)
                .collect();
            FilterGroup {
                field,
                name: field.display_name().to_string(),
                options,
                is_closed: true,
            }
        })
        .collect();
    debug!(groups = groups.len(), "filter groups rebuilt");
    groups
}

/// Flip `is_active` on one option of one group.
///
/// Returns false when the group or option does not exist.
pub fn toggle_option(groups: &mut [FilterGroup], field: RecordField, label: &str) -> bool {
    match group_mut(groups, field).and_then(|g| g.option_mut(label)) {
        Some(option) => {
            option.is_active = !option.is_active;
            debug!(%field, label, active = option.is_active, "filter toggled");
            true
        }
        None => false,
    }
}

/// Mark one option as selected, clearing the marker on its siblings.
pub fn select_option(groups: &mut [FilterGroup], field: RecordField, label: &str) -> bool {
    let Some(group) = group_mut(groups, field) else {
        return false;
    };
    if !group.options.iter().any(|o| o.label == label) {
        return false;
    }
    for option in &mut group.options {
        option.is_selected = option.label == label;
    }
    true
}

/// Flip the collapsed flag of a group.
pub fn toggle_group_collapse(groups: &mut [FilterGroup], field: RecordField) -> bool {
    match group_mut(groups, field) {
        Some(group) => {
            group.is_closed = !group.is_closed;
            true
        }
        None => false,
    }
}

/// Deactivate every option in one group.
pub fn clear_group(groups: &mut [FilterGroup], field: RecordField) -> bool {
    match group_mut(groups, field) {
        Some(group) => {
            group.options.iter_mut().for_each(|o| o.is_active = false);
            true
        }
        None => false,
    }
}

/// Deactivate every option in every group.
pub fn clear_all(groups: &mut [FilterGroup]) {
    for group in groups.iter_mut() {
        group.options.iter_mut().for_each(|o| o.is_active = false);
    }
}

/// Total active options across all groups.
pub fn active_filter_count(groups: &[FilterGroup]) -> usize {
    groups.iter().map(FilterGroup::active_count).sum()
}

/// Records satisfying every group.
///
/// With no active filter the input is returned unchanged.
pub fn apply_filters<'a>(records: Vec<&'a CostRecord>, groups: &[FilterGroup]) -> Vec<&'a CostRecord> {
    if active_filter_count(groups) == 0 {
        return records;
    }
    records
        .into_iter()
        .filter(|record| groups.iter().all(|g| g.matches(record)))
        .collect()
}

fn group_mut(groups: &mut [FilterGroup], field: RecordField) -> Option<&mut FilterGroup> {
    groups.iter_mut().find(|g| g.field == field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<CostRecord> {
        vec![
            CostRecord::new("1", "acme", "A", "gpt")
                .with_provider("openai")
                .with_billing_type("on-demand"),
            CostRecord::new("2", "acme", "B", "gpt")
                .with_provider("openai")
                .with_billing_type("reserved"),
            CostRecord::new("3", "acme", "B", "claude")
                .with_provider("anthropic")
                .with_billing_type("on-demand"),
        ]
    }

    fn ids(records: &[&CostRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_build_groups() {
        let records = records();
        let view: Vec<&CostRecord> = records.iter().collect();
        let groups = build_groups(&view, &DEFAULT_GROUP_FIELDS);

        assert_eq!(groups.len(), 4);
        assert_eq!(groups[0].name, "Project");
        let labels: Vec<_> = groups[3].options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["claude", "gpt"]);
        assert!(groups.iter().all(|g| g.is_closed));
        assert_eq!(active_filter_count(&groups), 0);
    }

    #[test]
    fn test_no_active_filters_is_identity() {
        let records = records();
        let view: Vec<&CostRecord> = records.iter().collect();
        let groups = build_groups(&view, &DEFAULT_GROUP_FIELDS);
        assert_eq!(ids(&apply_filters(view.clone(), &groups)), ids(&view));
    }

    #[test]
    fn test_single_project_filter() {
        let records = records();
        let view: Vec<&CostRecord> = records.iter().collect();
        let mut groups = build_groups(&view, &DEFAULT_GROUP_FIELDS);

        assert!(toggle_option(&mut groups, RecordField::Project, "A"));
        assert_eq!(active_filter_count(&groups), 1);
        assert_eq!(ids(&apply_filters(view, &groups)), vec!["1"]);
    }

    #[test]
    fn test_or_within_and_across_groups() {
        let records = records();
        let view: Vec<&CostRecord> = records.iter().collect();
        let mut groups = build_groups(&view, &DEFAULT_GROUP_FIELDS);

        toggle_option(&mut groups, RecordField::Project, "A");
        toggle_option(&mut groups, RecordField::Project, "B");
        assert_eq!(apply_filters(view.clone(), &groups).len(), 3);

        toggle_option(&mut groups, RecordField::BillingType, "on-demand");
        assert_eq!(ids(&apply_filters(view.clone(), &groups)), vec!["1", "3"]);

        toggle_option(&mut groups, RecordField::ModelId, "claude");
        assert_eq!(ids(&apply_filters(view, &groups)), vec!["3"]);
    }

    #[test]
    fn test_toggle_twice_restores() {
        let records = records();
        let view: Vec<&CostRecord> = records.iter().collect();
        let mut groups = build_groups(&view, &DEFAULT_GROUP_FIELDS);
        let original = groups.clone();

        toggle_option(&mut groups, RecordField::ModelId, "gpt");
        toggle_option(&mut groups, RecordField::ModelId, "gpt");
        assert_eq!(groups, original);
    }

    #[test]
    fn test_toggle_unknown_is_noop() {
        let records = records();
        let view: Vec<&CostRecord> = records.iter().collect();
        let mut groups = build_groups(&view, &DEFAULT_GROUP_FIELDS);
        let original = groups.clone();

        assert!(!toggle_option(&mut groups, RecordField::Project, "Z"));
        assert!(!toggle_option(&mut groups, RecordField::Account, "acme"));
        assert_eq!(groups, original);
    }

    #[test]
    fn test_clear_group_and_all() {
        let records = records();
        let view: Vec<&CostRecord> = records.iter().collect();
        let mut groups = build_groups(&view, &DEFAULT_GROUP_FIELDS);

        toggle_option(&mut groups, RecordField::Project, "A");
        toggle_option(&mut groups, RecordField::ModelId, "gpt");
        assert!(clear_group(&mut groups, RecordField::Project));
        assert_eq!(active_filter_count(&groups), 1);

        clear_all(&mut groups);
        assert_eq!(active_filter_count(&groups), 0);
    }

    #[test]
    fn test_collapse_and_select_are_display_only() {
        let records = records();
        let view: Vec<&CostRecord> = records.iter().collect();
        let mut groups = build_groups(&view, &DEFAULT_GROUP_FIELDS);

        assert!(toggle_group_collapse(&mut groups, RecordField::Project));
        assert!(!groups[0].is_closed);
        assert!(select_option(&mut groups, RecordField::Project, "B"));
        assert!(select_option(&mut groups, RecordField::Project, "A"));
        let selected: Vec<_> = groups[0].options.iter().map(|o| o.is_selected).collect();
        assert_eq!(selected, vec![true, false]);

        assert_eq!(active_filter_count(&groups), 0);
        assert_eq!(apply_filters(view, &groups).len(), 3);
    }

    #[test]
    fn test_tags_group_matches_any_tag() {
        let records = vec![
            CostRecord::new("1", "acme", "A", "gpt").with_tag("prod").with_tag("eu"),
            CostRecord::new("2", "acme", "A", "gpt").with_tag("dev"),
            CostRecord::new("3", "acme", "A", "gpt"),
        ];
        let view: Vec<&CostRecord> = records.iter().collect();
        let mut groups = build_groups(&view, &[RecordField::Tags]);
        let labels: Vec<_> = groups[0].options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["dev", "eu", "prod"]);

        toggle_option(&mut groups, RecordField::Tags, "eu");
        assert_eq!(ids(&apply_filters(view, &groups)), vec!["1"]);
    }
}
