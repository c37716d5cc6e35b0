//! Single-key sorting of the visible record list.
//!
//! Repeated sorts on the same field cycle ascending → descending →
//! unsorted. Unsorted is not "load order": it is project ascending.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{parse_timestamp, CostRecord, FieldValue, RecordField};

/// Comparator overrides that bypass the field-type dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialHandling {
    /// Compare by parsed timestamp
    Date,
    /// Records carrying any value sort before records without
    Tags,
}

/// The active sort key and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    /// Sort field; `None` means the default project order
    pub field: Option<RecordField>,

    /// Descending when true
    pub is_desc: bool,

    /// Comparator override for the field
    pub handling: Option<SpecialHandling>,
}

impl SortState {
    /// Ascending sort on `field`.
    pub fn ascending(field: RecordField) -> Self {
        Self {
            field: Some(field),
            is_desc: false,
            handling: None,
        }
    }

    /// Next state after a sort request on `field`.
    pub fn toggle(self, field: RecordField, handling: Option<SpecialHandling>) -> Self {
        match self.field {
            Some(current) if current == field && !self.is_desc => Self {
                field: Some(field),
                is_desc: true,
                handling,
            },
            Some(current) if current == field => Self::default(),
            _ => Self {
                field: Some(field),
                is_desc: false,
                handling,
            },
        }
    }

    /// Whether an explicit sort is active.
    pub fn is_sorted(&self) -> bool {
        self.field.is_some()
    }
}

/// Locale-style string ordering in three strengths.
///
/// Base letters compare first, ignoring accents and case, so `Équipe`
/// sorts with the `e`s. Ties are broken by accents (unaccented first) and
/// then by case (lowercase first), as root-locale ICU collation does.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| folded(a).cmp(folded(b)))
        .then_with(|| b.nfd().cmp(a.nfd()))
}

fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().flat_map(char::to_lowercase)
}

/// Sort `records` in place according to `state`.
///
/// The sort is stable. Descending order is the reversed ascending result,
/// whichever comparator was used.
pub fn sort_records(records: &mut [&CostRecord], state: &SortState) {
    match state.field {
        None => records.sort_by(|a, b| locale_cmp(&a.project, &b.project)),
        Some(field) => {
            records.sort_by(|a, b| compare_by(a, b, field, state.handling));
            if state.is_desc {
                records.reverse();
            }
        }
    }
    trace!(count = records.len(), ?state, "records sorted");
}

/// Compare two records on one field.
pub fn compare_by(
    a: &CostRecord,
    b: &CostRecord,
    field: RecordField,
    handling: Option<SpecialHandling>,
) -> Ordering {
    match handling {
        Some(SpecialHandling::Date) => timestamp_of(a, field).cmp(&timestamp_of(b, field)),
        Some(SpecialHandling::Tags) => {
            let a_tagged = !a.filter_values(field).is_empty();
            let b_tagged = !b.filter_values(field).is_empty();
            b_tagged.cmp(&a_tagged)
        }
        None => compare_values(a.value(field), b.value(field)),
    }
}

fn compare_values(a: FieldValue<'_>, b: FieldValue<'_>) -> Ordering {
    match (a, b) {
        (FieldValue::Text(a), FieldValue::Text(b)) => locale_cmp(a, b),
        (FieldValue::Number(a), FieldValue::Number(b)) => match (a, b) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (a, b) => a.is_some().cmp(&b.is_some()),
        },
        (FieldValue::Date(a), FieldValue::Date(b)) => a.cmp(&b),
        (FieldValue::Tags(a), FieldValue::Tags(b)) => locale_cmp(&a.join(","), &b.join(",")),
        _ => Ordering::Equal,
    }
}

fn timestamp_of(record: &CostRecord, field: RecordField) -> Option<DateTime<Utc>> {
    match record.value(field) {
        FieldValue::Date(d) => d,
        FieldValue::Text(s) => parse_timestamp(s),
        _ => None,
    }
}
