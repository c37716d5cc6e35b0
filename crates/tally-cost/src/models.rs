//! Data models for cost records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A single usage/cost record as delivered by the usage API.
///
/// Records are immutable once loaded. Absent or `null` fields decode to
/// their empty value and are skipped by grouping, sums and comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostRecord {
    /// Opaque record identifier
    pub id: String,

    /// Billing account the usage was charged to
    #[serde(default, deserialize_with = "null_as_default")]
    pub account: String,

    /// Project the inference ran under
    #[serde(default, deserialize_with = "null_as_default")]
    pub project: String,

    /// Model vendor (e.g., "openai", "anthropic")
    #[serde(default, deserialize_with = "null_as_default")]
    pub model_provider: String,

    /// Model identifier (e.g., "gpt-4o")
    #[serde(default, deserialize_with = "null_as_default")]
    pub model_id: String,

    /// Billing type (e.g., "on-demand", "reserved")
    #[serde(default, deserialize_with = "null_as_default")]
    pub billing_type: String,

    /// When the inference ran
    #[serde(default, deserialize_with = "flexible_timestamp")]
    pub inference_date: Option<DateTime<Utc>>,

    /// Number of inference calls covered by this record
    #[serde(default, deserialize_with = "null_as_default")]
    pub inference_count: i64,

    /// Input tokens
    #[serde(default, deserialize_with = "null_as_default")]
    pub tokens_in: i64,

    /// Output tokens
    #[serde(default, deserialize_with = "null_as_default")]
    pub tokens_out: i64,

    /// GPU time in minutes
    #[serde(default)]
    pub gpu: Option<f64>,

    /// Latency in milliseconds
    #[serde(default)]
    pub latency: Option<f64>,

    /// Cost in USD
    #[serde(default, deserialize_with = "null_as_default")]
    pub cost: f64,

    /// Free-form tags
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
}

impl CostRecord {
    /// Create a record with the identifying fields set and zero usage.
    pub fn new(
        id: impl Into<String>,
        account: impl Into<String>,
        project: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            account: account.into(),
            project: project.into(),
            model_provider: String::new(),
            model_id: model_id.into(),
            billing_type: String::new(),
            inference_date: None,
            inference_count: 0,
            tokens_in: 0,
            tokens_out: 0,
            gpu: None,
            latency: None,
            cost: 0.0,
            tags: Vec::new(),
        }
    }

    /// Set the model provider.
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.model_provider = provider.into();
        self
    }

    /// Set the billing type.
    pub fn with_billing_type(mut self, billing_type: impl Into<String>) -> Self {
        self.billing_type = billing_type.into();
        self
    }

    /// Set the inference timestamp.
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.inference_date = Some(date);
        self
    }

    /// Set token counts.
    pub fn with_tokens(mut self, tokens_in: i64, tokens_out: i64) -> Self {
        self.tokens_in = tokens_in;
        self.tokens_out = tokens_out;
        self
    }

    /// Set the cost in USD.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    /// Set GPU minutes.
    pub fn with_gpu(mut self, minutes: f64) -> Self {
        self.gpu = Some(minutes);
        self
    }

    /// Set latency in milliseconds.
    pub fn with_latency(mut self, ms: f64) -> Self {
        self.latency = Some(ms);
        self
    }

    /// Set the inference count.
    pub fn with_inference_count(mut self, count: i64) -> Self {
        self.inference_count = count;
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Total tokens (input + output), saturating at `i64::MAX`.
    pub fn total_tokens(&self) -> i64 {
        self.tokens_in.saturating_add(self.tokens_out)
    }

    /// Whether the record falls inside the given billing month.
    pub fn in_month(&self, month: BillingMonth) -> bool {
        self.inference_date
            .is_some_and(|d| d.year() == month.year && d.month() == month.month)
    }

    /// Typed value of a field, used by the sort comparators.
    pub fn value(&self, field: RecordField) -> FieldValue<'_> {
        match field {
            RecordField::Id => FieldValue::Text(&self.id),
            RecordField::Account => FieldValue::Text(&self.account),
            RecordField::Project => FieldValue::Text(&self.project),
            RecordField::ModelProvider => FieldValue::Text(&self.model_provider),
            RecordField::ModelId => FieldValue::Text(&self.model_id),
            RecordField::BillingType => FieldValue::Text(&self.billing_type),
            RecordField::InferenceDate => FieldValue::Date(self.inference_date),
            RecordField::InferenceCount => FieldValue::Number(Some(self.inference_count as f64)),
            RecordField::TokensIn => FieldValue::Number(Some(self.tokens_in as f64)),
            RecordField::TokensOut => FieldValue::Number(Some(self.tokens_out as f64)),
            RecordField::Gpu => FieldValue::Number(self.gpu),
            RecordField::Latency => FieldValue::Number(self.latency),
            RecordField::Cost => FieldValue::Number(Some(self.cost)),
            RecordField::Tags => FieldValue::Tags(&self.tags),
        }
    }

    /// String values a filter group on `field` can match this record by.
    ///
    /// Empty strings and missing values yield nothing; tags yield one entry
    /// per tag.
    pub fn filter_values(&self, field: RecordField) -> Vec<String> {
        match self.value(field) {
            FieldValue::Text(s) if s.is_empty() => Vec::new(),
            FieldValue::Text(s) => vec![s.to_string()],
            FieldValue::Number(Some(n)) => vec![format_number(n)],
            FieldValue::Number(None) => Vec::new(),
            FieldValue::Date(Some(d)) => vec![d.format("%Y-%m-%d").to_string()],
            FieldValue::Date(None) => Vec::new(),
            FieldValue::Tags(tags) => tags.iter().filter(|t| !t.is_empty()).cloned().collect(),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// A borrowed, typed view of one record field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Text(&'a str),
    Number(Option<f64>),
    Date(Option<DateTime<Utc>>),
    Tags(&'a [String]),
}

/// Names a field of [`CostRecord`] for grouping and sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordField {
    Id,
    Account,
    Project,
    ModelProvider,
    ModelId,
    BillingType,
    InferenceDate,
    InferenceCount,
    TokensIn,
    TokensOut,
    Gpu,
    Latency,
    Cost,
    Tags,
}

impl RecordField {
    /// All fields, in table column order.
    pub fn all() -> &'static [RecordField] {
        &[
            RecordField::Id,
            RecordField::Account,
            RecordField::Project,
            RecordField::ModelProvider,
            RecordField::ModelId,
            RecordField::BillingType,
            RecordField::InferenceDate,
            RecordField::InferenceCount,
            RecordField::TokensIn,
            RecordField::TokensOut,
            RecordField::Gpu,
            RecordField::Latency,
            RecordField::Cost,
            RecordField::Tags,
        ]
    }

    /// Wire name (camelCase, as in the JSON records).
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::Id => "id",
            RecordField::Account => "account",
            RecordField::Project => "project",
            RecordField::ModelProvider => "modelProvider",
            RecordField::ModelId => "modelId",
            RecordField::BillingType => "billingType",
            RecordField::InferenceDate => "inferenceDate",
            RecordField::InferenceCount => "inferenceCount",
            RecordField::TokensIn => "tokensIn",
            RecordField::TokensOut => "tokensOut",
            RecordField::Gpu => "gpu",
            RecordField::Latency => "latency",
            RecordField::Cost => "cost",
            RecordField::Tags => "tags",
        }
    }

    /// Human-readable name for group headers and table columns.
    pub fn display_name(&self) -> &'static str {
        match self {
            RecordField::Id => "ID",
            RecordField::Account => "Account",
            RecordField::Project => "Project",
            RecordField::ModelProvider => "Model Provider",
            RecordField::ModelId => "Model",
            RecordField::BillingType => "Billing Type",
            RecordField::InferenceDate => "Date",
            RecordField::InferenceCount => "Inferences",
            RecordField::TokensIn => "Tokens In",
            RecordField::TokensOut => "Tokens Out",
            RecordField::Gpu => "GPU (min)",
            RecordField::Latency => "Latency (ms)",
            RecordField::Cost => "Cost",
            RecordField::Tags => "Tags",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a field name does not match any [`RecordField`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown record field: {0}")]
pub struct UnknownField(pub String);

impl FromStr for RecordField {
    type Err = UnknownField;

    /// Accepts camelCase (`modelId`), snake_case (`model_id`) and kebab-case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        RecordField::all()
            .iter()
            .copied()
            .find(|f| f.as_str().to_ascii_lowercase() == wanted)
            .ok_or_else(|| UnknownField(s.to_string()))
    }
}

/// A calendar month used as a billing scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingMonth {
    pub year: i32,
    /// Month (1-12)
    pub month: u32,
}

impl BillingMonth {
    /// Create a billing month; `None` when `month` is outside 1-12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }
}

impl fmt::Display for BillingMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Error returned for a billing month that is not `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid billing month '{0}', expected YYYY-MM")]
pub struct InvalidMonth(pub String);

impl FromStr for BillingMonth {
    type Err = InvalidMonth;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        BillingMonth::new(year, month).ok_or_else(err)
    }
}

/// Parse a timestamp in any of the formats the usage API emits.
///
/// Accepts RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and a
/// bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn flexible_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_field_from_str() {
        assert_eq!("modelId".parse::<RecordField>().unwrap(), RecordField::ModelId);
        assert_eq!("model_id".parse::<RecordField>().unwrap(), RecordField::ModelId);
        assert_eq!("billing-type".parse::<RecordField>().unwrap(), RecordField::BillingType);
        assert_eq!("COST".parse::<RecordField>().unwrap(), RecordField::Cost);
        assert!("colour".parse::<RecordField>().is_err());
    }

    #[test]
    fn test_record_field_names_round_trip() {
        for field in RecordField::all() {
            assert_eq!(field.as_str().parse::<RecordField>().unwrap(), *field);
        }
    }

    #[test]
    fn test_billing_month_parse() {
        let month: BillingMonth = "2024-03".parse().unwrap();
        assert_eq!(month, BillingMonth { year: 2024, month: 3 });
        assert_eq!(month.to_string(), "2024-03");
        assert!("2024-13".parse::<BillingMonth>().is_err());
        assert!("March".parse::<BillingMonth>().is_err());
    }

    #[test]
    fn test_in_month() {
        let record = CostRecord::new("r1", "acme", "A", "gpt")
            .with_date(Utc.with_ymd_and_hms(2024, 3, 31, 23, 0, 0).unwrap());
        assert!(record.in_month(BillingMonth { year: 2024, month: 3 }));
        assert!(!record.in_month(BillingMonth { year: 2024, month: 4 }));

        let undated = CostRecord::new("r2", "acme", "A", "gpt");
        assert!(!undated.in_month(BillingMonth { year: 2024, month: 3 }));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let midnight = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-05"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-05T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-05T02:00:00+02:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-03-05T00:00:00"), Some(midnight));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_filter_values() {
        let record = CostRecord::new("r1", "acme", "", "gpt")
            .with_tag("prod")
            .with_tag("batch")
            .with_inference_count(3);

        assert_eq!(record.filter_values(RecordField::ModelId), vec!["gpt"]);
        assert!(record.filter_values(RecordField::Project).is_empty());
        assert_eq!(record.filter_values(RecordField::Tags), vec!["prod", "batch"]);
        assert_eq!(record.filter_values(RecordField::InferenceCount), vec!["3"]);
        assert!(record.filter_values(RecordField::Gpu).is_empty());
    }

    #[test]
    fn test_total_tokens() {
        let record = CostRecord::new("r1", "acme", "A", "gpt").with_tokens(10, 5);
        assert_eq!(record.total_tokens(), 15);
    }
}
