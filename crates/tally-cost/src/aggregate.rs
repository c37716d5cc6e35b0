//! Headline totals and chart series over the visible records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tally_core::config::DEFAULT_EXTRAPOLATION_FACTOR;
use tracing::debug;

use crate::models::CostRecord;
use crate::palette::Palette;

/// Which metric a total or chart series represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricAxis {
    Cost,
    Tokens,
    Gpu,
}

impl MetricAxis {
    /// Values contributed per project in a chart series.
    ///
    /// Tokens chart input and output as separate stacked series.
    pub fn values_per_project(&self) -> usize {
        match self {
            MetricAxis::Tokens => 2,
            MetricAxis::Cost | MetricAxis::Gpu => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricAxis::Cost => "cost",
            MetricAxis::Tokens => "tokens",
            MetricAxis::Gpu => "gpu",
        }
    }
}

impl fmt::Display for MetricAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cost" => Ok(MetricAxis::Cost),
            "tokens" => Ok(MetricAxis::Tokens),
            "gpu" => Ok(MetricAxis::Gpu),
            other => Err(format!("unknown metric axis '{other}' (expected cost, tokens or gpu)")),
        }
    }
}

/// Headline total for one axis, with the default ×30 cost projection.
pub fn totals_by_metric(records: &[&CostRecord], axis: MetricAxis) -> f64 {
    metric_total(records, axis, DEFAULT_EXTRAPOLATION_FACTOR)
}

/// Headline total for one axis.
///
/// Cost is the visible daily cost multiplied by `extrapolation_factor` to
/// give a monthly projection. Tokens sum input and output. Missing GPU
/// minutes count as zero.
pub fn metric_total(records: &[&CostRecord], axis: MetricAxis, extrapolation_factor: f64) -> f64 {
    match axis {
        MetricAxis::Cost => records.iter().map(|r| r.cost).sum::<f64>() * extrapolation_factor,
        MetricAxis::Tokens => records.iter().map(|r| r.total_tokens() as f64).sum(),
        MetricAxis::Gpu => records.iter().map(|r| r.gpu.unwrap_or(0.0)).sum(),
    }
}

/// Every headline KPI at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// Summed cost of the visible records
    pub cost: f64,
    /// `cost` multiplied by the extrapolation factor
    pub projected_cost: f64,
    pub tokens_in: i64,
    pub tokens_out: i64,
    pub gpu_minutes: f64,
    pub inference_count: i64,
    pub record_count: usize,
    /// Mean over records that report a latency
    pub mean_latency_ms: Option<f64>,
}

impl Totals {
    pub fn from_records(records: &[&CostRecord], extrapolation_factor: f64) -> Self {
        let mut totals = Self {
            record_count: records.len(),
            ..Self::default()
        };
        let mut latency_sum = 0.0;
        let mut latency_count = 0usize;

        for r in records {
            totals.cost += r.cost;
            totals.tokens_in = totals.tokens_in.saturating_add(r.tokens_in);
            totals.tokens_out = totals.tokens_out.saturating_add(r.tokens_out);
            totals.gpu_minutes += r.gpu.unwrap_or(0.0);
            totals.inference_count = totals.inference_count.saturating_add(r.inference_count);
            if let Some(latency) = r.latency {
                latency_sum += latency;
                latency_count += 1;
            }
        }

        totals.projected_cost = totals.cost * extrapolation_factor;
        if latency_count > 0 {
            totals.mean_latency_ms = Some(latency_sum / latency_count as f64);
        }
        totals
    }

    /// Total tokens (input + output), saturating at `i64::MAX`.
    pub fn total_tokens(&self) -> i64 {
        self.tokens_in.saturating_add(self.tokens_out)
    }
}

/// Per-project sums for one model, aligned with `projects`.
///
/// Projects without matching records contribute zeros, so the result length
/// is always `projects.len() * axis.values_per_project()`. For tokens the
/// result is interleaved `[in_0, out_0, in_1, out_1, ...]`.
pub fn per_model_per_project(
    records: &[&CostRecord],
    projects: &[String],
    model_id: &str,
    axis: MetricAxis,
) -> Vec<f64> {
    let width = axis.values_per_project();
    let mut values = vec![0.0; projects.len() * width];

    for r in records.iter().filter(|r| r.model_id == model_id) {
        let Some(slot) = projects.iter().position(|p| *p == r.project) else {
            continue;
        };
        let base = slot * width;
        match axis {
            MetricAxis::Cost => values[base] += r.cost,
            MetricAxis::Gpu => values[base] += r.gpu.unwrap_or(0.0),
            MetricAxis::Tokens => {
                values[base] += r.tokens_in as f64;
                values[base + 1] += r.tokens_out as f64;
            }
        }
    }
    values
}

/// One chart series: a model's per-project values and its colour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub model_id: String,
    pub color: String,
    pub values: Vec<f64>,
}

/// A series for every model, in `models` order.
pub fn chart_series(
    records: &[&CostRecord],
    projects: &[String],
    models: &[String],
    axis: MetricAxis,
    palette: &Palette,
) -> Vec<ChartSeries> {
    let series: Vec<ChartSeries> = models
        .iter()
        .enumerate()
        .map(|(index, model_id)| ChartSeries {
            model_id: model_id.clone(),
            color: palette.color_at(index).to_string(),
            values: per_model_per_project(records, projects, model_id, axis),
        })
        .collect();
    debug!(%axis, series = series.len(), projects = projects.len(), "chart series computed");
    series
}
