//! tally - cost dashboard for model usage records
//!
//! Loads a usage export, applies account/month scope, filters and sorting,
//! and prints the resulting table, headline totals and chart series.
//!
//! ## Usage
//!
//! ```bash
//! # Summarize an export
//! tally --records usage.json
//!
//! # Narrow to one account and month, filter by project, sort by cost descending
//! tally --records usage.json --account acme --month 2024-03 \
//!       --filter project=search --sort cost --sort cost
//!
//! # Token chart series as JSON
//! tally --records usage.json --axis tokens --json
//! ```

mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tally_core::{init_logging, LogGuard, TallyConfig};
use tally_cost::{
    load_records_file, AccountScope, Action, BillingMonth, DashboardState, MetricAxis,
    RecordField, Settings, SpecialHandling,
};
use tracing::{error, info};

/// tally cost dashboard
///
/// Filter, sort and aggregate model usage records from a JSON export.
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Usage export to load (.json array or .jsonl)
    #[arg(short, long)]
    records: PathBuf,

    /// Configuration file (defaults to ~/.tally/config.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Restrict to one account ("All" lifts the restriction)
    #[arg(short, long)]
    account: Option<String>,

    /// Restrict to one billing month (YYYY-MM)
    #[arg(short, long)]
    month: Option<BillingMonth>,

    /// Activate a filter option, as FIELD=VALUE (repeatable)
    #[arg(short, long = "filter", value_parser = parse_filter)]
    filters: Vec<(RecordField, String)>,

    /// Sort request, as FIELD or FIELD:date / FIELD:tags; repeating a field
    /// advances its ascending/descending/unsorted cycle
    #[arg(short, long = "sort", value_parser = parse_sort)]
    sorts: Vec<(RecordField, Option<SpecialHandling>)>,

    /// Metric for chart series: cost, tokens or gpu
    #[arg(long, default_value = "cost")]
    axis: MetricAxis,

    /// Maximum table rows to print
    #[arg(long, default_value_t = 50)]
    limit: usize,

    /// Emit the full dashboard view as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.tally/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("tally failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> tally_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose > 0)
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => TallyConfig::from_yaml(path),
        None => TallyConfig::load_default(),
    }
    .map_err(|e| match e.guidance() {
        Some(hint) => anyhow::anyhow!("{e}\n  hint: {hint}"),
        None => anyhow::anyhow!(e),
    })?;
    let settings = Settings::from_config(&config).context("invalid configuration")?;

    let records = load_records_file(&cli.records)
        .map_err(|e| anyhow::anyhow!(e.friendly_message()))?;
    info!(count = records.len(), path = %cli.records.display(), "starting tally");

    let state = build_state(cli, settings, records);
    let view = state.view(cli.axis);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", report::render(&view, cli.limit));
    }
    Ok(())
}

/// Translate CLI arguments into reducer actions.
fn build_state(
    cli: &Cli,
    settings: Settings,
    records: Vec<tally_cost::CostRecord>,
) -> DashboardState {
    let mut actions = vec![Action::Load(records)];
    if let Some(account) = &cli.account {
        let scope = account
            .parse::<AccountScope>()
            .unwrap_or(AccountScope::All);
        actions.push(Action::SetAccountScope(scope));
    }
    if cli.month.is_some() {
        actions.push(Action::SetMonthScope(cli.month));
    }
    actions.extend(cli.filters.iter().map(|(field, label)| Action::ToggleOption {
        field: *field,
        label: label.clone(),
    }));
    actions.extend(
        cli.sorts
            .iter()
            .map(|(field, handling)| Action::Sort {
                field: *field,
                handling: *handling,
            }),
    );

    actions
        .into_iter()
        .fold(DashboardState::new(settings), DashboardState::reduce)
}

fn parse_filter(s: &str) -> Result<(RecordField, String), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{s}'"))?;
    let field = field.trim().parse::<RecordField>().map_err(|e| e.to_string())?;
    Ok((field, value.to_string()))
}

fn parse_sort(s: &str) -> Result<(RecordField, Option<SpecialHandling>), String> {
    let (field, handling) = match s.split_once(':') {
        Some((field, "date")) => (field, Some(SpecialHandling::Date)),
        Some((field, "tags")) => (field, Some(SpecialHandling::Tags)),
        Some((_, other)) => return Err(format!("unknown sort handling '{other}' (expected date or tags)")),
        None => (s, None),
    };
    let field = field.trim().parse::<RecordField>().map_err(|e| e.to_string())?;
    Ok((field, handling))
}
