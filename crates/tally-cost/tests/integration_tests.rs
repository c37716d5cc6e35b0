//! Integration tests for tally-cost with mock record files.

use std::io::Write;

use tally_cost::{
    load_records_file, per_model_per_project, totals_by_metric, AccountScope, Action,
    BillingMonth, CostError, CostRecord, DashboardState, MetricAxis, RecordField, SortState,
    SpecialHandling,
};
use tempfile::{tempdir, NamedTempFile};

/// Create a mock record file with the given suffix.
fn create_mock_file(content: &str, suffix: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(suffix).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Usage export for two accounts over two months.
const USAGE_JSON: &str = r#"[
  {"id":"u1","account":"acme","project":"search","modelProvider":"openai","modelId":"gpt-4o",
   "billingType":"on-demand","inferenceDate":"2024-03-02T10:00:00Z","inferenceCount":40,
   "tokensIn":1200,"tokensOut":300,"gpu":null,"latency":850.0,"cost":0.42,"tags":["prod"]},
  {"id":"u2","account":"acme","project":"chat","modelProvider":"anthropic","modelId":"claude-sonnet",
   "billingType":"reserved","inferenceDate":"2024-03-05","inferenceCount":12,
   "tokensIn":800,"tokensOut":900,"latency":1200.0,"cost":0.61},
  {"id":"u3","account":"globex","project":"chat","modelProvider":"meta","modelId":"llama-3-70b",
   "billingType":"on-demand","inferenceDate":"2024-04-01","inferenceCount":5,
   "tokensIn":100,"tokensOut":50,"gpu":12.5,"cost":0.2,"tags":[]},
  {"id":"u4","account":"acme","project":"search","modelProvider":"openai","modelId":"gpt-4o",
   "billingType":"reserved","inferenceDate":"2024-04-03","inferenceCount":8,
   "tokensIn":400,"tokensOut":100,"cost":0.1}
]"#;

fn visible_ids(state: &DashboardState) -> Vec<String> {
    state.visible().iter().map(|r| r.id.clone()).collect()
}

#[test]
fn test_load_json_file_into_dashboard() {
    let file = create_mock_file(USAGE_JSON, ".json");
    let records = load_records_file(file.path()).unwrap();
    assert_eq!(records.len(), 4);

    let state = DashboardState::default().reduce(Action::Load(records));
    let view = state.view(MetricAxis::Cost);

    assert_eq!(view.accounts, vec!["acme", "globex"]);
    assert_eq!(view.models, vec!["claude-sonnet", "gpt-4o", "llama-3-70b"]);
    assert_eq!(view.projects, vec!["chat", "search"]);
    // Default order: project ascending, stable within a project
    let ids: Vec<_> = view.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["u2", "u3", "u1", "u4"]);
    assert!((view.totals.projected_cost - 30.0 * 1.33).abs() < 1e-9);
    assert_eq!(view.totals.gpu_minutes, 12.5);
}

#[test]
fn test_load_jsonl_skips_bad_lines() {
    let content = "{\"id\":\"a\",\"project\":\"x\",\"cost\":1}\n{broken\n{\"id\":\"b\",\"project\":\"y\"}\n";
    let file = create_mock_file(content, ".jsonl");
    let records = load_records_file(file.path()).unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_missing_file_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.json");
    match load_records_file(&path) {
        Err(CostError::Io { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_invalid_payload_is_validation_error() {
    let file = create_mock_file(r#"{"data": []}"#, ".json");
    assert!(matches!(
        load_records_file(file.path()),
        Err(CostError::Validation(_))
    ));
}

#[test]
fn test_cost_total_scenario() {
    let records = vec![
        CostRecord::new("1", "acme", "A", "gpt").with_cost(1.0),
        CostRecord::new("2", "acme", "B", "gpt").with_cost(2.0),
    ];
    let view: Vec<&CostRecord> = records.iter().collect();
    assert_eq!(totals_by_metric(&view, MetricAxis::Cost), 90.0);
}

#[test]
fn test_project_filter_scenario() {
    let state = DashboardState::default()
        .reduce(Action::Load(vec![
            CostRecord::new("1", "acme", "A", "gpt").with_cost(1.0),
            CostRecord::new("2", "acme", "B", "gpt").with_cost(2.0),
        ]))
        .reduce(Action::ToggleOption {
            field: RecordField::Project,
            label: "A".into(),
        });

    assert_eq!(visible_ids(&state), vec!["1"]);
    assert_eq!(state.view(MetricAxis::Cost).active_filter_count, 1);
}

#[test]
fn test_sort_cycle_scenario() {
    let sort = Action::Sort {
        field: RecordField::Cost,
        handling: None,
    };
    let state = DashboardState::default().reduce(Action::Load(vec![
        CostRecord::new("1", "acme", "B", "gpt").with_cost(1.0),
        CostRecord::new("2", "acme", "A", "gpt").with_cost(2.0),
    ]));

    let state = state.reduce(sort.clone());
    assert_eq!(state.sort_state(), SortState::ascending(RecordField::Cost));
    assert_eq!(visible_ids(&state), vec!["1", "2"]);

    let state = state.reduce(sort.clone());
    assert_eq!(state.sort_state().field, Some(RecordField::Cost));
    assert!(state.sort_state().is_desc);
    assert_eq!(visible_ids(&state), vec!["2", "1"]);

    let state = state.reduce(sort);
    assert_eq!(state.sort_state().field, None);
    // Back to project-ascending
    assert_eq!(visible_ids(&state), vec!["2", "1"]);
}

#[test]
fn test_tokens_series_scenario() {
    let records = vec![
        CostRecord::new("1", "acme", "A", "gpt").with_tokens(10, 5),
        CostRecord::new("2", "acme", "B", "claude").with_tokens(3, 3),
    ];
    let view: Vec<&CostRecord> = records.iter().collect();
    let projects = vec!["A".to_string(), "B".to_string()];
    assert_eq!(
        per_model_per_project(&view, &projects, "gpt", MetricAxis::Tokens),
        vec![10.0, 5.0, 0.0, 0.0]
    );
}

#[test]
fn test_filters_always_yield_subset() {
    let file = create_mock_file(USAGE_JSON, ".json");
    let records = load_records_file(file.path()).unwrap();
    let all: Vec<String> = records.iter().map(|r| r.id.clone()).collect();

    let mut state = DashboardState::default().reduce(Action::Load(records));
    let toggles = [
        (RecordField::BillingType, "reserved"),
        (RecordField::ModelProvider, "openai"),
        (RecordField::Project, "chat"),
        (RecordField::ModelProvider, "openai"),
    ];
    for (field, label) in toggles {
        state = state.reduce(Action::ToggleOption {
            field,
            label: label.into(),
        });
        assert!(visible_ids(&state).iter().all(|id| all.contains(id)));
    }
    // reserved AND chat
    assert_eq!(visible_ids(&state), vec!["u2"]);

    let state = state.reduce(Action::ClearAll);
    assert_eq!(state.visible().len(), all.len());
}

#[test]
fn test_scopes_combine() {
    let file = create_mock_file(USAGE_JSON, ".json");
    let records = load_records_file(file.path()).unwrap();

    let state = DashboardState::default()
        .reduce(Action::Load(records))
        .reduce(Action::SetAccountScope("acme".parse::<AccountScope>().unwrap()))
        .reduce(Action::SetMonthScope(BillingMonth::new(2024, 4)));

    assert_eq!(visible_ids(&state), vec!["u4"]);
    let view = state.view(MetricAxis::Gpu);
    assert_eq!(view.projects, vec!["search"]);
    assert_eq!(view.models, vec!["gpt-4o"]);
    assert_eq!(view.series.len(), 1);
    assert_eq!(view.series[0].values, vec![0.0]);
}

#[test]
fn test_date_sort_descending() {
    let file = create_mock_file(USAGE_JSON, ".json");
    let records = load_records_file(file.path()).unwrap();

    let state = DashboardState::default()
        .reduce(Action::Load(records))
        .reduce(Action::Sort {
            field: RecordField::InferenceDate,
            handling: Some(SpecialHandling::Date),
        })
        .reduce(Action::Sort {
            field: RecordField::InferenceDate,
            handling: Some(SpecialHandling::Date),
        });

    assert_eq!(visible_ids(&state), vec!["u4", "u3", "u2", "u1"]);
}

#[test]
fn test_series_length_matches_projects_for_every_axis() {
    let file = create_mock_file(USAGE_JSON, ".json");
    let records = load_records_file(file.path()).unwrap();
    let state = DashboardState::default().reduce(Action::Load(records));

    for axis in [MetricAxis::Cost, MetricAxis::Tokens, MetricAxis::Gpu] {
        let view = state.view(axis);
        for series in &view.series {
            assert_eq!(
                series.values.len(),
                view.projects.len() * axis.values_per_project()
            );
        }
    }
}

#[test]
fn test_view_serializes_to_json() {
    let file = create_mock_file(USAGE_JSON, ".json");
    let records = load_records_file(file.path()).unwrap();
    let view = DashboardState::default()
        .reduce(Action::Load(records))
        .view(MetricAxis::Tokens);

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["axis"], "tokens");
    assert_eq!(json["records"][0]["modelId"], "claude-sonnet");
    assert!(json["series"][0]["color"].as_str().unwrap().starts_with("rgba("));
}
