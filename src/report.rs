//! Plain-text rendering of a [`DashboardView`].

use std::fmt::Write;

use tally_cost::{DashboardView, MetricAxis, RecordField};

/// Render the whole dashboard as text, printing at most `limit` table rows.
pub fn render(view: &DashboardView, limit: usize) -> String {
    let mut out = String::new();
    render_header(&mut out, view);
    render_totals(&mut out, view);
    render_records(&mut out, view, limit);
    render_series(&mut out, view);
    render_filters(&mut out, view);
    out
}

fn render_header(out: &mut String, view: &DashboardView) {
    let month = view
        .scope
        .month
        .map(|m| m.to_string())
        .unwrap_or_else(|| "all".to_string());
    let sort = match view.sort.field {
        Some(field) if view.sort.is_desc => format!("{} desc", field.display_name()),
        Some(field) => format!("{} asc", field.display_name()),
        None => "default (project)".to_string(),
    };
    let _ = writeln!(
        out,
        "Account: {}  Month: {}  Active filters: {}  Sort: {}",
        view.scope.account, month, view.active_filter_count, sort
    );
    out.push('\n');
}

fn render_totals(out: &mut String, view: &DashboardView) {
    let t = &view.totals;
    let _ = writeln!(out, "Totals");
    let _ = writeln!(out, "  Cost (visible)      ${:.2}", t.cost);
    let _ = writeln!(out, "  Projected monthly   ${:.2}", t.projected_cost);
    let _ = writeln!(out, "  Tokens in / out     {} / {}", t.tokens_in, t.tokens_out);
    let _ = writeln!(out, "  GPU minutes         {:.1}", t.gpu_minutes);
    let _ = writeln!(out, "  Inferences          {}", t.inference_count);
    match t.mean_latency_ms {
        Some(ms) => {
            let _ = writeln!(out, "  Mean latency        {:.0} ms", ms);
        }
        None => {
            let _ = writeln!(out, "  Mean latency        -");
        }
    }
    out.push('\n');
}

fn render_records(out: &mut String, view: &DashboardView, limit: usize) {
    let shown = view.records.len().min(limit);
    let _ = writeln!(out, "Records ({} of {})", shown, view.records.len());

    let columns = [
        RecordField::Project,
        RecordField::Account,
        RecordField::ModelId,
        RecordField::ModelProvider,
        RecordField::BillingType,
        RecordField::InferenceDate,
        RecordField::TokensIn,
        RecordField::TokensOut,
        RecordField::Cost,
    ];
    let headers: Vec<String> = columns.iter().map(|c| c.display_name().to_string()).collect();
    let rows: Vec<Vec<String>> = view
        .records
        .iter()
        .take(limit)
        .map(|r| {
            vec![
                r.project.clone(),
                r.account.clone(),
                r.model_id.clone(),
                r.model_provider.clone(),
                r.billing_type.clone(),
                r.inference_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| "-".to_string()),
                r.tokens_in.to_string(),
                r.tokens_out.to_string(),
                format!("${:.4}", r.cost),
            ]
        })
        .collect();
    out.push_str(&table(&headers, &rows));
    out.push('\n');
}

fn render_series(out: &mut String, view: &DashboardView) {
    let _ = writeln!(out, "Chart: {} by project", view.axis);

    let mut headers = vec!["Model".to_string(), "Color".to_string()];
    for project in &view.projects {
        match view.axis {
            MetricAxis::Tokens => {
                headers.push(format!("{project} in"));
                headers.push(format!("{project} out"));
            }
            MetricAxis::Cost | MetricAxis::Gpu => headers.push(project.clone()),
        }
    }

    let rows: Vec<Vec<String>> = view
        .series
        .iter()
        .map(|s| {
            let mut row = vec![s.model_id.clone(), s.color.clone()];
            row.extend(s.values.iter().map(|v| match view.axis {
                MetricAxis::Cost => format!("{v:.4}"),
                MetricAxis::Tokens => format!("{v:.0}"),
                MetricAxis::Gpu => format!("{v:.1}"),
            }));
            row
        })
        .collect();
    out.push_str(&table(&headers, &rows));
    out.push('\n');
}

fn render_filters(out: &mut String, view: &DashboardView) {
    let _ = writeln!(out, "Filters");
    for group in &view.groups {
        let labels: Vec<String> = group
            .options
            .iter()
            .map(|o| {
                if o.is_active {
                    format!("[{}]", o.label)
                } else {
                    o.label.clone()
                }
            })
            .collect();
        let _ = writeln!(
            out,
            "  {} ({} active): {}",
            group.name,
            group.active_count(),
            labels.join(", ")
        );
    }
}

/// Left-aligned text table with columns sized to their widest cell.
fn table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{cell:<w$}", w = *w))
            .collect();
        format!("  {}\n", padded.join("  ").trim_end())
    };

    let mut out = line(headers);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&line(&rule[..]));
    for row in rows {
        out.push_str(&line(&row[..]));
    }
    out
}
