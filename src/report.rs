use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::aggregate::{AggregationResult, Metric};
use crate::drill::Level;
use crate::session::Dashboard;

fn format_metric(metric: &Metric) -> String {
    match metric {
        Metric::Count(count) => format!("{count} students"),
        Metric::Rate(rate) => format!("{:.1}% ({}/{})", rate.percent(), rate.hits, rate.total),
    }
}

fn write_entries(output: &mut String, result: &AggregationResult) {
    if result.is_empty() {
        let _ = writeln!(output, "No data for this selection.");
        return;
    }
    for entry in &result.entries {
        let _ = writeln!(output, "- {}: {}", entry.label, format_metric(&entry.metric));
    }
    if result.total_groups > result.len() {
        let _ = writeln!(
            output,
            "- ({} more not shown)",
            result.total_groups - result.len()
        );
    }
}

pub fn build_report(dashboard: &Dashboard, generated_at: NaiveDateTime) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Academic Body Results Presentation");
    let _ = writeln!(output, "Generated {}", generated_at.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(output);

    let _ = writeln!(output, "## Selection");
    for node in &dashboard.filters {
        let _ = writeln!(
            output,
            "- {}: {}",
            node.id,
            node.selected.as_deref().unwrap_or("(none)")
        );
    }
    if let Some(node) = dashboard.empty_scope {
        let _ = writeln!(output, "No rows match the selection from {node} onwards.");
    }

    for panel in &dashboard.panels {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {} ({})", panel.id.title(), panel.total);
        write_entries(&mut output, &panel.result);
    }

    for drill in &dashboard.drills {
        let _ = writeln!(output);
        match (drill.view.level, drill.view.label.as_deref()) {
            (Level::Detail, Some(label)) => {
                let _ = writeln!(output, "## Student Distribution ({label})");
            }
            _ => {
                let _ = writeln!(output, "## Decision Distribution ({})", drill.total);
            }
        }
        write_entries(&mut output, &drill.view.result);
    }

    let _ = writeln!(output);
    let table = &dashboard.table;
    match table.decision.as_deref() {
        Some(decision) => {
            let _ = writeln!(output, "## {decision} ({})", table.students);
            let _ = writeln!(output, "| Reg. number | Name | Programme | Gender | Year | Semester |");
            let _ = writeln!(output, "|---|---|---|---|---|---|");
            for row in &table.rows {
                let _ = writeln!(
                    output,
                    "| {} | {} {} | {} | {} | {} | {} |",
                    row.regnum,
                    row.firstnames,
                    row.surname,
                    row.programmecode,
                    row.gender,
                    row.academicyear,
                    row.semester
                );
            }
        }
        None => {
            let _ = writeln!(output, "## Students");
            let _ = writeln!(output, "No students for this selection.");
        }
    }

    if let Some(student) = &dashboard.selected {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Student Information");
        let _ = writeln!(output, "- Registration Number: {}", student.regnum);
        let _ = writeln!(output, "- Name: {} {}", student.firstnames, student.surname);
        let _ = writeln!(output, "- Programme: {}", student.programmecode);
        let _ = writeln!(output, "- Decision: {}", student.decision);
        for module in &student.modules {
            let _ = writeln!(
                output,
                "- {}: {} ({})",
                module.module,
                module.mark_text(),
                module.grade
            );
        }
    }

    output
}
