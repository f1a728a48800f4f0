use std::fmt::Write;

use crate::report::RunReport;

use super::styling::{done, heading, muted, pending, value};
use super::tables::{action_cell, recorded_version_cell, work_item_table};

/// Prints the outcome of an update run to stdout.
///
/// Shows the compared runs followed by one row per work item with the
/// previously recorded version, what happened to the version field and the
/// resulting integration build history.
pub fn print_report(report: &RunReport) {
    println!("{}", render_report(report));
}

fn render_report(report: &RunReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{}", heading("📋", "Overview"));
    let _ = writeln!(
        output,
        "  {} {}\n  {} {} {}\n  {} {} {}\n  {} {}\n  {} {}\n",
        muted("Pipeline:"),
        value(report.pipeline_id),
        muted("Last run:"),
        value(report.last_run_id),
        done(&report.summary.version),
        muted("Compared with run:"),
        value(report.previous_run_id),
        muted(&report.summary.previous_version),
        muted("Branch:"),
        value(&report.summary.source_branch),
        muted("Version field:"),
        value(&report.field_path),
    );

    if report.outcomes.is_empty() {
        let _ = writeln!(output, "  {}", muted("No work items linked to these runs."));
        return output;
    }

    let _ = writeln!(output, "{}", heading("🗂️", "Work items"));

    let mut table = work_item_table(&[
        "ID",
        "Title",
        "Recorded version",
        "Version field",
        "Integration build",
        "History",
    ]);

    for outcome in &report.outcomes {
        table.add_row(vec![
            comfy_table::Cell::new(outcome.id),
            comfy_table::Cell::new(&outcome.title),
            recorded_version_cell(outcome.recorded_version.as_deref()),
            action_cell(outcome.version_updated, report.dry_run),
            comfy_table::Cell::new(&outcome.integration_build),
            action_cell(outcome.history_updated, report.dry_run),
        ]);
    }

    let _ = writeln!(output, "{table}");

    let verb = if report.dry_run { "would be" } else { "were" };
    let _ = writeln!(
        output,
        "\n  {} versions and {} histories {verb} updated across {} work items",
        pending(report.updated_versions()),
        pending(report.updated_histories()),
        pending(report.outcomes.len()),
    );

    output
}
