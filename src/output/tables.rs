use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};

/// Empty table with the report's column headers.
pub fn work_item_table(columns: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            columns
                .iter()
                .map(|column| Cell::new(*column).fg(Color::Cyan)),
        );
    table
}

/// Green when the field was written, yellow when only planned, plain otherwise.
pub fn action_cell(changed: bool, dry_run: bool) -> Cell {
    match (changed, dry_run) {
        (true, false) => Cell::new("updated").fg(Color::Green),
        (true, true) => Cell::new("would update").fg(Color::Yellow),
        (false, _) => Cell::new("unchanged"),
    }
}

pub fn recorded_version_cell(recorded: Option<&str>) -> Cell {
    match recorded {
        Some(version) => Cell::new(version),
        None => Cell::new("-").fg(Color::DarkGrey),
    }
}
