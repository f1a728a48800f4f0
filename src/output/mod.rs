mod progress;
mod styling;
mod summary;
mod tables;

use styling::{brand, muted};

pub use progress::{suspend_spinners, PhaseProgress};
pub use summary::print_report;

/// Prints the `prev-updater` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        brand("🏷️ prev-updater"),
        muted(env!("CARGO_PKG_VERSION")),
        muted("Forecast version updater for Azure DevOps work items")
    );
}
