use std::sync::OnceLock;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{done, failed, heading, pending};

/// Progress tracking for the three phases of an update run
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_phase_1(pipeline_id: u64) -> Self {
        bars().suspend(|| eprintln!("{}", heading("⚙️ ", "Phases")));
        let pb = create_spinner(
            pending(format!("Phase 1/3: Fetching runs of pipeline {pipeline_id}")).to_string(),
        );
        Self { pb }
    }

    pub fn finish_phase_1_start_phase_2(self, run_count: usize) -> Self {
        self.pb.finish_with_message(
            done(format!("Phase 1/3: Fetched {run_count} runs ✓")).to_string(),
        );
        let pb = create_spinner(pending("Phase 2/3: Fetching work items").to_string());
        Self { pb }
    }

    pub fn finish_phase_2_start_phase_3(self, work_item_count: usize) -> Self {
        self.pb.finish_with_message(
            done(format!("Phase 2/3: Fetched {work_item_count} work items ✓")).to_string(),
        );
        let pb = create_spinner(pending("Phase 3/3: Updating work item fields").to_string());
        Self { pb }
    }

    pub fn finish_phase_3(self, failure_count: usize) {
        if failure_count == 0 {
            self.pb.finish_with_message(
                done("Phase 3/3: Work items updated successfully ✓").to_string(),
            );
        } else {
            self.pb.finish_with_message(
                failed(format!("Phase 3/3: {failure_count} operation(s) failed ✗")).to_string(),
            );
        }
        bars().suspend(|| eprintln!());
    }

    /// Stops the current phase early, leaving `reason` on screen.
    pub fn abandon(self, reason: &str) {
        self.pb
            .abandon_with_message(pending(format!("{reason} ⏹")).to_string());
        bars().suspend(|| eprintln!());
    }
}

/// Runs `f` with the spinners cleared from stderr, redrawing them afterwards.
///
/// Anything else writing to stderr while a phase is running goes through here.
pub fn suspend_spinners<R>(f: impl FnOnce() -> R) -> R {
    bars().suspend(f)
}

fn bars() -> &'static MultiProgress {
    static BARS: OnceLock<MultiProgress> = OnceLock::new();
    BARS.get_or_init(|| MultiProgress::with_draw_target(ProgressDrawTarget::stderr()))
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = bars().add(ProgressBar::new_spinner());
    if let Ok(style) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
