use log::debug;

use crate::error::{PrevUpdaterError, Result};
use crate::providers::ado::types::PipelineRun;

/// The two runs whose linked work items are diffed.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPair {
    /// Most recent completed run on the selected branch
    pub last: PipelineRun,
    /// Baseline run: previous on the same branch, else latest later run on the default branch
    pub previous: PipelineRun,
}

/// Picks the last run and the run to compare it with.
///
/// `runs` must be ordered newest first. Returns `Ok(None)` when no run is
/// completed.
///
/// # Errors
///
/// - `BranchNotFound` when `branch` matches no completed run
/// - `NoPreviousRun` when the selected run is alone on its branch and no later
///   run exists on the default branch
pub fn select_runs(
    runs: &[PipelineRun],
    default_branch: &str,
    branch: Option<&str>,
) -> Result<Option<RunPair>> {
    let completed: Vec<&PipelineRun> = runs.iter().filter(|run| run.is_completed()).collect();

    if completed.is_empty() {
        return Ok(None);
    }

    let index = match branch.filter(|b| !b.is_empty()) {
        Some(filter) => completed
            .iter()
            .position(|run| run.ref_name().contains(filter))
            .ok_or_else(|| PrevUpdaterError::BranchNotFound(filter.to_string()))?,
        None => 0,
    };
    let last = completed[index];

    let mut same_ref = completed.iter().filter(|run| run.ref_name() == last.ref_name());
    if let (Some(first), Some(second)) = (same_ref.next(), same_ref.next()) {
        debug!(
            "Comparing run {} with previous run {} on {}",
            first.id,
            second.id,
            last.ref_name()
        );
        return Ok(Some(RunPair {
            last: (*first).clone(),
            previous: (*second).clone(),
        }));
    }

    let previous = completed[index + 1..]
        .iter()
        .find(|run| run.ref_name() == default_branch)
        .ok_or_else(|| PrevUpdaterError::NoPreviousRun(last.ref_name().to_string()))?;

    debug!(
        "Run {} is alone on {}, falling back to run {} on default branch {default_branch}",
        last.id,
        last.ref_name(),
        previous.id
    );

    Ok(Some(RunPair {
        last: last.clone(),
        previous: (*previous).clone(),
    }))
}
