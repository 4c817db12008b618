//! Serializable reports printed by the CLI.
use serde::Serialize;

use crate::apply::ApplyOutcome;
use crate::plan::Step;

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub app_name: String,
    pub app_package: String,
    pub from: String,
    pub to: String,
    pub branch: Option<String>,
    pub diff_hash: Option<String>,
    /// The plan was declined, so no file was touched.
    pub cancelled: bool,
    pub entries: Vec<EntryReport>,
}

impl RunSummary {
    pub fn count(&self, outcome: ApplyOutcome) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.outcome == outcome)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub file: String,
    pub outcome: ApplyOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub from: String,
    pub to: String,
    pub source: String,
    pub diff_hash: String,
    pub change_count: usize,
    pub steps: Vec<Step>,
}
