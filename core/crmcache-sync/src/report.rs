//! Per-run sync reports.

use crate::registry::RescanBudget;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which records the top-level pass asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Every record of every type.
    Full,
    /// Records modified since the type's last pass, minus a day of overlap.
    Quick,
}

/// What reconciliation did with one fetched record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// First sight of the id.
    Created,
    /// Remote timestamp strictly newer than the cached one.
    Updated,
    /// Primitive record overwritten as is.
    Refreshed,
    /// Forced refresh of a record flagged for rescan.
    Rescanned,
    /// Nothing newer and no rescan requested.
    Ignored,
    /// Flagged for rescan, but the budget ran out.
    Deferred,
}

/// Counters for one type's top-level pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeReport {
    pub entity_type: String,
    /// Cutoff used for the pass, if it was incremental.
    pub since: Option<String>,
    pub pages: usize,
    pub created: usize,
    pub updated: usize,
    pub refreshed: usize,
    pub rescanned: usize,
    pub ignored: usize,
    pub rescans_deferred: usize,
    pub children_created: usize,
    pub children_updated: usize,
    pub children_refreshed: usize,
    pub children_ignored: usize,
}

impl TypeReport {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Created => &mut self.created,
            Outcome::Updated => &mut self.updated,
            Outcome::Refreshed => &mut self.refreshed,
            Outcome::Rescanned => &mut self.rescanned,
            Outcome::Ignored => &mut self.ignored,
            Outcome::Deferred => &mut self.rescans_deferred,
        };
        *counter += 1;
    }

    pub(crate) fn record_child(&mut self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Created => &mut self.children_created,
            Outcome::Updated | Outcome::Rescanned => &mut self.children_updated,
            Outcome::Refreshed => &mut self.children_refreshed,
            Outcome::Ignored | Outcome::Deferred => &mut self.children_ignored,
        };
        *counter += 1;
    }

    /// Records written because something changed upstream or a rescan asked
    /// for it. Primitive overwrites are not counted.
    pub fn mutations(&self) -> usize {
        self.created
            + self.updated
            + self.rescanned
            + self.children_created
            + self.children_updated
    }
}

/// Counters for the rescan sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Records taken off the rescan list.
    pub swept: usize,
    /// Found upstream.
    pub confirmed: usize,
    /// Not found upstream, now awaiting pruning.
    pub missing: usize,
    /// Fetch failed; kept as confirmed.
    pub errors: usize,
    /// Stopped because the budget ran out.
    pub stopped_early: bool,
}

/// Outcome of one sync run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
    pub mode: ScanMode,
    pub retrieved_at: DateTime<Utc>,
    pub types: Vec<TypeReport>,
    /// `None` when the budget was exhausted before the sweep.
    pub sweep: Option<SweepReport>,
    /// Records deleted; `None` when pruning was skipped.
    pub pruned: Option<usize>,
    pub budget: RescanBudget,
}

impl SyncReport {
    pub(crate) fn new(mode: ScanMode, retrieved_at: DateTime<Utc>, budget: RescanBudget) -> Self {
        Self {
            mode,
            retrieved_at,
            types: Vec::new(),
            sweep: None,
            pruned: None,
            budget,
        }
    }

    /// Report of one type's top-level pass.
    pub fn type_report(&self, entity_type: &str) -> Option<&TypeReport> {
        self.types.iter().find(|t| t.entity_type == entity_type)
    }

    /// Record writes and deletions the run performed, excluding primitive
    /// overwrites and sync markers. Zero for a repeated run with no upstream
    /// changes.
    pub fn mutations(&self) -> usize {
        let passes: usize = self.types.iter().map(TypeReport::mutations).sum();
        passes + self.sweep.map_or(0, |s| s.swept) + self.pruned.unwrap_or(0)
    }

    /// Whether the budget ran out during the run.
    pub fn rescans_exhausted(&self) -> bool {
        self.budget.is_exhausted()
    }
}

/// Records flagged (or cleared) by a mark operation, per type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MarkReport {
    pub types: Vec<(String, usize)>,
}

impl MarkReport {
    pub(crate) fn push(&mut self, entity_type: &str, records: usize) {
        self.types.push((entity_type.to_string(), records));
    }

    /// Count for one type, if it was touched.
    pub fn get(&self, entity_type: &str) -> Option<usize> {
        self.types
            .iter()
            .find(|(name, _)| name == entity_type)
            .map(|(_, records)| *records)
    }

    pub fn total(&self) -> usize {
        self.types.iter().map(|(_, records)| records).sum()
    }
}
