//! Operator-triggered flag changes.

use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use crate::fetcher::RemoteFetcher;
use crate::report::MarkReport;
use chrono::{DateTime, Months, Utc};
use crmcache_storage::{CacheStore, RecordFilter, RecordFlags};
use crmcache_types::EntityDescriptor;
use tracing::{info, warn};

impl<F: RemoteFetcher, S: CacheStore> SyncEngine<F, S> {
    /// Clears both flags on every record of every registered type, dropping
    /// all pending rescans.
    pub fn unmark(&self) -> SyncResult<MarkReport> {
        let mut report = MarkReport::default();
        for descriptor in self.manager().registry().descriptors() {
            let cleared =
                self.store()
                    .set_flags(&descriptor.name, RecordFilter::All, RecordFlags::CLEAR)?;
            info!(entity_type = %descriptor.name, cleared, "Removed rescan marks");
            report.push(&descriptor.name, cleared);
        }
        Ok(report)
    }

    /// Flags every record of `target` for rescan, or of every rescan-eligible
    /// type when `target` is empty.
    pub fn rescan(&self, target: &str) -> SyncResult<MarkReport> {
        self.mark(target, RecordFilter::All)
    }

    /// Like [`SyncEngine::rescan`], limited to records updated during the
    /// last month.
    pub fn rescan_last_month(&self, target: &str) -> SyncResult<MarkReport> {
        self.rescan_last_month_at(target, Utc::now())
    }

    /// Like [`SyncEngine::rescan_last_month`], counting the month back from
    /// `now`.
    pub fn rescan_last_month_at(&self, target: &str, now: DateTime<Utc>) -> SyncResult<MarkReport> {
        let since = now
            .checked_sub_months(Months::new(1))
            .ok_or_else(|| SyncError::Config(format!("cannot count a month back from {now}")))?;
        info!(%since, "Marking records updated since");
        self.mark(target, RecordFilter::UpdatedAfter(since))
    }

    fn mark(&self, target: &str, filter: RecordFilter) -> SyncResult<MarkReport> {
        let mut report = MarkReport::default();
        for descriptor in self.rescan_targets(target)? {
            let marked = self
                .store()
                .set_flags(&descriptor.name, filter, RecordFlags::MARKED)?;
            info!(entity_type = %descriptor.name, marked, "Marked records for rescan");
            report.push(&descriptor.name, marked);
        }
        Ok(report)
    }

    /// Resolves an operator-supplied rescan target. Resolution happens before
    /// any flag is written, so an unknown name changes nothing.
    fn rescan_targets(&self, target: &str) -> SyncResult<Vec<&EntityDescriptor>> {
        let registry = self.manager().registry();
        let target = target.trim();
        if target.is_empty() {
            return Ok(registry.rescan_eligible().collect());
        }

        let descriptor = registry
            .find(target)
            .ok_or_else(|| SyncError::UnknownEntityType(target.to_string()))?;
        if !descriptor.rescan_eligible {
            warn!(entity_type = %descriptor.name, "Type does not take part in rescans");
            return Ok(Vec::new());
        }
        Ok(vec![descriptor])
    }
}
