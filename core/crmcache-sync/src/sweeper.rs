//! Rescan sweeper and prune.
//!
//! After the top-level pass, records still flagged for rescan are re-fetched
//! by id, one budget unit each. A record the remote no longer knows is left
//! dirty; the prune then deletes every dirty record that is no longer waiting
//! for a rescan.

use crate::engine::RunContext;
use crate::error::SyncResult;
use crate::fetcher::RemoteFetcher;
use crate::registry::Registry;
use crate::report::SweepReport;
use crmcache_storage::{CacheStore, RecordFilter, RecordFlags};
use tracing::{Level, debug, info, trace, warn};

impl<F, S> RunContext<'_, F, S>
where
    F: RemoteFetcher + ?Sized,
    S: CacheStore + ?Sized,
{
    /// Drains left-over rescan flags of every rescan-eligible type until the
    /// budget runs out.
    pub(crate) async fn sweep(&mut self, registry: &Registry) -> SyncResult<SweepReport> {
        let mut report = SweepReport::default();

        'types: for descriptor in registry.rescan_eligible() {
            let pending = self
                .store
                .query(&descriptor.name, RecordFilter::RescanPending)?;
            if pending.is_empty() {
                continue;
            }
            debug!(
                entity_type = %descriptor.name,
                records = pending.len(),
                "Rescanning left-over records"
            );

            for record in pending {
                if !self.budget.try_consume() {
                    info!(
                        entity_type = %descriptor.name,
                        uid = %record.uid,
                        counter = self.budget.counter(),
                        max = self.budget.max(),
                        "Rescan budget exhausted, leaving remaining records flagged"
                    );
                    report.stopped_early = true;
                    break 'types;
                }

                let flags = match self
                    .fetcher
                    .fetch_by_id(&descriptor.api_path, record.uid)
                    .await
                {
                    Ok(Some(_)) => {
                        report.confirmed += 1;
                        RecordFlags::CLEAR
                    }
                    Ok(None) => {
                        info!(
                            entity_type = %descriptor.name,
                            uid = %record.uid,
                            "Record not found upstream, marking dirty"
                        );
                        report.missing += 1;
                        RecordFlags::MISSING
                    }
                    Err(e) => {
                        warn!(
                            entity_type = %descriptor.name,
                            uid = %record.uid,
                            error = %e,
                            "Rescan fetch failed, keeping record"
                        );
                        report.errors += 1;
                        RecordFlags::CLEAR
                    }
                };
                self.store
                    .set_flags(&descriptor.name, RecordFilter::Id(record.uid), flags)?;
                report.swept += 1;
            }
        }

        if tracing::enabled!(Level::TRACE) {
            self.log_pending(registry)?;
        }
        Ok(report)
    }

    fn log_pending(&self, registry: &Registry) -> SyncResult<()> {
        for descriptor in registry.rescan_eligible() {
            let counts = self.store.flag_counts(&descriptor.name)?;
            if counts.total == 0 {
                continue;
            }
            trace!(
                entity_type = %descriptor.name,
                rescan = counts.rescan,
                total = counts.total,
                percent = counts.rescan_percent(),
                "Records still flagged for rescan"
            );
        }
        Ok(())
    }

    /// Deletes every unconfirmed record of every registered type.
    pub(crate) fn prune(&self, registry: &Registry) -> SyncResult<usize> {
        let mut pruned = 0;
        for descriptor in registry.descriptors() {
            let removed = self
                .store
                .delete(&descriptor.name, RecordFilter::Unconfirmed)?;
            if removed > 0 {
                info!(entity_type = %descriptor.name, removed, "Pruned unconfirmed records");
            }
            pruned += removed;
        }
        Ok(pruned)
    }
}
