//! Cascade loader: dependent collections of a created, updated or rescanned
//! parent.
//!
//! Children are fetched per parent (`<parent path>/<parent uid>/<child path>`)
//! and reconciled with their own type's strategy. Cascades never move sync
//! markers; a child's freshness follows its parent's.

use crate::engine::RunContext;
use crate::error::SyncResult;
use crate::fetcher::RemoteFetcher;
use crate::report::TypeReport;
use crmcache_storage::CacheStore;
use crmcache_types::{EntityDescriptor, RecordId};
use tracing::{debug, trace};

impl<F, S> RunContext<'_, F, S>
where
    F: RemoteFetcher + ?Sized,
    S: CacheStore + ?Sized,
{
    /// Reconciles the children of `parent_uid`, if its type declares any.
    pub(crate) async fn cascade(
        &mut self,
        parent: &EntityDescriptor,
        parent_uid: RecordId,
        report: &mut TypeReport,
    ) -> SyncResult<()> {
        if !parent.has_children() {
            return Ok(());
        }
        Box::pin(self.load_children(parent, parent_uid, report)).await
    }

    async fn load_children(
        &mut self,
        parent: &EntityDescriptor,
        parent_uid: RecordId,
        report: &mut TypeReport,
    ) -> SyncResult<()> {
        for child in &parent.child_types {
            trace!(
                entity_type = %parent.name,
                uid = %parent_uid,
                child_type = %child.name,
                "Loading children"
            );
            let Some(records) = self
                .fetcher
                .fetch_children(&parent.api_path, parent_uid, &child.api_path)
                .await?
            else {
                debug!(
                    entity_type = %parent.name,
                    uid = %parent_uid,
                    child_type = %child.name,
                    "Child collection not found"
                );
                continue;
            };

            for payload in records {
                let outcome = self.reconcile(child, payload, false, report).await?;
                report.record_child(outcome);
            }
        }
        Ok(())
    }
}
