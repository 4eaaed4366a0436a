//! Sync engine: the top-level pass over every registered type.
//!
//! A run walks the standalone types in registration order, pages through
//! each remote collection and reconciles every record against the cache:
//!
//! 1. unknown id: create, then cascade into children
//! 2. remote timestamp strictly newer: update, then cascade
//! 3. flagged for rescan: if the budget allows, cascade, then update
//! 4. otherwise: leave untouched
//!
//! Primitive types skip the comparison and are overwritten on every fetch.
//! Once every type is done the rescan sweep and the prune run, unless the
//! rescan budget ran out on the way.
//!
//! Runs are strictly sequential. Every run method takes `&mut self`, so one
//! engine never serves two runs at once; sharing a store between engines
//! running concurrently is unsupported.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::fetcher::{PageWindow, RemoteFetcher};
use crate::registry::{RescanBudget, SyncManager};
use crate::report::{Outcome, ScanMode, SyncReport, TypeReport};
use chrono::{DateTime, Utc};
use crmcache_storage::{CacheStore, FlagCounts};
use crmcache_types::{CachedRecord, EntityDescriptor, SyncMarker, SyncStrategy, format_cutoff};
use tracing::{debug, info, trace};

/// Synchronizes a local cache with the remote API.
pub struct SyncEngine<F, S> {
    manager: SyncManager,
    fetcher: F,
    store: S,
}

impl<F: RemoteFetcher, S: CacheStore> SyncEngine<F, S> {
    pub fn new(manager: SyncManager, fetcher: F, store: S) -> Self {
        Self {
            manager,
            fetcher,
            store,
        }
    }

    pub fn manager(&self) -> &SyncManager {
        &self.manager
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates the cache schema if it does not exist yet.
    pub fn init(&self) -> SyncResult<()> {
        self.store.create_schema()?;
        Ok(())
    }

    /// Drops every cached record and marker, and clears run state.
    pub fn reset_cache(&mut self) -> SyncResult<()> {
        self.store.reset()?;
        self.manager.reset();
        info!("Cache reset");
        Ok(())
    }

    /// Flag counts of every registered type, in registration order.
    pub fn flag_counts(&self) -> SyncResult<Vec<(String, FlagCounts)>> {
        self.manager
            .registry
            .descriptors()
            .map(|d| Ok((d.name.clone(), self.store.flag_counts(&d.name)?)))
            .collect()
    }

    /// Runs a full sync or a quickscan.
    pub async fn sync(&mut self, mode: ScanMode) -> SyncResult<SyncReport> {
        self.sync_at(mode, Utc::now()).await
    }

    /// Runs a sync with an explicit retrieval timestamp, which becomes every
    /// touched type's sync marker.
    pub async fn sync_at(
        &mut self,
        mode: ScanMode,
        retrieved_at: DateTime<Utc>,
    ) -> SyncResult<SyncReport> {
        self.manager.config.validate()?;
        self.manager.reset();

        let SyncManager {
            config,
            registry,
            budget,
        } = &mut self.manager;
        let registry = &*registry;
        let mut ctx = RunContext {
            config,
            fetcher: &self.fetcher,
            store: &self.store,
            budget,
            retrieved_at,
        };
        let mut report = SyncReport::new(mode, retrieved_at, *ctx.budget);

        info!(?mode, types = registry.len(), "Starting sync");
        for descriptor in registry.standalone() {
            let type_report = ctx.load_type(descriptor, mode).await?;
            report.types.push(type_report);
        }

        if ctx.budget.is_exhausted() {
            info!(
                max = ctx.budget.max(),
                "Rescan budget exhausted, deferring sweep and prune to the next run"
            );
        } else {
            report.sweep = Some(ctx.sweep(registry).await?);
            if !ctx.budget.is_exhausted() {
                report.pruned = Some(ctx.prune(registry)?);
            }
        }

        report.budget = *ctx.budget;
        info!(
            mutations = report.mutations(),
            rescans = report.budget.consumed(),
            "Sync finished"
        );
        Ok(report)
    }
}

/// State of one run, passed explicitly through the pass, the cascade and the
/// sweep.
pub(crate) struct RunContext<'a, F: ?Sized, S: ?Sized> {
    pub(crate) config: &'a SyncConfig,
    pub(crate) fetcher: &'a F,
    pub(crate) store: &'a S,
    pub(crate) budget: &'a mut RescanBudget,
    pub(crate) retrieved_at: DateTime<Utc>,
}

impl<F, S> RunContext<'_, F, S>
where
    F: RemoteFetcher + ?Sized,
    S: CacheStore + ?Sized,
{
    /// Pages through one type and reconciles every record, then moves the
    /// type's sync marker.
    async fn load_type(
        &mut self,
        descriptor: &EntityDescriptor,
        mode: ScanMode,
    ) -> SyncResult<TypeReport> {
        let mut report = TypeReport::new(&descriptor.name);
        let since = self.date_filter(descriptor, mode)?;
        let top = self.config.page_size;

        let mut skip = 0;
        loop {
            let window = PageWindow { skip, top };
            let Some(page) = self
                .fetcher
                .fetch_page(&descriptor.api_path, window, since.as_deref())
                .await?
            else {
                debug!(entity_type = %descriptor.name, "Collection not found, nothing to retrieve");
                break;
            };
            report.pages += 1;
            debug!(
                entity_type = %descriptor.name,
                skip,
                top,
                total_count = page.total_count,
                records = page.records.len(),
                "Downloaded page"
            );

            let empty = page.records.is_empty();
            for payload in page.records {
                let outcome = self.reconcile(descriptor, payload, true, &mut report).await?;
                report.record(outcome);
            }

            skip += top;
            if self.config.debug || empty || skip >= page.total_count {
                break;
            }
        }

        self.store
            .save_marker(&SyncMarker::new(&descriptor.name, self.retrieved_at))?;
        report.since = since;
        info!(
            entity_type = %descriptor.name,
            created = report.created,
            updated = report.updated,
            rescanned = report.rescanned,
            deferred = report.rescans_deferred,
            "Type synchronized"
        );
        Ok(report)
    }

    /// Cutoff for the type's fetch: `None` means every record.
    fn date_filter(
        &self,
        descriptor: &EntityDescriptor,
        mode: ScanMode,
    ) -> SyncResult<Option<String>> {
        if matches!(descriptor.strategy(), SyncStrategy::Primitive) || mode == ScanMode::Full {
            debug!(entity_type = %descriptor.name, "Retrieving all records");
            return Ok(None);
        }
        match self.store.marker(&descriptor.name)? {
            Some(marker) => {
                let cutoff = format_cutoff(marker.quickscan_cutoff());
                debug!(
                    entity_type = %descriptor.name,
                    last_retrieved = %marker.last_retrieved,
                    %cutoff,
                    "Quickscan since last pass"
                );
                Ok(Some(cutoff))
            }
            None => {
                debug!(
                    entity_type = %descriptor.name,
                    "Quickscan: no previous pass, retrieving all records"
                );
                Ok(None)
            }
        }
    }

    /// Reconciles one fetched record using the type's strategy.
    ///
    /// `budgeted` rescans draw on the run's rescan budget; rescans met while
    /// cascading do not.
    pub(crate) async fn reconcile(
        &mut self,
        descriptor: &EntityDescriptor,
        payload: serde_json::Value,
        budgeted: bool,
        report: &mut TypeReport,
    ) -> SyncResult<Outcome> {
        match descriptor.strategy() {
            SyncStrategy::Primitive => self.reconcile_primitive(descriptor, payload),
            SyncStrategy::Main { .. } => {
                self.reconcile_main(descriptor, payload, budgeted, report)
                    .await
            }
        }
    }

    /// Overwrites the cached copy unconditionally.
    fn reconcile_primitive(
        &self,
        descriptor: &EntityDescriptor,
        payload: serde_json::Value,
    ) -> SyncResult<Outcome> {
        let uid = descriptor
            .uid_of(&payload)
            .map_err(SyncError::invalid_record(&descriptor.name))?;
        let existed = self.store.get(&descriptor.name, uid)?.is_some();

        let label = descriptor.label_of(&payload);
        let record = CachedRecord::new(
            &descriptor.name,
            uid,
            payload,
            self.retrieved_at,
            self.retrieved_at,
        );
        self.store.upsert(&record)?;

        if existed {
            trace!(entity_type = %descriptor.name, %uid, name = %label, "Record refreshed");
            Ok(Outcome::Refreshed)
        } else {
            debug!(entity_type = %descriptor.name, %uid, name = %label, "New record");
            Ok(Outcome::Created)
        }
    }

    async fn reconcile_main(
        &mut self,
        descriptor: &EntityDescriptor,
        payload: serde_json::Value,
        budgeted: bool,
        report: &mut TypeReport,
    ) -> SyncResult<Outcome> {
        let invalid = || SyncError::invalid_record(&descriptor.name);
        let uid = descriptor.uid_of(&payload).map_err(invalid())?;
        let updated_at = descriptor
            .updated_at_of(&payload)
            .map_err(invalid())?
            .ok_or_else(|| {
                invalid()(crmcache_types::Error::MissingField(
                    descriptor.update_key.clone().unwrap_or_default(),
                ))
            })?;
        let label = descriptor.label_of(&payload);

        let Some(mut cached) = self.store.get(&descriptor.name, uid)? else {
            let record =
                CachedRecord::new(&descriptor.name, uid, payload, updated_at, self.retrieved_at);
            self.store.upsert(&record)?;
            info!(entity_type = %descriptor.name, %uid, name = %label, "New record");
            self.cascade(descriptor, record.uid, report).await?;
            return Ok(Outcome::Created);
        };

        if updated_at > cached.last_updated {
            let previous = cached.last_updated;
            cached.refresh(payload, updated_at, self.retrieved_at);
            self.store.upsert(&cached)?;
            info!(
                entity_type = %descriptor.name,
                %uid,
                name = %label,
                %previous,
                updated = %updated_at,
                "Record needed updating"
            );
            self.cascade(descriptor, uid, report).await?;
            return Ok(Outcome::Updated);
        }

        if !cached.rescan {
            trace!(
                entity_type = %descriptor.name,
                %uid,
                name = %label,
                "Record unchanged, ignoring"
            );
            return Ok(Outcome::Ignored);
        }

        let counter = self.budget.counter();
        if budgeted && !self.budget.try_consume() {
            debug!(
                entity_type = %descriptor.name,
                %uid,
                counter,
                max = self.budget.max(),
                "Rescan requested, but the rescan budget is exhausted"
            );
            return Ok(Outcome::Deferred);
        }

        info!(
            entity_type = %descriptor.name,
            %uid,
            name = %label,
            counter,
            max = self.budget.max(),
            "Rescanning record"
        );
        self.cascade(descriptor, uid, report).await?;
        cached.refresh(payload, updated_at, self.retrieved_at);
        self.store.upsert(&cached)?;
        Ok(Outcome::Rescanned)
    }
}
