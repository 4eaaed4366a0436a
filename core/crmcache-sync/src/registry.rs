//! Registered entity types and per-run rescan budget.

use crate::accessors::RecordAccessors;
use crate::config::SyncConfig;
use crmcache_types::EntityDescriptor;
use serde::Serialize;
use tracing::{debug, warn};

/// Ordered set of entity types known to the cache.
///
/// Registration order is sync order: the top-level pass walks types in the
/// order they were registered.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    descriptors: Vec<EntityDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a type. Returns false (and changes nothing) if a type with
    /// the same name is already registered.
    pub fn register(&mut self, descriptor: EntityDescriptor) -> bool {
        if let Some(existing) = self.get(&descriptor.name) {
            if *existing != descriptor {
                warn!(
                    entity_type = %descriptor.name,
                    "Ignoring conflicting registration of an already registered type"
                );
            }
            return false;
        }
        debug!(entity_type = %descriptor.name, "Registered entity type");
        self.descriptors.push(descriptor);
        true
    }

    /// All registered types, in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.descriptors.iter()
    }

    /// Types the top-level pass iterates.
    pub fn standalone(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.descriptors.iter().filter(|d| d.standalone)
    }

    /// Types that take part in rescan marking.
    pub fn rescan_eligible(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.descriptors.iter().filter(|d| d.rescan_eligible)
    }

    /// Looks a type up by its exact name.
    pub fn get(&self, name: &str) -> Option<&EntityDescriptor> {
        self.descriptors.iter().find(|d| d.name == name)
    }

    /// Resolves an operator-supplied name (description, property or type name).
    pub fn find(&self, needle: &str) -> Option<&EntityDescriptor> {
        self.descriptors.iter().find(|d| d.matches(needle))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl FromIterator<EntityDescriptor> for Registry {
    fn from_iter<I: IntoIterator<Item = EntityDescriptor>>(iter: I) -> Self {
        let mut registry = Registry::new();
        for descriptor in iter {
            registry.register(descriptor);
        }
        registry
    }
}

/// How many rescans the current run may still perform.
///
/// The counter starts at 1 and a rescan is allowed while `used <= max`, so a
/// budget of `max` permits exactly `max` rescans. Once a rescan is refused the
/// budget stays exhausted until [`RescanBudget::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RescanBudget {
    used: u32,
    max: u32,
    exhausted: bool,
}

impl RescanBudget {
    pub fn new(max: u32) -> Self {
        Self {
            used: 1,
            max,
            exhausted: false,
        }
    }

    /// Claims one rescan. Returns false, and marks the budget exhausted, when
    /// none are left.
    pub fn try_consume(&mut self) -> bool {
        if self.used <= self.max {
            self.used = self.used.saturating_add(1);
            true
        } else {
            self.exhausted = true;
            false
        }
    }

    /// Restores the full budget.
    pub fn reset(&mut self) {
        self.used = 1;
        self.exhausted = false;
    }

    /// Current counter value (starts at 1).
    pub fn counter(&self) -> u32 {
        self.used
    }

    /// Rescans performed since the last reset.
    pub fn consumed(&self) -> u32 {
        self.used - 1
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn remaining(&self) -> u32 {
        self.max.saturating_add(1).saturating_sub(self.used)
    }

    /// True once a rescan was refused for lack of budget.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Sync configuration, registered types and the rescan budget of the
/// current run.
///
/// The engine owns its manager and only hands it out by shared reference,
/// so one manager never serves two runs at the same time.
#[derive(Debug, Clone)]
pub struct SyncManager {
    pub(crate) config: SyncConfig,
    pub(crate) registry: Registry,
    pub(crate) budget: RescanBudget,
}

impl SyncManager {
    /// Creates a manager with no registered types.
    pub fn new(config: SyncConfig) -> Self {
        Self::with_registry(config, Registry::new())
    }

    pub fn with_registry(config: SyncConfig, registry: Registry) -> Self {
        let budget = RescanBudget::new(config.max_rescan_count);
        Self {
            config,
            registry,
            budget,
        }
    }

    /// Registers a type; duplicates are ignored.
    pub fn register(&mut self, descriptor: EntityDescriptor) -> bool {
        self.registry.register(descriptor)
    }

    /// Clears per-run state before a new run.
    pub fn reset(&mut self) {
        self.budget = RescanBudget::new(self.config.max_rescan_count);
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn budget(&self) -> &RescanBudget {
        &self.budget
    }

    /// Builds the property-name accessor map for the registered types.
    pub fn accessors(&self) -> RecordAccessors {
        RecordAccessors::from_registry(&self.registry)
    }
}
