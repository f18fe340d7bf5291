//! Before-snapshot arena and patch planning.

use logop_core::{ResourceKey, Tracked};
use rustc_hash::FxHashMap;
use serde_json::Value as Json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::diff::status_patch;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("snapshotting {key}: {source}")]
    Snapshot {
        key: ResourceKey,
        #[source]
        source: serde_json::Error,
    },
}

/// One dirty object: its status changed since registration.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchRequest {
    pub key: ResourceKey,
    pub before: Json,
    pub after: Json,
    /// The status merge patch derived from `before` and `after`.
    pub patch: Json,
}

/// Outcome of planning: what must be written and what is already in sync.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Plan {
    pub requests: Vec<PatchRequest>,
    pub unchanged: Vec<ResourceKey>,
}

impl Plan {
    pub fn is_noop(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Captures an immutable snapshot of every object before it is mutated.
///
/// Registration order is preserved; registering a key twice keeps the first
/// snapshot.
#[derive(Debug, Default)]
pub struct PatchPlanner {
    order: Vec<ResourceKey>,
    before: FxHashMap<ResourceKey, Json>,
}

impl PatchPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the key was already registered.
    pub fn register(&mut self, obj: &dyn Tracked) -> Result<bool, PlanError> {
        let key = obj.key();
        if self.before.contains_key(&key) {
            return Ok(false);
        }
        let snap = obj.snapshot().map_err(|source| PlanError::Snapshot { key: key.clone(), source })?;
        self.order.push(key.clone());
        self.before.insert(key, snap);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.before.contains_key(key)
    }

    /// Pair each registered snapshot with the object's current value.
    pub fn plan<'a, I>(self, current: I) -> Result<Plan, PlanError>
    where
        I: IntoIterator<Item = &'a dyn Tracked>,
    {
        let mut after: FxHashMap<ResourceKey, Json> = FxHashMap::default();
        for obj in current {
            let key = obj.key();
            if !self.before.contains_key(&key) {
                debug!(key = %key, "not registered for patching; ignoring");
                continue;
            }
            let snap = obj.snapshot().map_err(|source| PlanError::Snapshot { key: key.clone(), source })?;
            after.entry(key).or_insert(snap);
        }

        let PatchPlanner { order, mut before } = self;
        let mut plan = Plan::default();
        for key in order {
            let Some(b) = before.remove(&key) else { continue };
            let Some(a) = after.remove(&key) else {
                warn!(key = %key, "registered object vanished before planning");
                continue;
            };
            match status_patch(&b, &a) {
                Some(patch) => plan.requests.push(PatchRequest { key, before: b, after: a, patch }),
                None => plan.unchanged.push(key),
            }
        }
        Ok(plan)
    }
}
