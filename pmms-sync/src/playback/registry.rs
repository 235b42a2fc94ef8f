//! Entity registry: handle → playback entity
//!
//! The only shared mutable structure in the engine. It is owned by the
//! engine task, so creation and removal are atomic with respect to event
//! processing and no locking is needed.

use std::collections::HashMap;

use pmms_common::events::{Handle, Options};
use tracing::debug;

use super::entity::{EntitySnapshot, PlaybackEntity};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<Handle, PlaybackEntity>,
    /// Last generation handed out; never reused, even across handles
    last_generation: u64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, handle: &Handle) -> Option<&PlaybackEntity> {
        self.entities.get(handle)
    }

    pub fn resolve_mut(&mut self, handle: &Handle) -> Option<&mut PlaybackEntity> {
        self.entities.get_mut(handle)
    }

    /// Resolve only if the current entity for `handle` is `generation`
    ///
    /// Backend callbacks go through here so that events from a torn-down
    /// entity never reach a newer entity reusing the same handle.
    pub fn resolve_generation_mut(
        &mut self,
        handle: &Handle,
        generation: u64,
    ) -> Option<&mut PlaybackEntity> {
        self.entities
            .get_mut(handle)
            .filter(|entity| entity.generation() == generation)
    }

    /// Resolve the entity for `handle`, creating it when absent
    ///
    /// Creation only happens when `options.url` is non-empty; `create`
    /// receives the new entity's generation. Returns `Ok(None)` when there is
    /// nothing to resolve and nothing to create.
    pub fn resolve_or_create<F>(
        &mut self,
        handle: &Handle,
        options: &Options,
        create: F,
    ) -> Result<Option<&mut PlaybackEntity>>
    where
        F: FnOnce(u64) -> Result<PlaybackEntity>,
    {
        if self.entities.contains_key(handle) {
            return Ok(self.entities.get_mut(handle));
        }
        if options.url.trim().is_empty() {
            return Ok(None);
        }

        let generation = self.last_generation + 1;
        let entity = create(generation)?;
        self.last_generation = generation;

        debug!(handle = %handle, generation, "Registered playback entity");
        Ok(Some(self.entities.entry(handle.clone()).or_insert(entity)))
    }

    /// Detach the entity, release its resources and drop the mapping
    pub fn remove(&mut self, handle: &Handle) -> bool {
        match self.entities.remove(handle) {
            Some(mut entity) => {
                entity.release();
                debug!(handle = %handle, generation = entity.generation(), "Removed playback entity");
                true
            }
            None => false,
        }
    }

    /// Release every entity (process shutdown)
    pub fn clear(&mut self) {
        for (_, mut entity) in self.entities.drain() {
            entity.release();
        }
    }

    pub fn contains(&self, handle: &Handle) -> bool {
        self.entities.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn handles(&self) -> impl Iterator<Item = &Handle> {
        self.entities.keys()
    }

    /// Snapshots ordered by generation (creation order)
    pub fn snapshots(&self) -> Vec<EntitySnapshot> {
        let mut snapshots: Vec<_> = self.entities.values().map(|e| e.snapshot()).collect();
        snapshots.sort_by_key(|s| s.generation);
        snapshots
    }
}
