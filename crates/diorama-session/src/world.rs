//! Session-local entity store.
//!
//! The session materializes networked scene entities -- effect emitters --
//! into a [`SceneWorld`]. Entities come from two paths: placed directly
//! when a scene loads (placeholders on remote participants, live entities
//! on authority), or materialized from incoming spawn records. The
//! `replicated` flag records which path created an entity, so teardown and
//! placeholder replacement can tell them apart.

use std::fmt;

use diorama_replication::identity::TemplateHash;
use diorama_replication::sync::ConfiguredEntity;
use diorama_replication::template::EntityTemplate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Session-local entity identifier. Never crosses the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EmitterConfig
// ---------------------------------------------------------------------------

/// Per-instance configuration of an effect emitter.
///
/// This is the payload that travels from authority to remote participants
/// during the spawn handshake. Fields added here are picked up by both the
/// capture and apply paths automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterConfig {
    /// Emission color, linear RGB.
    pub tint: [f32; 3],
    /// Particles per burst.
    pub burst_count: u32,
    /// Seconds between bursts.
    pub interval_secs: f32,
    /// Whether the emitter starts running on materialization.
    pub auto_start: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            tint: [1.0, 1.0, 1.0],
            burst_count: 1,
            interval_secs: 1.0,
            auto_start: false,
        }
    }
}

// ---------------------------------------------------------------------------
// EmitterEntity
// ---------------------------------------------------------------------------

/// A materialized scene emitter.
#[derive(Debug, Clone)]
pub struct EmitterEntity {
    id: EntityId,
    template: TemplateHash,
    label: String,
    replicated: bool,
    /// Emission color, linear RGB.
    pub tint: [f32; 3],
    /// Particles per burst.
    pub burst_count: u32,
    /// Seconds between bursts.
    pub interval_secs: f32,
    /// Whether the emitter is running.
    pub auto_start: bool,
}

impl EmitterEntity {
    /// The entity's session-local identifier.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Hash of the template this entity was materialized from.
    pub fn template(&self) -> TemplateHash {
        self.template
    }

    /// Label of the template this entity was materialized from.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns `true` if the entity was materialized from a spawn record
    /// rather than placed directly at scene load.
    pub fn is_replicated(&self) -> bool {
        self.replicated
    }
}

impl ConfiguredEntity for EmitterEntity {
    type Config = EmitterConfig;

    fn capture_config(&self) -> EmitterConfig {
        EmitterConfig {
            tint: self.tint,
            burst_count: self.burst_count,
            interval_secs: self.interval_secs,
            auto_start: self.auto_start,
        }
    }

    fn apply_config(&mut self, config: EmitterConfig) {
        self.tint = config.tint;
        self.burst_count = config.burst_count;
        self.interval_secs = config.interval_secs;
        self.auto_start = config.auto_start;
    }
}

// ---------------------------------------------------------------------------
// SceneWorld
// ---------------------------------------------------------------------------

/// Flat store of the session's materialized entities.
#[derive(Debug, Default)]
pub struct SceneWorld {
    entities: Vec<EmitterEntity>,
    next_id: u64,
}

impl SceneWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialize an entity from a template with default configuration.
    pub fn spawn(&mut self, template: &EntityTemplate, replicated: bool) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        let defaults = EmitterConfig::default();
        self.entities.push(EmitterEntity {
            id,
            template: template.hash(),
            label: template.label().to_owned(),
            replicated,
            tint: defaults.tint,
            burst_count: defaults.burst_count,
            interval_secs: defaults.interval_secs,
            auto_start: defaults.auto_start,
        });
        id
    }

    /// Look up an entity by id.
    pub fn get(&self, id: EntityId) -> Option<&EmitterEntity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Look up an entity by id, mutably.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EmitterEntity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    /// Remove an entity. Returns `true` if it existed.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let before = self.entities.len();
        self.entities.retain(|e| e.id != id);
        self.entities.len() != before
    }

    /// Remove the first scene-placed (non-replicated) entity of the given
    /// template, returning its id. Used when a spawn record replaces a
    /// remote participant's local placeholder.
    pub fn take_placeholder(&mut self, template: TemplateHash) -> Option<EntityId> {
        let id = self
            .entities
            .iter()
            .find(|e| !e.replicated && e.template == template)
            .map(|e| e.id)?;
        self.despawn(id);
        Some(id)
    }

    /// Remove every entity and return how many were removed.
    pub fn despawn_all(&mut self) -> usize {
        let count = self.entities.len();
        self.entities.clear();
        count
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Iterate over live entities in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &EmitterEntity> {
        self.entities.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
