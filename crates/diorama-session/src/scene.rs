//! Scene descriptions: what was placed where, at authoring time.
//!
//! A [`SceneDescriptor`] lists the pre-placed networked entities of one
//! scene. Each [`PrePlacedEntry`] bundles the replication-facing authoring
//! data (the [`PrePlacedInstance`] hash pair) with the application-facing
//! authoring data (label and scene-time emitter configuration). Descriptors
//! are immutable once a session starts; authoring tooling is responsible
//! for keeping the hash pair consistent with the registered templates.

use diorama_replication::resolver::PrePlacedInstance;

use crate::world::EmitterConfig;

// ---------------------------------------------------------------------------
// PrePlacedEntry
// ---------------------------------------------------------------------------

/// One pre-placed networked entity in a scene.
#[derive(Debug, Clone)]
pub struct PrePlacedEntry {
    /// Replication authoring data: local hash and optional target hash.
    pub instance: PrePlacedInstance,
    /// Human-readable name of the placed instance.
    pub label: String,
    /// Scene-time configuration. Authority's copy is authoritative; remote
    /// copies are replaced during the spawn handshake.
    pub config: EmitterConfig,
}

impl PrePlacedEntry {
    /// Create an entry with default configuration.
    pub fn new(label: impl Into<String>, instance: PrePlacedInstance) -> Self {
        Self {
            instance,
            label: label.into(),
            config: EmitterConfig::default(),
        }
    }

    /// Attach scene-time configuration to the entry.
    pub fn with_config(mut self, config: EmitterConfig) -> Self {
        self.config = config;
        self
    }
}

// ---------------------------------------------------------------------------
// SceneDescriptor
// ---------------------------------------------------------------------------

/// An authored scene: a name and its pre-placed networked entities.
#[derive(Debug, Clone, Default)]
pub struct SceneDescriptor {
    name: String,
    entries: Vec<PrePlacedEntry>,
}

impl SceneDescriptor {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Add a pre-placed entry (builder style).
    pub fn with_entry(mut self, entry: PrePlacedEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// The scene's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scene's pre-placed entries, in authoring order.
    pub fn entries(&self) -> &[PrePlacedEntry] {
        &self.entries
    }

    /// Number of pre-placed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the scene has no pre-placed entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
