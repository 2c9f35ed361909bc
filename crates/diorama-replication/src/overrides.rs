//! The override table: which template to spawn in place of another.
//!
//! The [`OverrideTable`] maps a source identity hash (the template a
//! pre-placed instance was created from) to the template that should
//! actually be materialized when a spawn record naming that hash arrives.
//!
//! The table is an explicit object owned by the session layer and passed by
//! reference into the resolver and the spawn dispatcher. It is populated
//! only on remote participants, only between scene load and the spawn
//! handshake. Processing the handshake calls [`OverrideTable::freeze`];
//! from that point on insertion is refused, because a late registration can
//! no longer influence which template the dispatcher picks. Teardown calls
//! [`OverrideTable::clear`], which empties the table and lifts the freeze
//! for the next session.
//!
//! Insertion is idempotent: at most one entry per source hash, first writer
//! wins, and re-inserting an existing hash is a no-op rather than an error
//! (several pre-placed instances of the same template all attempt the same
//! registration at load time).

use std::collections::HashMap;

use tracing::debug;

use crate::identity::TemplateHash;
use crate::template::EntityTemplate;
use crate::ReplicationError;

// ---------------------------------------------------------------------------
// InsertOutcome
// ---------------------------------------------------------------------------

/// Result of a successful [`OverrideTable::insert`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new entry was created for the source hash.
    Inserted,
    /// An entry for the source hash already existed; the table is unchanged.
    AlreadyPresent,
}

// ---------------------------------------------------------------------------
// OverrideTable
// ---------------------------------------------------------------------------

/// Per-participant registry of template substitutions, keyed by source hash.
///
/// Single-threaded by design: the table is touched from the scene-load path
/// and read from the spawn-dispatch path, both of which the host framework
/// runs on the same logical thread. A host that dispatches those on
/// different threads must wrap the table in a mutex and enforce
/// load-before-dispatch ordering with a barrier.
#[derive(Debug, Default)]
pub struct OverrideTable {
    entries: HashMap<TemplateHash, EntityTemplate>,
    frozen: bool,
}

impl OverrideTable {
    /// Create an empty, unfrozen table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `target` as the template to spawn for `source`.
    ///
    /// Idempotent: if `source` already has an entry, the existing entry is
    /// kept and [`InsertOutcome::AlreadyPresent`] is returned. Returns
    /// [`ReplicationError::LateRegistration`] if the table has been frozen;
    /// the table contents are not altered in that case.
    pub fn insert(
        &mut self,
        source: TemplateHash,
        target: EntityTemplate,
    ) -> Result<InsertOutcome, ReplicationError> {
        if self.frozen {
            return Err(ReplicationError::LateRegistration { source });
        }
        if self.entries.contains_key(&source) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        debug!(
            source = %source,
            target = %target.hash(),
            target_label = target.label(),
            "registered template override"
        );
        self.entries.insert(source, target);
        Ok(InsertOutcome::Inserted)
    }

    /// Returns `true` if an override is registered for `source`.
    pub fn contains(&self, source: TemplateHash) -> bool {
        self.entries.contains_key(&source)
    }

    /// The template to spawn for `source`, if an override is registered.
    ///
    /// Called by the spawn dispatcher when it is about to materialize an
    /// entity for an incoming record naming `source`.
    pub fn resolve(&self, source: TemplateHash) -> Option<&EntityTemplate> {
        self.entries.get(&source)
    }

    /// Mark the spawn handshake as processed for this session.
    ///
    /// After this, [`insert`](Self::insert) is refused. Idempotent.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Returns `true` once [`freeze`](Self::freeze) has been called.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of registered overrides.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no overrides are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wholesale reset at session teardown: drops every entry and lifts the
    /// freeze so the table can serve the next session.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.frozen = false;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
