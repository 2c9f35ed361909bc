//! Entity templates and the known-template set.
//!
//! An [`EntityTemplate`] is an immutable descriptor for a spawnable entity
//! kind. The [`TemplateSet`] holds every template the framework currently
//! knows about and answers the one question the override machinery needs:
//! given an identity hash, which template does it name?
//!
//! Lookup is read-only and purely local, so it is safe to call at any point
//! of the session lifecycle, including before any connection exists.

use std::collections::HashMap;

use tracing::warn;

use crate::identity::TemplateHash;
use crate::ReplicationError;

// ---------------------------------------------------------------------------
// EntityTemplate
// ---------------------------------------------------------------------------

/// Immutable descriptor for a spawnable entity kind.
///
/// Carries the stable identity hash and a human-readable label. Templates
/// are registered once with the [`TemplateSet`] and referenced by hash from
/// then on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTemplate {
    hash: TemplateHash,
    label: String,
}

impl EntityTemplate {
    /// Create a template whose hash is derived from its label.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let hash = TemplateHash::from_label(&label);
        Self { hash, label }
    }

    /// Create a template with a framework-assigned hash.
    pub fn with_hash(label: impl Into<String>, hash: TemplateHash) -> Self {
        Self {
            hash,
            label: label.into(),
        }
    }

    /// The template's stable identity hash.
    pub fn hash(&self) -> TemplateHash {
        self.hash
    }

    /// The template's human-readable label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

// ---------------------------------------------------------------------------
// TemplateSet
// ---------------------------------------------------------------------------

/// The framework's currently-known set of spawnable templates.
///
/// Registration keeps the first template seen for a given hash; a second
/// registration under the same hash is reported and ignored, since templates
/// are immutable and hashes are unique per template by contract.
#[derive(Debug, Default)]
pub struct TemplateSet {
    templates: Vec<EntityTemplate>,
    by_hash: HashMap<TemplateHash, usize>,
}

impl TemplateSet {
    /// Create an empty template set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, returning its identity hash.
    ///
    /// If a template with the same hash is already present, the existing
    /// registration wins and the new one is dropped with a warning.
    pub fn register(&mut self, template: EntityTemplate) -> TemplateHash {
        let hash = template.hash();
        if self.by_hash.contains_key(&hash) {
            warn!(
                template_hash = %hash,
                label = template.label(),
                "template hash already registered -- keeping the existing template"
            );
            return hash;
        }
        self.by_hash.insert(hash, self.templates.len());
        self.templates.push(template);
        hash
    }

    /// Look up a template by identity hash.
    ///
    /// Deterministic, read-only, no side effects.
    pub fn find_by_hash(&self, hash: TemplateHash) -> Option<&EntityTemplate> {
        self.by_hash.get(&hash).map(|&index| &self.templates[index])
    }

    /// Like [`find_by_hash`](Self::find_by_hash), but an unknown hash is an
    /// error. Used where a missing template cannot be recovered from locally.
    pub fn require_by_hash(&self, hash: TemplateHash) -> Result<&EntityTemplate, ReplicationError> {
        self.find_by_hash(hash)
            .ok_or(ReplicationError::UnknownTargetTemplate { hash })
    }

    /// Returns `true` if a template with the given hash is registered.
    pub fn contains(&self, hash: TemplateHash) -> bool {
        self.by_hash.contains_key(&hash)
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns `true` if no templates are registered.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Iterate over registered templates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityTemplate> {
        self.templates.iter()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
