//! Stable identity for spawnable entity templates.
//!
//! Every template registered with the replication layer carries a
//! [`TemplateHash`]: a stable numeric identity derived once, at registration
//! time, from the template's label. The hash is the unit of comparison
//! between "the template this instance was placed from" and "the template
//! that should actually be spawned for it" -- the replication layer only
//! ever compares hashes, it never re-derives them at runtime.
//!
//! [`AuthorityRole`] names which side of the replication relationship a
//! participant is on. The authority placed the scene and owns entity state;
//! remote participants learn about entities through spawn records.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TemplateHash
// ---------------------------------------------------------------------------

/// Stable identity hash of an entity template.
///
/// Unique per registered template. Derived from the template label via
/// [`TemplateHash::from_label`] when the template is registered, or assigned
/// directly by the surrounding framework. Once assigned, the value is
/// immutable for the lifetime of the template.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TemplateHash(pub u64);

impl TemplateHash {
    /// Derive a hash from a template label.
    ///
    /// Uses the first 8 bytes of the blake3 digest of the label, so the
    /// value is deterministic across processes and platforms.
    pub fn from_label(label: &str) -> Self {
        let digest = blake3::hash(label.as_bytes());
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest.as_bytes()[..8]);
        TemplateHash(u64::from_le_bytes(bytes))
    }

    /// Returns the raw hash value.
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TemplateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

// `ReplicationError::LateRegistration` carries a field named `source`, which
// thiserror treats as the error source and therefore requires to implement
// `std::error::Error`. The field is plain identity data, so this impl is a
// no-op marker (no underlying cause to chain).
impl std::error::Error for TemplateHash {}

// ---------------------------------------------------------------------------
// AuthorityRole
// ---------------------------------------------------------------------------

/// Which side of the replication relationship a participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorityRole {
    /// This participant placed the scene and owns entity state. Authority
    /// always spawns the template it physically placed.
    Authority,
    /// This participant learns about entities through spawn records and may
    /// need to substitute templates before materializing them.
    Remote,
}

impl AuthorityRole {
    /// Returns `true` for [`AuthorityRole::Authority`].
    pub fn is_authority(self) -> bool {
        matches!(self, AuthorityRole::Authority)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_label_is_deterministic() {
        let a = TemplateHash::from_label("emitter.current");
        let b = TemplateHash::from_label("emitter.current");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_labels_produce_distinct_hashes() {
        let a = TemplateHash::from_label("emitter.current");
        let b = TemplateHash::from_label("emitter.legacy");
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_fixed_width_hex() {
        let rendered = format!("{}", TemplateHash(0x2a));
        assert_eq!(rendered, "0x000000000000002a");
    }

    #[test]
    fn hash_serialization_roundtrip() {
        let hash = TemplateHash::from_label("emitter.current");
        let json = serde_json::to_string(&hash).unwrap();
        let back: TemplateHash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, back);
    }

    #[test]
    fn role_predicates() {
        assert!(AuthorityRole::Authority.is_authority());
        assert!(!AuthorityRole::Remote.is_authority());
    }
}
