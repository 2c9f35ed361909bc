//! Diorama replication core -- template overrides and spawn-state transfer
//! for pre-placed networked entities.
//!
//! A pre-placed entity exists in a scene before any spawn record arrives.
//! Authority knows it by identity at load time; remote participants only
//! learn about it through a spawn record sent after the connection
//! handshake. When the template a remote participant holds locally differs
//! from the one authority will announce, the substitution must be decided
//! and registered *before* the record arrives, from local state alone.
//! This crate implements that one-shot decision and the companion protocol
//! that carries per-instance configuration across at materialization time.
//!
//! # Modules
//!
//! - [`identity`]: stable template identity hashes and authority roles.
//! - [`template`]: immutable template descriptors and the known-template set.
//! - [`overrides`]: the override table consulted by the spawn dispatcher.
//! - [`resolver`]: per-instance resolution at scene load.
//! - [`sync`]: role-split spawn-state synchronization.
//! - [`diagnostics`]: non-fatal fault reporting.
//!
//! # Quick Start
//!
//! ```
//! use diorama_replication::prelude::*;
//!
//! let mut templates = TemplateSet::new();
//! templates.register(EntityTemplate::with_hash("emitter.legacy", TemplateHash(100)));
//! templates.register(EntityTemplate::with_hash("emitter.current", TemplateHash(200)));
//!
//! // A scene instance placed from template 100, redirected to 200.
//! let instance = PrePlacedInstance::with_target(TemplateHash(100), TemplateHash(200));
//!
//! let mut table = OverrideTable::new();
//! let outcome = register_override(
//!     &instance,
//!     AuthorityRole::Remote,
//!     &templates,
//!     &mut table,
//!     None,
//! );
//! assert_eq!(outcome, RegisterOutcome::Registered);
//! assert_eq!(table.resolve(TemplateHash(100)).unwrap().hash(), TemplateHash(200));
//! ```

#![deny(unsafe_code)]

pub mod diagnostics;
pub mod identity;
pub mod overrides;
pub mod resolver;
pub mod sync;
pub mod template;

use identity::TemplateHash;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the replication core.
///
/// None of these abort a session: callers recover by falling back to the
/// original template or to default configuration values, reporting through
/// the diagnostics sink.
#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    /// No template with the given identity hash is registered.
    #[error("no template registered for identity hash {hash}")]
    UnknownTargetTemplate {
        /// The hash that failed to resolve.
        hash: TemplateHash,
    },

    /// An override registration arrived after the spawn handshake was
    /// processed; it can no longer influence spawn resolution.
    #[error("override table is frozen; registration for {source} arrived after the spawn handshake")]
    LateRegistration {
        /// The source hash whose registration was refused.
        source: TemplateHash,
    },

    /// Encoding a spawn configuration payload failed.
    #[error("failed to encode spawn configuration: {details}")]
    ConfigEncode {
        /// Underlying serializer message.
        details: String,
    },

    /// Decoding a spawn configuration payload failed.
    #[error("failed to decode spawn configuration: {details}")]
    ConfigDecode {
        /// Underlying deserializer message.
        details: String,
    },

    /// The handshake buffer ended before a complete frame could be read,
    /// or a payload exceeded what a frame can carry.
    #[error("replication buffer truncated: {details}")]
    BufferTruncated {
        /// What was expected and what remained.
        details: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::diagnostics::{DiagnosticsSink, ScreenLog, TraceSink};
    pub use crate::identity::{AuthorityRole, TemplateHash};
    pub use crate::overrides::{InsertOutcome, OverrideTable};
    pub use crate::resolver::{
        register_override, resolve, PrePlacedInstance, RegisterOutcome, ResolutionOutcome,
    };
    pub use crate::sync::{
        synchronize, ConfiguredEntity, FrameBuffer, PayloadRead, PayloadWrite, SyncContext,
    };
    pub use crate::template::{EntityTemplate, TemplateSet};
    pub use crate::ReplicationError;
}
