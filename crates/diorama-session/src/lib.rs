//! Diorama session -- application glue around the replication core.
//!
//! This crate wires [`diorama_replication`] into a runnable session: mode
//! selection (host or client), scene preloading, the connection-approval
//! message and its spawn dispatcher, on-screen diagnostics, and teardown.
//! The core decides *which* template to materialize and *what*
//! configuration it carries; this crate decides *when* each of those steps
//! runs so the core's timing contract holds.
//!
//! # Quick Start
//!
//! ```
//! use diorama_session::prelude::*;
//!
//! fn templates() -> TemplateSet {
//!     let mut set = TemplateSet::new();
//!     set.register(EntityTemplate::with_hash("emitter.legacy", TemplateHash(100)));
//!     set.register(EntityTemplate::with_hash("emitter.current", TemplateHash(200)));
//!     set
//! }
//!
//! let scene = SceneDescriptor::new("plaza").with_entry(PrePlacedEntry::new(
//!     "north emitter",
//!     PrePlacedInstance::with_target(TemplateHash(100), TemplateHash(200)),
//! ));
//!
//! // Host side.
//! let mut host = SessionRuntime::new(SessionMode::Host, templates());
//! host.load_scene(&scene).unwrap();
//! host.begin_accepting_connections().unwrap();
//! let approval = host.build_connection_approval().unwrap();
//!
//! // Client side.
//! let mut client = SessionRuntime::new(SessionMode::Client, templates());
//! client.load_scene(&scene).unwrap();
//! let report = client.process_connection_approval(&approval).unwrap();
//! assert_eq!(report.overridden, 1);
//! ```

#![deny(unsafe_code)]

pub mod dispatch;
pub mod handshake;
pub mod scene;
pub mod session;
pub mod world;

/// Re-export the replication core for convenience.
pub use diorama_replication;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

use session::SessionMode;

/// Errors produced by the session layer.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The operation is only valid in the other session mode.
    #[error("operation requires {required:?} mode, session is in {actual:?} mode")]
    WrongMode {
        /// The mode the operation requires.
        required: SessionMode,
        /// The mode the session is actually in.
        actual: SessionMode,
    },

    /// The session has no loaded scene yet.
    #[error("no scene loaded; preload scenes before starting the session")]
    NoSceneLoaded,

    /// A scene tried to load after the session started exchanging spawn
    /// messages; its override registrations could no longer take effect.
    #[error("scene '{name}' cannot load after the session started accepting connections")]
    SceneLoadedTooLate {
        /// Name of the rejected scene.
        name: String,
    },

    /// The connection approval was already processed for this session.
    #[error("connection approval was already processed for this session")]
    ApprovalAlreadyProcessed,

    /// The host has not started accepting connections yet.
    #[error("connection approval is not available before the session accepts connections")]
    NotAcceptingConnections,

    /// Encoding the connection-approval message failed.
    #[error("failed to encode connection approval: {details}")]
    ApprovalEncode {
        /// Underlying serializer message.
        details: String,
    },

    /// Decoding the connection-approval message failed.
    #[error("failed to decode connection approval: {details}")]
    ApprovalDecode {
        /// Underlying deserializer message.
        details: String,
    },

    /// A replication-core fault surfaced through the session layer.
    #[error(transparent)]
    Replication(#[from] diorama_replication::ReplicationError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use diorama_replication::prelude::*;

    pub use crate::dispatch::{dispatch_spawn, DispatchOutcome};
    pub use crate::handshake::{ConnectionApproval, SpawnRecord};
    pub use crate::scene::{PrePlacedEntry, SceneDescriptor};
    pub use crate::session::{DispatchReport, SessionMode, SessionRuntime, ShutdownReport};
    pub use crate::world::{EmitterConfig, EmitterEntity, EntityId, SceneWorld};
    pub use crate::SessionError;
}
