//! The connection-approval message.
//!
//! When a remote participant's connection is approved, authority sends it
//! one [`ConnectionApproval`]: the list of pre-placed entities to spawn,
//! each as a [`SpawnRecord`] carrying the entity's source identity hash
//! and the opaque configuration payload produced by the writer half of the
//! spawn-state synchronizer. The receiving side resolves each record
//! against its override table before materializing anything -- which is
//! why all override registration must be finished before this message is
//! processed.

use diorama_replication::identity::TemplateHash;
use serde::{Deserialize, Serialize};

use crate::SessionError;

// ---------------------------------------------------------------------------
// SpawnRecord
// ---------------------------------------------------------------------------

/// One entity the remote participant is told to spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRecord {
    /// Identity hash of the template authority placed the entity from.
    pub source: TemplateHash,
    /// Spawn-state payload written by the authority-side synchronizer.
    pub payload: Vec<u8>,
}

// ---------------------------------------------------------------------------
// ConnectionApproval
// ---------------------------------------------------------------------------

/// The post-handshake spawn message for one approved connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionApproval {
    /// Entities to spawn, in authority's placement order.
    pub records: Vec<SpawnRecord>,
}

impl ConnectionApproval {
    /// Create an approval message from spawn records.
    pub fn new(records: Vec<SpawnRecord>) -> Self {
        Self { records }
    }

    /// Encode the message for the transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SessionError> {
        serde_json::to_vec(self).map_err(|err| SessionError::ApprovalEncode {
            details: err.to_string(),
        })
    }

    /// Decode a message received from the transport.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SessionError> {
        serde_json::from_slice(bytes).map_err(|err| SessionError::ApprovalDecode {
            details: err.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
