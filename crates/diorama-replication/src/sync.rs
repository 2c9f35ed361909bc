//! Spawn-state synchronization: per-instance configuration transfer.
//!
//! Dynamically materialized entities do not inherit scene-time
//! configuration, so whatever was configured on the authority's pre-placed
//! instance must travel to remote participants at the moment of
//! materialization -- exactly once, as part of the entity's replication
//! handshake.
//!
//! The handshake is symmetric in shape but strictly role-split: the writer
//! (authority) populates a configuration value from its live entity and
//! then encodes it into the outgoing buffer; the reader (remote) decodes
//! the value from the incoming buffer and then applies it to its local
//! entity. [`synchronize`] dispatches a tagged [`SyncContext`] to one of
//! two private functions, one per role, so each phase pair keeps its order
//! by construction: `populate_and_encode` cannot encode before it has
//! captured, and `decode_and_apply` cannot apply before it has decoded.
//!
//! The configuration payload is whatever [`ConfiguredEntity::Config`] an
//! entity declares. It crosses the buffer as one serde-encoded value, so
//! the writer and reader enumerate the same field list by construction --
//! adding a field to the config struct updates both paths atomically.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::ReplicationError;

// ---------------------------------------------------------------------------
// Payload buffer abstraction
// ---------------------------------------------------------------------------

/// Outgoing half of the replication handshake buffer.
///
/// The synchronizer writes one opaque payload per handshake and knows
/// nothing about the transport beneath.
pub trait PayloadWrite {
    /// Append one length-delimited payload to the buffer.
    fn write_payload(&mut self, payload: &[u8]) -> Result<(), ReplicationError>;
}

/// Incoming half of the replication handshake buffer.
pub trait PayloadRead {
    /// Consume the next length-delimited payload from the buffer.
    fn read_payload(&mut self) -> Result<Vec<u8>, ReplicationError>;
}

/// In-memory handshake buffer: length-prefixed frames over a byte vector.
///
/// The writer side fills it with [`PayloadWrite`]; the transport moves the
/// bytes; the reader side drains it with [`PayloadRead`].
#[derive(Debug, Clone, Default)]
pub struct FrameBuffer {
    bytes: Vec<u8>,
    cursor: usize,
}

impl FrameBuffer {
    /// Create an empty buffer for writing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap received bytes for reading.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes, cursor: 0 }
    }

    /// Consume the buffer, yielding the written bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of bytes held.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl PayloadWrite for FrameBuffer {
    fn write_payload(&mut self, payload: &[u8]) -> Result<(), ReplicationError> {
        let len = u32::try_from(payload.len()).map_err(|_| ReplicationError::BufferTruncated {
            details: format!("payload of {} bytes exceeds the frame limit", payload.len()),
        })?;
        self.bytes.extend_from_slice(&len.to_le_bytes());
        self.bytes.extend_from_slice(payload);
        Ok(())
    }
}

impl PayloadRead for FrameBuffer {
    fn read_payload(&mut self) -> Result<Vec<u8>, ReplicationError> {
        let remaining = self.bytes.len() - self.cursor;
        if remaining < 4 {
            return Err(ReplicationError::BufferTruncated {
                details: format!("expected a 4-byte frame header, {remaining} bytes remain"),
            });
        }
        let mut header = [0u8; 4];
        header.copy_from_slice(&self.bytes[self.cursor..self.cursor + 4]);
        let len = u32::from_le_bytes(header) as usize;
        let start = self.cursor + 4;
        if self.bytes.len() - start < len {
            return Err(ReplicationError::BufferTruncated {
                details: format!(
                    "frame announces {len} bytes, {} remain",
                    self.bytes.len() - start
                ),
            });
        }
        self.cursor = start + len;
        Ok(self.bytes[start..start + len].to_vec())
    }
}

// ---------------------------------------------------------------------------
// ConfiguredEntity
// ---------------------------------------------------------------------------

/// An entity with per-instance configuration that must survive
/// materialization on remote participants.
pub trait ConfiguredEntity {
    /// The serializable configuration payload for this entity kind.
    type Config: Serialize + DeserializeOwned;

    /// Authority side: derive the configuration value from live entity
    /// state. Runs before anything is written to the buffer.
    fn capture_config(&self) -> Self::Config;

    /// Remote side: apply a received configuration value to the local
    /// entity. Runs only after the value has been fully decoded.
    fn apply_config(&mut self, config: Self::Config);
}

// ---------------------------------------------------------------------------
// SyncContext / synchronize
// ---------------------------------------------------------------------------

/// Which half of the handshake this participant executes.
///
/// The surrounding framework constructs exactly one variant per handshake:
/// `Writer` on the authority, `Reader` on the remote. Never both in the
/// same process for the same handshake.
pub enum SyncContext<'a> {
    /// Authority side: populate from the live entity, then encode.
    Writer(&'a mut dyn PayloadWrite),
    /// Remote side: decode from the buffer, then apply.
    Reader(&'a mut dyn PayloadRead),
}

/// Run one entity's spawn-state handshake.
///
/// Called exactly once per entity instance, at materialization, by the
/// replication framework that owns the handshake buffer.
pub fn synchronize<E: ConfiguredEntity>(
    entity: &mut E,
    context: SyncContext<'_>,
) -> Result<(), ReplicationError> {
    match context {
        SyncContext::Writer(buffer) => populate_and_encode(entity, buffer),
        SyncContext::Reader(buffer) => decode_and_apply(entity, buffer),
    }
}

fn populate_and_encode<E: ConfiguredEntity>(
    entity: &E,
    buffer: &mut dyn PayloadWrite,
) -> Result<(), ReplicationError> {
    let config = entity.capture_config();
    let payload =
        serde_json::to_vec(&config).map_err(|err| ReplicationError::ConfigEncode {
            details: err.to_string(),
        })?;
    buffer.write_payload(&payload)
}

fn decode_and_apply<E: ConfiguredEntity>(
    entity: &mut E,
    buffer: &mut dyn PayloadRead,
) -> Result<(), ReplicationError> {
    let payload = buffer.read_payload()?;
    let config: E::Config =
        serde_json::from_slice(&payload).map_err(|err| ReplicationError::ConfigDecode {
            details: err.to_string(),
        })?;
    entity.apply_config(config);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct GlowConfig {
        intensity: f32,
        pulses: u32,
        label: String,
    }

    impl Default for GlowConfig {
        fn default() -> Self {
            Self {
                intensity: 0.0,
                pulses: 0,
                label: String::new(),
            }
        }
    }

    struct GlowEntity {
        config: GlowConfig,
    }

    impl ConfiguredEntity for GlowEntity {
        type Config = GlowConfig;

        fn capture_config(&self) -> GlowConfig {
            self.config.clone()
        }

        fn apply_config(&mut self, config: GlowConfig) {
            self.config = config;
        }
    }

    #[test]
    fn writer_then_reader_transfers_configuration() {
        let mut source = GlowEntity {
            config: GlowConfig {
                intensity: 0.8,
                pulses: 3,
                label: "rooftop".to_owned(),
            },
        };
        let mut buffer = FrameBuffer::new();
        synchronize(&mut source, SyncContext::Writer(&mut buffer)).unwrap();

        let mut received = FrameBuffer::from_bytes(buffer.into_bytes());
        let mut replica = GlowEntity {
            config: GlowConfig::default(),
        };
        synchronize(&mut replica, SyncContext::Reader(&mut received)).unwrap();

        assert_eq!(replica.config, source.config);
    }

    #[test]
    fn writer_leaves_source_entity_untouched() {
        let config = GlowConfig {
            intensity: 0.5,
            pulses: 1,
            label: "gate".to_owned(),
        };
        let mut source = GlowEntity {
            config: config.clone(),
        };
        let mut buffer = FrameBuffer::new();
        synchronize(&mut source, SyncContext::Writer(&mut buffer)).unwrap();
        assert_eq!(source.config, config);
    }

    #[test]
    fn multiple_frames_read_back_in_write_order() {
        let mut buffer = FrameBuffer::new();
        buffer.write_payload(b"first").unwrap();
        buffer.write_payload(b"").unwrap();
        buffer.write_payload(b"third").unwrap();

        let mut reader = FrameBuffer::from_bytes(buffer.into_bytes());
        assert_eq!(reader.read_payload().unwrap(), b"first");
        assert_eq!(reader.read_payload().unwrap(), b"");
        assert_eq!(reader.read_payload().unwrap(), b"third");
    }

    #[test]
    fn reading_past_the_end_reports_truncation() {
        let mut buffer = FrameBuffer::new();
        buffer.write_payload(b"only").unwrap();

        let mut reader = FrameBuffer::from_bytes(buffer.into_bytes());
        reader.read_payload().unwrap();
        let err = reader.read_payload().unwrap_err();
        assert!(matches!(err, ReplicationError::BufferTruncated { .. }));
    }

    #[test]
    fn truncated_frame_body_reports_truncation() {
        let mut buffer = FrameBuffer::new();
        buffer.write_payload(b"payload").unwrap();
        let mut bytes = buffer.into_bytes();
        bytes.truncate(bytes.len() - 2);

        let mut reader = FrameBuffer::from_bytes(bytes);
        let err = reader.read_payload().unwrap_err();
        assert!(matches!(err, ReplicationError::BufferTruncated { .. }));
    }

    #[test]
    fn malformed_payload_reports_decode_error_without_applying() {
        let mut buffer = FrameBuffer::new();
        buffer.write_payload(b"not json").unwrap();

        let mut replica = GlowEntity {
            config: GlowConfig::default(),
        };
        let mut reader = FrameBuffer::from_bytes(buffer.into_bytes());
        let err = synchronize(&mut replica, SyncContext::Reader(&mut reader)).unwrap_err();

        assert!(matches!(err, ReplicationError::ConfigDecode { .. }));
        assert_eq!(replica.config, GlowConfig::default());
    }
}
