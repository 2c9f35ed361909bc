//! Spawn dispatch: materializing entities from incoming spawn records.
//!
//! For each record in the connection approval, the dispatcher decides which
//! template to materialize -- the override table's substitution when one is
//! registered for the record's source hash, otherwise the original template
//! from the known set -- replaces the local scene placeholder, then runs the
//! reader half of the spawn-state synchronizer on the fresh entity.
//!
//! A record whose hash resolves to no known template is an error the caller
//! can skip past; a failed configuration transfer is not even that -- the
//! entity stays with default configuration and the failure is reported
//! through the diagnostics sink.

use std::time::Duration;

use diorama_replication::diagnostics::DiagnosticsSink;
use diorama_replication::overrides::OverrideTable;
use diorama_replication::sync::{synchronize, FrameBuffer, SyncContext};
use diorama_replication::template::TemplateSet;
use tracing::{debug, warn};

use crate::handshake::SpawnRecord;
use crate::world::{EntityId, SceneWorld};
use crate::SessionError;

/// How long dispatch diagnostics stay on screen.
const DIAGNOSTIC_TTL: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// DispatchOutcome
// ---------------------------------------------------------------------------

/// What materializing one spawn record produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The materialized entity.
    pub entity: EntityId,
    /// Whether an override substitution was applied.
    pub overridden: bool,
    /// Whether the spawn-state payload was applied. `false` means the
    /// entity kept default configuration after a transfer fault.
    pub config_applied: bool,
}

// ---------------------------------------------------------------------------
// dispatch_spawn
// ---------------------------------------------------------------------------

/// Materialize one spawn record into the world.
///
/// Fails only when the record's source hash resolves to no template at all;
/// in that case nothing is spawned and the caller decides whether to skip
/// the record. Configuration-transfer faults do not fail the dispatch.
pub fn dispatch_spawn(
    record: &SpawnRecord,
    overrides: &OverrideTable,
    templates: &TemplateSet,
    world: &mut SceneWorld,
    mut diagnostics: Option<&mut dyn DiagnosticsSink>,
) -> Result<DispatchOutcome, SessionError> {
    let (template, overridden) = match overrides.resolve(record.source) {
        Some(target) => (target.clone(), true),
        None => (templates.require_by_hash(record.source)?.clone(), false),
    };

    if let Some(replaced) = world.take_placeholder(record.source) {
        debug!(
            source = %record.source,
            replaced = %replaced,
            "replaced scene placeholder with spawned entity"
        );
    }

    let id = world.spawn(&template, true);
    let entity = world
        .get_mut(id)
        .expect("entity exists immediately after spawn");

    let mut buffer = FrameBuffer::from_bytes(record.payload.clone());
    let config_applied = match synchronize(entity, SyncContext::Reader(&mut buffer)) {
        Ok(()) => true,
        Err(err) => {
            warn!(
                source = %record.source,
                entity = %id,
                error = %err,
                "spawn-state transfer failed; entity keeps default configuration"
            );
            if let Some(sink) = diagnostics.as_deref_mut() {
                sink.log_message(
                    &format!("spawn-state transfer failed for {id}: {err}"),
                    Some(DIAGNOSTIC_TTL),
                );
            }
            false
        }
    };

    Ok(DispatchOutcome {
        entity: id,
        overridden,
        config_applied,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use diorama_replication::identity::TemplateHash;
    use diorama_replication::sync::{ConfiguredEntity, PayloadWrite};
    use diorama_replication::template::EntityTemplate;
    use diorama_replication::ReplicationError;

    use crate::world::EmitterConfig;

    fn known_templates() -> TemplateSet {
        let mut set = TemplateSet::new();
        set.register(EntityTemplate::with_hash("emitter.legacy", TemplateHash(100)));
        set.register(EntityTemplate::with_hash("emitter.current", TemplateHash(200)));
        set
    }

    fn record_with_config(source: u64, config: &EmitterConfig) -> SpawnRecord {
        let mut buffer = FrameBuffer::new();
        buffer
            .write_payload(&serde_json::to_vec(config).unwrap())
            .unwrap();
        SpawnRecord {
            source: TemplateHash(source),
            payload: buffer.into_bytes(),
        }
    }

    #[test]
    fn record_without_override_spawns_the_original_template() {
        let templates = known_templates();
        let overrides = OverrideTable::new();
        let mut world = SceneWorld::new();
        let record = record_with_config(100, &EmitterConfig::default());

        let outcome =
            dispatch_spawn(&record, &overrides, &templates, &mut world, None).unwrap();

        assert!(!outcome.overridden);
        assert!(outcome.config_applied);
        let entity = world.get(outcome.entity).unwrap();
        assert_eq!(entity.template(), TemplateHash(100));
        assert!(entity.is_replicated());
    }

    #[test]
    fn registered_override_redirects_the_spawn() {
        let templates = known_templates();
        let mut overrides = OverrideTable::new();
        overrides
            .insert(
                TemplateHash(100),
                templates.find_by_hash(TemplateHash(200)).unwrap().clone(),
            )
            .unwrap();
        let mut world = SceneWorld::new();
        let record = record_with_config(100, &EmitterConfig::default());

        let outcome =
            dispatch_spawn(&record, &overrides, &templates, &mut world, None).unwrap();

        assert!(outcome.overridden);
        let entity = world.get(outcome.entity).unwrap();
        assert_eq!(entity.template(), TemplateHash(200));
        assert_eq!(entity.label(), "emitter.current");
    }

    #[test]
    fn dispatch_replaces_the_local_placeholder() {
        let templates = known_templates();
        let overrides = OverrideTable::new();
        let mut world = SceneWorld::new();
        let placeholder = world.spawn(
            templates.find_by_hash(TemplateHash(100)).unwrap(),
            false,
        );
        let record = record_with_config(100, &EmitterConfig::default());

        let outcome =
            dispatch_spawn(&record, &overrides, &templates, &mut world, None).unwrap();

        assert!(world.get(placeholder).is_none());
        assert!(world.get(outcome.entity).is_some());
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn spawned_entity_receives_the_record_configuration() {
        let templates = known_templates();
        let overrides = OverrideTable::new();
        let mut world = SceneWorld::new();
        let config = EmitterConfig {
            tint: [0.8, 0.1, 0.3],
            burst_count: 24,
            interval_secs: 0.2,
            auto_start: true,
        };
        let record = record_with_config(100, &config);

        let outcome =
            dispatch_spawn(&record, &overrides, &templates, &mut world, None).unwrap();

        let entity = world.get(outcome.entity).unwrap();
        assert_eq!(entity.capture_config(), config);
    }

    #[test]
    fn unknown_source_hash_spawns_nothing() {
        let templates = known_templates();
        let overrides = OverrideTable::new();
        let mut world = SceneWorld::new();
        let record = record_with_config(999, &EmitterConfig::default());

        let err = dispatch_spawn(&record, &overrides, &templates, &mut world, None).unwrap_err();

        assert!(matches!(
            err,
            SessionError::Replication(ReplicationError::UnknownTargetTemplate { .. })
        ));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn corrupt_payload_leaves_default_configuration() {
        let templates = known_templates();
        let overrides = OverrideTable::new();
        let mut world = SceneWorld::new();
        let record = SpawnRecord {
            source: TemplateHash(100),
            payload: vec![0xff, 0xff],
        };

        let outcome =
            dispatch_spawn(&record, &overrides, &templates, &mut world, None).unwrap();

        assert!(!outcome.config_applied);
        let entity = world.get(outcome.entity).unwrap();
        assert_eq!(entity.capture_config(), EmitterConfig::default());
    }
}
