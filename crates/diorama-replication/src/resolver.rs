//! Identity resolution for pre-placed entity instances.
//!
//! A pre-placed instance exists in a scene before any spawn record is
//! received. At authoring time it may carry a *target* identity hash: the
//! template that authority will actually announce for this instance. When
//! the target differs from the template the instance was placed from, a
//! remote participant must register a substitution into the
//! [`OverrideTable`] -- and it must do so during scene load, strictly
//! before the spawn handshake is processed, because the handshake is what
//! consumes the table. No network I/O happens here; resolution is pure
//! local-state computation.
//!
//! Resolution itself ([`resolve`]) is a pure decision function.
//! [`register_override`] layers the side effects on top: the lazy template
//! lookup against the known set, the guarded table insertion, and
//! diagnostics for the non-fatal failure paths.

use std::time::Duration;

use tracing::debug;

use crate::diagnostics::DiagnosticsSink;
use crate::identity::{AuthorityRole, TemplateHash};
use crate::overrides::{InsertOutcome, OverrideTable};
use crate::template::TemplateSet;
use crate::ReplicationError;

/// How long resolver diagnostics stay on screen.
const DIAGNOSTIC_TTL: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// PrePlacedInstance
// ---------------------------------------------------------------------------

/// Authoring data of a scene-embedded networked entity.
///
/// `local_hash` identifies the template the instance was physically placed
/// from. `target_hash` is optionally set at authoring time and identifies
/// the template that should actually be spawned for this instance on remote
/// participants; `None` means the instance *is* the canonical template.
/// Both values are immutable once the session starts -- authoring tooling
/// guarantees their consistency, and this subsystem never re-derives or
/// validates hashes at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrePlacedInstance {
    /// Hash of the template this instance was placed from.
    pub local_hash: TemplateHash,
    /// Hash of the template to spawn instead, if any.
    pub target_hash: Option<TemplateHash>,
}

impl PrePlacedInstance {
    /// An instance that is its own canonical template.
    pub fn new(local_hash: TemplateHash) -> Self {
        Self {
            local_hash,
            target_hash: None,
        }
    }

    /// An instance whose spawn should be redirected to `target_hash`.
    pub fn with_target(local_hash: TemplateHash, target_hash: TemplateHash) -> Self {
        Self {
            local_hash,
            target_hash: Some(target_hash),
        }
    }
}

// ---------------------------------------------------------------------------
// ResolutionOutcome
// ---------------------------------------------------------------------------

/// Decision produced by [`resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Spawn the instance as its local template.
    NoOverride,
    /// A substitution is required: spawn records naming `source` should
    /// materialize the template identified by `target`.
    OverrideRequired {
        /// The instance's own template hash.
        source: TemplateHash,
        /// The hash of the template to spawn instead.
        target: TemplateHash,
    },
}

/// Decide whether a pre-placed instance needs a template substitution.
///
/// Authority always keeps the template it physically placed. A remote
/// participant needs a substitution only when a target hash is configured
/// and differs from the instance's own hash.
pub fn resolve(instance: &PrePlacedInstance, role: AuthorityRole) -> ResolutionOutcome {
    if role.is_authority() {
        return ResolutionOutcome::NoOverride;
    }
    match instance.target_hash {
        None => ResolutionOutcome::NoOverride,
        Some(target) if target == instance.local_hash => ResolutionOutcome::NoOverride,
        Some(target) => ResolutionOutcome::OverrideRequired {
            source: instance.local_hash,
            target,
        },
    }
}

// ---------------------------------------------------------------------------
// register_override
// ---------------------------------------------------------------------------

/// What [`register_override`] did for an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// No substitution was required; the table was not touched.
    NoOverride,
    /// A new override entry was registered.
    Registered,
    /// Another instance already registered the same source hash; no-op.
    AlreadyPresent,
    /// The target hash names no known template. Nothing was registered and
    /// the instance falls back to spawning as its local template.
    UnknownTarget,
    /// The table was already frozen when registration was attempted. The
    /// registration was refused; it could no longer influence spawning.
    RejectedLate,
}

/// Run resolution for one pre-placed instance and register the resulting
/// override, if any.
///
/// Called once per instance when its containing scene finishes loading.
/// The target template is looked up lazily, against the templates known at
/// that moment. All failure paths are non-fatal: they are reported through
/// `diagnostics` (when a sink is supplied) and folded into the returned
/// [`RegisterOutcome`].
pub fn register_override(
    instance: &PrePlacedInstance,
    role: AuthorityRole,
    templates: &TemplateSet,
    table: &mut OverrideTable,
    mut diagnostics: Option<&mut dyn DiagnosticsSink>,
) -> RegisterOutcome {
    let (source, target) = match resolve(instance, role) {
        ResolutionOutcome::NoOverride => {
            debug!(local = %instance.local_hash, ?role, "no template override required");
            return RegisterOutcome::NoOverride;
        }
        ResolutionOutcome::OverrideRequired { source, target } => (source, target),
    };

    let Some(target_template) = templates.find_by_hash(target) else {
        if let Some(sink) = diagnostics.as_deref_mut() {
            sink.log_message(
                &format!("no template registered for override target {target}; spawning {source} as placed"),
                Some(DIAGNOSTIC_TTL),
            );
        }
        return RegisterOutcome::UnknownTarget;
    };

    match table.insert(source, target_template.clone()) {
        Ok(InsertOutcome::Inserted) => RegisterOutcome::Registered,
        Ok(InsertOutcome::AlreadyPresent) => RegisterOutcome::AlreadyPresent,
        Err(ReplicationError::LateRegistration { .. }) => {
            if let Some(sink) = diagnostics.as_deref_mut() {
                sink.log_message(
                    &format!("override {source} -> {target} arrived after the spawn handshake; refused"),
                    Some(DIAGNOSTIC_TTL),
                );
            }
            RegisterOutcome::RejectedLate
        }
        Err(other) => {
            // insert only fails with LateRegistration today; keep the
            // fallback observable if that ever changes.
            debug!(error = %other, "override registration failed");
            RegisterOutcome::RejectedLate
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::EntityTemplate;

    fn known_templates() -> TemplateSet {
        let mut set = TemplateSet::new();
        set.register(EntityTemplate::with_hash("emitter.legacy", TemplateHash(100)));
        set.register(EntityTemplate::with_hash("emitter.current", TemplateHash(200)));
        set
    }

    /// Sink that records every message it receives.
    #[derive(Default)]
    struct RecordingSink {
        messages: Vec<String>,
    }

    impl DiagnosticsSink for RecordingSink {
        fn log_message(&mut self, message: &str, _display_for: Option<Duration>) {
            self.messages.push(message.to_owned());
        }
    }

    // -- resolve decision table ---------------------------------------------

    #[test]
    fn authority_never_overrides() {
        let instances = [
            PrePlacedInstance::new(TemplateHash(100)),
            PrePlacedInstance::with_target(TemplateHash(100), TemplateHash(100)),
            PrePlacedInstance::with_target(TemplateHash(100), TemplateHash(200)),
        ];
        for instance in &instances {
            assert_eq!(
                resolve(instance, AuthorityRole::Authority),
                ResolutionOutcome::NoOverride
            );
        }
    }

    #[test]
    fn remote_without_target_resolves_to_no_override() {
        let instance = PrePlacedInstance::new(TemplateHash(100));
        assert_eq!(
            resolve(&instance, AuthorityRole::Remote),
            ResolutionOutcome::NoOverride
        );
    }

    #[test]
    fn remote_with_matching_target_resolves_to_no_override() {
        let instance = PrePlacedInstance::with_target(TemplateHash(100), TemplateHash(100));
        assert_eq!(
            resolve(&instance, AuthorityRole::Remote),
            ResolutionOutcome::NoOverride
        );
    }

    #[test]
    fn remote_with_differing_target_requires_override() {
        let instance = PrePlacedInstance::with_target(TemplateHash(100), TemplateHash(200));
        assert_eq!(
            resolve(&instance, AuthorityRole::Remote),
            ResolutionOutcome::OverrideRequired {
                source: TemplateHash(100),
                target: TemplateHash(200),
            }
        );
    }

    // -- register_override --------------------------------------------------

    #[test]
    fn remote_override_is_registered_into_the_table() {
        let templates = known_templates();
        let mut table = OverrideTable::new();
        let instance = PrePlacedInstance::with_target(TemplateHash(100), TemplateHash(200));

        let outcome = register_override(
            &instance,
            AuthorityRole::Remote,
            &templates,
            &mut table,
            None,
        );

        assert_eq!(outcome, RegisterOutcome::Registered);
        assert_eq!(
            table.resolve(TemplateHash(100)).unwrap().hash(),
            TemplateHash(200)
        );
    }

    #[test]
    fn authority_registration_never_mutates_the_table() {
        let templates = known_templates();
        let mut table = OverrideTable::new();
        let instance = PrePlacedInstance::with_target(TemplateHash(100), TemplateHash(200));

        let outcome = register_override(
            &instance,
            AuthorityRole::Authority,
            &templates,
            &mut table,
            None,
        );

        assert_eq!(outcome, RegisterOutcome::NoOverride);
        assert!(table.is_empty());
    }

    #[test]
    fn matching_hashes_never_mutate_the_table() {
        let templates = known_templates();
        let mut table = OverrideTable::new();
        let instance = PrePlacedInstance::with_target(TemplateHash(100), TemplateHash(100));

        let outcome = register_override(
            &instance,
            AuthorityRole::Remote,
            &templates,
            &mut table,
            None,
        );

        assert_eq!(outcome, RegisterOutcome::NoOverride);
        assert!(table.is_empty());
    }

    #[test]
    fn second_instance_of_same_template_is_a_silent_noop() {
        let templates = known_templates();
        let mut table = OverrideTable::new();
        let instance = PrePlacedInstance::with_target(TemplateHash(100), TemplateHash(200));

        let first = register_override(
            &instance,
            AuthorityRole::Remote,
            &templates,
            &mut table,
            None,
        );
        let second = register_override(
            &instance,
            AuthorityRole::Remote,
            &templates,
            &mut table,
            None,
        );

        assert_eq!(first, RegisterOutcome::Registered);
        assert_eq!(second, RegisterOutcome::AlreadyPresent);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn unknown_target_falls_back_and_reports_a_diagnostic() {
        let templates = known_templates();
        let mut table = OverrideTable::new();
        let mut sink = RecordingSink::default();
        let instance = PrePlacedInstance::with_target(TemplateHash(100), TemplateHash(999));

        let outcome = register_override(
            &instance,
            AuthorityRole::Remote,
            &templates,
            &mut table,
            Some(&mut sink as &mut dyn DiagnosticsSink),
        );

        assert_eq!(outcome, RegisterOutcome::UnknownTarget);
        assert!(table.is_empty());
        assert_eq!(sink.messages.len(), 1);
        assert!(sink.messages[0].contains("no template registered"));
    }

    #[test]
    fn unknown_target_without_sink_is_silently_dropped() {
        let templates = known_templates();
        let mut table = OverrideTable::new();
        let instance = PrePlacedInstance::with_target(TemplateHash(100), TemplateHash(999));

        let outcome = register_override(
            &instance,
            AuthorityRole::Remote,
            &templates,
            &mut table,
            None,
        );

        assert_eq!(outcome, RegisterOutcome::UnknownTarget);
        assert!(table.is_empty());
    }

    #[test]
    fn registration_after_freeze_is_refused_with_a_diagnostic() {
        let templates = known_templates();
        let mut table = OverrideTable::new();
        let mut sink = RecordingSink::default();
        table.freeze();
        let instance = PrePlacedInstance::with_target(TemplateHash(100), TemplateHash(200));

        let outcome = register_override(
            &instance,
            AuthorityRole::Remote,
            &templates,
            &mut table,
            Some(&mut sink as &mut dyn DiagnosticsSink),
        );

        assert_eq!(outcome, RegisterOutcome::RejectedLate);
        assert!(table.is_empty());
        assert_eq!(sink.messages.len(), 1);
        assert!(sink.messages[0].contains("after the spawn handshake"));
    }
}
