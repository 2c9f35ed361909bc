//! Session runtime: the application glue around the replication core.
//!
//! [`SessionRuntime`] owns everything with session lifetime -- the known
//! templates, the override table, the entity world, and the on-screen
//! diagnostics log -- and sequences the lifecycle the core's timing
//! contract depends on:
//!
//! 1. Scenes load. Each pre-placed entry materializes locally and runs
//!    identity resolution exactly once (populating the override table on
//!    clients, a no-op on the host).
//! 2. The host starts accepting connections. Scene loading is closed from
//!    this point, so every override decision exists before any handshake.
//! 3. The host builds a [`ConnectionApproval`] per approved connection;
//!    the client processes it, materializing every record through the
//!    spawn dispatcher and then freezing the override table.
//! 4. Teardown despawns the session's entities and clears the table.

use std::time::Instant;

use diorama_replication::diagnostics::{DiagnosticsSink, ScreenLog};
use diorama_replication::identity::{AuthorityRole, TemplateHash};
use diorama_replication::overrides::OverrideTable;
use diorama_replication::resolver::register_override;
use diorama_replication::sync::{synchronize, ConfiguredEntity, FrameBuffer, SyncContext};
use diorama_replication::template::TemplateSet;
use tracing::{debug, info};

use crate::dispatch::dispatch_spawn;
use crate::handshake::{ConnectionApproval, SpawnRecord};
use crate::scene::SceneDescriptor;
use crate::world::{EntityId, SceneWorld};
use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionMode
// ---------------------------------------------------------------------------

/// How this participant joined the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Hosts the session and owns entity state.
    Host,
    /// Joins a hosted session.
    Client,
}

impl SessionMode {
    /// The replication role this mode maps to.
    pub fn role(self) -> AuthorityRole {
        match self {
            SessionMode::Host => AuthorityRole::Authority,
            SessionMode::Client => AuthorityRole::Remote,
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Summary of one processed connection approval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Entities materialized from spawn records.
    pub materialized: usize,
    /// How many of those went through an override substitution.
    pub overridden: usize,
    /// Records skipped because no template could be resolved for them.
    pub skipped: usize,
}

/// Summary of a session teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Entities removed from the world.
    pub despawned: usize,
    /// Override entries dropped from the table.
    pub overrides_cleared: usize,
}

// ---------------------------------------------------------------------------
// SessionRuntime
// ---------------------------------------------------------------------------

/// One pre-placed instance the runtime materialized at scene load.
#[derive(Debug, Clone, Copy)]
struct LoadedInstance {
    source: TemplateHash,
    entity: EntityId,
}

/// Owns session-lifetime state and drives the replication lifecycle.
pub struct SessionRuntime {
    mode: SessionMode,
    templates: TemplateSet,
    overrides: OverrideTable,
    world: SceneWorld,
    screen_log: ScreenLog,
    loaded_scenes: Vec<String>,
    instances: Vec<LoadedInstance>,
    accepting_connections: bool,
}

impl SessionRuntime {
    /// Create a runtime for the given mode over a set of known templates.
    pub fn new(mode: SessionMode, templates: TemplateSet) -> Self {
        Self {
            mode,
            templates,
            overrides: OverrideTable::new(),
            world: SceneWorld::new(),
            screen_log: ScreenLog::new(),
            loaded_scenes: Vec::new(),
            instances: Vec::new(),
            accepting_connections: false,
        }
    }

    /// The mode this runtime was created with.
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// The replication role of this participant.
    pub fn role(&self) -> AuthorityRole {
        self.mode.role()
    }

    /// The known-template set.
    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// The override table.
    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// The entity world.
    pub fn world(&self) -> &SceneWorld {
        &self.world
    }

    /// The entity world, mutably.
    pub fn world_mut(&mut self) -> &mut SceneWorld {
        &mut self.world
    }

    /// Names of the scenes loaded so far, in load order.
    pub fn loaded_scenes(&self) -> &[String] {
        &self.loaded_scenes
    }

    /// One-line summary of loaded scenes for display.
    pub fn scene_listing(&self) -> String {
        let mut listing = String::from("Scenes loaded: ");
        for name in &self.loaded_scenes {
            listing.push('[');
            listing.push_str(name);
            listing.push(']');
        }
        listing
    }

    /// Currently visible diagnostic messages, newest first.
    pub fn diagnostics(&self) -> impl Iterator<Item = &str> {
        self.screen_log.messages()
    }

    /// Drop expired diagnostic messages. Call from the update loop.
    pub fn prune_diagnostics(&mut self, now: Instant) {
        self.screen_log.prune(now);
    }

    /// Report a message to the session's diagnostics log.
    pub fn log_message(&mut self, message: &str) {
        self.screen_log.log_message(message, None);
    }

    /// Load a scene: materialize its pre-placed entities and run identity
    /// resolution for each, exactly once.
    ///
    /// Must happen before the session starts exchanging spawn messages;
    /// loading after that point is refused, because resolution could no
    /// longer influence spawning.
    pub fn load_scene(&mut self, scene: &SceneDescriptor) -> Result<(), SessionError> {
        if self.accepting_connections || self.overrides.is_frozen() {
            return Err(SessionError::SceneLoadedTooLate {
                name: scene.name().to_owned(),
            });
        }

        for entry in scene.entries() {
            let Some(template) = self.templates.find_by_hash(entry.instance.local_hash) else {
                self.screen_log.log_message(
                    &format!(
                        "scene '{}' places unknown template {}; entry '{}' skipped",
                        scene.name(),
                        entry.instance.local_hash,
                        entry.label
                    ),
                    None,
                );
                continue;
            };
            let template = template.clone();

            let id = self.world.spawn(&template, false);
            let entity = self
                .world
                .get_mut(id)
                .expect("entity exists immediately after spawn");
            entity.apply_config(entry.config.clone());

            register_override(
                &entry.instance,
                self.mode.role(),
                &self.templates,
                &mut self.overrides,
                Some(&mut self.screen_log as &mut dyn DiagnosticsSink),
            );

            self.instances.push(LoadedInstance {
                source: entry.instance.local_hash,
                entity: id,
            });
        }

        debug!(
            scene = scene.name(),
            entries = scene.len(),
            overrides = self.overrides.len(),
            "scene loaded"
        );
        self.loaded_scenes.push(scene.name().to_owned());
        Ok(())
    }

    /// Host only: start accepting connections.
    ///
    /// All scenes must be loaded first -- identity resolution is complete
    /// at this point and no further scene may load for this session.
    pub fn begin_accepting_connections(&mut self) -> Result<(), SessionError> {
        if self.mode != SessionMode::Host {
            return Err(SessionError::WrongMode {
                required: SessionMode::Host,
                actual: self.mode,
            });
        }
        if self.loaded_scenes.is_empty() {
            return Err(SessionError::NoSceneLoaded);
        }
        self.accepting_connections = true;
        info!("session accepting connections");
        Ok(())
    }

    /// Host only: build the connection-approval message for a newly
    /// approved connection.
    ///
    /// Each pre-placed instance contributes one spawn record: its source
    /// identity hash plus the payload written by the authority-side
    /// spawn-state synchronizer.
    pub fn build_connection_approval(&mut self) -> Result<ConnectionApproval, SessionError> {
        if self.mode != SessionMode::Host {
            return Err(SessionError::WrongMode {
                required: SessionMode::Host,
                actual: self.mode,
            });
        }
        if !self.accepting_connections {
            return Err(SessionError::NotAcceptingConnections);
        }

        let mut records = Vec::with_capacity(self.instances.len());
        for instance in &self.instances {
            let Some(entity) = self.world.get_mut(instance.entity) else {
                continue;
            };
            let mut buffer = FrameBuffer::new();
            synchronize(entity, SyncContext::Writer(&mut buffer))?;
            records.push(SpawnRecord {
                source: instance.source,
                payload: buffer.into_bytes(),
            });
        }
        Ok(ConnectionApproval::new(records))
    }

    /// Client only: process the connection approval received from the host.
    ///
    /// Materializes every spawn record through the dispatcher, then freezes
    /// the override table -- registrations arriving after this point can no
    /// longer influence spawning and are refused. One-shot per session.
    pub fn process_connection_approval(
        &mut self,
        approval: &ConnectionApproval,
    ) -> Result<DispatchReport, SessionError> {
        if self.mode != SessionMode::Client {
            return Err(SessionError::WrongMode {
                required: SessionMode::Client,
                actual: self.mode,
            });
        }
        if self.overrides.is_frozen() {
            return Err(SessionError::ApprovalAlreadyProcessed);
        }

        let mut report = DispatchReport::default();
        for record in &approval.records {
            match dispatch_spawn(
                record,
                &self.overrides,
                &self.templates,
                &mut self.world,
                Some(&mut self.screen_log as &mut dyn DiagnosticsSink),
            ) {
                Ok(outcome) => {
                    report.materialized += 1;
                    if outcome.overridden {
                        report.overridden += 1;
                    }
                }
                Err(err) => {
                    self.screen_log.log_message(
                        &format!("spawn record {} skipped: {err}", record.source),
                        None,
                    );
                    report.skipped += 1;
                }
            }
        }

        self.overrides.freeze();
        info!(
            materialized = report.materialized,
            overridden = report.overridden,
            skipped = report.skipped,
            "connection approval processed"
        );
        Ok(report)
    }

    /// Tear the session down: despawn every entity, clear the override
    /// table, and forget loaded scenes.
    pub fn shutdown(&mut self) -> ShutdownReport {
        let overrides_cleared = self.overrides.len();
        let despawned = self.world.despawn_all();
        self.overrides.clear();
        self.instances.clear();
        self.loaded_scenes.clear();
        self.accepting_connections = false;
        info!(despawned, overrides_cleared, "session shut down");
        ShutdownReport {
            despawned,
            overrides_cleared,
        }
    }
}
