//! Loopback demo: a host and a client session in one process.
//!
//! The scene places an emitter from the legacy template but targets the
//! current one, so the client must substitute templates before the spawn
//! message arrives. Run with `RUST_LOG=debug` to watch the resolution and
//! dispatch steps.

use std::time::Instant;

use anyhow::Result;
use diorama_session::prelude::*;
use tracing_subscriber::EnvFilter;

fn known_templates() -> TemplateSet {
    let mut set = TemplateSet::new();
    set.register(EntityTemplate::new("emitter.legacy"));
    set.register(EntityTemplate::new("emitter.current"));
    set
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let legacy = TemplateHash::from_label("emitter.legacy");
    let current = TemplateHash::from_label("emitter.current");

    let scene = SceneDescriptor::new("plaza")
        .with_entry(
            PrePlacedEntry::new("rooftop emitter", PrePlacedInstance::with_target(legacy, current))
                .with_config(EmitterConfig {
                    tint: [0.9, 0.3, 0.1],
                    burst_count: 16,
                    interval_secs: 0.5,
                    auto_start: true,
                }),
        )
        .with_entry(PrePlacedEntry::new(
            "gate emitter",
            PrePlacedInstance::new(current),
        ));

    // Host: load the scene, start listening, approve one connection.
    let mut host = SessionRuntime::new(SessionMode::Host, known_templates());
    host.load_scene(&scene)?;
    host.begin_accepting_connections()?;
    let approval_bytes = host.build_connection_approval()?.to_bytes()?;
    println!("host: {}", host.scene_listing());

    // Client: load the same scene (this registers the override), then
    // process the approval the transport delivered.
    let mut client = SessionRuntime::new(SessionMode::Client, known_templates());
    client.load_scene(&scene)?;
    let approval = ConnectionApproval::from_bytes(&approval_bytes)?;
    let report = client.process_connection_approval(&approval)?;

    println!(
        "client: materialized {} entities ({} overridden, {} skipped)",
        report.materialized, report.overridden, report.skipped
    );
    for entity in client.world().iter() {
        println!(
            "client: {} -> '{}' tint {:?}, {} per burst, auto_start={}",
            entity.id(),
            entity.label(),
            entity.tint,
            entity.burst_count,
            entity.auto_start
        );
    }

    client.prune_diagnostics(Instant::now());
    for message in client.diagnostics() {
        println!("client diagnostics: {message}");
    }

    let host_report = host.shutdown();
    let client_report = client.shutdown();
    println!(
        "shutdown: host despawned {}, client despawned {} and cleared {} overrides",
        host_report.despawned, client_report.despawned, client_report.overrides_cleared
    );
    Ok(())
}
