use anyhow::{Context, Result};
use chrono::Utc;
use necroton::config::{load_config, HostConfig};
use necroton::entity::{EntitySpec, Stats};
use necroton::event::{
    ActionResolvedEvent, ColliderTriggerEvent, EntityCollisionEvent, EntityCorrectionEvent,
    EntityDamageEvent, EntityDeathEvent, EntityMoveEvent, EntitySpawnEvent, PhysicsContactEvent,
    SnapshotEvent, TickCompleteEvent,
};
use necroton::input::InputMessage;
use necroton::math::Vec2;
use necroton::Engine;
use std::time::Duration;
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

const DEFAULT_CONFIG_PATH: &str = "necroton.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "necroton=info".into()),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(&config_path)?;
    let engine_config = config.engine.with_env_overrides();
    let host = config.host;

    info!(config = %config_path, mode = %engine_config.mode, "Necroton starting...");

    let mut engine = Engine::create(engine_config).context("Failed to create engine")?;
    subscribe_logging(&mut engine);

    engine.start();
    if host.spawn_demo_entities {
        spawn_demo_entities(&mut engine, &host)?;
    }

    run(&mut engine, &host).await;

    engine.stop();
    info!(tick = engine.current_tick(), "Necroton stopped");

    Ok(())
}

/// Drive `step_fixed` at the configured rate until a shutdown signal or `run_ticks`
async fn run(engine: &mut Engine, host: &HostConfig) {
    let tick_rate = u64::from(engine.config().tick_rate);
    let period = Duration::from_secs_f64(1.0 / tick_rate as f64);
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Scripted demo client: input after 5 seconds, state report after 10
    let input_tick = tick_rate * 5;
    let report_tick = tick_rate * 10;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = timer.tick() => {
                let tick = engine.step_fixed();

                if tick == input_tick {
                    queue_demo_inputs(engine, &host.demo_client);
                }
                if tick == report_tick {
                    let snapshot = engine.get_snapshot();
                    info!(
                        tick,
                        entities = snapshot.entities.len(),
                        snapshots = engine.snapshots().len(),
                        "Current game state"
                    );
                }
                if host.run_ticks.map_or(false, |limit| tick >= limit) {
                    info!(tick, "Reached configured tick limit");
                    break;
                }
            }
        }
    }
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, shutting down gracefully..."),
            Err(e) => {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, shutting down gracefully...");
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn spawn_demo_entities(engine: &mut Engine, host: &HostConfig) -> Result<()> {
    info!("Spawning example entities...");

    let character = EntitySpec::character(
        Vec2::new(100.0, 100.0),
        &host.demo_client,
        100,
        Stats::new(10, 5, 1.0, 1.0),
    )
    .input_driven();
    let character_id = engine
        .spawn_entity(character)
        .context("Failed to spawn demo character")?;

    let collider = EntitySpec::collider(Vec2::new(200.0, 200.0), "server", 50.0, 50.0);
    let collider_id = engine
        .spawn_entity(collider)
        .context("Failed to spawn demo collider")?;

    info!(%character_id, %collider_id, "Spawned example entities");
    Ok(())
}

fn queue_demo_inputs(engine: &mut Engine, client_id: &str) {
    info!(client_id, "Simulating client input...");

    let next = engine.current_tick() + 1;
    let moves = [Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
    for (offset, movement) in moves.into_iter().enumerate() {
        let sequence = offset as u64 + 1;
        let input = InputMessage::new(client_id, sequence, next + offset as u64, movement)
            .with_timestamp(Utc::now().timestamp_millis());
        match engine.queue_input(input) {
            Some(due) => debug!(client_id, sequence, due, "Queued input"),
            None => warn!(client_id, sequence, "Demo input rejected"),
        }
    }
}

/// Log every engine event through tracing
fn subscribe_logging(engine: &mut Engine) {
    engine.subscribe_event(|e: &EntitySpawnEvent| {
        info!(
            tick = e.tick,
            entity_id = %e.entity_id,
            entity_type = %e.entity_type,
            x = e.pos.x,
            y = e.pos.y,
            owner_id = %e.owner_id,
            "Entity spawned"
        )
    });
    engine.subscribe_event(|e: &EntityMoveEvent| {
        debug!(
            tick = e.tick,
            entity_id = %e.entity_id,
            x = e.pos.x,
            y = e.pos.y,
            vx = e.vel.x,
            vy = e.vel.y,
            "Entity moved"
        )
    });
    engine.subscribe_event(|e: &EntityDamageEvent| {
        info!(
            tick = e.tick,
            entity_id = %e.entity_id,
            damage = e.damage,
            new_hp = e.new_hp,
            attacker_id = ?e.attacker_id,
            "Entity damaged"
        )
    });
    engine.subscribe_event(|e: &EntityDeathEvent| {
        info!(tick = e.tick, entity_id = %e.entity_id, killer_id = ?e.killer_id, "Entity died")
    });
    engine.subscribe_event(|e: &EntityCollisionEvent| {
        info!(
            tick = e.tick,
            entity_a = %e.entity_id_a,
            entity_b = %e.entity_id_b,
            x = e.contact_point.x,
            y = e.contact_point.y,
            "Entity collision"
        )
    });
    engine.subscribe_event(|e: &EntityCorrectionEvent| {
        info!(
            tick = e.tick,
            entity_id = %e.entity_id,
            x = e.corrected_pos.x,
            y = e.corrected_pos.y,
            "Entity corrected"
        )
    });
    engine.subscribe_event(|e: &PhysicsContactEvent| {
        debug!(
            tick = e.tick,
            entity_a = %e.entity_id_a,
            entity_b = %e.entity_id_b,
            impulse = e.impulse,
            "Physics contact"
        )
    });
    engine.subscribe_event(|e: &ColliderTriggerEvent| {
        info!(
            tick = e.tick,
            entity_id = %e.entity_id,
            collider_id = %e.collider_id,
            "Collider triggered"
        )
    });
    engine.subscribe_event(|e: &ActionResolvedEvent| {
        info!(
            tick = e.tick,
            actor_id = %e.actor_id,
            action = ?e.action_type,
            result = ?e.result,
            "Action resolved"
        )
    });
    engine.subscribe_event(|e: &SnapshotEvent| debug!(tick = e.tick, "Snapshot emitted"));
    engine.subscribe_event(|e: &TickCompleteEvent| debug!(tick = e.tick, "Tick completed"));
}
