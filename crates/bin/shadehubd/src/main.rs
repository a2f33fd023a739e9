//! # shadehubd: shadehub daemon
//!
//! Composition root that wires the controller, the background cycles and the
//! HTTP adapter together.
//!
//! ## Responsibilities
//! - Load configuration (`shadehub.toml` plus env overrides)
//! - Install the `tracing` subscriber
//! - Build the home inventory and the controller with its ports
//! - Spawn the periodic cycles, the motion completion listener and an
//!   event-logging subscriber
//! - Bind to a TCP port and serve until Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer. No domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use shadehub_adapter_http_axum::state::AppState;
use shadehub_app::controller::Controller;
use shadehub_app::energy::SeasonalEnergyStrategy;
use shadehub_app::event_bus::InProcessEventBus;
use shadehub_app::motion_timer::TokioMotionTimer;
use shadehub_app::runtime::{spawn_completion_listener, spawn_cycles};
use shadehub_domain::event::Event;
use shadehub_domain::time::now;

use crate::config::Config;

const EVENT_BUS_CAPACITY: usize = 256;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let home = config
        .build_state(now())
        .context("building home inventory")?;
    tracing::info!(
        devices = home.actuator.devices().count(),
        zones = home.zones.len(),
        schedules = home.scheduler.list().len(),
        rules = home.rules.list().len(),
        latitude = home.location.latitude,
        longitude = home.location.longitude,
        "home loaded"
    );

    // Event bus
    let event_bus = InProcessEventBus::new(EVENT_BUS_CAPACITY);
    tokio::spawn(log_events(event_bus.subscribe()));

    // Controller and background cycles
    let (timer, completions) = TokioMotionTimer::channel();
    let controller = Arc::new(Controller::new(
        home,
        event_bus,
        SeasonalEnergyStrategy,
        timer,
    ));
    spawn_completion_listener(Arc::clone(&controller), completions);
    let cycles = spawn_cycles(Arc::clone(&controller), config.cycle_intervals());

    // HTTP
    let app = shadehub_adapter_http_axum::router::build(AppState::new(controller));
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(%bind_addr, "shadehubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for cycle in cycles {
        cycle.abort();
    }
    tracing::info!("shadehubd stopped");
    Ok(())
}

async fn log_events(mut events: broadcast::Receiver<Event>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::info!(
                event_type = %event.event_type,
                device_id = ?event.device_id,
                data = %event.data,
                "event"
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event logger lagging behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
