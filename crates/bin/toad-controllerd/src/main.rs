//! # toad-controllerd: smart-plug grid controller daemon
//!
//! Composition root that wires all adapters together and runs the control
//! loop.
//!
//! ## Responsibilities
//! - Load configuration (`toad.toml`, env vars)
//! - Initialise logging
//! - Connect to the MQTT broker and build the etcd registry reader
//! - Construct the command pipeline and the control loop, injecting adapters
//!   via port traits
//! - Stop gracefully on SIGTERM/SIGINT
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use toad_adapter_etcd::EtcdRegistry;
use toad_adapter_mqtt::MqttBus;
use toad_adapter_smartplug::SmartPlugClient;
use toad_app::control_loop::ControlLoop;
use toad_app::pipeline::CommandPipeline;
use toad_app::registry_cache::RegistryCache;
use toad_domain::resolver::TopicResolver;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Adapters
    let registry = EtcdRegistry::new(&config.registry.etcd)?;
    let transport = SmartPlugClient::new(&config.command);
    let (bus, inbound) = MqttBus::connect(&config.mqtt).await?;

    // Application
    let resolver = TopicResolver::new(config.mqtt.base_topic.as_str(), config.workspace);
    tracing::info!(
        subscription = %resolver.subscription(),
        registry = %config.registry.etcd.endpoint,
        namespace = %config.registry.etcd.namespace,
        columns_per_row = config.workspace.columns_per_row,
        rows_per_column = config.workspace.rows_per_column,
        "starting controller"
    );
    let pipeline = CommandPipeline::new(resolver, Arc::new(RegistryCache::new()), transport);
    let control = ControlLoop::new(bus, registry, pipeline, config.control_loop());

    let stop = CancellationToken::new();
    tokio::spawn(shutdown_signal(stop.clone()));
    control.run(inbound, stop).await?;

    tracing::info!("controller stopped");
    Ok(())
}

/// Cancel `stop` on SIGINT or SIGTERM.
async fn shutdown_signal(stop: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received");
    stop.cancel();
}
