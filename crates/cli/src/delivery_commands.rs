//! CLI command for one-shot outbound delivery.

use std::{sync::Arc, time::Duration};

use {
    anyhow::Result,
    portico_channels::{
        DeliveryRouter, FilePluginRegistry, HttpDelivery, PluginRegistry, StaticPluginRegistry,
    },
    portico_config::PorticoConfig,
    tracing::debug,
};

fn router(config: &PorticoConfig) -> Result<DeliveryRouter> {
    let registry: Arc<dyn PluginRegistry> = match &config.delivery.registry_path {
        Some(path) => Arc::new(FilePluginRegistry::new(path)),
        None => {
            debug!("no plugin registry configured");
            Arc::new(StaticPluginRegistry::default())
        },
    };
    let http = HttpDelivery::new(Duration::from_secs(config.delivery.timeout_secs))?;
    Ok(DeliveryRouter::new(registry, http))
}

pub async fn handle_deliver(
    config: &PorticoConfig,
    channel: &str,
    user: &str,
    content: &str,
) -> Result<()> {
    if router(config)?.deliver(channel, user, content).await {
        println!("delivered to {channel}");
        Ok(())
    } else {
        eprintln!("delivery to {channel} failed");
        std::process::exit(1);
    }
}
