use std::path::PathBuf;

use devrelay_core::config::load_config;
use devrelay_core::proxy::{ProxyServer, RuleSet};

pub async fn run(config_path: Option<PathBuf>, port_override: Option<u16>) -> anyhow::Result<()> {
    // Load configuration
    let mut config = load_config(config_path)?;

    // Apply port override if provided
    if let Some(port) = port_override {
        config.server.port = port;
    }

    let rules = RuleSet::compile(&config.rules)?;

    tracing::info!("Starting devrelay...");
    tracing::info!("  Port: {}", config.server.port);
    tracing::info!("  Host: {}", config.server.host);
    tracing::info!("  Static root: {:?}", config.static_files.root);

    if rules.is_empty() {
        tracing::info!("No proxy rules configured; serving the static root only.");
    } else {
        tracing::info!("Loaded {} proxy rule(s)", rules.len());
        for rule in rules.iter() {
            tracing::info!("  {} -> {}", rule.prefix(), rule.origin());
            if !rule.secure() {
                tracing::warn!(
                    "  {}: upstream TLS certificate validation is DISABLED. Local development only.",
                    rule.prefix()
                );
            }
        }
    }

    // Create and start server
    let server = ProxyServer::new(&config, rules);

    tracing::info!(
        "Dev server starting on http://{}:{}",
        config.server.host,
        config.server.port
    );
    tracing::info!("Press Ctrl+C to stop");

    // Run server (blocks until shutdown)
    server.run().await?;

    Ok(())
}
