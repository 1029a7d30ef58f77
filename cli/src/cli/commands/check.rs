use std::path::PathBuf;

use devrelay_core::config::load_config;
use devrelay_core::proxy::RuleSet;

pub fn run(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let rules = RuleSet::compile(&config.rules)?;

    println!("Configuration OK");
    println!("  Listen: {}:{}", config.server.bind_address(), config.server.port);
    println!("  Static root: {}", config.static_files.root.display());
    println!("  Rules: {}", rules.len());

    for rule in rules.iter() {
        let mut flags = Vec::new();
        if rule.change_origin() {
            flags.push("change-origin");
        }
        if !rule.secure() {
            flags.push("insecure-tls");
        }
        if rule.segment_boundary() {
            flags.push("segment-boundary");
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!("  {} -> {}{}", rule.prefix(), rule.origin(), flags);
    }

    Ok(())
}
