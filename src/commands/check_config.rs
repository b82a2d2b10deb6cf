use anyhow::{bail, Context};

use super::load_config;

pub async fn run(config_path: Option<&str>) -> anyhow::Result<()> {
    let Some(path) = config_path else {
        bail!("check-config requires --config <FILE>");
    };

    let config = load_config(Some(path))?;
    config
        .validate()
        .with_context(|| format!("{} is not a valid configuration", path))?;
    let handlers = config.handler_registry()?;

    println!("✓ {} is valid\n", path);
    println!("  handlers:        {}", handlers.len());
    println!("  routing rules:   {}", config.routing.rules.len());
    println!(
        "  intent patterns: {}{}",
        config.routing.intents.patterns.len(),
        if config.routing.intents.enabled { "" } else { " (disabled)" }
    );
    println!("  capacity:        {}", config.scheduler.max_concurrent_jobs);
    println!("  lease timeout:   {:?}", config.scheduler.lease_timeout);
    println!("  max retries:     {}", config.scheduler.retry.max_retries);
    Ok(())
}
