use agentgate_runtime::HandlerEntry;

use super::{build_registry, load_config};

pub async fn run(config_path: Option<&str>, json: bool) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = build_registry(&config)?;
    let handlers = registry.list_handlers();

    if json {
        println!("{}", serde_json::to_string_pretty(&handlers)?);
        return Ok(());
    }

    println!("{} handler(s)\n", handlers.len());
    for entry in &handlers {
        println!("{}", describe(entry));
    }
    Ok(())
}

fn describe(entry: &HandlerEntry) -> String {
    let manifest = &entry.manifest;
    let estimate = match manifest.cost {
        Some(cost) => format!("${:.2} / {:?}", cost.cost_usd, cost.duration),
        None => "default estimate".to_string(),
    };
    format!(
        "• {:<24} {:<14} {:<9} {}",
        entry.name,
        format!("{:?}", manifest.category).to_lowercase(),
        format!("{:?}", manifest.complexity).to_lowercase(),
        estimate
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentgate_runtime::handlers::{ComplexityTier, HandlerCategory, HandlerManifest};
    use std::time::Duration;

    #[test]
    fn test_describe_includes_estimate() {
        let manifest = HandlerManifest::new("blog-writer", HandlerCategory::Copywriting, ComplexityTier::Moderate)
            .with_cost(0.04, Duration::from_secs(45));
        let line = describe(&HandlerEntry {
            name: manifest.name.clone(),
            manifest,
        });
        assert!(line.contains("blog-writer"));
        assert!(line.contains("copywriting"));
        assert!(line.contains("$0.04"));
    }

    #[test]
    fn test_describe_without_estimate() {
        let manifest = HandlerManifest::new("custom", HandlerCategory::Research, ComplexityTier::Simple);
        let line = describe(&HandlerEntry {
            name: manifest.name.clone(),
            manifest,
        });
        assert!(line.contains("default estimate"));
    }
}
