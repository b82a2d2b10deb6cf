use agentgate_runtime::GenerationRequest;
use anyhow::{bail, Context};

use super::{build_registry, load_config};

pub async fn run(config_path: Option<&str>, request_json: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = build_registry(&config)?;

    let request: GenerationRequest =
        serde_json::from_str(request_json).context("request is not a valid JSON object")?;

    match registry.route(&request) {
        Some(decision) => {
            println!("{}", serde_json::to_string_pretty(&decision)?);
            Ok(())
        }
        None => bail!("no agent could be determined for the request"),
    }
}
