use std::path::Path;

use agentgate_runtime::{DispatchError, GenerationRequest};
use anyhow::Context;

use super::{build_registry, load_config};

pub async fn run(config_path: Option<&str>, requests_path: &str) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = build_registry(&config)?;
    let requests = read_requests(Path::new(requests_path))?;

    let mut queued = 0;
    for (line, request) in requests {
        match registry.submit(request).await {
            Ok(submission) => {
                queued += 1;
                println!(
                    "queued   line {:<4} {} -> {} ({})",
                    line, submission.job_id, submission.decision.handler, submission.decision.reason
                );
            }
            Err(DispatchError::NoAgentDetermined) => {
                println!("skipped  line {:<4} no agent determined", line);
            }
            Err(e) => return Err(e).with_context(|| format!("line {}", line)),
        }
    }

    println!("\n{} job(s) queued, draining\n", queued);

    let mut order = 0;
    while let Some(job) = registry.get_next_job().await {
        order += 1;
        println!(
            "#{:<3} priority {:<4} {:<24} {}",
            order, job.priority, job.handler, job.job_id
        );
        registry.complete_job(job.job_id).await;
    }

    registry.shutdown();
    println!(
        "\n{}",
        serde_json::to_string_pretty(&registry.get_queue_stats())?
    );
    Ok(())
}

/// Parse one request per non-blank line, keeping 1-based line numbers
fn read_requests(path: &Path) -> anyhow::Result<Vec<(usize, GenerationRequest)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .map(|request| (index + 1, request))
                .with_context(|| format!("{}:{} is not a valid request", path.display(), index + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_requests_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"description": "brand story", "priority": 2}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"description": "tagline", "agent": "tagline-generator"}}"#).unwrap();

        let requests = read_requests(file.path()).unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].0, 1);
        assert_eq!(requests[0].1.priority, Some(2));
        assert_eq!(requests[1].0, 3);
        assert_eq!(requests[1].1.agent.as_deref(), Some("tagline-generator"));
    }

    #[test]
    fn test_read_requests_reports_bad_line() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"description": "ok"}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        let err = read_requests(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains(":2 is not a valid request"));
    }
}
