//! Liveness helpers for a local Ollama server.

use std::process::Stdio;
use std::time::Duration;

use tracing::{info, warn};

use super::LLMError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const STARTUP_WAIT: Duration = Duration::from_secs(3);

/// Strips the OpenAI-compatible `/v1` suffix to get the native API root.
pub fn native_root(base_url: &str) -> &str {
    let trimmed = base_url.trim_end_matches('/');
    trimmed.strip_suffix("/v1").unwrap_or(trimmed)
}

/// Returns true if `GET <root>/api/tags` answers with 200.
pub async fn is_running(base_url: &str) -> bool {
    let url = format!("{}/api/tags", native_root(base_url));
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(c) => c,
        Err(_) => return false,
    };
    match client.get(&url).send().await {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}

/// Makes sure an Ollama server answers, spawning `ollama serve` if needed.
pub async fn ensure_running(base_url: &str) -> Result<(), LLMError> {
    if is_running(base_url).await {
        return Ok(());
    }

    info!("ollama not running, attempting to start it");
    let spawned = tokio::process::Command::new("ollama")
        .arg("serve")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(false)
        .spawn();

    if let Err(e) = spawned {
        warn!(error = %e, "failed to spawn ollama");
        return Err(LLMError::OllamaUnavailable(base_url.to_string()));
    }

    tokio::time::sleep(STARTUP_WAIT).await;

    if is_running(base_url).await {
        info!("ollama started");
        Ok(())
    } else {
        Err(LLMError::OllamaUnavailable(base_url.to_string()))
    }
}
