//! AI completion client infrastructure.
//!
//! The analysis engine only ever talks to an LLM through the [`LlmClient`]
//! trait; every failure mode (spawn error, non-zero exit, garbage output) is
//! surfaced uniformly as [`LlmError`] and recovered by the caller. Prompt
//! construction and response parsing live in `prompt` and
//! `analysis::validator` respectively.
//!
//! # Configuration
//!
//! LLM settings can be configured via:
//! - CLI arguments: `--model`
//! - Environment variables: `GIT_GAUGE_LLM_MODEL`
//!
//! CLI arguments take precedence over environment variables.

use std::env;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;

use log::debug;

/// Trait for LLM completion clients.
pub trait LlmClient: Send + Sync {
    /// Send a prompt to the LLM and return the completion response.
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Errors from LLM operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM client error: {0}")]
    ClientError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Configuration for LLM clients.
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Optional model override (e.g., "sonnet", "haiku").
    pub model: Option<String>,
}

impl LlmConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create config from environment variables.
    ///
    /// Reads `GIT_GAUGE_LLM_MODEL`.
    pub fn from_env() -> Self {
        Self {
            model: env::var("GIT_GAUGE_LLM_MODEL").ok(),
        }
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Merge with CLI overrides. CLI values take precedence.
    pub fn with_overrides(mut self, model: Option<String>) -> Self {
        if let Some(m) = model {
            self.model = Some(m);
        }
        self
    }

    /// Create an LLM client from this configuration.
    pub fn create_client(&self) -> Arc<dyn LlmClient> {
        Arc::new(ClaudeCliClient {
            model: self.model.clone(),
        })
    }
}

/// Client that invokes the local `claude` CLI.
pub struct ClaudeCliClient {
    pub model: Option<String>,
}

impl ClaudeCliClient {
    pub fn new() -> Self {
        Self { model: None }
    }

    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
        }
    }
}

impl Default for ClaudeCliClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmClient for ClaudeCliClient {
    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        // Use stdin for the prompt to avoid command line length limits
        let mut args = vec!["--print"];

        let model_str;
        if let Some(ref model) = self.model {
            model_str = model.clone();
            args.push("--model");
            args.push(&model_str);
        }

        let mut child = Command::new("claude")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(prompt.as_bytes())?;
        }

        let output = child.wait_with_output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LlmError::ClientError(format!(
                "claude CLI failed: {}",
                stderr.trim()
            )));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("Claude CLI stderr: {}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_client() {
        let client = test_support::MockLlmClient::new("test response");
        let result = client.complete("test prompt").unwrap();
        assert_eq!(result, "test response");
        assert_eq!(client.call_count(), 1);
    }

    #[test]
    fn test_failing_mock_counts_calls() {
        let client = test_support::MockLlmClient::failing();
        assert!(client.complete("p").is_err());
        assert!(client.complete("p").is_err());
        assert_eq!(client.call_count(), 2);
    }

    #[test]
    fn test_config_overrides() {
        let config = LlmConfig::new().with_model("sonnet");
        let updated = config.with_overrides(None);
        assert_eq!(updated.model, Some("sonnet".to_string()));

        let updated2 = updated.with_overrides(Some("haiku".to_string()));
        assert_eq!(updated2.model, Some("haiku".to_string()));
    }
}
