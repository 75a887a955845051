/// Configuration management for the multi-agent validator
use crate::error::{Result, ValidationError};
use crate::types::AgentDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ENDPOINT_PATH: &str = "/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
const DEFAULT_API_KEY_ENV: &str = "REVIEW_API_KEY";
const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
const DEFAULT_RUN_DEADLINE_SECONDS: u64 = 900;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub review_service: ReviewServiceSettings,
    pub run: RunSettings,
    pub agents: Vec<AgentDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewServiceSettings {
    pub base_url: String,
    pub endpoint_path: String,
    pub model: String,
    pub api_key_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSettings {
    pub output_dir: PathBuf,
    pub aggregate_file: String,
    #[serde(default)]
    pub run_deadline_seconds: Option<u64>,
    pub target_description: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            review_service: ReviewServiceSettings {
                base_url: DEFAULT_BASE_URL.to_string(),
                endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
                model: DEFAULT_MODEL.to_string(),
                api_key_env: DEFAULT_API_KEY_ENV.to_string(),
                api_key: None,
                request_timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            },
            run: RunSettings {
                output_dir: PathBuf::from("validation-reports"),
                aggregate_file: "aggregate_report.json".to_string(),
                run_deadline_seconds: Some(DEFAULT_RUN_DEADLINE_SECONDS),
                target_description: "a fleet management web application (React frontend) \
                    and the REST API behind it, covering vehicles, drivers, trips and maintenance"
                    .to_string(),
            },
            agents: default_agents(),
        }
    }
}

/// Hand-authored agent registry used when no configuration file supplies one
pub fn default_agents() -> Vec<AgentDescriptor> {
    vec![
        AgentDescriptor::new(
            1,
            "API Contract Validation",
            "REST endpoint consistency, status codes, request validation and error payloads",
        ),
        AgentDescriptor::new(
            2,
            "Security Review",
            "authentication, authorization boundaries, input sanitization and secret handling",
        ),
        AgentDescriptor::new(
            3,
            "Data Integrity",
            "schema constraints, referential integrity, transactions and concurrent updates",
        ),
        AgentDescriptor::new(
            4,
            "Frontend UX Review",
            "component state handling, loading and error states, accessibility and form validation",
        ),
        AgentDescriptor::new(
            5,
            "Deployment Readiness",
            "environment configuration, build and deploy scripts, logging, monitoring and rollback",
        ),
    ]
}

impl Config {
    /// Load configuration from file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path.as_ref()).await.map_err(|e| {
            ValidationError::Config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Override settings from environment variables if present
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup("VALIDATOR_BASE_URL") {
            self.review_service.base_url = base_url;
        }

        if let Some(model) = lookup("VALIDATOR_MODEL") {
            self.review_service.model = model;
        }

        if let Some(timeout) = lookup("VALIDATOR_TIMEOUT_SECONDS") {
            self.review_service.request_timeout_seconds =
                parse_number("VALIDATOR_TIMEOUT_SECONDS", &timeout)?;
        }

        if let Some(output_dir) = lookup("VALIDATOR_OUTPUT_DIR") {
            self.run.output_dir = PathBuf::from(output_dir);
        }

        if let Some(deadline) = lookup("VALIDATOR_RUN_DEADLINE_SECONDS") {
            let seconds = parse_number("VALIDATOR_RUN_DEADLINE_SECONDS", &deadline)?;
            self.run.run_deadline_seconds = (seconds > 0).then_some(seconds);
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.agents.is_empty() {
            return Err(ValidationError::Config(
                "at least one agent must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if !seen.insert(agent.id) {
                return Err(ValidationError::Config(format!(
                    "duplicate agent id {}",
                    agent.id
                )));
            }
            if agent.task.trim().is_empty() {
                return Err(ValidationError::Config(format!(
                    "agent {} has an empty task name",
                    agent.id
                )));
            }
        }

        if self.review_service.request_timeout_seconds == 0 {
            return Err(ValidationError::Config(
                "request timeout must be greater than 0".to_string(),
            ));
        }

        if self.review_service.base_url.trim().is_empty() {
            return Err(ValidationError::Config(
                "review service base URL is required".to_string(),
            ));
        }

        if self.review_service.model.trim().is_empty() {
            return Err(ValidationError::Config(
                "review service model is required".to_string(),
            ));
        }

        if self.run.aggregate_file.trim().is_empty() {
            return Err(ValidationError::Config(
                "aggregate report file name is required".to_string(),
            ));
        }

        Ok(())
    }
}

impl ReviewServiceSettings {
    /// Full URL of the completion endpoint
    pub fn endpoint_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.endpoint_path.trim_start_matches('/')
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Resolve the bearer credential: inline key first, then the configured env var
    pub fn resolve_api_key(&self) -> Result<String> {
        self.resolve_api_key_with(|key| std::env::var(key).ok())
    }

    fn resolve_api_key_with<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.api_key
            .clone()
            .or_else(|| lookup(&self.api_key_env))
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ValidationError::Config(format!(
                    "review service credential not found; set {}",
                    self.api_key_env
                ))
            })
    }
}

impl RunSettings {
    pub fn run_deadline(&self) -> Option<Duration> {
        self.run_deadline_seconds.map(Duration::from_secs)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| ValidationError::Config(format!("{} must be a number, got '{}'", key, value)))
}
