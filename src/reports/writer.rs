use crate::error::{Result, ValidationError};
use crate::types::{slugify, AgentResult, AggregateReport};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Persists per-agent and aggregate reports as JSON documents.
///
/// Every write goes to a sibling `.tmp` file first and is then renamed into place, so a
/// reader of the output directory never sees a half-written report.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    aggregate_file: String,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, aggregate_file: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            aggregate_file: aggregate_file.into(),
        }
    }

    /// Path of one agent's report, keyed by its id and task
    pub fn agent_report_path(&self, agent_id: u32, task: &str) -> PathBuf {
        self.output_dir.join(format!("agent_{}_{}.json", agent_id, slugify(task)))
    }

    pub fn aggregate_report_path(&self) -> PathBuf {
        self.output_dir.join(&self.aggregate_file)
    }

    /// Write one agent's turn sequence
    pub async fn write_agent_report(&self, result: &AgentResult) -> Result<PathBuf> {
        let path = self.agent_report_path(result.agent_id, &result.task);
        self.write_json(&path, result).await?;
        debug!("Agent {} report written to {:?}", result.agent_id, path);
        Ok(path)
    }

    /// Write the aggregate report, replacing any report from a previous run
    pub async fn write_aggregate_report(&self, report: &AggregateReport) -> Result<PathBuf> {
        let path = self.aggregate_report_path();
        self.write_json(&path, report).await?;
        info!("Aggregate report written to {:?}", path);
        Ok(path)
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(value).map_err(|e| {
            ValidationError::Persistence(format!("failed to serialize report: {}", e))
        })?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| persistence_error(&self.output_dir, e))?;

        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| persistence_error(&temp_path, e))?;

        if let Err(e) = tokio::fs::rename(&temp_path, path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(persistence_error(path, e));
        }

        Ok(())
    }
}

fn persistence_error(path: &Path, err: std::io::Error) -> ValidationError {
    ValidationError::Persistence(format!("{}: {}", path.display(), err))
}
