use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::LsqError;

/// Per-platform payloads keyed by platform id.
pub type ScrapeResults = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scrape request and its current execution state.
///
/// Records are never mutated in place once stored: every transition method
/// returns a new record which the owner writes back through the job store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapeJob {
    pub id: Uuid,
    pub keywords: String,
    pub platforms: Vec<String>,
    pub owner: String,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub result: ScrapeResults,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewScrapeJob {
    pub keywords: String,
    pub platforms: Vec<String>,
    pub owner: String,
}

impl ScrapeJob {
    /// Build a pending job from a validated submission.
    pub fn new(request: NewScrapeJob) -> Result<Self, LsqError> {
        validate_new_job(&request)?;

        Ok(Self {
            id: Uuid::now_v7(),
            keywords: request.keywords.trim().to_string(),
            platforms: normalize_platforms(&request.platforms),
            owner: request.owner.trim().to_string(),
            status: JobStatus::Pending,
            progress: 0,
            result: ScrapeResults::new(),
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// `pending -> running`.
    pub fn start(&self, at: DateTime<Utc>) -> Result<Self, LsqError> {
        if self.status != JobStatus::Pending {
            return Err(self.transition_error(JobStatus::Running));
        }
        Ok(Self {
            status: JobStatus::Running,
            started_at: Some(at),
            ..self.clone()
        })
    }

    /// `running -> completed`. An empty result set is not a completion.
    pub fn complete(&self, result: ScrapeResults, at: DateTime<Utc>) -> Result<Self, LsqError> {
        if self.status != JobStatus::Running {
            return Err(self.transition_error(JobStatus::Completed));
        }
        if result.is_empty() {
            return Err(LsqError::Validation(
                "completed job must carry at least one platform result".to_string(),
            ));
        }
        Ok(Self {
            status: JobStatus::Completed,
            progress: 100,
            result,
            error: None,
            completed_at: Some(self.finish_time(at)),
            ..self.clone()
        })
    }

    /// `running -> failed`.
    pub fn fail(&self, error: impl Into<String>, at: DateTime<Utc>) -> Result<Self, LsqError> {
        if self.status != JobStatus::Running {
            return Err(self.transition_error(JobStatus::Failed));
        }
        let mut error = error.into();
        if error.trim().is_empty() {
            error = "scrape failed without a message".to_string();
        }
        Ok(Self {
            status: JobStatus::Failed,
            result: ScrapeResults::new(),
            error: Some(error),
            completed_at: Some(self.finish_time(at)),
            ..self.clone()
        })
    }

    // Clocks can step backwards between two reads; completed_at never precedes started_at.
    fn finish_time(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        match self.started_at {
            Some(started) if started > at => started,
            _ => at,
        }
    }

    fn transition_error(&self, to: JobStatus) -> LsqError {
        LsqError::InvalidTransition(format!("job {}: {} -> {}", self.id, self.status, to))
    }
}

/// Validate a submission before a job is created for it.
pub fn validate_new_job(request: &NewScrapeJob) -> Result<(), LsqError> {
    if request.keywords.trim().is_empty() {
        return Err(LsqError::Validation("Keywords cannot be empty".to_string()));
    }

    if request.owner.trim().is_empty() {
        return Err(LsqError::Validation("Owner cannot be empty".to_string()));
    }

    if request.platforms.is_empty() {
        return Err(LsqError::Validation(
            "At least one platform is required".to_string(),
        ));
    }

    if request.platforms.iter().any(|p| p.trim().is_empty()) {
        return Err(LsqError::Validation(
            "Platform ids cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Trim platform ids and drop repeats, keeping the first occurrence.
pub fn normalize_platforms(platforms: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(platforms.len());
    for platform in platforms {
        let platform = platform.trim();
        if !platform.is_empty() && !seen.iter().any(|p: &String| p == platform) {
            seen.push(platform.to_string());
        }
    }
    seen
}
