use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostProfile {
    pub os: String,
    pub arch: String,
    pub toolchain: String,
    pub toolchain_version: Option<String>,
}

impl HostProfile {
    /// 以執行中的平台建立 profile
    pub fn detect() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            toolchain: "rustc".to_string(),
            toolchain_version: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceArchive {
    pub url: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SmokeCommand {
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: u32,
    pub retry_delay_seconds: u64,
}

/// 平台裁剪後、帶具體選項值的 recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipePlan {
    pub name: String,
    pub version: String,
    pub description: String,
    pub requires: Vec<Requirement>,
    pub options: BTreeMap<String, String>,
    pub supported_os: Option<Vec<String>>,
    pub toolchain_minimums: BTreeMap<String, String>,
    pub source: Option<SourceArchive>,
    pub smoke: SmokeCommand,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRecipe {
    pub name: String,
    pub version: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyPlan {
    pub runnable: Vec<RecipePlan>,
    pub skipped: Vec<SkippedRecipe>,
    pub external_requirements: Vec<Requirement>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SmokeStatus {
    Passed,
    Failed { code: i32 },
    TimedOut,
    Error { message: String },
}

impl SmokeStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, SmokeStatus::Passed)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SmokeStatus::Passed => "passed",
            SmokeStatus::Failed { .. } => "failed",
            SmokeStatus::TimedOut => "timed_out",
            SmokeStatus::Error { .. } => "error",
        }
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            SmokeStatus::Passed => Some(0),
            SmokeStatus::Failed { code } => Some(*code),
            SmokeStatus::TimedOut | SmokeStatus::Error { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeOutcome {
    pub package: String,
    pub version: String,
    pub status: SmokeStatus,
    pub attempts: u32,
    pub duration_ms: u64,
    pub source_fetched: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub host: HostProfile,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<SmokeOutcome>,
    pub skipped: Vec<SkippedRecipe>,
    pub external_requirements: Vec<Requirement>,
}

impl VerifyReport {
    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_pass()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.passed()
    }
}
