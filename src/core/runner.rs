use crate::domain::model::{RecipePlan, SmokeOutcome, SmokeStatus};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

/// 子行程執行器:跑 recipe 的 smoke 指令並回收退出狀態
pub struct SmokeRunner {
    default_timeout: Duration,
}

impl SmokeRunner {
    pub fn new(default_timeout_seconds: u64) -> Self {
        Self {
            default_timeout: Duration::from_secs(default_timeout_seconds),
        }
    }

    pub async fn run(&self, plan: &RecipePlan, working_dir: &Path) -> SmokeOutcome {
        let timeout = plan
            .smoke
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout);
        let max_attempts = plan.smoke.retry_attempts + 1;

        let started = Instant::now();
        let mut attempts = 0;
        let mut status = SmokeStatus::Error {
            message: "not executed".to_string(),
        };

        while attempts < max_attempts {
            attempts += 1;
            status = self.run_once(plan, working_dir, timeout).await;

            if status.is_pass() || attempts >= max_attempts {
                break;
            }

            tracing::warn!(
                "🔁 {} attempt {}/{} ended with {}, retrying in {}s",
                plan.name,
                attempts,
                max_attempts,
                status.label(),
                plan.smoke.retry_delay_seconds
            );
            tokio::time::sleep(Duration::from_secs(plan.smoke.retry_delay_seconds)).await;
        }

        SmokeOutcome {
            package: plan.name.clone(),
            version: plan.version.clone(),
            status,
            attempts,
            duration_ms: started.elapsed().as_millis() as u64,
            source_fetched: None,
        }
    }

    async fn run_once(&self, plan: &RecipePlan, working_dir: &Path, timeout: Duration) -> SmokeStatus {
        tracing::debug!(
            "Spawning smoke command for {}: {} {:?}",
            plan.name,
            plan.smoke.command,
            plan.smoke.args
        );

        let mut cmd = Command::new(&plan.smoke.command);
        cmd.args(&plan.smoke.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        for (key, value) in &plan.smoke.env {
            cmd.env(key, value);
        }

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return SmokeStatus::Error {
                    message: format!("spawn failed: {}", e),
                }
            }
        };

        // 逾時後丟棄 future,kill_on_drop 會終止子行程
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Err(_) => SmokeStatus::TimedOut,
            Ok(Err(e)) => SmokeStatus::Error {
                message: format!("wait failed: {}", e),
            },
            Ok(Ok(output)) => match output.status.code() {
                Some(0) => SmokeStatus::Passed,
                Some(code) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
                    if !tail.is_empty() {
                        tracing::warn!("{} stderr tail: {:?}", plan.name, tail);
                    }
                    SmokeStatus::Failed { code }
                }
                None => SmokeStatus::Error {
                    message: "terminated by signal".to_string(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SmokeCommand;
    use std::collections::BTreeMap;

    fn plan_with_command(command: &str, args: &[&str]) -> RecipePlan {
        RecipePlan {
            name: "under-test".to_string(),
            version: "1.0".to_string(),
            description: String::new(),
            requires: vec![],
            options: BTreeMap::new(),
            supported_os: None,
            toolchain_minimums: BTreeMap::new(),
            source: None,
            smoke: SmokeCommand {
                command: command.to_string(),
                args: args.iter().map(|s| s.to_string()).collect(),
                env: BTreeMap::new(),
                timeout_seconds: None,
                retry_attempts: 0,
                retry_delay_seconds: 1,
            },
        }
    }

    #[tokio::test]
    async fn test_successful_command_passes() {
        let runner = SmokeRunner::new(10);
        let plan = plan_with_command("true", &[]);

        let outcome = runner.run(&plan, Path::new(".")).await;

        assert_eq!(outcome.status, SmokeStatus::Passed);
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_failing_command_reports_exit_code() {
        let runner = SmokeRunner::new(10);
        let plan = plan_with_command("false", &[]);

        let outcome = runner.run(&plan, Path::new(".")).await;

        assert_eq!(outcome.status, SmokeStatus::Failed { code: 1 });
    }

    #[tokio::test]
    async fn test_timeout_kills_command() {
        let runner = SmokeRunner::new(10);
        let mut plan = plan_with_command("sleep", &["30"]);
        plan.smoke.timeout_seconds = Some(1);

        let outcome = runner.run(&plan, Path::new(".")).await;

        assert_eq!(outcome.status, SmokeStatus::TimedOut);
        assert!(outcome.duration_ms < 10_000);
    }

    #[tokio::test]
    async fn test_missing_command_is_error() {
        let runner = SmokeRunner::new(10);
        let plan = plan_with_command("pkg-smoke-no-such-binary", &[]);

        let outcome = runner.run(&plan, Path::new(".")).await;

        assert!(matches!(outcome.status, SmokeStatus::Error { .. }));
    }

    #[tokio::test]
    async fn test_retries_count_attempts() {
        let runner = SmokeRunner::new(10);
        let mut plan = plan_with_command("false", &[]);
        plan.smoke.retry_attempts = 2;
        plan.smoke.retry_delay_seconds = 0;

        let outcome = runner.run(&plan, Path::new(".")).await;

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.status, SmokeStatus::Failed { code: 1 });
    }

    #[tokio::test]
    async fn test_recipe_env_is_applied() {
        let runner = SmokeRunner::new(10);
        let mut plan = plan_with_command("sh", &["-c", "test \"$SMOKE_MARKER\" = expected"]);
        plan.smoke
            .env
            .insert("SMOKE_MARKER".to_string(), "expected".to_string());

        let outcome = runner.run(&plan, Path::new(".")).await;

        assert_eq!(outcome.status, SmokeStatus::Passed);
    }
}
