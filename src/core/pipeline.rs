use crate::core::fetch::SourceFetcher;
use crate::core::resolve::order_recipes;
use crate::core::runner::SmokeRunner;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::config::recipe::RecipeConfig;
use crate::domain::model::{
    HostProfile, RecipePlan, SkippedRecipe, SmokeOutcome, SmokeStatus, VerifyPlan, VerifyReport,
};
use crate::utils::error::{Result, SmokeError};
use crate::utils::validation::{version_at_least, Validate};
use chrono::Utc;
use reqwest::Client;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::PathBuf;
use zip::write::{SimpleFileOptions, ZipWriter};

pub struct SmokePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    host: HostProfile,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> SmokePipeline<S, C> {
    pub fn new(storage: S, config: C, host: HostProfile) -> Self {
        Self {
            storage,
            config,
            host,
            client: Client::new(),
        }
    }

    fn recipe_files(&self) -> Result<Vec<PathBuf>> {
        let root = self.config.recipes_root();
        let entries = std::fs::read_dir(root).map_err(|e| SmokeError::ConfigValidationError {
            field: "recipes".to_string(),
            message: format!("Cannot read recipe directory '{}': {}", root, e),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("toml"))
            .collect();
        // 穩定的載入順序
        files.sort();
        Ok(files)
    }

    async fn write_report(&self, report: &VerifyReport) -> Result<String> {
        let mut csv_writer = csv::Writer::from_writer(Vec::new());
        csv_writer.write_record([
            "package",
            "version",
            "status",
            "exit_code",
            "attempts",
            "duration_ms",
        ])?;
        for outcome in &report.outcomes {
            let exit_code = outcome
                .status
                .exit_code()
                .map(|c| c.to_string())
                .unwrap_or_default();
            let attempts = outcome.attempts.to_string();
            let duration = outcome.duration_ms.to_string();
            csv_writer.write_record([
                outcome.package.as_str(),
                outcome.version.as_str(),
                outcome.status.label(),
                exit_code.as_str(),
                attempts.as_str(),
                duration.as_str(),
            ])?;
        }
        let csv_output = csv_writer
            .into_inner()
            .map_err(|e| SmokeError::ProcessingError {
                message: format!("CSV buffer error: {}", e),
            })?;

        let failures: Vec<&SmokeOutcome> = report
            .outcomes
            .iter()
            .filter(|o| !o.status.is_pass())
            .collect();

        // 報告打包成單一 zip
        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            zip.start_file("report.csv", SimpleFileOptions::default())?;
            zip.write_all(&csv_output)?;

            zip.start_file("report.json", SimpleFileOptions::default())?;
            let json_data = serde_json::to_string_pretty(report)?;
            zip.write_all(json_data.as_bytes())?;

            if !failures.is_empty() {
                zip.start_file("failures.json", SimpleFileOptions::default())?;
                let json_data = serde_json::to_string_pretty(&failures)?;
                zip.write_all(json_data.as_bytes())?;
            }

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        tracing::debug!("Writing report bundle ({} bytes) to storage", zip_data.len());
        self.storage.write_file("smoke_report.zip", &zip_data).await?;

        Ok(format!("{}/smoke_report.zip", self.config.output_path()))
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for SmokePipeline<S, C> {
    /// 載入 recipe 檔,套用平台裁剪,依需求圖排序
    async fn resolve(&self) -> Result<Vec<RecipePlan>> {
        let files = self.recipe_files()?;
        let filter: BTreeSet<&str> = self.config.packages().iter().map(|s| s.as_str()).collect();

        let mut plans = Vec::new();
        for path in &files {
            let recipe = RecipeConfig::from_file(path)?;
            recipe.validate()?;

            if !filter.is_empty() && !filter.contains(recipe.name()) {
                tracing::debug!("Skipping {} (not in --packages filter)", recipe.name());
                continue;
            }

            plans.push(recipe.plan(&self.host)?);
        }

        if plans.is_empty() {
            return Err(SmokeError::ConfigValidationError {
                field: "recipes".to_string(),
                message: format!(
                    "No matching recipe files under '{}'",
                    self.config.recipes_root()
                ),
            });
        }

        let resolved = order_recipes(plans)?;
        for external in &resolved.external {
            tracing::info!(
                "External requirement {}/{} is not in the recipe set",
                external.name,
                external.version
            );
        }

        Ok(resolved.ordered)
    }

    /// 主機驗證:平台支援、工具鏈下限、連帶跳過
    async fn validate(&self, plans: Vec<RecipePlan>) -> Result<VerifyPlan> {
        let local_names: BTreeSet<String> = plans.iter().map(|p| p.name.clone()).collect();
        let mut external: BTreeMap<String, String> = BTreeMap::new();
        let mut skipped_names: BTreeSet<String> = BTreeSet::new();

        let mut runnable = Vec::new();
        let mut skipped = Vec::new();

        for plan in plans {
            for require in &plan.requires {
                if !local_names.contains(&require.name) {
                    external.insert(require.name.clone(), require.version.clone());
                }
            }

            let mut skip_reason = None;

            if let Some(supported) = &plan.supported_os {
                if !supported.iter().any(|os| os == &self.host.os) {
                    skip_reason = Some(format!("not tested on {} yet", self.host.os));
                }
            }

            if skip_reason.is_none() {
                if let Some(minimum) = plan.toolchain_minimums.get(&self.host.toolchain) {
                    match &self.host.toolchain_version {
                        Some(version) if !version_at_least(version, minimum) => {
                            skip_reason = Some(format!(
                                "requires {} >= {}, host has {}",
                                self.host.toolchain, minimum, version
                            ));
                        }
                        Some(_) => {}
                        None => {
                            tracing::warn!(
                                "Host {} version unknown, assuming it satisfies {} >= {}",
                                self.host.toolchain,
                                self.host.toolchain,
                                minimum
                            );
                        }
                    }
                } else if !plan.toolchain_minimums.is_empty() {
                    tracing::warn!(
                        "{} recipe lacks information about the {} toolchain support",
                        plan.name,
                        self.host.toolchain
                    );
                }
            }

            // 依賴被跳過的套件也跳過;plans 已是拓撲序,單趟掃描即可
            if skip_reason.is_none() {
                if let Some(require) = plan
                    .requires
                    .iter()
                    .find(|r| skipped_names.contains(&r.name))
                {
                    skip_reason = Some(format!("requires skipped package {}", require.name));
                }
            }

            match skip_reason {
                Some(reason) => {
                    tracing::info!("⏭️  Skipping {}: {}", plan.name, reason);
                    skipped_names.insert(plan.name.clone());
                    skipped.push(SkippedRecipe {
                        name: plan.name,
                        version: plan.version,
                        reason,
                    });
                }
                None => runnable.push(plan),
            }
        }

        Ok(VerifyPlan {
            runnable,
            skipped,
            external_requirements: external
                .into_iter()
                .map(|(name, version)| crate::domain::model::Requirement { name, version })
                .collect(),
        })
    }

    /// 可選的來源抓取,接著依序執行 smoke 指令並寫出報告
    async fn execute(&self, plan: VerifyPlan) -> Result<String> {
        let started_at = Utc::now();

        let mut fetch_errors: BTreeMap<String, String> = BTreeMap::new();
        let mut fetched: BTreeSet<String> = BTreeSet::new();
        if self.config.fetch_sources() {
            let fetcher =
                SourceFetcher::new(self.client.clone(), self.config.concurrent_fetches());
            for (package, result) in fetcher.fetch_all(&self.storage, &plan.runnable).await {
                match result {
                    Ok(()) => {
                        fetched.insert(package);
                    }
                    Err(e) => {
                        tracing::error!("Source fetch for {} failed: {}", package, e);
                        fetch_errors.insert(package, e.to_string());
                    }
                }
            }
        }

        let runner = SmokeRunner::new(self.config.default_timeout_seconds());
        let working_dir = PathBuf::from(self.config.recipes_root());

        let mut outcomes = Vec::with_capacity(plan.runnable.len());
        for recipe in &plan.runnable {
            let mut outcome = if let Some(message) = fetch_errors.get(&recipe.name) {
                SmokeOutcome {
                    package: recipe.name.clone(),
                    version: recipe.version.clone(),
                    status: SmokeStatus::Error {
                        message: format!("source fetch failed: {}", message),
                    },
                    attempts: 0,
                    duration_ms: 0,
                    source_fetched: Some(false),
                }
            } else {
                runner.run(recipe, &working_dir).await
            };

            if recipe.source.is_some() && self.config.fetch_sources() {
                outcome.source_fetched = Some(fetched.contains(&recipe.name));
            }

            tracing::info!(
                "{} {}/{} ({} ms, {} attempt(s))",
                if outcome.status.is_pass() { "✅" } else { "❌" },
                outcome.package,
                outcome.status.label(),
                outcome.duration_ms,
                outcome.attempts
            );
            outcomes.push(outcome);
        }

        let report = VerifyReport {
            host: self.host.clone(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
            skipped: plan.skipped,
            external_requirements: plan.external_requirements,
        };

        let report_path = self.write_report(&report).await?;

        let failed = report.failed();
        if failed > 0 {
            return Err(SmokeError::VerificationFailedError {
                failed,
                total: report.outcomes.len(),
                report: report_path,
            });
        }

        Ok(report_path)
    }
}
