use crate::domain::model::{HostProfile, RecipePlan, Requirement, SmokeCommand, SourceArchive};
use crate::utils::error::{Result, SmokeError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeConfig {
    pub package: PackageSection,
    pub platform: Option<PlatformSection>,
    pub toolchain: Option<ToolchainSection>,
    pub options: Option<BTreeMap<String, OptionSpec>>,
    #[serde(default)]
    pub requires: Vec<RequireSection>,
    pub source: Option<SourceSection>,
    pub smoke: SmokeSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformSection {
    pub supported_os: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainSection {
    pub minimum: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionSpec {
    pub values: Vec<String>,
    pub default: String,
    pub only_os: Option<Vec<String>>,
    pub only_arch: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequireSection {
    pub name: String,
    pub version: String,
    /// "option=value" 格式,僅在選項解析為該值時才需要
    pub when_option: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    pub url: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmokeSection {
    pub command: String,
    pub args: Option<Vec<String>>,
    pub env: Option<BTreeMap<String, String>>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
}

impl RecipeConfig {
    /// 從 TOML 檔案載入 recipe
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SmokeError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析 recipe
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| SmokeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SOURCE_MIRROR})
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    /// 結構性驗證,與主機無關
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("package.name", &self.package.name)?;
        validation::validate_non_empty_string("package.version", &self.package.version)?;
        validation::validate_non_empty_string("smoke.command", &self.smoke.command)?;

        if let Some(source) = &self.source {
            validation::validate_url("source.url", &source.url)?;
            validation::validate_sha256("source.sha256", &source.sha256)?;
        }

        if let Some(timeout) = self.smoke.timeout_seconds {
            validation::validate_range("smoke.timeout_seconds", timeout, 1, 3600)?;
        }

        if let Some(options) = &self.options {
            for (name, spec) in options {
                if spec.values.is_empty() {
                    return Err(SmokeError::InvalidConfigValueError {
                        field: format!("options.{}", name),
                        value: String::new(),
                        reason: "Option must declare at least one value".to_string(),
                    });
                }
                if !spec.values.contains(&spec.default) {
                    return Err(SmokeError::InvalidConfigValueError {
                        field: format!("options.{}", name),
                        value: spec.default.clone(),
                        reason: format!(
                            "Default is not among declared values: {}",
                            spec.values.join(", ")
                        ),
                    });
                }
            }
        }

        for require in &self.requires {
            validation::validate_non_empty_string("requires.name", &require.name)?;
            validation::validate_non_empty_string("requires.version", &require.version)?;
            if let Some(gate) = &require.when_option {
                if !gate.contains('=') {
                    return Err(SmokeError::InvalidConfigValueError {
                        field: "requires.when_option".to_string(),
                        value: gate.clone(),
                        reason: "Expected 'option=value' format".to_string(),
                    });
                }
            }
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }

    pub fn version(&self) -> &str {
        &self.package.version
    }

    /// 依主機裁剪選項與需求,產出具體計畫
    pub fn plan(&self, host: &HostProfile) -> Result<RecipePlan> {
        let mut options = BTreeMap::new();
        if let Some(specs) = &self.options {
            for (name, spec) in specs {
                // 不符合平台限制的選項直接移除
                if let Some(only_os) = &spec.only_os {
                    if !only_os.iter().any(|os| os == &host.os) {
                        continue;
                    }
                }
                if let Some(only_arch) = &spec.only_arch {
                    if !only_arch.iter().any(|arch| arch == &host.arch) {
                        continue;
                    }
                }
                options.insert(name.clone(), spec.default.clone());
            }
        }

        let mut requires = Vec::new();
        for require in &self.requires {
            if let Some(gate) = &require.when_option {
                let (opt_name, expected) =
                    gate.split_once('=')
                        .ok_or_else(|| SmokeError::InvalidConfigValueError {
                            field: "requires.when_option".to_string(),
                            value: gate.clone(),
                            reason: "Expected 'option=value' format".to_string(),
                        })?;
                // 選項被平台移除或值不符時,該需求不成立
                match options.get(opt_name) {
                    Some(value) if value == expected => {}
                    _ => continue,
                }
            }
            requires.push(Requirement {
                name: require.name.clone(),
                version: require.version.clone(),
            });
        }

        Ok(RecipePlan {
            name: self.package.name.clone(),
            version: self.package.version.clone(),
            description: self.package.description.clone().unwrap_or_default(),
            requires,
            options,
            supported_os: self.platform.as_ref().and_then(|p| p.supported_os.clone()),
            toolchain_minimums: self
                .toolchain
                .as_ref()
                .and_then(|t| t.minimum.clone())
                .unwrap_or_default(),
            source: self.source.as_ref().map(|s| SourceArchive {
                url: s.url.clone(),
                sha256: s.sha256.clone(),
            }),
            smoke: SmokeCommand {
                command: self.smoke.command.clone(),
                args: self.smoke.args.clone().unwrap_or_default(),
                env: self.smoke.env.clone().unwrap_or_default(),
                timeout_seconds: self.smoke.timeout_seconds,
                retry_attempts: self.smoke.retry_attempts.unwrap_or(0),
                retry_delay_seconds: self.smoke.retry_delay_seconds.unwrap_or(1),
            },
        })
    }
}

impl Validate for RecipeConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
