use crate::domain::model::HostProfile;
use crate::utils::error::{Result, SmokeError};
use crate::utils::validation::{self, Validate};
use std::path::Path;

/// 從 TOML 檔案載入 host profile,用於驗證非本機的目標平台
pub fn load_host_profile<P: AsRef<Path>>(path: P) -> Result<HostProfile> {
    let content = std::fs::read_to_string(&path).map_err(SmokeError::IoError)?;
    let profile: HostProfile =
        toml::from_str(&content).map_err(|e| SmokeError::ConfigValidationError {
            field: "profile".to_string(),
            message: format!("TOML parsing error: {}", e),
        })?;
    profile.validate()?;
    Ok(profile)
}

impl Validate for HostProfile {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("profile.os", &self.os)?;
        validation::validate_non_empty_string("profile.arch", &self.arch)?;
        validation::validate_non_empty_string("profile.toolchain", &self.toolchain)?;
        Ok(())
    }
}
