pub mod cli;
pub mod profile;
pub mod recipe;

#[cfg(feature = "cli")]
use crate::core::ConfigProvider;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "pkg-smoke")]
#[command(about = "Install-verification smoke test runner for packaged libraries")]
pub struct CliConfig {
    #[arg(long, default_value = "./recipes")]
    pub recipes: String,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_delimiter = ',', help = "Only verify the named packages")]
    pub packages: Vec<String>,

    #[arg(long, help = "Host profile TOML, defaults to the running platform")]
    pub profile: Option<String>,

    #[arg(long, default_value = "4")]
    pub concurrent_fetches: usize,

    #[arg(long, help = "Download and checksum recipe sources before running")]
    pub fetch_sources: bool,

    #[arg(long, default_value = "60")]
    pub timeout_seconds: u64,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON logs for CI collection")]
    pub log_json: bool,

    #[arg(long, help = "Enable system monitoring")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl ConfigProvider for CliConfig {
    fn recipes_root(&self) -> &str {
        &self.recipes
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn packages(&self) -> &[String] {
        &self.packages
    }

    fn concurrent_fetches(&self) -> usize {
        self.concurrent_fetches
    }

    fn fetch_sources(&self) -> bool {
        self.fetch_sources
    }

    fn default_timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }
}

#[cfg(feature = "cli")]
impl crate::utils::validation::Validate for CliConfig {
    fn validate(&self) -> crate::utils::error::Result<()> {
        use crate::utils::validation;

        validation::validate_path("recipes", &self.recipes)?;
        validation::validate_path("output_path", &self.output_path)?;
        validation::validate_positive_number("concurrent_fetches", self.concurrent_fetches, 1)?;
        validation::validate_range("timeout_seconds", self.timeout_seconds, 1, 3600)?;
        Ok(())
    }
}
