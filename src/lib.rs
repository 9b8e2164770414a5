pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::{cli::LocalStorage, CliConfig};

pub use crate::core::{engine::VerifyEngine, pipeline::SmokePipeline};
pub use crate::domain::model::HostProfile;
pub use crate::utils::error::{Result, SmokeError};
