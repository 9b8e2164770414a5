pub mod engine;
pub mod fetch;
pub mod pipeline;
pub mod resolve;
pub mod runner;

pub use crate::domain::model::{
    HostProfile, RecipePlan, SmokeOutcome, SmokeStatus, VerifyPlan, VerifyReport,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
