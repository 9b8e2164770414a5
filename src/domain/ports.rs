use crate::domain::model::{RecipePlan, VerifyPlan};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn recipes_root(&self) -> &str;
    fn output_path(&self) -> &str;
    fn packages(&self) -> &[String];
    fn concurrent_fetches(&self) -> usize;
    fn fetch_sources(&self) -> bool;
    fn default_timeout_seconds(&self) -> u64;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn resolve(&self) -> Result<Vec<RecipePlan>>;
    async fn validate(&self, plans: Vec<RecipePlan>) -> Result<VerifyPlan>;
    async fn execute(&self, plan: VerifyPlan) -> Result<String>;
}
