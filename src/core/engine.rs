use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct VerifyEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> VerifyEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        println!("Starting package verification...");

        // Resolve
        println!("Resolving recipes...");
        let plans = self.pipeline.resolve().await?;
        println!("Resolved {} recipes", plans.len());
        self.monitor.log_stats("Resolve");

        // Validate
        println!("Validating against host profile...");
        let verify_plan = self.pipeline.validate(plans).await?;
        println!(
            "{} runnable, {} skipped",
            verify_plan.runnable.len(),
            verify_plan.skipped.len()
        );
        self.monitor.log_stats("Validate");

        // Execute
        println!("Executing smoke tests...");
        let report_path = self.pipeline.execute(verify_plan).await?;
        println!("Report saved to: {}", report_path);
        self.monitor.log_stats("Execute");
        self.monitor.log_final_stats();

        Ok(report_path)
    }
}
