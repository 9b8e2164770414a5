use clap::Parser;
use pkg_smoke::config::profile;
use pkg_smoke::utils::{logger, validation::Validate};
use pkg_smoke::{CliConfig, HostProfile, LocalStorage, SmokePipeline, VerifyEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting pkg-smoke CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    // 主機 profile:指定檔案優先,否則偵測本機
    let host = match &config.profile {
        Some(path) => match profile::load_host_profile(path) {
            Ok(host) => host,
            Err(e) => {
                tracing::error!("❌ Failed to load host profile: {}", e);
                eprintln!("❌ {}", e.user_friendly_message());
                std::process::exit(1);
            }
        },
        None => HostProfile::detect(),
    };
    tracing::info!(
        "Host profile: {}/{} ({})",
        host.os,
        host.arch,
        host.toolchain
    );

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 建立存儲與管線
    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = SmokePipeline::new(storage, config, host);

    // 建立引擎並執行驗證
    let engine = VerifyEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(report_path) => {
            tracing::info!("✅ All smoke tests passed!");
            tracing::info!("📁 Report saved to: {}", report_path);
            println!("✅ All smoke tests passed!");
            println!("📁 Report saved to: {}", report_path);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Verification failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                pkg_smoke::utils::error::ErrorSeverity::Low => 0, // 警告,但成功
                pkg_smoke::utils::error::ErrorSeverity::Medium => 2, // 重試錯誤
                pkg_smoke::utils::error::ErrorSeverity::High => 1, // 驗證失敗
                pkg_smoke::utils::error::ErrorSeverity::Critical => 3, // 系統錯誤
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
