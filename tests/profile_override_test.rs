use pkg_smoke::config::profile::load_host_profile;
use pkg_smoke::{CliConfig, LocalStorage, SmokePipeline, VerifyEngine};
use tempfile::TempDir;

fn cli_config(recipes: &TempDir, output: &TempDir) -> CliConfig {
    CliConfig {
        recipes: recipes.path().to_str().unwrap().to_string(),
        output_path: output.path().to_str().unwrap().to_string(),
        packages: vec![],
        profile: None,
        concurrent_fetches: 2,
        fetch_sources: false,
        timeout_seconds: 10,
        verbose: false,
        log_json: false,
        monitor: false,
    }
}

#[tokio::test]
async fn test_foreign_profile_skips_everything_but_succeeds() {
    let recipes = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    std::fs::write(
        recipes.path().join("linux-only.toml"),
        r#"
[package]
name = "linux-only"
version = "1.0"

[platform]
supported_os = ["linux"]

[smoke]
command = "true"
"#,
    )
    .unwrap();

    let profile_file = output.path().join("windows.toml");
    std::fs::write(
        &profile_file,
        r#"
os = "windows"
arch = "x86_64"
toolchain = "msvc"
toolchain_version = "19.30"
"#,
    )
    .unwrap();
    let host = load_host_profile(&profile_file).unwrap();

    let config = cli_config(&recipes, &output);
    let output_path = config.output_path.clone();

    let storage = LocalStorage::new(output_path.clone());
    let pipeline = SmokePipeline::new(storage, config, host);
    let engine = VerifyEngine::new_with_monitoring(pipeline, false);

    // 沒有可跑的 recipe 不算失敗,報告記錄跳過原因
    let result = engine.run().await;
    assert!(result.is_ok());

    let full_path = std::path::Path::new(&output_path).join("smoke_report.zip");
    let zip_data = std::fs::read(&full_path).unwrap();
    let cursor = std::io::Cursor::new(zip_data);
    let mut archive = zip::ZipArchive::new(cursor).unwrap();

    let mut json_content = String::new();
    std::io::Read::read_to_string(
        &mut archive.by_name("report.json").unwrap(),
        &mut json_content,
    )
    .unwrap();

    let report: serde_json::Value = serde_json::from_str(&json_content).unwrap();
    assert_eq!(report["host"]["os"], "windows");
    assert!(report["outcomes"].as_array().unwrap().is_empty());
    assert_eq!(report["skipped"][0]["name"], "linux-only");
    assert_eq!(report["skipped"][0]["reason"], "not tested on windows yet");
}

#[tokio::test]
async fn test_old_toolchain_profile_skips_recipe() {
    let recipes = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    std::fs::write(
        recipes.path().join("modern.toml"),
        r#"
[package]
name = "modern"
version = "1.0"

[toolchain.minimum]
gcc = "7"

[smoke]
command = "true"
"#,
    )
    .unwrap();

    let profile_file = output.path().join("old-gcc.toml");
    std::fs::write(
        &profile_file,
        r#"
os = "linux"
arch = "x86_64"
toolchain = "gcc"
toolchain_version = "5.4"
"#,
    )
    .unwrap();
    let host = load_host_profile(&profile_file).unwrap();

    let config = cli_config(&recipes, &output);
    let output_path = config.output_path.clone();

    let storage = LocalStorage::new(output_path.clone());
    let pipeline = SmokePipeline::new(storage, config, host);
    let engine = VerifyEngine::new_with_monitoring(pipeline, false);

    assert!(engine.run().await.is_ok());

    let full_path = std::path::Path::new(&output_path).join("smoke_report.zip");
    let zip_data = std::fs::read(&full_path).unwrap();
    let cursor = std::io::Cursor::new(zip_data);
    let mut archive = zip::ZipArchive::new(cursor).unwrap();

    let mut json_content = String::new();
    std::io::Read::read_to_string(
        &mut archive.by_name("report.json").unwrap(),
        &mut json_content,
    )
    .unwrap();

    let report: serde_json::Value = serde_json::from_str(&json_content).unwrap();
    assert_eq!(report["skipped"][0]["name"], "modern");
    assert!(report["skipped"][0]["reason"]
        .as_str()
        .unwrap()
        .contains("gcc >= 7"));
}
