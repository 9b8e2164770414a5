use httpmock::prelude::*;
use pkg_smoke::utils::error::SmokeError;
use pkg_smoke::{CliConfig, HostProfile, LocalStorage, SmokePipeline, VerifyEngine};
use sha2::{Digest, Sha256};
use tempfile::TempDir;

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn cli_config(recipes: &TempDir, output: &TempDir) -> CliConfig {
    CliConfig {
        recipes: recipes.path().to_str().unwrap().to_string(),
        output_path: output.path().to_str().unwrap().to_string(),
        packages: vec![],
        profile: None,
        concurrent_fetches: 2,
        fetch_sources: true,
        timeout_seconds: 10,
        verbose: false,
        log_json: false,
        monitor: false,
    }
}

#[tokio::test]
async fn test_sources_are_fetched_and_stored() {
    let recipes = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    let server = MockServer::start();
    let payload = b"release tarball".to_vec();
    let checksum = sha256_hex(&payload);

    let source_mock = server.mock(|when, then| {
        when.method(GET).path("/dist/lib-1.0.tar");
        then.status(200).body(payload.clone());
    });

    std::fs::write(
        recipes.path().join("lib.toml"),
        format!(
            r#"
[package]
name = "lib"
version = "1.0"

[source]
url = "{}"
sha256 = "{}"

[smoke]
command = "true"
"#,
            server.url("/dist/lib-1.0.tar"),
            checksum
        ),
    )
    .unwrap();

    let config = cli_config(&recipes, &output);
    let output_path = config.output_path.clone();

    let storage = LocalStorage::new(output_path.clone());
    let pipeline = SmokePipeline::new(storage, config, HostProfile::detect());
    let engine = VerifyEngine::new_with_monitoring(pipeline, false);

    let result = engine.run().await;
    source_mock.assert();
    assert!(result.is_ok());

    // 來源檔落在輸出目錄下
    let stored = std::path::Path::new(&output_path).join("sources/lib-1.0/lib-1.0.tar");
    assert!(stored.exists());
    assert_eq!(std::fs::read(&stored).unwrap(), payload);

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
    assert_eq!(report["outcomes"][0]["source_fetched"], true);
    assert_eq!(report["outcomes"][0]["status"]["kind"], "passed");
}

#[tokio::test]
async fn test_checksum_mismatch_fails_verification() {
    let recipes = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();

    let server = MockServer::start();
    let source_mock = server.mock(|when, then| {
        when.method(GET).path("/dist/lib.tar");
        then.status(200).body(b"tampered bytes".to_vec());
    });

    std::fs::write(
        recipes.path().join("lib.toml"),
        format!(
            r#"
[package]
name = "lib"
version = "1.0"

[source]
url = "{}"
sha256 = "{}"

[smoke]
command = "true"
"#,
            server.url("/dist/lib.tar"),
            "0".repeat(64)
        ),
    )
    .unwrap();

    let config = cli_config(&recipes, &output);
    let output_path = config.output_path.clone();

    let storage = LocalStorage::new(output_path.clone());
    let pipeline = SmokePipeline::new(storage, config, HostProfile::detect());
    let engine = VerifyEngine::new_with_monitoring(pipeline, false);

    let err = engine.run().await.unwrap_err();
    source_mock.assert();
    assert!(matches!(err, SmokeError::VerificationFailedError { .. }));

    // smoke 指令不該被執行,outcome 記錄抓取失敗
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
    assert_eq!(report["outcomes"][0]["status"]["kind"], "error");
    assert_eq!(report["outcomes"][0]["source_fetched"], false);
    assert!(report["outcomes"][0]["status"]["message"]
        .as_str()
        .unwrap()
        .contains("source fetch failed"));
}
