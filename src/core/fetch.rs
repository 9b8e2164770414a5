use crate::core::Storage;
use crate::domain::model::{RecipePlan, SourceArchive};
use crate::utils::error::{Result, SmokeError};
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn archive_filename(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.last().map(|s| s.to_string()))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "source.bin".to_string())
}

/// 下載 recipe 的來源封存檔並以 SHA-256 校驗後落地
pub struct SourceFetcher {
    client: Client,
    concurrency: usize,
}

impl SourceFetcher {
    pub fn new(client: Client, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// 並行下載所有帶 [source] 的 recipe,回傳 (套件名, 結果)
    pub async fn fetch_all<S: Storage>(
        &self,
        storage: &S,
        plans: &[RecipePlan],
    ) -> Vec<(String, Result<()>)> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = tokio::task::JoinSet::new();

        for (idx, plan) in plans.iter().enumerate() {
            let Some(source) = plan.source.clone() else {
                continue;
            };
            let client = self.client.clone();
            let semaphore = Arc::clone(&semaphore);
            let package = plan.name.clone();
            let target_dir = format!("sources/{}-{}", plan.name, plan.version);
            let attempts = plan.smoke.retry_attempts + 1;
            let delay = Duration::from_secs(plan.smoke.retry_delay_seconds);

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let bytes = download_with_retry(&client, &source.url, attempts, delay).await;
                (idx, package, target_dir, source, bytes)
            });
        }

        let mut downloads = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(item) => downloads.push(item),
                Err(e) => tracing::error!("Source download task panicked: {}", e),
            }
        }
        // 回報順序與輸入一致
        downloads.sort_by_key(|(idx, ..)| *idx);

        let mut results = Vec::new();
        for (_, package, target_dir, source, bytes) in downloads {
            let stored = match bytes {
                Err(e) => Err(e),
                Ok(bytes) => {
                    self.verify_and_store(storage, &package, &target_dir, &source, bytes)
                        .await
                }
            };
            results.push((package, stored));
        }
        results
    }

    async fn verify_and_store<S: Storage>(
        &self,
        storage: &S,
        package: &str,
        target_dir: &str,
        source: &SourceArchive,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let actual = sha256_hex(&bytes);
        let expected = source.sha256.to_lowercase();
        if actual != expected {
            return Err(SmokeError::ChecksumMismatchError {
                package: package.to_string(),
                expected,
                actual,
            });
        }

        let filename = archive_filename(&source.url);
        storage
            .write_file(&format!("{}/{}", target_dir, filename), &bytes)
            .await?;

        if filename.ends_with(".zip") {
            self.unpack_zip(storage, target_dir, &bytes).await?;
        }

        tracing::debug!("Stored source for {} under {}", package, target_dir);
        Ok(())
    }

    async fn unpack_zip<S: Storage>(
        &self,
        storage: &S,
        target_dir: &str,
        bytes: &[u8],
    ) -> Result<()> {
        let cursor = std::io::Cursor::new(bytes);
        let mut archive = zip::ZipArchive::new(cursor)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            // enclosed_name 擋掉逃逸出目錄的路徑
            let Some(path) = entry.enclosed_name() else {
                tracing::warn!("Skipping zip entry with unsafe path: {}", entry.name());
                continue;
            };
            let mut data = Vec::with_capacity(entry.size() as usize);
            std::io::Read::read_to_end(&mut entry, &mut data)?;
            storage
                .write_file(&format!("{}/{}", target_dir, path.display()), &data)
                .await?;
        }

        Ok(())
    }
}

async fn download_with_retry(
    client: &Client,
    url: &str,
    attempts: u32,
    delay: Duration,
) -> Result<Vec<u8>> {
    let mut last_error = None;

    for attempt in 1..=attempts {
        match download_once(client, url).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) => {
                if attempt < attempts {
                    tracing::warn!(
                        "🔁 Download attempt {}/{} for {} failed: {}, retrying in {:?}",
                        attempt,
                        attempts,
                        url,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.expect("at least one attempt is always made"))
}

async fn download_once(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    Ok(bytes.to_vec())
}
