use anyhow::Result;

// 安裝驗證:TLS 用戶端 context 能建構即算通過
#[tokio::main]
async fn main() -> Result<()> {
    let context = reqwest::Client::builder().use_rustls_tls().build()?;
    drop(context);
    Ok(())
}
