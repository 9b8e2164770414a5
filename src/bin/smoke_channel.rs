use anyhow::Result;
use tokio::net::{TcpListener, TcpStream};

// 安裝驗證:server/client bootstrap 能建立並互連即算通過
#[tokio::main]
async fn main() -> Result<()> {
    let server = TcpListener::bind("127.0.0.1:0").await?;
    let client = TcpStream::connect(server.local_addr()?).await?;
    drop(client);
    drop(server);
    Ok(())
}
