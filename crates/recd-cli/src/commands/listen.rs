//! `recd listen` — print server events until the connection closes.

use anyhow::{Context, Result};
use tracing::debug;

use recd_client::RecorderClient;
use recd_core::Incoming;

pub async fn run(url: &str) -> Result<()> {
    let mut client = RecorderClient::connect(url)
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    debug!(connection = %client.connection_id(), "listening");

    loop {
        tokio::select! {
            incoming = client.next_incoming() => {
                let line = match incoming? {
                    Some(Incoming::Event(event)) => serde_json::to_string(&event)?,
                    Some(Incoming::Notification(n)) => serde_json::to_string(&n)?,
                    None => break,
                };
                println!("{line}");
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.close().await?;
    Ok(())
}
