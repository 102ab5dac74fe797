//! `recd stream <file>` — send a local file as one recording.

use anyhow::{Context, Result};
use tracing::info;

use recd_client::RecorderClient;

/// Stream `path` in `chunk_size` frames and print where the server saved it.
pub async fn run(url: &str, path: &str, chunk_size: usize) -> Result<()> {
    if chunk_size == 0 {
        anyhow::bail!("--chunk-size must be greater than zero");
    }

    // Open the source before connecting so a bad path never starts a recording.
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {path}"))?;

    let mut client = RecorderClient::connect(url)
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    info!(connection = %client.connection_id(), file = %path, "streaming");

    let saved = client
        .record_from(&mut file, chunk_size)
        .await
        .context("recording failed")?;
    client.close().await?;

    println!(
        "{}: {} bytes in {} chunks ({} ms)",
        saved.file, saved.bytes, saved.chunks, saved.duration_ms
    );
    Ok(())
}
