//! Output resources for recordings.
//!
//! An [`OutputStore`] hands out one exclusively-owned [`OutputSink`] per
//! recording. Sinks are object-safe so tests can substitute failing ones.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;

/// Boxed future returned by the output traits.
pub type OutputFuture<'a, T> = Pin<Box<dyn Future<Output = io::Result<T>> + Send + 'a>>;

/// A writable destination for one recording.
pub trait OutputSink: Send {
    /// Append bytes verbatim after everything previously appended.
    fn append<'a>(&'a mut self, chunk: &'a [u8]) -> OutputFuture<'a, ()>;

    /// Flush buffered bytes and sync them to the backing store.
    fn finish(&mut self) -> OutputFuture<'_, ()>;
}

/// Creates fresh output sinks by name.
pub trait OutputStore: Send + Sync {
    /// Create a new output. Fails if `name` already exists.
    fn create<'a>(&'a self, name: &'a str) -> OutputFuture<'a, (PathBuf, Box<dyn OutputSink>)>;
}

/// Stores recordings as files in a single directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if absent.
    pub async fn ensure_dir(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }
}

impl OutputStore for DirectoryStore {
    fn create<'a>(&'a self, name: &'a str) -> OutputFuture<'a, (PathBuf, Box<dyn OutputSink>)> {
        Box::pin(async move {
            // The directory may have been removed since startup.
            self.ensure_dir().await?;
            let path = self.root.join(name);
            let file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await?;
            debug!(path = %path.display(), "output file created");
            let sink: Box<dyn OutputSink> = Box::new(FileSink {
                writer: BufWriter::new(file),
            });
            Ok((path, sink))
        })
    }
}

/// Buffered file sink.
struct FileSink {
    writer: BufWriter<File>,
}

impl OutputSink for FileSink {
    fn append<'a>(&'a mut self, chunk: &'a [u8]) -> OutputFuture<'a, ()> {
        Box::pin(async move { self.writer.write_all(chunk).await })
    }

    fn finish(&mut self) -> OutputFuture<'_, ()> {
        Box::pin(async move {
            self.writer.flush().await?;
            self.writer.get_mut().sync_all().await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_directory_and_writes_in_order() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(tmp.path().join("nested").join("audio"));

        let (path, mut sink) = store.create("a.webm").await.unwrap();
        sink.append(b"ab").await.unwrap();
        sink.append(b"c").await.unwrap();
        sink.finish().await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn refuses_to_reuse_an_existing_name() {
        let tmp = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(tmp.path());
        std::fs::write(tmp.path().join("taken.webm"), b"old").unwrap();

        assert!(store.create("taken.webm").await.is_err());
        assert_eq!(std::fs::read(tmp.path().join("taken.webm")).unwrap(), b"old");
    }
}
