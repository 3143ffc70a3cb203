//! Where captured screenshots end up.

use std::path::PathBuf;

use async_trait::async_trait;
use formpilot_core_types::RunId;

use crate::errors::ActionError;

#[async_trait]
pub trait ScreenshotSink: Send + Sync {
    /// Store the image and return a reference to it (path, key, ...).
    async fn store(&self, run: &RunId, name: &str, png: &[u8]) -> Result<String, ActionError>;
}

/// Writes `<dir>/<run>-<name>.png`.
#[derive(Debug, Clone)]
pub struct DirScreenshotSink {
    dir: PathBuf,
}

impl DirScreenshotSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ScreenshotSink for DirScreenshotSink {
    async fn store(&self, run: &RunId, name: &str, png: &[u8]) -> Result<String, ActionError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let path = self.dir.join(format!("{run}-{file_name}.png"));
        tokio::fs::write(&path, png).await?;
        Ok(path.to_string_lossy().into_owned())
    }
}

/// Discards images; the reference is the checkpoint name itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScreenshotSink;

#[async_trait]
impl ScreenshotSink for NullScreenshotSink {
    async fn store(&self, _run: &RunId, name: &str, _png: &[u8]) -> Result<String, ActionError> {
        Ok(format!("memory:{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dir_sink_writes_sanitized_names() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirScreenshotSink::new(dir.path().join("shots"));
        let run = RunId("r1".into());
        let reference = sink.store(&run, "rate/before submit", b"png").await.unwrap();
        assert!(reference.ends_with("r1-rate_before_submit.png"));
        assert_eq!(tokio::fs::read(&reference).await.unwrap(), b"png");
    }
}
