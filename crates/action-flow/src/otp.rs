//! OTP collaborators: providers that wait for the code texted to a user.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use formpilot_core_types::UserId;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::OtpError;

#[async_trait]
pub trait OtpProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Wait up to `timeout_secs` for a code. `Ok(None)` when none arrived.
    async fn wait_for_otp(
        &self,
        user_id: &UserId,
        country_code: &str,
        timeout_secs: u64,
    ) -> Result<Option<String>, OtpError>;
}

/// Primary provider first, then each fallback. Provider errors are logged
/// and count as "no code".
#[derive(Clone, Default)]
pub struct OtpChain {
    providers: Vec<Arc<dyn OtpProvider>>,
}

impl OtpChain {
    pub fn new(primary: Arc<dyn OtpProvider>) -> Self {
        Self {
            providers: vec![primary],
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn OtpProvider>) -> Self {
        self.providers.push(fallback);
        self
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl OtpProvider for OtpChain {
    fn name(&self) -> &str {
        "chain"
    }

    async fn wait_for_otp(
        &self,
        user_id: &UserId,
        country_code: &str,
        timeout_secs: u64,
    ) -> Result<Option<String>, OtpError> {
        for provider in &self.providers {
            match provider.wait_for_otp(user_id, country_code, timeout_secs).await {
                Ok(Some(code)) => {
                    info!(provider = provider.name(), user = %user_id, code_len = code.len(), "otp received");
                    return Ok(Some(code));
                }
                Ok(None) => debug!(provider = provider.name(), user = %user_id, "no otp"),
                Err(err) => warn!(provider = provider.name(), user = %user_id, %err, "otp provider failed"),
            }
        }
        Ok(None)
    }
}

/// Polls `<dir>/<user_id>.otp`, consuming the file once it holds a code.
/// Lets an operator or a side process hand codes to the runner.
#[derive(Debug, Clone)]
pub struct FileDropOtpProvider {
    dir: PathBuf,
    poll: Duration,
}

impl FileDropOtpProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            poll: Duration::from_secs(2),
        }
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    fn drop_file(&self, user_id: &UserId) -> PathBuf {
        self.dir.join(format!("{}.otp", user_id.as_str()))
    }

    async fn take_code(&self, user_id: &UserId) -> Result<Option<String>, OtpError> {
        let path = self.drop_file(user_id);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let code: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if code.is_empty() {
            return Ok(None);
        }
        tokio::fs::remove_file(&path).await?;
        Ok(Some(code))
    }
}

#[async_trait]
impl OtpProvider for FileDropOtpProvider {
    fn name(&self) -> &str {
        "file-drop"
    }

    async fn wait_for_otp(
        &self,
        user_id: &UserId,
        _country_code: &str,
        timeout_secs: u64,
    ) -> Result<Option<String>, OtpError> {
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);
        loop {
            if let Some(code) = self.take_code(user_id).await? {
                return Ok(Some(code));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

/// Never produces a code.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOtpProvider;

#[async_trait]
impl OtpProvider for NoOtpProvider {
    fn name(&self) -> &str {
        "none"
    }

    async fn wait_for_otp(
        &self,
        _user_id: &UserId,
        _country_code: &str,
        _timeout_secs: u64,
    ) -> Result<Option<String>, OtpError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl OtpProvider for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn wait_for_otp(
            &self,
            _user_id: &UserId,
            _country_code: &str,
            _timeout_secs: u64,
        ) -> Result<Option<String>, OtpError> {
            Err(OtpError::Provider {
                provider: "failing".into(),
                reason: "quota exceeded".into(),
            })
        }
    }

    #[tokio::test]
    async fn file_drop_consumes_the_code() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("u1.otp"), "Your code: 123-456\n").unwrap();
        let provider = FileDropOtpProvider::new(dir.path());

        let code = provider.wait_for_otp(&UserId::new("u1"), "1", 0).await.unwrap();
        assert_eq!(code.as_deref(), Some("123456"));
        assert!(!dir.path().join("u1.otp").exists());
        assert!(provider.wait_for_otp(&UserId::new("u1"), "1", 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn chain_falls_through_errors_to_the_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("u2.otp"), "987654").unwrap();
        let chain = OtpChain::new(Arc::new(Failing))
            .with_fallback(Arc::new(NoOtpProvider))
            .with_fallback(Arc::new(FileDropOtpProvider::new(dir.path())));
        assert_eq!(chain.len(), 3);

        let code = chain.wait_for_otp(&UserId::new("u2"), "44", 0).await.unwrap();
        assert_eq!(code.as_deref(), Some("987654"));
    }

    #[tokio::test]
    async fn chain_without_codes_reports_none() {
        let chain = OtpChain::new(Arc::new(Failing)).with_fallback(Arc::new(NoOtpProvider));
        let code = chain.wait_for_otp(&UserId::new("u3"), "1", 0).await.unwrap();
        assert!(code.is_none());
    }
}
