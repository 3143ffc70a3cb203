//! Persistence collaborator for the formpilot runner.
//!
//! The store owns one [`UserRecord`] per user. All writes are idempotent
//! field-level updates so a retried write never corrupts a row.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use formpilot_core_types::UserId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

mod proxy;
mod record;

pub use proxy::ProxyPool;
pub use record::{
    Address, Credentials, EducationEntry, EmploymentEntry, LanguageEntry, Milestone, ProfileData,
    UserRecord,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user '{0}' not found")]
    NotFound(String),

    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store data is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<UserRecord>, StoreError>;

    async fn update_session_state(&self, user_id: &UserId, blob: &str) -> Result<(), StoreError>;

    /// Flag the user as blocked by a captcha and pin a new proxy port.
    async fn update_captcha_flag_and_proxy_port(
        &self,
        user_id: &UserId,
        flagged_at: DateTime<Utc>,
        proxy_port: Option<u16>,
    ) -> Result<(), StoreError>;

    async fn update_milestone(
        &self,
        user_id: &UserId,
        milestone: Milestone,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Write requests observed by [`InMemoryUserStore`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreWrite {
    Session(UserId),
    CaptchaFlag {
        user_id: UserId,
        proxy_port: Option<u16>,
    },
    Milestone(UserId, Milestone),
}

/// Process-local store keyed by user id.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: DashMap<String, UserRecord>,
    writes: Mutex<Vec<StoreWrite>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(records: impl IntoIterator<Item = UserRecord>) -> Arc<Self> {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        Arc::new(store)
    }

    pub fn insert(&self, record: UserRecord) {
        self.users.insert(record.user_id.0.clone(), record);
    }

    /// Every write issued so far, in order.
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.writes.lock().clone()
    }

    fn modify(
        &self,
        user_id: &UserId,
        write: StoreWrite,
        apply: impl FnOnce(&mut UserRecord),
    ) -> Result<(), StoreError> {
        let mut entry = self
            .users
            .get_mut(user_id.as_str())
            .ok_or_else(|| StoreError::NotFound(user_id.0.clone()))?;
        apply(entry.value_mut());
        self.writes.lock().push(write);
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .users
            .get(user_id.as_str())
            .map(|entry| entry.value().clone()))
    }

    async fn update_session_state(&self, user_id: &UserId, blob: &str) -> Result<(), StoreError> {
        self.modify(user_id, StoreWrite::Session(user_id.clone()), |record| {
            record.session_blob = Some(blob.to_string())
        })
    }

    async fn update_captcha_flag_and_proxy_port(
        &self,
        user_id: &UserId,
        flagged_at: DateTime<Utc>,
        proxy_port: Option<u16>,
    ) -> Result<(), StoreError> {
        let write = StoreWrite::CaptchaFlag {
            user_id: user_id.clone(),
            proxy_port,
        };
        self.modify(user_id, write, |record| {
            record.captcha_flagged_at = Some(flagged_at);
            if proxy_port.is_some() {
                record.proxy_port = proxy_port;
            }
        })
    }

    async fn update_milestone(
        &self,
        user_id: &UserId,
        milestone: Milestone,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.modify(
            user_id,
            StoreWrite::Milestone(user_id.clone(), milestone),
            |record| {
                record.milestones.insert(milestone, at);
            },
        )
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UserFile {
    #[serde(default)]
    users: Vec<UserRecord>,
}

/// JSON document store: `{"users": [...]}` rewritten whole on every update.
pub struct JsonFileUserStore {
    path: PathBuf,
    guard: tokio::sync::Mutex<()>,
}

impl JsonFileUserStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<UserFile, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(UserFile::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(UserFile::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, file: &UserFile) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(file)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn modify(
        &self,
        user_id: &UserId,
        apply: impl FnOnce(&mut UserRecord),
    ) -> Result<(), StoreError> {
        let _held = self.guard.lock().await;
        let mut file = self.load().await?;
        let record = file
            .users
            .iter_mut()
            .find(|record| &record.user_id == user_id)
            .ok_or_else(|| StoreError::NotFound(user_id.0.clone()))?;
        apply(record);
        self.save(&file).await?;
        debug!(target: "state-center", user = %user_id, path = %self.path.display(), "user row updated");
        Ok(())
    }

    /// Insert or replace a row.
    pub async fn upsert(&self, record: UserRecord) -> Result<(), StoreError> {
        let _held = self.guard.lock().await;
        let mut file = self.load().await?;
        match file
            .users
            .iter_mut()
            .find(|existing| existing.user_id == record.user_id)
        {
            Some(existing) => *existing = record,
            None => file.users.push(record),
        }
        self.save(&file).await
    }
}

#[async_trait]
impl UserStore for JsonFileUserStore {
    async fn get_user(&self, user_id: &UserId) -> Result<Option<UserRecord>, StoreError> {
        let _held = self.guard.lock().await;
        let file = self.load().await?;
        Ok(file
            .users
            .into_iter()
            .find(|record| &record.user_id == user_id))
    }

    async fn update_session_state(&self, user_id: &UserId, blob: &str) -> Result<(), StoreError> {
        self.modify(user_id, |record| record.session_blob = Some(blob.to_string()))
            .await
    }

    async fn update_captcha_flag_and_proxy_port(
        &self,
        user_id: &UserId,
        flagged_at: DateTime<Utc>,
        proxy_port: Option<u16>,
    ) -> Result<(), StoreError> {
        self.modify(user_id, |record| {
            record.captcha_flagged_at = Some(flagged_at);
            if proxy_port.is_some() {
                record.proxy_port = proxy_port;
            }
        })
        .await
    }

    async fn update_milestone(
        &self,
        user_id: &UserId,
        milestone: Milestone,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.modify(user_id, |record| {
            record.milestones.insert(milestone, at);
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> UserRecord {
        UserRecord::new(
            UserId::new(id),
            Credentials {
                email: format!("{id}@mail.test"),
                password: "secret-pass".into(),
            },
        )
    }

    #[tokio::test]
    async fn in_memory_store_applies_field_updates() {
        let store = InMemoryUserStore::with_users([record("u1")]);
        let id = UserId::new("u1");
        store.update_session_state(&id, "blob-1").await.unwrap();
        store
            .update_captcha_flag_and_proxy_port(&id, Utc::now(), Some(9002))
            .await
            .unwrap();
        store
            .update_milestone(&id, Milestone::RateStepCompleted, Utc::now())
            .await
            .unwrap();

        let row = store.get_user(&id).await.unwrap().unwrap();
        assert_eq!(row.session_blob.as_deref(), Some("blob-1"));
        assert_eq!(row.proxy_port, Some(9002));
        assert!(row.captcha_flagged_at.is_some());
        assert!(row.reached(Milestone::RateStepCompleted).is_some());
        assert_eq!(store.writes().len(), 3);
    }

    #[tokio::test]
    async fn in_memory_store_reports_missing_users() {
        let store = InMemoryUserStore::new();
        let id = UserId::new("ghost");
        assert!(store.get_user(&id).await.unwrap().is_none());
        let err = store.update_session_state(&id, "x").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.writes().is_empty());
    }
}
