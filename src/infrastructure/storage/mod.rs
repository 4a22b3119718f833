//! Session status and user profile storage
//!
//! Small interfaces with two interchangeable backends: Redis when reachable
//! at startup, otherwise in-process maps. The choice is made once by
//! [`connect_stores`] and never revisited per call.

pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::RedisConfig;
use crate::domain::models::{SessionStatus, UserProfile, UserRecord};
use crate::shared::AppError;
use crate::shared::logging::{log_backend_degraded, log_backend_selected};

pub use self::memory::{InMemorySessionStore, InMemoryUserStore};
pub use self::redis::{RedisSessionStore, RedisUserStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Corrupt value for {key}: {value}")]
    CorruptValue { key: String, value: String },

    #[error("Failed to encode value: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Per-id session status cell shared by the orchestrator and the halt handler.
///
/// Every operation on a single id is atomic with respect to the others.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Backend name for logs and health output
    fn backend_name(&self) -> &'static str;

    /// Current status, `None` when the id was never seen (or expired)
    async fn get(&self, chat_id: &str) -> Result<Option<SessionStatus>, StoreError>;

    /// Unconditional write; creates the session if needed
    async fn set(&self, chat_id: &str, status: SessionStatus) -> Result<(), StoreError>;

    /// Write only if the session already exists; returns the previous status
    async fn set_if_exists(
        &self,
        chat_id: &str,
        status: SessionStatus,
    ) -> Result<Option<SessionStatus>, StoreError>;

    /// Write `to` only if the current status equals `from`
    async fn compare_and_set(
        &self,
        chat_id: &str,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<bool, StoreError>;

    /// Gate evaluated before every emitted fragment
    async fn is_active(&self, chat_id: &str) -> Result<bool, StoreError> {
        Ok(self
            .get(chat_id)
            .await?
            .is_some_and(|status| status.is_active()))
    }
}

/// Outcome of a profile upsert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserUpsert {
    pub user_id: String,
    /// `false` when an existing profile was updated
    pub created: bool,
}

/// Profiles keyed by name. An upsert only touches the fields provided.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn upsert(&self, name: &str, profile: UserProfile) -> Result<UserUpsert, StoreError>;

    async fn find(&self, name: &str) -> Result<Option<UserRecord>, StoreError>;
}

/// Which backend the process ended up with
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreBackend {
    Redis,
    InMemory { reason: Option<String> },
}

impl StoreBackend {
    pub fn is_degraded(&self) -> bool {
        matches!(self, StoreBackend::InMemory { reason: Some(_) })
    }
}

/// Stores selected for the lifetime of the process
#[derive(Clone)]
pub struct Stores {
    pub sessions: Arc<dyn SessionStore>,
    pub users: Arc<dyn UserStore>,
    pub backend: StoreBackend,
}

impl Stores {
    pub fn in_memory(session_ttl: Duration, reason: Option<String>) -> Self {
        Self {
            sessions: Arc::new(InMemorySessionStore::with_ttl(session_ttl)),
            users: Arc::new(InMemoryUserStore::new()),
            backend: StoreBackend::InMemory { reason },
        }
    }
}

/// Select the stores for the lifetime of the process.
///
/// Redis disabled in config gives the in-process stores without a
/// degradation notice; an unreachable Redis gives the same stores plus a
/// single warning. Both stores always share one backend.
pub async fn connect_stores(config: &RedisConfig) -> Stores {
    let session_ttl = Duration::from_secs(config.session_ttl_secs);
    if !config.enabled {
        log_backend_selected("in_memory");
        return Stores::in_memory(session_ttl, None);
    }

    match self::redis::connect_redis(config).await {
        Ok(pool) => {
            log_backend_selected("redis");
            Stores {
                sessions: Arc::new(RedisSessionStore::new(pool.clone(), config.session_ttl_secs)),
                users: Arc::new(RedisUserStore::new(pool)),
                backend: StoreBackend::Redis,
            }
        }
        Err(e) => {
            let degraded = AppError::BackendDegraded(e.to_string());
            log_backend_degraded(&degraded.to_string());
            Stores::in_memory(session_ttl, Some(e.to_string()))
        }
    }
}
