//! In-process stores
//!
//! Volatile, scoped to this process. Per-id atomicity comes from the
//! DashMap shard lock held for the duration of each entry operation.
//! Session entries expire like their Redis counterparts: `session_ttl`
//! after the last write or gate check.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::{SessionStore, StoreError, UserStore, UserUpsert};
use crate::domain::models::{SessionStatus, UserProfile, UserRecord};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Copy)]
struct Slot {
    status: SessionStatus,
    expires_at: Instant,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, Slot>,
    ttl: Duration,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Entries held, including expired ones not swept yet
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn slot(&self, status: SessionStatus, now: Instant) -> Slot {
        Slot {
            status,
            expires_at: now + self.ttl,
        }
    }

    fn sweep(&self, now: Instant) {
        self.sessions.retain(|_, slot| slot.is_live(now));
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn backend_name(&self) -> &'static str {
        "in_memory"
    }

    async fn get(&self, chat_id: &str) -> Result<Option<SessionStatus>, StoreError> {
        let now = Instant::now();
        Ok(self
            .sessions
            .get(chat_id)
            .filter(|entry| entry.value().is_live(now))
            .map(|entry| entry.value().status))
    }

    async fn set(&self, chat_id: &str, status: SessionStatus) -> Result<(), StoreError> {
        let now = Instant::now();
        self.sweep(now);
        self.sessions
            .insert(chat_id.to_string(), self.slot(status, now));
        Ok(())
    }

    async fn set_if_exists(
        &self,
        chat_id: &str,
        status: SessionStatus,
    ) -> Result<Option<SessionStatus>, StoreError> {
        let now = Instant::now();
        match self.sessions.entry(chat_id.to_string()) {
            Entry::Occupied(mut entry) if entry.get().is_live(now) => {
                let previous = entry.get().status;
                entry.insert(self.slot(status, now));
                Ok(Some(previous))
            }
            Entry::Occupied(entry) => {
                entry.remove();
                Ok(None)
            }
            Entry::Vacant(_) => Ok(None),
        }
    }

    async fn compare_and_set(
        &self,
        chat_id: &str,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        match self.sessions.entry(chat_id.to_string()) {
            Entry::Occupied(mut entry)
                if entry.get().is_live(now) && entry.get().status == from =>
            {
                entry.insert(self.slot(to, now));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Gate check; a live session gets its expiry pushed back
    async fn is_active(&self, chat_id: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        match self.sessions.get_mut(chat_id) {
            Some(mut entry) if entry.is_live(now) => {
                entry.expires_at = now + self.ttl;
                Ok(entry.status.is_active())
            }
            _ => Ok(false),
        }
    }
}

/// Profiles keyed by name, never evicted
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: DashMap<String, UserRecord>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn upsert(&self, name: &str, profile: UserProfile) -> Result<UserUpsert, StoreError> {
        match self.users.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                record.profile.merge(profile);
                Ok(UserUpsert {
                    user_id: record.user_id.clone(),
                    created: false,
                })
            }
            Entry::Vacant(entry) => {
                let user_id = Uuid::new_v4().to_string();
                entry.insert(UserRecord {
                    user_id: user_id.clone(),
                    profile,
                });
                Ok(UserUpsert {
                    user_id,
                    created: true,
                })
            }
        }
    }

    async fn find(&self, name: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.users.get(name).map(|entry| entry.value().clone()))
    }
}
