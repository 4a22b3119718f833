use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{Pool, PooledConnection};
use redis::{AsyncCommands, Script};
use uuid::Uuid;

use super::{SessionStore, StoreError, UserStore, UserUpsert};
use crate::config::RedisConfig;
use crate::domain::models::{SessionStatus, UserProfile, UserRecord};

pub type RedisPool = Pool<RedisConnectionManager>;

/// Initialize Redis connection pool
pub async fn init_redis_pool(config: &RedisConfig) -> Result<RedisPool, StoreError> {
    let manager = RedisConnectionManager::new(config.url())?;
    let pool = Pool::builder()
        .connection_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build(manager)
        .await?;
    Ok(pool)
}

/// Build the pool and prove the server answers before handing it out
pub async fn connect_redis(config: &RedisConfig) -> Result<RedisPool, StoreError> {
    let pool = init_redis_pool(config).await?;
    {
        let mut conn = pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        let _pong: String = redis::cmd("PING").query_async(&mut *conn).await?;
    }
    tracing::info!(url = %config.redacted_url(), "Connected to Redis");
    Ok(pool)
}

async fn pooled(pool: &RedisPool) -> Result<PooledConnection<'_, RedisConnectionManager>, StoreError> {
    pool.get().await.map_err(|e| StoreError::Pool(e.to_string()))
}

/// Cache keys
mod keys {
    pub fn status_key(chat_id: &str) -> String {
        format!("chat:{}:status", chat_id)
    }

    pub fn user_key(name: &str) -> String {
        format!("user:{}", name)
    }
}

// KEYS[1] = status key, ARGV[1] = ttl
const GATE_LUA: &str = r#"
local status = redis.call('GET', KEYS[1])
if status then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return status
"#;

// KEYS[1] = status key, ARGV[1] = new code, ARGV[2] = ttl
const SET_IF_EXISTS_LUA: &str = r#"
local previous = redis.call('GET', KEYS[1])
if previous then
    redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[2])
end
return previous
"#;

// KEYS[1] = status key, ARGV[1] = expected code, ARGV[2] = new code, ARGV[3] = ttl
const COMPARE_AND_SET_LUA: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('SET', KEYS[1], ARGV[2], 'EX', ARGV[3])
    return 1
end
return 0
"#;

// KEYS[1] = profile key, ARGV[1] = candidate id, ARGV[2..] = field/value pairs
const UPSERT_USER_LUA: &str = r#"
local created = redis.call('HSETNX', KEYS[1], '_id', ARGV[1])
if #ARGV > 1 then
    redis.call('HSET', KEYS[1], unpack(ARGV, 2))
end
return {redis.call('HGET', KEYS[1], '_id'), created}
"#;

/// Session store backed by a shared Redis instance.
///
/// Every key carries the session TTL; writes and gate checks renew it, so
/// only idle sessions expire.
pub struct RedisSessionStore {
    pool: RedisPool,
    ttl_secs: u64,
    gate_script: Script,
    set_if_exists_script: Script,
    compare_and_set_script: Script,
}

impl RedisSessionStore {
    pub fn new(pool: RedisPool, ttl_secs: u64) -> Self {
        Self {
            pool,
            ttl_secs,
            gate_script: Script::new(GATE_LUA),
            set_if_exists_script: Script::new(SET_IF_EXISTS_LUA),
            compare_and_set_script: Script::new(COMPARE_AND_SET_LUA),
        }
    }

    async fn connection(&self) -> Result<PooledConnection<'_, RedisConnectionManager>, StoreError> {
        pooled(&self.pool).await
    }
}

fn parse_status(key: &str, raw: String) -> Result<SessionStatus, StoreError> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(SessionStatus::from_code)
        .ok_or(StoreError::CorruptValue {
            key: key.to_string(),
            value: raw,
        })
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, chat_id: &str) -> Result<Option<SessionStatus>, StoreError> {
        let mut conn = self.connection().await?;
        let key = keys::status_key(chat_id);

        let raw: Option<String> = conn.get(&key).await?;
        raw.map(|value| parse_status(&key, value)).transpose()
    }

    async fn set(&self, chat_id: &str, status: SessionStatus) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let key = keys::status_key(chat_id);

        let _: () = conn.set_ex(&key, status.code(), self.ttl_secs).await?;
        Ok(())
    }

    async fn set_if_exists(
        &self,
        chat_id: &str,
        status: SessionStatus,
    ) -> Result<Option<SessionStatus>, StoreError> {
        let mut conn = self.connection().await?;
        let key = keys::status_key(chat_id);

        let previous: Option<String> = self
            .set_if_exists_script
            .key(&key)
            .arg(status.code())
            .arg(self.ttl_secs)
            .invoke_async(&mut *conn)
            .await?;
        previous.map(|value| parse_status(&key, value)).transpose()
    }

    async fn compare_and_set(
        &self,
        chat_id: &str,
        from: SessionStatus,
        to: SessionStatus,
    ) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let key = keys::status_key(chat_id);

        let swapped: i64 = self
            .compare_and_set_script
            .key(&key)
            .arg(from.code())
            .arg(to.code())
            .arg(self.ttl_secs)
            .invoke_async(&mut *conn)
            .await?;
        Ok(swapped == 1)
    }

    async fn is_active(&self, chat_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection().await?;
        let key = keys::status_key(chat_id);

        let raw: Option<String> = self
            .gate_script
            .key(&key)
            .arg(self.ttl_secs)
            .invoke_async(&mut *conn)
            .await?;
        Ok(raw
            .map(|value| parse_status(&key, value))
            .transpose()?
            .is_some_and(|status| status.is_active()))
    }
}

/// User profiles as Redis hashes, one `user:{name}` key per profile.
///
/// Field values are JSON-encoded; `_id` holds the id minted on first write.
pub struct RedisUserStore {
    pool: RedisPool,
    upsert_script: Script,
}

impl RedisUserStore {
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            upsert_script: Script::new(UPSERT_USER_LUA),
        }
    }
}

#[async_trait]
impl UserStore for RedisUserStore {
    async fn upsert(&self, name: &str, profile: UserProfile) -> Result<UserUpsert, StoreError> {
        let key = keys::user_key(name);
        let fields = profile.to_fields()?;
        let mut conn = pooled(&self.pool).await?;

        let mut invocation = self.upsert_script.prepare_invoke();
        invocation.key(&key).arg(Uuid::new_v4().to_string());
        for (field, value) in &fields {
            invocation.arg(field).arg(value);
        }
        let (user_id, created): (String, i64) = invocation.invoke_async(&mut *conn).await?;

        Ok(UserUpsert {
            user_id,
            created: created == 1,
        })
    }

    async fn find(&self, name: &str) -> Result<Option<UserRecord>, StoreError> {
        let key = keys::user_key(name);
        let mut conn = pooled(&self.pool).await?;

        let mut fields: HashMap<String, String> = conn.hgetall(&key).await?;
        let Some(user_id) = fields.remove("_id") else {
            return Ok(None);
        };
        let profile = UserProfile::from_fields(&fields).map_err(|e| StoreError::CorruptValue {
            key,
            value: e.to_string(),
        })?;
        Ok(Some(UserRecord { user_id, profile }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(keys::status_key("chat-X"), "chat:chat-X:status");
        assert_eq!(keys::user_key("ann"), "user:ann");
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(
            parse_status("k", "-1".to_string()).unwrap(),
            SessionStatus::Terminated
        );
        assert_eq!(
            parse_status("k", " 1 ".to_string()).unwrap(),
            SessionStatus::Active
        );
        assert!(matches!(
            parse_status("k", "ACTIVE".to_string()),
            Err(StoreError::CorruptValue { .. })
        ));
    }

    // The tests below need a Redis server on localhost:6379

    #[tokio::test]
    #[ignore]
    async fn test_gate_renews_ttl_on_live_server() {
        let pool = connect_redis(&RedisConfig::default()).await.unwrap();
        let store = RedisSessionStore::new(pool, 2);
        let chat_id = format!("ttl-{}", Uuid::new_v4());

        store.set(&chat_id, SessionStatus::Active).await.unwrap();
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert!(store.is_active(&chat_id).await.unwrap());
        }

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(store.get(&chat_id).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore]
    async fn test_user_upsert_on_live_server() {
        let pool = connect_redis(&RedisConfig::default()).await.unwrap();
        let users = RedisUserStore::new(pool);
        let name = format!("user-{}", Uuid::new_v4());

        let first = users
            .upsert(
                &name,
                UserProfile {
                    name: Some(name.clone()),
                    city: Some("Paris".into()),
                    care_topics: Some(vec!["sleep".into()]),
                    ..UserProfile::default()
                },
            )
            .await
            .unwrap();
        assert!(first.created);

        let second = users
            .upsert(
                &name,
                UserProfile {
                    name: Some(name.clone()),
                    city: Some("Lyon".into()),
                    ..UserProfile::default()
                },
            )
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.user_id, first.user_id);

        let record = users.find(&name).await.unwrap().unwrap();
        assert_eq!(record.user_id, first.user_id);
        assert_eq!(record.profile.city.as_deref(), Some("Lyon"));
        assert_eq!(record.profile.care_topics, Some(vec!["sleep".to_string()]));
    }
}
