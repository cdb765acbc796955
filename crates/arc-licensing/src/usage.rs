use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::Mutex;
use tracing::trace;

use crate::error::UsageError;

/// Counters outlive their month by this much so the final count stays
/// readable for billing reconciliation.
pub const USAGE_KEY_TTL: Duration = Duration::from_secs(40 * 24 * 60 * 60);

/// Monthly, tenant-scoped usage counters.
#[async_trait]
pub trait UsageTracker: Send + Sync {
    /// Increment this month's API request counter and return the new value.
    async fn increment_api_request(&self, tenant_id: &str) -> Result<i64, UsageError>;

    /// This month's API request count, or 0 if nothing was recorded yet.
    async fn get_api_request_count(&self, tenant_id: &str) -> Result<i64, UsageError>;
}

pub fn api_usage_key(tenant_id: &str, at: DateTime<Utc>) -> String {
    format!("usage:api:{}:{}", tenant_id, at.format("%Y-%m"))
}

#[derive(Clone)]
pub struct RedisUsageTracker {
    redis: ConnectionManager,
}

impl RedisUsageTracker {
    pub async fn connect(redis_url: &str) -> Result<Self, UsageError> {
        let client = Client::open(redis_url)?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis })
    }

    pub fn from_connection(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl UsageTracker for RedisUsageTracker {
    async fn increment_api_request(&self, tenant_id: &str) -> Result<i64, UsageError> {
        let mut conn = self.redis.clone();
        let key = api_usage_key(tenant_id, Utc::now());

        let (count, ttl): (i64, i64) = redis::pipe()
            .cmd("INCR")
            .arg(&key)
            .cmd("TTL")
            .arg(&key)
            .query_async(&mut conn)
            .await?;
        // TTL is -1 only while the key has no window yet: the first write of
        // the month, or an earlier EXPIRE that never landed.
        if ttl == -1 {
            let _: () = conn
                .expire(&key, USAGE_KEY_TTL.as_secs() as i64)
                .await?;
            trace!(target: "arc-licensing::usage", %key, count, "started monthly usage window");
        }
        Ok(count)
    }

    async fn get_api_request_count(&self, tenant_id: &str) -> Result<i64, UsageError> {
        let mut conn = self.redis.clone();
        let key = api_usage_key(tenant_id, Utc::now());
        let count: Option<i64> = conn.get(&key).await?;
        Ok(count.unwrap_or(0))
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// In-memory adapter for tests. Uses the same key scheme as the Redis
/// tracker but never expires entries.
pub struct InMemoryUsageTracker {
    counters: Mutex<HashMap<String, i64>>,
    clock: Clock,
}

impl Default for InMemoryUsageTracker {
    fn default() -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            clock: Arc::new(Utc::now),
        }
    }
}

impl InMemoryUsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            clock: Arc::new(clock),
        }
    }
}

#[async_trait]
impl UsageTracker for InMemoryUsageTracker {
    async fn increment_api_request(&self, tenant_id: &str) -> Result<i64, UsageError> {
        let key = api_usage_key(tenant_id, (self.clock)());
        let mut guard = self.counters.lock().await;
        let count = guard.entry(key).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn get_api_request_count(&self, tenant_id: &str) -> Result<i64, UsageError> {
        let key = api_usage_key(tenant_id, (self.clock)());
        Ok(self.counters.lock().await.get(&key).copied().unwrap_or(0))
    }
}
