use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use redis::{Script, aio::ConnectionManager};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;
use uuid::Uuid;

use super::error::InfraError;
use crate::{
    app_error::{AppError, AppResult},
    application::ports::reconcile_lock::{LockRelease, ReconcileGuard, ReconcileLockPort},
};

// ============================================================================
// In-process lock
// ============================================================================

/// Per-key lock for single-instance deployments.
pub struct InProcessReconcileLock {
    keys: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    wait: Duration,
}

impl InProcessReconcileLock {
    pub fn new(wait: Duration) -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            wait,
        }
    }

    fn entry(&self, key: &str) -> AppResult<Arc<AsyncMutex<()>>> {
        let mut keys = self
            .keys
            .lock()
            .map_err(|_| AppError::Internal("reconcile lock map poisoned".into()))?;
        // Entries only referenced by the map are idle
        keys.retain(|_, m| Arc::strong_count(m) > 1);
        Ok(keys
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone())
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.keys.lock().unwrap().len()
    }
}

struct InProcessGuard {
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl LockRelease for InProcessGuard {
    async fn release(self: Box<Self>) {}
}

#[async_trait]
impl ReconcileLockPort for InProcessReconcileLock {
    async fn acquire(&self, key: &str) -> AppResult<ReconcileGuard> {
        let mutex = self.entry(key)?;
        let guard = tokio::time::timeout(self.wait, mutex.lock_owned())
            .await
            .map_err(|_| {
                tracing::warn!(key, wait_ms = self.wait.as_millis() as u64, "Reconcile lock busy");
                AppError::ReconcileBusy
            })?;
        Ok(ReconcileGuard::new(InProcessGuard { _guard: guard }))
    }
}

// ============================================================================
// Redis lock
// ============================================================================

/// Deletes the key only if it still holds our token.
const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Per-key lock shared by every instance pointed at the same Redis.
#[derive(Clone)]
pub struct RedisReconcileLock {
    manager: ConnectionManager,
    ttl: Duration,
    wait: Duration,
    release_script: Script,
}

impl RedisReconcileLock {
    pub async fn new(redis_url: &str, ttl: Duration, wait: Duration) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url).map_err(InfraError::RedisConnection)?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(InfraError::RedisConnection)?;
        Ok(Self {
            manager,
            ttl,
            wait,
            release_script: Script::new(RELEASE_SCRIPT),
        })
    }

    fn key(gateway_payment_id: &str) -> String {
        format!("reconcile:{gateway_payment_id}")
    }
}

struct RedisGuard {
    manager: ConnectionManager,
    key: String,
    token: String,
    script: Script,
}

#[async_trait]
impl LockRelease for RedisGuard {
    async fn release(self: Box<Self>) {
        let mut conn = self.manager.clone();
        let result: Result<i64, _> = self
            .script
            .key(&self.key)
            .arg(&self.token)
            .invoke_async(&mut conn)
            .await;
        match result {
            Ok(0) => tracing::warn!(key = %self.key, "Reconcile lock expired before release"),
            Ok(_) => {}
            // The entry expires by TTL
            Err(e) => tracing::warn!(key = %self.key, error = %e, "Failed to release reconcile lock"),
        }
    }
}

#[async_trait]
impl ReconcileLockPort for RedisReconcileLock {
    async fn acquire(&self, key: &str) -> AppResult<ReconcileGuard> {
        let mut conn = self.manager.clone();
        let redis_key = Self::key(key);
        let token = Uuid::new_v4().to_string();
        let ttl_ms = self.ttl.as_millis() as u64;
        let deadline = Instant::now() + self.wait;

        loop {
            let acquired: Option<String> = redis::cmd("SET")
                .arg(&redis_key)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(ttl_ms)
                .query_async(&mut conn)
                .await
                .map_err(|e| AppError::Internal(format!("reconcile lock: {e}")))?;

            if acquired.is_some() {
                return Ok(ReconcileGuard::new(RedisGuard {
                    manager: self.manager.clone(),
                    key: redis_key,
                    token,
                    script: self.release_script.clone(),
                }));
            }

            if Instant::now() >= deadline {
                tracing::warn!(key, wait_ms = self.wait.as_millis() as u64, "Reconcile lock busy");
                return Err(AppError::ReconcileBusy);
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
