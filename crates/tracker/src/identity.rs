//! Best-effort username resolution against the user registry.
//!
//! Lookups go through a [`TtlCache`] keyed by user id. Misses are cached
//! too, so an unregistered id costs one query per TTL window. Registry
//! failures never surface: the last known value (possibly expired) is
//! returned instead, until the next [`IdentityResolver::run_cleanup`] tick
//! drops it.

use std::time::Duration;

use jobtrace_core::cache::TtlCache;
use jobtrace_core::metadata::is_placeholder;
use jobtrace_core::snapshot::JobSnapshot;
use jobtrace_core::types::TimestampMs;
use jobtrace_db::repositories::UserRepo;
use jobtrace_db::DbPool;
use tokio_util::sync::CancellationToken;

/// How long a resolved username is trusted.
pub const USERNAME_TTL: Duration = Duration::from_secs(5 * 60);

/// Cached view over the `users` table.
#[derive(Clone)]
pub struct IdentityResolver {
    pool: DbPool,
    cache: TtlCache<String, Option<String>>,
}

impl IdentityResolver {
    pub fn new(pool: DbPool) -> Self {
        Self::with_ttl(pool, USERNAME_TTL)
    }

    pub fn with_ttl(pool: DbPool, ttl: Duration) -> Self {
        Self {
            pool,
            cache: TtlCache::new(ttl),
        }
    }

    /// Username registered for `user_id`, if any.
    pub async fn resolve(&self, user_id: &str) -> Option<String> {
        let key = user_id.to_string();
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }

        match UserRepo::find_by_id(&self.pool, user_id).await {
            Ok(user) => {
                let username = user
                    .and_then(|u| u.username)
                    .filter(|name| !is_placeholder(name));
                self.cache.insert(key, username.clone());
                username
            }
            Err(e) => {
                tracing::debug!(user_id, error = %e, "User registry lookup failed");
                self.cache.get_stale(&key).flatten()
            }
        }
    }

    /// Fill in `snapshot.username` from the registry when the job's own
    /// context did not carry one.
    pub async fn enrich(&self, snapshot: &mut JobSnapshot) {
        snapshot.scrub_placeholders();
        if !snapshot.needs_username() {
            return;
        }
        if let Some(user_id) = snapshot.user_id.clone() {
            let username = self.resolve(&user_id).await;
            snapshot.apply_username(username);
        }
    }

    /// Upsert a registry entry and drop its cached value.
    pub async fn record_user(
        &self,
        user_id: &str,
        username: Option<&str>,
        seen_at: TimestampMs,
    ) -> Result<(), sqlx::Error> {
        UserRepo::upsert(&self.pool, user_id, username, seen_at).await?;
        self.cache.invalidate(&user_id.to_string());
        Ok(())
    }

    pub fn invalidate(&self, user_id: &str) {
        self.cache.invalidate(&user_id.to_string());
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Drop every expired entry, hits and misses alike.
    pub fn purge_expired(&self) -> usize {
        self.cache.cleanup_expired()
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Purge expired entries every `interval` until `cancel` fires.
    pub async fn run_cleanup(self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval.max(Duration::from_secs(1)));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Username cache cleanup stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let purged = self.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, remaining = self.cached_len(), "Purged expired usernames");
                    }
                }
            }
        }
    }
}
