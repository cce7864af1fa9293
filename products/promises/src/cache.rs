//! Read cache for promise logs, invalidated by tag after every mutation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use entity::promise_logs;
use moka::future::Cache;
use tracing::debug;
use uuid::Uuid;

const LOGS_TAG_PREFIX: &str = "promise-logs:";

#[derive(Clone)]
pub struct CacheBus {
    logs: Cache<String, Arc<Vec<promise_logs::Model>>>,
    /// Bumped on every revalidation so reads started before it never refill
    /// the cache with rows that predate the write.
    generations: Arc<Mutex<HashMap<String, u64>>>,
}

impl CacheBus {
    pub fn new(ttl: Duration) -> Self {
        let logs = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(ttl)
            .build();
        Self {
            logs,
            generations: Arc::default(),
        }
    }

    pub fn logs_tag(promise_id: Uuid) -> String {
        format!("{LOGS_TAG_PREFIX}{promise_id}")
    }

    pub fn pipeline_path(studio_slug: &str) -> String {
        format!("/{studio_slug}/studio/commercial/promises")
    }

    pub fn promise_path(studio_slug: &str, promise_id: Uuid) -> String {
        format!("/{studio_slug}/studio/commercial/promises/{promise_id}")
    }

    pub async fn cached_logs(&self, promise_id: Uuid) -> Option<Arc<Vec<promise_logs::Model>>> {
        self.logs.get(Self::logs_tag(promise_id).as_str()).await
    }

    /// Current revalidation generation of a promise's logs. Capture it before
    /// reading from the database and hand it back to [`CacheBus::store_logs`].
    pub fn logs_generation(&self, promise_id: Uuid) -> u64 {
        self.generation(&Self::logs_tag(promise_id))
    }

    /// Caches `logs` unless the tag was revalidated after `generation` was
    /// taken. Returns whether the rows were kept.
    pub async fn store_logs(
        &self,
        promise_id: Uuid,
        generation: u64,
        logs: Vec<promise_logs::Model>,
    ) -> bool {
        let tag = Self::logs_tag(promise_id);
        if self.generation(&tag) != generation {
            debug!(%promise_id, "stale log read not cached");
            return false;
        }
        self.logs.insert(tag.clone(), Arc::new(logs)).await;
        if self.generation(&tag) != generation {
            self.logs.invalidate(&tag).await;
            debug!(%promise_id, "stale log read not cached");
            return false;
        }
        true
    }

    /// Drops every cached read tagged with `tag`.
    pub async fn revalidate_tag(&self, tag: &str) {
        if tag.starts_with(LOGS_TAG_PREFIX) {
            self.bump(tag);
            self.logs.invalidate(tag).await;
        }
        debug!(tag, "cache tag revalidated");
    }

    fn generation(&self, tag: &str) -> u64 {
        let generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        generations.get(tag).copied().unwrap_or_default()
    }

    fn bump(&self, tag: &str) {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *generations.entry(tag.to_string()).or_default() += 1;
    }

    /// Rendered views live outside this process; path revalidation is only
    /// announced so the front end can refresh.
    pub fn revalidate_path(&self, path: &str) {
        debug!(path, "view path revalidated");
    }

    pub async fn revalidate_promise(&self, studio_slug: &str, promise_id: Uuid) {
        self.revalidate_path(&Self::pipeline_path(studio_slug));
        self.revalidate_path(&Self::promise_path(studio_slug, promise_id));
        self.revalidate_tag(&Self::logs_tag(promise_id)).await;
    }

    pub fn revalidate_pipeline(&self, studio_slug: &str) {
        self.revalidate_path(&Self::pipeline_path(studio_slug));
    }
}

impl Default for CacheBus {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_and_paths_are_stable() {
        let id = Uuid::nil();
        assert_eq!(
            CacheBus::logs_tag(id),
            "promise-logs:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(
            CacheBus::pipeline_path("demo"),
            "/demo/studio/commercial/promises"
        );
    }

    #[tokio::test]
    async fn read_overtaken_by_revalidation_is_not_cached() {
        let cache = CacheBus::default();
        let promise_id = Uuid::new_v4();

        let before = cache.logs_generation(promise_id);
        cache.revalidate_tag(&CacheBus::logs_tag(promise_id)).await;
        assert!(!cache.store_logs(promise_id, before, Vec::new()).await);
        assert!(cache.cached_logs(promise_id).await.is_none());

        let current = cache.logs_generation(promise_id);
        assert!(cache.store_logs(promise_id, current, Vec::new()).await);
        assert!(cache.cached_logs(promise_id).await.is_some());
    }

    #[tokio::test]
    async fn revalidating_one_promise_leaves_others_cached() {
        let cache = CacheBus::default();
        let kept = Uuid::new_v4();
        let dropped = Uuid::new_v4();
        let kept_generation = cache.logs_generation(kept);

        cache.revalidate_promise("demo", dropped).await;
        assert!(cache.store_logs(kept, kept_generation, Vec::new()).await);
        assert!(cache.cached_logs(kept).await.is_some());
    }
}
