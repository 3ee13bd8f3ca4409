use std::{collections::HashMap, sync::{Arc, Mutex}};

use axum::async_trait;
use chrono::Utc;
use derive_more::Constructor;
use sqlx::SqlitePool;

use crate::data_layer_error::Result;

use super::models::{CachedScore, Quality};

///
/// Keyed lookup of scorer verdicts
///
#[async_trait]
pub trait ScoreCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedScore>>;
    ///
    /// Stores a verdict. The first verdict stored for a key wins.
    ///
    async fn put(&self, key: &str, score: &CachedScore) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryScoreCache {
    entries: Mutex<HashMap<String, CachedScore>>,
}

impl MemoryScoreCache {
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ScoreCache for MemoryScoreCache {
    async fn get(&self, key: &str) -> Result<Option<CachedScore>> {
        let entries = self.entries.lock().map_err(|_| "score cache lock poisoned")?;
        Ok(entries.get(key).copied())
    }

    async fn put(&self, key: &str, score: &CachedScore) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| "score cache lock poisoned")?;
        entries.entry(key.to_string()).or_insert(*score);
        Ok(())
    }
}

#[derive(Constructor)]
pub struct DbScoreCache {
    db: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct ScoreCacheRow {
    quality: String,
    damage: i64,
    xp: i64,
}

#[async_trait]
impl ScoreCache for DbScoreCache {
    async fn get(&self, key: &str) -> Result<Option<CachedScore>> {
        let row = sqlx::query_as::<_, ScoreCacheRow>("SELECT quality, damage, xp FROM score_cache WHERE cache_key = ?")
            .bind(key)
            .fetch_optional(&self.db)
            .await?;

        // An unreadable quality is a stale row; treat it as a miss
        Ok(row.and_then(|r| Quality::parse(&r.quality).map(|quality| CachedScore { quality, damage: r.damage, xp: r.xp })))
    }

    async fn put(&self, key: &str, score: &CachedScore) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO score_cache (cache_key, quality, damage, xp, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(key)
            .bind(score.quality.as_str())
            .bind(score.damage)
            .bind(score.xp)
            .bind(Utc::now().naive_utc())
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

///
/// Process-local memory in front of a persistent tier. Store hits are
/// copied into memory.
///
pub struct TieredScoreCache {
    memory: MemoryScoreCache,
    store: Arc<dyn ScoreCache>,
}

impl TieredScoreCache {
    pub fn new(store: Arc<dyn ScoreCache>) -> Self {
        Self { memory: MemoryScoreCache::default(), store }
    }
}

#[async_trait]
impl ScoreCache for TieredScoreCache {
    async fn get(&self, key: &str) -> Result<Option<CachedScore>> {
        if let Some(score) = self.memory.get(key).await? {
            return Ok(Some(score));
        }
        let score = self.store.get(key).await?;
        if let Some(score) = &score {
            self.memory.put(key, score).await?;
        }
        Ok(score)
    }

    async fn put(&self, key: &str, score: &CachedScore) -> Result<()> {
        self.store.put(key, score).await?;
        // Re-read so memory agrees with whichever verdict won in the store
        let stored = self.store.get(key).await?.unwrap_or(*score);
        self.memory.put(key, &stored).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(quality: Quality, damage: i64) -> CachedScore {
        CachedScore { quality, damage, xp: damage }
    }

    #[tokio::test]
    async fn memory_cache_keeps_first_verdict() {
        let cache = MemoryScoreCache::default();
        cache.put("k", &score(Quality::Good, 15)).await.unwrap();
        cache.put("k", &score(Quality::Poor, 2)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(score(Quality::Good, 15)));
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn tiered_cache_backfills_memory_from_store() {
        let store = Arc::new(MemoryScoreCache::default());
        store.put("k", &score(Quality::Average, 8)).await.unwrap();

        let tiered = TieredScoreCache::new(store.clone());
        assert!(tiered.memory.is_empty());
        assert_eq!(tiered.get("k").await.unwrap(), Some(score(Quality::Average, 8)));
        assert_eq!(tiered.memory.len(), 1);
    }

    #[tokio::test]
    async fn tiered_cache_writes_through() {
        let store = Arc::new(MemoryScoreCache::default());
        let tiered = TieredScoreCache::new(store.clone());
        tiered.put("k", &score(Quality::Excellent, 25)).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(score(Quality::Excellent, 25)));
    }
}
