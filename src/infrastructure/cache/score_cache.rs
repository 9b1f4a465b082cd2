use crate::domain::value_objects::ScoreFingerprint;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

struct CacheEntry {
    score: f64,
    cached_at: Instant,
}

struct CacheState {
    entries: HashMap<ScoreFingerprint, CacheEntry>,
    last_sweep: Instant,
}

/// スコアのメモ化キャッシュ
///
/// TTL を過ぎたエントリは返さない。掃除は `set` 時に償却実行するだけなので、
/// 次の掃除までは期限切れエントリがメモリに残りうる。
pub struct ScoreCache {
    state: RwLock<CacheState>,
    ttl: Duration,
}

impl ScoreCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            state: RwLock::new(CacheState {
                entries: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            ttl,
        }
    }

    /// 指紋に対応するスコアを取得する
    ///
    /// エントリが物理的に残っていても TTL を過ぎていれば欠落扱い。
    pub async fn get(&self, fingerprint: &ScoreFingerprint) -> Option<f64> {
        let state = self.state.read().await;
        state
            .entries
            .get(fingerprint)
            .filter(|entry| entry.cached_at.elapsed() <= self.ttl)
            .map(|entry| entry.score)
    }

    /// スコアを保存する
    ///
    /// 前回の掃除から TTL 以上経過していれば、期限切れエントリを一括削除する。
    pub async fn set(&self, fingerprint: ScoreFingerprint, score: f64) {
        let mut state = self.state.write().await;
        state.entries.insert(
            fingerprint,
            CacheEntry {
                score,
                cached_at: Instant::now(),
            },
        );

        if state.last_sweep.elapsed() > self.ttl {
            let before = state.entries.len();
            let ttl = self.ttl;
            state.entries.retain(|_, entry| entry.cached_at.elapsed() <= ttl);
            state.last_sweep = Instant::now();
            debug!(
                removed = before - state.entries.len(),
                remaining = state.entries.len(),
                "swept expired score cache entries"
            );
        }
    }

    /// キャッシュを無条件で空にする
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.entries.clear();
        state.last_sweep = Instant::now();
    }

    /// 物理的に保持しているエントリ数（期限切れを含む）
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(id: &str, likes: u32) -> ScoreFingerprint {
        ScoreFingerprint::new(id, likes, Some(1_700_000_000_000))
    }

    #[tokio::test]
    async fn test_set_and_get() {
        let cache = ScoreCache::new(Duration::from_secs(300));
        cache.set(fp("p1", 3), 0.5).await;

        assert_eq!(cache.get(&fp("p1", 3)).await, Some(0.5));
        assert_eq!(cache.get(&fp("p1", 4)).await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent_without_sweep() {
        let cache = ScoreCache::new(Duration::from_millis(20));
        cache.set(fp("p1", 0), 1.0).await;

        tokio::time::sleep(Duration::from_millis(40)).await;

        // 掃除は走っていないので物理的には残っているが、取得はできない
        assert_eq!(cache.get(&fp("p1", 0)).await, None);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_set_sweeps_expired_entries() {
        let cache = ScoreCache::new(Duration::from_millis(20));
        cache.set(fp("p1", 0), 1.0).await;
        cache.set(fp("p2", 0), 2.0).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        cache.set(fp("p3", 0), 3.0).await;

        // p1/p2 は掃除で物理削除され、p3 だけが残る
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&fp("p3", 0)).await, Some(3.0));
    }

    #[tokio::test]
    async fn test_clear_empties_cache() {
        let cache = ScoreCache::new(Duration::from_secs(300));
        cache.set(fp("p1", 0), 1.0).await;
        cache.set(fp("p2", 1), 2.0).await;

        cache.clear().await;

        assert!(cache.is_empty().await);
        assert_eq!(cache.get(&fp("p1", 0)).await, None);
    }
}
