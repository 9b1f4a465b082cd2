use crate::domain::entities::Post;
use crate::infrastructure::cache::ScoreCache;
use chrono::Utc;
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// 経過時間の減衰指数
pub const TIME_DECAY_WEIGHT: i32 = 1;
/// いいねの増幅指数
pub const LIKE_AMPLIFICATION_WEIGHT: i32 = 2;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// 投稿1件の人気・鮮度スコア
///
/// `score = (1 / (age_hours + 2)^T) * (likes + 1)^L`
///
/// created_at の欠落は作成直後として扱い、未来の時刻も経過 0 に丸める。
/// いずれの入力でも必ず正の有限値を返す。
pub fn relevancy_score(created_at: Option<i64>, likes: u32, now_ms: i64) -> f64 {
    let age_ms = created_at.map(|ts| (now_ms - ts).max(0)).unwrap_or(0);
    let age_hours = age_ms as f64 / MS_PER_HOUR;
    let decay = 1.0 / (age_hours + 2.0).powi(TIME_DECAY_WEIGHT);
    let amplification = (f64::from(likes) + 1.0).powi(LIKE_AMPLIFICATION_WEIGHT);
    decay * amplification
}

/// フィード全体のスコア順ソートを担うサービス
///
/// スコア計算は ScoreCache を経由し、ソートのたびに最下位スコア
/// （ページネーション境界のウォーターマーク）を更新する。
pub struct RankingService {
    cache: Arc<ScoreCache>,
    lowest_visible_score: RwLock<Option<f64>>,
}

impl RankingService {
    pub fn new(cache: Arc<ScoreCache>) -> Self {
        Self {
            cache,
            lowest_visible_score: RwLock::new(None),
        }
    }

    /// スコア降順の全件再ソート（増分更新はしない）
    pub async fn rank(&self, posts: Vec<Post>) -> Vec<Post> {
        let now_ms = Utc::now().timestamp_millis();
        let mut scored = Vec::with_capacity(posts.len());
        for post in posts {
            let fingerprint = post.fingerprint();
            let score = match self.cache.get(&fingerprint).await {
                Some(score) => score,
                None => {
                    let score = relevancy_score(post.created_at, post.likes, now_ms);
                    self.cache.set(fingerprint, score).await;
                    score
                }
            };
            scored.push((score, post));
        }

        // 安定ソートなので同点は入力順のまま（固定入力に対して決定的）
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        if let Some((score, _)) = scored.last() {
            *self.lowest_visible_score.write().await = Some(*score);
        }
        debug!(count = scored.len(), "feed resorted");

        scored.into_iter().map(|(_, post)| post).collect()
    }

    /// 現在素材化されている最下位スコア
    pub async fn watermark(&self) -> Option<f64> {
        *self.lowest_visible_score.read().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}
