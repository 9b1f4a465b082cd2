use crate::domain::entities::Post;
use std::collections::{HashMap, HashSet};

/// `merge` の適用結果
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOutcome {
    /// 新規に挿入された投稿数
    pub inserted: usize,
    /// 内容が変化した既存投稿数
    pub updated: usize,
}

impl MergeOutcome {
    pub fn changed(&self) -> bool {
        self.inserted > 0 || self.updated > 0
    }
}

/// セッション内で観測した全投稿を保持するストア
///
/// `seen_timestamps` はスナップショットの再配信や重複する過去フェッチを
/// 弾くための軽量フィルタ。ミリ秒単位で created_at が衝突した別投稿は
/// 既知として誤って捨てられる（意図的に残している近似）。
#[derive(Default)]
pub struct FeedStore {
    posts: HashMap<String, Post>,
    seen_timestamps: HashSet<i64>,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 投稿群をマージする
    ///
    /// 既知 id は更新、未知 id は created_at が未観測の場合のみ挿入。
    pub fn merge(&mut self, posts: Vec<Post>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for post in posts {
            if let Some(existing) = self.posts.get(&post.id) {
                if *existing != post {
                    self.posts.insert(post.id.clone(), post);
                    outcome.updated += 1;
                }
                continue;
            }

            if let Some(ts) = post.created_at {
                if !self.seen_timestamps.insert(ts) {
                    // 同一ミリ秒の別投稿もここで落ちる
                    continue;
                }
            }
            self.posts.insert(post.id.clone(), post);
            outcome.inserted += 1;
        }
        outcome
    }

    pub fn remove(&mut self, post_id: &str) -> Option<Post> {
        let removed = self.posts.remove(post_id)?;
        if let Some(ts) = removed.created_at {
            self.seen_timestamps.remove(&ts);
        }
        Some(removed)
    }

    /// 重複フィルタを通さない直接挿入（楽観更新の適用とロールバック再挿入に使う）
    pub fn upsert(&mut self, post: Post) {
        if let Some(ts) = post.created_at {
            self.seen_timestamps.insert(ts);
        }
        self.posts.insert(post.id.clone(), post);
    }

    pub fn get(&self, post_id: &str) -> Option<&Post> {
        self.posts.get(post_id)
    }

    /// 現在の内容のスナップショット（順序は不定）
    pub fn values(&self) -> Vec<Post> {
        self.posts.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// 過去フェッチの境界に使う最古の created_at
    pub fn oldest_created_at(&self) -> Option<i64> {
        self.posts.values().filter_map(|post| post.created_at).min()
    }
}
