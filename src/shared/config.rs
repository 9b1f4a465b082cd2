use serde::{Deserialize, Serialize};

/// フィードセッションの設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// 1ページあたりの投稿数
    pub page_size: usize,
    /// 再ソートのデバウンス時間（ミリ秒）
    pub resort_debounce_ms: u64,
    /// スコアキャッシュのTTL（秒）
    pub score_cache_ttl_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            resort_debounce_ms: 500,
            score_cache_ttl_secs: 300,
        }
    }
}
