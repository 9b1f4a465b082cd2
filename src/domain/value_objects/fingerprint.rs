/// スコア計算対象となる投稿状態の指紋
///
/// 可変フィールド（likes）を含むため、いいね数が変わると別の指紋になる。
/// `created_at` が未採番の場合はスコアラーと同じ「作成直後」扱いの 0 に正規化する。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScoreFingerprint {
    pub post_id: String,
    pub likes: u32,
    pub created_at: i64,
}

impl ScoreFingerprint {
    pub fn new(post_id: impl Into<String>, likes: u32, created_at: Option<i64>) -> Self {
        Self {
            post_id: post_id.into(),
            likes,
            created_at: created_at.unwrap_or(0),
        }
    }
}
