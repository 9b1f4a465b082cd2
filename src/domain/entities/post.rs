use crate::domain::value_objects::ScoreFingerprint;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// 外部ストアが作成時に採番する不透明な識別子
    pub id: String,
    pub author_id: String,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    /// ミリ秒エポック（サーバー側で採番）。未採番レコードでは欠落しうる
    #[serde(default)]
    pub created_at: Option<i64>,
    /// いいね数はストア側の値をそのまま信頼する（liked_by.len() との一致は強制しない）
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub liked_by: Vec<String>,
}

impl Post {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.liked_by.iter().any(|id| id == user_id)
    }

    /// 指定ユーザーのいいね状態をトグルした新しい投稿を返す
    pub fn toggled_like(&self, user_id: &str) -> Post {
        let mut toggled = self.clone();
        if toggled.is_liked_by(user_id) {
            toggled.likes = toggled.likes.saturating_sub(1);
            toggled.liked_by.retain(|id| id != user_id);
        } else {
            toggled.likes += 1;
            toggled.liked_by.push(user_id.to_string());
        }
        toggled
    }

    pub fn fingerprint(&self) -> ScoreFingerprint {
        ScoreFingerprint::new(self.id.clone(), self.likes, self.created_at)
    }
}
