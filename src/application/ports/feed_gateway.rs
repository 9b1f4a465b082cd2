use crate::domain::entities::Post;
use crate::shared::error::AppError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// いいね書き込みに使う部分レコード
#[derive(Debug, Clone, PartialEq)]
pub struct PostUpdate {
    pub likes: u32,
    pub liked_by: Vec<String>,
}

impl From<&Post> for PostUpdate {
    fn from(post: &Post) -> Self {
        Self {
            likes: post.likes,
            liked_by: post.liked_by.clone(),
        }
    }
}

/// ライブ購読のハンドル
///
/// 破棄関数は `dispose` か Drop のどちらか早い方で、必ず一度だけ呼ばれる。
pub struct FeedSubscription {
    pub snapshots: mpsc::Receiver<Vec<Post>>,
    disposer: Option<Box<dyn FnOnce() + Send>>,
}

impl FeedSubscription {
    pub fn new(snapshots: mpsc::Receiver<Vec<Post>>, disposer: Box<dyn FnOnce() + Send>) -> Self {
        Self {
            snapshots,
            disposer: Some(disposer),
        }
    }

    pub fn dispose(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            disposer();
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// 外部ストアに対する境界ポート
///
/// スナップショットは順序付きで届く想定だが、コア側は順不同のバッグとして
/// 扱い直す。exactly-once 配信も仮定しない。
#[async_trait]
pub trait FeedGateway: Send + Sync {
    /// コレクションのライブ購読を開始する
    async fn subscribe(
        &self,
        collection: &str,
        order_key: &str,
    ) -> Result<FeedSubscription, AppError>;

    /// 指定時刻より古い投稿を最大 limit 件取得する（過去方向ページネーション）
    async fn query_older(
        &self,
        collection: &str,
        older_than: i64,
        limit: usize,
    ) -> Result<Vec<Post>, AppError>;

    /// いいね数・いいねユーザー集合の部分更新
    async fn update_post(&self, post_id: &str, update: PostUpdate) -> Result<(), AppError>;

    /// 投稿の削除
    async fn remove_post(&self, post_id: &str) -> Result<(), AppError>;
}
