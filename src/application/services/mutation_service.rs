use crate::application::ports::{FeedGateway, PostUpdate};
use crate::application::services::feed_service::FeedShared;
use crate::shared::error::AppError;
use std::sync::Arc;
use tracing::{debug, warn};

/// 楽観的ミューテーションの遷移状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    /// ローカル適用済み、書き込み確認待ち
    Pending,
    /// 外部ストアへの書き込みが確定した
    Committed,
    /// 書き込み失敗により適用前の状態へ巻き戻した
    RolledBack,
}

/// いいね・削除の楽観適用と巻き戻しを担うコーディネーター
///
/// 適用前スナップショットはロールバックに必要な間だけ保持し、
/// コミット時点で破棄する。ゲートウェイのエラーはここで吸収され、
/// ランキング・ページネーション層へは伝播しない。
pub struct MutationCoordinator {
    gateway: Arc<dyn FeedGateway>,
    shared: Arc<FeedShared>,
}

impl MutationCoordinator {
    pub(crate) fn new(gateway: Arc<dyn FeedGateway>, shared: Arc<FeedShared>) -> Self {
        Self { gateway, shared }
    }

    /// いいね状態のトグル
    ///
    /// ローカルで反転した件数・ユーザー集合をそのまま書き戻す。
    /// サーバー側のアトミックな増分は使わないため、複数クライアントの
    /// 同時トグルは競合しうる（既知の制限として許容する）。
    pub async fn toggle_like(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> Result<MutationStatus, AppError> {
        let (previous, update) = {
            let mut store = self.shared.store.write().await;
            let current = store
                .get(post_id)
                .cloned()
                .ok_or_else(|| AppError::not_found(format!("post {post_id}")))?;
            let toggled = current.toggled_like(user_id);
            let update = PostUpdate::from(&toggled);
            store.upsert(toggled);
            (current, update)
        };
        self.shared.resort_and_publish().await;
        debug!(
            session_id = %self.shared.session_id,
            post_id,
            status = ?MutationStatus::Pending,
            "like toggled locally"
        );

        match self.gateway.update_post(post_id, update).await {
            Ok(()) => Ok(MutationStatus::Committed),
            Err(err) => {
                warn!(
                    session_id = %self.shared.session_id,
                    post_id,
                    error = %err,
                    "like write failed, rolling back"
                );
                self.shared.store.write().await.upsert(previous);
                self.shared.resort_and_publish().await;
                Ok(MutationStatus::RolledBack)
            }
        }
    }

    /// 投稿の削除
    ///
    /// 確定時はスコアキャッシュを丸ごとクリアする（指紋単位の選択的な
    /// 無効化はしない）。
    pub async fn delete_post(&self, post_id: &str) -> Result<MutationStatus, AppError> {
        let removed = {
            let mut store = self.shared.store.write().await;
            store
                .remove(post_id)
                .ok_or_else(|| AppError::not_found(format!("post {post_id}")))?
        };
        self.shared.resort_and_publish().await;
        debug!(
            session_id = %self.shared.session_id,
            post_id,
            status = ?MutationStatus::Pending,
            "post removed locally"
        );

        match self.gateway.remove_post(post_id).await {
            Ok(()) => {
                self.shared.ranking.clear_cache().await;
                Ok(MutationStatus::Committed)
            }
            Err(err) => {
                warn!(
                    session_id = %self.shared.session_id,
                    post_id,
                    error = %err,
                    "delete failed, restoring post"
                );
                self.shared.store.write().await.upsert(removed);
                self.shared.resort_and_publish().await;
                Ok(MutationStatus::RolledBack)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::FeedSubscription;
    use crate::domain::entities::Post;
    use crate::shared::FeedConfig;
    use async_trait::async_trait;
    use chrono::Utc;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        pub Gateway {}

        #[async_trait]
        impl FeedGateway for Gateway {
            async fn subscribe(
                &self,
                collection: &str,
                order_key: &str,
            ) -> Result<FeedSubscription, AppError>;
            async fn query_older(
                &self,
                collection: &str,
                older_than: i64,
                limit: usize,
            ) -> Result<Vec<Post>, AppError>;
            async fn update_post(&self, post_id: &str, update: PostUpdate) -> Result<(), AppError>;
            async fn remove_post(&self, post_id: &str) -> Result<(), AppError>;
        }
    }

    fn post(id: &str, likes: u32, liked_by: Vec<&str>) -> Post {
        Post {
            id: id.to_string(),
            author_id: "author1".to_string(),
            content: "content".to_string(),
            image_url: None,
            created_at: Some(Utc::now().timestamp_millis()),
            likes,
            liked_by: liked_by.into_iter().map(String::from).collect(),
        }
    }

    async fn seeded_shared(posts: Vec<Post>) -> Arc<FeedShared> {
        let shared = Arc::new(FeedShared::new(&FeedConfig::default()));
        shared.store.write().await.merge(posts);
        shared.resort_and_publish().await;
        shared
    }

    #[tokio::test]
    async fn test_toggle_like_commits_optimistic_state() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_update_post()
            .with(
                eq("p1"),
                eq(PostUpdate {
                    likes: 6,
                    liked_by: vec!["u1".to_string()],
                }),
            )
            .times(1)
            .returning(|_, _| Ok(()));
        let shared = seeded_shared(vec![post("p1", 5, vec![])]).await;
        let coordinator = MutationCoordinator::new(Arc::new(gateway), shared.clone());

        let status = coordinator.toggle_like("p1", "u1").await.unwrap();

        assert_eq!(status, MutationStatus::Committed);
        let stored = shared.store.read().await.get("p1").cloned().unwrap();
        assert_eq!(stored.likes, 6);
        assert!(stored.is_liked_by("u1"));
    }

    #[tokio::test]
    async fn test_toggle_like_rolls_back_on_write_failure() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_update_post()
            .times(1)
            .returning(|_, _| Err(AppError::gateway("write failed")));
        let shared = seeded_shared(vec![post("p1", 5, vec![])]).await;
        let coordinator = MutationCoordinator::new(Arc::new(gateway), shared.clone());

        let status = coordinator.toggle_like("p1", "u1").await.unwrap();

        assert_eq!(status, MutationStatus::RolledBack);
        let stored = shared.store.read().await.get("p1").cloned().unwrap();
        assert_eq!(stored.likes, 5);
        assert!(stored.liked_by.is_empty());
    }

    #[tokio::test]
    async fn test_unlike_removes_user_from_liked_by() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_update_post()
            .times(1)
            .returning(|_, _| Ok(()));
        let shared = seeded_shared(vec![post("p1", 3, vec!["u1", "u2"])]).await;
        let coordinator = MutationCoordinator::new(Arc::new(gateway), shared.clone());

        coordinator.toggle_like("p1", "u1").await.unwrap();

        let stored = shared.store.read().await.get("p1").cloned().unwrap();
        assert_eq!(stored.likes, 2);
        assert!(!stored.is_liked_by("u1"));
        assert!(stored.is_liked_by("u2"));
    }

    #[tokio::test]
    async fn test_toggle_like_unknown_post_is_not_found() {
        let gateway = MockGateway::new();
        let shared = seeded_shared(Vec::new()).await;
        let coordinator = MutationCoordinator::new(Arc::new(gateway), shared);

        let err = coordinator.toggle_like("missing", "u1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_commits_and_clears_score_cache() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_remove_post()
            .with(eq("p1"))
            .times(1)
            .returning(|_| Ok(()));
        let shared = seeded_shared(vec![post("p1", 1, vec![]), post("p2", 2, vec![])]).await;
        let coordinator = MutationCoordinator::new(Arc::new(gateway), shared.clone());

        let status = coordinator.delete_post("p1").await.unwrap();

        assert_eq!(status, MutationStatus::Committed);
        assert!(shared.store.read().await.get("p1").is_none());
        // 削除確定後はスコアキャッシュが空になっている
        assert!(shared.score_cache.is_empty().await);
        assert!(shared.current_snapshot().posts.iter().all(|p| p.id != "p1"));
    }

    #[tokio::test]
    async fn test_delete_rolls_back_on_failure() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_remove_post()
            .times(1)
            .returning(|_| Err(AppError::gateway("delete failed")));
        let shared = seeded_shared(vec![post("p1", 1, vec![])]).await;
        let coordinator = MutationCoordinator::new(Arc::new(gateway), shared.clone());

        let status = coordinator.delete_post("p1").await.unwrap();

        assert_eq!(status, MutationStatus::RolledBack);
        assert!(shared.store.read().await.get("p1").is_some());
        assert!(shared.current_snapshot().posts.iter().any(|p| p.id == "p1"));
    }
}
