use crate::application::ports::FeedGateway;
use crate::application::services::mutation_service::{MutationCoordinator, MutationStatus};
use crate::application::services::pagination::PaginationController;
use crate::application::services::ranking_service::RankingService;
use crate::domain::entities::Post;
use crate::infrastructure::cache::ScoreCache;
use crate::infrastructure::store::FeedStore;
use crate::shared::{AppError, Debouncer, FeedConfig};
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, watch};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

const POSTS_COLLECTION: &str = "posts";
const ORDER_KEY: &str = "created_at";

/// 購読者へ公開するフィードの最新状態
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    /// ランク済みリストの可視プレフィックス
    pub posts: Vec<Post>,
    /// まだ見せられる投稿が残っている（可能性がある）か
    pub has_more: bool,
}

/// セッション内コンポーネントが共有する状態一式
///
/// セッション構築時に生成され、終了とともに破棄される。プロセス全体で
/// 共有されるシングルトンは持たない。
pub(crate) struct FeedShared {
    pub(crate) session_id: String,
    pub(crate) store: RwLock<FeedStore>,
    pub(crate) ranked: RwLock<Vec<Post>>,
    pub(crate) ranking: RankingService,
    pub(crate) score_cache: Arc<ScoreCache>,
    pub(crate) pagination: PaginationController,
    window_tx: watch::Sender<FeedSnapshot>,
    active: AtomicBool,
}

impl FeedShared {
    pub(crate) fn new(config: &FeedConfig) -> Self {
        let cache = Arc::new(ScoreCache::new(Duration::from_secs(
            config.score_cache_ttl_secs,
        )));
        let (window_tx, _) = watch::channel(FeedSnapshot {
            posts: Vec::new(),
            has_more: true,
        });
        Self {
            session_id: Uuid::new_v4().to_string(),
            store: RwLock::new(FeedStore::new()),
            ranked: RwLock::new(Vec::new()),
            ranking: RankingService::new(cache.clone()),
            score_cache: cache,
            pagination: PaginationController::new(config.page_size),
            window_tx,
            active: AtomicBool::new(true),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::SeqCst)
    }

    /// FeedStore の現時点のスナップショットを全件ソートし直す
    pub(crate) async fn resort(&self) {
        let snapshot = self.store.read().await.values();
        let ranked = self.ranking.rank(snapshot).await;
        *self.ranked.write().await = ranked;
    }

    /// 可視ウィンドウを購読者へ再発行する
    pub(crate) async fn publish(&self) {
        let ranked = self.ranked.read().await;
        let snapshot = FeedSnapshot {
            posts: self.pagination.window(&ranked).to_vec(),
            has_more: self.pagination.has_more(ranked.len()),
        };
        self.window_tx.send_replace(snapshot);
    }

    pub(crate) async fn resort_and_publish(&self) {
        self.resort().await;
        self.publish().await;
    }

    pub(crate) fn subscribe_updates(&self) -> watch::Receiver<FeedSnapshot> {
        self.window_tx.subscribe()
    }

    pub(crate) fn current_snapshot(&self) -> FeedSnapshot {
        self.window_tx.borrow().clone()
    }
}

/// 1つのフィードビューに対応するセッション
///
/// ライブ購読の受信、デバウンスされた再ソート、ウィンドウの前進、
/// 楽観的ミューテーションを束ねる。複数ビューはそれぞれ独立した
/// セッションを持ち、状態を共有しない。
pub struct FeedSession {
    gateway: Arc<dyn FeedGateway>,
    shared: Arc<FeedShared>,
    mutations: MutationCoordinator,
    debouncer: Arc<Debouncer>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl FeedSession {
    pub fn new(gateway: Arc<dyn FeedGateway>, config: FeedConfig) -> Self {
        let shared = Arc::new(FeedShared::new(&config));
        let mutations = MutationCoordinator::new(gateway.clone(), shared.clone());
        Self {
            gateway,
            shared,
            mutations,
            debouncer: Arc::new(Debouncer::new(Duration::from_millis(
                config.resort_debounce_ms,
            ))),
            listener: Mutex::new(None),
        }
    }

    /// ライブ購読を開始する
    ///
    /// セッションあたりの購読は常に高々ひとつ。開始済みならエラー。
    pub async fn start(&self) -> Result<(), AppError> {
        let mut listener = self.listener.lock().await;
        if listener.is_some() {
            return Err(AppError::subscription("feed session already started"));
        }
        if !self.shared.is_active() {
            return Err(AppError::subscription("feed session is shut down"));
        }

        let mut subscription = self.gateway.subscribe(POSTS_COLLECTION, ORDER_KEY).await?;
        let shared = self.shared.clone();
        let debouncer = self.debouncer.clone();

        // 購読ハンドルはリスナータスクが所有するため、タスクの abort か
        // 正常終了のどちらでも破棄関数が一度だけ走る。
        *listener = Some(tokio::spawn(async move {
            while let Some(records) = subscription.snapshots.recv().await {
                if !shared.is_active() {
                    break;
                }
                let outcome = shared.store.write().await.merge(records);
                if outcome.changed() {
                    let shared = shared.clone();
                    debouncer
                        .trigger(move || async move {
                            // 破棄後に発火した遅延タイマーは no-op
                            if shared.is_active() {
                                shared.resort_and_publish().await;
                            }
                        })
                        .await;
                }
            }
        }));

        info!(session_id = %self.shared.session_id, "feed session started");
        Ok(())
    }

    /// ウィンドウを1ページ分進める
    ///
    /// ローカルに投稿が残っていなければ外部ストアへ過去フェッチを行う。
    /// フェッチ失敗は再試行可能なエラーとして返し、終端フラグには触れない。
    pub async fn load_more(&self) -> Result<(), AppError> {
        if !self.shared.is_active() {
            return Err(AppError::subscription("feed session is shut down"));
        }

        let ranked_len = self.shared.ranked.read().await.len();
        if self.shared.pagination.advance(ranked_len) {
            self.shared.publish().await;
            return Ok(());
        }

        // ローカルは尽きている。リモート確認済みならこれ以上問い合わせない
        if self.shared.pagination.is_remote_exhausted() {
            self.shared.publish().await;
            return Ok(());
        }

        let older_than = {
            let store = self.shared.store.read().await;
            store
                .oldest_created_at()
                .unwrap_or_else(|| Utc::now().timestamp_millis())
        };
        let fetched = self
            .gateway
            .query_older(
                POSTS_COLLECTION,
                older_than,
                self.shared.pagination.page_size(),
            )
            .await?;

        // 破棄後に届いた応答は適用しない
        if !self.shared.is_active() {
            return Ok(());
        }

        let outcome = self.shared.store.write().await.merge(fetched);
        if outcome.inserted == 0 {
            self.shared.pagination.mark_remote_exhausted();
            self.shared.publish().await;
            return Ok(());
        }

        self.shared.resort().await;
        let ranked_len = self.shared.ranked.read().await.len();
        self.shared.pagination.advance(ranked_len);
        self.shared.publish().await;
        Ok(())
    }

    /// いいね状態をトグルする（楽観適用、失敗時ロールバック）
    pub async fn toggle_like(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> Result<MutationStatus, AppError> {
        self.mutations.toggle_like(post_id, user_id).await
    }

    /// 投稿を削除する（楽観適用、失敗時ロールバック）
    pub async fn delete_post(&self, post_id: &str) -> Result<MutationStatus, AppError> {
        self.mutations.delete_post(post_id).await
    }

    /// 可視ウィンドウの更新ストリーム
    pub fn updates(&self) -> watch::Receiver<FeedSnapshot> {
        self.shared.subscribe_updates()
    }

    /// 現在の可視ウィンドウ
    pub fn current(&self) -> FeedSnapshot {
        self.shared.current_snapshot()
    }

    /// 現在素材化されている最下位スコア
    pub async fn watermark(&self) -> Option<f64> {
        self.shared.ranking.watermark().await
    }

    /// セッションを終了する（冪等）
    ///
    /// 以後のタイマー発火や遅延応答はすべて no-op になる。
    pub async fn shutdown(&self) {
        let was_active = self.shared.deactivate();
        self.debouncer.cancel().await;
        if let Some(handle) = self.listener.lock().await.take() {
            handle.abort();
        }
        if was_active {
            info!(session_id = %self.shared.session_id, "feed session shut down");
        }
    }
}
