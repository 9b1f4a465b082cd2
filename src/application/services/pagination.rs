use crate::domain::entities::Post;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// ランク済みリストに対する可視ウィンドウの状態機械
///
/// ページ数は単調増加のみ。終端は「ローカルで既知」と「リモートで確認済み」を
/// 区別し、後者は恒久フラグとして以後の過去フェッチを抑止する。
pub struct PaginationController {
    page_size: usize,
    page: AtomicUsize,
    local_exhausted: AtomicBool,
    remote_exhausted: AtomicBool,
}

impl PaginationController {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            page: AtomicUsize::new(1),
            local_exhausted: AtomicBool::new(false),
            remote_exhausted: AtomicBool::new(false),
        }
    }

    pub fn page(&self) -> usize {
        self.page.load(Ordering::SeqCst)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// 可視ウィンドウの長さ（page * page_size）
    pub fn window_len(&self) -> usize {
        self.page() * self.page_size
    }

    /// ランク済みリストの先頭プレフィックスを返す
    pub fn window<'a>(&self, ranked: &'a [Post]) -> &'a [Post] {
        &ranked[..self.window_len().min(ranked.len())]
    }

    /// ウィンドウの先に投稿が残っている場合のみページを進める
    pub fn advance(&self, ranked_len: usize) -> bool {
        if ranked_len > self.window_len() {
            self.page.fetch_add(1, Ordering::SeqCst);
            self.local_exhausted.store(false, Ordering::SeqCst);
            true
        } else {
            self.local_exhausted.store(true, Ordering::SeqCst);
            false
        }
    }

    pub fn is_locally_exhausted(&self) -> bool {
        self.local_exhausted.load(Ordering::SeqCst)
    }

    /// リモート終端を確定する（恒久、解除されない）
    pub fn mark_remote_exhausted(&self) {
        self.remote_exhausted.store(true, Ordering::SeqCst);
    }

    pub fn is_remote_exhausted(&self) -> bool {
        self.remote_exhausted.load(Ordering::SeqCst)
    }

    /// まだ見せられる投稿が残っている（可能性がある）か
    pub fn has_more(&self, ranked_len: usize) -> bool {
        ranked_len > self.window_len() || !self.is_remote_exhausted()
    }
}
