//! 無限スクロールの「もっと読む」制御
//!
//! 1回のスクロール操作（慣性スクロールの開始から次の開始まで）で
//! 末尾到達が何度判定されても、読み込み要求は1回だけ出す。

use anyhow::Result;
use diary_core::Post;

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// 次のページを取ってくる外部呼び出し
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, offset: usize, size: usize) -> Result<()>;
}

/// スナップショットで全件が手元にある場合の取得元。待たずに完了する
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalPageSource;

#[async_trait::async_trait]
impl PageSource for LocalPageSource {
    async fn fetch_page(&self, _offset: usize, _size: usize) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub size: usize,
}

#[derive(Debug)]
pub struct FeedCursor {
    page_size: usize,
    window: usize,
    loading_more: bool,
    /// この操作中にすでに要求を出したか
    momentum_consumed: bool,
}

impl FeedCursor {
    pub fn new(page_size: usize) -> Self {
        let page_size = page_size.max(1);
        Self {
            page_size,
            window: page_size,
            loading_more: false,
            // 操作が始まるまでは末尾到達を無視する
            momentum_consumed: true,
        }
    }

    pub fn loading_more(&self) -> bool {
        self.loading_more
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn begin_gesture(&mut self) {
        self.momentum_consumed = false;
    }

    /// 末尾に到達した。この操作で初めてなら読み込み要求を返す
    pub fn end_reached(&mut self) -> Option<PageRequest> {
        if self.momentum_consumed {
            return None;
        }
        self.momentum_consumed = true;
        Some(self.start_request())
    }

    fn start_request(&mut self) -> PageRequest {
        if self.loading_more {
            // 別の操作から重ねて要求が来ても止めない。二重取得になりうる
            tracing::warn!(
                "Load-more requested while another is in flight (offset {})",
                self.window
            );
        }
        self.loading_more = true;
        PageRequest {
            offset: self.window,
            size: self.page_size,
        }
    }

    pub fn finish_request(&mut self, result: &Result<()>) {
        self.loading_more = false;
        match result {
            Ok(()) => self.window += self.page_size,
            Err(e) => tracing::warn!("Failed to load more posts: {:#}", e),
        }
    }

    /// 表示中の一覧のうち、描画対象にする先頭部分
    pub fn materialize<'a>(&self, posts: &'a [Post]) -> &'a [Post] {
        &posts[..self.window.min(posts.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diary_core::Timestamp;

    fn posts(n: usize) -> Vec<Post> {
        (0..n)
            .map(|i| Post {
                id: i.to_string(),
                owner_email: String::new(),
                is_private: false,
                caption: String::new(),
                images: vec![],
                created_at: Timestamp::new(i as i64, 0),
                comments: vec![],
                hashtags: vec![],
            })
            .collect()
    }

    /// 操作開始前の末尾到達は無視される
    #[test]
    fn test_end_reached_before_any_gesture_is_ignored() {
        let mut cursor = FeedCursor::new(5);
        assert_eq!(cursor.end_reached(), None);
        assert!(!cursor.loading_more());
    }

    /// 1回の操作では何度末尾に到達しても要求は1回だけ
    #[test]
    fn test_one_request_per_gesture() {
        let mut cursor = FeedCursor::new(5);
        cursor.begin_gesture();

        assert_eq!(
            cursor.end_reached(),
            Some(PageRequest { offset: 5, size: 5 })
        );
        assert!(cursor.loading_more());
        assert_eq!(cursor.end_reached(), None);
        assert_eq!(cursor.end_reached(), None);

        cursor.finish_request(&Ok(()));
        assert!(!cursor.loading_more());
        assert_eq!(cursor.window(), 10);

        // 次の操作ではまた要求できる
        cursor.begin_gesture();
        assert_eq!(
            cursor.end_reached(),
            Some(PageRequest {
                offset: 10,
                size: 5
            })
        );
    }

    /// 別の操作からの要求は重ねて出てしまう（既知の二重取得）
    #[test]
    fn test_overlapping_gestures_are_not_guarded() {
        let mut cursor = FeedCursor::new(5);
        cursor.begin_gesture();
        assert!(cursor.end_reached().is_some());

        cursor.begin_gesture();
        assert!(cursor.end_reached().is_some());
        assert!(cursor.loading_more());
    }

    #[test]
    fn test_failed_request_keeps_window() {
        let mut cursor = FeedCursor::new(5);
        cursor.begin_gesture();
        cursor.end_reached();

        cursor.finish_request(&Err(anyhow::anyhow!("offline")));
        assert!(!cursor.loading_more());
        assert_eq!(cursor.window(), 5);
    }

    #[test]
    fn test_materialize_clamps_to_available_posts() {
        let cursor = FeedCursor::new(5);
        assert_eq!(cursor.materialize(&posts(12)).len(), 5);
        assert_eq!(cursor.materialize(&posts(3)).len(), 3);
        assert!(cursor.materialize(&[]).is_empty());
    }

    /// 取得元の結果で表示件数が広がるか検証
    #[tokio::test]
    async fn test_local_page_source_extends_window() {
        let mut cursor = FeedCursor::new(2);
        cursor.begin_gesture();
        let request = cursor.end_reached().unwrap();

        let result = LocalPageSource
            .fetch_page(request.offset, request.size)
            .await;
        cursor.finish_request(&result);

        assert_eq!(cursor.window(), 4);
        assert_eq!(cursor.materialize(&posts(3)).len(), 3);
    }
}
