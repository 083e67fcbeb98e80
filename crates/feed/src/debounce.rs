use crate::logic;
use diary_core::Post;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// 取り消し可能な遅延タイマー
///
/// `restart` のたびに期限が延び、最後の変更から `delay` 経過したときだけ `fired` が完了する。
/// `select!` の中で待ってもよい（途中で破棄されても期限は失われない）。
#[derive(Debug)]
pub struct DebounceTimer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn restart(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// 期限まで待つ。待機中のタイマーがなければ完了しない
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

/// 検索クエリとそのデバウンスタイマー
#[derive(Debug)]
pub struct SearchFilter {
    query: String,
    timer: DebounceTimer,
}

impl SearchFilter {
    pub fn new(delay: Duration) -> Self {
        Self {
            query: String::new(),
            timer: DebounceTimer::new(delay),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: String) {
        self.query = query;
        self.timer.restart();
    }

    /// 元になる投稿一覧が差し替わった
    pub fn base_changed(&mut self) {
        self.timer.restart();
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    pub async fn fired(&mut self) {
        self.timer.fired().await
    }

    pub fn apply(&self, base: &[Post]) -> Vec<Post> {
        logic::search(base, &self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(200);

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_quiet_period() {
        let mut timer = DebounceTimer::new(DELAY);
        let start = Instant::now();
        timer.restart();
        assert!(timer.is_pending());

        timer.fired().await;

        assert!(Instant::now() - start >= DELAY);
        assert!(!timer.is_pending());
    }

    /// 期間内の再始動で期限が延びるか検証
    #[tokio::test(start_paused = true)]
    async fn test_restart_pushes_deadline() {
        let mut timer = DebounceTimer::new(DELAY);
        let start = Instant::now();
        timer.restart();

        tokio::time::advance(Duration::from_millis(150)).await;
        timer.restart();

        // 最初の期限 (200ms) を過ぎてもまだ発火しない
        let early = tokio::time::timeout(Duration::from_millis(100), timer.fired()).await;
        assert!(early.is_err());

        timer.fired().await;
        assert!(Instant::now() - start >= Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let mut timer = DebounceTimer::new(DELAY);
        timer.restart();
        timer.cancel();

        let result = tokio::time::timeout(Duration::from_secs(10), timer.fired()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_search_filter_tracks_latest_query() {
        let mut filter = SearchFilter::new(DELAY);
        assert_eq!(filter.query(), "");
        assert!(!filter.is_pending());

        filter.set_query("h".to_string());
        filter.set_query("hello".to_string());
        assert_eq!(filter.query(), "hello");
        assert!(filter.is_pending());

        filter.cancel();
        assert!(!filter.is_pending());
    }
}
