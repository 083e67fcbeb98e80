use diary_core::{Comment, Post, Timestamped, ViewerIdentity};

/// 閲覧者がこの投稿を見られるか
///
/// 公開投稿は誰でも、非公開投稿は投稿者本人だけ。未ログインなら公開投稿のみ。
pub fn is_visible(post: &Post, viewer: Option<&ViewerIdentity>) -> bool {
    !post.is_private || viewer.is_some_and(|v| v.email == post.owner_email)
}

/// 入力の並び順は保ったまま、見える投稿だけを返す
pub fn filter_visible(posts: &[Post], viewer: Option<&ViewerIdentity>) -> Vec<Post> {
    posts
        .iter()
        .filter(|post| is_visible(post, viewer))
        .cloned()
        .collect()
}

/// 新しい順（安定ソート。同時刻は入力順のまま）
pub fn sort_newest_first<T: Timestamped>(items: &mut [T]) {
    items.sort_by(|a, b| {
        b.timestamp()
            .instant_millis()
            .total_cmp(&a.timestamp().instant_millis())
    });
}

/// 古い順（安定ソート）
pub fn sort_oldest_first<T: Timestamped>(items: &mut [T]) {
    items.sort_by(|a, b| {
        a.timestamp()
            .instant_millis()
            .total_cmp(&b.timestamp().instant_millis())
    });
}

pub fn sort_posts(mut posts: Vec<Post>) -> Vec<Post> {
    sort_newest_first(&mut posts);
    posts
}

pub fn sort_comments(mut comments: Vec<Comment>) -> Vec<Comment> {
    sort_oldest_first(&mut comments);
    comments
}

/// キャプションに `query` をそのまま含む投稿（大文字小文字は区別する）
///
/// 空のクエリは全件をそのまま返す。
pub fn search(base: &[Post], query: &str) -> Vec<Post> {
    if query.is_empty() {
        return base.to_vec();
    }
    base.iter()
        .filter(|post| post.caption.contains(query))
        .cloned()
        .collect()
}
