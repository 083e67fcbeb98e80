use diary_core::Post;
use futures_util::future::try_join_all;
use store::GallerySaver;
use toast::{Notify, ToastMessage};

pub const SAVING_MESSAGE: &str = "Saving...";

/// 投稿の画像をすべてギャラリーへ保存し、進捗と結果をトーストで知らせる
pub async fn save_pictures(post: &Post, gallery: &dyn GallerySaver, notifier: &dyn Notify) {
    if post.images.is_empty() {
        return;
    }

    notifier.notify(ToastMessage::plain(SAVING_MESSAGE));

    let saves = post.images.iter().map(|url| gallery.save(url));
    match try_join_all(saves).await {
        Ok(receipts) => {
            tracing::info!("Saved {} images of post {}", receipts.len(), post.id);
            let message = receipts
                .into_iter()
                .next()
                .map(|receipt| receipt.message)
                .unwrap_or_default();
            notifier.notify(ToastMessage::success(message));
        }
        Err(e) => {
            tracing::warn!("Failed to save images of post {}: {:#}", post.id, e);
            notifier.notify(ToastMessage::error(format!("{:#}", e)));
        }
    }
}
