pub mod anniversary;
pub mod feed;
pub mod posts;
pub mod toasts;

pub use self::anniversary::get_anniversary;
pub use self::feed::{get_comments, get_feed, post_scroll, put_query};
pub use self::posts::{create_post, save_post};
pub use self::toasts::{delete_toast, get_toasts};

pub async fn root() -> &'static str {
    "ふたりの日記フィードを配信しています"
}

pub async fn health() -> &'static str {
    "OK"
}
