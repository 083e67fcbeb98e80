use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use publisher::NewPost;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub id: Option<String>,
}

/// 新規投稿
///
/// 作成の成否はトーストで通知される。失敗してもエラー応答にはせず、`id` が `null` になる。
pub async fn create_post(
    State(state): State<SharedState>,
    payload: Result<Json<NewPost>, JsonRejection>,
) -> Result<(StatusCode, Json<PublishResponse>), AppError> {
    let Json(new_post) = payload?;
    let id = state.publisher.publish(new_post).await;

    let status = if id.is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(PublishResponse { id })))
}

/// 表示中の投稿の画像をギャラリーへ保存する
pub async fn save_post(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let post = state
        .feed
        .view()
        .post(&id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Post {} is not displayed", id)))?;

    publisher::save_pictures(&post, state.gallery.as_ref(), &state.ui).await;
    Ok(StatusCode::NO_CONTENT)
}
