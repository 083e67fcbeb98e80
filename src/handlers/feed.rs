use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use diary_core::Comment;
use feed::FeedView;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollEvent {
    /// 慣性スクロールの開始
    Begin,
    /// 一覧の末尾に到達した
    EndReached,
}

#[derive(Debug, Deserialize)]
pub struct ScrollRequest {
    pub event: ScrollEvent,
}

pub async fn get_feed(State(state): State<SharedState>) -> Json<FeedView> {
    Json(state.feed.view())
}

/// 検索クエリを変更する。一覧への反映はデバウンス後
pub async fn put_query(
    State(state): State<SharedState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(payload) = payload?;
    state.feed.set_query(payload.query).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn post_scroll(
    State(state): State<SharedState>,
    payload: Result<Json<ScrollRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(payload) = payload?;
    match payload.event {
        ScrollEvent::Begin => state.feed.begin_gesture().await?,
        ScrollEvent::EndReached => state.feed.end_reached().await?,
    }
    Ok(StatusCode::ACCEPTED)
}

/// 表示中の投稿のコメントを古い順で返す
pub async fn get_comments(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Comment>>, AppError> {
    state
        .feed
        .view()
        .sorted_comments(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Post {} is not displayed", id)))
}
