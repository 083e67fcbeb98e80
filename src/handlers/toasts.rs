use crate::state::SharedState;
use crate::ui::UiAction;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use toast::ToastMessage;

pub async fn get_toasts(State(state): State<SharedState>) -> Json<Vec<ToastMessage>> {
    Json(state.ui.toasts())
}

/// 存在しない ID でも 204 を返す
pub async fn delete_toast(State(state): State<SharedState>, Path(id): Path<String>) -> StatusCode {
    state.ui.dispatch(UiAction::RemoveToast(id));
    StatusCode::NO_CONTENT
}
