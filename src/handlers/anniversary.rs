use crate::state::SharedState;
use anniversary::ElapsedParts;
use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use diary_core::UserProfile;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AnniversaryResponse {
    pub since: DateTime<Utc>,
    pub elapsed: ElapsedParts,
    pub labels: Vec<(u32, String)>,
    /// 閲覧者本人。組み合わせが決まらなければ `null`
    pub me: Option<UserProfile>,
    pub partner: Option<UserProfile>,
}

pub async fn get_anniversary(State(state): State<SharedState>) -> Json<AnniversaryResponse> {
    let elapsed = anniversary::elapsed(state.love_begin, Utc::now());

    let users = state.ui.users();
    let viewer = state.identity.current_viewer();
    let (me, partner) = match anniversary::find_couple(&users, viewer.as_ref()) {
        Some((me, partner)) => (Some(me.clone()), Some(partner.clone())),
        None => (None, None),
    };

    Json(AnniversaryResponse {
        since: state.love_begin,
        elapsed,
        labels: elapsed.labeled(),
        me,
        partner,
    })
}
