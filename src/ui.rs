//! 画面全体で共有する状態（ユーザー一覧とトースト）
//!
//! 状態の変更は `UiAction` を `dispatch` することでのみ行う。

use diary_core::UserProfile;
use std::sync::{Arc, RwLock};
use toast::{Notify, ToastMessage, ToastQueue};

#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub users: Vec<UserProfile>,
    pub toasts: ToastQueue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    SetUsers(Vec<UserProfile>),
    AddToast(ToastMessage),
    RemoveToast(String),
}

impl UiState {
    pub fn apply(&mut self, action: UiAction) {
        match action {
            UiAction::SetUsers(users) => self.users = users,
            UiAction::AddToast(message) => self.toasts.add(message),
            UiAction::RemoveToast(id) => self.toasts.remove(&id),
        }
    }
}

/// `UiState` の共有ハンドル
#[derive(Debug, Clone, Default)]
pub struct UiStore {
    state: Arc<RwLock<UiState>>,
}

impl UiStore {
    pub fn new(users: Vec<UserProfile>) -> Self {
        let store = Self::default();
        store.dispatch(UiAction::SetUsers(users));
        store
    }

    pub fn dispatch(&self, action: UiAction) {
        match self.state.write() {
            Ok(mut state) => state.apply(action),
            Err(_) => tracing::error!("UI state lock poisoned, dropping {:?}", action),
        }
    }

    pub fn users(&self) -> Vec<UserProfile> {
        self.state
            .read()
            .map(|state| state.users.clone())
            .unwrap_or_default()
    }

    pub fn toasts(&self) -> Vec<ToastMessage> {
        self.state
            .read()
            .map(|state| state.toasts.messages().to_vec())
            .unwrap_or_default()
    }
}

impl Notify for UiStore {
    fn notify(&self, message: ToastMessage) {
        self.dispatch(UiAction::AddToast(message));
    }
}
