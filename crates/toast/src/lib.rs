//! 画面下部に積まれる通知（トースト）のキュー
//!
//! - 追加順に表示される（FIFO）
//! - 削除は ID 指定のみ。自動で消えることはない
//! - ID の一意性は呼び出し側の責任（通常は UUID v4）

use serde::Serialize;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    #[default]
    Plain,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToastMessage {
    pub id: String,
    pub content: String,
    pub kind: ToastKind,
}

impl ToastMessage {
    pub fn new(id: impl Into<String>, content: impl Into<String>, kind: ToastKind) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            kind,
        }
    }

    pub fn plain(content: impl Into<String>) -> Self {
        Self::new(new_id(), content, ToastKind::Plain)
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self::new(new_id(), content, ToastKind::Success)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(new_id(), content, ToastKind::Error)
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Default)]
pub struct ToastQueue {
    messages: Vec<ToastMessage>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, message: ToastMessage) {
        tracing::debug!("toast added: {} ({:?})", message.id, message.kind);
        self.messages.push(message);
    }

    /// 最初に一致した ID のメッセージを取り除く。見つからなければ何もしない
    pub fn remove(&mut self, id: &str) {
        if let Some(pos) = self.messages.iter().position(|m| m.id == id) {
            self.messages.remove(pos);
            tracing::debug!("toast removed: {}", id);
        }
    }

    pub fn messages(&self) -> &[ToastMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// 処理結果をトーストとして利用者に伝える口
pub trait Notify: Send + Sync {
    fn notify(&self, message: ToastMessage);
}

impl<T: Notify + ?Sized> Notify for Arc<T> {
    fn notify(&self, message: ToastMessage) {
        (**self).notify(message)
    }
}

impl Notify for Mutex<ToastQueue> {
    fn notify(&self, message: ToastMessage) {
        match self.lock() {
            Ok(mut queue) => queue.add(message),
            Err(_) => tracing::error!("Toast queue lock poisoned, dropping {}", message.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str) -> ToastMessage {
        ToastMessage::new(id, format!("message {}", id), ToastKind::Plain)
    }

    /// 追加順に並ぶか検証
    #[test]
    fn test_add_keeps_fifo_order() {
        let mut queue = ToastQueue::new();
        queue.add(message("1"));
        queue.add(message("2"));
        queue.add(message("3"));

        let ids: Vec<&str> = queue.messages().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    /// add 直後に remove すると元の状態に戻るか検証
    #[test]
    fn test_add_then_remove_restores_queue() {
        let mut queue = ToastQueue::new();
        queue.add(message("1"));
        queue.add(message("2"));
        let before = queue.messages().to_vec();

        let m = ToastMessage::success("Add new post successfully");
        let id = m.id.clone();
        queue.add(m);
        queue.remove(&id);

        assert_eq!(queue.messages(), before.as_slice());
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut queue = ToastQueue::new();
        queue.add(message("1"));
        queue.remove("missing");
        assert_eq!(queue.len(), 1);

        let mut empty = ToastQueue::new();
        empty.remove("missing");
        assert!(empty.is_empty());
    }

    /// 重複 ID の場合は先頭のものだけが消える
    #[test]
    fn test_remove_duplicate_id_removes_first_only() {
        let mut queue = ToastQueue::new();
        queue.add(ToastMessage::new("dup", "first", ToastKind::Plain));
        queue.add(ToastMessage::new("dup", "second", ToastKind::Error));

        queue.remove("dup");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.messages()[0].content, "second");
    }

    #[test]
    fn test_constructors_generate_unique_ids() {
        let a = ToastMessage::error("Post failed");
        let b = ToastMessage::error("Post failed");
        assert_ne!(a.id, b.id);
        assert_eq!(a.kind, ToastKind::Error);
        assert_eq!(ToastMessage::plain("Saving...").kind, ToastKind::Plain);
    }

    #[test]
    fn test_notify_through_shared_queue() {
        let queue = Arc::new(Mutex::new(ToastQueue::new()));
        let notifier: Arc<dyn Notify> = queue.clone();
        notifier.notify(ToastMessage::success("ok"));

        assert_eq!(queue.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_value(ToastMessage::new("1", "hi", ToastKind::Success)).unwrap();
        assert_eq!(json["kind"], "success");
    }
}
