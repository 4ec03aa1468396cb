//! On-screen messages announcing loading state and scene changes.

use std::time::{Duration, Instant};

/// How a message behaves once shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageOptions {
    /// Stays until hidden explicitly.
    pub persistent: bool,
    /// Lifetime of a non-persistent message. `None` behaves like persistent.
    pub duration: Option<Duration>,
    /// The user may dismiss it.
    pub closable: bool,
}

impl MessageOptions {
    pub fn timed(duration: Duration) -> Self {
        Self {
            persistent: false,
            duration: Some(duration),
            closable: false,
        }
    }

    pub fn persistent() -> Self {
        Self {
            persistent: true,
            duration: None,
            closable: false,
        }
    }

    pub fn closable(mut self) -> Self {
        self.closable = true;
        self
    }
}

pub trait MessageSink {
    /// Shows `content` under `id`, replacing any message with the same id.
    fn show_message(&mut self, id: &str, content: &str, options: MessageOptions);
    fn hide_message(&mut self, id: &str);
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub options: MessageOptions,
    shown_at: Instant,
}

impl Message {
    fn expired(&self, now: Instant) -> bool {
        match (self.options.persistent, self.options.duration) {
            (false, Some(duration)) => now.saturating_duration_since(self.shown_at) >= duration,
            _ => false,
        }
    }
}

/// Message list with timed expiry.
///
/// Time only moves when [`tick`](Self::tick) is called; messages shown in
/// between are stamped with the last tick.
#[derive(Clone, Debug)]
pub struct MessageBoard {
    messages: Vec<Message>,
    now: Instant,
}

impl MessageBoard {
    pub fn new(now: Instant) -> Self {
        Self {
            messages: Vec::new(),
            now,
        }
    }

    /// Advances the board clock and drops expired messages.
    pub fn tick(&mut self, now: Instant) {
        self.now = now;
        self.messages.retain(|m| !m.expired(now));
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Most recently shown message still on screen.
    pub fn latest(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Dismisses the newest closable message and returns its id.
    pub fn close_latest(&mut self) -> Option<String> {
        let index = self.messages.iter().rposition(|m| m.options.closable)?;
        Some(self.messages.remove(index).id)
    }
}

impl MessageSink for MessageBoard {
    fn show_message(&mut self, id: &str, content: &str, options: MessageOptions) {
        self.messages.retain(|m| m.id != id);
        self.messages.push(Message {
            id: id.to_string(),
            content: content.to_string(),
            options,
            shown_at: self.now,
        });
    }

    fn hide_message(&mut self, id: &str) {
        self.messages.retain(|m| m.id != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_messages_expire() {
        let start = Instant::now();
        let mut board = MessageBoard::new(start);
        board.show_message("info", "hello", MessageOptions::timed(Duration::from_millis(1500)));
        board.show_message("pinned", "stay", MessageOptions::persistent());

        board.tick(start + Duration::from_millis(1499));
        assert!(board.is_visible("info"));
        board.tick(start + Duration::from_millis(1500));
        assert!(!board.is_visible("info"));
        assert!(board.is_visible("pinned"));
    }

    #[test]
    fn showing_same_id_replaces_content() {
        let mut board = MessageBoard::new(Instant::now());
        board.show_message("ctx", "Viewing Stand 1", MessageOptions::persistent());
        board.show_message("ctx", "Viewing Stand 2", MessageOptions::persistent());
        assert_eq!(board.len(), 1);
        assert_eq!(board.latest().map(|m| m.content.as_str()), Some("Viewing Stand 2"));
    }

    #[test]
    fn only_closable_messages_can_be_closed() {
        let mut board = MessageBoard::new(Instant::now());
        board.show_message("ctx", "Viewing Stand 1", MessageOptions::persistent().closable());
        board.show_message("loading", "Loading", MessageOptions::persistent());
        assert_eq!(board.close_latest().as_deref(), Some("ctx"));
        assert_eq!(board.close_latest(), None);
        assert!(board.is_visible("loading"));
    }
}
