use crate::session::{Message, Role};
use chrono::Local;

#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Message(Message),
    /// Error or informational line shown inline; never part of history.
    Notice { text: String, is_error: bool },
}

/// What the chat pane shows, in display order.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    scroll_to_bottom: bool,
}

impl Transcript {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter().filter_map(|entry| match entry {
            Entry::Message(message) => Some(message),
            Entry::Notice { .. } => None,
        })
    }

    /// Appends a message and returns its index for later streaming updates.
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> usize {
        self.push(Entry::Message(Message::now(role, content)))
    }

    pub fn notice(&mut self, text: impl Into<String>) {
        self.push(Entry::Notice {
            text: text.into(),
            is_error: false,
        });
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(Entry::Notice {
            text: text.into(),
            is_error: true,
        });
    }

    pub fn replace(&mut self, history: Vec<Message>) {
        self.entries = history.into_iter().map(Entry::Message).collect();
        self.scroll_to_bottom = true;
    }

    /// Puts `history` in front of what is already shown. Returns how far the
    /// existing entries moved.
    pub fn prepend(&mut self, history: Vec<Message>) -> usize {
        let moved = history.len();
        self.entries
            .splice(0..0, history.into_iter().map(Entry::Message));
        self.scroll_to_bottom = true;
        moved
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Extends the message at `index` and refreshes its timestamp.
    /// Returns `false` if the entry is gone or is not a message.
    pub fn append_to(&mut self, index: usize, chunk: &str) -> bool {
        match self.entries.get_mut(index) {
            Some(Entry::Message(message)) => {
                message.content.push_str(chunk);
                message.timestamp = Some(Local::now());
                self.scroll_to_bottom = true;
                true
            }
            _ => false,
        }
    }

    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_bottom)
    }

    fn push(&mut self, entry: Entry) -> usize {
        self.entries.push(entry);
        self.scroll_to_bottom = true;
        self.entries.len() - 1
    }
}

/// Splits content into the visual lines a label renders. Content is always
/// plain text; only newlines carry meaning.
pub fn display_lines(content: &str) -> Vec<&str> {
    content.split('\n').map(|line| line.trim_end_matches('\r')).collect()
}

#[cfg(test)]
mod tests {
    use super::{display_lines, Entry, Transcript};
    use crate::session::{Message, Role};

    #[test]
    fn append_scrolls_to_newest_entry() {
        let mut transcript = Transcript::default();
        let index = transcript.append(Role::User, "Hello");
        assert_eq!(index, 0);
        assert!(transcript.take_scroll_request());
        assert!(!transcript.take_scroll_request());
    }

    #[test]
    fn replace_drops_notices_and_previous_messages() {
        let mut transcript = Transcript::default();
        transcript.append(Role::User, "old");
        transcript.error("boom");
        transcript.replace(vec![Message::now(Role::Assistant, "fresh")]);
        assert_eq!(transcript.entries().len(), 1);
        assert_eq!(transcript.messages().next().map(|m| m.content.as_str()), Some("fresh"));
    }

    #[test]
    fn append_to_refuses_notices() {
        let mut transcript = Transcript::default();
        transcript.notice("Reconnecting...");
        assert!(!transcript.append_to(0, "chunk"));
        assert!(!transcript.append_to(7, "chunk"));
        assert!(matches!(transcript.entries()[0], Entry::Notice { .. }));
    }

    #[test]
    fn prepend_keeps_live_entries_after_history() {
        let mut transcript = Transcript::default();
        transcript.append(Role::User, "live");
        transcript.take_scroll_request();

        let moved = transcript.prepend(vec![
            Message::now(Role::User, "old question"),
            Message::now(Role::Assistant, "old answer"),
        ]);
        assert_eq!(moved, 2);
        let contents: Vec<&str> = transcript.messages().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["old question", "old answer", "live"]);
        assert!(transcript.take_scroll_request());
    }

    #[test]
    fn markup_is_left_alone() {
        assert_eq!(display_lines("<b>hi</b>\r\nthere"), vec!["<b>hi</b>", "there"]);
    }
}
