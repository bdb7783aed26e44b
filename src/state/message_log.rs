use crate::models::{Message, MessageId};

/// Client-held message sequence of the active conversation, oldest first.
///
/// Ids are unique: appends and prepends skip ids already present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn first(&self) -> Option<&Message> {
        self.messages.first()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.messages.iter().any(|m| m.id == id)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Appends `message`; returns `false` when its id is already present.
    pub fn push(&mut self, message: Message) -> bool {
        if self.contains(message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Replaces the whole sequence with a newest-first page.
    pub fn replace_with_page(&mut self, newest_first: Vec<Message>) {
        self.messages.clear();
        for message in newest_first.into_iter().rev() {
            self.push(message);
        }
    }

    /// Puts an older newest-first page in front of the current sequence.
    /// Returns the number of messages actually inserted.
    pub fn prepend_page(&mut self, newest_first: Vec<Message>) -> usize {
        let mut older: Vec<Message> = Vec::with_capacity(newest_first.len());
        for message in newest_first.into_iter().rev() {
            if !self.contains(message.id) && !older.iter().any(|m| m.id == message.id) {
                older.push(message);
            }
        }
        let inserted = older.len();
        older.append(&mut self.messages);
        self.messages = older;
        inserted
    }

    /// Replaces the content of message `id` in place. No-op when absent.
    pub fn edit(&mut self, id: MessageId, new_content: &str) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content = new_content.to_string();
                true
            }
            None => false,
        }
    }

    /// Removes message `id`. No-op when absent.
    pub fn remove(&mut self, id: MessageId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        self.messages.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;

    fn msg(id: MessageId, content: &str) -> Message {
        Message::new(id, User::default(), content)
    }

    fn ids(log: &MessageLog) -> Vec<MessageId> {
        log.as_slice().iter().map(|m| m.id).collect()
    }

    #[test]
    fn push_preserves_arrival_order_and_rejects_duplicates() {
        let mut log = MessageLog::new();
        for id in [3, 1, 2] {
            assert!(log.push(msg(id, "x")));
        }
        assert!(!log.push(msg(1, "again")));
        assert_eq!(ids(&log), vec![3, 1, 2]);
    }

    #[test]
    fn edit_and_remove_are_noops_for_unknown_ids() {
        let mut log = MessageLog::new();
        log.push(msg(1, "hi"));
        assert!(!log.edit(42, "nope"));
        assert!(!log.remove(42));
        assert_eq!(log.as_slice(), &[msg(1, "hi")]);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut log = MessageLog::new();
        log.push(msg(1, "a"));
        log.push(msg(2, "b"));
        assert!(log.remove(1));
        assert!(!log.remove(1));
        assert_eq!(ids(&log), vec![2]);
    }

    #[test]
    fn pages_are_reversed_into_ascending_order() {
        let mut log = MessageLog::new();
        log.replace_with_page(vec![msg(6, "f"), msg(5, "e"), msg(4, "d")]);
        assert_eq!(ids(&log), vec![4, 5, 6]);

        let inserted = log.prepend_page(vec![msg(4, "dup"), msg(3, "c"), msg(2, "b")]);
        assert_eq!(inserted, 2);
        assert_eq!(ids(&log), vec![2, 3, 4, 5, 6]);
        assert_eq!(log.as_slice()[2].content, "d");
    }
}
