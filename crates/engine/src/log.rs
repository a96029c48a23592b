use snafu::ensure;

use super::error::{DuplicateIdSnafu, LogResult, NotFoundSnafu};
use super::ids::MessageId;
use super::message::Message;

/// Append-and-patch ordered store of messages.
///
/// Insertion order is display order and entries are never reordered.
/// Individual entries are never removed; the whole log is cleared only by an
/// explicit reset. The session controller is the sole writer.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a message at the end of the log.
    pub fn append(&mut self, message: Message) -> LogResult<()> {
        ensure!(
            self.find(message.id).is_none(),
            DuplicateIdSnafu {
                stage: "append",
                id: message.id,
            }
        );

        self.messages.push(message);
        Ok(())
    }

    /// Replaces the content of the message with `id`, leaving every other
    /// field and every sibling entry untouched.
    pub fn patch_content(&mut self, id: MessageId, new_content: impl Into<String>) -> LogResult<()> {
        let message = self.find_mut(id).ok_or_else(|| {
            NotFoundSnafu {
                stage: "patch-content",
                id,
            }
            .build()
        })?;

        message.content = new_content.into();
        Ok(())
    }

    /// Replaces the content of the message with `id` by `error_text` and
    /// flags it as errored.
    pub fn mark_error(&mut self, id: MessageId, error_text: impl Into<String>) -> LogResult<()> {
        let message = self.find_mut(id).ok_or_else(|| {
            NotFoundSnafu {
                stage: "mark-error",
                id,
            }
            .build()
        })?;

        message.content = error_text.into();
        message.is_error = true;
        Ok(())
    }

    /// Empties the log unconditionally. Used only by reset.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Returns the full ordered sequence for rendering.
    ///
    /// Cloning gives readers fully-replaced entity semantics: a snapshot is
    /// never mutated behind the reader's back.
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn find(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    fn find_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|message| message.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LogError;
    use crate::message::Role;

    #[test]
    fn append_rejects_duplicate_identifiers() {
        let mut log = MessageLog::new();
        let id = MessageId::new_v7();

        log.append(Message::user(id, "hello")).unwrap();
        let rejected = log.append(Message::model_placeholder(id));

        assert!(matches!(rejected, Err(LogError::DuplicateId { .. })));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn patch_replaces_content_and_leaves_siblings_untouched() {
        let mut log = MessageLog::new();
        let user_id = MessageId::new_v7();
        let reply_id = MessageId::new_v7();

        log.append(Message::user(user_id, "hello")).unwrap();
        log.append(Message::model_placeholder(reply_id)).unwrap();

        let user_before = log.snapshot()[0].clone();
        log.patch_content(reply_id, "Hi there!").unwrap();

        let transcript = log.snapshot();
        assert_eq!(transcript[0], user_before);
        assert_eq!(transcript[1].content, "Hi there!");
        assert_eq!(transcript[1].id, reply_id);
        assert_eq!(transcript[1].role, Role::Model);
        assert!(!transcript[1].is_error);
    }

    #[test]
    fn patch_and_mark_error_fail_on_unknown_identifiers() {
        let mut log = MessageLog::new();

        let patched = log.patch_content(MessageId::new_v7(), "text");
        let marked = log.mark_error(MessageId::new_v7(), "boom");

        assert!(matches!(patched, Err(LogError::NotFound { .. })));
        assert!(matches!(marked, Err(LogError::NotFound { .. })));
    }

    #[test]
    fn mark_error_replaces_partial_content() {
        let mut log = MessageLog::new();
        let reply_id = MessageId::new_v7();

        log.append(Message::model_placeholder(reply_id)).unwrap();
        log.patch_content(reply_id, "partial rep").unwrap();
        log.mark_error(reply_id, "something went wrong").unwrap();

        let transcript = log.snapshot();
        assert!(transcript[0].is_error);
        assert_eq!(transcript[0].content, "something went wrong");
    }

    #[test]
    fn clear_empties_the_log() {
        let mut log = MessageLog::new();
        log.append(Message::user(MessageId::new_v7(), "hello"))
            .unwrap();
        assert!(!log.is_empty());

        log.clear();

        assert!(log.is_empty());
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn snapshot_is_detached_from_later_mutations() {
        let mut log = MessageLog::new();
        let reply_id = MessageId::new_v7();
        log.append(Message::model_placeholder(reply_id)).unwrap();

        let before = log.snapshot();
        log.patch_content(reply_id, "updated").unwrap();

        assert_eq!(before[0].content, "");
        assert_eq!(log.snapshot()[0].content, "updated");
    }
}
