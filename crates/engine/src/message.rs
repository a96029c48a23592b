use std::time::{SystemTime, UNIX_EPOCH};

use super::ids::MessageId;

/// Chat speaker role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Model,
}

/// One transcript entry.
///
/// `id`, `role` and `created_at_unix_ms` are fixed at creation. `content` is
/// set once for user messages and grows monotonically for model messages
/// until the stream finishes; once `is_error` flips true the content is the
/// fixed error string and is never patched again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub created_at_unix_ms: u64,
    pub is_error: bool,
}

impl Message {
    /// Creates a completed user message.
    pub fn user(id: MessageId, content: impl Into<String>) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into(),
            created_at_unix_ms: now_unix_ms(),
            is_error: false,
        }
    }

    /// Creates the empty model placeholder that receives chunk patches.
    pub fn model_placeholder(id: MessageId) -> Self {
        Self {
            id,
            role: Role::Model,
            content: String::new(),
            created_at_unix_ms: now_unix_ms(),
            is_error: false,
        }
    }
}

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
