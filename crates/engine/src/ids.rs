use std::fmt;

use uuid::Uuid;

/// Stable identifier for one message, assigned at creation.
///
/// UUID v7 keeps identifiers collision-resistant and roughly time-ordered,
/// so the session controller can mint them freely without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub Uuid);

impl MessageId {
    /// Wraps an existing UUID as a typed message identifier.
    pub fn new(raw: Uuid) -> Self {
        Self(raw)
    }

    /// Mints a fresh v7 identifier.
    pub fn new_v7() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl From<Uuid> for MessageId {
    fn from(value: Uuid) -> Self {
        Self::new(value)
    }
}
