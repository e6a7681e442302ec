use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One immutable history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: OffsetDateTime,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>, timestamp: OffsetDateTime) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp,
        }
    }

    /// RFC 3339 rendering of the timestamp, empty when formatting fails.
    #[must_use]
    pub fn timestamp_label(&self) -> String {
        self.timestamp.format(&Rfc3339).unwrap_or_default()
    }
}

/// Hands out UTC timestamps that never go backwards within one session.
#[derive(Debug, Clone, Default)]
pub(crate) struct MessageClock {
    last: Option<OffsetDateTime>,
}

impl MessageClock {
    pub(crate) fn now(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let stamped = match self.last {
            Some(last) if last > now => last,
            _ => now,
        };
        self.last = Some(stamped);
        stamped
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn clock_never_moves_backwards() {
        let future = OffsetDateTime::now_utc() + time::Duration::hours(1);
        let mut clock = MessageClock { last: Some(future) };

        assert_eq!(clock.now(), future);
        assert!(clock.now() >= future);
    }

    #[test]
    fn timestamp_label_is_rfc3339() {
        let message = ChatMessage::new(Role::User, "hi", datetime!(2026-02-14 09:30:00 UTC));
        assert_eq!(message.timestamp_label(), "2026-02-14T09:30:00Z");
        assert_eq!(message.role.as_str(), "user");
    }
}
