use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Platform user id (numeric, stable).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Platform group/channel id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub i64);

/// Message id within one group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub i32);

/// Operator of a front end (the person issuing commands).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OperatorId(pub i64);

/// Last-seen information as reported by the platform.
///
/// Only `Online` and `Offline` carry an exact timestamp; the coarse buckets mean
/// the user hides their exact activity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Presence {
    Online,
    Offline(DateTime<Utc>),
    Recently,
    LastWeek,
    LastMonth,
    #[default]
    Hidden,
}

impl Presence {
    /// Exact last-seen time, if the platform exposes one.
    pub fn last_seen(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Presence::Online => Some(now),
            Presence::Offline(at) => Some(*at),
            _ => None,
        }
    }
}

/// One discovered user, mapped from the platform's user record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    /// Public username without the leading `@`.
    pub handle: Option<String>,
    /// Explicit bot flag from the platform.
    pub bot: bool,
    pub presence: Presence,
    /// Admin/creator role in the source group. Never persisted.
    pub is_admin: bool,
}

impl Identity {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            handle: None,
            bot: false,
            presence: Presence::Hidden,
            is_admin: false,
        }
    }

    pub fn with_handle(mut self, handle: impl AsRef<str>) -> Self {
        self.handle = normalize_handle(handle.as_ref());
        self
    }

    pub fn with_presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    pub fn bot(mut self) -> Self {
        self.bot = true;
        self
    }

    /// Explicit bot flag, or a handle that reads like a bot (`...bot`, `Bot...`).
    pub fn is_bot(&self) -> bool {
        if self.bot {
            return true;
        }
        self.handle
            .as_deref()
            .map(|h| h.to_lowercase().contains("bot"))
            .unwrap_or(false)
    }
}

/// Dialog entry returned by the account listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    pub title: String,
    pub handle: Option<String>,
    /// Large-membership group ("megagroup"); only these are eligible for extraction.
    pub megagroup: bool,
}

/// Group as shown to operators: dense index over eligible groups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EligibleGroup {
    pub index: usize,
    pub title: String,
    pub handle: Option<String>,
}

/// One message from a group history page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: MessageId,
    /// `None` for service messages and anonymous/channel posts.
    pub sender: Option<UserId>,
}

/// Strip surrounding whitespace and leading `@`; empty input yields `None`.
pub fn normalize_handle(raw: &str) -> Option<String> {
    let h = raw.trim().trim_start_matches('@').trim();
    if h.is_empty() {
        None
    } else {
        Some(h.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_at_and_whitespace() {
        assert_eq!(normalize_handle(" @alice "), Some("alice".to_string()));
        assert_eq!(normalize_handle("bob"), Some("bob".to_string()));
        assert_eq!(normalize_handle("@"), None);
        assert_eq!(normalize_handle("   "), None);
    }

    #[test]
    fn bot_detection_uses_flag_or_handle() {
        assert!(Identity::new(UserId(1)).with_handle("HelperBot").is_bot());
        assert!(Identity::new(UserId(2)).with_handle("robotics_fan").is_bot());
        assert!(Identity::new(UserId(3)).bot().is_bot());
        assert!(!Identity::new(UserId(4)).with_handle("alice").is_bot());
        assert!(!Identity::new(UserId(5)).is_bot());
    }

    #[test]
    fn only_exact_presence_has_last_seen() {
        let now = Utc::now();
        assert_eq!(Presence::Online.last_seen(now), Some(now));
        assert_eq!(Presence::Offline(now).last_seen(now), Some(now));
        assert_eq!(Presence::Recently.last_seen(now), None);
        assert_eq!(Presence::Hidden.last_seen(now), None);
    }
}
