//! Wire types for the friends and game services.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Cache key for the friends list.
pub const FRIENDS_KEY: &str = "friends";
/// Cache key for the match history.
pub const MATCHES_KEY: &str = "matches";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Online,
    #[default]
    Offline,
}

/// Relationship between the current user and a listed user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendStatus {
    Friends,
    /// We sent the request; they have not answered.
    Pending,
    /// They sent the request; we have not answered.
    Waiting,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub username: String,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub online: Presence,
    pub status: FriendStatus,
}

impl Friend {
    /// Online and an accepted friend; pending requests never show presence.
    pub fn is_visible_online(&self) -> bool {
        self.online == Presence::Online && self.status == FriendStatus::Friends
    }
}

/// One finished match. Fields the client does not know about are kept in
/// `extra` so they survive a round-trip through the cache.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(default)]
    pub player1: Option<String>,
    #[serde(default)]
    pub player2: Option<String>,
    #[serde(default)]
    pub player1_score: Option<u32>,
    #[serde(default)]
    pub player2_score: Option<u32>,
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl MatchRecord {
    /// `date` parsed as RFC 3339, if present and well-formed.
    pub fn played_at(&self) -> Option<DateTime<FixedOffset>> {
        self.date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
    }

    pub fn won_by(&self, username: &str) -> bool {
        self.winner.as_deref() == Some(username)
    }
}

/// Value stored in the session cache.
#[derive(Clone, Debug, PartialEq)]
pub enum SharedState {
    Friends(Vec<Friend>),
    MatchHistory(Vec<MatchRecord>),
}

impl SharedState {
    pub fn into_friends(self) -> Option<Vec<Friend>> {
        match self {
            Self::Friends(friends) => Some(friends),
            _ => None,
        }
    }

    pub fn into_match_history(self) -> Option<Vec<MatchRecord>> {
        match self {
            Self::MatchHistory(matches) => Some(matches),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_friend_wire_format() {
        let friend: Friend = serde_json::from_value(json!({
            "username": "bob",
            "profilePicture": "https://img/bob.png",
            "online": "online",
            "status": "waiting"
        }))
        .unwrap();
        assert_eq!(friend.profile_picture.as_deref(), Some("https://img/bob.png"));
        assert_eq!(friend.status, FriendStatus::Waiting);
        assert!(!friend.is_visible_online());

        let friend: Friend =
            serde_json::from_value(json!({"username": "eve", "status": "friends"})).unwrap();
        assert_eq!(friend.online, Presence::Offline);
    }

    #[test]
    fn test_match_record_keeps_unknown_fields() {
        let record: MatchRecord = serde_json::from_value(json!({
            "player1": "alice",
            "player2": "bob",
            "player1_score": 5,
            "player2_score": 3,
            "winner": "alice",
            "date": "2024-11-02T18:30:00+00:00",
            "tournament": "fall cup"
        }))
        .unwrap();

        assert!(record.won_by("alice"));
        assert!(record.played_at().is_some());
        assert_eq!(record.extra["tournament"], "fall cup");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["tournament"], "fall cup");
    }

    #[test]
    fn test_bad_date_is_none() {
        let record = MatchRecord {
            date: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(record.played_at().is_none());
    }
}
