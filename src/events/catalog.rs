//! Closed catalog of session events and their payloads.

use serde::{Deserialize, Serialize};

/// Every event the bus can carry. Adding a name here is a change to the
/// session layer, not to a UI component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionEvent {
    /// The session ended, by logout or by a rejected credential; clear
    /// user-visible state.
    SessionEnded,

    /// A session already exists; the dashboard should re-render.
    DashboardReloadRequested,

    /// Pointer entered an interactive element.
    CursorHover,

    /// Pointer left an interactive element.
    CursorUnhover,

    /// Player asked for a match against the AI.
    MatchVsAi,

    /// Player asked for a local two-player match.
    MatchLocal,

    MatchStarted,

    MatchQuit,

    ScoreUpdated,
}

impl SessionEvent {
    pub fn all() -> &'static [SessionEvent] {
        &[
            SessionEvent::SessionEnded,
            SessionEvent::DashboardReloadRequested,
            SessionEvent::CursorHover,
            SessionEvent::CursorUnhover,
            SessionEvent::MatchVsAi,
            SessionEvent::MatchLocal,
            SessionEvent::MatchStarted,
            SessionEvent::MatchQuit,
            SessionEvent::ScoreUpdated,
        ]
    }

    /// Stable wire name.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::SessionEnded => "session-ended",
            SessionEvent::DashboardReloadRequested => "dashboard-reload-requested",
            SessionEvent::CursorHover => "cursor-hover",
            SessionEvent::CursorUnhover => "cursor-unhover",
            SessionEvent::MatchVsAi => "match-vs-ai",
            SessionEvent::MatchLocal => "match-local",
            SessionEvent::MatchStarted => "match-started",
            SessionEvent::MatchQuit => "match-quit",
            SessionEvent::ScoreUpdated => "score-updated",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|e| e.name() == name)
    }
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a session ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEnded {
    pub reason: String,
}

/// Element under the pointer for hover events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorTarget {
    pub element: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    VsAi,
    Local,
    Remote,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStarted {
    pub player1_name: String,
    pub player2_name: String,
    pub match_type: MatchType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreUpdated {
    pub player1_name: String,
    pub player2_name: String,
    pub player1_score: u32,
    pub player2_score: u32,
}
