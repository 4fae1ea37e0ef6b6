//! Presence records kept by the background tracker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Number of transitions retained per record.
pub const TRANSITION_HISTORY: usize = 16;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    #[default]
    Unknown,
    Present,
    Missing,
    Error,
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Present => write!(f, "present"),
            Self::Missing => write!(f, "missing"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl PresenceStatus {
    /// Whether a record may move from `self` to `next`.
    ///
    /// `unknown` may become anything; `present` may become `missing` or
    /// `error` and back. `missing` and `error` never move to each other.
    pub fn can_transition_to(self, next: PresenceStatus) -> bool {
        match (self, next) {
            (from, to) if from == to => true,
            (Self::Unknown, _) => true,
            (Self::Present, Self::Missing | Self::Error) => true,
            (Self::Missing | Self::Error, Self::Present) => true,
            _ => false,
        }
    }
}

/// What one refresh saw for a single skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum PresenceObservation {
    Present,
    Missing,
    Error(String),
}

impl PresenceObservation {
    pub fn status(&self) -> PresenceStatus {
        match self {
            Self::Present => PresenceStatus::Present,
            Self::Missing => PresenceStatus::Missing,
            Self::Error(_) => PresenceStatus::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceTransition {
    pub from: PresenceStatus,
    pub to: PresenceStatus,
    pub at: DateTime<Utc>,
}

/// Existence status of one skill definition over time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub status: PresenceStatus,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub missing_since: Option<DateTime<Utc>>,
    pub last_check_error: Option<String>,
    pub transitions: VecDeque<PresenceTransition>,
}

impl PresenceRecord {
    /// Fold one observation into the record.
    ///
    /// `missing_since` is stamped on the first observation of `missing` and
    /// kept until the skill is seen again. A transition is appended only
    /// when the status changes.
    ///
    /// Returns `false` when the observation would take a disallowed edge
    /// (`missing` to `error` or back). The check time and error message are
    /// still recorded but the status stays put.
    pub fn observe(&mut self, observation: &PresenceObservation, at: DateTime<Utc>) -> bool {
        let next = observation.status();
        self.last_checked_at = Some(at);

        if !self.status.can_transition_to(next) {
            if let PresenceObservation::Error(message) = observation {
                self.last_check_error = Some(message.clone());
            }
            return false;
        }

        match observation {
            PresenceObservation::Present => {
                self.last_seen_at = Some(at);
                self.missing_since = None;
                self.last_check_error = None;
            }
            PresenceObservation::Missing => {
                self.missing_since.get_or_insert(at);
            }
            PresenceObservation::Error(message) => {
                self.last_check_error = Some(message.clone());
            }
        }

        if next != self.status {
            self.transitions.push_back(PresenceTransition {
                from: self.status,
                to: next,
                at,
            });
            while self.transitions.len() > TRANSITION_HISTORY {
                self.transitions.pop_front();
            }
            self.status = next;
        }
        true
    }
}
