use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::JobId;

/// Key under which the reaction mapping is persisted.
pub const STORAGE_KEY: &str = "job-reactions";

/// A user's verdict on a job posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Like,
    Dislike,
}

impl Reaction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }
}

/// Which reacted jobs the reactions inbox shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionMode {
    #[default]
    All,
    Like,
    Dislike,
}

impl ReactionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }

    /// Returns `true` when a job with the given reaction belongs in this mode.
    pub fn admits(self, reaction: Option<Reaction>) -> bool {
        match (self, reaction) {
            (_, None) => false,
            (Self::All, Some(_)) => true,
            (Self::Like, Some(value)) => value == Reaction::Like,
            (Self::Dislike, Some(value)) => value == Reaction::Dislike,
        }
    }
}

impl FromStr for ReactionMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            other => Err(format!("unknown reaction mode '{other}'")),
        }
    }
}

/// Kind of mutation applied to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionAction {
    ToggleLike,
    ToggleDislike,
    Clear,
    ClearAll,
}

impl ReactionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToggleLike => "toggle_like",
            Self::ToggleDislike => "toggle_dislike",
            Self::Clear => "clear",
            Self::ClearAll => "clear_all",
        }
    }
}

/// Outcome of a single mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReactionChange {
    pub action: ReactionAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub previous: Option<Reaction>,
    pub current: Option<Reaction>,
    /// Number of entries removed by a bulk clear.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared: Option<usize>,
}

impl ReactionChange {
    /// Returns `false` when the mutation left the mapping untouched.
    pub fn changed(&self) -> bool {
        match self.action {
            ReactionAction::ClearAll => self.cleared.unwrap_or(0) > 0,
            _ => self.previous != self.current,
        }
    }
}

/// How the store came up at initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Nothing was stored.
    Empty,
    /// Stored value parsed; carries the number of entries.
    Restored(usize),
    /// Stored value was unreadable and has been discarded.
    Corrupt(String),
}

/// Errors produced while encoding or decoding the persisted mapping.
#[derive(Debug, Error)]
pub enum ReactionCodecError {
    #[error("malformed reaction mapping: {0}")]
    Json(#[from] serde_json::Error),
}

/// In-memory mapping from job id to reaction.
///
/// A job holds at most one reaction: the value is a single scalar, so setting
/// `like` replaces `dislike` and vice versa.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReactionStore {
    entries: BTreeMap<JobId, Reaction>,
}

impl ReactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: BTreeMap<JobId, Reaction>) -> Self {
        Self { entries }
    }

    /// Rebuilds the store from a persisted value. Absent or malformed values
    /// yield an empty store; the outcome tells the caller which case applied.
    pub fn restore(raw: Option<&str>) -> (Self, RestoreOutcome) {
        match raw {
            None => (Self::new(), RestoreOutcome::Empty),
            Some(text) => match decode(text) {
                Ok(entries) => {
                    let count = entries.len();
                    (Self::from_entries(entries), RestoreOutcome::Restored(count))
                }
                Err(err) => (Self::new(), RestoreOutcome::Corrupt(err.to_string())),
            },
        }
    }

    pub fn get(&self, job_id: &JobId) -> Option<Reaction> {
        self.entries.get(job_id).copied()
    }

    pub fn entries(&self) -> &BTreeMap<JobId, Reaction> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn toggle_like(&mut self, job_id: &JobId) -> ReactionChange {
        self.toggle(job_id, Reaction::Like, ReactionAction::ToggleLike)
    }

    pub fn toggle_dislike(&mut self, job_id: &JobId) -> ReactionChange {
        self.toggle(job_id, Reaction::Dislike, ReactionAction::ToggleDislike)
    }

    pub fn clear(&mut self, job_id: &JobId) -> ReactionChange {
        let previous = self.entries.remove(job_id);
        ReactionChange {
            action: ReactionAction::Clear,
            job_id: Some(job_id.clone()),
            previous,
            current: None,
            cleared: None,
        }
    }

    pub fn clear_all(&mut self) -> ReactionChange {
        let cleared = self.entries.len();
        self.entries.clear();
        ReactionChange {
            action: ReactionAction::ClearAll,
            job_id: None,
            previous: None,
            current: None,
            cleared: Some(cleared),
        }
    }

    /// Serializes the full mapping as a flat JSON object.
    pub fn to_json(&self) -> Result<String, ReactionCodecError> {
        encode(&self.entries)
    }

    fn toggle(&mut self, job_id: &JobId, target: Reaction, action: ReactionAction) -> ReactionChange {
        let previous = self.get(job_id);
        let current = if previous == Some(target) {
            self.entries.remove(job_id);
            None
        } else {
            self.entries.insert(job_id.clone(), target);
            Some(target)
        };
        ReactionChange {
            action,
            job_id: Some(job_id.clone()),
            previous,
            current,
            cleared: None,
        }
    }
}

/// Encodes a mapping as `{"<job id>": "like" | "dislike"}`.
pub fn encode(entries: &BTreeMap<JobId, Reaction>) -> Result<String, ReactionCodecError> {
    Ok(serde_json::to_string(entries)?)
}

/// Decodes a mapping produced by [`encode`].
pub fn decode(raw: &str) -> Result<BTreeMap<JobId, Reaction>, ReactionCodecError> {
    Ok(serde_json::from_str(raw)?)
}
