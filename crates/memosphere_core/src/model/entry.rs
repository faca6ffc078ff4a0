//! Entry aggregate.
//!
//! # Invariants
//! - `id` is unique across the store and never changes after creation.
//! - `date` is assigned once at creation and never rewritten.
//! - `feelings` and `activities` keep caller order; duplicates are stored
//!   as submitted.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque entry identifier. Generated ids are UUID v4 strings.
pub type EntryId = String;

/// Media kind of an entry.
///
/// Persisted and serialized as the literal names `TEXT`, `AUDIO`, `IMAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntryType {
    Text,
    Audio,
    Image,
}

impl EntryType {
    /// Storage literal for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Audio => "AUDIO",
            Self::Image => "IMAGE",
        }
    }

    /// Parses a storage literal. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "TEXT" => Some(Self::Text),
            "AUDIO" => Some(Self::Audio),
            "IMAGE" => Some(Self::Image),
            _ => None,
        }
    }
}

impl Display for EntryType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub kind: EntryType,
    pub content: String,
    pub title: String,
    /// Creation time in Unix epoch milliseconds.
    pub date: i64,
    #[serde(default)]
    pub feelings: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
}

impl Entry {
    /// Builds an entry from caller-editable fields plus its identity.
    pub fn from_draft(id: impl Into<EntryId>, date: i64, draft: EntryDraft) -> Self {
        Self {
            id: id.into(),
            kind: draft.kind,
            content: draft.content,
            title: draft.title,
            date,
            feelings: draft.feelings,
            activities: draft.activities,
        }
    }

    /// Returns a full replacement of this entry that keeps `id` and `date`.
    pub fn replaced_by(&self, draft: EntryDraft) -> Self {
        Self::from_draft(self.id.clone(), self.date, draft)
    }

    /// Checks invariants that must hold before persistence.
    pub fn validate(&self) -> Result<(), EntryValidationError> {
        if self.id.trim().is_empty() {
            return Err(EntryValidationError::BlankId);
        }
        Ok(())
    }
}

/// Caller-supplied entry payload for create and update.
///
/// Has no `date`: creation time is assigned by the service and updates
/// keep the original.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    /// Optional caller-chosen id. Only honored by create.
    #[serde(default)]
    pub id: Option<EntryId>,
    #[serde(rename = "type")]
    pub kind: EntryType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub feelings: Vec<String>,
    #[serde(default)]
    pub activities: Vec<String>,
}

impl EntryDraft {
    /// Creates a draft without tags or caller id.
    pub fn new(kind: EntryType, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            content: content.into(),
            title: title.into(),
            feelings: Vec::new(),
            activities: Vec::new(),
        }
    }

    pub fn with_id(self, id: impl Into<EntryId>) -> Self {
        Self {
            id: Some(id.into()),
            ..self
        }
    }

    pub fn with_feelings<I, S>(self, feelings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            feelings: feelings.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn with_activities<I, S>(self, activities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            activities: activities.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Returns the caller id when it is present and not blank.
    pub fn requested_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

impl From<Entry> for EntryDraft {
    fn from(entry: Entry) -> Self {
        Self {
            id: Some(entry.id),
            kind: entry.kind,
            content: entry.content,
            title: entry.title,
            feelings: entry.feelings,
            activities: entry.activities,
        }
    }
}

/// Entry invariant violation detected before a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryValidationError {
    BlankId,
}

impl Display for EntryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankId => write!(f, "entry id must not be blank"),
        }
    }
}

impl Error for EntryValidationError {}
