//! Entry use-case service.
//!
//! # Responsibility
//! - Assign ids and creation timestamps on create.
//! - Turn updates into full replacements that keep `id` and `date`.
//! - Route blank searches to the unfiltered listing.
//!
//! # Invariants
//! - Every read and write goes through the repository; nothing is cached.
//! - A caller-supplied date never reaches storage.
//! - Write events log ids and timings only, never entry text.

use crate::model::entry::{Entry, EntryDraft, EntryId};
use crate::repo::entry_repo::{EntryRepository, RepoError};
use log::{error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Source of creation timestamps in Unix epoch milliseconds.
pub type Clock = fn() -> i64;

/// Service error for entry use-cases.
#[derive(Debug)]
pub enum EntryServiceError {
    /// Target entry does not exist (update/delete).
    EntryNotFound(EntryId),
    /// Create was asked to reuse an id that is already stored.
    AlreadyExists(EntryId),
    /// Malformed pagination input.
    InvalidArgument(String),
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Write succeeded but the read-back disagrees.
    InconsistentState(&'static str),
}

impl Display for EntryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntryNotFound(id) => write!(f, "entry not found: {id}"),
            Self::AlreadyExists(id) => write!(f, "entry already exists: {id}"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent entry state: {details}"),
        }
    }
}

impl Error for EntryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EntryServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::EntryNotFound(id),
            RepoError::AlreadyExists(id) => Self::AlreadyExists(id),
            RepoError::InvalidArgument(message) => Self::InvalidArgument(message),
            other => Self::Repo(other),
        }
    }
}

/// One page of entries plus the totals a caller needs to render paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPage {
    /// Entries sorted by `date DESC, id ASC`.
    pub items: Vec<Entry>,
    pub page_number: u32,
    pub page_size: u32,
    /// Number of entries across all pages.
    pub total: u64,
}

/// Entry service facade over repository implementations.
pub struct EntryService<R: EntryRepository> {
    repo: R,
    clock: Clock,
}

impl<R: EntryRepository> EntryService<R> {
    /// Creates a service stamping entries with system time.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, system_clock_ms)
    }

    /// Creates a service with an explicit timestamp source.
    pub fn with_clock(repo: R, clock: Clock) -> Self {
        Self { repo, clock }
    }

    /// Creates one entry.
    ///
    /// # Contract
    /// - A missing or blank `draft.id` is replaced by a fresh UUID v4.
    /// - `date` is always the current clock value.
    /// - Reusing a stored id fails with `AlreadyExists`.
    pub fn create(&mut self, draft: EntryDraft) -> Result<Entry, EntryServiceError> {
        let started_at = Instant::now();
        let id = draft
            .requested_id()
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let result = self.create_with_id(id.as_str(), draft);
        log_write("entry_create", &id, started_at, &result);
        result
    }

    /// Gets one entry by id. A missing entry is `Ok(None)`.
    pub fn get(&self, id: &str) -> Result<Option<Entry>, EntryServiceError> {
        Ok(self.repo.find_by_id(id)?)
    }

    /// Searches entries; blank queries list everything.
    pub fn search(&self, query: &str) -> Result<Vec<Entry>, EntryServiceError> {
        if query.trim().is_empty() {
            return self.list_all();
        }
        Ok(self.repo.search(&query.to_lowercase())?)
    }

    /// Lists all entries, most recent first.
    pub fn list_all(&self) -> Result<Vec<Entry>, EntryServiceError> {
        Ok(self.repo.find_all()?)
    }

    /// Lists one 1-indexed page of entries.
    pub fn list_page(
        &self,
        page_number: u32,
        page_size: u32,
    ) -> Result<EntryPage, EntryServiceError> {
        let items = self.repo.find_page(page_number, page_size)?;
        let total = self.repo.count()?;
        Ok(EntryPage {
            items,
            page_number,
            page_size,
            total,
        })
    }

    /// Deletes one entry and its tags.
    pub fn delete(&mut self, id: &str) -> Result<(), EntryServiceError> {
        let started_at = Instant::now();
        let result = self.repo.delete_by_id(id).map_err(EntryServiceError::from);
        log_write("entry_delete", id, started_at, &result);
        result
    }

    /// Replaces every editable field of an existing entry.
    ///
    /// `id` and the original `date` are kept; type, title, content and both
    /// tag sets come from `draft` (no merge). `draft.id` is ignored.
    pub fn update(&mut self, id: &str, draft: EntryDraft) -> Result<Entry, EntryServiceError> {
        let started_at = Instant::now();
        let result = self.replace(id, draft);
        log_write("entry_update", id, started_at, &result);
        result
    }

    fn create_with_id(&mut self, id: &str, draft: EntryDraft) -> Result<Entry, EntryServiceError> {
        // The existence check lives in the same transaction as the write.
        let entry = Entry::from_draft(id, (self.clock)(), draft);
        let saved = self.repo.insert(&entry)?;
        if saved.date != entry.date {
            return Err(EntryServiceError::InconsistentState(
                "created entry read back with a different date",
            ));
        }
        Ok(saved)
    }

    fn replace(&mut self, id: &str, draft: EntryDraft) -> Result<Entry, EntryServiceError> {
        let existing = self
            .repo
            .find_by_id(id)?
            .ok_or_else(|| EntryServiceError::EntryNotFound(id.to_string()))?;
        let replacement = existing.replaced_by(draft);
        Ok(self.repo.save(&replacement)?)
    }
}

/// Current system time in Unix epoch milliseconds.
pub fn system_clock_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn log_write<T>(
    event: &str,
    entry_id: &str,
    started_at: Instant,
    result: &Result<T, EntryServiceError>,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!(
            "event={event} module=service status=ok entry_id={entry_id} duration_ms={duration_ms}"
        ),
        Err(err @ (EntryServiceError::EntryNotFound(_) | EntryServiceError::AlreadyExists(_))) => {
            warn!(
                "event={event} module=service status=rejected entry_id={entry_id} duration_ms={duration_ms} error={err}"
            )
        }
        Err(err) => error!(
            "event={event} module=service status=error entry_id={entry_id} duration_ms={duration_ms} error={err}"
        ),
    }
}
