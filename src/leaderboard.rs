use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::store::{Standing, StoreError, TotalsStore, MAX_TOTAL};

/// What a commit does with a name that is not on the board yet
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UnknownParticipantPolicy {
    /// Create the participant with the committed seconds as its total
    #[default]
    Create,
    /// Refuse the commit and leave every total untouched
    Reject,
}

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("invalid payload")]
    InvalidPayload,
    #[error("unknown participant: {0}")]
    UnknownParticipant(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A validated commit request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub name: String,
    pub seconds: u64,
}

impl CommitRequest {
    /// Validate a decoded `{name, seconds}` body.
    ///
    /// `name` must be a non-empty string and `seconds` a finite, non-negative
    /// JSON number no larger than [`MAX_TOTAL`]. Fractional seconds are floored.
    pub fn from_json(body: &Value) -> Result<Self, CommitError> {
        let name = match body.get("name") {
            Some(Value::String(name)) if !name.is_empty() => name.clone(),
            _ => return Err(CommitError::InvalidPayload),
        };

        let seconds = match body.get("seconds") {
            Some(Value::Number(n)) => {
                if let Some(secs) = n.as_u64() {
                    secs
                } else {
                    match n.as_f64() {
                        Some(secs) if secs.is_finite() && secs >= 0.0 => secs.floor() as u64,
                        _ => return Err(CommitError::InvalidPayload),
                    }
                }
            }
            _ => return Err(CommitError::InvalidPayload),
        };
        if seconds > MAX_TOTAL {
            return Err(CommitError::InvalidPayload);
        }

        Ok(Self { name, seconds })
    }
}

/// Authoritative cumulative totals, served as sorted snapshots.
///
/// Concurrency safety comes from [`TotalsStore::atomic_increment`]; there is
/// no participant-level lock here.
pub struct LeaderboardStore {
    store: Box<dyn TotalsStore>,
    policy: UnknownParticipantPolicy,
}

impl LeaderboardStore {
    pub fn new(store: impl TotalsStore + 'static, policy: UnknownParticipantPolicy) -> Self {
        Self {
            store: Box::new(store),
            policy,
        }
    }

    pub fn policy(&self) -> UnknownParticipantPolicy {
        self.policy
    }

    /// Make sure every roster name exists, in roster order
    pub fn seed<S: AsRef<str>>(&self, roster: &[S]) -> Result<(), StoreError> {
        for name in roster {
            self.store.ensure(name.as_ref())?;
        }
        debug!(count = roster.len(), "seeded roster");
        Ok(())
    }

    /// All participants by total descending; equal totals keep creation order
    pub fn snapshot(&self) -> Result<Vec<Standing>, StoreError> {
        // sorted_by is stable, so creation order survives for ties
        Ok(self
            .store
            .list_all()?
            .into_iter()
            .sorted_by(|a, b| b.total.cmp(&a.total))
            .collect())
    }

    pub fn commit(&self, name: &str, seconds: u64) -> Result<Vec<Standing>, CommitError> {
        if name.is_empty() || seconds > MAX_TOTAL {
            return Err(CommitError::InvalidPayload);
        }

        if self.policy == UnknownParticipantPolicy::Reject && self.store.get(name)?.is_none() {
            return Err(CommitError::UnknownParticipant(name.to_string()));
        }

        let total = self.store.atomic_increment(name, seconds)?;
        info!(participant = name, seconds, total, "committed session");

        Ok(self.snapshot()?)
    }

    /// Validate a raw JSON body and commit it
    pub fn commit_json(&self, body: &Value) -> Result<Vec<Standing>, CommitError> {
        let request = CommitRequest::from_json(body)?;
        self.commit(&request.name, request.seconds)
    }

    /// Manual reset of every total
    pub fn reset(&self) -> Result<(), StoreError> {
        self.store.reset_all()?;
        info!("reset all totals");
        Ok(())
    }
}
