//! Commit identities
//!
//! Every committed transaction receives a commit identity. Identities are
//! strictly increasing and never reused; an aborted transaction consumes no
//! identity. Events carry the identity of the commit that produced them.

use serde::{Deserialize, Serialize};

/// A totally ordered commit identity.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct CommitId(u64);

impl CommitId {
    /// Identity observed before any commit
    pub const ZERO: CommitId = CommitId(0);

    #[inline]
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Assigns commit identities.
///
/// Not internally synchronized: the owning store mutates it only while
/// holding its writer lock.
#[derive(Debug, Clone, Default)]
pub struct CommitAuthority {
    highest_commit_id: u64,
}

impl CommitAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    /// The identity the next commit will receive
    pub fn next_commit_id(&self) -> CommitId {
        CommitId::new(self.highest_commit_id + 1)
    }

    /// Assign and record the next identity
    pub fn assign(&mut self) -> CommitId {
        let id = self.next_commit_id();
        self.highest_commit_id = id.value();
        id
    }

    /// Highest identity assigned so far, `CommitId::ZERO` if none
    pub fn highest(&self) -> CommitId {
        CommitId::new(self.highest_commit_id)
    }
}
