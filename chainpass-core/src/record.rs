//! Core record model for credential edit histories.
//!
//! A user's credential set is a flat array of records. Each record points at
//! the record it supersedes through `prev`, forming per-credential chains
//! back to a root. The array is the unit of storage and merge; chains are
//! implicit in the links, never materialized as their own structure.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ChainError, ChainResult};

/// An arena index linking one record to another within the same array.
///
/// Records are encrypted and persisted individually, and must survive
/// reconstruction in arbitrary order, so links are stored as plain integers
/// rather than references. `-1` is the "no link" sentinel on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Link(i64);

impl Link {
    /// The absent link (`-1` on the wire). A record whose `prev` is `NONE`
    /// starts a new chain.
    pub const NONE: Self = Self(-1);

    /// Creates a link pointing at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit in an `i64`, which cannot happen for a
    /// real array position.
    #[must_use]
    pub fn at(index: usize) -> Self {
        Self(i64::try_from(index).expect("array index fits in i64"))
    }

    /// Returns the target position, or `None` for the sentinel.
    #[must_use]
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    /// Whether this is the absent-link sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 < 0
    }

    /// The raw wire value.
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }
}

impl Default for Link {
    fn default() -> Self {
        Self::NONE
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Variant payload of a credential entry.
///
/// The discriminant travels as a `type` field next to the base fields, so a
/// serialized record is a single flat map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryPayload {
    /// A password being created or updated for a site.
    PasswordAddition {
        /// Site the password belongs to.
        url: String,
        /// Login name.
        username: String,
        /// The password itself.
        password: String,
        /// Free-form note.
        description: String,
    },
    /// Tombstone ending a password chain.
    PasswordDeletion {
        /// Site whose password was removed.
        url: String,
    },
    /// A stored asymmetric keypair.
    Keypair {
        /// Public half, encoded by the caller.
        public_key: String,
        /// Private half, encoded by the caller.
        private_key: String,
    },
    /// One share of a secret split across trustees.
    SecretShare {
        /// The share material.
        share: String,
        /// Who this share is held for. Keeps its `for` wire name.
        #[serde(rename = "for")]
        recipient: String,
        /// Title of the secret the share belongs to.
        secret_title: String,
        /// Free-form note.
        additional_info: String,
    },
}

impl EntryPayload {
    /// URL of the site this entry concerns, for password-type entries.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::PasswordAddition { url, .. } | Self::PasswordDeletion { url } => Some(url),
            Self::Keypair { .. } | Self::SecretShare { .. } => None,
        }
    }

    /// Whether this is a password-type entry (addition or tombstone).
    #[must_use]
    pub const fn is_password(&self) -> bool {
        matches!(
            self,
            Self::PasswordAddition { .. } | Self::PasswordDeletion { .. }
        )
    }

    /// Whether this entry terminates its chain.
    #[must_use]
    pub const fn is_tombstone(&self) -> bool {
        matches!(self, Self::PasswordDeletion { .. })
    }
}

/// An encrypted record envelope, the shape exchanged with storage and chain
/// backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedBlob {
    /// Base64-encoded AES-GCM nonce.
    pub iv: String,
    /// Base64-encoded ciphertext, including the auth tag.
    pub ciphertext: String,
    /// Whether this ciphertext has been committed to a chain ledger.
    /// Committed envelopes are immutable and pass through merges verbatim.
    #[serde(rename = "onChain", default)]
    pub on_chain: bool,
}

/// One entry in a credential edit history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Globally unique identifier, stable across renumbering.
    pub id: Uuid,
    /// When this edit was made. Total order within a chain; used for merge
    /// conflict resolution.
    pub timestamp: DateTime<Utc>,
    /// Position of the record this one supersedes, or [`Link::NONE`] for a
    /// chain root. Invariant: strictly less than `curr`.
    pub prev: Link,
    /// This record's own position in its containing array.
    pub curr: usize,
    /// Derived forward pointer, populated by
    /// [`link_forward`](crate::chain::link_forward). Never persisted.
    #[serde(skip)]
    pub next: Option<Link>,
    /// Variant payload.
    #[serde(flatten)]
    pub entry: EntryPayload,
    /// The sealed envelope this record was opened from, if any. Records
    /// created locally have none until sealed.
    #[serde(skip)]
    pub sealed: Option<SealedBlob>,
}

impl CredentialRecord {
    /// Creates a fresh local record with a new random id.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, prev: Link, curr: usize, entry: EntryPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            prev,
            curr,
            next: None,
            entry,
            sealed: None,
        }
    }

    /// Whether this record's ciphertext is committed to a chain ledger.
    #[must_use]
    pub fn on_chain(&self) -> bool {
        self.sealed.as_ref().is_some_and(|blob| blob.on_chain)
    }

    /// Whether this record starts a new chain.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.prev.is_none()
    }

    /// Validates the numeric link invariants: `prev >= -1` and
    /// `curr > prev`. These are load-bearing for every chain algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::MalformedRecord`] on violation.
    pub fn check_links(&self) -> ChainResult<()> {
        if self.prev.raw() < -1 {
            return Err(ChainError::malformed(format!(
                "prev {} is below the -1 sentinel",
                self.prev
            )));
        }
        let curr = i64::try_from(self.curr)
            .map_err(|_| ChainError::malformed("curr does not fit in i64"))?;
        if curr <= self.prev.raw() {
            return Err(ChainError::malformed(format!(
                "curr {curr} must exceed prev {}",
                self.prev
            )));
        }
        Ok(())
    }
}

/// Sentinel for a sealed record that failed to open or validate.
///
/// Carries the raw envelope so nothing is lost; it never participates in
/// chain algorithms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRecord {
    /// The envelope that could not be opened.
    pub sealed: SealedBlob,
    /// Why it was rejected.
    pub reason: String,
}

/// Outcome of opening one sealed record in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedRecord {
    /// The record decrypted and validated.
    Valid(CredentialRecord),
    /// The record could not be opened; the raw envelope is preserved.
    Invalid(InvalidRecord),
}

impl DecodedRecord {
    /// Whether this decoded to a usable record.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    /// The record, if it decoded.
    #[must_use]
    pub const fn valid(&self) -> Option<&CredentialRecord> {
        match self {
            Self::Valid(record) => Some(record),
            Self::Invalid(_) => None,
        }
    }

    /// Consumes self, returning the record if it decoded.
    #[must_use]
    pub fn into_valid(self) -> Option<CredentialRecord> {
        match self {
            Self::Valid(record) => Some(record),
            Self::Invalid(_) => None,
        }
    }
}
