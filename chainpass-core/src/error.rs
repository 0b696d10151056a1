//! Error types for the credential-chain reconciliation engine.

use thiserror::Error;

/// Result type alias for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Errors produced by the reconciliation engine.
///
/// Structural variants (`OnChainImmutable`, `MissingNextPointer`,
/// `IndexOutOfBounds`, `DanglingLink`, `MismatchedMarks`) indicate the caller
/// broke an algorithm contract and are never recoverable within the engine.
/// Data-quality failures on individual records are surfaced as
/// [`DecodedRecord::Invalid`](crate::record::DecodedRecord) sentinels by the
/// batch codec instead of an error; only the authoritative on-chain tail is
/// held to a fatal standard.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Asked to delete a record whose ciphertext is committed on-chain.
    /// Committed history is immutable.
    #[error("cannot delete on-chain record at index {index}")]
    OnChainImmutable {
        /// Position of the protected record.
        index: usize,
    },

    /// A merge input record carries no computed forward link, meaning the
    /// caller skipped the linking step.
    #[error("record at index {index} is missing its forward link")]
    MissingNextPointer {
        /// Position of the unlinked record.
        index: usize,
    },

    /// The last on-chain record failed to decrypt or validate. On-chain data
    /// is authoritative; its corruption is an unrecoverable precondition
    /// failure.
    #[error("invalid on-chain credential: {reason}")]
    InvalidOnChainTail {
        /// What went wrong while opening the tail.
        reason: String,
    },

    /// AEAD decryption failed (wrong key, tampered data, bad envelope).
    #[error("decryption failed: {context}")]
    DecryptionFailed {
        /// Context describing what was being decrypted.
        context: String,
    },

    /// AEAD encryption failed.
    #[error("encryption failed: {context}")]
    EncryptionFailed {
        /// Context describing what was being encrypted.
        context: String,
    },

    /// Decrypted plaintext did not decode into a record satisfying the link
    /// invariants.
    #[error("malformed record: {reason}")]
    MalformedRecord {
        /// Description of the violation.
        reason: String,
    },

    /// Plaintext encoding failed.
    #[error("serialization failed: {message}")]
    SerializationError {
        /// Error message from the encoder.
        message: String,
    },

    /// A record index points past the end of its array.
    #[error("record index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Length of the array it was applied to.
        len: usize,
    },

    /// A record references a predecessor that cannot be resolved in the
    /// merge inputs.
    #[error("record at index {index} references a predecessor outside the merge inputs")]
    DanglingLink {
        /// Position of the record with the unresolvable link.
        index: usize,
    },

    /// A deletion-mark slice does not line up with the record array.
    #[error("deletion marks length {marks} does not match record count {records}")]
    MismatchedMarks {
        /// Number of records.
        records: usize,
        /// Number of marks supplied.
        marks: usize,
    },
}

impl ChainError {
    /// Creates a decryption failure with context.
    pub fn decryption<S: Into<String>>(context: S) -> Self {
        Self::DecryptionFailed {
            context: context.into(),
        }
    }

    /// Creates an encryption failure with context.
    pub fn encryption<S: Into<String>>(context: S) -> Self {
        Self::EncryptionFailed {
            context: context.into(),
        }
    }

    /// Creates a malformed-record error.
    pub fn malformed<S: Into<String>>(reason: S) -> Self {
        Self::MalformedRecord {
            reason: reason.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Creates an invalid-tail error.
    pub fn invalid_tail<S: Into<String>>(reason: S) -> Self {
        Self::InvalidOnChainTail {
            reason: reason.into(),
        }
    }
}
