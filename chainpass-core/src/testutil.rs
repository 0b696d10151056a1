//! Shared record builders for the chain, prune and merge tests.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::record::{CredentialRecord, EntryPayload, Link, SealedBlob};

/// Builds a timestamp `seconds` after the epoch.
pub fn ts(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).expect("valid timestamp")
}

/// Builds an off-chain password-addition record.
pub fn password(curr: usize, prev: Link, seconds: i64, url: &str) -> CredentialRecord {
    CredentialRecord {
        id: Uuid::new_v4(),
        timestamp: ts(seconds),
        prev,
        curr,
        next: None,
        entry: EntryPayload::PasswordAddition {
            url: url.to_owned(),
            username: format!("user-{curr}"),
            password: format!("correct horse {curr}"),
            description: String::new(),
        },
        sealed: None,
    }
}

/// Builds an off-chain password tombstone.
pub fn tombstone(curr: usize, prev: Link, seconds: i64, url: &str) -> CredentialRecord {
    CredentialRecord {
        id: Uuid::new_v4(),
        timestamp: ts(seconds),
        prev,
        curr,
        next: None,
        entry: EntryPayload::PasswordDeletion {
            url: url.to_owned(),
        },
        sealed: None,
    }
}

/// Builds an off-chain keypair record.
pub fn keypair(curr: usize, prev: Link, seconds: i64) -> CredentialRecord {
    CredentialRecord {
        id: Uuid::new_v4(),
        timestamp: ts(seconds),
        prev,
        curr,
        next: None,
        entry: EntryPayload::Keypair {
            public_key: format!("pk-{curr}"),
            private_key: format!("sk-{curr}"),
        },
        sealed: None,
    }
}

/// Builds an off-chain secret-share record.
pub fn secret_share(curr: usize, prev: Link, seconds: i64) -> CredentialRecord {
    CredentialRecord {
        id: Uuid::new_v4(),
        timestamp: ts(seconds),
        prev,
        curr,
        next: None,
        entry: EntryPayload::SecretShare {
            share: format!("share-{curr}"),
            recipient: "alice".to_owned(),
            secret_title: "master seed".to_owned(),
            additional_info: String::new(),
        },
        sealed: None,
    }
}

/// Marks a record as committed by attaching a ledger envelope.
///
/// The envelope contents are placeholders; the chain algorithms only look at
/// the `on_chain` flag.
pub fn committed(mut record: CredentialRecord) -> CredentialRecord {
    record.sealed = Some(SealedBlob {
        iv: "AAAAAAAAAAAAAAAA".to_owned(),
        ciphertext: "AAAA".to_owned(),
        on_chain: true,
    });
    record
}
