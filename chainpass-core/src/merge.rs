//! Reconciliation of off-chain edit history against the on-chain ledger.
//!
//! The on-chain record list is authoritative and append-only. The local list
//! may contain edits made against stale positions (the chain moved on while
//! the device was offline), so every off-chain edit is re-anchored onto the
//! current tail of its chain during the merge.

use tracing::debug;

use crate::chain::link_forward;
use crate::crypto::{open_record, seal_record, EntryKey};
use crate::error::{ChainError, ChainResult};
use crate::prune::{delete_marked, mark_out_of_order};
use crate::record::{CredentialRecord, Link, SealedBlob};

/// Behavioral knobs for a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    strict_chronology: bool,
}

impl MergeOptions {
    /// Default options: keep every re-anchored edit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            strict_chronology: false,
        }
    }

    /// Prunes records that end up chronologically out of order within their
    /// chain after interleaving on-chain and off-chain edits.
    #[must_use]
    pub const fn with_strict_chronology(mut self) -> Self {
        self.strict_chronology = true;
        self
    }

    /// Whether out-of-order pruning runs after the merge.
    #[must_use]
    pub const fn strict_chronology(self) -> bool {
        self.strict_chronology
    }
}

/// Merges a local record list into the authoritative on-chain list.
///
/// The on-chain list is taken verbatim as the head of the result; its
/// records are never reordered, renumbered or removed. Local records that
/// merely duplicate the committed prefix are skipped. Every remaining
/// off-chain edit is appended in its original order and re-anchored: its
/// logical predecessor is resolved by id (the predecessor itself may have
/// moved during an earlier merge) and the chain is then followed forward to
/// its current tail, so several edits stacked onto one stale predecessor end
/// up in a line rather than a fork.
///
/// Both inputs must have been through [`link_forward`].
///
/// # Errors
///
/// - [`ChainError::MissingNextPointer`] if any input record lacks its
///   forward link.
/// - [`ChainError::DanglingLink`] if a local record's predecessor cannot be
///   resolved.
/// - Any error from pruning when strict chronology is requested.
pub fn merge_records(
    local: &[CredentialRecord],
    on_chain: &[CredentialRecord],
    options: MergeOptions,
) -> ChainResult<Vec<CredentialRecord>> {
    ensure_linked(local)?;
    ensure_linked(on_chain)?;

    let mut merged = on_chain.to_vec();
    let committed = local
        .iter()
        .take_while(|record| record.on_chain())
        .count();

    for record in &local[committed..] {
        let mut incoming = record.clone();
        let new_position = merged.len();

        if let Some(stale_prev) = incoming.prev.index() {
            let predecessor = local.get(stale_prev).ok_or(ChainError::DanglingLink {
                index: incoming.curr,
            })?;
            let mut anchor = merged
                .iter()
                .position(|candidate| candidate.id == predecessor.id)
                .ok_or(ChainError::DanglingLink {
                    index: incoming.curr,
                })?;
            // Follow the chain to its current tail in the merged array.
            while let Some(next) = merged[anchor]
                .next
                .and_then(Link::index)
                .filter(|&n| n < merged.len())
            {
                anchor = next;
            }
            incoming.prev = Link::at(merged[anchor].curr);
            merged[anchor].next = Some(Link::at(new_position));
        }

        incoming.curr = new_position;
        incoming.next = Some(Link::NONE);
        merged.push(incoming);
    }

    debug!(
        on_chain = on_chain.len(),
        appended = merged.len() - on_chain.len(),
        "merged credential histories"
    );

    if options.strict_chronology() {
        let marks = mark_out_of_order(&merged);
        merged = delete_marked(&merged, &marks)?;
        merged = link_forward(&merged);
    }

    Ok(merged)
}

/// Reconciles two sealed record lists and reseals the result.
///
/// Both lists are opened with `key`; every envelope must decrypt and
/// validate. Array positions are load-bearing inside a merge, so a silently
/// skipped record would corrupt every later link; partial-failure tolerance
/// belongs to the display path
/// ([`decode_batch`](crate::crypto::decode_batch)), not here. A failure on
/// the last on-chain record is reported as
/// [`ChainError::InvalidOnChainTail`].
///
/// Committed envelopes pass through byte-for-byte: their nonce/ciphertext
/// pairing already sits on a ledger and is never re-encrypted. Every other
/// record is resealed with a fresh nonce, so its re-anchored links are what
/// gets persisted.
///
/// # Errors
///
/// Decryption, validation, merge and reseal failures all propagate.
pub fn merge_sealed(
    key: &EntryKey,
    on_chain_blobs: &[SealedBlob],
    local_blobs: &[SealedBlob],
    options: MergeOptions,
) -> ChainResult<Vec<SealedBlob>> {
    let on_chain = open_all(key, on_chain_blobs, true)?;
    let local = open_all(key, local_blobs, false)?;

    let merged = merge_records(&link_forward(&local), &link_forward(&on_chain), options)?;

    merged
        .iter()
        .map(|record| match &record.sealed {
            Some(blob) if blob.on_chain => Ok(blob.clone()),
            _ => seal_record(key, record),
        })
        .collect()
}

fn ensure_linked(records: &[CredentialRecord]) -> ChainResult<()> {
    match records.iter().position(|record| record.next.is_none()) {
        Some(index) => Err(ChainError::MissingNextPointer { index }),
        None => Ok(()),
    }
}

fn open_all(
    key: &EntryKey,
    blobs: &[SealedBlob],
    authoritative: bool,
) -> ChainResult<Vec<CredentialRecord>> {
    let mut records = Vec::with_capacity(blobs.len());
    for (position, blob) in blobs.iter().enumerate() {
        let record = open_record(key, blob).map_err(|err| {
            if authoritative && position + 1 == blobs.len() {
                ChainError::invalid_tail(err.to_string())
            } else {
                err
            }
        })?;
        records.push(record);
    }
    Ok(records)
}
