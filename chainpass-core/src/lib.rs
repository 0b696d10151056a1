//! ChainPass credential-chain reconciliation engine.
//!
//! ChainPass stores encrypted credential entries on EVM-compatible chains
//! and keeps a local, off-chain copy that a user edits between commits. This
//! crate is the engine that keeps those two histories coherent.
//!
//! # Architecture
//!
//! A user's credential set is a flat array of records. Each record points
//! backward at the record it supersedes (`prev`), forming append-only,
//! per-credential edit chains; the links are array positions rather than
//! references because every record is encrypted and persisted individually
//! and must survive reconstruction in arbitrary order. On top of that model
//! the crate provides four layers:
//!
//! 1. **Record model** ([`CredentialRecord`], [`EntryPayload`], [`Link`]):
//!    the tagged entry variants, link invariants and sealed-envelope shape.
//!
//! 2. **Linking and grouping** ([`link_forward`], [`chain_groups`],
//!    [`chains_by_url`]): derives forward pointers and groups records into
//!    per-credential and per-URL views for display.
//!
//! 3. **Deletion** ([`delete_at`], [`mark_out_of_order`],
//!    [`delete_marked`]): removes off-chain records with full renumbering,
//!    and prunes edits that ended up chronologically out of order after a
//!    merge. Committed (on-chain) records are immutable and never deleted.
//!
//! 4. **Merge** ([`merge_records`], [`merge_sealed`]): reconciles a local
//!    edit history against the authoritative on-chain list, re-anchoring
//!    stale edits onto the current tail of their chain, and reseals the
//!    result ([`seal_record`], [`open_record`], [`decode_batch`]) with
//!    AES-256-GCM.
//!
//! All chain algorithms are pure, synchronous transformations: inputs are
//! never mutated, and the only failure modes are contract violations
//! (reported as [`ChainError`]) or per-record data-quality issues (reported
//! as [`DecodedRecord::Invalid`] sentinels by the batch codec).

mod chain;
mod crypto;
mod error;
mod merge;
mod prune;
mod record;

#[cfg(test)]
pub(crate) mod testutil;

pub use chain::{chain_groups, chains_by_url, link_forward};
pub use crypto::{decode_batch, open_record, seal_record, EntryKey};
pub use error::{ChainError, ChainResult};
pub use merge::{merge_records, merge_sealed, MergeOptions};
pub use prune::{delete_at, delete_marked, mark_out_of_order};
pub use record::{
    CredentialRecord, DecodedRecord, EntryPayload, InvalidRecord, Link, SealedBlob,
};
