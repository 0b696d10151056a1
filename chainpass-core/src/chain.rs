//! Chain linking and grouping.
//!
//! A chain is the full edit history of one logical credential: following
//! `prev` from any record eventually reaches a root (`prev = -1`). These
//! functions derive forward pointers from the backward links and group flat
//! record arrays into per-chain and per-URL views. All of them are pure:
//! inputs are never mutated, results are fresh allocations.

use std::collections::{BTreeMap, HashMap};

use crate::record::{CredentialRecord, Link};

/// Populates the derived forward pointer for every record.
///
/// Positions are processed from last to first. Each unvisited position starts
/// a backward walk over `prev`, assigning every record's `next` to the
/// previously visited position ([`Link::NONE`] for the walk's start) and
/// marking it visited. A walk stops when it reaches a record an earlier walk
/// already linked, so a root shared by several branches keeps the `next`
/// assigned by whichever walk reached it first. `prev` strictly decreases
/// along any walk, which guarantees termination.
///
/// Re-linking an already linked array yields identical assignments.
#[must_use]
pub fn link_forward(records: &[CredentialRecord]) -> Vec<CredentialRecord> {
    let mut linked = records.to_vec();
    let mut visited = vec![false; linked.len()];

    for start in (0..linked.len()).rev() {
        if visited[start] {
            continue;
        }
        let mut successor = Link::NONE;
        let mut cursor = Some(start);
        while let Some(position) = cursor {
            if visited[position] {
                break;
            }
            visited[position] = true;
            linked[position].next = Some(successor);
            successor = Link::at(position);
            cursor = linked[position].prev.index().filter(|&p| p < position);
        }
    }

    linked
}

/// Groups records into chains keyed by each chain's root position.
///
/// Every record walks its `prev` links back to a root; records land in their
/// root's bucket in array order, which is not necessarily chronological.
/// The union of all buckets is exactly the input set.
#[must_use]
pub fn chain_groups(records: &[CredentialRecord]) -> BTreeMap<usize, Vec<CredentialRecord>> {
    let prevs: HashMap<usize, Link> = records
        .iter()
        .map(|record| (record.curr, record.prev))
        .collect();

    let mut groups: BTreeMap<usize, Vec<CredentialRecord>> = BTreeMap::new();
    for record in records {
        let mut root = record.curr;
        while let Some(parent) = prevs.get(&root).copied().and_then(Link::index) {
            if parent >= root {
                break;
            }
            root = parent;
        }
        groups.entry(root).or_default().push(record.clone());
    }
    groups
}

/// Groups password chains by the URL of each chain's root record.
///
/// Only password-type chains participate; keypair and secret-share chains
/// are ignored. Within a URL bucket, chains appear in order of first
/// appearance (ascending root position).
#[must_use]
pub fn chains_by_url(records: &[CredentialRecord]) -> HashMap<String, Vec<Vec<CredentialRecord>>> {
    let mut by_url: HashMap<String, Vec<Vec<CredentialRecord>>> = HashMap::new();
    for chain in chain_groups(records).into_values() {
        let Some(root) = chain.first() else {
            continue;
        };
        if !root.entry.is_password() {
            continue;
        }
        let Some(url) = root.entry.url() else {
            continue;
        };
        by_url.entry(url.to_owned()).or_default().push(chain);
    }
    by_url
}
