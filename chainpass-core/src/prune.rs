//! Deletion engine: single-record removal with renumbering, and pruning of
//! records that sit out of chronological order within their chain.
//!
//! Deletion is only ever legal for off-chain records; committed history is
//! immutable and guarded at every entry point.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::chain::link_forward;
use crate::error::{ChainError, ChainResult};
use crate::record::{CredentialRecord, Link};

/// Removes the record at `index`, renumbering everything behind it.
///
/// The deleted record's successors are spliced onto its predecessor, so no
/// chain breaks: a record whose `prev` pointed at `index` now points at the
/// deleted record's own `prev`. Positions and backward links greater than
/// `index` shift down by one. Derived forward links are cleared; relink with
/// [`link_forward`] when needed.
///
/// The input is never modified, including on error.
///
/// # Errors
///
/// - [`ChainError::IndexOutOfBounds`] if `index` is past the end.
/// - [`ChainError::OnChainImmutable`] if the record's ciphertext is
///   committed on-chain.
pub fn delete_at(records: &[CredentialRecord], index: usize) -> ChainResult<Vec<CredentialRecord>> {
    let target = records.get(index).ok_or(ChainError::IndexOutOfBounds {
        index,
        len: records.len(),
    })?;
    if target.on_chain() {
        return Err(ChainError::OnChainImmutable { index });
    }
    // The predecessor always sits before `index`, so it never renumbers.
    let spliced_prev = target.prev;

    let mut result = Vec::with_capacity(records.len().saturating_sub(1));
    for (position, record) in records.iter().enumerate() {
        if position == index {
            continue;
        }
        let mut record = record.clone();
        if record.curr > index {
            record.curr -= 1;
        }
        match record.prev.index() {
            Some(p) if p == index => record.prev = spliced_prev,
            Some(p) if p > index => record.prev = Link::at(p - 1),
            _ => {}
        }
        record.next = None;
        result.push(record);
    }
    Ok(result)
}

/// Flags records that sit out of chronological order within their chain.
///
/// Each chain is walked once, from its tail back to its root. Going
/// backward, timestamps must strictly decrease; a record that is not
/// strictly older than the previously visited (later-in-chain) record was
/// superseded by an edit inserted out of sequence during a merge, and is
/// flagged. Records whose ciphertext is committed on-chain are never
/// flagged. After each flag the comparison restarts from scratch, so every
/// adjacent pair is judged on its own.
///
/// Returns one flag per input position, `true` meaning safe to remove.
#[must_use]
pub fn mark_out_of_order(records: &[CredentialRecord]) -> Vec<bool> {
    let linked = link_forward(records);
    let mut marks = vec![false; linked.len()];

    for (position, record) in linked.iter().enumerate().rev() {
        if record.next != Some(Link::NONE) {
            continue; // only chain tails start a walk
        }
        let mut tracker: Option<DateTime<Utc>> = None;
        let mut cursor = Some(position);
        while let Some(current) = cursor {
            let visiting = &linked[current];
            match tracker {
                Some(later) if visiting.timestamp >= later => {
                    if !visiting.on_chain() {
                        marks[current] = true;
                    }
                    tracker = None;
                }
                _ => tracker = Some(visiting.timestamp),
            }
            cursor = visiting.prev.index().filter(|&p| p < current);
        }
    }

    marks
}

/// Deletes every flagged record, highest position first so earlier removals
/// never invalidate later flags.
///
/// # Errors
///
/// - [`ChainError::MismatchedMarks`] if the flag slice length differs from
///   the record count.
/// - Any error from [`delete_at`].
pub fn delete_marked(
    records: &[CredentialRecord],
    marks: &[bool],
) -> ChainResult<Vec<CredentialRecord>> {
    if marks.len() != records.len() {
        return Err(ChainError::MismatchedMarks {
            records: records.len(),
            marks: marks.len(),
        });
    }

    let mut result = records.to_vec();
    for index in (0..marks.len()).rev() {
        if marks[index] {
            result = delete_at(&result, index)?;
        }
    }
    if result.len() < records.len() {
        debug!(
            removed = records.len() - result.len(),
            "pruned out-of-order records"
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{committed, password};

    #[test]
    fn delete_middle_renumbers_and_shifts_links() {
        // prev layout [-1, 0, -1, -1, 2]; deleting position 3 (a root).
        let records = vec![
            password(0, Link::NONE, 10, "https://a.example"),
            password(1, Link::at(0), 20, "https://a.example"),
            password(2, Link::NONE, 30, "https://b.example"),
            password(3, Link::NONE, 40, "https://c.example"),
            password(4, Link::at(2), 50, "https://b.example"),
        ];
        let result = delete_at(&records, 3).unwrap();

        assert_eq!(result.len(), 4);
        let currs: Vec<usize> = result.iter().map(|r| r.curr).collect();
        assert_eq!(currs, vec![0, 1, 2, 3]);
        let prevs: Vec<Link> = result.iter().map(|r| r.prev).collect();
        assert_eq!(prevs, vec![Link::NONE, Link::at(0), Link::NONE, Link::at(2)]);

        let deleted = records[3].id;
        assert!(result.iter().all(|r| r.id != deleted));
    }

    #[test]
    fn delete_splices_successor_onto_predecessor() {
        let records = vec![
            password(0, Link::NONE, 10, "https://a.example"),
            password(1, Link::at(0), 20, "https://a.example"),
            password(2, Link::at(1), 30, "https://a.example"),
        ];
        let result = delete_at(&records, 1).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[1].id, records[2].id);
        // The survivor now chains directly onto the root.
        assert_eq!(result[1].prev, Link::at(0));
        assert_eq!(result[1].curr, 1);
    }

    #[test]
    fn delete_root_promotes_successor_to_root() {
        let records = vec![
            password(0, Link::NONE, 10, "https://a.example"),
            password(1, Link::at(0), 20, "https://a.example"),
        ];
        let result = delete_at(&records, 0).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].prev, Link::NONE);
        assert_eq!(result[0].curr, 0);
    }

    #[test]
    fn delete_preserves_connectivity() {
        let records = vec![
            password(0, Link::NONE, 10, "https://a.example"),
            password(1, Link::at(0), 20, "https://a.example"),
            password(2, Link::NONE, 30, "https://b.example"),
            password(3, Link::at(1), 40, "https://a.example"),
            password(4, Link::at(2), 50, "https://b.example"),
        ];
        for index in 0..records.len() {
            let result = delete_at(&records, index).unwrap();
            for (position, record) in result.iter().enumerate() {
                assert_eq!(record.curr, position);
                if let Some(p) = record.prev.index() {
                    assert!(p < position, "prev must stay behind its record");
                }
            }
        }
    }

    #[test]
    fn delete_rejects_on_chain_records() {
        let records = vec![
            committed(password(0, Link::NONE, 10, "https://a.example")),
            password(1, Link::at(0), 20, "https://a.example"),
        ];
        let err = delete_at(&records, 0).unwrap_err();
        assert!(matches!(err, ChainError::OnChainImmutable { index: 0 }));
    }

    #[test]
    fn delete_rejects_out_of_bounds() {
        let records = vec![password(0, Link::NONE, 10, "https://a.example")];
        assert!(matches!(
            delete_at(&records, 5),
            Err(ChainError::IndexOutOfBounds { index: 5, len: 1 })
        ));
    }

    #[test]
    fn chronological_chain_has_no_marks() {
        let records = vec![
            password(0, Link::NONE, 10, "https://a.example"),
            password(1, Link::at(0), 20, "https://a.example"),
            password(2, Link::at(1), 30, "https://a.example"),
        ];
        assert_eq!(mark_out_of_order(&records), vec![false, false, false]);
    }

    #[test]
    fn newer_record_ahead_of_older_successor_is_marked() {
        // Chain a(t10) -> p(t30) -> q(t20): walking back from q, p is not
        // strictly older than q, so p is flagged.
        let records = vec![
            password(0, Link::NONE, 10, "https://a.example"),
            password(1, Link::at(0), 30, "https://a.example"),
            password(2, Link::at(1), 20, "https://a.example"),
        ];
        assert_eq!(mark_out_of_order(&records), vec![false, true, false]);
    }

    #[test]
    fn equal_timestamps_flag_the_earlier_record() {
        let records = vec![
            password(0, Link::NONE, 10, "https://a.example"),
            password(1, Link::at(0), 20, "https://a.example"),
            password(2, Link::at(1), 20, "https://a.example"),
        ];
        assert_eq!(mark_out_of_order(&records), vec![false, true, false]);
    }

    #[test]
    fn on_chain_records_are_never_marked() {
        let records = vec![
            password(0, Link::NONE, 10, "https://a.example"),
            committed(password(1, Link::at(0), 30, "https://a.example")),
            password(2, Link::at(1), 20, "https://a.example"),
        ];
        assert_eq!(mark_out_of_order(&records), vec![false, false, false]);
    }

    #[test]
    fn tracker_resets_after_each_flag() {
        // a(t10) -> b(t40) -> c(t30) -> d(t20): c is not strictly older than
        // d and is flagged; the tracker then resets, so b starts a fresh pair
        // and survives even though it is also newer than d.
        let records = vec![
            password(0, Link::NONE, 10, "https://a.example"),
            password(1, Link::at(0), 40, "https://a.example"),
            password(2, Link::at(1), 30, "https://a.example"),
            password(3, Link::at(2), 20, "https://a.example"),
        ];
        // Walk: d(t20) tracker=t20; c(t30) >= t20 -> flag c, reset;
        // b(t40) tracker=t40; a(t10) < t40 -> tracker=t10.
        assert_eq!(mark_out_of_order(&records), vec![false, false, true, false]);
    }

    #[test]
    fn independent_chains_are_walked_separately() {
        let records = vec![
            password(0, Link::NONE, 50, "https://a.example"),
            password(1, Link::NONE, 10, "https://b.example"),
            password(2, Link::at(1), 20, "https://b.example"),
        ];
        // a's lone chain and b's increasing chain are both clean; the later
        // timestamps of chain a never leak into chain b's comparison.
        assert_eq!(mark_out_of_order(&records), vec![false, false, false]);
    }

    #[test]
    fn delete_marked_removes_from_highest_position_down() {
        let records = vec![
            password(0, Link::NONE, 10, "https://a.example"),
            password(1, Link::at(0), 40, "https://a.example"),
            password(2, Link::at(1), 30, "https://a.example"),
            password(3, Link::at(2), 20, "https://a.example"),
        ];
        let marks = vec![false, true, true, false];
        let result = delete_marked(&records, &marks).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, records[0].id);
        assert_eq!(result[1].id, records[3].id);
        // The survivor chains straight onto the root through both splices.
        assert_eq!(result[1].prev, Link::at(0));
        assert_eq!(result[1].curr, 1);
    }

    #[test]
    fn delete_marked_rejects_mismatched_lengths() {
        let records = vec![password(0, Link::NONE, 10, "https://a.example")];
        assert!(matches!(
            delete_marked(&records, &[true, false]),
            Err(ChainError::MismatchedMarks {
                records: 1,
                marks: 2
            })
        ));
    }

    #[test]
    fn mark_then_delete_round() {
        let records = vec![
            password(0, Link::NONE, 10, "https://a.example"),
            password(1, Link::at(0), 30, "https://a.example"),
            password(2, Link::at(1), 20, "https://a.example"),
        ];
        let marks = mark_out_of_order(&records);
        let result = delete_marked(&records, &marks).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, records[0].id);
        assert_eq!(result[1].id, records[2].id);
        assert_eq!(result[1].prev, Link::at(0));
    }
}
