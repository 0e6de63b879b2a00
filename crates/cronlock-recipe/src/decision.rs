//! The lock decision: held, or blocked behind a floor predecessor.

use cronlock_core::error::{LockError, LockResult};
use cronlock_core::sequence::Candidate;

/// Outcome of one decision pass. Computed fresh each pass, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockDecision {
    /// Our candidate is the head of the ordered sibling set.
    Held,
    /// Someone is ahead. `predecessor` is the floor: the sibling with the
    /// largest sequence strictly smaller than ours. Watching it, rather
    /// than the holder, wakes one waiter per release instead of the herd.
    Blocked { predecessor: Candidate },
}

/// Parses and orders a sibling enumeration, ascending by sequence.
pub fn order_candidates(siblings: &[String]) -> LockResult<Vec<Candidate>> {
    let mut candidates = siblings
        .iter()
        .map(|name| Candidate::parse(name))
        .collect::<LockResult<Vec<_>>>()?;
    candidates.sort();
    Ok(candidates)
}

/// Decides whether `mine` holds the lock given the full sibling set.
///
/// The sibling set must contain `mine` — the registrar ran before this —
/// so an empty set or a missing self is a protocol violation, as is a
/// duplicated sequence number (the service assigns them atomically and
/// monotonically, so a tie means corruption).
pub fn decide(siblings: &[String], mine: &Candidate) -> LockResult<LockDecision> {
    if siblings.is_empty() {
        return Err(LockError::Protocol(
            "empty sibling set: our own candidate must be present".to_string(),
        ));
    }

    let ordered = order_candidates(siblings)?;

    for pair in ordered.windows(2) {
        if pair[0].sequence() == pair[1].sequence() {
            return Err(LockError::Protocol(format!(
                "duplicate sequence number {} on {} and {}",
                pair[0].sequence(),
                pair[0].name(),
                pair[1].name(),
            )));
        }
    }

    if !ordered.iter().any(|candidate| candidate == mine) {
        return Err(LockError::Protocol(format!(
            "own candidate {} missing from sibling set",
            mine.name(),
        )));
    }

    if ordered[0] == *mine {
        return Ok(LockDecision::Held);
    }

    let predecessor = ordered
        .iter()
        .rfind(|candidate| *candidate < mine)
        .cloned()
        .ok_or_else(|| {
            LockError::Protocol(format!(
                "candidate {} is not the head but has no predecessor",
                mine.name(),
            ))
        })?;

    Ok(LockDecision::Blocked { predecessor })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn candidate(name: &str) -> Candidate {
        Candidate::parse(name).unwrap()
    }

    #[test]
    fn sole_candidate_holds_the_lock() {
        let siblings = names(&["x-0000000000000001-0000000001"]);
        let mine = candidate("x-0000000000000001-0000000001");
        assert_eq!(decide(&siblings, &mine).unwrap(), LockDecision::Held);
    }

    #[test]
    fn second_candidate_is_blocked_behind_the_first() {
        let siblings = names(&[
            "x-000000000000000a-0000000001",
            "x-000000000000000b-0000000002",
        ]);
        let mine = candidate("x-000000000000000b-0000000002");
        assert_eq!(
            decide(&siblings, &mine).unwrap(),
            LockDecision::Blocked {
                predecessor: candidate("x-000000000000000a-0000000001"),
            }
        );
    }

    #[test]
    fn floor_is_the_nearest_predecessor_not_the_holder() {
        let siblings = names(&[
            "x-000000000000000c-0000000003",
            "x-000000000000000a-0000000001",
            "x-000000000000000b-0000000002",
        ]);
        let mine = candidate("x-000000000000000c-0000000003");
        assert_eq!(
            decide(&siblings, &mine).unwrap(),
            LockDecision::Blocked {
                predecessor: candidate("x-000000000000000b-0000000002"),
            }
        );
    }

    #[test]
    fn empty_sibling_set_is_a_protocol_violation() {
        let mine = candidate("x-0000000000000001-0000000001");
        assert!(matches!(
            decide(&[], &mine),
            Err(LockError::Protocol(_))
        ));
    }

    #[test]
    fn missing_own_candidate_is_a_protocol_violation() {
        let siblings = names(&["x-000000000000000a-0000000001"]);
        let mine = candidate("x-000000000000000b-0000000002");
        assert!(matches!(
            decide(&siblings, &mine),
            Err(LockError::Protocol(_))
        ));
    }

    #[test]
    fn duplicate_sequences_are_corruption() {
        let siblings = names(&[
            "x-000000000000000a-0000000001",
            "x-000000000000000b-0000000001",
        ]);
        let mine = candidate("x-000000000000000a-0000000001");
        assert!(matches!(
            decide(&siblings, &mine),
            Err(LockError::Protocol(_))
        ));
    }

    #[test]
    fn malformed_sibling_names_are_fatal() {
        let siblings = names(&["x-000000000000000a-0000000001", "garbage"]);
        let mine = candidate("x-000000000000000a-0000000001");
        assert!(matches!(
            decide(&siblings, &mine),
            Err(LockError::MalformedCandidate(_))
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        // Sibling sets with distinct sequence numbers, as the service's
        // atomic assignment guarantees.
        fn sibling_set() -> impl Strategy<Value = Vec<String>> {
            proptest::collection::btree_set(0u64..10_000, 1..32).prop_map(|sequences| {
                sequences
                    .into_iter()
                    .enumerate()
                    .map(|(i, seq)| format!("x-{:016x}-{:010}", i as u64 + 1, seq))
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn held_iff_minimum_sequence(siblings in sibling_set(), index in 0usize..32) {
                let index = index % siblings.len();
                let mine = Candidate::parse(&siblings[index]).unwrap();
                let minimum = siblings
                    .iter()
                    .map(|name| Candidate::parse(name).unwrap())
                    .min()
                    .unwrap();

                let decision = decide(&siblings, &mine).unwrap();
                prop_assert_eq!(decision == LockDecision::Held, mine == minimum);
            }

            #[test]
            fn blocked_floor_is_the_largest_strictly_smaller(
                siblings in sibling_set(),
                index in 0usize..32,
            ) {
                let index = index % siblings.len();
                let mine = Candidate::parse(&siblings[index]).unwrap();

                if let LockDecision::Blocked { predecessor } = decide(&siblings, &mine).unwrap() {
                    prop_assert!(predecessor < mine);
                    for name in &siblings {
                        let other = Candidate::parse(name).unwrap();
                        if other < mine {
                            prop_assert!(other <= predecessor);
                        }
                    }
                }
            }
        }
    }
}
