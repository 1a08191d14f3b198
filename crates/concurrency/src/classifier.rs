//! Entry classification
//!
//! Decides what happens to one entry from two inputs: whether a live head
//! exists, and the configured policies. The decision table is a single
//! exhaustive `match`; adding a policy value without deciding every cell is
//! a compile error, and there is no fallthrough arm.
//!
//! | head    | policy                 | action   |
//! |---------|------------------------|----------|
//! | absent  | `IfNotExists::CREATE`  | Create   |
//! | absent  | `IfNotExists::RETAIN`  | Retain   |
//! | absent  | `IfNotExists::ERROR`   | rejected |
//! | present | `IfExists::REPLACE`    | Replace  |
//! | present | `IfExists::PATCH`      | Patch    |
//! | present | `IfExists::MERGE`      | Merge    |
//! | present | `IfExists::DELETE`     | Delete   |
//! | present | `IfExists::RETAIN`     | Retain   |
//! | present | `IfExists::ERROR`      | rejected |

use geoversion_core::{GeoError, GeoResult, HeadState, IfExists, IfNotExists, Policies};
use std::fmt;

/// What to do with an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Write the input as a new feature
    Create,
    /// Write the input over the head wholesale
    Replace,
    /// Apply the input as a merge-patch onto the head
    Patch,
    /// Three-way merge of base, head and input
    Merge,
    /// Commit a tombstone
    Delete,
    /// Succeed without writing
    Retain,
}

impl Action {
    /// Whether this action commits a new version
    #[inline]
    pub fn writes(&self) -> bool {
        !matches!(self, Action::Retain)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Create => "create",
            Action::Replace => "replace",
            Action::Patch => "patch",
            Action::Merge => "merge",
            Action::Delete => "delete",
            Action::Retain => "retain",
        };
        f.write_str(name)
    }
}

/// One cell of the decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The entry proceeds with this action
    Proceed(Action),
    /// The policy forbids the transition
    Reject,
}

/// Stateless classifier over the decision table
pub struct EntryClassifier;

impl EntryClassifier {
    /// Look up the decision for a head state and policy pair
    pub const fn decide(head: HeadState, policies: &Policies) -> Decision {
        use Decision::{Proceed, Reject};
        match (head, policies.if_not_exists, policies.if_exists) {
            (HeadState::Absent, IfNotExists::Create, _) => Proceed(Action::Create),
            (HeadState::Absent, IfNotExists::Retain, _) => Proceed(Action::Retain),
            (HeadState::Absent, IfNotExists::Error, _) => Reject,
            (HeadState::Present, _, IfExists::Replace) => Proceed(Action::Replace),
            (HeadState::Present, _, IfExists::Patch) => Proceed(Action::Patch),
            (HeadState::Present, _, IfExists::Merge) => Proceed(Action::Merge),
            (HeadState::Present, _, IfExists::Delete) => Proceed(Action::Delete),
            (HeadState::Present, _, IfExists::Retain) => Proceed(Action::Retain),
            (HeadState::Present, _, IfExists::Error) => Reject,
        }
    }

    /// Classify an entry
    ///
    /// # Errors
    ///
    /// `ClassificationError` naming the feature, the head state and the
    /// policy value that rejected it.
    pub fn classify(feature_id: &str, head: HeadState, policies: &Policies) -> GeoResult<Action> {
        match Self::decide(head, policies) {
            Decision::Proceed(action) => Ok(action),
            Decision::Reject => {
                let policy = match head {
                    HeadState::Absent => policies.if_not_exists.to_string(),
                    HeadState::Present => policies.if_exists.to_string(),
                };
                Err(GeoError::classification(feature_id, head, policy))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoversion_core::ConflictResolution;

    const ALL_IF_NOT_EXISTS: [IfNotExists; 3] =
        [IfNotExists::Create, IfNotExists::Error, IfNotExists::Retain];
    const ALL_IF_EXISTS: [IfExists; 6] = [
        IfExists::Replace,
        IfExists::Patch,
        IfExists::Merge,
        IfExists::Retain,
        IfExists::Error,
        IfExists::Delete,
    ];

    fn policies(ine: IfNotExists, ie: IfExists) -> Policies {
        Policies::new(ine, ie, ConflictResolution::Error)
    }

    #[test]
    fn test_every_combination_has_one_outcome() {
        for head in [HeadState::Absent, HeadState::Present] {
            for ine in ALL_IF_NOT_EXISTS {
                for ie in ALL_IF_EXISTS {
                    let p = policies(ine, ie);
                    let result = EntryClassifier::classify("F", head, &p);
                    match EntryClassifier::decide(head, &p) {
                        Decision::Proceed(a) => assert_eq!(result.unwrap(), a),
                        Decision::Reject => {
                            assert_eq!(result.unwrap_err().error_code(), "ClassificationError")
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_absent_head_uses_if_not_exists_only() {
        for ie in ALL_IF_EXISTS {
            assert_eq!(
                EntryClassifier::classify("F", HeadState::Absent, &policies(IfNotExists::Create, ie))
                    .unwrap(),
                Action::Create
            );
            assert_eq!(
                EntryClassifier::classify("F", HeadState::Absent, &policies(IfNotExists::Retain, ie))
                    .unwrap(),
                Action::Retain
            );
        }
    }

    #[test]
    fn test_present_head_uses_if_exists_only() {
        let cases = [
            (IfExists::Replace, Action::Replace),
            (IfExists::Patch, Action::Patch),
            (IfExists::Merge, Action::Merge),
            (IfExists::Delete, Action::Delete),
            (IfExists::Retain, Action::Retain),
        ];
        for ine in ALL_IF_NOT_EXISTS {
            for (ie, expected) in cases {
                assert_eq!(
                    EntryClassifier::classify("F", HeadState::Present, &policies(ine, ie)).unwrap(),
                    expected
                );
            }
        }
    }

    #[test]
    fn test_rejection_names_feature_head_and_policy() {
        let err = EntryClassifier::classify(
            "F42",
            HeadState::Present,
            &policies(IfNotExists::Create, IfExists::Error),
        )
        .unwrap_err();
        match &err {
            GeoError::Classification {
                feature_id,
                head,
                policy,
            } => {
                assert_eq!(feature_id, "F42");
                assert_eq!(*head, HeadState::Present);
                assert_eq!(policy, "IfExists::ERROR");
            }
            other => panic!("unexpected {:?}", other),
        }

        let err = EntryClassifier::classify(
            "F43",
            HeadState::Absent,
            &policies(IfNotExists::Error, IfExists::Patch),
        )
        .unwrap_err();
        assert!(err.to_string().contains("IfNotExists::ERROR"));
        assert!(err.to_string().contains("absent"));
    }

    #[test]
    fn test_only_retain_does_not_write() {
        assert!(!Action::Retain.writes());
        for a in [Action::Create, Action::Replace, Action::Patch, Action::Merge, Action::Delete] {
            assert!(a.writes());
        }
    }
}
