use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur while applying a diff to an ordered sequence.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiffError {
    /// `PopBack` on an empty sequence.
    #[error("cannot pop from an empty sequence")]
    EmptySequence,
    /// An index-carrying operation pointed past the sequence.
    #[error("index {index} is out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// One edit of an ordered remote collection.
///
/// `T` is the payload carried by inserting operations: a remote room handle
/// on the wire, a built entry once summaries exist.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoomListDiff<T> {
    /// Append values at the end, in order.
    Append(Vec<T>),
    /// Remove every element.
    Clear,
    /// Insert before `index`.
    InsertAt { index: usize, value: T },
    /// Remove the last element.
    PopBack,
    /// Remove the first element. A no-op on an empty sequence.
    PopFront,
    /// Insert at the end.
    PushBack(T),
    /// Insert at the start.
    PushFront(T),
    /// Remove the element at `index`.
    RemoveAt { index: usize },
    /// Replace the whole sequence.
    Reset(Vec<T>),
    /// Substitute the element at `index`.
    SetAt { index: usize, value: T },
    /// Drop every element at or after `length`.
    Truncate { length: usize },
}

impl<T> RoomListDiff<T> {
    /// Short stable name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Append(_) => "append",
            Self::Clear => "clear",
            Self::InsertAt { .. } => "insert_at",
            Self::PopBack => "pop_back",
            Self::PopFront => "pop_front",
            Self::PushBack(_) => "push_back",
            Self::PushFront(_) => "push_front",
            Self::RemoveAt { .. } => "remove_at",
            Self::Reset(_) => "reset",
            Self::SetAt { .. } => "set_at",
            Self::Truncate { .. } => "truncate",
        }
    }

    /// Check the preconditions of this operation against a sequence of `len` elements.
    pub fn check(&self, len: usize) -> Result<(), DiffError> {
        match self {
            Self::InsertAt { index, .. } if *index > len => Err(DiffError::IndexOutOfBounds {
                index: *index,
                len,
            }),
            Self::RemoveAt { index } | Self::SetAt { index, .. } if *index >= len => {
                Err(DiffError::IndexOutOfBounds { index: *index, len })
            }
            Self::PopBack if len == 0 => Err(DiffError::EmptySequence),
            _ => Ok(()),
        }
    }

    /// Apply this operation in place.
    ///
    /// The sequence is left untouched when the preconditions do not hold.
    pub fn apply_to(self, items: &mut Vec<T>) -> Result<(), DiffError> {
        self.check(items.len())?;

        match self {
            Self::Append(values) => items.extend(values),
            Self::Clear => items.clear(),
            Self::InsertAt { index, value } => items.insert(index, value),
            Self::PopBack => {
                items.pop();
            }
            Self::PopFront => {
                if !items.is_empty() {
                    items.remove(0);
                }
            }
            Self::PushBack(value) => items.push(value),
            Self::PushFront(value) => items.insert(0, value),
            Self::RemoveAt { index } => {
                items.remove(index);
            }
            Self::Reset(values) => *items = values,
            Self::SetAt { index, value } => items[index] = value,
            Self::Truncate { length } => items.truncate(length),
        }

        Ok(())
    }
}

/// Apply a batch of operations strictly in order.
///
/// An operation that cannot be applied is logged and skipped; the following
/// operations still run against the unchanged sequence. Returns the number of
/// skipped operations.
pub fn apply_diffs<T>(
    items: &mut Vec<T>,
    diffs: impl IntoIterator<Item = RoomListDiff<T>>,
) -> usize {
    let mut skipped = 0;
    for diff in diffs {
        let kind = diff.kind();
        if let Err(err) = diff.apply_to(items) {
            warn!(op = kind, len = items.len(), error = %err, "skipping inconsistent diff");
            skipped += 1;
        }
    }
    skipped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn applies_push_set_remove_truncate_sequence() {
        let mut items = Vec::new();
        let skipped = apply_diffs(
            &mut items,
            [
                RoomListDiff::PushBack("A".to_owned()),
                RoomListDiff::PushBack("B".to_owned()),
                RoomListDiff::PushBack("C".to_owned()),
            ],
        );
        assert_eq!(skipped, 0);
        assert_eq!(items, seq(&["A", "B", "C"]));

        RoomListDiff::SetAt {
            index: 1,
            value: "B'".to_owned(),
        }
        .apply_to(&mut items)
        .expect("set should work");
        assert_eq!(items, seq(&["A", "B'", "C"]));

        RoomListDiff::RemoveAt { index: 0 }
            .apply_to(&mut items)
            .expect("remove should work");
        assert_eq!(items, seq(&["B'", "C"]));

        RoomListDiff::Truncate { length: 0 }
            .apply_to(&mut items)
            .expect("truncate should work");
        assert!(items.is_empty());
    }

    #[test]
    fn sequential_application_matches_single_fold() {
        let batch = || {
            vec![
                RoomListDiff::Append(seq(&["a", "b", "c", "d"])),
                RoomListDiff::PushFront("z".to_owned()),
                RoomListDiff::InsertAt {
                    index: 2,
                    value: "x".to_owned(),
                },
                RoomListDiff::RemoveAt { index: 4 },
                RoomListDiff::PopBack,
                RoomListDiff::PopFront,
                RoomListDiff::SetAt {
                    index: 0,
                    value: "y".to_owned(),
                },
            ]
        };

        let mut folded = Vec::new();
        apply_diffs(&mut folded, batch());

        let mut one_by_one = Vec::new();
        for diff in batch() {
            apply_diffs(&mut one_by_one, [diff]);
        }

        assert_eq!(folded, one_by_one);
        assert_eq!(folded, seq(&["y", "x", "b"]));
    }

    #[test]
    fn remove_then_insert_same_value_round_trips() {
        let mut items = seq(&["a", "b", "c"]);
        let original = items.clone();

        let removed = items[1].clone();
        apply_diffs(
            &mut items,
            [
                RoomListDiff::RemoveAt { index: 1 },
                RoomListDiff::InsertAt {
                    index: 1,
                    value: removed,
                },
            ],
        );

        assert_eq!(items, original);
    }

    #[test]
    fn reset_replaces_any_prior_state() {
        let mut items = seq(&["old-1", "old-2"]);
        RoomListDiff::Reset(seq(&["n1", "n2", "n3"]))
            .apply_to(&mut items)
            .expect("reset should work");
        assert_eq!(items, seq(&["n1", "n2", "n3"]));

        let mut empty: Vec<String> = Vec::new();
        RoomListDiff::Reset(seq(&["n1"]))
            .apply_to(&mut empty)
            .expect("reset should work");
        assert_eq!(empty, seq(&["n1"]));
    }

    #[test]
    fn pop_front_on_empty_is_tolerated_but_pop_back_is_not() {
        let mut items: Vec<String> = Vec::new();
        assert_eq!(RoomListDiff::PopFront.apply_to(&mut items), Ok(()));
        assert_eq!(
            RoomListDiff::PopBack.apply_to(&mut items),
            Err(DiffError::EmptySequence)
        );
    }

    #[test]
    fn rejects_out_of_bounds_indices_without_mutating() {
        let mut items = seq(&["a", "b"]);

        assert_eq!(
            RoomListDiff::RemoveAt { index: 2 }.apply_to(&mut items),
            Err(DiffError::IndexOutOfBounds { index: 2, len: 2 })
        );
        assert_eq!(
            RoomListDiff::SetAt {
                index: 5,
                value: "x".to_owned()
            }
            .apply_to(&mut items),
            Err(DiffError::IndexOutOfBounds { index: 5, len: 2 })
        );
        assert_eq!(
            RoomListDiff::InsertAt {
                index: 3,
                value: "x".to_owned()
            }
            .apply_to(&mut items),
            Err(DiffError::IndexOutOfBounds { index: 3, len: 2 })
        );
        assert_eq!(items, seq(&["a", "b"]));

        RoomListDiff::InsertAt {
            index: 2,
            value: "c".to_owned(),
        }
        .apply_to(&mut items)
        .expect("insert at len is valid");
        assert_eq!(items, seq(&["a", "b", "c"]));
    }

    #[test]
    fn bad_op_does_not_abort_batch() {
        let mut items = seq(&["a"]);
        let skipped = apply_diffs(
            &mut items,
            [
                RoomListDiff::RemoveAt { index: 7 },
                RoomListDiff::PushBack("b".to_owned()),
                RoomListDiff::Clear,
                RoomListDiff::PopBack,
                RoomListDiff::PushFront("c".to_owned()),
            ],
        );

        assert_eq!(skipped, 2);
        assert_eq!(items, seq(&["c"]));
    }

    #[test]
    fn truncate_longer_than_sequence_is_a_no_op() {
        let mut items = seq(&["a", "b"]);
        RoomListDiff::Truncate { length: 10 }
            .apply_to(&mut items)
            .expect("truncate should work");
        assert_eq!(items, seq(&["a", "b"]));
    }
}
