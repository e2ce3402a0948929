use std::hash::Hash;
use std::ops::Bound;

use tracing::debug;

use super::{SeqMap, DEFAULT_START, MAX_BORDER, MIN_BORDER, REGULAR_DISTANCE};
use crate::types::{ListKind, Result, SeqGraphError, SeqNum};

/// New key assignment for every member of a list.
#[derive(Clone, Debug)]
pub struct ReorgPlan<I> {
    /// List being renumbered.
    pub kind: ListKind,
    /// Key given to the first member in list order.
    pub start: SeqNum,
    /// Spacing between consecutive members.
    pub distance: SeqNum,
    /// Rank of the member that received key zero.
    pub pivot_rank: usize,
    /// `(id, new key)` in list order.
    pub assignments: Vec<(I, SeqNum)>,
}

impl<I> ReorgPlan<I> {
    /// Number of members renumbered.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Returns `true` if the plan renumbers nothing.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

/// Restores uniform key spacing across a list without changing its order.
///
/// The member at the middle rank gets key `0`; members after it get
/// `D, 2D, ...` and members before it `-D, -2D, ...`. Choosing the pivot by
/// rank rather than by key value keeps the two halves balanced no matter how
/// skewed the old keys were.
#[derive(Clone, Copy, Debug)]
pub struct Reorganizer {
    kind: ListKind,
    distance: SeqNum,
}

impl Reorganizer {
    /// Reorganizer using [`REGULAR_DISTANCE`].
    pub fn new(kind: ListKind) -> Self {
        Self {
            kind,
            distance: REGULAR_DISTANCE,
        }
    }

    /// Computes the new keys for `map`. The map itself is left untouched.
    pub fn plan<I: Copy + Eq + Hash>(&self, map: &SeqMap<I>) -> Result<ReorgPlan<I>> {
        let expected = map.len();
        let Some((pivot_key, pivot_rank)) = self.pivot(map) else {
            return Ok(ReorgPlan {
                kind: self.kind,
                start: DEFAULT_START,
                distance: self.distance,
                pivot_rank: 0,
                assignments: Vec::new(),
            });
        };

        let lowest = -(pivot_rank as i128) * i128::from(self.distance);
        let highest = (expected - pivot_rank - 1) as i128 * i128::from(self.distance);
        if lowest <= i128::from(MIN_BORDER) || highest >= i128::from(MAX_BORDER) {
            return Err(SeqGraphError::SequenceSpaceExhausted(self.kind));
        }

        let mut upper = Vec::with_capacity(expected - pivot_rank);
        let mut key = DEFAULT_START;
        for (_, id) in map.range((Bound::Included(pivot_key), Bound::Unbounded)) {
            upper.push((id, key));
            key += self.distance;
        }
        let mut lower = Vec::with_capacity(pivot_rank);
        let mut key = DEFAULT_START;
        for (_, id) in map
            .range((Bound::Unbounded, Bound::Excluded(pivot_key)))
            .rev()
        {
            key -= self.distance;
            lower.push((id, key));
        }

        let assigned = lower.len() + upper.len();
        if assigned != expected {
            return Err(SeqGraphError::IncompleteReorganization { assigned, expected });
        }
        lower.reverse();
        lower.extend(upper);
        let start = lower.first().map_or(DEFAULT_START, |&(_, key)| key);
        debug!(
            list = %self.kind,
            entries = expected,
            pivot_rank,
            start,
            "reorganizing sequence list"
        );
        Ok(ReorgPlan {
            kind: self.kind,
            start,
            distance: self.distance,
            pivot_rank,
            assignments: lower,
        })
    }

    fn pivot<I: Copy + Eq + Hash>(&self, map: &SeqMap<I>) -> Option<(SeqNum, usize)> {
        let rank = map.len() / 2;
        map.iter().nth(rank).map(|(key, _)| (key, rank))
    }
}
