//! Ordered lists backed by sparse sequence numbers.
//!
//! Every list maps [`SeqNum`] keys to element ids. New members are placed
//! [`REGULAR_DISTANCE`] away from their neighbour at either end; insertions in
//! the middle bisect the gap between two neighbours. When a gap is exhausted
//! the whole list is renumbered by the [`Reorganizer`] and the insertion is
//! retried, so callers never observe a failed placement.
//!
//! Lists never touch the backend themselves. Every change that an existing
//! member sees (a move, or a reorganization) is reported to a [`SeqSink`], and
//! each concrete list ships the sink that writes its rows.

mod edge_list;
mod incidence_list;
mod reorg;
mod vertex_list;

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::ops::Bound;

use rustc_hash::FxHashMap;

use crate::types::{ListKind, Result, SeqGraphError, SeqNum};

pub use edge_list::EdgeList;
pub use incidence_list::{Direction, IncidenceList};
pub use reorg::{ReorgPlan, Reorganizer};
pub use vertex_list::VertexList;

pub(crate) use edge_list::EdgeListSink;
pub(crate) use incidence_list::IncidenceListSink;
pub(crate) use vertex_list::VertexListSink;

/// Default gap between adjacent keys on ordinary insertion.
pub const REGULAR_DISTANCE: SeqNum = 1 << 32;
/// Key given to the first member of an empty list.
pub const DEFAULT_START: SeqNum = 0;
/// Live keys stay strictly above this value.
pub const MIN_BORDER: SeqNum = SeqNum::MIN + REGULAR_DISTANCE;
/// Live keys stay strictly below this value.
pub const MAX_BORDER: SeqNum = SeqNum::MAX - REGULAR_DISTANCE;

/// Receives the key changes of members that were already in a list.
///
/// Fresh insertions are not reported: the caller learns the new key from the
/// return value and writes the row itself.
pub trait SeqSink<I> {
    /// `id` moved to `key`.
    fn relocated(&mut self, id: I, key: SeqNum) -> Result<()>;

    /// The whole list is about to be renumbered according to `plan`.
    fn reorganized(&mut self, plan: &ReorgPlan<I>) -> Result<()>;
}

/// Sink that ignores every change. Used for lists that are not persisted.
#[derive(Clone, Copy, Debug, Default)]
pub struct Detached;

impl<I> SeqSink<I> for Detached {
    fn relocated(&mut self, _id: I, _key: SeqNum) -> Result<()> {
        Ok(())
    }

    fn reorganized(&mut self, _plan: &ReorgPlan<I>) -> Result<()> {
        Ok(())
    }
}

/// Key → id map plus the key each member was last assigned.
#[derive(Clone)]
pub struct SeqMap<I> {
    by_key: BTreeMap<SeqNum, I>,
    keys: FxHashMap<I, SeqNum>,
}

impl<I> Default for SeqMap<I> {
    fn default() -> Self {
        Self {
            by_key: BTreeMap::new(),
            keys: FxHashMap::default(),
        }
    }
}

impl<I: fmt::Debug> fmt::Debug for SeqMap<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.by_key.iter()).finish()
    }
}

impl<I: Copy + Eq + Hash> SeqMap<I> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live members.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns `true` if the map holds no members.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Key recorded for `id`, whether or not it still resolves.
    pub fn recorded_key(&self, id: I) -> Option<SeqNum> {
        self.keys.get(&id).copied()
    }

    /// Member stored at `key`.
    pub fn id_at(&self, key: SeqNum) -> Option<I> {
        self.by_key.get(&key).copied()
    }

    /// `true` only if the entry at `id`'s recorded key still resolves to `id`.
    pub fn contains(&self, id: I) -> bool {
        self.recorded_key(id)
            .is_some_and(|key| self.contains_at(id, key))
    }

    /// `true` if `key` currently resolves to `id`. Guards against stale keys
    /// cached on element instances.
    pub fn contains_at(&self, id: I, key: SeqNum) -> bool {
        self.by_key.get(&key) == Some(&id)
    }

    /// Member with the smallest key.
    pub fn first_entry(&self) -> Option<(SeqNum, I)> {
        self.by_key.iter().next().map(|(&k, &id)| (k, id))
    }

    /// Member with the largest key.
    pub fn last_entry(&self) -> Option<(SeqNum, I)> {
        self.by_key.iter().next_back().map(|(&k, &id)| (k, id))
    }

    /// Member with the largest key below `key`.
    pub fn before(&self, key: SeqNum) -> Option<(SeqNum, I)> {
        self.by_key
            .range(..key)
            .next_back()
            .map(|(&k, &id)| (k, id))
    }

    /// Member with the smallest key above `key`.
    pub fn after(&self, key: SeqNum) -> Option<(SeqNum, I)> {
        self.by_key
            .range((Bound::Excluded(key), Bound::Unbounded))
            .next()
            .map(|(&k, &id)| (k, id))
    }

    /// Members in key order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (SeqNum, I)> + '_ {
        self.by_key.iter().map(|(&k, &id)| (k, id))
    }

    /// Entries with keys in `range`, in key order.
    pub fn range(
        &self,
        range: (Bound<SeqNum>, Bound<SeqNum>),
    ) -> impl DoubleEndedIterator<Item = (SeqNum, I)> + '_ {
        self.by_key.range(range).map(|(&k, &id)| (k, id))
    }

    /// Adds a new member at `key`.
    pub fn insert(&mut self, id: I, key: SeqNum) -> Result<()> {
        if self.by_key.contains_key(&key) {
            return Err(SeqGraphError::DuplicateKey(key));
        }
        if self.contains(id) {
            return Err(SeqGraphError::Invalid("element is already a member"));
        }
        self.by_key.insert(key, id);
        self.keys.insert(id, key);
        Ok(())
    }

    /// Moves an existing member to `key`.
    pub fn relocate(&mut self, id: I, key: SeqNum) -> Result<()> {
        if self.by_key.contains_key(&key) {
            return Err(SeqGraphError::DuplicateKey(key));
        }
        if let Some(old) = self.keys.insert(id, key) {
            self.by_key.remove(&old);
        }
        self.by_key.insert(key, id);
        Ok(())
    }

    /// Drops the mapping for `id`, returning its last key.
    pub fn remove(&mut self, id: I) -> Option<SeqNum> {
        let key = self.keys.remove(&id)?;
        if self.by_key.get(&key) == Some(&id) {
            self.by_key.remove(&key);
        }
        Some(key)
    }

    /// Replaces every key with the one assigned by `plan`.
    pub fn apply(&mut self, plan: &ReorgPlan<I>) -> Result<()> {
        if plan.assignments.len() != self.len() {
            return Err(SeqGraphError::IncompleteReorganization {
                assigned: plan.assignments.len(),
                expected: self.len(),
            });
        }
        let mut by_key = BTreeMap::new();
        let mut keys = FxHashMap::default();
        keys.reserve(plan.assignments.len());
        for &(id, key) in &plan.assignments {
            if !self.contains(id) {
                return Err(SeqGraphError::IncompleteReorganization {
                    assigned: by_key.len(),
                    expected: self.len(),
                });
            }
            if by_key.insert(key, id).is_some() {
                return Err(SeqGraphError::DuplicateKey(key));
            }
            keys.insert(id, key);
        }
        self.by_key = by_key;
        self.keys = keys;
        Ok(())
    }
}

/// Computes a free key between a list member at `target` and its current
/// neighbour at `neighbor` (on either side).
///
/// Returns `Ok(None)` when the two keys are adjacent and the list must be
/// reorganized before retrying.
pub fn free_key_between(target: SeqNum, neighbor: SeqNum) -> Result<Option<SeqNum>> {
    let distance = (i128::from(neighbor) - i128::from(target)).abs();
    match distance {
        0 => Err(SeqGraphError::DuplicateKey(target)),
        1 => Ok(None),
        2..=3 => Ok(Some(if neighbor < target {
            neighbor + 1
        } else {
            neighbor - 1
        })),
        _ => {
            let mid = (i128::from(target) + i128::from(neighbor)) / 2;
            Ok(Some(mid as SeqNum))
        }
    }
}

/// Ordered navigation and mutation over a [`SeqMap`].
///
/// Concrete lists supply the map and, where ids carry more than identity
/// (signed edge ids), a canonical form used for every lookup.
pub trait SequencedList {
    /// Element id stored in the list.
    type Id: Copy + Eq + Hash + fmt::Debug + Into<i64>;

    /// Which list this is, for errors and logs.
    const KIND: ListKind;

    /// Underlying key map.
    fn seq_map(&self) -> &SeqMap<Self::Id>;

    /// Underlying key map, mutably.
    fn seq_map_mut(&mut self) -> &mut SeqMap<Self::Id>;

    /// Form of `id` that is stored in the list.
    fn canonical(id: Self::Id) -> Self::Id {
        id
    }

    /// Number of members.
    fn len(&self) -> usize {
        self.seq_map().len()
    }

    /// Returns `true` if the list has no members.
    fn is_empty(&self) -> bool {
        self.seq_map().is_empty()
    }

    /// Returns `true` if `id` is a current member.
    fn contains(&self, id: Self::Id) -> bool {
        self.seq_map().contains(Self::canonical(id))
    }

    /// Key of a current member.
    fn key_of(&self, id: Self::Id) -> Result<SeqNum> {
        let id = Self::canonical(id);
        let map = self.seq_map();
        match map.recorded_key(id) {
            Some(key) if map.contains_at(id, key) => Ok(key),
            _ => Err(not_member::<Self>(id)),
        }
    }

    /// Member with the smallest key.
    fn first(&self) -> Option<Self::Id> {
        self.seq_map().first_entry().map(|(_, id)| id)
    }

    /// Member with the largest key.
    fn last(&self) -> Option<Self::Id> {
        self.seq_map().last_entry().map(|(_, id)| id)
    }

    /// Member ordered directly before `id`.
    fn prev(&self, id: Self::Id) -> Result<Option<Self::Id>> {
        let key = self.key_of(id)?;
        Ok(self.seq_map().before(key).map(|(_, id)| id))
    }

    /// Member ordered directly after `id`.
    fn next(&self, id: Self::Id) -> Result<Option<Self::Id>> {
        let key = self.key_of(id)?;
        Ok(self.seq_map().after(key).map(|(_, id)| id))
    }

    /// All members in list order.
    fn ids(&self) -> Vec<Self::Id> {
        self.seq_map().iter().map(|(_, id)| id).collect()
    }

    /// Makes `id` the first member, inserting it if necessary.
    fn prepend(&mut self, id: Self::Id, sink: &mut dyn SeqSink<Self::Id>) -> Result<SeqNum> {
        let id = Self::canonical(id);
        let first = self.seq_map().first_entry();
        let key = match first {
            Some((key, first)) if first == id => return Ok(key),
            None => DEFAULT_START,
            Some((min, _)) => match key_below(min) {
                Some(key) => key,
                None => {
                    self.reorganize(sink)?;
                    let (min, _) = self
                        .seq_map()
                        .first_entry()
                        .ok_or(SeqGraphError::SequenceSpaceExhausted(Self::KIND))?;
                    key_below(min).ok_or(SeqGraphError::SequenceSpaceExhausted(Self::KIND))?
                }
            },
        };
        place(self, id, key, sink)
    }

    /// Makes `id` the last member, inserting it if necessary.
    fn append(&mut self, id: Self::Id, sink: &mut dyn SeqSink<Self::Id>) -> Result<SeqNum> {
        let id = Self::canonical(id);
        let last = self.seq_map().last_entry();
        let key = match last {
            Some((key, last)) if last == id => return Ok(key),
            None => DEFAULT_START,
            Some((max, _)) => match key_above(max) {
                Some(key) => key,
                None => {
                    self.reorganize(sink)?;
                    let (max, _) = self
                        .seq_map()
                        .last_entry()
                        .ok_or(SeqGraphError::SequenceSpaceExhausted(Self::KIND))?;
                    key_above(max).ok_or(SeqGraphError::SequenceSpaceExhausted(Self::KIND))?
                }
            },
        };
        place(self, id, key, sink)
    }

    /// Moves `moved` directly before `target`.
    fn put_before(
        &mut self,
        target: Self::Id,
        moved: Self::Id,
        sink: &mut dyn SeqSink<Self::Id>,
    ) -> Result<SeqNum> {
        put_beside(self, target, moved, Side::Before, sink)
    }

    /// Moves `moved` directly after `target`.
    fn put_after(
        &mut self,
        target: Self::Id,
        moved: Self::Id,
        sink: &mut dyn SeqSink<Self::Id>,
    ) -> Result<SeqNum> {
        put_beside(self, target, moved, Side::After, sink)
    }

    /// Drops `id` from the list, returning the key it held.
    fn remove(&mut self, id: Self::Id) -> Result<SeqNum> {
        let key = self.key_of(id)?;
        self.seq_map_mut().remove(Self::canonical(id));
        Ok(key)
    }

    /// Renumbers every member with uniform spacing, keeping the order.
    fn reorganize(&mut self, sink: &mut dyn SeqSink<Self::Id>) -> Result<()> {
        let plan = Reorganizer::new(Self::KIND).plan(self.seq_map())?;
        sink.reorganized(&plan)?;
        self.seq_map_mut().apply(&plan)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Side {
    Before,
    After,
}

fn not_member<L: SequencedList + ?Sized>(id: L::Id) -> SeqGraphError {
    SeqGraphError::NotMember {
        list: L::KIND,
        id: id.into(),
    }
}

fn key_below(min: SeqNum) -> Option<SeqNum> {
    min.checked_sub(REGULAR_DISTANCE)
        .filter(|&key| key > MIN_BORDER)
}

fn key_above(max: SeqNum) -> Option<SeqNum> {
    max.checked_add(REGULAR_DISTANCE)
        .filter(|&key| key < MAX_BORDER)
}

fn place<L: SequencedList + ?Sized>(
    list: &mut L,
    id: L::Id,
    key: SeqNum,
    sink: &mut dyn SeqSink<L::Id>,
) -> Result<SeqNum> {
    if list.seq_map().contains(id) {
        list.seq_map_mut().relocate(id, key)?;
        sink.relocated(id, key)?;
    } else {
        list.seq_map_mut().insert(id, key)?;
    }
    Ok(key)
}

fn put_beside<L: SequencedList + ?Sized>(
    list: &mut L,
    target: L::Id,
    moved: L::Id,
    side: Side,
    sink: &mut dyn SeqSink<L::Id>,
) -> Result<SeqNum> {
    let target = L::canonical(target);
    let moved = L::canonical(moved);
    list.key_of(target)?;
    list.key_of(moved)?;
    if target == moved {
        return Err(SeqGraphError::SelfPlacement);
    }
    // A second pass only happens after a reorganization, which leaves a full
    // regular gap next to every member.
    for _ in 0..2 {
        let target_key = list.key_of(target)?;
        let map = list.seq_map();
        let neighbor = match side {
            Side::Before => map.before(target_key),
            Side::After => map.after(target_key),
        };
        let candidate = match neighbor {
            Some((_, id)) if id == moved => return list.key_of(moved),
            Some((neighbor_key, _)) => free_key_between(target_key, neighbor_key)?,
            None => match side {
                Side::Before => key_below(target_key),
                Side::After => key_above(target_key),
            },
        };
        match candidate {
            Some(key) => return place(list, moved, key, sink),
            None => list.reorganize(sink)?,
        }
    }
    Err(SeqGraphError::SequenceSpaceExhausted(L::KIND))
}
