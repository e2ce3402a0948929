#![allow(missing_docs)]

use std::collections::HashSet;

use proptest::prelude::*;
use seqgraph::storage::seq::{
    Detached, IncidenceList, ReorgPlan, SeqSink, SequencedList, VertexList, MAX_BORDER, MIN_BORDER,
    REGULAR_DISTANCE,
};
use seqgraph::types::{EdgeId, Result, SeqNum, VertexId};

#[derive(Debug, Clone)]
enum Op {
    Append(u32),
    Prepend(u32),
    PutBefore { target: usize, moved: usize },
    PutAfter { target: usize, moved: usize },
    Remove(usize),
    /// Inserts `count` fresh members one by one directly before `target`.
    Squeeze { target: usize, count: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1u32..=24).prop_map(Op::Append),
        2 => (1u32..=24).prop_map(Op::Prepend),
        3 => (any::<usize>(), any::<usize>())
            .prop_map(|(target, moved)| Op::PutBefore { target, moved }),
        3 => (any::<usize>(), any::<usize>())
            .prop_map(|(target, moved)| Op::PutAfter { target, moved }),
        1 => any::<usize>().prop_map(Op::Remove),
        1 => (any::<usize>(), 30usize..=40)
            .prop_map(|(target, count)| Op::Squeeze { target, count }),
    ]
}

#[derive(Default)]
struct Counting {
    reorganizations: usize,
    relocations: usize,
}

impl SeqSink<VertexId> for Counting {
    fn relocated(&mut self, _id: VertexId, _key: SeqNum) -> Result<()> {
        self.relocations += 1;
        Ok(())
    }

    fn reorganized(&mut self, _plan: &ReorgPlan<VertexId>) -> Result<()> {
        self.reorganizations += 1;
        Ok(())
    }
}

fn walk(list: &VertexList) -> Vec<VertexId> {
    let mut out = Vec::with_capacity(list.len());
    let mut cursor = list.first();
    while let Some(id) = cursor {
        out.push(id);
        cursor = list.next(id).expect("walked member");
    }
    out
}

fn walk_back(list: &VertexList) -> Vec<VertexId> {
    let mut out = Vec::with_capacity(list.len());
    let mut cursor = list.last();
    while let Some(id) = cursor {
        out.push(id);
        cursor = list.prev(id).expect("walked member");
    }
    out.reverse();
    out
}

fn assert_keys_well_formed(list: &VertexList) {
    let keys: Vec<SeqNum> = list.seq_map().iter().map(|(key, _)| key).collect();
    let unique: HashSet<SeqNum> = keys.iter().copied().collect();
    assert_eq!(unique.len(), keys.len(), "duplicate keys: {keys:?}");
    assert!(keys.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(keys.iter().all(|&key| key > MIN_BORDER && key < MAX_BORDER));
}

fn move_in_model(model: &mut Vec<VertexId>, target: VertexId, moved: VertexId, after: bool) {
    model.retain(|&id| id != moved);
    let at = model
        .iter()
        .position(|&id| id == target)
        .expect("target in model");
    model.insert(if after { at + 1 } else { at }, moved);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn walking_reproduces_operation_order(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut list = VertexList::new();
        let mut model: Vec<VertexId> = Vec::new();
        let mut sink = Counting::default();
        let mut fresh = 1_000u32;

        for op in ops {
            match op {
                Op::Append(n) => {
                    let id = VertexId(n);
                    let previous_last = list.last();
                    let key = list.append(id, &mut sink).unwrap();
                    model.retain(|&m| m != id);
                    model.push(id);
                    if let Some(previous_last) = previous_last.filter(|&last| last != id) {
                        prop_assert_eq!(key, list.key_of(previous_last).unwrap() + REGULAR_DISTANCE);
                    }
                }
                Op::Prepend(n) => {
                    let id = VertexId(n);
                    list.prepend(id, &mut sink).unwrap();
                    model.retain(|&m| m != id);
                    model.insert(0, id);
                }
                Op::PutBefore { target, moved } | Op::PutAfter { target, moved } if model.len() >= 2 => {
                    let after = matches!(op, Op::PutAfter { .. });
                    let target = model[target % model.len()];
                    let mut moved = model[moved % model.len()];
                    if moved == target {
                        moved = model[(model.iter().position(|&m| m == target).unwrap() + 1) % model.len()];
                    }
                    if after {
                        list.put_after(target, moved, &mut sink).unwrap();
                        prop_assert_eq!(list.next(target).unwrap(), Some(moved));
                    } else {
                        list.put_before(target, moved, &mut sink).unwrap();
                        prop_assert_eq!(list.prev(target).unwrap(), Some(moved));
                    }
                    move_in_model(&mut model, target, moved, after);
                }
                Op::PutBefore { .. } | Op::PutAfter { .. } => {}
                Op::Remove(at) if !model.is_empty() => {
                    let id = model.remove(at % model.len());
                    list.remove(id).unwrap();
                    prop_assert!(!list.contains(id));
                }
                Op::Remove(_) => {}
                Op::Squeeze { target, count } if !model.is_empty() => {
                    let target = model[target % model.len()];
                    for _ in 0..count {
                        let id = VertexId(fresh);
                        fresh += 1;
                        list.append(id, &mut sink).unwrap();
                        list.put_before(target, id, &mut sink).unwrap();
                        prop_assert_eq!(list.prev(target).unwrap(), Some(id));
                        model.push(id);
                        move_in_model(&mut model, target, id, false);
                    }
                }
                Op::Squeeze { .. } => {}
            }
            prop_assert_eq!(walk(&list), model.clone());
            assert_keys_well_formed(&list);
        }
        prop_assert_eq!(walk_back(&list), model);
    }

    #[test]
    fn reorganize_preserves_order_and_membership(
        keys in prop::collection::btree_set(-(1i64 << 40)..(1i64 << 40), 1..200)
    ) {
        let mut list = VertexList::restore(
            keys.iter().enumerate().map(|(rank, &key)| (VertexId(rank as u32 + 1), key)),
        ).unwrap();
        let before = list.ids();

        list.reorganize(&mut Detached).unwrap();

        prop_assert_eq!(list.ids(), before.clone());
        let renumbered: Vec<SeqNum> = list.seq_map().iter().map(|(key, _)| key).collect();
        prop_assert!(renumbered.windows(2).all(|pair| pair[1] - pair[0] == REGULAR_DISTANCE));
        let pivot = before[before.len() / 2];
        prop_assert_eq!(list.key_of(pivot).unwrap(), 0);
    }

    #[test]
    fn signed_incidences_resolve_independently(edges in prop::collection::vec(1i32..500, 1..40)) {
        let owner = VertexId(1);
        let mut list = IncidenceList::new(owner);
        let mut expected = Vec::new();
        for edge in edges {
            let normal = EdgeId(edge);
            if expected.contains(&normal) {
                continue;
            }
            list.append(normal, &mut Detached).unwrap();
            list.append(normal.reversed(), &mut Detached).unwrap();
            expected.push(normal);
            expected.push(normal.reversed());
        }
        prop_assert_eq!(list.ids(), expected.clone());
        for pair in expected.chunks(2) {
            prop_assert_eq!(list.next(pair[0]).unwrap(), Some(pair[1]));
        }
    }
}

#[test]
fn scenario_append_append_prepend() -> Result<()> {
    let mut list = VertexList::new();
    let (a, b, c) = (VertexId(1), VertexId(2), VertexId(3));
    assert_eq!(list.append(a, &mut Detached)?, 0);
    assert_eq!(list.append(b, &mut Detached)?, REGULAR_DISTANCE);
    assert_eq!(list.prepend(c, &mut Detached)?, -REGULAR_DISTANCE);
    assert_eq!(walk(&list), vec![c, a, b]);
    Ok(())
}

#[test]
fn collapsing_gap_before_a_member_reorganizes_transparently() -> Result<()> {
    let mut list = VertexList::new();
    let anchor = VertexId(1);
    list.append(VertexId(0), &mut Detached)?;
    list.append(anchor, &mut Detached)?;
    let mut sink = Counting::default();
    let mut inserted = Vec::new();
    let mut next = 2;
    while sink.reorganizations == 0 {
        let id = VertexId(next);
        next += 1;
        list.append(id, &mut sink)?;
        list.put_before(anchor, id, &mut sink)?;
        inserted.push(id);
        assert!(next < 80, "gap never collapsed");
    }
    assert_eq!(sink.reorganizations, 1);
    assert!(sink.relocations >= inserted.len());

    let mut expected = vec![VertexId(0)];
    expected.extend(inserted.iter().copied());
    expected.push(anchor);
    assert_eq!(walk(&list), expected);
    assert_keys_well_formed(&list);
    Ok(())
}

#[test]
fn prepend_reorganizes_at_the_lower_border() -> Result<()> {
    let mut list = VertexList::new();
    list.seq_map_mut().insert(VertexId(1), MIN_BORDER + 3)?;
    list.seq_map_mut().insert(VertexId(2), MIN_BORDER + 9)?;
    let mut sink = Counting::default();
    let key = list.prepend(VertexId(3), &mut sink)?;
    assert_eq!(sink.reorganizations, 1);
    assert!(key > MIN_BORDER);
    assert_eq!(walk(&list), vec![VertexId(3), VertexId(1), VertexId(2)]);
    Ok(())
}
