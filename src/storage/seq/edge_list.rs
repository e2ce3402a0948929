use tracing::trace;

use super::{ReorgPlan, SeqMap, SeqSink, SequencedList};
use crate::storage::graph_db::DbContext;
use crate::types::{EdgeId, GraphId, ListKind, Result, SeqNum};

/// Global edge order of one graph (ESeq).
///
/// Only normal edge ids are stored; a reversed id passed to any operation is
/// resolved to its normal form first.
#[derive(Clone, Debug, Default)]
pub struct EdgeList {
    map: SeqMap<EdgeId>,
}

impl EdgeList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the list from stored `(id, key)` pairs.
    pub fn restore(rows: impl IntoIterator<Item = (EdgeId, SeqNum)>) -> Result<Self> {
        let mut map = SeqMap::new();
        for (id, key) in rows {
            map.insert(id.normal(), key)?;
        }
        Ok(Self { map })
    }
}

impl SequencedList for EdgeList {
    type Id = EdgeId;
    const KIND: ListKind = ListKind::Edge;

    fn seq_map(&self) -> &SeqMap<EdgeId> {
        &self.map
    }

    fn seq_map_mut(&mut self) -> &mut SeqMap<EdgeId> {
        &mut self.map
    }

    fn canonical(id: EdgeId) -> EdgeId {
        id.normal()
    }
}

/// Mirrors edge-list key changes onto resident edges and edge rows.
pub(crate) struct EdgeListSink<'a> {
    ctx: &'a DbContext,
    graph: GraphId,
    loading: bool,
}

impl<'a> EdgeListSink<'a> {
    pub(crate) fn new(ctx: &'a DbContext, graph: GraphId, loading: bool) -> Self {
        Self {
            ctx,
            graph,
            loading,
        }
    }

    fn set_resident_key(&self, id: EdgeId, key: SeqNum) {
        if let Some(edge) = self.ctx.edges.borrow().peek(self.graph, id.into()) {
            edge.borrow_mut().seq = key;
        }
    }
}

impl SeqSink<EdgeId> for EdgeListSink<'_> {
    fn relocated(&mut self, id: EdgeId, key: SeqNum) -> Result<()> {
        trace!(graph = %self.graph, edge = %id, key, "edge moved");
        if !self.loading {
            self.ctx.backend.update_edge_seq(self.graph, id, key)?;
        }
        self.set_resident_key(id, key);
        Ok(())
    }

    fn reorganized(&mut self, plan: &ReorgPlan<EdgeId>) -> Result<()> {
        self.ctx
            .backend
            .renumber_edge_list(self.graph, plan.start, plan.distance)?;
        for &(id, key) in &plan.assignments {
            self.set_resident_key(id, key);
        }
        self.ctx.metrics.list_reorganized(ListKind::Edge);
        Ok(())
    }
}
