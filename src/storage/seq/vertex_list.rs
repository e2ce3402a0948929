use tracing::trace;

use super::{ReorgPlan, SeqMap, SeqSink, SequencedList};
use crate::storage::graph_db::DbContext;
use crate::types::{GraphId, ListKind, Result, SeqNum, VertexId};

/// Global vertex order of one graph (VSeq).
#[derive(Clone, Debug, Default)]
pub struct VertexList {
    map: SeqMap<VertexId>,
}

impl VertexList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the list from stored `(id, key)` pairs.
    pub fn restore(rows: impl IntoIterator<Item = (VertexId, SeqNum)>) -> Result<Self> {
        let mut map = SeqMap::new();
        for (id, key) in rows {
            map.insert(id, key)?;
        }
        Ok(Self { map })
    }
}

impl SequencedList for VertexList {
    type Id = VertexId;
    const KIND: ListKind = ListKind::Vertex;

    fn seq_map(&self) -> &SeqMap<VertexId> {
        &self.map
    }

    fn seq_map_mut(&mut self) -> &mut SeqMap<VertexId> {
        &mut self.map
    }
}

/// Mirrors vertex-list key changes onto resident vertices and vertex rows.
pub(crate) struct VertexListSink<'a> {
    ctx: &'a DbContext,
    graph: GraphId,
    loading: bool,
}

impl<'a> VertexListSink<'a> {
    pub(crate) fn new(ctx: &'a DbContext, graph: GraphId, loading: bool) -> Self {
        Self {
            ctx,
            graph,
            loading,
        }
    }

    fn set_resident_key(&self, id: VertexId, key: SeqNum) {
        if let Some(vertex) = self.ctx.vertices.borrow().peek(self.graph, id.into()) {
            vertex.borrow_mut().seq = key;
        }
    }
}

impl SeqSink<VertexId> for VertexListSink<'_> {
    fn relocated(&mut self, id: VertexId, key: SeqNum) -> Result<()> {
        trace!(graph = %self.graph, vertex = %id, key, "vertex moved");
        if !self.loading {
            self.ctx.backend.update_vertex_seq(self.graph, id, key)?;
        }
        self.set_resident_key(id, key);
        Ok(())
    }

    fn reorganized(&mut self, plan: &ReorgPlan<VertexId>) -> Result<()> {
        // Stored rows are renumbered by their stored order even while
        // loading; per-row moves are what loading holds back.
        self.ctx
            .backend
            .renumber_vertex_list(self.graph, plan.start, plan.distance)?;
        for &(id, key) in &plan.assignments {
            self.set_resident_key(id, key);
        }
        self.ctx.metrics.list_reorganized(ListKind::Vertex);
        Ok(())
    }
}
