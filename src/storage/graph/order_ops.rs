use tracing::trace;

use super::Graph;
use crate::storage::seq::{
    Direction, EdgeListSink, IncidenceListSink, SeqSink, SequencedList, VertexListSink,
};
use crate::types::{EdgeId, Result, SeqNum, VertexId};

/// Reordering requested on one of the lists.
#[derive(Clone, Copy, Debug)]
enum Placement<I> {
    Prepend,
    Append,
    Before(I),
    After(I),
}

impl Graph<'_> {
    /// First vertex of the global order.
    pub fn first_vertex(&self) -> Option<VertexId> {
        self.vertices.first()
    }

    /// Last vertex of the global order.
    pub fn last_vertex(&self) -> Option<VertexId> {
        self.vertices.last()
    }

    /// Vertex after `id`; fails if `id` is not a vertex of this graph.
    pub fn next_vertex(&self, id: VertexId) -> Result<Option<VertexId>> {
        self.vertices.next(id)
    }

    /// Vertex before `id`; fails if `id` is not a vertex of this graph.
    pub fn prev_vertex(&self, id: VertexId) -> Result<Option<VertexId>> {
        self.vertices.prev(id)
    }

    /// Vertex ids in global order.
    pub fn vertex_ids(&self) -> Vec<VertexId> {
        self.vertices.ids()
    }

    /// Moves `id` to the front of the vertex order.
    pub fn prepend_vertex(&mut self, id: VertexId) -> Result<()> {
        self.place_vertex(id, Placement::Prepend)
    }

    /// Moves `id` to the back of the vertex order.
    pub fn append_vertex(&mut self, id: VertexId) -> Result<()> {
        self.place_vertex(id, Placement::Append)
    }

    /// Moves `moved` directly before `target` in the vertex order.
    pub fn put_vertex_before(&mut self, target: VertexId, moved: VertexId) -> Result<()> {
        self.place_vertex(moved, Placement::Before(target))
    }

    /// Moves `moved` directly after `target` in the vertex order.
    pub fn put_vertex_after(&mut self, target: VertexId, moved: VertexId) -> Result<()> {
        self.place_vertex(moved, Placement::After(target))
    }

    /// First edge of the global order.
    pub fn first_edge(&self) -> Option<EdgeId> {
        self.edges.first()
    }

    /// Last edge of the global order.
    pub fn last_edge(&self) -> Option<EdgeId> {
        self.edges.last()
    }

    /// Edge after `id`; fails if `id` is not an edge of this graph.
    pub fn next_edge(&self, id: EdgeId) -> Result<Option<EdgeId>> {
        self.edges.next(id)
    }

    /// Edge before `id`; fails if `id` is not an edge of this graph.
    pub fn prev_edge(&self, id: EdgeId) -> Result<Option<EdgeId>> {
        self.edges.prev(id)
    }

    /// Normal edge ids in global order.
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.ids()
    }

    /// Moves `id` to the front of the edge order.
    pub fn prepend_edge(&mut self, id: EdgeId) -> Result<()> {
        self.place_edge(id, Placement::Prepend)
    }

    /// Moves `id` to the back of the edge order.
    pub fn append_edge(&mut self, id: EdgeId) -> Result<()> {
        self.place_edge(id, Placement::Append)
    }

    /// Moves `moved` directly before `target` in the edge order.
    pub fn put_edge_before(&mut self, target: EdgeId, moved: EdgeId) -> Result<()> {
        self.place_edge(moved, Placement::Before(target))
    }

    /// Moves `moved` directly after `target` in the edge order.
    pub fn put_edge_after(&mut self, target: EdgeId, moved: EdgeId) -> Result<()> {
        self.place_edge(moved, Placement::After(target))
    }

    /// Signed incidence ids of `vertex` in local order.
    pub fn incidences(&self, vertex: VertexId) -> Result<Vec<EdgeId>> {
        let vertex = self.require_vertex(vertex)?;
        let ids = vertex.borrow().incidences.ids();
        Ok(ids)
    }

    /// Number of incidences of `vertex` pointing in `direction`. A self-loop
    /// counts once in each direction.
    pub fn degree(&self, vertex: VertexId, direction: Direction) -> Result<usize> {
        let vertex = self.require_vertex(vertex)?;
        let degree = vertex.borrow().incidences.degree(direction);
        Ok(degree)
    }

    /// First incidence of `vertex` pointing in `direction`.
    pub fn first_incidence(&self, vertex: VertexId, direction: Direction) -> Result<Option<EdgeId>> {
        let vertex = self.require_vertex(vertex)?;
        let first = vertex.borrow().incidences.first_with(direction);
        Ok(first)
    }

    /// Last incidence of `vertex` pointing in `direction`.
    pub fn last_incidence(&self, vertex: VertexId, direction: Direction) -> Result<Option<EdgeId>> {
        let vertex = self.require_vertex(vertex)?;
        let last = vertex.borrow().incidences.last_with(direction);
        Ok(last)
    }

    /// Incidence after the signed `edge` at `vertex`.
    pub fn next_incidence(
        &self,
        vertex: VertexId,
        edge: EdgeId,
        direction: Direction,
    ) -> Result<Option<EdgeId>> {
        let vertex = self.require_vertex(vertex)?;
        let next = vertex.borrow().incidences.next_with(edge, direction);
        next
    }

    /// Incidence before the signed `edge` at `vertex`.
    pub fn prev_incidence(
        &self,
        vertex: VertexId,
        edge: EdgeId,
        direction: Direction,
    ) -> Result<Option<EdgeId>> {
        let vertex = self.require_vertex(vertex)?;
        let prev = vertex.borrow().incidences.prev_with(edge, direction);
        prev
    }

    /// Moves the signed incidence `edge` to the front of `vertex`'s list.
    pub fn prepend_incidence(&mut self, vertex: VertexId, edge: EdgeId) -> Result<()> {
        self.place_incidence(vertex, edge, Placement::Prepend)
    }

    /// Moves the signed incidence `edge` to the back of `vertex`'s list.
    pub fn append_incidence(&mut self, vertex: VertexId, edge: EdgeId) -> Result<()> {
        self.place_incidence(vertex, edge, Placement::Append)
    }

    /// Moves incidence `moved` directly before `target` at `vertex`.
    pub fn put_incidence_before(
        &mut self,
        vertex: VertexId,
        target: EdgeId,
        moved: EdgeId,
    ) -> Result<()> {
        self.place_incidence(vertex, moved, Placement::Before(target))
    }

    /// Moves incidence `moved` directly after `target` at `vertex`.
    pub fn put_incidence_after(
        &mut self,
        vertex: VertexId,
        target: EdgeId,
        moved: EdgeId,
    ) -> Result<()> {
        self.place_incidence(vertex, moved, Placement::After(target))
    }

    fn place_vertex(&mut self, id: VertexId, placement: Placement<VertexId>) -> Result<()> {
        // Prepend and append would insert a non-member.
        let before = self.vertices.key_of(id)?;
        let mut sink = VertexListSink::new(self.ctx, self.id, self.loading);
        let after = place(&mut self.vertices, id, placement, &mut sink)?;
        if after != before {
            trace!(graph = %self.id, vertex = %id, from = before, to = after, "vertex reordered");
            self.bump_vertex_list_version()?;
            self.bump_graph_version()?;
        }
        Ok(())
    }

    fn place_edge(&mut self, id: EdgeId, placement: Placement<EdgeId>) -> Result<()> {
        let before = self.edges.key_of(id)?;
        let mut sink = EdgeListSink::new(self.ctx, self.id, self.loading);
        let after = place(&mut self.edges, id, placement, &mut sink)?;
        if after != before {
            trace!(graph = %self.id, edge = %id, from = before, to = after, "edge reordered");
            self.bump_edge_list_version()?;
            self.bump_graph_version()?;
        }
        Ok(())
    }

    fn place_incidence(
        &mut self,
        vertex: VertexId,
        edge: EdgeId,
        placement: Placement<EdgeId>,
    ) -> Result<()> {
        let resident = self.require_vertex(vertex)?;
        let (before, after) = {
            let mut instance = resident.borrow_mut();
            let before = instance.incidences.key_of(edge)?;
            let mut sink = IncidenceListSink::new(self.ctx, self.id, vertex, self.loading);
            let after = place(&mut instance.incidences, edge, placement, &mut sink)?;
            (before, after)
        };
        if after != before {
            trace!(graph = %self.id, %vertex, %edge, from = before, to = after, "incidence reordered");
            self.bump_incidence_version(vertex, Some(&resident))?;
            self.bump_graph_version()?;
        }
        Ok(())
    }
}

fn place<L: SequencedList>(
    list: &mut L,
    id: L::Id,
    placement: Placement<L::Id>,
    sink: &mut dyn SeqSink<L::Id>,
) -> Result<SeqNum> {
    match placement {
        Placement::Prepend => list.prepend(id, sink),
        Placement::Append => list.append(id, sink),
        Placement::Before(target) => list.put_before(target, id, sink),
        Placement::After(target) => list.put_after(target, id, sink),
    }
}
