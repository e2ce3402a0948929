use tracing::trace;

use super::{ReorgPlan, SeqMap, SeqSink, SequencedList};
use crate::storage::graph_db::DbContext;
use crate::types::{EdgeId, GraphId, ListKind, Result, SeqNum, VertexId};

/// Which incidences of a vertex to consider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    /// Edges starting at the vertex (normal ids).
    Out,
    /// Edges ending at the vertex (reversed ids).
    In,
    /// Both.
    #[default]
    Any,
}

impl Direction {
    /// Returns `true` if the signed incidence `edge` points this way.
    pub fn admits(self, edge: EdgeId) -> bool {
        match self {
            Direction::Out => edge.is_normal(),
            Direction::In => !edge.is_normal(),
            Direction::Any => true,
        }
    }
}

/// Local edge order of one vertex (LambdaSeq).
///
/// Entries are signed edge ids: `+e` where the vertex is the start of `e`,
/// `-e` where it is the end. A self-loop appears twice.
#[derive(Clone, Debug)]
pub struct IncidenceList {
    owner: VertexId,
    map: SeqMap<EdgeId>,
}

impl IncidenceList {
    /// Creates an empty list for `owner`.
    pub fn new(owner: VertexId) -> Self {
        Self {
            owner,
            map: SeqMap::new(),
        }
    }

    /// Rebuilds the list of `owner` from stored `(signed id, key)` pairs.
    pub fn restore(
        owner: VertexId,
        rows: impl IntoIterator<Item = (EdgeId, SeqNum)>,
    ) -> Result<Self> {
        let mut list = Self::new(owner);
        for (edge, key) in rows {
            list.map.insert(edge, key)?;
        }
        Ok(list)
    }

    /// Vertex the list belongs to.
    pub fn owner(&self) -> VertexId {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: VertexId) {
        self.owner = owner;
    }

    /// Number of incidences pointing in `direction`.
    pub fn degree(&self, direction: Direction) -> usize {
        match direction {
            Direction::Any => self.len(),
            _ => self
                .map
                .iter()
                .filter(|&(_, edge)| direction.admits(edge))
                .count(),
        }
    }

    /// First incidence pointing in `direction`.
    pub fn first_with(&self, direction: Direction) -> Option<EdgeId> {
        self.map
            .iter()
            .map(|(_, edge)| edge)
            .find(|&edge| direction.admits(edge))
    }

    /// Last incidence pointing in `direction`.
    pub fn last_with(&self, direction: Direction) -> Option<EdgeId> {
        self.map
            .iter()
            .rev()
            .map(|(_, edge)| edge)
            .find(|&edge| direction.admits(edge))
    }

    /// Incidence after `edge` pointing in `direction`.
    pub fn next_with(&self, edge: EdgeId, direction: Direction) -> Result<Option<EdgeId>> {
        let key = self.key_of(edge)?;
        Ok(self
            .map
            .range((std::ops::Bound::Excluded(key), std::ops::Bound::Unbounded))
            .map(|(_, edge)| edge)
            .find(|&edge| direction.admits(edge)))
    }

    /// Incidence before `edge` pointing in `direction`.
    pub fn prev_with(&self, edge: EdgeId, direction: Direction) -> Result<Option<EdgeId>> {
        let key = self.key_of(edge)?;
        Ok(self
            .map
            .range((std::ops::Bound::Unbounded, std::ops::Bound::Excluded(key)))
            .rev()
            .map(|(_, edge)| edge)
            .find(|&edge| direction.admits(edge)))
    }
}

impl SequencedList for IncidenceList {
    type Id = EdgeId;
    const KIND: ListKind = ListKind::Incidence;

    fn seq_map(&self) -> &SeqMap<EdgeId> {
        &self.map
    }

    fn seq_map_mut(&mut self) -> &mut SeqMap<EdgeId> {
        &mut self.map
    }
}

/// Mirrors incidence key changes onto resident edges and incidence rows.
pub(crate) struct IncidenceListSink<'a> {
    ctx: &'a DbContext,
    graph: GraphId,
    owner: VertexId,
    loading: bool,
}

impl<'a> IncidenceListSink<'a> {
    pub(crate) fn new(ctx: &'a DbContext, graph: GraphId, owner: VertexId, loading: bool) -> Self {
        Self {
            ctx,
            graph,
            owner,
            loading,
        }
    }

    fn set_resident_key(&self, edge: EdgeId, key: SeqNum) {
        let resident = self
            .ctx
            .edges
            .borrow()
            .peek(self.graph, edge.normal().into());
        if let Some(instance) = resident {
            instance.borrow_mut().set_incidence_seq(edge, key);
        }
    }
}

impl SeqSink<EdgeId> for IncidenceListSink<'_> {
    fn relocated(&mut self, edge: EdgeId, key: SeqNum) -> Result<()> {
        trace!(graph = %self.graph, vertex = %self.owner, edge = %edge, key, "incidence moved");
        if !self.loading {
            self.ctx
                .backend
                .update_incidence_seq(self.graph, self.owner, edge, key)?;
        }
        self.set_resident_key(edge, key);
        Ok(())
    }

    fn reorganized(&mut self, plan: &ReorgPlan<EdgeId>) -> Result<()> {
        self.ctx.backend.renumber_incidence_list(
            self.graph,
            self.owner,
            plan.start,
            plan.distance,
        )?;
        for &(edge, key) in &plan.assignments {
            self.set_resident_key(edge, key);
        }
        self.ctx.metrics.list_reorganized(ListKind::Incidence);
        Ok(())
    }
}
