use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use super::Graph;
use crate::backend::{EdgeRow, IncidenceRow};
use crate::schema::AttrValue;
use crate::storage::element::{flags, Edge, EdgeRef, VertexRef};
use crate::storage::seq::{EdgeListSink, IncidenceListSink, SequencedList};
use crate::types::{BackendError, EdgeId, ElementKind, ListKind, Result, SeqGraphError, VertexId};

impl Graph<'_> {
    /// Creates an edge of type `type_name` from `alpha` to `omega`.
    pub fn create_edge(
        &mut self,
        type_name: &str,
        alpha: VertexId,
        omega: VertexId,
    ) -> Result<EdgeRef> {
        self.create_edge_with(type_name, alpha, omega, &[])
    }

    /// Creates an edge from `alpha` to `omega`, overriding the named
    /// attributes.
    ///
    /// The normal id is appended to `alpha`'s incidence list and the reversed
    /// id to `omega`'s.
    pub fn create_edge_with(
        &mut self,
        type_name: &str,
        alpha: VertexId,
        omega: VertexId,
        attrs: &[(&str, AttrValue)],
    ) -> Result<EdgeRef> {
        let type_id = self.ctx.schema.type_id(ElementKind::Edge, type_name)?;
        let attrs = self.initial_attrs(type_id, attrs)?;
        let alpha_vertex = self.require_vertex(alpha)?;
        let omega_vertex = self.require_vertex(omega)?;
        let mut edge = Edge::new(self.id, type_id, alpha, omega, attrs);

        let index = self.edge_ids.allocate()?;
        let id = match EdgeId::from_index(index) {
            Ok(id) => id,
            Err(err) => {
                self.edge_ids.release(index)?;
                return Err(err);
            }
        };
        let mut sink = EdgeListSink::new(self.ctx, self.id, self.loading);
        let seq = match self.edges.append(id, &mut sink) {
            Ok(seq) => seq,
            Err(err) => {
                self.edge_ids.release(index)?;
                return Err(err);
            }
        };
        self.append_incidence_entry(&alpha_vertex, id)?;
        self.append_incidence_entry(&omega_vertex, id.reversed())?;
        // Read both keys back: on a self-loop the second append may have
        // renumbered the first.
        let alpha_seq = alpha_vertex.borrow().incidences.key_of(id)?;
        let omega_seq = omega_vertex.borrow().incidences.key_of(id.reversed())?;
        edge.id = id;
        edge.seq = seq;
        edge.alpha_seq = alpha_seq;
        edge.omega_seq = omega_seq;

        let backend = &self.ctx.backend;
        backend.insert_edge(
            self.id,
            &EdgeRow {
                id,
                type_id,
                seq,
                alpha,
                omega,
                alpha_seq,
                omega_seq,
            },
        )?;
        backend.insert_incidence(
            self.id,
            alpha,
            IncidenceRow {
                edge: id,
                seq: alpha_seq,
            },
        )?;
        backend.insert_incidence(
            self.id,
            omega,
            IncidenceRow {
                edge: id.reversed(),
                seq: omega_seq,
            },
        )?;
        self.store_attrs(ElementKind::Edge, id.into(), &edge.attrs)?;
        edge.flags = flags::PERSISTENT | flags::INITIALIZED;

        let edge = Rc::new(RefCell::new(edge));
        self.ctx
            .edges
            .borrow_mut()
            .put(self.id, id.into(), Rc::clone(&edge));
        self.bump_incidence_version(alpha, Some(&alpha_vertex))?;
        if omega != alpha {
            self.bump_incidence_version(omega, Some(&omega_vertex))?;
        }
        self.bump_edge_list_version()?;
        self.bump_graph_version()?;
        self.ctx.metrics.edge_created();
        debug!(graph = %self.id, edge = %id, %alpha, %omega, seq, "edge created");
        Ok(edge)
    }

    /// Returns `true` if `id` (in either direction) names a live edge of
    /// this graph.
    pub fn contains_edge(&self, id: EdgeId) -> bool {
        id != EdgeId::UNASSIGNED && self.edge_ids.in_range(id.index()) && self.edges.contains(id)
    }

    /// Edge `id`, loading it from the backend if it is not cached. A reversed
    /// id resolves to the same instance as the normal one. Returns `Ok(None)`
    /// if the graph has no such edge.
    pub fn get_edge(&self, id: EdgeId) -> Result<Option<EdgeRef>> {
        if !self.contains_edge(id) {
            return Ok(None);
        }
        let id = id.normal();
        let cached = self.ctx.edges.borrow_mut().get(self.id, id.into());
        self.ctx.metrics.cache_lookup(cached.is_some());
        if let Some(edge) = cached {
            if edge.borrow().is_valid() {
                return Ok(Some(edge));
            }
        }

        let row = self
            .ctx
            .backend
            .fetch_edge(self.id, id)?
            .ok_or(BackendError::MissingRow("edge"))?;
        let attrs = self.load_attrs(ElementKind::Edge, row.type_id, id.into())?;
        self.ctx.metrics.backend_fetch();

        let edge = Rc::new(RefCell::new(Edge {
            graph: self.id,
            id,
            type_id: row.type_id,
            seq: self.edges.key_of(id)?,
            flags: flags::PERSISTENT | flags::INITIALIZED,
            attrs,
            alpha: row.alpha,
            omega: row.omega,
            alpha_seq: row.alpha_seq,
            omega_seq: row.omega_seq,
        }));
        self.ctx
            .edges
            .borrow_mut()
            .put(self.id, id.into(), Rc::clone(&edge));
        Ok(Some(edge))
    }

    /// Deletes edge `id` (either direction). Returns `false` if the graph has
    /// no such edge.
    pub fn delete_edge(&mut self, id: EdgeId) -> Result<bool> {
        let Some(edge) = self.get_edge(id)? else {
            return Ok(false);
        };
        let id = id.normal();
        let (alpha, omega) = {
            let edge = edge.borrow();
            (edge.alpha, edge.omega)
        };

        self.edges.remove(id)?;
        self.edge_ids.release(id.index())?;
        // Vertices that are not resident reload their incidences from the
        // backend, where the rows are gone below.
        let alpha_vertex = self.ctx.vertices.borrow().peek(self.id, alpha.into());
        let omega_vertex = self.ctx.vertices.borrow().peek(self.id, omega.into());
        if let Some(vertex) = &alpha_vertex {
            vertex.borrow_mut().incidences.remove(id)?;
        }
        if let Some(vertex) = &omega_vertex {
            vertex.borrow_mut().incidences.remove(id.reversed())?;
        }
        self.bump_incidence_version(alpha, alpha_vertex.as_ref())?;
        if omega != alpha {
            self.bump_incidence_version(omega, omega_vertex.as_ref())?;
        }
        self.ctx.edges.borrow_mut().remove(self.id, id.into());

        let backend = &self.ctx.backend;
        backend.delete_attributes(self.id, ElementKind::Edge, id.into())?;
        backend.delete_incidences(self.id, id)?;
        backend.delete_edge(self.id, id)?;
        edge.borrow_mut().invalidate();

        self.bump_edge_list_version()?;
        self.bump_graph_version()?;
        self.ctx.metrics.edge_deleted();
        debug!(graph = %self.id, edge = %id, "edge deleted");
        Ok(true)
    }

    pub(super) fn require_vertex(&self, id: VertexId) -> Result<VertexRef> {
        self.get_vertex(id)?.ok_or(SeqGraphError::NotMember {
            list: ListKind::Vertex,
            id: id.into(),
        })
    }

    fn append_incidence_entry(&self, vertex: &VertexRef, view: EdgeId) -> Result<()> {
        let owner = vertex.borrow().id;
        let mut sink = IncidenceListSink::new(self.ctx, self.id, owner, self.loading);
        vertex.borrow_mut().incidences.append(view, &mut sink)?;
        Ok(())
    }
}
