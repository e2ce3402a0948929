use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use super::Graph;
use crate::backend::VertexRow;
use crate::schema::AttrValue;
use crate::storage::element::{flags, Vertex, VertexRef};
use crate::storage::seq::{IncidenceList, SequencedList, VertexListSink};
use crate::types::{BackendError, EdgeId, ElementKind, Result, VertexId};

impl Graph<'_> {
    /// Creates a vertex of type `type_name` with default attributes.
    pub fn create_vertex(&mut self, type_name: &str) -> Result<VertexRef> {
        self.create_vertex_with(type_name, &[])
    }

    /// Creates a vertex of type `type_name`, overriding the named attributes.
    pub fn create_vertex_with(
        &mut self,
        type_name: &str,
        attrs: &[(&str, AttrValue)],
    ) -> Result<VertexRef> {
        let type_id = self.ctx.schema.type_id(ElementKind::Vertex, type_name)?;
        let attrs = self.initial_attrs(type_id, attrs)?;
        let mut vertex = Vertex::new(self.id, type_id, attrs);

        let index = self.vertex_ids.allocate()?;
        let id = VertexId(index);
        let mut sink = VertexListSink::new(self.ctx, self.id, self.loading);
        let seq = match self.vertices.append(id, &mut sink) {
            Ok(seq) => seq,
            Err(err) => {
                self.vertex_ids.release(index)?;
                return Err(err);
            }
        };
        vertex.id = id;
        vertex.seq = seq;
        vertex.incidences.set_owner(id);

        self.ctx.backend.insert_vertex(
            self.id,
            &VertexRow {
                id,
                type_id,
                seq,
                incidence_version: 0,
            },
        )?;
        self.store_attrs(ElementKind::Vertex, id.into(), &vertex.attrs)?;
        vertex.flags = flags::PERSISTENT | flags::INITIALIZED;

        let vertex = Rc::new(RefCell::new(vertex));
        self.ctx
            .vertices
            .borrow_mut()
            .put(self.id, id.into(), Rc::clone(&vertex));
        self.bump_vertex_list_version()?;
        self.bump_graph_version()?;
        self.ctx.metrics.vertex_created();
        debug!(graph = %self.id, vertex = %id, seq, "vertex created");
        Ok(vertex)
    }

    /// Returns `true` if `id` names a live vertex of this graph.
    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertex_ids.in_range(id.index()) && self.vertices.contains(id)
    }

    /// Vertex `id`, loading it from the backend if it is not cached.
    /// Returns `Ok(None)` if the graph has no such vertex.
    pub fn get_vertex(&self, id: VertexId) -> Result<Option<VertexRef>> {
        if !self.contains_vertex(id) {
            return Ok(None);
        }
        let cached = self.ctx.vertices.borrow_mut().get(self.id, id.into());
        self.ctx.metrics.cache_lookup(cached.is_some());
        if let Some(vertex) = cached {
            if vertex.borrow().is_valid() {
                return Ok(Some(vertex));
            }
        }

        let row = self
            .ctx
            .backend
            .fetch_vertex(self.id, id)?
            .ok_or(BackendError::MissingRow("vertex"))?;
        let incidences = self.ctx.backend.incidences(self.id, id)?;
        let incidences =
            IncidenceList::restore(id, incidences.into_iter().map(|row| (row.edge, row.seq)))?;
        let attrs = self.load_attrs(ElementKind::Vertex, row.type_id, id.into())?;
        self.ctx.metrics.backend_fetch();

        let vertex = Rc::new(RefCell::new(Vertex {
            graph: self.id,
            id,
            type_id: row.type_id,
            seq: self.vertices.key_of(id)?,
            flags: flags::PERSISTENT | flags::INITIALIZED,
            attrs,
            incidences,
            incidence_version: row.incidence_version,
        }));
        self.ctx
            .vertices
            .borrow_mut()
            .put(self.id, id.into(), Rc::clone(&vertex));
        Ok(Some(vertex))
    }

    /// Deletes vertex `id` together with every incident edge. Returns `false`
    /// if the graph has no such vertex.
    pub fn delete_vertex(&mut self, id: VertexId) -> Result<bool> {
        let Some(vertex) = self.get_vertex(id)? else {
            return Ok(false);
        };
        let mut incident: Vec<EdgeId> = vertex
            .borrow()
            .incidences
            .ids()
            .into_iter()
            .map(EdgeId::normal)
            .collect();
        incident.sort_unstable();
        incident.dedup();
        for edge in incident {
            self.delete_edge(edge)?;
        }

        self.vertices.remove(id)?;
        self.vertex_ids.release(id.index())?;
        self.ctx.vertices.borrow_mut().remove(self.id, id.into());
        self.ctx
            .backend
            .delete_attributes(self.id, ElementKind::Vertex, id.into())?;
        self.ctx.backend.delete_vertex(self.id, id)?;
        vertex.borrow_mut().invalidate();

        self.bump_vertex_list_version()?;
        self.bump_graph_version()?;
        self.ctx.metrics.vertex_deleted();
        debug!(graph = %self.id, vertex = %id, "vertex deleted");
        Ok(true)
    }
}
