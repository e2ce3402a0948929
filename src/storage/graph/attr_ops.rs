use std::cell::RefCell;

use tracing::trace;

use super::{check_domain, Graph};
use crate::backend::AttrRow;
use crate::schema::{encode_value, AttrInfo, AttrValue};
use crate::storage::element::{Edge, Vertex};
use crate::types::{AttrId, EdgeId, ElementKind, GraphId, ListKind, Result, SeqGraphError, TypeId, VertexId};

/// Element whose attributes can be read and written.
trait Attributed {
    const KIND: ElementKind;
    fn graph(&self) -> GraphId;
    fn raw_id(&self) -> i64;
    fn type_id(&self) -> TypeId;
    fn ensure_valid(&self) -> Result<()>;
    fn write_through(&self) -> bool;
    fn attrs_mut(&mut self) -> &mut std::collections::BTreeMap<AttrId, AttrValue>;
}

impl Attributed for Vertex {
    const KIND: ElementKind = ElementKind::Vertex;

    fn graph(&self) -> GraphId {
        self.graph
    }

    fn raw_id(&self) -> i64 {
        self.id.into()
    }

    fn type_id(&self) -> TypeId {
        self.type_id
    }

    fn ensure_valid(&self) -> Result<()> {
        Vertex::ensure_valid(self)
    }

    fn write_through(&self) -> bool {
        self.is_persistent() && self.is_initialized()
    }

    fn attrs_mut(&mut self) -> &mut std::collections::BTreeMap<AttrId, AttrValue> {
        &mut self.attrs
    }
}

impl Attributed for Edge {
    const KIND: ElementKind = ElementKind::Edge;

    fn graph(&self) -> GraphId {
        self.graph
    }

    fn raw_id(&self) -> i64 {
        self.id.into()
    }

    fn type_id(&self) -> TypeId {
        self.type_id
    }

    fn ensure_valid(&self) -> Result<()> {
        Edge::ensure_valid(self)
    }

    fn write_through(&self) -> bool {
        self.is_persistent() && self.is_initialized()
    }

    fn attrs_mut(&mut self) -> &mut std::collections::BTreeMap<AttrId, AttrValue> {
        &mut self.attrs
    }
}

impl Graph<'_> {
    /// Value of attribute `name` of vertex `id`, or `None` if there is no
    /// such vertex.
    pub fn vertex_attr(&self, id: VertexId, name: &str) -> Result<Option<AttrValue>> {
        let Some(vertex) = self.get_vertex(id)? else {
            return Ok(None);
        };
        let vertex = vertex.borrow();
        let info = self.ctx.schema.attr(vertex.type_id, name)?;
        Ok(vertex.attrs.get(&info.id).cloned())
    }

    /// Sets attribute `name` of vertex `id`.
    pub fn set_vertex_attr(
        &mut self,
        id: VertexId,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> Result<()> {
        let vertex = self.get_vertex(id)?.ok_or(SeqGraphError::NotMember {
            list: ListKind::Vertex,
            id: id.into(),
        })?;
        self.write_attr(&vertex, name, value.into())
    }

    /// Value of attribute `name` of edge `id`, or `None` if there is no such
    /// edge.
    pub fn edge_attr(&self, id: EdgeId, name: &str) -> Result<Option<AttrValue>> {
        let Some(edge) = self.get_edge(id)? else {
            return Ok(None);
        };
        let edge = edge.borrow();
        let info = self.ctx.schema.attr(edge.type_id, name)?;
        Ok(edge.attrs.get(&info.id).cloned())
    }

    /// Sets attribute `name` of edge `id`.
    pub fn set_edge_attr(
        &mut self,
        id: EdgeId,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> Result<()> {
        let edge = self.get_edge(id)?.ok_or(SeqGraphError::NotMember {
            list: ListKind::Edge,
            id: id.into(),
        })?;
        self.write_attr(&edge, name, value.into())
    }

    /// Updates the instance, then writes the single value through if the
    /// element is persistent and initialized. Attribute changes bump only
    /// the graph version.
    fn write_attr<E: Attributed>(
        &mut self,
        element: &RefCell<E>,
        name: &str,
        value: AttrValue,
    ) -> Result<()> {
        let (raw_id, write_through, info) = {
            let element = element.borrow();
            element.ensure_valid()?;
            if element.graph() != self.id {
                return Err(SeqGraphError::ForeignElement {
                    expected: self.id.0,
                    actual: element.graph().0,
                });
            }
            let info: AttrInfo = self.ctx.schema.attr(element.type_id(), name)?.clone();
            (element.raw_id(), element.write_through(), info)
        };
        check_domain(&info.name, info.domain, &value)?;
        let encoded = if write_through {
            Some(encode_value(&value)?)
        } else {
            None
        };
        element.borrow_mut().attrs_mut().insert(info.id, value);
        if let Some(encoded) = encoded {
            self.ctx.backend.update_attribute(
                self.id,
                E::KIND,
                raw_id,
                &AttrRow {
                    attr: info.id,
                    value: encoded,
                },
            )?;
            trace!(graph = %self.id, kind = %E::KIND, element = raw_id, attr = %info.name, "attribute written");
            self.bump_graph_version()?;
        }
        Ok(())
    }
}
