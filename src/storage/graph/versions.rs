use serde::Serialize;
use tracing::trace;

use super::Graph;
use crate::storage::element::VertexRef;
use crate::storage::options::VersionWriteBack;
use crate::types::{Result, VertexId};

/// Change counters of one graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GraphVersions {
    /// Bumped by every structural or attribute change.
    pub graph: u64,
    /// Bumped when the vertex list changes.
    pub vertex_list: u64,
    /// Bumped when the edge list changes.
    pub edge_list: u64,
}

impl Graph<'_> {
    /// Current change counters.
    pub fn versions(&self) -> GraphVersions {
        self.versions
    }

    /// Structural version of the graph.
    pub fn version(&self) -> u64 {
        self.versions.graph
    }

    /// Version of the vertex list.
    pub fn vertex_list_version(&self) -> u64 {
        self.versions.vertex_list
    }

    /// Version of the edge list.
    pub fn edge_list_version(&self) -> u64 {
        self.versions.edge_list
    }

    /// Version of `vertex`'s incidence list, or `None` if there is no such
    /// vertex.
    pub fn incidence_version(&self, vertex: VertexId) -> Result<Option<u64>> {
        Ok(self
            .get_vertex(vertex)?
            .map(|v| v.borrow().incidence_version))
    }

    /// Writes list versions held back by [`VersionWriteBack::OnFlush`].
    pub fn flush_versions(&mut self) -> Result<()> {
        if !self.versions_dirty {
            return Ok(());
        }
        self.write_list_versions()?;
        self.versions_dirty = false;
        Ok(())
    }

    /// Counters always advance; loading mode only holds back the writes.
    pub(super) fn bump_graph_version(&mut self) -> Result<()> {
        self.versions.graph += 1;
        if !self.loading {
            self.ctx
                .backend
                .update_graph_version(self.id, self.versions.graph)?;
        }
        Ok(())
    }

    pub(super) fn bump_vertex_list_version(&mut self) -> Result<()> {
        self.versions.vertex_list += 1;
        self.list_versions_changed()
    }

    pub(super) fn bump_edge_list_version(&mut self) -> Result<()> {
        self.versions.edge_list += 1;
        self.list_versions_changed()
    }

    /// Incidence versions are written through outside loading mode.
    /// `resident` is the vertex's loaded instance, if any.
    pub(super) fn bump_incidence_version(
        &self,
        vertex: VertexId,
        resident: Option<&VertexRef>,
    ) -> Result<()> {
        if !self.loading {
            self.ctx.backend.bump_incidence_version(self.id, vertex)?;
        }
        if let Some(resident) = resident {
            resident.borrow_mut().incidence_version += 1;
        }
        Ok(())
    }

    fn list_versions_changed(&mut self) -> Result<()> {
        if self.loading {
            return Ok(());
        }
        match self.ctx.options.version_write_back {
            VersionWriteBack::WriteThrough => self.write_list_versions(),
            VersionWriteBack::OnFlush => {
                self.versions_dirty = true;
                Ok(())
            }
        }
    }

    fn write_list_versions(&self) -> Result<()> {
        trace!(
            graph = %self.id,
            vertex_list = self.versions.vertex_list,
            edge_list = self.versions.edge_list,
            "writing list versions"
        );
        self.ctx.backend.update_list_versions(
            self.id,
            self.versions.vertex_list,
            self.versions.edge_list,
        )?;
        Ok(())
    }
}
