use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{AttrRow, BackendResult, EdgeRow, GraphRow, IncidenceRow, SqlBackend, VertexRow};
use crate::types::{
    AttrId, BackendError, EdgeId, ElementKind, GraphId, SeqNum, TypeId, VertexId,
};

const DDL: &str = "
CREATE TABLE IF NOT EXISTS schema_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    schema_name TEXT NOT NULL,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    UNIQUE (schema_name, kind, name)
);
CREATE TABLE IF NOT EXISTS schema_attrs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type_id INTEGER NOT NULL REFERENCES schema_types (id),
    name TEXT NOT NULL,
    UNIQUE (type_id, name)
);
CREATE TABLE IF NOT EXISTS graphs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    version INTEGER NOT NULL DEFAULT 0,
    vertex_list_version INTEGER NOT NULL DEFAULT 0,
    edge_list_version INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS vertices (
    graph_id INTEGER NOT NULL,
    id INTEGER NOT NULL,
    type_id INTEGER NOT NULL,
    seq INTEGER NOT NULL,
    lambda_version INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (graph_id, id)
);
CREATE INDEX IF NOT EXISTS idx_vertices_seq ON vertices (graph_id, seq);
CREATE TABLE IF NOT EXISTS edges (
    graph_id INTEGER NOT NULL,
    id INTEGER NOT NULL,
    type_id INTEGER NOT NULL,
    seq INTEGER NOT NULL,
    PRIMARY KEY (graph_id, id)
);
CREATE INDEX IF NOT EXISTS idx_edges_seq ON edges (graph_id, seq);
CREATE TABLE IF NOT EXISTS incidences (
    graph_id INTEGER NOT NULL,
    edge_id INTEGER NOT NULL,
    vertex_id INTEGER NOT NULL,
    seq INTEGER NOT NULL,
    PRIMARY KEY (graph_id, edge_id)
);
CREATE INDEX IF NOT EXISTS idx_incidences_vertex ON incidences (graph_id, vertex_id, seq);
CREATE TABLE IF NOT EXISTS attribute_values (
    graph_id INTEGER NOT NULL,
    kind TEXT NOT NULL,
    element_id INTEGER NOT NULL,
    attr_id INTEGER NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (graph_id, kind, element_id, attr_id)
);
";

/// SQLite `synchronous` setting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// No syncing.
    Off,
    /// Sync at critical moments.
    #[default]
    Normal,
    /// Sync after every transaction.
    Full,
}

impl SyncMode {
    fn pragma_value(self) -> &'static str {
        match self {
            SyncMode::Off => "OFF",
            SyncMode::Normal => "NORMAL",
            SyncMode::Full => "FULL",
        }
    }
}

/// [`SqlBackend`] over a single SQLite connection.
pub struct SqliteBackend {
    conn: Connection,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteBackend {
    /// Opens (creating if needed) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, sync: SyncMode) -> BackendResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        conn.pragma_update(None, "synchronous", sync.pragma_value())?;
        debug!(path = %path.as_ref().display(), ?sync, "opened sqlite backend");
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> BackendResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> BackendResult<Self> {
        conn.execute_batch(DDL)?;
        Ok(Self { conn })
    }

    fn renumber(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> BackendResult<()> {
        let rows = self.conn.prepare_cached(sql)?.execute(params)?;
        trace!(rows, "renumbered list rows");
        Ok(())
    }
}

fn seq_version(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

fn stored_u32(value: i64, what: &'static str) -> BackendResult<u32> {
    u32::try_from(value).map_err(|_| BackendError::Corrupt(format!("{what} {value} out of range")))
}

fn stored_edge(value: i64) -> BackendResult<EdgeId> {
    i32::try_from(value)
        .map(EdgeId)
        .map_err(|_| BackendError::Corrupt(format!("edge id {value} out of range")))
}

fn version_param(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl SqlBackend for SqliteBackend {
    fn vendor(&self) -> &'static str {
        "sqlite"
    }

    fn begin(&self) -> BackendResult<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&self) -> BackendResult<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> BackendResult<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    fn register_types(
        &self,
        schema: &str,
        types: &[(ElementKind, &str)],
    ) -> BackendResult<Vec<TypeId>> {
        let mut insert = self.conn.prepare_cached(
            "INSERT OR IGNORE INTO schema_types (schema_name, kind, name) VALUES (?1, ?2, ?3)",
        )?;
        let mut select = self.conn.prepare_cached(
            "SELECT id FROM schema_types WHERE schema_name = ?1 AND kind = ?2 AND name = ?3",
        )?;
        let mut ids = Vec::with_capacity(types.len());
        for &(kind, name) in types {
            insert.execute(params![schema, kind.tag(), name])?;
            let id: i64 = select.query_row(params![schema, kind.tag(), name], |row| row.get(0))?;
            ids.push(TypeId(stored_u32(id, "type id")?));
        }
        Ok(ids)
    }

    fn register_attrs(
        &self,
        _schema: &str,
        type_id: TypeId,
        names: &[&str],
    ) -> BackendResult<Vec<AttrId>> {
        let mut insert = self
            .conn
            .prepare_cached("INSERT OR IGNORE INTO schema_attrs (type_id, name) VALUES (?1, ?2)")?;
        let mut select = self
            .conn
            .prepare_cached("SELECT id FROM schema_attrs WHERE type_id = ?1 AND name = ?2")?;
        let mut ids = Vec::with_capacity(names.len());
        for &name in names {
            insert.execute(params![type_id.0, name])?;
            let id: i64 = select.query_row(params![type_id.0, name], |row| row.get(0))?;
            ids.push(AttrId(stored_u32(id, "attribute id")?));
        }
        Ok(ids)
    }

    fn insert_graph(&self, name: &str) -> BackendResult<GraphId> {
        self.conn
            .prepare_cached("INSERT INTO graphs (name) VALUES (?1)")?
            .execute(params![name])?;
        let id = stored_u32(self.conn.last_insert_rowid(), "graph id")?;
        Ok(GraphId(id))
    }

    fn fetch_graph(&self, name: &str) -> BackendResult<Option<GraphRow>> {
        let row = self
            .conn
            .prepare_cached(
                "SELECT id, name, version, vertex_list_version, edge_list_version
                 FROM graphs WHERE name = ?1",
            )?
            .query_row(params![name], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .optional()?;
        row.map(|(id, name, version, vlv, elv)| {
            Ok(GraphRow {
                id: GraphId(stored_u32(id, "graph id")?),
                name,
                version: seq_version(version),
                vertex_list_version: seq_version(vlv),
                edge_list_version: seq_version(elv),
            })
        })
        .transpose()
    }

    fn graphs(&self) -> BackendResult<Vec<GraphRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, name, version, vertex_list_version, edge_list_version
             FROM graphs ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, name, version, vlv, elv) = row?;
            out.push(GraphRow {
                id: GraphId(stored_u32(id, "graph id")?),
                name,
                version: seq_version(version),
                vertex_list_version: seq_version(vlv),
                edge_list_version: seq_version(elv),
            });
        }
        Ok(out)
    }

    fn delete_graph(&self, graph: GraphId) -> BackendResult<()> {
        for sql in [
            "DELETE FROM attribute_values WHERE graph_id = ?1",
            "DELETE FROM incidences WHERE graph_id = ?1",
            "DELETE FROM edges WHERE graph_id = ?1",
            "DELETE FROM vertices WHERE graph_id = ?1",
            "DELETE FROM graphs WHERE id = ?1",
        ] {
            self.conn.prepare_cached(sql)?.execute(params![graph.0])?;
        }
        Ok(())
    }

    fn update_graph_version(&self, graph: GraphId, version: u64) -> BackendResult<()> {
        let rows = self
            .conn
            .prepare_cached("UPDATE graphs SET version = ?2 WHERE id = ?1")?
            .execute(params![graph.0, version_param(version)])?;
        if rows == 0 {
            return Err(BackendError::MissingRow("graph"));
        }
        Ok(())
    }

    fn update_list_versions(
        &self,
        graph: GraphId,
        vertex_list: u64,
        edge_list: u64,
    ) -> BackendResult<()> {
        let rows = self
            .conn
            .prepare_cached(
                "UPDATE graphs SET vertex_list_version = ?2, edge_list_version = ?3 WHERE id = ?1",
            )?
            .execute(params![
                graph.0,
                version_param(vertex_list),
                version_param(edge_list)
            ])?;
        if rows == 0 {
            return Err(BackendError::MissingRow("graph"));
        }
        Ok(())
    }

    fn insert_vertex(&self, graph: GraphId, row: &VertexRow) -> BackendResult<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO vertices (graph_id, id, type_id, seq, lambda_version)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![
                graph.0,
                row.id.0,
                row.type_id.0,
                row.seq,
                version_param(row.incidence_version)
            ])?;
        Ok(())
    }

    fn fetch_vertex(&self, graph: GraphId, vertex: VertexId) -> BackendResult<Option<VertexRow>> {
        let row = self
            .conn
            .prepare_cached(
                "SELECT type_id, seq, lambda_version FROM vertices WHERE graph_id = ?1 AND id = ?2",
            )?
            .query_row(params![graph.0, vertex.0], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })
            .optional()?;
        row.map(|(type_id, seq, lambda_version)| {
            Ok(VertexRow {
                id: vertex,
                type_id: TypeId(stored_u32(type_id, "type id")?),
                seq,
                incidence_version: seq_version(lambda_version),
            })
        })
        .transpose()
    }

    fn delete_vertex(&self, graph: GraphId, vertex: VertexId) -> BackendResult<()> {
        self.conn
            .prepare_cached("DELETE FROM vertices WHERE graph_id = ?1 AND id = ?2")?
            .execute(params![graph.0, vertex.0])?;
        Ok(())
    }

    fn update_vertex_seq(
        &self,
        graph: GraphId,
        vertex: VertexId,
        seq: SeqNum,
    ) -> BackendResult<()> {
        let rows = self
            .conn
            .prepare_cached("UPDATE vertices SET seq = ?3 WHERE graph_id = ?1 AND id = ?2")?
            .execute(params![graph.0, vertex.0, seq])?;
        if rows == 0 {
            return Err(BackendError::MissingRow("vertex"));
        }
        Ok(())
    }

    fn bump_incidence_version(&self, graph: GraphId, vertex: VertexId) -> BackendResult<()> {
        self.conn
            .prepare_cached(
                "UPDATE vertices SET lambda_version = lambda_version + 1
                 WHERE graph_id = ?1 AND id = ?2",
            )?
            .execute(params![graph.0, vertex.0])?;
        Ok(())
    }

    fn vertex_order(&self, graph: GraphId) -> BackendResult<Vec<(VertexId, SeqNum)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, seq FROM vertices WHERE graph_id = ?1 ORDER BY seq")?;
        let rows = stmt.query_map(params![graph.0], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, seq) = row?;
            out.push((VertexId(stored_u32(id, "vertex id")?), seq));
        }
        Ok(out)
    }

    fn renumber_vertex_list(
        &self,
        graph: GraphId,
        start: SeqNum,
        distance: SeqNum,
    ) -> BackendResult<()> {
        self.renumber(
            "UPDATE vertices SET seq = ?2 + (ranked.rn - 1) * ?3
             FROM (SELECT id AS rid, ROW_NUMBER() OVER (ORDER BY seq) AS rn
                   FROM vertices WHERE graph_id = ?1) AS ranked
             WHERE vertices.graph_id = ?1 AND vertices.id = ranked.rid",
            params![graph.0, start, distance],
        )
    }

    fn insert_edge(&self, graph: GraphId, row: &EdgeRow) -> BackendResult<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO edges (graph_id, id, type_id, seq) VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![graph.0, row.id.0, row.type_id.0, row.seq])?;
        Ok(())
    }

    fn fetch_edge(&self, graph: GraphId, edge: EdgeId) -> BackendResult<Option<EdgeRow>> {
        let edge = edge.normal();
        let row = self
            .conn
            .prepare_cached(
                "SELECT e.type_id, e.seq, a.vertex_id, a.seq, o.vertex_id, o.seq
                 FROM edges e
                 JOIN incidences a ON a.graph_id = e.graph_id AND a.edge_id = e.id
                 JOIN incidences o ON o.graph_id = e.graph_id AND o.edge_id = -e.id
                 WHERE e.graph_id = ?1 AND e.id = ?2",
            )?
            .query_row(params![graph.0, edge.0], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })
            .optional()?;
        row.map(|(type_id, seq, alpha, alpha_seq, omega, omega_seq)| {
            Ok(EdgeRow {
                id: edge,
                type_id: TypeId(stored_u32(type_id, "type id")?),
                seq,
                alpha: VertexId(stored_u32(alpha, "vertex id")?),
                omega: VertexId(stored_u32(omega, "vertex id")?),
                alpha_seq,
                omega_seq,
            })
        })
        .transpose()
    }

    fn delete_edge(&self, graph: GraphId, edge: EdgeId) -> BackendResult<()> {
        self.conn
            .prepare_cached("DELETE FROM edges WHERE graph_id = ?1 AND id = ?2")?
            .execute(params![graph.0, edge.normal().0])?;
        Ok(())
    }

    fn update_edge_seq(&self, graph: GraphId, edge: EdgeId, seq: SeqNum) -> BackendResult<()> {
        let rows = self
            .conn
            .prepare_cached("UPDATE edges SET seq = ?3 WHERE graph_id = ?1 AND id = ?2")?
            .execute(params![graph.0, edge.normal().0, seq])?;
        if rows == 0 {
            return Err(BackendError::MissingRow("edge"));
        }
        Ok(())
    }

    fn edge_order(&self, graph: GraphId) -> BackendResult<Vec<(EdgeId, SeqNum)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id, seq FROM edges WHERE graph_id = ?1 ORDER BY seq")?;
        let rows = stmt.query_map(params![graph.0], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, seq) = row?;
            out.push((stored_edge(id)?, seq));
        }
        Ok(out)
    }

    fn renumber_edge_list(
        &self,
        graph: GraphId,
        start: SeqNum,
        distance: SeqNum,
    ) -> BackendResult<()> {
        self.renumber(
            "UPDATE edges SET seq = ?2 + (ranked.rn - 1) * ?3
             FROM (SELECT id AS rid, ROW_NUMBER() OVER (ORDER BY seq) AS rn
                   FROM edges WHERE graph_id = ?1) AS ranked
             WHERE edges.graph_id = ?1 AND edges.id = ranked.rid",
            params![graph.0, start, distance],
        )
    }

    fn insert_incidence(
        &self,
        graph: GraphId,
        vertex: VertexId,
        row: IncidenceRow,
    ) -> BackendResult<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO incidences (graph_id, edge_id, vertex_id, seq) VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![graph.0, row.edge.0, vertex.0, row.seq])?;
        Ok(())
    }

    fn delete_incidences(&self, graph: GraphId, edge: EdgeId) -> BackendResult<()> {
        let edge = edge.normal();
        self.conn
            .prepare_cached("DELETE FROM incidences WHERE graph_id = ?1 AND edge_id IN (?2, ?3)")?
            .execute(params![graph.0, edge.0, edge.reversed().0])?;
        Ok(())
    }

    fn update_incidence_seq(
        &self,
        graph: GraphId,
        vertex: VertexId,
        edge: EdgeId,
        seq: SeqNum,
    ) -> BackendResult<()> {
        let rows = self
            .conn
            .prepare_cached(
                "UPDATE incidences SET seq = ?4
                 WHERE graph_id = ?1 AND vertex_id = ?2 AND edge_id = ?3",
            )?
            .execute(params![graph.0, vertex.0, edge.0, seq])?;
        if rows == 0 {
            return Err(BackendError::MissingRow("incidence"));
        }
        Ok(())
    }

    fn incidences(&self, graph: GraphId, vertex: VertexId) -> BackendResult<Vec<IncidenceRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT edge_id, seq FROM incidences
             WHERE graph_id = ?1 AND vertex_id = ?2 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![graph.0, vertex.0], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (edge, seq) = row?;
            out.push(IncidenceRow {
                edge: stored_edge(edge)?,
                seq,
            });
        }
        Ok(out)
    }

    fn renumber_incidence_list(
        &self,
        graph: GraphId,
        vertex: VertexId,
        start: SeqNum,
        distance: SeqNum,
    ) -> BackendResult<()> {
        self.renumber(
            "UPDATE incidences SET seq = ?3 + (ranked.rn - 1) * ?4
             FROM (SELECT edge_id AS rid, ROW_NUMBER() OVER (ORDER BY seq) AS rn
                   FROM incidences WHERE graph_id = ?1 AND vertex_id = ?2) AS ranked
             WHERE incidences.graph_id = ?1 AND incidences.edge_id = ranked.rid",
            params![graph.0, vertex.0, start, distance],
        )
    }

    fn insert_attributes(
        &self,
        graph: GraphId,
        kind: ElementKind,
        element: i64,
        values: &[AttrRow],
    ) -> BackendResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO attribute_values (graph_id, kind, element_id, attr_id, value)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for value in values {
            stmt.execute(params![graph.0, kind.tag(), element, value.attr.0, value.value])?;
        }
        Ok(())
    }

    fn fetch_attributes(
        &self,
        graph: GraphId,
        kind: ElementKind,
        element: i64,
    ) -> BackendResult<Vec<AttrRow>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT attr_id, value FROM attribute_values
             WHERE graph_id = ?1 AND kind = ?2 AND element_id = ?3 ORDER BY attr_id",
        )?;
        let rows = stmt.query_map(params![graph.0, kind.tag(), element], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (attr, value) = row?;
            out.push(AttrRow {
                attr: AttrId(stored_u32(attr, "attribute id")?),
                value,
            });
        }
        Ok(out)
    }

    fn update_attribute(
        &self,
        graph: GraphId,
        kind: ElementKind,
        element: i64,
        value: &AttrRow,
    ) -> BackendResult<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO attribute_values (graph_id, kind, element_id, attr_id, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (graph_id, kind, element_id, attr_id) DO UPDATE SET value = excluded.value",
            )?
            .execute(params![graph.0, kind.tag(), element, value.attr.0, value.value])?;
        Ok(())
    }

    fn delete_attributes(
        &self,
        graph: GraphId,
        kind: ElementKind,
        element: i64,
    ) -> BackendResult<()> {
        self.conn
            .prepare_cached(
                "DELETE FROM attribute_values WHERE graph_id = ?1 AND kind = ?2 AND element_id = ?3",
            )?
            .execute(params![graph.0, kind.tag(), element])?;
        Ok(())
    }
}
