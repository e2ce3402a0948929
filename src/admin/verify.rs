use std::fmt::Display;

use serde::Serialize;

use crate::admin::Result;
use crate::backend::IncidenceRow;
use crate::primitives::FreeIndexPool;
use crate::storage::seq::{MAX_BORDER, MIN_BORDER};
use crate::storage::{Graph, SequencedList};
use crate::types::{EdgeId, ListKind, SeqNum, VertexId};

const MAX_FINDINGS: usize = 32;

/// Specifies the depth of verification checks to perform.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyLevel {
    /// Global lists and id pools only.
    Fast,
    /// Also every vertex's incidence list and every edge's endpoints.
    Full,
}

/// Indicates the severity level of a verification finding.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifySeverity {
    /// Informational message about the verification process.
    Info,
    /// Non-critical issue that may indicate a problem.
    Warning,
    /// Critical issue indicating an integrity failure.
    Error,
}

/// Represents a single issue discovered during verification.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyFinding {
    /// The severity level of this finding.
    pub severity: VerifySeverity,
    /// Human-readable description of the issue.
    pub message: String,
}

impl VerifyFinding {
    fn error(message: impl Into<String>) -> Self {
        Self {
            severity: VerifySeverity::Error,
            message: message.into(),
        }
    }
}

/// Statistics collected during the verification process.
#[derive(Clone, Debug, Default, Serialize)]
pub struct VerifyCounts {
    /// Vertex rows compared against the vertex list.
    pub vertices_checked: u64,
    /// Edge rows compared against the edge list.
    pub edges_checked: u64,
    /// Incidence rows examined across all vertices.
    pub incidence_entries: u64,
    /// Incidence lists compared against a loaded instance.
    pub resident_lists_compared: u64,
}

/// Complete report of a verification operation.
#[derive(Clone, Debug, Serialize)]
pub struct VerifyReport {
    /// Name of the verified graph.
    pub graph: String,
    /// The verification level that was performed.
    pub level: VerifyLevel,
    /// Whether verification passed without finding any issues.
    pub success: bool,
    /// List of issues discovered during verification.
    pub findings: Vec<VerifyFinding>,
    /// Statistics about the data structures examined.
    pub counts: VerifyCounts,
}

/// Cross-checks the in-memory lists of `graph` against its backend rows.
///
/// `VerifyLevel::Fast` compares the vertex and edge lists with the stored
/// order, checks that keys are unique and stay inside the border margin, and
/// that every member holds an allocated id. `VerifyLevel::Full` additionally
/// walks every vertex's stored incidences, checks them against the edge rows
/// and, for loaded vertices, against the in-memory incidence list.
///
/// Findings are capped; the report stays small on badly damaged graphs.
///
/// # Errors
///
/// Returns an error only if the backend cannot be read.
pub fn verify(graph: &Graph<'_>, level: VerifyLevel) -> Result<VerifyReport> {
    let mut findings = Vec::new();
    let mut counts = VerifyCounts::default();
    let backend = graph.backend();
    let (vertex_pool, edge_pool) = graph.id_pools();

    let stored_vertices = backend.vertex_order(graph.id())?;
    counts.vertices_checked = stored_vertices.len() as u64;
    compare_order(
        ListKind::Vertex,
        graph.vertex_list().seq_map().iter(),
        &stored_vertices,
        &mut findings,
    );
    check_pool(ListKind::Vertex, vertex_pool, &graph.vertex_ids(), VertexId::index, &mut findings);

    let stored_edges = backend.edge_order(graph.id())?;
    counts.edges_checked = stored_edges.len() as u64;
    compare_order(
        ListKind::Edge,
        graph.edge_list().seq_map().iter(),
        &stored_edges,
        &mut findings,
    );
    check_pool(ListKind::Edge, edge_pool, &graph.edge_ids(), EdgeId::index, &mut findings);

    if matches!(level, VerifyLevel::Full) {
        run_incidence_checks(graph, &mut findings, &mut counts)?;
    }

    Ok(VerifyReport {
        graph: graph.name().to_owned(),
        level,
        success: findings.is_empty(),
        findings,
        counts,
    })
}

fn compare_order<I>(
    kind: ListKind,
    memory: impl Iterator<Item = (SeqNum, I)>,
    stored: &[(I, SeqNum)],
    findings: &mut Vec<VerifyFinding>,
) where
    I: Copy + Eq + Display,
{
    let memory: Vec<(SeqNum, I)> = memory.collect();
    if memory.len() != stored.len() {
        push_error(
            findings,
            format!(
                "{kind} holds {} members but the backend stores {}",
                memory.len(),
                stored.len()
            ),
        );
    }
    for (&(key, id), &(stored_id, stored_key)) in memory.iter().zip(stored) {
        if id != stored_id || key != stored_key {
            push_error(
                findings,
                format!("{kind} diverges: {id} at {key} in memory, {stored_id} at {stored_key} stored"),
            );
            break;
        }
    }
    check_keys(kind, stored.iter().map(|&(id, key)| (id, key)), findings);
}

fn check_keys<I: Display>(
    kind: ListKind,
    keys: impl Iterator<Item = (I, SeqNum)>,
    findings: &mut Vec<VerifyFinding>,
) {
    let mut previous: Option<SeqNum> = None;
    for (id, key) in keys {
        if key <= MIN_BORDER || key >= MAX_BORDER {
            push_error(findings, format!("{kind} key {key} of {id} lies outside the border margin"));
        }
        if let Some(previous) = previous {
            if key == previous {
                push_error(findings, format!("{kind} key {key} is used more than once"));
            } else if key < previous {
                push_error(findings, format!("{kind} rows are not ordered by key at {id}"));
            }
        }
        previous = Some(key);
        if findings.len() >= MAX_FINDINGS {
            break;
        }
    }
}

fn check_pool<I: Copy + Display>(
    kind: ListKind,
    pool: &FreeIndexPool,
    members: &[I],
    index: impl Fn(I) -> u32,
    findings: &mut Vec<VerifyFinding>,
) {
    for &id in members {
        if !pool.is_used(index(id)) {
            push_error(findings, format!("{kind} member {id} holds an unallocated id"));
        }
    }
    if pool.used() as usize != members.len() {
        push_error(
            findings,
            format!(
                "{kind} id pool has {} allocated ids for {} members",
                pool.used(),
                members.len()
            ),
        );
    }
}

fn run_incidence_checks(
    graph: &Graph<'_>,
    findings: &mut Vec<VerifyFinding>,
    counts: &mut VerifyCounts,
) -> Result<()> {
    let backend = graph.backend();
    for vertex in graph.vertex_ids() {
        let rows = backend.incidences(graph.id(), vertex)?;
        counts.incidence_entries += rows.len() as u64;
        check_keys(
            ListKind::Incidence,
            rows.iter().map(|row| (row.edge, row.seq)),
            findings,
        );
        for row in &rows {
            check_endpoint(graph, vertex, row, findings)?;
        }
        if let Some(resident) = graph.resident_vertex(vertex) {
            counts.resident_lists_compared += 1;
            let resident = resident.borrow();
            let memory: Vec<(EdgeId, SeqNum)> = resident
                .incidences()
                .seq_map()
                .iter()
                .map(|(key, edge)| (edge, key))
                .collect();
            let stored: Vec<(EdgeId, SeqNum)> = rows.iter().map(|row| (row.edge, row.seq)).collect();
            if memory != stored {
                push_error(
                    findings,
                    format!("incidence list of {vertex} differs from its stored rows"),
                );
            }
        }
        if findings.len() >= MAX_FINDINGS {
            return Ok(());
        }
    }

    let expected = 2 * graph.edge_count() as u64;
    if counts.incidence_entries != expected {
        push_error(
            findings,
            format!(
                "{} incidence rows stored, {expected} expected for {} edges",
                counts.incidence_entries,
                graph.edge_count()
            ),
        );
    }
    Ok(())
}

fn check_endpoint(
    graph: &Graph<'_>,
    vertex: VertexId,
    row: &IncidenceRow,
    findings: &mut Vec<VerifyFinding>,
) -> Result<()> {
    if !graph.contains_edge(row.edge) {
        push_error(
            findings,
            format!("incidence list of {vertex} references missing edge {}", row.edge),
        );
        return Ok(());
    }
    let Some(edge) = graph.backend().fetch_edge(graph.id(), row.edge.normal())? else {
        push_error(findings, format!("edge {} has no stored row", row.edge.normal()));
        return Ok(());
    };
    let (endpoint, key) = if row.edge.is_normal() {
        (edge.alpha, edge.alpha_seq)
    } else {
        (edge.omega, edge.omega_seq)
    };
    if endpoint != vertex {
        push_error(
            findings,
            format!(
                "incidence {} is listed at {vertex} but the edge connects {} to {}",
                row.edge, edge.alpha, edge.omega
            ),
        );
    } else if key != row.seq {
        push_error(
            findings,
            format!("edge {} reports key {key} at {vertex}, incidence row has {}", row.edge, row.seq),
        );
    }
    Ok(())
}

fn push_error(findings: &mut Vec<VerifyFinding>, message: impl Into<String>) {
    if findings.len() < MAX_FINDINGS {
        findings.push(VerifyFinding::error(message.into()));
    }
}
