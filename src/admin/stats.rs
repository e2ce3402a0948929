use std::hash::Hash;

use serde::Serialize;

use crate::admin::Result;
use crate::storage::seq::SeqMap;
use crate::storage::{CacheStats, Graph, GraphDatabase, GraphVersions, SequencedList};
use crate::types::SeqNum;

/// Statistics of one open graph and the database caches it uses.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub graph: GraphStatsSection,
    pub vertex_list: ListStatsSection,
    pub edge_list: ListStatsSection,
    pub ids: IdPoolSection,
    pub cache: CacheStatsSection,
    pub backend: BackendStatsSection,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphStatsSection {
    pub id: u32,
    pub name: String,
    pub vertices: usize,
    pub edges: usize,
    pub versions: GraphVersions,
    pub loading: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListStatsSection {
    pub len: usize,
    pub first_key: Option<SeqNum>,
    pub last_key: Option<SeqNum>,
    /// Smallest gap between adjacent keys; a small value means the next
    /// insertion there will reorganize the list.
    pub min_gap: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdPoolSection {
    pub vertex_capacity: u32,
    pub vertex_used: u32,
    pub edge_capacity: u32,
    pub edge_used: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsSection {
    pub vertices: CacheStats,
    pub edges: CacheStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendStatsSection {
    pub vendor: &'static str,
    pub graphs: usize,
    pub in_transaction: bool,
}

pub fn stats(db: &GraphDatabase, graph: &Graph<'_>) -> Result<StatsReport> {
    let (vertex_pool, edge_pool) = graph.id_pools();
    let backend = db.backend();

    Ok(StatsReport {
        graph: GraphStatsSection {
            id: graph.id().0,
            name: graph.name().to_owned(),
            vertices: graph.vertex_count(),
            edges: graph.edge_count(),
            versions: graph.versions(),
            loading: graph.is_loading(),
        },
        vertex_list: list_section(graph.vertex_list().seq_map()),
        edge_list: list_section(graph.edge_list().seq_map()),
        ids: IdPoolSection {
            vertex_capacity: vertex_pool.capacity(),
            vertex_used: vertex_pool.used(),
            edge_capacity: edge_pool.capacity(),
            edge_used: edge_pool.used(),
        },
        cache: CacheStatsSection {
            vertices: db.vertex_cache_stats(),
            edges: db.edge_cache_stats(),
        },
        backend: BackendStatsSection {
            vendor: backend.vendor(),
            graphs: backend.graphs()?.len(),
            in_transaction: backend.in_transaction(),
        },
    })
}

fn list_section<I: Copy + Eq + Hash>(map: &SeqMap<I>) -> ListStatsSection {
    let keys: Vec<SeqNum> = map.iter().map(|(key, _)| key).collect();
    let min_gap = keys
        .windows(2)
        .map(|pair| pair[1].abs_diff(pair[0]))
        .min();
    ListStatsSection {
        len: keys.len(),
        first_key: keys.first().copied(),
        last_key: keys.last().copied(),
        min_gap,
    }
}
