#![allow(missing_docs)]

use std::error::Error;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use seqgraph::admin::{verify, VerifyLevel};
use seqgraph::backend::{SqlBackend, SqliteBackend, SyncMode};
use seqgraph::schema::{AttrDef, AttrDomain, AttrValue, Schema};
use seqgraph::storage::{
    CounterMetrics, Graph, GraphDatabase, GraphDbOptions, SequencedList, VersionWriteBack,
};
use seqgraph::types::{EdgeId, SeqNum, VertexId};
use tempfile::tempdir;

type TestResult = std::result::Result<(), Box<dyn Error>>;

fn schema() -> Schema {
    Schema::new("network")
        .vertex_type(
            "Host",
            vec![
                AttrDef::new("name", AttrDomain::String),
                AttrDef::new("load", AttrDomain::Double),
            ],
        )
        .edge_type("Cable", vec![AttrDef::new("meters", AttrDomain::Long)])
}

fn open_db(path: &Path, options: GraphDbOptions) -> seqgraph::Result<GraphDatabase> {
    let backend: Rc<dyn SqlBackend> = Rc::new(SqliteBackend::open(path, SyncMode::Normal)?);
    GraphDatabase::with_backend(backend, &schema(), options)
}

fn host(graph: &mut Graph<'_>, name: &str) -> seqgraph::Result<VertexId> {
    let vertex = graph.create_vertex_with("Host", &[("name", name.into())])?;
    let id = vertex.borrow().id();
    Ok(id)
}

fn cable(graph: &mut Graph<'_>, from: VertexId, to: VertexId) -> seqgraph::Result<EdgeId> {
    let edge = graph.create_edge("Cable", from, to)?;
    let id = edge.borrow().id();
    Ok(id)
}

fn vertex_keys(graph: &Graph<'_>) -> Vec<(SeqNum, VertexId)> {
    graph.vertex_list().seq_map().iter().collect()
}

fn edge_keys(graph: &Graph<'_>) -> Vec<(SeqNum, EdgeId)> {
    graph.edge_list().seq_map().iter().collect()
}

fn incidence_keys(graph: &Graph<'_>, vertex: VertexId) -> seqgraph::Result<Vec<(SeqNum, EdgeId)>> {
    let instance = graph
        .get_vertex(vertex)?
        .ok_or(seqgraph::SeqGraphError::Invalid("vertex vanished"))?;
    let keys = instance.borrow().incidences().seq_map().iter().collect();
    Ok(keys)
}

struct Snapshot {
    vertices: Vec<(SeqNum, VertexId)>,
    edges: Vec<(SeqNum, EdgeId)>,
    hub_incidences: Vec<(SeqNum, EdgeId)>,
    hub: VertexId,
}

/// Builds a graph whose vertex, edge and incidence lists have each been
/// reorganized at least once.
fn build_reorganized(
    path: &Path,
    metrics: Arc<CounterMetrics>,
) -> std::result::Result<Snapshot, Box<dyn Error>> {
    let db = open_db(path, GraphDbOptions::new().metrics(metrics))?;
    let mut graph = db.create_graph("lan")?;
    let hub = host(&mut graph, "hub")?;
    let anchor = host(&mut graph, "anchor")?;
    let first_cable = cable(&mut graph, hub, anchor)?;
    let anchor_cable = cable(&mut graph, hub, anchor)?;

    for n in 0..40 {
        let leaf = host(&mut graph, &format!("leaf{n}"))?;
        graph.put_vertex_before(anchor, leaf)?;
        let edge = cable(&mut graph, hub, leaf)?;
        graph.put_edge_before(anchor_cable, edge)?;
        graph.put_incidence_before(hub, anchor_cable, edge)?;
    }
    graph.set_vertex_attr(hub, "load", 0.75f64)?;
    graph.set_edge_attr(first_cable, "meters", 12i64)?;

    let report = verify(&graph, VerifyLevel::Full)?;
    assert!(report.success, "{:?}", report.findings);

    let snapshot = Snapshot {
        vertices: vertex_keys(&graph),
        edges: edge_keys(&graph),
        hub_incidences: incidence_keys(&graph, hub)?,
        hub,
    };
    graph.close()?;
    Ok(snapshot)
}

#[test]
fn reorganized_lists_survive_reopen() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("lan.db");
    let metrics = Arc::new(CounterMetrics::default());
    let before = build_reorganized(&path, Arc::clone(&metrics))?;

    let counts = metrics.snapshot();
    assert!(counts.vertex_list_reorganizations >= 1);
    assert!(counts.edge_list_reorganizations >= 1);
    assert!(counts.incidence_list_reorganizations >= 1);

    let db = open_db(&path, GraphDbOptions::default())?;
    let graph = db.open_graph("lan")?.ok_or("graph missing after reopen")?;
    assert_eq!(vertex_keys(&graph), before.vertices);
    assert_eq!(edge_keys(&graph), before.edges);
    assert_eq!(incidence_keys(&graph, before.hub)?, before.hub_incidences);
    assert_eq!(graph.vertex_count(), 42);
    assert_eq!(graph.edge_count(), 42);

    assert_eq!(graph.vertex_attr(before.hub, "load")?, Some(AttrValue::Double(0.75)));
    assert_eq!(graph.vertex_attr(before.hub, "name")?, Some("hub".into()));
    let first_cable = graph.first_edge().ok_or("no edges")?;
    assert_eq!(graph.edge_attr(first_cable, "meters")?, Some(AttrValue::Long(12)));

    let report = verify(&graph, VerifyLevel::Full)?;
    assert!(report.success, "{:?}", report.findings);
    Ok(())
}

#[test]
fn reopened_graph_reuses_released_ids() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("ids.db");
    {
        let db = open_db(&path, GraphDbOptions::default())?;
        let mut graph = db.create_graph("g")?;
        let a = host(&mut graph, "a")?;
        let b = host(&mut graph, "b")?;
        host(&mut graph, "c")?;
        cable(&mut graph, a, b)?;
        graph.delete_vertex(b)?;
        graph.close()?;
    }

    let db = open_db(&path, GraphDbOptions::default())?;
    let mut graph = db.open_graph("g")?.ok_or("graph missing")?;
    assert_eq!(graph.vertex_ids(), vec![VertexId(1), VertexId(3)]);
    assert_eq!(graph.incidences(VertexId(1))?, Vec::<EdgeId>::new());
    assert_eq!(host(&mut graph, "again")?, VertexId(2));
    assert_eq!(graph.last_vertex(), Some(VertexId(2)));
    assert_eq!(cable(&mut graph, VertexId(1), VertexId(2))?, EdgeId(1));
    Ok(())
}

#[test]
fn list_versions_are_written_on_close() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("versions.db");
    let db = open_db(&path, GraphDbOptions::default())?;
    let mut graph = db.create_graph("g")?;
    let a = host(&mut graph, "a")?;
    let b = host(&mut graph, "b")?;
    cable(&mut graph, a, b)?;

    let stored = db.backend().fetch_graph("g")?.ok_or("graph row")?;
    assert_eq!(stored.version, 3);
    assert_eq!(stored.vertex_list_version, 0);
    assert_eq!(stored.edge_list_version, 0);

    graph.close()?;
    let stored = db.backend().fetch_graph("g")?.ok_or("graph row")?;
    assert_eq!(stored.vertex_list_version, 2);
    assert_eq!(stored.edge_list_version, 1);

    // Dropping without close flushes on a best-effort basis.
    {
        let mut graph = db.open_graph("g")?.ok_or("graph row")?;
        graph.prepend_vertex(b)?;
    }
    let stored = db.backend().fetch_graph("g")?.ok_or("graph row")?;
    assert_eq!(stored.vertex_list_version, 3);
    assert_eq!(stored.version, 4);
    Ok(())
}

#[test]
fn write_through_policy_stores_every_bump() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("eager.db");
    let options = GraphDbOptions::new().version_write_back(VersionWriteBack::WriteThrough);
    let db = open_db(&path, options)?;
    let mut graph = db.create_graph("g")?;
    let a = host(&mut graph, "a")?;
    let b = host(&mut graph, "b")?;
    cable(&mut graph, b, a)?;

    let stored = db.backend().fetch_graph("g")?.ok_or("graph row")?;
    assert_eq!(stored.vertex_list_version, graph.vertex_list_version());
    assert_eq!(stored.edge_list_version, graph.edge_list_version());
    assert_eq!(stored.version, graph.version());
    Ok(())
}

#[test]
fn loading_mode_leaves_stored_rows_untouched() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("loading.db");
    {
        let db = open_db(&path, GraphDbOptions::default())?;
        let mut graph = db.create_graph("g")?;
        let a = host(&mut graph, "a")?;
        let b = host(&mut graph, "b")?;
        let c = host(&mut graph, "c")?;
        let versions = graph.versions();

        graph.set_loading(true);
        graph.prepend_vertex(c)?;
        graph.put_vertex_after(c, b)?;
        assert_eq!(graph.vertex_ids(), vec![c, b, a]);
        assert!(graph.version() > versions.graph);
        let row = db.backend().fetch_graph("g")?.ok_or("graph row")?;
        assert_eq!(row.version, versions.graph);
        let stored: Vec<VertexId> = db
            .backend()
            .vertex_order(graph.id())?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(stored, vec![a, b, c]);
        graph.set_loading(false);
        graph.close()?;
    }

    let db = open_db(&path, GraphDbOptions::default())?;
    let graph = db.open_graph("g")?.ok_or("graph missing")?;
    assert_eq!(
        graph.vertex_ids(),
        vec![VertexId(1), VertexId(2), VertexId(3)]
    );
    Ok(())
}

#[test]
fn deleted_graph_leaves_no_rows() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("delete.db");
    let db = open_db(&path, GraphDbOptions::default())?;
    let id = {
        let mut graph = db.create_graph("temp")?;
        let a = host(&mut graph, "a")?;
        let b = host(&mut graph, "b")?;
        cable(&mut graph, a, b)?;
        graph.id()
    };
    let keep = db.create_graph("keep")?;
    let keep_id = keep.id();
    drop(keep);

    assert!(db.delete_graph("temp")?);
    assert!(db.backend().vertex_order(id)?.is_empty());
    assert!(db.backend().edge_order(id)?.is_empty());
    assert!(db.backend().incidences(id, VertexId(1))?.is_empty());
    let names: Vec<String> = db.graphs()?.into_iter().map(|row| row.name).collect();
    assert_eq!(names, vec!["keep".to_owned()]);
    assert_ne!(keep_id, id);
    Ok(())
}
