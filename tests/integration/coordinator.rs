#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::{Arc, Once};

use seqgraph::backend::{BackendRegistry, SqlBackend, SqliteBackend};
use seqgraph::config::BackendConfig;
use seqgraph::schema::{AttrDef, AttrDomain, AttrValue, Schema};
use seqgraph::storage::{
    CounterMetrics, Direction, ElementCache, Graph, GraphDatabase, GraphDbOptions,
};
use seqgraph::types::{
    BackendError, EdgeId, ElementKind, GraphId, ListKind, Result, SeqGraphError, VertexId,
};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn transit() -> Schema {
    Schema::new("transit")
        .vertex_type(
            "Stop",
            vec![
                AttrDef::new("name", AttrDomain::String),
                AttrDef::new("zone", AttrDomain::Int).with_default(1i32),
            ],
        )
        .edge_type(
            "Link",
            vec![
                AttrDef::new("minutes", AttrDomain::Int),
                AttrDef::new("express", AttrDomain::Bool),
            ],
        )
}

fn open(options: GraphDbOptions) -> Result<GraphDatabase> {
    init_tracing();
    let backend: Rc<dyn SqlBackend> = Rc::new(SqliteBackend::open_in_memory()?);
    GraphDatabase::with_backend(backend, &transit(), options)
}

fn stop(graph: &mut Graph<'_>, name: &str) -> Result<VertexId> {
    let vertex = graph.create_vertex_with("Stop", &[("name", name.into())])?;
    let id = vertex.borrow().id();
    Ok(id)
}

fn link(graph: &mut Graph<'_>, from: VertexId, to: VertexId) -> Result<EdgeId> {
    let edge = graph.create_edge("Link", from, to)?;
    let id = edge.borrow().id();
    Ok(id)
}

#[test]
fn registry_connection_backs_a_database() -> Result<()> {
    init_tracing();
    let mut registry = BackendRegistry::new();
    registry.open("main", &BackendConfig::memory())?;
    let db = GraphDatabase::open(&registry, "main", &transit(), GraphDbOptions::default())?;
    let mut graph = db.create_graph("city")?;
    stop(&mut graph, "central")?;
    graph.close()?;

    let names: Vec<String> = db.graphs()?.into_iter().map(|row| row.name).collect();
    assert_eq!(names, vec!["city".to_owned()]);

    let missing = GraphDatabase::open(&registry, "replica", &transit(), GraphDbOptions::default());
    assert!(matches!(
        missing,
        Err(SeqGraphError::Persistence(BackendError::UnknownConnection(name))) if name == "replica"
    ));
    Ok(())
}

#[test]
fn incidence_navigation_filters_by_direction() -> Result<()> {
    let db = open(GraphDbOptions::default())?;
    let mut graph = db.create_graph("g")?;
    let hub = stop(&mut graph, "hub")?;
    let north = stop(&mut graph, "north")?;
    let south = stop(&mut graph, "south")?;

    let inbound = link(&mut graph, north, hub)?;
    let outbound = link(&mut graph, hub, south)?;
    let back = link(&mut graph, south, hub)?;

    assert_eq!(
        graph.incidences(hub)?,
        vec![inbound.reversed(), outbound, back.reversed()]
    );
    assert_eq!(graph.first_incidence(hub, Direction::Out)?, Some(outbound));
    assert_eq!(graph.first_incidence(hub, Direction::In)?, Some(inbound.reversed()));
    assert_eq!(graph.last_incidence(hub, Direction::In)?, Some(back.reversed()));
    assert_eq!(
        graph.next_incidence(hub, inbound.reversed(), Direction::In)?,
        Some(back.reversed())
    );
    assert_eq!(graph.prev_incidence(hub, back.reversed(), Direction::Out)?, Some(outbound));
    assert_eq!(graph.next_incidence(hub, back.reversed(), Direction::Any)?, None);
    assert_eq!(graph.degree(hub, Direction::In)?, 2);
    assert_eq!(graph.degree(hub, Direction::Out)?, 1);

    let edge = graph.get_edge(back.reversed())?.expect("edge resolves from reversed id");
    let edge = edge.borrow();
    assert_eq!(edge.id(), back);
    assert_eq!(edge.this_vertex(back), south);
    assert_eq!(edge.that_vertex(back), hub);
    assert_eq!(edge.this_vertex(back.reversed()), hub);
    assert_eq!(edge.that_vertex(back.reversed()), south);
    Ok(())
}

#[test]
fn incidence_reordering_keeps_edge_keys_in_sync() -> Result<()> {
    let db = open(GraphDbOptions::default())?;
    let mut graph = db.create_graph("g")?;
    let a = stop(&mut graph, "a")?;
    let b = stop(&mut graph, "b")?;
    let first = link(&mut graph, a, b)?;
    let second = link(&mut graph, a, b)?;
    let third = link(&mut graph, b, a)?;

    graph.put_incidence_before(a, first, third.reversed())?;
    assert_eq!(graph.incidences(a)?, vec![third.reversed(), first, second]);

    let edge = graph.get_edge(third)?.expect("third edge");
    let omega_seq = edge.borrow().omega_seq();
    let stored = db.backend().incidences(graph.id(), a)?;
    assert_eq!(stored[0].edge, third.reversed());
    assert_eq!(stored[0].seq, omega_seq);

    assert!(matches!(
        graph.put_incidence_after(b, first.reversed(), first.reversed()),
        Err(SeqGraphError::SelfPlacement)
    ));
    assert!(matches!(
        graph.append_incidence(b, first),
        Err(SeqGraphError::NotMember { list: ListKind::Incidence, .. })
    ));
    Ok(())
}

#[test]
fn missing_elements_read_as_none() -> Result<()> {
    let db = open(GraphDbOptions::default())?;
    let mut graph = db.create_graph("g")?;
    let a = stop(&mut graph, "a")?;

    assert!(graph.get_vertex(VertexId(999_999))?.is_none());
    assert!(graph.get_vertex(VertexId::UNASSIGNED)?.is_none());
    assert!(graph.get_edge(EdgeId(42))?.is_none());
    assert!(graph.get_edge(EdgeId::UNASSIGNED)?.is_none());
    assert_eq!(graph.vertex_attr(VertexId(7), "name")?, None);
    assert_eq!(graph.incidence_version(VertexId(7))?, None);
    assert!(!graph.delete_vertex(VertexId(7))?);

    let handle = graph.get_vertex(a)?.expect("vertex a");
    assert!(graph.delete_vertex(a)?);
    assert!(!handle.borrow().is_valid());
    assert!(graph.get_vertex(a)?.is_none());
    assert!(matches!(
        graph.set_vertex_attr(a, "name", "gone"),
        Err(SeqGraphError::NotMember { list: ListKind::Vertex, .. })
    ));
    Ok(())
}

#[test]
fn schema_errors_are_reported() -> Result<()> {
    let db = open(GraphDbOptions::default())?;
    let mut graph = db.create_graph("g")?;
    let a = stop(&mut graph, "a")?;
    let b = stop(&mut graph, "b")?;

    assert!(matches!(
        graph.create_vertex("Depot"),
        Err(SeqGraphError::UnknownType { kind: ElementKind::Vertex, .. })
    ));
    assert!(matches!(
        graph.create_edge("Stop", a, b),
        Err(SeqGraphError::UnknownType { kind: ElementKind::Edge, .. })
    ));
    assert!(matches!(
        graph.set_vertex_attr(a, "platform", 3i32),
        Err(SeqGraphError::UnknownAttribute { .. })
    ));
    assert!(matches!(
        graph.create_vertex_with("Stop", &[("zone", AttrValue::String("A".into()))]),
        Err(SeqGraphError::DomainMismatch { expected: "int", .. })
    ));
    assert!(matches!(
        graph.create_edge("Link", a, VertexId(77)),
        Err(SeqGraphError::NotMember { list: ListKind::Vertex, id: 77 })
    ));
    assert_eq!(graph.edge_count(), 0);
    Ok(())
}

#[test]
fn registered_factory_supplies_defaults() -> Result<()> {
    let mut db = open(GraphDbOptions::default())?;
    let stop_type = db.schema().type_id(ElementKind::Vertex, "Stop")?;
    let zone = db.schema().attr(stop_type, "zone")?.id;
    let name = db.schema().attr(stop_type, "name")?.id;
    db.register_factory(
        ElementKind::Vertex,
        "Stop",
        Box::new(move || {
            BTreeMap::from([
                (name, AttrValue::String("unnamed".into())),
                (zone, AttrValue::Int(4)),
            ])
        }),
    )?;

    let mut graph = db.create_graph("g")?;
    let vertex = graph.create_vertex("Stop")?;
    let id = vertex.borrow().id();
    assert_eq!(graph.vertex_attr(id, "zone")?, Some(AttrValue::Int(4)));
    assert_eq!(graph.vertex_attr(id, "name")?, Some("unnamed".into()));
    Ok(())
}

#[test]
fn failed_transaction_rolls_back_rows_only() -> Result<()> {
    let db = open(GraphDbOptions::default())?;
    let mut graph = db.create_graph("g")?;
    let kept = stop(&mut graph, "kept")?;

    let outcome: Result<()> = db.in_transaction(|| {
        stop(&mut graph, "discarded")?;
        Err(SeqGraphError::Invalid("abort import"))
    });
    assert!(matches!(outcome, Err(SeqGraphError::Invalid("abort import"))));
    assert!(!db.backend().in_transaction());

    let stored: Vec<VertexId> = db
        .backend()
        .vertex_order(graph.id())?
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(stored, vec![kept]);
    // In-memory state is not rolled back.
    assert_eq!(graph.vertex_count(), 2);

    let committed = db.in_transaction(|| stop(&mut graph, "committed"))?;
    assert!(db
        .backend()
        .vertex_order(graph.id())?
        .iter()
        .any(|&(id, _)| id == committed));
    Ok(())
}

#[test]
fn reopening_after_rollback_reads_stored_values() -> Result<()> {
    let db = open(GraphDbOptions::default())?;
    let mut graph = db.create_graph("g")?;
    let v = stop(&mut graph, "old")?;
    let held = graph.get_vertex(v)?.expect("vertex");

    db.begin()?;
    graph.set_vertex_attr(v, "name", "new")?;
    db.rollback()?;
    assert_eq!(graph.vertex_attr(v, "name")?, Some("new".into()));
    graph.close()?;

    let graph = db.open_graph("g")?.expect("stored graph");
    assert_eq!(graph.vertex_attr(v, "name")?, Some("old".into()));
    let fresh = graph.get_vertex(v)?.expect("vertex");
    assert!(!Rc::ptr_eq(&held, &fresh));
    Ok(())
}

#[test]
fn open_graph_cannot_be_deleted() -> Result<()> {
    let db = open(GraphDbOptions::default())?;
    let graph = db.create_graph("doomed")?;
    assert!(matches!(
        db.delete_graph("doomed"),
        Err(SeqGraphError::Invalid("graph is open"))
    ));
    assert!(matches!(
        db.create_graph("doomed"),
        Err(SeqGraphError::Invalid(_))
    ));
    drop(graph);

    assert!(db.delete_graph("doomed")?);
    assert!(!db.delete_graph("doomed")?);
    assert!(db.open_graph("doomed")?.is_none());
    Ok(())
}

#[test]
fn graphs_are_isolated_from_each_other() -> Result<()> {
    let db = open(GraphDbOptions::default())?;
    let mut left = db.create_graph("left")?;
    let mut right = db.create_graph("right")?;
    let l = stop(&mut left, "l")?;
    let r = stop(&mut right, "r")?;

    // Both graphs hand out the same first id.
    assert_eq!(l, r);
    left.set_vertex_attr(l, "zone", 9i32)?;
    assert_eq!(right.vertex_attr(r, "zone")?, Some(AttrValue::Int(1)));
    assert_eq!(left.vertex_attr(l, "zone")?, Some(AttrValue::Int(9)));
    Ok(())
}

#[test]
fn small_cache_evicts_and_refetches() -> Result<()> {
    let metrics = Arc::new(CounterMetrics::default());
    let options = GraphDbOptions::new()
        .vertex_cache_capacity(2)
        .cache_maintenance_interval(1)
        .metrics(metrics.clone());
    let db = open(options)?;
    let mut graph = db.create_graph("g")?;
    let ids = (0..6)
        .map(|n| stop(&mut graph, &format!("s{n}")))
        .collect::<Result<Vec<_>>>()?;

    let stats = db.vertex_cache_stats();
    assert_eq!(stats.resident, 2);
    assert!(stats.evictions >= 4);

    for (n, &id) in ids.iter().enumerate() {
        assert_eq!(
            graph.vertex_attr(id, "name")?,
            Some(AttrValue::String(format!("s{n}")))
        );
    }
    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.vertices_created, 6);
    assert!(snapshot.backend_fetches >= 4);
    assert!(snapshot.cache_evictions >= 4);
    Ok(())
}

#[test]
fn cache_membership_ends_with_explicit_removal() {
    let graph = GraphId(1);
    let mut cache: ElementCache<String> = ElementCache::new(1, 1);
    let first = Rc::new("first".to_owned());
    cache.put(graph, 1, Rc::clone(&first));
    assert!(cache.contains(graph, 1));

    // Pushed out of the bounded tier but still referenced here.
    cache.put(graph, 2, Rc::new("second".to_owned()));
    assert!(cache.contains(graph, 1));
    assert!(Rc::ptr_eq(&cache.get(graph, 1).expect("retained"), &first));

    assert!(cache.remove(graph, 1).is_some());
    assert!(!cache.contains(graph, 1));
    cache.put(graph, 3, Rc::new("third".to_owned()));
    assert!(!cache.contains(graph, 1));

    drop(first);
    cache.clear();
    assert!(!cache.contains(graph, 2));
    assert_eq!(cache.stats().resident, 0);
}
