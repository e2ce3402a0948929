#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::rc::Rc;

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use seqgraph::backend::{SqlBackend, SqliteBackend, SyncMode};
use seqgraph::schema::{AttrDef, AttrDomain, Schema};
use seqgraph::storage::{GraphDatabase, GraphDbOptions};
use tempfile::TempDir;

fn schema() -> Schema {
    Schema::new("rail")
        .vertex_type("Station", vec![AttrDef::new("name", AttrDomain::String)])
        .edge_type("Track", Vec::new())
}

fn open_db(path: &Path) -> GraphDatabase {
    let backend: Rc<dyn SqlBackend> =
        Rc::new(SqliteBackend::open(path, SyncMode::Normal).expect("open sqlite"));
    GraphDatabase::with_backend(backend, &schema(), GraphDbOptions::default()).expect("open db")
}

/// Database with one graph `line`: three stations, two tracks, the last
/// station moved to the front.
fn setup_db() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("rail.db");
    let db = open_db(&path);
    let mut graph = db.create_graph("line").expect("create graph");
    let ids: Vec<_> = ["north", "central", "south"]
        .into_iter()
        .map(|name| {
            let vertex = graph
                .create_vertex_with("Station", &[("name", name.into())])
                .expect("station");
            let id = vertex.borrow().id();
            id
        })
        .collect();
    graph.create_edge("Track", ids[0], ids[1]).expect("track");
    graph.create_edge("Track", ids[1], ids[2]).expect("track");
    graph.prepend_vertex(ids[2]).expect("prepend");
    graph.close().expect("close");
    (dir, path)
}

fn json_output(path: &Path, args: &[&str]) -> Value {
    let output = cargo_bin_cmd!("seqgraph")
        .env_remove("SEQGRAPH_CONFIG")
        .arg("--db")
        .arg(path)
        .args(["--format", "json"])
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("valid json")
}

#[test]
fn graphs_lists_stored_graphs() {
    let (_dir, path) = setup_db();
    let json = json_output(&path, &["graphs"]);
    let graphs = json.as_array().expect("array of graphs");
    assert_eq!(graphs.len(), 1);
    assert_eq!(graphs[0]["name"], "line");
    assert_eq!(graphs[0]["version"], 6);
    assert_eq!(graphs[0]["vertex_list_version"], 4);
    assert_eq!(graphs[0]["edge_list_version"], 2);
}

#[test]
fn create_then_list_in_text_mode() {
    let (_dir, path) = setup_db();
    cargo_bin_cmd!("seqgraph")
        .env_remove("SEQGRAPH_CONFIG")
        .arg("--db")
        .arg(&path)
        .args(["create", "spur"])
        .assert()
        .success();

    let output = cargo_bin_cmd!("seqgraph")
        .env_remove("SEQGRAPH_CONFIG")
        .arg("--db")
        .arg(&path)
        .arg("graphs")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.contains("line (id="), "{text}");
    assert!(text.contains("spur (id="), "{text}");
}

#[test]
fn stats_reports_counts_and_spacing() {
    let (_dir, path) = setup_db();
    let json = json_output(&path, &["stats", "line"]);
    assert_eq!(json["graph"]["name"], "line");
    assert_eq!(json["graph"]["vertices"], 3);
    assert_eq!(json["graph"]["edges"], 2);
    assert_eq!(json["graph"]["loading"], false);
    assert_eq!(json["vertex_list"]["len"], 3);
    assert_eq!(json["vertex_list"]["first_key"], -(1i64 << 32));
    assert_eq!(json["vertex_list"]["min_gap"], 1u64 << 32);
    assert_eq!(json["ids"]["vertex_used"], 3);
    assert_eq!(json["backend"]["vendor"], "sqlite");
}

#[test]
fn verify_full_succeeds_on_healthy_graph() {
    let (_dir, path) = setup_db();
    let json = json_output(&path, &["verify", "line"]);
    assert_eq!(json["success"], true, "{json}");
    assert_eq!(json["level"], "full");
    assert_eq!(json["counts"]["vertices_checked"], 3);
    assert_eq!(json["counts"]["incidence_entries"], 4);
}

#[test]
fn colliding_vertex_keys_fail_to_open() {
    let (_dir, path) = setup_db();
    {
        let backend = SqliteBackend::open(&path, SyncMode::Normal).expect("open sqlite");
        let graph = backend.fetch_graph("line").expect("query").expect("graph row");
        let order = backend.vertex_order(graph.id).expect("vertex order");
        backend
            .update_vertex_seq(graph.id, order[0].0, order[1].1)
            .expect("overwrite key");
    }

    cargo_bin_cmd!("seqgraph")
        .env_remove("SEQGRAPH_CONFIG")
        .arg("--db")
        .arg(&path)
        .args(["verify", "--level", "fast", "line"])
        .assert()
        .code(1);
}

#[test]
fn verify_exits_with_two_on_duplicate_incidence_keys() {
    let (_dir, path) = setup_db();
    {
        let backend = SqliteBackend::open(&path, SyncMode::Normal).expect("open sqlite");
        let graph = backend.fetch_graph("line").expect("query").expect("graph row");
        let (central, _) = backend.vertex_order(graph.id).expect("vertex order")[2];
        let rows = backend.incidences(graph.id, central).expect("incidences");
        backend
            .update_incidence_seq(graph.id, central, rows[1].edge, rows[0].seq)
            .expect("overwrite incidence key");
    }

    let output = cargo_bin_cmd!("seqgraph")
        .env_remove("SEQGRAPH_CONFIG")
        .arg("--db")
        .arg(&path)
        .args(["--format", "json", "verify", "line"])
        .assert()
        .code(2)
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["success"], false);
    let findings = json["findings"].as_array().expect("findings");
    assert!(findings
        .iter()
        .any(|f| f["message"].as_str().is_some_and(|m| m.contains("used more than once"))));
}

#[test]
fn dump_prints_orders() {
    let (_dir, path) = setup_db();
    let json = json_output(&path, &["dump", "line"]);
    let vertices = json["vertices"].as_array().expect("vertices");
    let ids: Vec<i64> = vertices
        .iter()
        .map(|v| v["id"].as_i64().expect("vertex id"))
        .collect();
    assert_eq!(ids, vec![3, 1, 2]);
    let central = &vertices[2];
    let incidences: Vec<i64> = central["incidences"]
        .as_array()
        .expect("incidences")
        .iter()
        .map(|pair| pair[0].as_i64().expect("edge id"))
        .collect();
    assert_eq!(incidences, vec![-1, 2]);

    let edges = json["edges"].as_array().expect("edges");
    assert_eq!(edges.len(), 2);
    assert_eq!(edges[1]["alpha"], 2);
    assert_eq!(edges[1]["omega"], 3);
}

#[test]
fn missing_graph_fails() {
    let (_dir, path) = setup_db();
    let output = cargo_bin_cmd!("seqgraph")
        .env_remove("SEQGRAPH_CONFIG")
        .arg("--db")
        .arg(&path)
        .args(["stats", "nowhere"])
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf8");
    assert!(stderr.contains("nowhere"), "{stderr}");
}

#[test]
fn missing_database_path_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("seqgraph.toml");
    std::fs::write(&config, "[backend]\nkind = \"sqlite\"\n").expect("write config");
    cargo_bin_cmd!("seqgraph")
        .arg("--config")
        .arg(&config)
        .arg("graphs")
        .assert()
        .code(1);
}
