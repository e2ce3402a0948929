//! Binary entry point for the seqgraph administrative CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use seqgraph::admin::{stats, verify, AdminError, StatsReport, VerifyLevel, VerifyReport};
use seqgraph::backend::{BackendRegistry, GraphRow, SyncMode};
use seqgraph::config::{BackendKind, SeqGraphConfig};
use seqgraph::schema::Schema;
use seqgraph::storage::GraphDatabase;
use seqgraph::types::{EdgeId, SeqNum, VertexId};

/// Registry name of the connection the CLI works on.
const CONNECTION: &str = "default";
/// Schema the CLI registers; it declares no types and only reads structure.
const CLI_SCHEMA: &str = "seqgraph-cli";

#[derive(Parser, Debug)]
#[command(
    name = "seqgraph",
    version,
    about = "Administrative CLI for seqgraph databases",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(flatten)]
    open: OpenArgs,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct OpenArgs {
    #[arg(
        long,
        global = true,
        env = "SEQGRAPH_CONFIG",
        value_name = "FILE",
        help = "Configuration file (defaults to the platform config dir)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "SQLite database file, overriding the configured backend"
    )]
    db: Option<PathBuf>,

    #[arg(long, global = true, value_enum, help = "SQLite synchronous mode override")]
    synchronous: Option<SynchronousArg>,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "List stored graphs")]
    Graphs,

    #[command(about = "Create an empty graph")]
    Create {
        #[arg(value_name = "GRAPH")]
        name: String,
    },

    #[command(about = "Report counts, versions, key spacing and cache counters")]
    Stats {
        #[arg(value_name = "GRAPH")]
        name: String,
    },

    #[command(about = "Cross-check in-memory lists against stored rows")]
    Verify {
        #[arg(value_name = "GRAPH")]
        name: String,

        #[arg(long, value_enum, default_value_t = VerifyLevelArg::Full)]
        level: VerifyLevelArg,
    },

    #[command(about = "Print the vertex, edge and incidence orders of a graph")]
    Dump {
        #[arg(value_name = "GRAPH")]
        name: String,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum SynchronousArg {
    Full,
    Normal,
    Off,
}

impl From<SynchronousArg> for SyncMode {
    fn from(mode: SynchronousArg) -> Self {
        match mode {
            SynchronousArg::Full => SyncMode::Full,
            SynchronousArg::Normal => SyncMode::Normal,
            SynchronousArg::Off => SyncMode::Off,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum VerifyLevelArg {
    Fast,
    Full,
}

impl From<VerifyLevelArg> for VerifyLevel {
    fn from(level: VerifyLevelArg) -> Self {
        match level {
            VerifyLevelArg::Fast => VerifyLevel::Fast,
            VerifyLevelArg::Full => VerifyLevel::Full,
        }
    }
}

#[derive(Debug, Serialize)]
struct DumpReport {
    graph: String,
    vertices: Vec<DumpVertex>,
    edges: Vec<DumpEdge>,
}

#[derive(Debug, Serialize)]
struct DumpVertex {
    id: VertexId,
    seq: SeqNum,
    type_id: u32,
    incidences: Vec<(EdgeId, SeqNum)>,
}

#[derive(Debug, Serialize)]
struct DumpEdge {
    id: EdgeId,
    seq: SeqNum,
    type_id: u32,
    alpha: VertexId,
    omega: VertexId,
}

fn main() {
    install_tracing_subscriber();
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn install_tracing_subscriber() {
    let filter = EnvFilter::try_from_env("SEQGRAPH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Returns `Ok(false)` when verification found problems.
fn run() -> Result<bool, Box<dyn Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.open)?;
    let mut registry = BackendRegistry::new();
    registry.open(CONNECTION, &config.backend)?;
    let db = GraphDatabase::open(
        &registry,
        CONNECTION,
        &Schema::new(CLI_SCHEMA),
        config.graph.clone(),
    )?;

    match cli.command {
        Command::Graphs => {
            let graphs = db.graphs()?;
            emit(cli.format, &graphs, || print_graphs_text(&graphs))?;
        }
        Command::Create { name } => {
            let graph = db.create_graph(&name)?;
            let row = GraphRow {
                id: graph.id(),
                name: graph.name().to_owned(),
                version: graph.version(),
                vertex_list_version: graph.vertex_list_version(),
                edge_list_version: graph.edge_list_version(),
            };
            graph.close()?;
            emit(cli.format, &row, || println!("Created graph '{}' (id {})", row.name, row.id))?;
        }
        Command::Stats { name } => {
            let graph = db
                .open_graph(&name)?
                .ok_or_else(|| AdminError::missing_graph(&name))?;
            let report = stats(&db, &graph)?;
            emit(cli.format, &report, || print_stats_text(&report))?;
        }
        Command::Verify { name, level } => {
            let graph = db
                .open_graph(&name)?
                .ok_or_else(|| AdminError::missing_graph(&name))?;
            let report = verify(&graph, level.into())?;
            emit(cli.format, &report, || print_verify_text(&report))?;
            return Ok(report.success);
        }
        Command::Dump { name } => {
            let report = dump(&db, &name)?;
            emit(cli.format, &report, || print_dump_text(&report))?;
        }
    }
    Ok(true)
}

fn load_config(args: &OpenArgs) -> Result<SeqGraphConfig, AdminError> {
    let mut config = SeqGraphConfig::load(args.config.clone())?;
    if let Some(path) = &args.db {
        config.backend.kind = BackendKind::Sqlite;
        config.backend.path = Some(path.clone());
    }
    if let Some(mode) = args.synchronous {
        config.backend.synchronous = mode.into();
    }
    if config.backend.kind == BackendKind::Sqlite && config.backend.path.is_none() {
        return Err(AdminError::Message(
            "no database configured; pass --db or set backend.path in the config file".into(),
        ));
    }
    Ok(config)
}

fn dump(db: &GraphDatabase, name: &str) -> Result<DumpReport, AdminError> {
    let graph = db
        .open_graph(name)?
        .ok_or_else(|| AdminError::missing_graph(name))?;
    let backend = db.backend();

    let mut vertices = Vec::with_capacity(graph.vertex_count());
    for (id, seq) in backend.vertex_order(graph.id())? {
        let row = backend
            .fetch_vertex(graph.id(), id)?
            .ok_or_else(|| AdminError::Message(format!("vertex {id} has no stored row")))?;
        let incidences = backend
            .incidences(graph.id(), id)?
            .into_iter()
            .map(|incidence| (incidence.edge, incidence.seq))
            .collect();
        vertices.push(DumpVertex {
            id,
            seq,
            type_id: row.type_id.0,
            incidences,
        });
    }

    let mut edges = Vec::with_capacity(graph.edge_count());
    for (id, seq) in backend.edge_order(graph.id())? {
        let row = backend
            .fetch_edge(graph.id(), id)?
            .ok_or_else(|| AdminError::Message(format!("edge {id} has no stored row")))?;
        edges.push(DumpEdge {
            id,
            seq,
            type_id: row.type_id.0,
            alpha: row.alpha,
            omega: row.omega,
        });
    }

    Ok(DumpReport {
        graph: graph.name().to_owned(),
        vertices,
        edges,
    })
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_graphs_text(graphs: &[GraphRow]) {
    if graphs.is_empty() {
        println!("No graphs stored");
        return;
    }
    for graph in graphs {
        println!(
            "{} (id={}) version={} vertex_list_version={} edge_list_version={}",
            graph.name, graph.id, graph.version, graph.vertex_list_version, graph.edge_list_version
        );
    }
}

fn print_stats_text(report: &StatsReport) {
    println!(
        "Graph '{}' (id={}): vertices={} edges={} loading={}",
        report.graph.name,
        report.graph.id,
        report.graph.vertices,
        report.graph.edges,
        report.graph.loading
    );
    println!(
        "  versions: graph={} vertex_list={} edge_list={}",
        report.graph.versions.graph,
        report.graph.versions.vertex_list,
        report.graph.versions.edge_list
    );
    println!();
    for (label, list) in [("Vertex list", &report.vertex_list), ("Edge list", &report.edge_list)] {
        println!(
            "{label}: len={} first_key={} last_key={} min_gap={}",
            list.len,
            display_opt(list.first_key),
            display_opt(list.last_key),
            display_opt(list.min_gap)
        );
    }
    println!();
    println!(
        "Ids: vertices {}/{} edges {}/{}",
        report.ids.vertex_used, report.ids.vertex_capacity, report.ids.edge_used, report.ids.edge_capacity
    );
    for (label, cache) in [("vertices", &report.cache.vertices), ("edges", &report.cache.edges)] {
        println!(
            "Cache ({label}): hits={} misses={} evictions={} drained={} resident={} retained={}",
            cache.hits, cache.misses, cache.evictions, cache.drained, cache.resident, cache.retained
        );
    }
    println!();
    println!(
        "Backend: vendor={} graphs={} in_transaction={}",
        report.backend.vendor, report.backend.graphs, report.backend.in_transaction
    );
}

fn print_verify_text(report: &VerifyReport) {
    println!(
        "Verify {} ({:?}) => success={} vertices={} edges={} incidences={} resident_lists={}",
        report.graph,
        report.level,
        report.success,
        report.counts.vertices_checked,
        report.counts.edges_checked,
        report.counts.incidence_entries,
        report.counts.resident_lists_compared,
    );
    for finding in &report.findings {
        println!("- {:?}: {}", finding.severity, finding.message);
    }
}

fn print_dump_text(report: &DumpReport) {
    println!("Graph '{}'", report.graph);
    println!("Vertices:");
    for vertex in &report.vertices {
        let incidences: Vec<String> = vertex
            .incidences
            .iter()
            .map(|(edge, seq)| format!("{edge}@{seq}"))
            .collect();
        println!(
            "  {} seq={} type={} [{}]",
            vertex.id,
            vertex.seq,
            vertex.type_id,
            incidences.join(", ")
        );
    }
    println!("Edges:");
    for edge in &report.edges {
        println!(
            "  {} seq={} type={} {} -> {}",
            edge.id, edge.seq, edge.type_id, edge.alpha, edge.omega
        );
    }
}

fn display_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_owned(), |v| v.to_string())
}

