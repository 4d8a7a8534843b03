//! studymap CLI - generate, re-layout and store study-map diagrams
//!
//! Usage: studymap-cli [OPTIONS] <COMMAND>
//!
//! Graphs are read and written as JSON so the output can be handed to any
//! renderer. Use --json for machine-readable output everywhere.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

use studymap_lib::category::source::{CategorySource, StaticCategories, TagFrequencySource};
use studymap_lib::db::{Database, MindMapRecord};
use studymap_lib::settings::{self, Settings};
use studymap_lib::utils::truncate_label;
use studymap_lib::{CategoryTree, Graph, InMemoryContent, ItemQuery, LayoutGenerator, LayoutKind};

// ============================================================================
// Main CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "studymap-cli")]
#[command(version, about = "Study map diagram CLI", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Database path (default: from settings, then the app data directory)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Settings file (default: <data dir>/studymap/settings.json)
    #[arg(long, global = true)]
    settings: Option<String>,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    json: bool,

    /// Detailed logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out a category tree (or tags derived from content) as a graph
    Generate {
        /// Category tree JSON file
        #[arg(long, short)]
        categories: Option<PathBuf>,
        /// Content list JSON file (attached to leaves, or used to derive categories)
        #[arg(long)]
        content: Option<PathBuf>,
        /// radial, tree, force or circular (default: from settings)
        #[arg(long, short)]
        layout: Option<String>,
        #[arg(long)]
        max_depth: Option<u32>,
        /// Leave out the central root node
        #[arg(long)]
        no_root: bool,
        /// Write the graph here instead of stdout
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Build a tag-centred map from a content list
    Items {
        #[arg(long)]
        content: PathBuf,
        /// Free-text search over title, file name and tags
        #[arg(long, short)]
        search: Option<String>,
        /// Only items carrying all of these tags
        #[arg(long, short, value_delimiter = ',')]
        tag: Vec<String>,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Recompute positions of an edited graph
    Reflow {
        #[arg(long, short)]
        input: PathBuf,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Stored mind maps
    Map {
        #[command(subcommand)]
        cmd: MapCommands,
    },
    /// Settings
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum MapCommands {
    /// Store a graph file as a mind map (updates when --id is given)
    Save {
        #[arg(long, short)]
        input: PathBuf,
        #[arg(long, short)]
        title: String,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long)]
        id: Option<i64>,
    },
    /// List stored mind maps
    List {
        #[arg(long)]
        tag: Option<String>,
        #[arg(long)]
        starred: bool,
    },
    /// Print one mind map (counts as a view)
    Show { id: i64 },
    Delete { id: i64 },
    /// Export a mind map document as JSON
    Export {
        id: i64,
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Import an exported mind map document
    Import { file: PathBuf },
    /// Star (or with --off, unstar) a mind map
    Star {
        id: i64,
        #[arg(long)]
        off: bool,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    List,
    Get { key: String },
    Set { key: String, value: String },
}

// ============================================================================
// Entry point
// ============================================================================

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run_cli(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<(), String> {
    let settings_path = cli
        .settings
        .clone()
        .map(PathBuf::from)
        .or_else(settings::default_settings_path)
        .unwrap_or_else(|| PathBuf::from(settings::SETTINGS_FILE));
    let settings = Settings::load(&settings_path);
    debug!(path = %settings_path.display(), "settings loaded");

    match cli.command {
        Commands::Generate { categories, content, layout, max_depth, no_root, out } => {
            handle_generate(&settings, categories, content, layout, max_depth, no_root, out, cli.json)
        }
        Commands::Items { content, search, tag, out } => {
            handle_items(&settings, &content, search, tag, out, cli.json)
        }
        Commands::Reflow { input, out } => handle_reflow(&settings, &input, out, cli.json),
        Commands::Map { cmd } => {
            let db = open_database(cli.db.as_deref(), &settings)?;
            handle_map(cmd, &db, cli.json)
        }
        Commands::Config { cmd } => handle_config(cmd, settings, &settings_path, cli.json),
    }
}

fn open_database(explicit: Option<&str>, settings: &Settings) -> Result<Database, String> {
    let path = explicit
        .map(PathBuf::from)
        .or_else(|| settings.resolved_db_path())
        .unwrap_or_else(|| PathBuf::from(settings::DB_FILE));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
    }
    debug!(path = %path.display(), "opening database");
    Database::new(&path).map_err(|e| e.to_string())
}

// ============================================================================
// I/O helpers
// ============================================================================

fn read_file(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))
}

fn load_content(path: &Path) -> Result<InMemoryContent, String> {
    InMemoryContent::from_json(&read_file(path)?)
        .map_err(|e| format!("Invalid content file {}: {}", path.display(), e))
}

fn load_graph(path: &Path) -> Result<Graph, String> {
    let graph = Graph::from_json(&read_file(path)?)
        .map_err(|e| format!("Invalid graph file {}: {}", path.display(), e))?;
    graph.validate().map_err(|e| format!("Invalid graph {}: {}", path.display(), e))?;
    Ok(graph)
}

/// Write the graph to `out`, or print it. Without --json a printed graph is
/// shown as a short summary instead.
fn emit_graph(graph: &Graph, out: Option<PathBuf>, json: bool) -> Result<(), String> {
    let text = graph.to_json().map_err(|e| e.to_string())?;
    match out {
        Some(path) => {
            fs::write(&path, text)
                .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
            if json {
                let out = serde_json::to_string(&path.display().to_string())
                    .map_err(|e| e.to_string())?;
                println!(
                    r#"{{"nodes":{},"edges":{},"out":{}}}"#,
                    graph.node_count(),
                    graph.edge_count(),
                    out
                );
            } else {
                println!(
                    "Wrote {} nodes, {} edges to {}",
                    graph.node_count(),
                    graph.edge_count(),
                    path.display()
                );
            }
        }
        None if json => println!("{}", text),
        None => print_graph_summary(graph),
    }
    Ok(())
}

fn print_graph_summary(graph: &Graph) {
    println!("{} nodes, {} edges", graph.node_count(), graph.edge_count());
    for node in &graph.nodes {
        let indent = "  ".repeat(node.level as usize);
        let extra = match &node.truncated {
            Some(t) => format!(" [hidden: {} categories, {} items]", t.categories, t.content),
            None if node.count > 0 => format!(" ({})", node.count),
            None => String::new(),
        };
        println!(
            "{}{} {:<32}{} @ ({:.1}, {:.1})",
            indent,
            node.kind.as_str(),
            truncate_label(&node.label, 32),
            extra,
            node.position.x,
            node.position.y
        );
    }
}

// ============================================================================
// Graph commands
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn handle_generate(
    settings: &Settings,
    categories: Option<PathBuf>,
    content: Option<PathBuf>,
    layout: Option<String>,
    max_depth: Option<u32>,
    no_root: bool,
    out: Option<PathBuf>,
    json: bool,
) -> Result<(), String> {
    let kind = match layout {
        Some(name) => LayoutKind::from_str(&name).ok_or_else(|| format!("Unknown layout: {}", name))?,
        None => settings.default_layout,
    };
    let mut options = settings.layout.clone();
    if let Some(depth) = max_depth {
        options.max_depth = depth;
    }
    if no_root {
        options.include_root = false;
    }

    let store = content.as_deref().map(load_content).transpose()?;
    let tree = match (&categories, &store) {
        (Some(path), _) => {
            let tree = CategoryTree::from_json(&read_file(path)?)
                .map_err(|e| format!("Invalid category file {}: {}", path.display(), e))?;
            StaticCategories(tree).categories()
        }
        (None, Some(store)) => TagFrequencySource::new(store).categories(),
        (None, None) => return Err("Provide --categories or --content".to_string()),
    };

    let graph = match (&categories, &store) {
        (Some(_), Some(store)) => LayoutGenerator::generate_with_content(&tree, kind, &options, store),
        _ => LayoutGenerator::generate(&tree, kind, &options),
    }
    .map_err(|e| e.to_string())?;

    emit_graph(&graph, out, json)
}

fn handle_items(
    settings: &Settings,
    content: &Path,
    search: Option<String>,
    tags: Vec<String>,
    out: Option<PathBuf>,
    json: bool,
) -> Result<(), String> {
    let store = load_content(content)?;
    let query = ItemQuery {
        search: search.unwrap_or_default(),
        tags,
    };
    let graph = LayoutGenerator::generate_from_items(store.items(), &query, &settings.layout);
    emit_graph(&graph, out, json)
}

fn handle_reflow(settings: &Settings, input: &Path, out: Option<PathBuf>, json: bool) -> Result<(), String> {
    let graph = load_graph(input)?;
    let reflowed = settings.auto_layout().reflow(&graph);
    emit_graph(&reflowed, out, json)
}

// ============================================================================
// Map commands
// ============================================================================

fn print_record_line(record: &MindMapRecord) {
    println!(
        "{:>4} {} {:<40} {:>3} nodes  {:>4} views  {}  [{}]",
        record.id,
        if record.starred { "*" } else { " " },
        truncate_label(&record.title, 40),
        record.content.graph.node_count(),
        record.view_count,
        record.updated_at.format("%Y-%m-%d %H:%M"),
        record.tags.join(", ")
    );
}

fn handle_map(cmd: MapCommands, db: &Database, json: bool) -> Result<(), String> {
    match cmd {
        MapCommands::Save { input, title, description, tags, id } => {
            let graph = load_graph(&input)?;
            let mut record = match id {
                Some(id) => {
                    let mut existing = db
                        .get(id)
                        .map_err(|e| e.to_string())?
                        .ok_or_else(|| format!("Mind map not found: {}", id))?;
                    existing.content.graph = graph;
                    existing.title = title;
                    existing
                }
                None => MindMapRecord::new(title, graph),
            };
            if description.is_some() {
                record.description = description;
            }
            if !tags.is_empty() {
                record.tags = tags;
            }
            let id = db.save(&mut record).map_err(|e| e.to_string())?;
            if json {
                println!(r#"{{"id":{}}}"#, id);
            } else {
                println!("Saved mind map {} ({})", id, record.title);
            }
        }
        MapCommands::List { tag, starred } => {
            let mut records = match tag {
                Some(tag) => db.find_by_tag(&tag),
                None => db.list(),
            }
            .map_err(|e| e.to_string())?;
            if starred {
                records.retain(|r| r.starred);
            }
            if json {
                println!("{}", serde_json::to_string(&records).map_err(|e| e.to_string())?);
            } else if records.is_empty() {
                println!("No mind maps in {}", db.get_path());
            } else {
                println!("{} mind maps in {}", records.len(), db.get_path());
                for record in &records {
                    print_record_line(record);
                }
            }
        }
        MapCommands::Show { id } => {
            db.record_view(id).map_err(|e| e.to_string())?;
            let record = db
                .get(id)
                .map_err(|e| e.to_string())?
                .ok_or_else(|| format!("Mind map not found: {}", id))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record).map_err(|e| e.to_string())?);
            } else {
                print_record_line(&record);
                if let Some(desc) = &record.description {
                    println!("     {}", desc);
                }
                print_graph_summary(&record.content.graph);
            }
        }
        MapCommands::Delete { id } => {
            let removed = db.delete(id).map_err(|e| e.to_string())?;
            if !removed {
                return Err(format!("Mind map not found: {}", id));
            }
            if json {
                println!(r#"{{"deleted":{}}}"#, id);
            } else {
                println!("Deleted mind map {}", id);
            }
        }
        MapCommands::Export { id, out } => {
            let text = db.export_json(id).map_err(|e| e.to_string())?;
            match out {
                Some(path) => {
                    fs::write(&path, text)
                        .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;
                    if !json {
                        println!("Exported mind map {} to {}", id, path.display());
                    }
                }
                None => println!("{}", text),
            }
        }
        MapCommands::Import { file } => {
            let id = db.import_json(&read_file(&file)?).map_err(|e| e.to_string())?;
            if json {
                println!(r#"{{"id":{}}}"#, id);
            } else {
                println!("Imported as mind map {}", id);
            }
        }
        MapCommands::Star { id, off } => {
            db.set_starred(id, !off).map_err(|e| e.to_string())?;
            if !json {
                println!("{} mind map {}", if off { "Unstarred" } else { "Starred" }, id);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Config commands
// ============================================================================

fn handle_config(cmd: ConfigCommands, mut settings: Settings, path: &Path, json: bool) -> Result<(), String> {
    match cmd {
        ConfigCommands::List => {
            if json {
                println!("{}", serde_json::to_string_pretty(&settings).map_err(|e| e.to_string())?);
            } else {
                println!("settings file: {}", path.display());
                for key in Settings::keys() {
                    println!("{:<28} {}", key, settings.get(key).unwrap_or_default());
                }
            }
        }
        ConfigCommands::Get { key } => {
            let value = settings
                .get(&key)
                .ok_or_else(|| format!("Unknown config key: {}", key))?;
            if json {
                println!("{}", serde_json::to_string(&value).map_err(|e| e.to_string())?);
            } else {
                println!("{}", value);
            }
        }
        ConfigCommands::Set { key, value } => {
            settings.set(&key, &value)?;
            settings.save(path)?;
            if !json {
                println!("{} = {}", key, value);
            }
        }
    }
    Ok(())
}
