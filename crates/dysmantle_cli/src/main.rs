use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde_json::{Map as JsonMap, Value as JsonValue};

use dysmantle_core::catalog;
use dysmantle_core::core_api::{CoreError, CoreErrorCode, Engine, Session, Snapshot};

#[derive(Parser, Debug)]
#[command(version, about = "Inspect and edit Dysmantle save containers")]
struct Cli {
    /// Path to the save file
    save: PathBuf,

    /// List every player-state node id
    #[arg(long)]
    nodes: bool,

    /// Print one node's attributes as name=value lines
    #[arg(long, value_name = "ID", conflicts_with = "nodes")]
    node: Option<String>,

    /// Print the material catalog
    #[arg(long)]
    materials: bool,

    /// Print the known stage index paths
    #[arg(long)]
    stages: bool,

    /// Render query output as JSON
    #[arg(long)]
    json: bool,

    /// Stage one attribute edit, format NODE:ATTR=VALUE (repeatable)
    #[arg(long = "set", value_name = "NODE:ATTR=VALUE", allow_hyphen_values = true)]
    set: Vec<String>,

    /// Track a new material at quantity 0, format NODE:NAME (repeatable)
    #[arg(long = "add-material", value_name = "NODE:NAME")]
    add_material: Vec<String>,

    /// Stop tracking a material, format NODE:NAME (repeatable)
    #[arg(long = "remove-material", value_name = "NODE:NAME")]
    remove_material: Vec<String>,

    /// Where to write the edited save
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(long)]
    force_overwrite: bool,

    /// Backup directory for the original save (default: backups next to it)
    #[arg(long, value_name = "DIR")]
    backup_dir: Option<PathBuf>,

    /// Skip the pre-edit backup copy
    #[arg(long, conflicts_with = "backup_dir")]
    no_backup: bool,
}

fn main() {
    let cli = Cli::parse();

    let has_edits =
        !cli.set.is_empty() || !cli.add_material.is_empty() || !cli.remove_material.is_empty();
    if has_edits && cli.output.is_none() {
        eprintln!("--set/--add-material/--remove-material require --output <PATH>");
        process::exit(2);
    }
    if cli.output.is_some() && !has_edits {
        eprintln!("--output requires at least one --set/--add-material/--remove-material");
        process::exit(2);
    }

    let engine = Engine::new();
    let mut session = match open_session(&engine, &cli, has_edits) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error opening {}: {e}", cli.save.display());
            process::exit(1);
        }
    };

    // -----------------------------------------------------------------------
    // Stage edits
    // -----------------------------------------------------------------------
    for spec in &cli.set {
        let Some((node, name, value)) = parse_set_spec(spec) else {
            eprintln!("invalid --set value '{spec}', expected NODE:ATTR=VALUE");
            process::exit(2);
        };
        if let Err(e) = session.set_value(node, name, value) {
            eprintln!("Error applying --set {spec}: {e}");
            process::exit(1);
        }
    }
    for spec in &cli.add_material {
        let Some((node, material)) = parse_material_spec(spec) else {
            eprintln!("invalid --add-material value '{spec}', expected NODE:NAME");
            process::exit(2);
        };
        if let Err(e) = session.add_material(node, material) {
            eprintln!("Error applying --add-material {spec}: {e}");
            process::exit(1);
        }
    }
    for spec in &cli.remove_material {
        let Some((node, material)) = parse_material_spec(spec) else {
            eprintln!("invalid --remove-material value '{spec}', expected NODE:NAME");
            process::exit(2);
        };
        if let Err(e) = session.remove_material(node, material) {
            eprintln!("Error applying --remove-material {spec}: {e}");
            process::exit(1);
        }
    }

    let query_requested = cli.nodes || cli.node.is_some() || cli.materials || cli.stages;

    // -----------------------------------------------------------------------
    // Write the edited container
    // -----------------------------------------------------------------------
    if let Some(out_path) = &cli.output {
        if out_path.exists() && !cli.force_overwrite {
            eprintln!(
                "refusing to overwrite existing file {} (use --force-overwrite)",
                out_path.display()
            );
            process::exit(1);
        }
        if let Err(e) = session.save_to_path(out_path) {
            eprintln!("Error writing {}: {e}", out_path.display());
            process::exit(1);
        }
        // stdout carries either the write report or the requested view,
        // never both.
        let report_to_stderr = cli.json || query_requested;
        if let Some(backup) = session.backup_path() {
            if report_to_stderr {
                eprintln!("Backed up original to {}", backup.display());
            } else {
                println!("Backed up original to {}", backup.display());
            }
        }
        if report_to_stderr {
            eprintln!("Wrote edited save to {}", out_path.display());
        } else {
            println!("Wrote edited save to {}", out_path.display());
        }
    }

    // -----------------------------------------------------------------------
    // JSON output
    // -----------------------------------------------------------------------
    if cli.json && (query_requested || cli.output.is_none()) {
        let rendered = if cli.nodes {
            serde_json::to_value(session.nodes())
        } else if let Some(id) = &cli.node {
            match session.node(id) {
                Some(node) => serde_json::to_value(node),
                None => {
                    eprintln!("no node with id \"{id}\"");
                    process::exit(1);
                }
            }
        } else if cli.materials {
            serde_json::to_value(catalog::MATERIALS.as_slice())
        } else if cli.stages {
            serde_json::to_value(catalog::STAGE_INDEX_PATHS)
        } else {
            summary_json(&cli.save, session.snapshot())
        };
        match rendered {
            Ok(value) => println!(
                "{}",
                serde_json::to_string_pretty(&value).unwrap_or_else(|e| {
                    eprintln!("Error rendering JSON: {e}");
                    process::exit(1);
                })
            ),
            Err(e) => {
                eprintln!("Error rendering JSON: {e}");
                process::exit(1);
            }
        }
        return;
    }

    // -----------------------------------------------------------------------
    // Plain output
    // -----------------------------------------------------------------------
    if cli.nodes {
        for node in session.nodes() {
            if node.editable {
                println!("{}", node.id);
            } else {
                println!("{} [inert]", node.id);
            }
        }
    } else if let Some(id) = &cli.node {
        let Some(node) = session.node(id) else {
            eprintln!("no node with id \"{id}\"");
            process::exit(1);
        };
        for entry in &node.attributes {
            println!("{}={}", entry.name, entry.value);
        }
    } else if cli.materials {
        for material in catalog::MATERIALS.iter().filter(|name| !name.is_empty()) {
            println!("{material}");
        }
    } else if cli.stages {
        for stage in catalog::STAGE_INDEX_PATHS {
            println!("{stage}");
        }
    } else if cli.output.is_none() {
        print_summary(&cli.save, session.snapshot());
    }
}

fn open_session(engine: &Engine, cli: &Cli, has_edits: bool) -> Result<Session, CoreError> {
    if has_edits && !cli.no_backup {
        let backup_dir = match &cli.backup_dir {
            Some(dir) => dir.clone(),
            None => match cli.save.parent() {
                Some(parent) => parent.join("backups"),
                None => PathBuf::from("backups"),
            },
        };
        engine.open_path(&cli.save, &backup_dir)
    } else {
        let bytes = fs::read(&cli.save).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read {}: {e}", cli.save.display()),
            )
        })?;
        engine.open_bytes(bytes)
    }
}

fn parse_set_spec(spec: &str) -> Option<(&str, &str, &str)> {
    let (node, assignment) = spec.split_once(':')?;
    let (name, value) = assignment.split_once('=')?;
    if node.is_empty() || name.is_empty() {
        return None;
    }
    Some((node, name, value))
}

fn parse_material_spec(spec: &str) -> Option<(&str, &str)> {
    let (node, material) = spec.split_once(':')?;
    if node.is_empty() || material.is_empty() {
        return None;
    }
    Some((node, material))
}

fn summary_json(path: &Path, snapshot: &Snapshot) -> Result<JsonValue, serde_json::Error> {
    let mut map = JsonMap::new();
    map.insert(
        "path".to_string(),
        JsonValue::String(path.display().to_string()),
    );
    map.insert("container".to_string(), serde_json::to_value(snapshot)?);
    Ok(JsonValue::Object(map))
}

fn print_summary(path: &Path, snapshot: &Snapshot) {
    println!("Save container: {}", path.display());
    println!("  Root element:  <{}>", snapshot.root_name);
    println!(
        "  Payload:       {} compressed bytes (header declares {})",
        snapshot.payload_len, snapshot.declared_payload_len
    );
    println!("  Decompressed:  {} bytes", snapshot.decompressed_len);
    println!(
        "  Region:        bytes {}..{}",
        snapshot.region.start, snapshot.region.end
    );
    println!(
        "  Nodes:         {} ({} editable)",
        snapshot.node_count, snapshot.editable_node_count
    );
}
