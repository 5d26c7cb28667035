use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use pipetree_config::{PipelineDef, build_tree};
use pipetree_operator::{OperatorRegistry, Output, Value};
use pipetree_tree::{NodeId, TransformationTree};

/// Pipetree - build, run and compare trees of data-processing pipelines
#[derive(Parser)]
#[command(name = "pipetree")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.pipetree)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Build a tree from a pipeline definition and execute every branch
  Run {
    /// Path to the pipeline definition (JSON)
    pipeline_file: PathBuf,

    /// Save the built tree as a named snapshot in the data directory
    #[arg(long)]
    save: Option<String>,

    /// Only print the N best results
    #[arg(long)]
    top: Option<usize>,
  },

  /// Print every branch of a saved tree
  Inspect {
    /// Snapshot name in the data directory, or a path to a snapshot file
    snapshot: String,
  },

  /// List the registered operators
  Operators,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "pipetree=info".into()),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".pipetree"),
  };

  match cli.command {
    Some(Commands::Run {
      pipeline_file,
      save,
      top,
    }) => run_pipeline(&pipeline_file, save.as_deref(), top, &data_dir)?,
    Some(Commands::Inspect { snapshot }) => inspect(&snapshot, &data_dir)?,
    Some(Commands::Operators) => list_operators()?,
    None => {
      println!("pipetree - use --help to see available commands");
    }
  }

  Ok(())
}

fn registry() -> Result<OperatorRegistry> {
  pipetree_timeseries::registry().context("failed to register operators")
}

fn snapshot_path(data_dir: &Path, name: &str) -> PathBuf {
  data_dir.join("trees").join(format!("{name}.json"))
}

fn run_pipeline(pipeline_file: &Path, save: Option<&str>, top: Option<usize>, data_dir: &Path) -> Result<()> {
  let def = PipelineDef::from_file(pipeline_file)
    .with_context(|| format!("failed to load pipeline: {}", pipeline_file.display()))?;
  info!(pipeline = %def.name, nodes = def.node_count(), "pipeline loaded");

  let mut tree = build_tree(&def, registry()?).context("failed to build tree")?;

  if let Some(name) = save {
    let path = snapshot_path(data_dir, name);
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    pipetree_tree::save(&tree, &path).with_context(|| format!("failed to save tree: {}", path.display()))?;
    info!(path = %path.display(), "tree saved");
  }

  let results = tree.execute_tree().context("tree execution failed")?.to_vec();

  let (mut ranked, other): (Vec<_>, Vec<_>) = results
    .iter()
    .partition(|(output, _)| output.as_f64().is_some_and(|v| !v.is_nan()));
  ranked.sort_by(|a, b| {
    let (a, b) = (a.0.as_f64().unwrap_or(f64::NAN), b.0.as_f64().unwrap_or(f64::NAN));
    a.total_cmp(&b)
  });

  let limit = top.unwrap_or(ranked.len());
  for (rank, (output, node)) in ranked.iter().take(limit).enumerate() {
    println!("{:>3}. {}  {}", rank + 1, output, path_of(&tree, *node)?);
  }
  for (output, node) in &other {
    if matches!(output, Output::Single(Value::Null)) {
      warn!(node = %node, "result is null, left unranked");
    }
  }
  if top.is_none() {
    for (output, node) in other {
      println!("   -  {}  {}", summarize(output), path_of(&tree, *node)?);
    }
  }

  Ok(())
}

fn path_of(tree: &TransformationTree, node: NodeId) -> Result<String> {
  tree
    .get_path_str(node)
    .with_context(|| format!("no path to node {node}"))
}

/// Long outputs (whole series) are cut down to their first characters.
fn summarize(output: &Output) -> String {
  const MAX: usize = 60;
  let text = output.to_string();
  match text.char_indices().nth(MAX) {
    Some((cut, _)) => format!("{}...", &text[..cut]),
    None => text,
  }
}

fn inspect(snapshot: &str, data_dir: &Path) -> Result<()> {
  let direct = PathBuf::from(snapshot);
  let path = if direct.is_file() {
    direct
  } else {
    snapshot_path(data_dir, snapshot)
  };

  let tree = pipetree_tree::load(&path, registry()?)
    .with_context(|| format!("failed to load tree: {}", path.display()))?;

  println!("{} ({} nodes)", path.display(), tree.len());
  for leaf in tree.leaves() {
    println!("  {}", path_of(&tree, leaf)?);
  }

  Ok(())
}

fn list_operators() -> Result<()> {
  let registry = registry()?;
  for signature in registry.signatures() {
    println!(
      "{:<16} {:<10} [{}] -> [{}]",
      signature.name,
      signature.kind,
      signature.inputs.join(", "),
      signature.outputs.join(", ")
    );
  }
  Ok(())
}
