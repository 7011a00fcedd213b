use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Args;
use petgraph::dot::{Config, Dot};
use refscope_core::config::EffectiveConfig;
use refscope_core::map::MapStats;
use serde::Serialize;

use super::{EdgeView, NodeView, Session, edge_views, inline_label, load_facts, resolve_targets};
use crate::output::OutputMode;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Path to the facts file.
    pub facts: PathBuf,

    /// Entities to scan before exporting. Defaults to `[scan] default_targets`.
    pub targets: Vec<String>,

    /// Emit Graphviz DOT instead of JSON.
    #[arg(long)]
    pub dot: bool,

    /// Output path (defaults to stdout).
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct GraphExport {
    nodes: Vec<NodeView>,
    edges: Vec<EdgeView>,
    stats: MapStats,
}

fn export_json(session: &Session<'_>) -> anyhow::Result<String> {
    let export = GraphExport {
        nodes: session
            .graph()
            .nodes()
            .into_iter()
            .map(|node| NodeView::new(session, node))
            .collect(),
        edges: edge_views(session),
        stats: session.graph().stats(),
    };
    let mut json = serde_json::to_string_pretty(&export).context("failed to serialize graph")?;
    json.push('\n');
    Ok(json)
}

fn export_dot(session: &Session<'_>) -> String {
    let (graph, _) = session.graph().to_digraph();
    let labelled = graph.map(|_, node| inline_label(session, node), |_, _| "");
    format!("{}\n", Dot::with_config(&labelled, &[Config::EdgeNoLabel]))
}

pub fn run_export(
    args: &ExportArgs,
    config: &EffectiveConfig,
    output: OutputMode,
    _project_root: &Path,
) -> anyhow::Result<()> {
    let oracle = load_facts(&args.facts, config, output)?;
    let targets = resolve_targets(&args.targets, config, &oracle, output)?;

    let mut session = Session::dependencies(&oracle);
    for target in &targets {
        session.init(target);
    }

    // DOT only when asked for; every other mode gets JSON.
    let rendered = if args.dot {
        export_dot(&session)
    } else {
        export_json(&session)?
    };
    session.close();

    match args.output.as_ref() {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("failed to write export to {}", path.display()))?,
        None => std::io::stdout()
            .lock()
            .write_all(rendered.as_bytes())
            .context("failed to write export to stdout")?,
    }
    Ok(())
}
