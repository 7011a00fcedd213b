//! `refscope inspect`: show what targets depend on.
//!
//! Every target is scanned into one session, so the output is the union of
//! all their reduced dependency graphs.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use refscope_core::config::EffectiveConfig;
use refscope_core::map::MapStats;
use refscope_core::SessionStats;
use serde::Serialize;
use tracing::debug;

use super::{EdgeView, NodeView, Session, edge_views, load_facts, render_tree, resolve_targets};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

/// Arguments for `refscope inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the facts file.
    pub facts: PathBuf,

    /// Entities to inspect. Defaults to `[scan] default_targets`.
    pub targets: Vec<String>,

    /// Maximum tree depth below each root (default: unlimited).
    #[arg(long)]
    pub depth: Option<usize>,
}

/// Everything one inspection reports.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub targets: Vec<String>,
    pub roots: Vec<NodeView>,
    pub relations: Vec<EdgeView>,
    pub graph: MapStats,
    pub session: SessionStats,
    #[serde(skip)]
    pub tree: String,
}

/// Run every target through one dependency session and summarize it.
pub fn build_report(session: &mut Session<'_>, targets: &[String], depth: Option<usize>) -> InspectReport {
    // Each init returns the roots of everything accumulated so far, or a
    // placeholder while nothing has edges.
    let mut roots = BTreeSet::new();
    for target in targets {
        roots = session.init(target);
        debug!(target = %target, roots = roots.len(), "target scanned");
    }

    InspectReport {
        targets: targets.to_vec(),
        roots: roots.iter().map(|root| NodeView::new(session, root)).collect(),
        relations: edge_views(session),
        graph: session.graph().stats(),
        session: session.stats(),
        tree: render_tree(session, &roots, depth),
    }
}

pub fn run_inspect(
    args: &InspectArgs,
    config: &EffectiveConfig,
    output: OutputMode,
    _project_root: &Path,
) -> anyhow::Result<()> {
    let oracle = load_facts(&args.facts, config, output)?;
    let targets = resolve_targets(&args.targets, config, &oracle, output)?;
    let depth = args.depth.or(config.max_depth);

    let mut session = Session::dependencies(&oracle);
    let report = build_report(&mut session, &targets, depth);
    let stats = session.close();
    debug!(released = stats.clusters_released, "session closed");

    render_mode(output, &report, write_text, write_pretty)
}

fn write_text(report: &InspectReport, w: &mut dyn Write) -> std::io::Result<()> {
    for root in &report.roots {
        writeln!(w, "root {}", root.id)?;
    }
    for edge in &report.relations {
        writeln!(w, "{} -> {}", edge.source, edge.target)?;
    }
    Ok(())
}

fn write_pretty(report: &InspectReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("Dependencies of {}", report.targets.join(", ")))?;
    write!(w, "{}", report.tree)?;
    pretty_rule(w)?;
    pretty_kv(w, "Roots", report.roots.len().to_string())?;
    pretty_kv(w, "Nodes", report.graph.node_count.to_string())?;
    pretty_kv(w, "Edges", report.graph.edge_count.to_string())?;
    pretty_kv(w, "Clusters", report.graph.cluster_count.to_string())
}
