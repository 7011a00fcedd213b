//! `refscope references`: list what references a target.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use refscope_core::config::EffectiveConfig;
use refscope_core::error::{ErrorCode, FactsError};
use refscope_core::facts::FactsOracle;
use refscope_core::SessionStats;
use serde::Serialize;

use super::{EdgeView, NodeView, Session, edge_views, load_facts, render_tree, resolve_targets};
use crate::output::{CliError, OutputMode, pretty_kv, pretty_rule, pretty_section, render_error, render_mode};

/// Arguments for `refscope references`.
#[derive(Args, Debug)]
pub struct ReferencesArgs {
    /// Path to the facts file.
    pub facts: PathBuf,

    /// Entity whose referencers are listed.
    pub target: String,

    /// Scan root to search from; repeatable. Defaults to the facts file's
    /// `scan_roots`.
    #[arg(long = "scan-root", value_name = "ENTITY")]
    pub scan_roots: Vec<String>,

    /// Maximum tree depth below each root (default: unlimited).
    #[arg(long)]
    pub depth: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ReferencesReport {
    pub target: String,
    pub scan_roots: Vec<String>,
    pub roots: Vec<NodeView>,
    pub relations: Vec<EdgeView>,
    pub session: SessionStats,
    #[serde(skip)]
    pub tree: String,
}

fn resolve_scan_roots(
    requested: &[String],
    oracle: &FactsOracle,
    output: OutputMode,
) -> anyhow::Result<Vec<String>> {
    let scan_roots = if requested.is_empty() {
        oracle.scan_roots().to_vec()
    } else {
        requested.to_vec()
    };

    if scan_roots.is_empty() {
        let msg = "no --scan-root given and the facts file declares no scan_roots";
        render_error(output, &CliError::coded(msg, ErrorCode::UnknownScanRoot))?;
        anyhow::bail!("{msg}");
    }

    if let Some(unknown) = scan_roots.iter().find(|r| !oracle.contains(r)) {
        let err = FactsError::UnknownScanRoot(unknown.clone());
        render_error(output, &CliError::from(&err))?;
        anyhow::bail!("{err}");
    }

    Ok(scan_roots)
}

pub fn build_report(
    oracle: &FactsOracle,
    target: &str,
    scan_roots: Vec<String>,
    depth: Option<usize>,
) -> ReferencesReport {
    let mut session = Session::references(oracle, scan_roots.clone());
    let roots = session.init(&target.to_string());

    let report = ReferencesReport {
        target: target.to_string(),
        scan_roots,
        roots: roots.iter().map(|root| NodeView::new(&session, root)).collect(),
        relations: edge_views(&session),
        session: session.stats(),
        tree: render_tree(&session, &roots, depth),
    };
    session.close();
    report
}

pub fn run_references(
    args: &ReferencesArgs,
    config: &EffectiveConfig,
    output: OutputMode,
    _project_root: &Path,
) -> anyhow::Result<()> {
    let oracle = load_facts(&args.facts, config, output)?;
    let target = resolve_targets(std::slice::from_ref(&args.target), config, &oracle, output)?;
    let scan_roots = resolve_scan_roots(&args.scan_roots, &oracle, output)?;
    let depth = args.depth.or(config.max_depth);

    let Some(target) = target.first() else {
        anyhow::bail!("no target resolved");
    };
    let report = build_report(&oracle, target, scan_roots, depth);

    render_mode(
        output,
        &report,
        |report, w| {
            for edge in &report.relations {
                writeln!(w, "{} <- {}", edge.source, edge.target)?;
            }
            Ok(())
        },
        write_pretty,
    )
}

fn write_pretty(report: &ReferencesReport, w: &mut dyn Write) -> std::io::Result<()> {
    pretty_section(w, &format!("References to {}", report.target))?;
    write!(w, "{}", report.tree)?;
    pretty_rule(w)?;
    pretty_kv(w, "Scan roots", report.scan_roots.join(", "))?;
    pretty_kv(w, "Roots", report.roots.len().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACTS: &str = r#"
scan_roots = ["Scene"]

[entities.Scene]
depends_on = ["Player", "Enemy"]

[entities.Player]
depends_on = ["Mesh"]

[entities.Enemy]
depends_on = ["Mesh", "Sword"]
"#;

    fn oracle() -> FactsOracle {
        FactsOracle::parse(FACTS, Path::new("facts.toml")).expect("facts")
    }

    #[test]
    fn referencers_are_grouped_under_target() {
        let oracle = oracle();
        let report = build_report(&oracle, "Mesh", oracle.scan_roots().to_vec(), None);

        assert_eq!(report.roots.len(), 1);
        assert_eq!(report.roots[0].kind, "cluster");
        assert_eq!(report.roots[0].members, vec!["Enemy".to_string(), "Player".to_string()]);
        assert!(report.session.clusters_created >= 1);
    }

    #[test]
    fn scan_roots_default_to_facts_file() {
        let oracle = oracle();
        let roots = resolve_scan_roots(&[], &oracle, OutputMode::Text).expect("roots");
        assert_eq!(roots, vec!["Scene".to_string()]);
    }

    #[test]
    fn undeclared_scan_root_is_rejected() {
        let oracle = oracle();
        let result = resolve_scan_roots(&["Nowhere".to_string()], &oracle, OutputMode::Text);
        assert!(result.is_err());
    }
}
