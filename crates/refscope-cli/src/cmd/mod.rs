//! Subcommand handlers plus the pieces they share: loading facts, resolving
//! targets, node views and the ASCII tree.

pub mod completions;
pub mod export;
pub mod inspect;
pub mod references;

use std::collections::BTreeSet;
use std::path::Path;

use refscope_core::config::EffectiveConfig;
use refscope_core::error::ErrorCode;
use refscope_core::facts::FactsOracle;
use refscope_core::{DisplayIdentity, InspectionSession, Node};
use serde::Serialize;

use crate::output::{CliError, OutputMode, render_error};

pub type Session<'a> = InspectionSession<&'a FactsOracle>;

/// Load the facts file, applying the configured exclude prefixes.
pub fn load_facts(
    path: &Path,
    config: &EffectiveConfig,
    output: OutputMode,
) -> anyhow::Result<FactsOracle> {
    match FactsOracle::load(path) {
        Ok(oracle) => Ok(oracle.with_exclude_prefixes(config.project.scan.exclude_prefixes.clone())),
        Err(err) => {
            render_error(output, &CliError::from(&err))?;
            anyhow::bail!("{err}");
        }
    }
}

/// Targets from the command line, falling back to `[scan] default_targets`.
///
/// Every target must be declared in the facts file.
pub fn resolve_targets(
    requested: &[String],
    config: &EffectiveConfig,
    oracle: &FactsOracle,
    output: OutputMode,
) -> anyhow::Result<Vec<String>> {
    let targets = if requested.is_empty() {
        config.project.scan.default_targets.clone()
    } else {
        requested.to_vec()
    };

    if targets.is_empty() {
        let msg = "no targets given and no [scan] default_targets configured";
        render_error(output, &CliError::coded(msg, ErrorCode::UnknownTarget))?;
        anyhow::bail!("{msg}");
    }

    if let Some(unknown) = targets.iter().find(|t| !oracle.contains(t)) {
        let msg = format!("target '{unknown}' is not a declared entity");
        render_error(output, &CliError::coded(&msg, ErrorCode::UnknownTarget))?;
        anyhow::bail!("{msg}");
    }

    Ok(targets)
}

/// Serializable description of one node.
#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    pub id: String,
    pub label: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selects: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
    /// Scan roots that found the node (reference sessions only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub found_in: Vec<String>,
}

impl NodeView {
    pub fn new(session: &Session<'_>, node: &Node<String>) -> Self {
        let (kind, members) = match node {
            Node::Leaf(_) => ("leaf", Vec::new()),
            Node::Cluster(cluster) => ("cluster", cluster.members().iter().cloned().collect()),
        };
        let selects = match session.display_identity(node) {
            DisplayIdentity::Entity(entity) => Some(entity.clone()),
            DisplayIdentity::Aggregate(_) => None,
        };
        Self {
            id: node.to_string(),
            label: session.label(node),
            kind,
            members,
            selects,
            placeholder: session.is_placeholder(node),
            found_in: session.found_in(node).into_iter().cloned().collect(),
        }
    }
}

/// One `(source, target)` pair of the accumulated graph.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeView {
    pub source: String,
    pub target: String,
    pub label: String,
}

/// Every edge of the accumulated graph, in canonical order.
pub fn edge_views(session: &Session<'_>) -> Vec<EdgeView> {
    session
        .graph()
        .keys()
        .flat_map(|key| session.relations_of(key))
        .map(|relation| EdgeView {
            source: relation.source.to_string(),
            target: relation.target.to_string(),
            label: relation.label,
        })
        .collect()
}

/// Single-line label; cluster labels list one member per line.
pub fn inline_label(session: &Session<'_>, node: &Node<String>) -> String {
    session.label(node).replace('\n', ", ")
}

/// Draw the relations below each root as an ASCII tree.
///
/// A node already on the current path is printed with a cycle marker and
/// not expanded again. `depth` limits how many levels below a root are shown.
pub fn render_tree(session: &Session<'_>, roots: &BTreeSet<Node<String>>, depth: Option<usize>) -> String {
    let mut out = String::new();
    for root in roots {
        out.push_str(&inline_label(session, root));
        out.push('\n');
        let mut path = BTreeSet::from([root.clone()]);
        render_children(session, root, depth, 0, &mut path, "", &mut out);
    }
    out
}

fn render_children(
    session: &Session<'_>,
    node: &Node<String>,
    depth: Option<usize>,
    current_depth: usize,
    path: &mut BTreeSet<Node<String>>,
    prefix: &str,
    out: &mut String,
) {
    let children: Vec<Node<String>> = session
        .relations_of(node)
        .into_iter()
        .map(|relation| relation.target)
        .collect();
    if children.is_empty() {
        return;
    }

    if depth.is_some_and(|d| current_depth >= d) {
        out.push_str(&format!(
            "{prefix}└── … {} more (use --depth to increase)\n",
            children.len()
        ));
        return;
    }

    let count = children.len();
    for (i, child) in children.iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { "└── " } else { "├── " };
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let label = inline_label(session, child);

        if path.contains(child) {
            out.push_str(&format!("{prefix}{connector}{label} [⟳ cycle]\n"));
            continue;
        }

        out.push_str(&format!("{prefix}{connector}{label}\n"));
        path.insert(child.clone());
        render_children(session, child, depth, current_depth + 1, path, &child_prefix, out);
        path.remove(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACTS: &str = r#"
[entities.Scene]
depends_on = ["Scene", "A"]

[entities.A]
depends_on = ["Scene"]
"#;

    fn oracle() -> FactsOracle {
        FactsOracle::parse(FACTS, Path::new("facts.toml")).expect("valid facts")
    }

    fn scene() -> BTreeSet<Node<String>> {
        BTreeSet::from([Node::leaf("Scene".to_string())])
    }

    #[test]
    fn tree_marks_cycles() {
        // Scene and A reference each other, so the graph has no root of its
        // own; draw it from Scene.
        let oracle = oracle();
        let mut session = Session::dependencies(&oracle);
        session.init(&"Scene".to_string());
        let tree = render_tree(&session, &scene(), None);
        assert_eq!(tree, "Scene\n└── A\n    └── Scene [⟳ cycle]\n");
    }

    #[test]
    fn depth_limit_summarizes_hidden_children() {
        let oracle = oracle();
        let mut session = Session::dependencies(&oracle);
        session.init(&"Scene".to_string());
        let tree = render_tree(&session, &scene(), Some(1));
        assert_eq!(
            tree,
            "Scene\n└── A\n    └── … 1 more (use --depth to increase)\n"
        );
    }

    #[test]
    fn node_view_reports_placeholder() {
        let oracle = FactsOracle::parse("[entities.Lonely]\n", Path::new("f.toml")).expect("facts");
        let mut session = Session::dependencies(&oracle);
        let roots = session.init(&"Lonely".to_string());
        let root = roots.iter().next().expect("placeholder root");
        let view = NodeView::new(&session, root);
        assert!(view.placeholder);
        assert_eq!(view.label, "Lonely (unreferenced)");
        assert_eq!(view.kind, "leaf");
    }
}
