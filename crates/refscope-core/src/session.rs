//! Inspection sessions: the accumulated graph and its host-facing surface.
//!
//! A session owns one [`DependencyMap`] that only ever grows. Each call to
//! [`InspectionSession::init`] runs one or more scans, merges them in and
//! reports the current roots. Display code then walks the graph lazily via
//! [`InspectionSession::relations_of`].
//!
//! # Cluster lifetime
//!
//! Every cluster a scan creates is handed back to the oracle through
//! [`DependencyOracle::release_cluster`] exactly once: immediately when a
//! scan prunes it or a merge replaces it with an equal accumulated cluster,
//! otherwise when the session is closed. Dropping a session without calling
//! [`InspectionSession::close`] releases the remaining clusters as well, with
//! a warning.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::map::DependencyMap;
use crate::merge::merge_into;
use crate::node::{Cluster, DisplayIdentity, Entity, Node};
use crate::oracle::DependencyOracle;
use crate::pipeline::{Scan, scan};
use crate::roots::find_roots;

/// Suffix of the label given to a target nothing references.
pub const UNREFERENCED_SUFFIX: &str = "(unreferenced)";

/// Which direction a session inspects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode<E: Entity> {
    /// What the target depends on.
    Dependencies,
    /// What references the target, searched from each scan root.
    References { scan_roots: Vec<E> },
}

/// One displayed edge. The label is currently always empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relation<E: Entity> {
    pub source: Node<E>,
    pub target: Node<E>,
    pub label: String,
}

/// Counters kept over the lifetime of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub scans: usize,
    pub clusters_created: usize,
    pub clusters_released: usize,
}

/// Accumulated reference graph for one inspection.
pub struct InspectionSession<O: DependencyOracle> {
    oracle: O,
    mode: SessionMode<O::Entity>,
    graph: DependencyMap<O::Entity>,
    placeholders: BTreeMap<O::Entity, String>,
    found_in: BTreeMap<Node<O::Entity>, BTreeSet<O::Entity>>,
    stats: SessionStats,
    closed: bool,
}

impl<O: DependencyOracle> InspectionSession<O> {
    pub fn new(oracle: O, mode: SessionMode<O::Entity>) -> Self {
        Self {
            oracle,
            mode,
            graph: DependencyMap::new(),
            placeholders: BTreeMap::new(),
            found_in: BTreeMap::new(),
            stats: SessionStats::default(),
            closed: false,
        }
    }

    /// Session inspecting what targets depend on.
    pub fn dependencies(oracle: O) -> Self {
        Self::new(oracle, SessionMode::Dependencies)
    }

    /// Session inspecting what references targets, scanning from `scan_roots`.
    pub fn references(oracle: O, scan_roots: Vec<O::Entity>) -> Self {
        Self::new(oracle, SessionMode::References { scan_roots })
    }

    pub const fn mode(&self) -> &SessionMode<O::Entity> {
        &self.mode
    }

    pub const fn oracle(&self) -> &O {
        &self.oracle
    }

    /// The accumulated graph.
    pub const fn graph(&self) -> &DependencyMap<O::Entity> {
        &self.graph
    }

    pub const fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Scan for `target`, merge the result and return the current roots.
    ///
    /// While the accumulated graph has no edges at all, the target itself is
    /// returned as a placeholder leaf labelled `"<name> (unreferenced)"`.
    #[instrument(skip(self), level = "debug")]
    pub fn init(&mut self, target: &O::Entity) -> BTreeSet<Node<O::Entity>> {
        let scan_roots = match &self.mode {
            SessionMode::Dependencies => None,
            SessionMode::References { scan_roots } => Some(scan_roots.clone()),
        };

        match scan_roots {
            None => {
                let result = scan(&self.oracle, target, &BTreeSet::new());
                let graph = self.absorb(result);
                self.merge(graph);
            }
            Some(scan_roots) => {
                let targets = BTreeSet::from([target.clone()]);
                let mut scratch = DependencyMap::new();
                for root in &scan_roots {
                    let result = scan(&self.oracle, root, &targets);
                    self.record_scan_root(root, &result);
                    let graph = self.absorb(result);
                    let report = merge_into(&mut scratch, graph);
                    self.release_all(&report.discarded);
                }
                debug!(
                    scan_roots = scan_roots.len(),
                    keys = scratch.len(),
                    "inverting reference scans"
                );
                self.merge(scratch.inverted());
            }
        }

        if self.graph.edge_count() == 0 {
            let label = format!("{} {UNREFERENCED_SUFFIX}", self.oracle.describe(target));
            warn!(label = %label, "nothing accumulated; returning placeholder");
            self.placeholders.insert(target.clone(), label);
            return BTreeSet::from([Node::Leaf(target.clone())]);
        }
        self.placeholders.clear();

        let roots = find_roots(&self.graph);
        info!(
            roots = roots.len(),
            keys = self.graph.len(),
            edges = self.graph.edge_count(),
            "session initialized"
        );
        roots
    }

    /// Current roots of the accumulated graph.
    #[must_use]
    pub fn roots(&self) -> BTreeSet<Node<O::Entity>> {
        find_roots(&self.graph)
    }

    /// Outgoing edges of `node` in the accumulated graph.
    ///
    /// Unknown nodes (placeholders included) have no relations.
    #[must_use]
    pub fn relations_of(&self, node: &Node<O::Entity>) -> Vec<Relation<O::Entity>> {
        let Some(source) = self.graph.canonical_key(node) else {
            return Vec::new();
        };
        self.graph
            .successors(source)
            .into_iter()
            .flatten()
            .map(|target| Relation {
                source: source.clone(),
                target: target.clone(),
                label: String::new(),
            })
            .collect()
    }

    /// What selecting `node` should point at.
    ///
    /// The accumulated instance of a cluster is consulted, so the anchor
    /// recorded by the first scan wins.
    #[must_use]
    pub fn display_identity<'a>(&'a self, node: &'a Node<O::Entity>) -> DisplayIdentity<'a, O::Entity> {
        self.graph
            .canonical_key(node)
            .unwrap_or(node)
            .display_identity()
    }

    /// Scan roots whose reference scan found `node`. Always empty for
    /// dependency sessions.
    #[must_use]
    pub fn found_in(&self, node: &Node<O::Entity>) -> BTreeSet<&O::Entity> {
        self.found_in
            .get(node)
            .map(|roots| roots.iter().collect())
            .unwrap_or_default()
    }

    /// Text shown for `node`.
    ///
    /// In reference sessions every scan root that found the node adds an
    /// `in <root>` line.
    #[must_use]
    pub fn label(&self, node: &Node<O::Entity>) -> String {
        if let Node::Leaf(entity) = node {
            if let Some(placeholder) = self.placeholders.get(entity) {
                return placeholder.clone();
            }
        }
        let mut label = self.identity_label(node);
        for root in self.found_in(node) {
            label.push_str("\nin ");
            label.push_str(&self.oracle.describe(root));
        }
        label
    }

    fn identity_label(&self, node: &Node<O::Entity>) -> String {
        match self.display_identity(node) {
            DisplayIdentity::Entity(entity) => self.oracle.describe(entity),
            DisplayIdentity::Aggregate(cluster) => cluster
                .members()
                .iter()
                .map(|member| self.oracle.describe(member))
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// `true` if `node` is the placeholder returned for an unreferenced target.
    #[must_use]
    pub fn is_placeholder(&self, node: &Node<O::Entity>) -> bool {
        node.as_leaf()
            .is_some_and(|entity| self.placeholders.contains_key(entity))
    }

    /// Release every cluster still held and end the session.
    pub fn close(mut self) -> SessionStats {
        self.release_held();
        self.closed = true;
        info!(
            scans = self.stats.scans,
            created = self.stats.clusters_created,
            released = self.stats.clusters_released,
            "session closed"
        );
        self.stats
    }

    /// Remember `root` for every node of its scan except the scan root itself.
    fn record_scan_root(&mut self, root: &O::Entity, result: &Scan<O::Entity>) {
        for node in result.graph.nodes() {
            if node.covers(root) {
                continue;
            }
            self.found_in
                .entry(node.clone())
                .or_default()
                .insert(root.clone());
        }
    }

    fn absorb(&mut self, result: Scan<O::Entity>) -> DependencyMap<O::Entity> {
        self.stats.scans += 1;
        self.stats.clusters_created += result.created.len();
        self.release_all(&result.pruned);
        result.graph
    }

    fn merge(&mut self, incoming: DependencyMap<O::Entity>) {
        let report = merge_into(&mut self.graph, incoming);
        self.release_all(&report.discarded);
    }

    fn release_all(&mut self, clusters: &[Cluster<O::Entity>]) {
        for cluster in clusters {
            self.oracle.release_cluster(cluster);
        }
        self.stats.clusters_released += clusters.len();
    }

    fn release_held(&mut self) -> usize {
        let held: Vec<Cluster<O::Entity>> = self.graph.clusters().into_iter().cloned().collect();
        self.release_all(&held);
        self.graph = DependencyMap::new();
        held.len()
    }
}

impl<O: DependencyOracle> Drop for InspectionSession<O> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let released = self.release_held();
        if released > 0 {
            warn!(released, "session dropped without close; released held clusters");
        }
    }
}

impl<O: DependencyOracle> std::fmt::Debug for InspectionSession<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InspectionSession")
            .field("mode", &self.mode)
            .field("stats", &self.stats)
            .field("graph", &self.graph.stats())
            .field("placeholders", &self.placeholders.len())
            .field("found_in", &self.found_in.len())
            .finish_non_exhaustive()
    }
}
