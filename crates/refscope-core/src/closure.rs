//! Bounded two-hop neighborhood around a scan root.
//!
//! The oracle is asked once for the root and once for each of the root's
//! direct dependencies. Keys of the result are exactly those dependencies;
//! the root only shows up as a key if one of them depends on it in turn.
//! Wider coverage comes from scanning other roots and merging, never from
//! recursing further here.

use tracing::{debug, instrument};

use crate::map::DependencyMap;
use crate::oracle::DependencyOracle;

/// Build the two-level dependency map for `root`.
#[instrument(skip(oracle), level = "debug")]
pub fn build_closure<O>(oracle: &O, root: &O::Entity) -> DependencyMap<O::Entity>
where
    O: DependencyOracle + ?Sized,
{
    let direct = oracle.direct_dependencies(root);
    let map = DependencyMap::from_entities(
        direct
            .into_iter()
            .map(|dep| {
                let deps = oracle.direct_dependencies(&dep);
                (dep, deps)
            }),
    );

    debug!(
        keys = map.len(),
        edges = map.edge_count(),
        "closure built"
    );
    map
}
