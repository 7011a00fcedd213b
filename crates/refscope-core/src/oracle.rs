//! The host capability the engine consumes, plus an in-memory implementation.
//!
//! The engine never decides on its own what references what. Everything it
//! knows comes through [`DependencyOracle::direct_dependencies`], which is
//! treated as pure for the duration of a scan. Hosts are free to filter
//! their answers (generated artifacts, library files, ...) and the engine
//! takes them as given.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use crate::node::{Cluster, Entity, MemberSet};

/// Fact source for one inspection.
pub trait DependencyOracle {
    /// Host handle type.
    type Entity: Entity;

    /// Entities `entity` references directly.
    fn direct_dependencies(&self, entity: &Self::Entity) -> BTreeSet<Self::Entity>;

    /// The member owning every other member of `members`, if any.
    ///
    /// Lets a cluster made of a container and its attachments display as
    /// the container.
    fn anchor_of(&self, _members: &MemberSet<Self::Entity>) -> Option<Self::Entity> {
        None
    }

    /// Called exactly once for every cluster the engine stops holding.
    ///
    /// Hosts that attach resources to aggregate nodes free them here.
    fn release_cluster(&self, _cluster: &Cluster<Self::Entity>) {}

    /// Human-readable name for labels.
    fn describe(&self, entity: &Self::Entity) -> String {
        format!("{entity:?}")
    }
}

impl<O: DependencyOracle + ?Sized> DependencyOracle for &O {
    type Entity = O::Entity;

    fn direct_dependencies(&self, entity: &Self::Entity) -> BTreeSet<Self::Entity> {
        (**self).direct_dependencies(entity)
    }

    fn anchor_of(&self, members: &MemberSet<Self::Entity>) -> Option<Self::Entity> {
        (**self).anchor_of(members)
    }

    fn release_cluster(&self, cluster: &Cluster<Self::Entity>) {
        (**self).release_cluster(cluster);
    }

    fn describe(&self, entity: &Self::Entity) -> String {
        (**self).describe(entity)
    }
}

// ---------------------------------------------------------------------------
// StaticOracle
// ---------------------------------------------------------------------------

/// Oracle backed by a fixed table of facts.
///
/// Ownership facts (`owner_of`) drive anchor resolution: a cluster is
/// anchored on the one member that owns all the others. Released clusters
/// are recorded so callers can audit the release contract.
#[derive(Debug, Clone)]
pub struct StaticOracle<E: Entity> {
    dependencies: BTreeMap<E, BTreeSet<E>>,
    owners: BTreeMap<E, E>,
    released: RefCell<Vec<Cluster<E>>>,
}

impl<E: Entity> Default for StaticOracle<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> StaticOracle<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dependencies: BTreeMap::new(),
            owners: BTreeMap::new(),
            released: RefCell::new(Vec::new()),
        }
    }

    /// Build from `(entity, dependencies)` pairs.
    pub fn from_facts<I, D>(facts: I) -> Self
    where
        I: IntoIterator<Item = (E, D)>,
        D: IntoIterator<Item = E>,
    {
        let mut oracle = Self::new();
        for (entity, deps) in facts {
            oracle.add_dependencies(entity, deps);
        }
        oracle
    }

    /// Record that `entity` references each of `deps`.
    pub fn add_dependencies(&mut self, entity: E, deps: impl IntoIterator<Item = E>) {
        self.dependencies.entry(entity).or_default().extend(deps);
    }

    /// Record that `part` is an owned sub-part of `owner`.
    pub fn set_owner(&mut self, part: E, owner: E) {
        self.owners.insert(part, owner);
    }

    #[must_use]
    pub fn owner_of(&self, entity: &E) -> Option<&E> {
        self.owners.get(entity)
    }

    /// Every entity mentioned by a fact, as a key or a dependency.
    #[must_use]
    pub fn entities(&self) -> BTreeSet<&E> {
        self.dependencies
            .iter()
            .flat_map(|(key, deps)| std::iter::once(key).chain(deps.iter()))
            .chain(self.owners.iter().flat_map(|(part, owner)| [part, owner]))
            .collect()
    }

    /// Clusters handed back through [`DependencyOracle::release_cluster`].
    #[must_use]
    pub fn released(&self) -> Vec<Cluster<E>> {
        self.released.borrow().clone()
    }
}

impl<E: Entity> DependencyOracle for StaticOracle<E> {
    type Entity = E;

    fn direct_dependencies(&self, entity: &E) -> BTreeSet<E> {
        self.dependencies.get(entity).cloned().unwrap_or_default()
    }

    fn anchor_of(&self, members: &MemberSet<E>) -> Option<E> {
        if members.len() < 2 {
            return None;
        }
        members
            .iter()
            .find(|candidate| {
                members
                    .iter()
                    .filter(|m| m != candidate)
                    .all(|m| self.owners.get(m) == Some(*candidate))
            })
            .cloned()
    }

    fn release_cluster(&self, cluster: &Cluster<E>) {
        self.released.borrow_mut().push(cluster.clone());
    }
}
