//! Graph node model: leaves alias host entities, clusters aggregate them.
//!
//! # Equality
//!
//! A [`Cluster`] is identified by its member set alone. Two clusters built
//! by different scans compare equal (and hash identically) whenever their
//! members coincide, regardless of anchor. Every collapse and merge step
//! relies on this, so member sets get a dedicated type, [`MemberSet`], whose
//! hash is computed over the canonical (sorted) member order.

#![allow(clippy::module_name_repetitions)]

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

/// Bounds every host entity handle must satisfy.
///
/// Equality is host identity. Ordering is only used to give member sets a
/// canonical order and to keep output deterministic; it carries no meaning.
pub trait Entity: Clone + Eq + Ord + Hash + fmt::Debug {}

impl<T> Entity for T where T: Clone + Eq + Ord + Hash + fmt::Debug {}

// ---------------------------------------------------------------------------
// MemberSet
// ---------------------------------------------------------------------------

/// Non-empty, order-independent set of entities.
///
/// Backed by a `BTreeSet`, so iteration order is canonical and the derived
/// `Hash` feeds members to the hasher in sorted order: two sets that are
/// set-equal always hash the same, whatever order they were built in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MemberSet<E>(BTreeSet<E>);

impl<E: Entity> MemberSet<E> {
    /// Build a member set. Returns `None` for an empty input.
    pub fn new(members: impl IntoIterator<Item = E>) -> Option<Self> {
        let set: BTreeSet<E> = members.into_iter().collect();
        if set.is_empty() { None } else { Some(Self(set)) }
    }

    /// A set holding exactly one entity.
    #[must_use]
    pub fn singleton(entity: E) -> Self {
        Self(BTreeSet::from([entity]))
    }

    #[must_use]
    pub fn contains(&self, entity: &E) -> bool {
        self.0.contains(entity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Members in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.0.iter()
    }

    /// The smallest member in canonical order.
    #[must_use]
    pub fn first(&self) -> Option<&E> {
        self.0.first()
    }

    #[must_use]
    pub const fn as_set(&self) -> &BTreeSet<E> {
        &self.0
    }
}

impl<'a, E> IntoIterator for &'a MemberSet<E> {
    type Item = &'a E;
    type IntoIter = std::collections::btree_set::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Cluster
// ---------------------------------------------------------------------------

/// Synthetic aggregate of entities the engine could not tell apart by their
/// outgoing edges.
///
/// `anchor` names the one member that owns every other member (a container
/// plus its attachments). Display and selection collapse anchored clusters
/// to the anchor. The anchor never takes part in equality.
#[derive(Debug, Clone, Serialize)]
pub struct Cluster<E> {
    members: MemberSet<E>,
    #[serde(skip_serializing_if = "Option::is_none")]
    anchor: Option<E>,
}

impl<E: Entity> Cluster<E> {
    /// Create a cluster. An anchor that is not a member is dropped.
    #[must_use]
    pub fn new(members: MemberSet<E>, anchor: Option<E>) -> Self {
        let anchor = anchor.filter(|a| members.contains(a));
        Self { members, anchor }
    }

    /// Singleton cluster wrapping one entity, used for synthesized scan roots.
    #[must_use]
    pub fn wrapping(entity: E) -> Self {
        Self {
            members: MemberSet::singleton(entity),
            anchor: None,
        }
    }

    #[must_use]
    pub const fn members(&self) -> &MemberSet<E> {
        &self.members
    }

    #[must_use]
    pub const fn anchor(&self) -> Option<&E> {
        self.anchor.as_ref()
    }

    #[must_use]
    pub fn contains(&self, entity: &E) -> bool {
        self.members.contains(entity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// `true` when the member sets are set-equal.
    #[must_use]
    pub fn same_members(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl<E: Entity> PartialEq for Cluster<E> {
    fn eq(&self, other: &Self) -> bool {
        self.same_members(other)
    }
}

impl<E: Entity> Eq for Cluster<E> {}

impl<E: Entity> Hash for Cluster<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.members.hash(state);
    }
}

impl<E: Entity> PartialOrd for Cluster<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E: Entity> Ord for Cluster<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.members.cmp(&other.members)
    }
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A vertex of a [`DependencyMap`](crate::map::DependencyMap).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Node<E: Entity> {
    /// A single host entity.
    Leaf(E),
    /// An aggregate of entities with identical outgoing edges.
    Cluster(Cluster<E>),
}

impl<E: Entity> Node<E> {
    #[must_use]
    pub const fn leaf(entity: E) -> Self {
        Self::Leaf(entity)
    }

    #[must_use]
    pub const fn is_cluster(&self) -> bool {
        matches!(self, Self::Cluster(_))
    }

    #[must_use]
    pub const fn as_leaf(&self) -> Option<&E> {
        match self {
            Self::Leaf(entity) => Some(entity),
            Self::Cluster(_) => None,
        }
    }

    #[must_use]
    pub const fn as_cluster(&self) -> Option<&Cluster<E>> {
        match self {
            Self::Leaf(_) => None,
            Self::Cluster(cluster) => Some(cluster),
        }
    }

    /// `true` if this node is `entity` or a cluster containing it.
    #[must_use]
    pub fn covers(&self, entity: &E) -> bool {
        match self {
            Self::Leaf(own) => own == entity,
            Self::Cluster(cluster) => cluster.contains(entity),
        }
    }

    /// Entities this node stands for, in canonical order.
    pub fn entities(&self) -> Box<dyn Iterator<Item = &E> + '_> {
        match self {
            Self::Leaf(entity) => Box::new(std::iter::once(entity)),
            Self::Cluster(cluster) => Box::new(cluster.members().iter()),
        }
    }

    /// What selection and tooltips should point at for this node.
    ///
    /// - a leaf is its entity;
    /// - a single-member cluster is that member;
    /// - an anchored cluster is its anchor;
    /// - any other cluster stays an aggregate.
    #[must_use]
    pub fn display_identity(&self) -> DisplayIdentity<'_, E> {
        match self {
            Self::Leaf(entity) => DisplayIdentity::Entity(entity),
            Self::Cluster(cluster) => {
                if cluster.len() == 1 {
                    if let Some(only) = cluster.members().first() {
                        return DisplayIdentity::Entity(only);
                    }
                }
                match cluster.anchor() {
                    Some(anchor) => DisplayIdentity::Entity(anchor),
                    None => DisplayIdentity::Aggregate(cluster),
                }
            }
        }
    }
}

impl<E: Entity> From<Cluster<E>> for Node<E> {
    fn from(cluster: Cluster<E>) -> Self {
        Self::Cluster(cluster)
    }
}

/// Result of [`Node::display_identity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayIdentity<'a, E: Entity> {
    /// The node resolves to one host entity.
    Entity(&'a E),
    /// The node is shown as an aggregate.
    Aggregate(&'a Cluster<E>),
}

impl<E: Entity + fmt::Display> fmt::Display for Node<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(entity) => write!(f, "{entity}"),
            Self::Cluster(cluster) => {
                write!(f, "{{")?;
                for (i, member) in cluster.members().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{member}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
