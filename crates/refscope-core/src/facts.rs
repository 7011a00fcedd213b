//! TOML-backed fact store.
//!
//! A facts file describes a host scene as plain data:
//!
//! ```toml
//! scan_roots = ["Scene"]
//!
//! [entities.Scene]
//! depends_on = ["Player", "Enemy"]
//!
//! [entities.PlayerCollider]
//! owner = "Player"
//! depends_on = ["PhysicsMat"]
//! ```
//!
//! Names mentioned only in `depends_on` or `owner` are declared implicitly
//! with no dependencies of their own. Names are the entity handles, so
//! [`DependencyOracle::describe`] returns them verbatim.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::FactsError;
use crate::node::{Cluster, MemberSet};
use crate::oracle::{DependencyOracle, StaticOracle};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FactsFile {
    #[serde(default)]
    scan_roots: Vec<String>,
    #[serde(default)]
    entities: BTreeMap<String, EntityFacts>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EntityFacts {
    #[serde(default)]
    depends_on: Vec<String>,
    #[serde(default)]
    owner: Option<String>,
}

/// Oracle over a parsed facts file.
#[derive(Debug, Clone)]
pub struct FactsOracle {
    facts: StaticOracle<String>,
    declared: BTreeSet<String>,
    scan_roots: Vec<String>,
    exclude_prefixes: Vec<String>,
}

impl FactsOracle {
    /// Read and validate the facts file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FactsError`] when the file cannot be read or parsed, or when
    /// its ownership or scan-root declarations are inconsistent.
    #[instrument(level = "debug")]
    pub fn load(path: &Path) -> Result<Self, FactsError> {
        let text = std::fs::read_to_string(path).map_err(|source| FactsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse facts from `text`; `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// See [`FactsOracle::load`].
    pub fn parse(text: &str, origin: &Path) -> Result<Self, FactsError> {
        let file: FactsFile = toml::from_str(text).map_err(|source| FactsError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        let mut facts = StaticOracle::new();
        let mut declared = BTreeSet::new();
        let mut owners: BTreeMap<String, String> = BTreeMap::new();

        for (name, entity) in file.entities {
            if entity.owner.as_deref() == Some(name.as_str()) {
                return Err(FactsError::SelfOwned { entity: name });
            }
            declared.extend(entity.depends_on.iter().cloned());
            if let Some(owner) = entity.owner {
                declared.insert(owner.clone());
                owners.insert(name.clone(), owner);
            }
            facts.add_dependencies(name.clone(), entity.depends_on);
            declared.insert(name);
        }

        check_owner_cycles(&owners)?;
        for (part, owner) in owners {
            facts.set_owner(part, owner);
        }

        if let Some(missing) = file.scan_roots.iter().find(|r| !declared.contains(*r)) {
            return Err(FactsError::UnknownScanRoot(missing.clone()));
        }

        debug!(
            entities = declared.len(),
            scan_roots = file.scan_roots.len(),
            "facts loaded"
        );

        Ok(Self {
            facts,
            declared,
            scan_roots: file.scan_roots,
            exclude_prefixes: Vec::new(),
        })
    }

    /// Hide every entity whose name starts with one of `prefixes`.
    #[must_use]
    pub fn with_exclude_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.exclude_prefixes = prefixes;
        self
    }

    #[must_use]
    pub fn scan_roots(&self) -> &[String] {
        &self.scan_roots
    }

    /// `true` if `name` was declared, explicitly or through a reference.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    pub fn entities(&self) -> impl Iterator<Item = &String> {
        self.declared.iter()
    }

    #[must_use]
    pub fn owner_of(&self, name: &str) -> Option<&String> {
        self.facts.owner_of(&name.to_string())
    }

    /// Clusters released so far.
    #[must_use]
    pub fn released(&self) -> Vec<Cluster<String>> {
        self.facts.released()
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.exclude_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

impl DependencyOracle for FactsOracle {
    type Entity = String;

    fn direct_dependencies(&self, entity: &String) -> BTreeSet<String> {
        let mut deps = self.facts.direct_dependencies(entity);
        if !self.exclude_prefixes.is_empty() {
            deps.retain(|dep| !self.is_excluded(dep));
        }
        deps
    }

    fn anchor_of(&self, members: &MemberSet<String>) -> Option<String> {
        self.facts.anchor_of(members)
    }

    fn release_cluster(&self, cluster: &Cluster<String>) {
        debug!(members = cluster.len(), "releasing cluster");
        self.facts.release_cluster(cluster);
    }

    fn describe(&self, entity: &String) -> String {
        entity.clone()
    }
}

fn check_owner_cycles(owners: &BTreeMap<String, String>) -> Result<(), FactsError> {
    for start in owners.keys() {
        let mut seen = BTreeSet::from([start.as_str()]);
        let mut current = start.as_str();
        while let Some(owner) = owners.get(current) {
            if !seen.insert(owner.as_str()) {
                return Err(FactsError::OwnerCycle {
                    entity: owner.clone(),
                });
            }
            current = owner.as_str();
        }
    }
    Ok(())
}
