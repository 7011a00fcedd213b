#![forbid(unsafe_code)]
//! refscope-core library.
//!
//! Turns a raw "what references what" relation into a compact display graph
//! and accumulates the graphs of independent scans into one structure.
//!
//! ```text
//! DependencyOracle
//!   -> closure::build_closure          (two-hop neighborhood)
//!   -> filter::filter_to_targets       (optional)
//!   -> collapse::collapse_equal_successors
//!   -> reduce::reduce_for_display      (root resolution + sibling reduction)
//!   -> merge::merge_into               (session's accumulated graph)
//!   -> roots::find_roots / session::InspectionSession::relations_of
//! ```
//!
//! # Conventions
//!
//! - **Errors**: graph operations are infallible; loading facts and config
//!   returns [`error::FactsError`] or `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod closure;
pub mod collapse;
pub mod config;
pub mod error;
pub mod facts;
pub mod filter;
pub mod map;
pub mod merge;
pub mod node;
pub mod oracle;
pub mod pipeline;
pub mod reduce;
pub mod roots;
pub mod session;

pub use map::DependencyMap;
pub use node::{Cluster, DisplayIdentity, Entity, MemberSet, Node};
pub use oracle::{DependencyOracle, StaticOracle};
pub use session::{InspectionSession, Relation, SessionMode, SessionStats};
