//! # topofit-vertex
//!
//! This is an internal crate used by `topofit`.
#![warn(clippy::perf, clippy::style, missing_docs)]

/// Building the vertices of a [`Reaction`](topofit_core::Reaction) and resolving the links
/// between them.
pub mod builder;
/// Human-readable descriptions of vertex constraints.
pub mod describe;
/// The particles of a single vertex and their constraint categories.
pub mod step_vertex;

pub use crate::builder::{build_many, ReactionVertexInfo, VertexBuildConfig};
pub use crate::describe::build_vertex_constraint_string;
pub use crate::step_vertex::{ParticleFilter, ReactionStepVertexInfo, VertexId};
