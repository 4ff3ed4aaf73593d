//! `topofit` describes the topology of a particle physics reaction (which particles are produced,
//! which of them decay, and into what) and works out how the particles of that reaction can be
//! used in a kinematic fit.
//!
//! <div class="warning">
//!
//! This crate is still in an early development phase, and the API is not stable.
//!
//! </div>
//!
//! # Table of Contents
//! - [Key Features](#key-features)
//! - [Quick Start](#quick-start)
//! - [Vertex Constraints](#vertex-constraints)
//!
//! # Key Features
//! * [`ReactionStep`]s which are built once and shared between any number of [`Reaction`]s.
//! * Decay-chain queries such as [`get_chain_pids`] and [`check_if_missing_decay_product`],
//!   backed by a precomputed [`DecayIndex`].
//! * Grouping of steps into vertices, with every particle classified by the role it plays in a
//!   vertex fit ([`ReactionVertexInfo`]).
//! * Serializable reaction configuration, including user-defined
//!   [`AnalysisAction`](crate::traits::AnalysisAction)s.
//!
//! # Quick Start
//! A reaction is a list of steps. The first step describes the production (here a photon beam on
//! a proton target) and every later step describes the decay of a particle produced earlier:
//! ```rust
//! use std::sync::Arc;
//! use topofit::{KinFitType, Particle, ParticleSlot, Reaction, ReactionStep};
//!
//! // γ p → p ω, ω → π+ π- π0, π0 → γ γ
//! let reaction = Reaction::new(
//!     "omega",
//!     vec![
//!         Arc::new(
//!             ReactionStep::new(Particle::Gamma, [Particle::Proton, Particle::Omega])
//!                 .with_target(Particle::Proton),
//!         ),
//!         Arc::new(ReactionStep::new(
//!             Particle::Omega,
//!             [Particle::PiPlus, Particle::PiMinus, Particle::Pi0],
//!         )),
//!         Arc::new(ReactionStep::new(Particle::Pi0, [Particle::Gamma, Particle::Gamma])),
//!     ],
//!     KinFitType::P4AndVertex,
//! );
//! assert!(reaction.is_decaying(ParticleSlot::final_state(0, 1)));
//! let mut chain = Vec::new();
//! topofit::get_chain_pids_from_pid(&reaction, Particle::Omega, None, true, &mut chain)?;
//! assert_eq!(
//!     chain,
//!     vec![
//!         Particle::PiPlus,
//!         Particle::PiMinus,
//!         Particle::Pi0,
//!         Particle::Gamma,
//!         Particle::Gamma
//!     ]
//! );
//! # Ok::<(), topofit::TopofitError>(())
//! ```
//!
//! # Vertex Constraints
//! [`ReactionVertexInfo::build`] groups the steps of a reaction into vertices. Particles which
//! decay too quickly to fly (by default $`\pi^0`$, $`\eta`$, and $`\eta'`$, see
//! [`VertexBuildConfig`]) decay at the vertex where they are produced. Every particle of a vertex
//! then either constrains its position, only its time, or nothing at all, and decaying particles
//! link vertices together:
//! ```rust
//! # use std::sync::Arc;
//! # use topofit::{KinFitType, Particle, ParticleSlot, Reaction, ReactionStep};
//! use topofit::{ReactionVertexInfo, VertexBuildConfig, VertexId};
//!
//! # let reaction = Reaction::new(
//! #     "omega",
//! #     vec![
//! #         Arc::new(
//! #             ReactionStep::new(Particle::Gamma, [Particle::Proton, Particle::Omega])
//! #                 .with_target(Particle::Proton),
//! #         ),
//! #         Arc::new(ReactionStep::new(
//! #             Particle::Omega,
//! #             [Particle::PiPlus, Particle::PiMinus, Particle::Pi0],
//! #         )),
//! #         Arc::new(ReactionStep::new(Particle::Pi0, [Particle::Gamma, Particle::Gamma])),
//! #     ],
//! #     KinFitType::P4AndVertex,
//! # );
//! let vertices = ReactionVertexInfo::build(&reaction, &VertexBuildConfig::default())?;
//! assert_eq!(vertices.len(), 2);
//! // the ω is defined by its decay products and constrains the production vertex
//! let production = vertices.production_vertex().unwrap();
//! assert_eq!(
//!     production
//!         .decaying_particles_full_constrain()
//!         .get(&ParticleSlot::final_state(0, 1)),
//!     Some(&VertexId(1))
//! );
//! assert_eq!(
//!     topofit::build_vertex_constraint_string(production),
//!     "#gamma, p, (#omega)"
//! );
//! # Ok::<(), topofit::TopofitError>(())
//! ```
#![warn(clippy::perf, clippy::style, missing_docs)]

/// Particle species, reaction steps, and the [`ParticleSlot`] addressing scheme.
pub mod particles {
    pub use topofit_core::particles::*;
    pub use topofit_core::steps::*;
}
/// [`Reaction`]s, their configuration, and decay-chain queries.
pub mod reaction {
    pub use topofit_core::decay::*;
    pub use topofit_core::reaction::*;
}
/// Vertex grouping and constraint classification.
pub mod vertex {
    pub use topofit_vertex::*;
}
/// Utility functions and enums
pub mod utils {
    pub use topofit_core::utils::*;
}
/// Useful traits for all crate structs
pub mod traits {
    pub use topofit_core::traits::*;
}

pub use serde::{Deserialize, Serialize};
pub use topofit_core::{
    check_if_missing_decay_product, get_chain_pids, get_chain_pids_from_pid,
    get_decay_step_index, get_initial_particle_decay_from_indices, pids_to_root_name, Charge,
    CutMissingMassSquared, DecayIndex, FinalPidOptions, KinFitType, Particle, ParticleIndex,
    ParticleSlot, PreSelectionCuts, Reaction, ReactionRegistry, ReactionState, ReactionStep,
    TopofitError, TopofitResult, TreeOutput,
};
pub use topofit_vertex::{
    build_many, build_vertex_constraint_string, ParticleFilter, ReactionStepVertexInfo,
    ReactionVertexInfo, VertexBuildConfig, VertexId,
};
pub use typetag;
