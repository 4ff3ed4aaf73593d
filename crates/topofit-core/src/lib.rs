//! # topofit-core
//!
//! This is an internal crate used by `topofit`.
#![warn(clippy::perf, clippy::style, missing_docs)]

use thiserror::Error;

/// Chain-PID resolution: which step a decaying particle decays in, and the particle content of
/// decay branches.
pub mod decay;
/// The [`Particle`] catalogue used to declare reactions.
pub mod particles;
/// [`Reaction`]s, their analysis actions, and their configuration.
pub mod reaction;
/// Single interaction steps and the [`ParticleSlot`] addressing scheme.
pub mod steps;
/// Utility enums and helpers
pub mod utils;
/// Useful traits for all crate structs
pub mod traits {
    pub use crate::reaction::AnalysisAction;
}

pub use crate::decay::{
    check_if_missing_decay_product, get_chain_pids, get_chain_pids_from_pid,
    get_decay_step_index, get_initial_particle_decay_from_indices, pids_to_root_name, DecayIndex,
};
pub use crate::particles::Particle;
pub use crate::reaction::{
    AnalysisAction, CutMissingMassSquared, FinalPidOptions, PreSelectionCuts, Reaction,
    ReactionRegistry, TreeOutput,
};
pub use crate::steps::{ParticleIndex, ParticleSlot, ReactionStep};
pub use crate::utils::enums::{Charge, KinFitType, ReactionState};

/// The result type used by all `topofit` methods which can fail.
pub type TopofitResult<T> = Result<T, TopofitError>;

/// The error type used by all `topofit` internal methods
#[derive(Error, Debug)]
pub enum TopofitError {
    /// An alias for [`shellexpand::LookupError`].
    #[error("Failed to expand path: {0}")]
    LookupError(#[from] shellexpand::LookupError<std::env::VarError>),
    /// An error which occurs when a step index is requested which is beyond the steps stored in a
    /// [`Reaction`].
    #[error("Step index {index} is out of range for reaction \"{reaction}\" with {len} step(s)!")]
    StepIndexOutOfRange {
        /// Name of the reaction which was queried
        reaction: String,
        /// The requested step index
        index: usize,
        /// The number of steps in the reaction
        len: usize,
    },
    /// An error which occurs when a final-state index is requested which is beyond the final
    /// state of a [`ReactionStep`].
    #[error("Final-state index {index} is out of range for step {step} with {len} final-state particle(s)!")]
    ParticleIndexOutOfRange {
        /// The step which was queried
        step: usize,
        /// The requested final-state index
        index: usize,
        /// The number of final-state particles in the step
        len: usize,
    },
    /// An error which occurs when an analysis action index is requested which is beyond the
    /// actions stored in a [`Reaction`].
    #[error("Analysis action index {index} is out of range for reaction \"{reaction}\" with {len} action(s)!")]
    ActionIndexOutOfRange {
        /// Name of the reaction which was queried
        reaction: String,
        /// The requested action index
        index: usize,
        /// The number of actions in the reaction
        len: usize,
    },
    /// An error which occurs when a [`Reaction`] without any steps is used where at least one step
    /// is required.
    #[error("Reaction \"{name}\" has no reaction steps!")]
    EmptyReaction {
        /// Name of the empty reaction
        name: String,
    },
    /// An error which occurs when the user tries to register two reactions by the same name to
    /// the same [`ReactionRegistry`].
    #[error("A reaction by the name \"{name}\" is already registered!")]
    RegistrationError {
        /// Name of reaction which is already registered
        name: String,
    },
    /// An error which occurs when the user tries to use an unregistered reaction.
    #[error("No registered reaction with name \"{name}\"!")]
    ReactionNotFoundError {
        /// Name of reaction which failed lookup
        name: String,
    },
    /// An error which occurs when the user tries to parse an invalid string of text, typically
    /// into an enum variant.
    #[error("Failed to parse string: \"{name}\" does not correspond to a valid \"{object}\"!")]
    ParseError {
        /// The string which was parsed
        name: String,
        /// The name of the object it failed to parse into
        object: String,
    },
    /// An error which occurs when a particle slot would be placed in more than one constraint
    /// category of the same vertex.
    #[error("Particle slot {slot} cannot be classified as {category}: {reason}")]
    ClassificationConflict {
        /// The offending slot
        slot: ParticleSlot,
        /// The category it was being placed in
        category: String,
        /// Why the classification was rejected
        reason: String,
    },
    /// An error which occurs when a vertex handle does not refer to any vertex info.
    #[error("No vertex info with id {id} (there are {len} vertex info(s))!")]
    VertexNotFound {
        /// The requested vertex id
        id: usize,
        /// The number of vertex infos
        len: usize,
    },
    /// A custom fallback error for errors too complex or too infrequent to warrant their own error
    /// category.
    #[error("{0}")]
    Custom(String),
}
