use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Particle, TopofitError};

/// The position of a particle within a [`ReactionStep`].
///
/// The initial-state indices order before every final-state index, mirroring their raw values
/// (see [`ParticleIndex::raw`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ParticleIndex {
    /// The second beam particle of a colliding-beam step.
    SecondBeam,
    /// The target particle.
    Target,
    /// The beam particle, or the decaying parent of a decay step.
    Initial,
    /// The n-th particle of the final state.
    Final(usize),
}

impl ParticleIndex {
    /// The raw signed index: `-1` for the initial particle, `-2` for the target, `-3` for the
    /// second beam, and the position within the final state otherwise.
    pub fn raw(&self) -> isize {
        match self {
            ParticleIndex::SecondBeam => -3,
            ParticleIndex::Target => -2,
            ParticleIndex::Initial => -1,
            ParticleIndex::Final(index) => *index as isize,
        }
    }

    /// Is this an initial-state index (initial particle, target, or second beam)?
    pub fn is_initial_state(&self) -> bool {
        !matches!(self, ParticleIndex::Final(_))
    }
}

impl TryFrom<isize> for ParticleIndex {
    type Error = TopofitError;

    fn try_from(value: isize) -> Result<Self, Self::Error> {
        match value {
            -3 => Ok(ParticleIndex::SecondBeam),
            -2 => Ok(ParticleIndex::Target),
            -1 => Ok(ParticleIndex::Initial),
            index if index >= 0 => Ok(ParticleIndex::Final(index as usize)),
            _ => Err(TopofitError::ParseError {
                name: value.to_string(),
                object: "ParticleIndex".to_string(),
            }),
        }
    }
}

impl Display for ParticleIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw())
    }
}

/// The address of one particle occurrence within a [`Reaction`](crate::Reaction): the step it
/// belongs to and its position within that step.
///
/// Slots order by step index first, then by [`ParticleIndex`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticleSlot {
    /// The index of the step in its reaction.
    pub step: usize,
    /// The position of the particle within the step.
    pub index: ParticleIndex,
}

impl ParticleSlot {
    /// Create a new [`ParticleSlot`].
    pub fn new(step: usize, index: ParticleIndex) -> Self {
        Self { step, index }
    }
    /// The slot of the initial particle of a step.
    pub fn initial(step: usize) -> Self {
        Self::new(step, ParticleIndex::Initial)
    }
    /// The slot of the target of a step.
    pub fn target(step: usize) -> Self {
        Self::new(step, ParticleIndex::Target)
    }
    /// The slot of the second beam particle of a step.
    pub fn second_beam(step: usize) -> Self {
        Self::new(step, ParticleIndex::SecondBeam)
    }
    /// The slot of the n-th final-state particle of a step.
    pub fn final_state(step: usize, index: usize) -> Self {
        Self::new(step, ParticleIndex::Final(index))
    }
}

impl Display for ParticleSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.step, self.index)
    }
}

/// One interaction or decay as declared by the user: an initial particle (a beam or a decaying
/// parent), an optional target and second beam, and the particles in the final state.
///
/// A missing particle is part of the final state, with its position recorded separately. A final
/// state particle "decays further" when a later step of the same reaction starts with it; this
/// is not a property of the step itself. Steps are immutable once built and are shared between
/// reactions through [`Arc`](std::sync::Arc).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactionStep {
    initial: Particle,
    target: Option<Particle>,
    second_beam: Option<Particle>,
    finals: Vec<Particle>,
    missing_index: Option<ParticleIndex>,
    inclusive: bool,
}

impl ReactionStep {
    /// Create a step with the given initial particle and detected final-state particles.
    pub fn new<T: AsRef<[Particle]>>(initial: Particle, finals: T) -> Self {
        Self {
            initial,
            target: None,
            second_beam: None,
            finals: finals.as_ref().to_vec(),
            missing_index: None,
            inclusive: false,
        }
    }
    /// Set the target particle.
    pub fn with_target(mut self, target: Particle) -> Self {
        self.target = Some(target);
        self
    }
    /// Set the second beam particle.
    pub fn with_second_beam(mut self, second_beam: Particle) -> Self {
        self.second_beam = Some(second_beam);
        self
    }
    /// Append an undetected particle to the final state and mark it as the missing particle.
    /// A step has at most one missing particle, so this replaces any earlier choice.
    pub fn with_missing(mut self, missing: Particle) -> Self {
        self.missing_index = Some(ParticleIndex::Final(self.finals.len()));
        self.finals.push(missing);
        self
    }
    /// Mark the initial particle (typically the beam) as the missing particle.
    pub fn with_missing_initial(mut self) -> Self {
        self.missing_index = Some(ParticleIndex::Initial);
        self
    }
    /// Mark the final state as inclusive: it may contain undetected particles beyond the ones
    /// which are declared.
    pub fn inclusive(mut self) -> Self {
        self.inclusive = true;
        self
    }

    /// The initial particle.
    pub fn initial_pid(&self) -> Particle {
        self.initial
    }
    /// The target particle, if any.
    pub fn target_pid(&self) -> Option<Particle> {
        self.target
    }
    /// The second beam particle, if any.
    pub fn second_beam_pid(&self) -> Option<Particle> {
        self.second_beam
    }
    /// The final-state particles, including the missing one.
    pub fn final_pids(&self) -> &[Particle] {
        &self.finals
    }
    /// The number of final-state particles, including the missing one.
    pub fn num_final_pids(&self) -> usize {
        self.finals.len()
    }
    /// The final-state particle at the given position.
    pub fn final_pid(&self, index: usize) -> Option<Particle> {
        self.finals.get(index).copied()
    }
    /// The particle at any position of the step, or [`None`] if the position is empty.
    pub fn pid(&self, index: ParticleIndex) -> Option<Particle> {
        match index {
            ParticleIndex::Initial => Some(self.initial),
            ParticleIndex::Target => self.target,
            ParticleIndex::SecondBeam => self.second_beam,
            ParticleIndex::Final(index) => self.final_pid(index),
        }
    }
    /// The position of the missing particle, if any.
    pub fn missing_index(&self) -> Option<ParticleIndex> {
        self.missing_index
    }
    /// The missing particle, if any.
    pub fn missing_pid(&self) -> Option<Particle> {
        self.missing_index.and_then(|index| self.pid(index))
    }
    /// Is the particle at the given position the declared missing particle?
    pub fn is_missing(&self, index: ParticleIndex) -> bool {
        self.missing_index == Some(index)
    }
    /// Is the final state inclusive?
    pub fn is_inclusive(&self) -> bool {
        self.inclusive
    }
}

impl Display for ReactionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.initial)?;
        if let Some(target) = self.target {
            write!(f, " {}", target)?;
        }
        if let Some(second_beam) = self.second_beam {
            write!(f, " {}", second_beam)?;
        }
        write!(f, " ->")?;
        for (index, particle) in self.finals.iter().enumerate() {
            if self.is_missing(ParticleIndex::Final(index)) {
                write!(f, " ({})", particle)?;
            } else {
                write!(f, " {}", particle)?;
            }
        }
        if self.inclusive {
            write!(f, " X")?;
        }
        Ok(())
    }
}
