use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};
use topofit_core::{
    Charge, ParticleIndex, ParticleSlot, Reaction, ReactionState, TopofitError, TopofitResult,
};

/// A handle to one [`ReactionStepVertexInfo`] within a
/// [`ReactionVertexInfo`](crate::ReactionVertexInfo).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub usize);

impl Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "V{}", self.0)
    }
}

/// Filters applied by the particle getters of [`ReactionStepVertexInfo`].
///
/// The default keeps every slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ParticleFilter {
    /// Keep only initial-state slots (initial particle, target, second beam), only final-state
    /// slots, or both.
    pub state: ReactionState,
    /// Keep only particles with this charge.
    pub charge: Charge,
    /// Keep particles which decay further.
    pub include_decaying: bool,
    /// Keep the declared missing particles.
    pub include_missing: bool,
    /// Keep target particles.
    pub include_target: bool,
}

impl Default for ParticleFilter {
    fn default() -> Self {
        Self {
            state: ReactionState::Either,
            charge: Charge::All,
            include_decaying: true,
            include_missing: true,
            include_target: true,
        }
    }
}

impl ParticleFilter {
    /// A filter which keeps only slots in the given state.
    pub fn state(state: ReactionState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }
    /// A filter which keeps only particles with the given charge.
    pub fn charge(charge: Charge) -> Self {
        Self {
            charge,
            ..Default::default()
        }
    }
    /// Drop particles which decay further.
    pub fn without_decaying(mut self) -> Self {
        self.include_decaying = false;
        self
    }
    /// Drop the declared missing particles.
    pub fn without_missing(mut self) -> Self {
        self.include_missing = false;
        self
    }
    /// Drop target particles.
    pub fn without_target(mut self) -> Self {
        self.include_target = false;
        self
    }
}

/// The particles of a [`Reaction`] which meet at one space-time point, and the role each of
/// them plays in a vertex fit.
///
/// A vertex is made of one or more steps: usually a single step, plus the decay steps of
/// particles which decay in place (like a $`\pi^0`$). Every slot of those steps is placed in at
/// most one of three buckets:
///
/// * full-constrain: a trajectory which constrains the vertex position (charged tracks, the
///   beam, and decaying particles whose trajectory is defined at another vertex),
/// * only-constrain-time: a particle which only constrains the vertex time (photons),
/// * no-constrain: a particle which does not constrain the vertex (targets, missing and
///   undetected neutral particles, and decaying particles which are defined here).
///
/// Decaying particles additionally appear in the decaying list. The two decaying maps record the
/// links to other vertices: a fully constrained decaying slot maps to the vertex which defines
/// its trajectory, and a no-constrain decaying slot maps to the vertex which uses it, if any.
#[derive(Clone, Debug)]
pub struct ReactionStepVertexInfo<'a> {
    reaction: &'a Reaction,
    step_indices: Vec<usize>,
    is_production_vertex: bool,
    full_constrain: Vec<ParticleSlot>,
    decaying: Vec<ParticleSlot>,
    only_constrain_time: Vec<ParticleSlot>,
    no_constrain: Vec<ParticleSlot>,
    decaying_no_constrain: BTreeMap<ParticleSlot, Option<VertexId>>,
    decaying_full_constrain: BTreeMap<ParticleSlot, VertexId>,
    is_dangling: bool,
}

const FULL_CONSTRAIN: &str = "full-constrain";
const ONLY_CONSTRAIN_TIME: &str = "only-constrain-time";
const NO_CONSTRAIN: &str = "no-constrain";
const DECAYING: &str = "decaying";

fn push_unique(slots: &mut Vec<ParticleSlot>, slot: ParticleSlot) {
    if !slots.contains(&slot) {
        slots.push(slot);
    }
}

fn conflict(slot: ParticleSlot, category: &str, reason: &str) -> TopofitError {
    TopofitError::ClassificationConflict {
        slot,
        category: category.to_string(),
        reason: reason.to_string(),
    }
}

impl<'a> ReactionStepVertexInfo<'a> {
    /// Create a vertex which starts with the given step and has no particles classified yet.
    ///
    /// The vertex is the production vertex if it starts with step 0 and that step has a target
    /// or a second beam.
    ///
    /// # Errors
    ///
    /// Returns a [`StepIndexOutOfRange`](TopofitError::StepIndexOutOfRange) error if the
    /// reaction has no step at `start_step`.
    pub fn new(reaction: &'a Reaction, start_step: usize) -> TopofitResult<Self> {
        reaction.reaction_step(start_step)?;
        Ok(Self {
            reaction,
            step_indices: vec![start_step],
            is_production_vertex: start_step == 0 && reaction.is_first_step_beam()?,
            full_constrain: Vec::new(),
            decaying: Vec::new(),
            only_constrain_time: Vec::new(),
            no_constrain: Vec::new(),
            decaying_no_constrain: BTreeMap::new(),
            decaying_full_constrain: BTreeMap::new(),
            is_dangling: false,
        })
    }

    /// Merge another step into this vertex. Adding a step twice has no effect.
    ///
    /// # Errors
    ///
    /// Returns a [`StepIndexOutOfRange`](TopofitError::StepIndexOutOfRange) error if the
    /// reaction has no step at `step_index`. The vertex is left unchanged in that case.
    pub fn add_reaction_step(&mut self, step_index: usize) -> TopofitResult<()> {
        self.reaction.reaction_step(step_index)?;
        if let Err(position) = self.step_indices.binary_search(&step_index) {
            self.step_indices.insert(position, step_index);
        }
        Ok(())
    }

    /// Check that a slot names a particle of one of the steps of this vertex.
    fn check_slot(&self, slot: ParticleSlot, category: &str) -> TopofitResult<()> {
        let step = self.reaction.reaction_step(slot.step)?;
        if !self.contains_step(slot.step) {
            return Err(conflict(slot, category, "its step is not part of this vertex"));
        }
        if step.pid(slot.index).is_none() {
            return Err(match slot.index {
                ParticleIndex::Final(index) => TopofitError::ParticleIndexOutOfRange {
                    step: slot.step,
                    index,
                    len: step.num_final_pids(),
                },
                _ => conflict(slot, category, "the step has no particle in this slot"),
            });
        }
        Ok(())
    }

    /// The bucket which currently holds a slot, if any.
    fn bucket_of(&self, slot: &ParticleSlot) -> Option<&'static str> {
        if self.full_constrain.contains(slot) {
            Some(FULL_CONSTRAIN)
        } else if self.only_constrain_time.contains(slot) {
            Some(ONLY_CONSTRAIN_TIME)
        } else if self.no_constrain.contains(slot) {
            Some(NO_CONSTRAIN)
        } else {
            None
        }
    }

    /// Replace the classification of the particles of this vertex.
    ///
    /// Each bucket keeps the order in which its slots are given. Any links recorded by an
    /// earlier [`register_decaying_particle_constraints`](Self::register_decaying_particle_constraints)
    /// or [`register_decaying_no_constrain_use_vertex`](Self::register_decaying_no_constrain_use_vertex)
    /// are discarded.
    ///
    /// # Errors
    ///
    /// Returns a [`ClassificationConflict`](TopofitError::ClassificationConflict) if a slot
    /// appears more than once across `full_constrain`, `only_constrain_time`, and
    /// `no_constrain`, more than once in `decaying`, or belongs to a step outside this vertex.
    /// Slots which do not exist in the reaction give a
    /// [`StepIndexOutOfRange`](TopofitError::StepIndexOutOfRange) or
    /// [`ParticleIndexOutOfRange`](TopofitError::ParticleIndexOutOfRange) error. The vertex is
    /// left unchanged in every case.
    pub fn set_particle_indices(
        &mut self,
        full_constrain: &[ParticleSlot],
        decaying: &[ParticleSlot],
        only_constrain_time: &[ParticleSlot],
        no_constrain: &[ParticleSlot],
    ) -> TopofitResult<()> {
        let mut seen: BTreeMap<ParticleSlot, &str> = BTreeMap::new();
        for (category, slots) in [
            (FULL_CONSTRAIN, full_constrain),
            (ONLY_CONSTRAIN_TIME, only_constrain_time),
            (NO_CONSTRAIN, no_constrain),
        ] {
            for slot in slots {
                self.check_slot(*slot, category)?;
                if let Some(previous) = seen.insert(*slot, category) {
                    return Err(conflict(
                        *slot,
                        category,
                        &format!("already classified as {}", previous),
                    ));
                }
            }
        }
        for (position, slot) in decaying.iter().enumerate() {
            self.check_slot(*slot, DECAYING)?;
            if decaying[..position].contains(slot) {
                return Err(conflict(*slot, DECAYING, "listed more than once"));
            }
        }
        self.full_constrain = full_constrain.to_vec();
        self.decaying = decaying.to_vec();
        self.only_constrain_time = only_constrain_time.to_vec();
        self.no_constrain = no_constrain.to_vec();
        self.decaying_no_constrain.clear();
        self.decaying_full_constrain.clear();
        Ok(())
    }

    /// Record the vertex which uses a decaying particle defined at this vertex.
    ///
    /// The slot is appended to the no-constrain bucket if it is not already there. The handle
    /// does not imply any ownership of the other vertex.
    ///
    /// # Errors
    ///
    /// Returns a [`ClassificationConflict`](TopofitError::ClassificationConflict) if the slot is
    /// not a decaying particle of this vertex, or if it already constrains this vertex (fully or
    /// in time only).
    pub fn register_decaying_no_constrain_use_vertex(
        &mut self,
        slot: ParticleSlot,
        use_vertex: VertexId,
    ) -> TopofitResult<()> {
        if !self.decaying.contains(&slot) {
            return Err(conflict(
                slot,
                NO_CONSTRAIN,
                "not a decaying particle of this vertex",
            ));
        }
        if self.decaying_full_constrain.contains_key(&slot) {
            return Err(conflict(
                slot,
                NO_CONSTRAIN,
                "already fully constrained at this vertex",
            ));
        }
        if let Some(category @ (FULL_CONSTRAIN | ONLY_CONSTRAIN_TIME)) = self.bucket_of(&slot) {
            return Err(conflict(
                slot,
                NO_CONSTRAIN,
                &format!("already classified as {}", category),
            ));
        }
        push_unique(&mut self.no_constrain, slot);
        self.decaying_no_constrain.insert(slot, Some(use_vertex));
        Ok(())
    }

    /// Classify the decaying particles of this vertex.
    ///
    /// Slots in `full_constrain` join the full-constrain bucket and are mapped to the vertex
    /// which defines them. Slots in `no_constrain` join the no-constrain bucket and the
    /// no-constrain map; a use-vertex which was registered earlier is kept, otherwise the entry
    /// is left unresolved. New slots are appended to the end of their bucket.
    ///
    /// # Errors
    ///
    /// Returns a [`ClassificationConflict`](TopofitError::ClassificationConflict) if a slot is
    /// not a decaying particle of this vertex, is given in both arguments, or is already in
    /// another bucket. The vertex is left unchanged in that case.
    pub fn register_decaying_particle_constraints(
        &mut self,
        no_constrain: &[ParticleSlot],
        full_constrain: &BTreeMap<ParticleSlot, VertexId>,
    ) -> TopofitResult<()> {
        for slot in no_constrain {
            if !self.decaying.contains(slot) {
                return Err(conflict(
                    *slot,
                    NO_CONSTRAIN,
                    "not a decaying particle of this vertex",
                ));
            }
            if full_constrain.contains_key(slot) || self.decaying_full_constrain.contains_key(slot)
            {
                return Err(conflict(*slot, NO_CONSTRAIN, "already constrains this vertex"));
            }
            if let Some(category @ (FULL_CONSTRAIN | ONLY_CONSTRAIN_TIME)) = self.bucket_of(slot) {
                return Err(conflict(
                    *slot,
                    NO_CONSTRAIN,
                    &format!("already classified as {}", category),
                ));
            }
        }
        for slot in full_constrain.keys() {
            if !self.decaying.contains(slot) {
                return Err(conflict(
                    *slot,
                    FULL_CONSTRAIN,
                    "not a decaying particle of this vertex",
                ));
            }
            if let Some(category @ (ONLY_CONSTRAIN_TIME | NO_CONSTRAIN)) = self.bucket_of(slot) {
                return Err(conflict(
                    *slot,
                    FULL_CONSTRAIN,
                    &format!("already classified as {}", category),
                ));
            }
        }
        for slot in no_constrain {
            push_unique(&mut self.no_constrain, *slot);
            self.decaying_no_constrain.entry(*slot).or_insert(None);
        }
        for (slot, defining_vertex) in full_constrain {
            push_unique(&mut self.full_constrain, *slot);
            self.decaying_full_constrain.insert(*slot, *defining_vertex);
        }
        Ok(())
    }

    fn filter_particles(
        &self,
        slots: impl IntoIterator<Item = ParticleSlot>,
        filter: &ParticleFilter,
    ) -> Vec<ParticleSlot> {
        slots
            .into_iter()
            .filter(|slot| match filter.state {
                ReactionState::Initial => slot.index.is_initial_state(),
                ReactionState::Final => !slot.index.is_initial_state(),
                ReactionState::Either => true,
            })
            .filter(|slot| {
                self.reaction
                    .slot_pid(*slot)
                    .ok()
                    .flatten()
                    .is_some_and(|pid| filter.charge.matches(pid.charge()))
            })
            .filter(|slot| filter.include_decaying || !self.reaction.is_decaying(*slot))
            .filter(|slot| filter.include_missing || !self.is_missing(*slot))
            .filter(|slot| filter.include_target || slot.index != ParticleIndex::Target)
            .collect()
    }

    fn is_missing(&self, slot: ParticleSlot) -> bool {
        self.reaction
            .reaction_steps()
            .get(slot.step)
            .is_some_and(|step| step.is_missing(slot.index))
    }

    /// Particles which constrain the vertex position, in the order they were classified.
    pub fn full_constrain_particles(&self, filter: &ParticleFilter) -> Vec<ParticleSlot> {
        self.filter_particles(self.full_constrain.iter().copied(), filter)
    }
    /// Particles which decay further, whether they are produced at this vertex or decay here.
    pub fn decaying_particles(&self, filter: &ParticleFilter) -> Vec<ParticleSlot> {
        self.filter_particles(self.decaying.iter().copied(), filter)
    }
    /// Particles which only constrain the vertex time.
    pub fn only_constrain_time_particles(&self, filter: &ParticleFilter) -> Vec<ParticleSlot> {
        self.filter_particles(self.only_constrain_time.iter().copied(), filter)
    }
    /// Particles which do not constrain the vertex.
    pub fn no_constrain_particles(&self, filter: &ParticleFilter) -> Vec<ParticleSlot> {
        self.filter_particles(self.no_constrain.iter().copied(), filter)
    }
    /// The declared missing particles at this vertex. Only the state and charge of the filter
    /// are used.
    pub fn missing_particles(&self, filter: &ParticleFilter) -> Vec<ParticleSlot> {
        let filter = ParticleFilter {
            include_decaying: false,
            include_missing: true,
            include_target: false,
            ..*filter
        };
        self.filter_particles(
            self.no_constrain
                .iter()
                .copied()
                .filter(|slot| self.is_missing(*slot)),
            &filter,
        )
    }
    /// Every classified particle at this vertex, in slot order. The buckets are disjoint, so
    /// this is exactly their union.
    pub fn particles(&self, filter: &ParticleFilter) -> Vec<ParticleSlot> {
        let mut slots: Vec<ParticleSlot> = self
            .full_constrain
            .iter()
            .chain(&self.only_constrain_time)
            .chain(&self.no_constrain)
            .copied()
            .collect();
        slots.sort_unstable();
        self.filter_particles(slots, filter)
    }

    /// The reaction this vertex belongs to.
    pub fn reaction(&self) -> &'a Reaction {
        self.reaction
    }
    /// The steps which make up this vertex, sorted.
    pub fn step_indices(&self) -> &[usize] {
        &self.step_indices
    }
    /// Does this vertex contain the given step?
    pub fn contains_step(&self, step_index: usize) -> bool {
        self.step_indices.binary_search(&step_index).is_ok()
    }
    /// Is this the production vertex of the reaction?
    pub fn production_vertex_flag(&self) -> bool {
        self.is_production_vertex
    }
    /// Is this vertex missing the constraints needed to position it?
    pub fn dangling_vertex_flag(&self) -> bool {
        self.is_dangling
    }
    /// Mark this vertex as dangling (or not).
    pub fn set_dangling_vertex_flag(&mut self, is_dangling: bool) {
        self.is_dangling = is_dangling;
    }
    /// Decaying particles which are defined at this vertex, mapped to the vertex which uses
    /// them (or [`None`] if no vertex does).
    pub fn decaying_particles_no_constrain(&self) -> &BTreeMap<ParticleSlot, Option<VertexId>> {
        &self.decaying_no_constrain
    }
    /// Decaying particles which constrain this vertex, mapped to the vertex which defines them.
    pub fn decaying_particles_full_constrain(&self) -> &BTreeMap<ParticleSlot, VertexId> {
        &self.decaying_full_constrain
    }
}
