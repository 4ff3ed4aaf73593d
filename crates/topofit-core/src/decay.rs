use std::{collections::BTreeMap, sync::Arc};

use crate::{
    Particle, ParticleIndex, ParticleSlot, Reaction, ReactionStep, TopofitError, TopofitResult,
};

/// A lookup table between decaying final-state particles and the steps in which they decay.
///
/// Final-state slots are visited in step order, then in order within each step, and each one
/// claims the first step strictly after its own which has a matching initial particle and has
/// not already been claimed. Missing particles never decay. If two steps start with the same
/// decaying particle but only one final-state slot can claim them, only the first listed is
/// attributed and the other is left without a parent (see [`DecayIndex::unattributed_steps`]).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecayIndex {
    decay_steps: BTreeMap<ParticleSlot, usize>,
    parents: Vec<Option<ParticleSlot>>,
}

impl DecayIndex {
    /// Build the index for an ordered list of steps.
    pub fn new(steps: &[Arc<ReactionStep>]) -> Self {
        let mut parents: Vec<Option<ParticleSlot>> = vec![None; steps.len()];
        let mut decay_steps = BTreeMap::new();
        for (step_index, step) in steps.iter().enumerate() {
            for (particle_index, pid) in step.final_pids().iter().enumerate() {
                if step.is_missing(ParticleIndex::Final(particle_index)) {
                    continue;
                }
                let claimed = (step_index + 1..steps.len()).find(|&candidate| {
                    parents[candidate].is_none() && steps[candidate].initial_pid() == *pid
                });
                if let Some(decay_step) = claimed {
                    let slot = ParticleSlot::final_state(step_index, particle_index);
                    parents[decay_step] = Some(slot);
                    decay_steps.insert(slot, decay_step);
                }
            }
        }
        for (step_index, parent) in parents.iter().enumerate().skip(1) {
            if parent.is_none() {
                log::warn!(
                    "Step {} ({}) does not match any earlier final-state particle and will be treated as a separate decay",
                    step_index,
                    steps[step_index]
                );
            }
        }
        Self {
            decay_steps,
            parents,
        }
    }

    /// The step in which the particle at the given slot decays, or [`None`] if it does not
    /// decay further.
    pub fn decay_step_index(&self, slot: ParticleSlot) -> Option<usize> {
        self.decay_steps.get(&slot).copied()
    }

    /// The final-state slot whose decay is the given step, or [`None`] if the step has no
    /// parent (always the case for step 0).
    pub fn parent_slot(&self, step_index: usize) -> Option<ParticleSlot> {
        self.parents.get(step_index).copied().flatten()
    }

    /// Every decaying final-state slot paired with its decay step, in slot order.
    pub fn decays(&self) -> impl Iterator<Item = (ParticleSlot, usize)> + '_ {
        self.decay_steps.iter().map(|(slot, step)| (*slot, *step))
    }

    /// Steps other than the first which could not be attributed to any final-state particle.
    pub fn unattributed_steps(&self) -> Vec<usize> {
        self.parents
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(step_index, parent)| parent.is_none().then_some(step_index))
            .collect()
    }

    /// The given step and every step that descends from it through decays, sorted.
    pub fn decay_subtree(&self, step_index: usize) -> Vec<usize> {
        let mut subtree = vec![step_index];
        let mut cursor = 0;
        while cursor < subtree.len() {
            let current = subtree[cursor];
            subtree.extend(
                self.decay_steps
                    .iter()
                    .filter(|(slot, _)| slot.step == current)
                    .map(|(_, decay_step)| *decay_step),
            );
            cursor += 1;
        }
        subtree.sort_unstable();
        subtree
    }
}

/// Get the index of the step in which the final-state particle at
/// `(step_index, particle_index)` decays, or [`None`] if it does not decay further.
///
/// # Errors
///
/// Returns an error if either index is out of range.
pub fn get_decay_step_index(
    reaction: &Reaction,
    step_index: usize,
    particle_index: usize,
) -> TopofitResult<Option<usize>> {
    let step = reaction.reaction_step(step_index)?;
    if particle_index >= step.num_final_pids() {
        return Err(TopofitError::ParticleIndexOutOfRange {
            step: step_index,
            index: particle_index,
            len: step.num_final_pids(),
        });
    }
    Ok(reaction
        .decay_index()
        .decay_step_index(ParticleSlot::final_state(step_index, particle_index)))
}

/// Get the final-state slot whose decay is described by the given step, or [`None`] for a step
/// without a parent (such as step 0).
///
/// # Errors
///
/// Returns an error if the step index is out of range.
pub fn get_initial_particle_decay_from_indices(
    reaction: &Reaction,
    step_index: usize,
) -> TopofitResult<Option<ParticleSlot>> {
    reaction.reaction_step(step_index)?;
    Ok(reaction.decay_index().parent_slot(step_index))
}

/// Append the particles of the decay branch which starts at the given step to `chain`.
///
/// The final state of the step is walked in order, depth first. Each particle is pushed, and if
/// `expand_decaying` is set and the particle decays in a step no later than `up_to_step`, the
/// particles of its own decay are pushed right after it.
///
/// # Errors
///
/// Returns an error if the step index is out of range.
pub fn get_chain_pids(
    reaction: &Reaction,
    step_index: usize,
    up_to_step: Option<usize>,
    expand_decaying: bool,
    chain: &mut Vec<Particle>,
) -> TopofitResult<()> {
    let step = reaction.reaction_step(step_index)?;
    let decay_index = reaction.decay_index();
    for (particle_index, pid) in step.final_pids().iter().enumerate() {
        chain.push(*pid);
        if !expand_decaying {
            continue;
        }
        let decay_step =
            decay_index.decay_step_index(ParticleSlot::final_state(step_index, particle_index));
        if let Some(decay_step) = decay_step {
            if up_to_step.map_or(true, |ceiling| decay_step <= ceiling) {
                get_chain_pids(reaction, decay_step, up_to_step, expand_decaying, chain)?;
            }
        }
    }
    Ok(())
}

/// Append the particles of the decay branch of the first step whose initial particle is
/// `initial_pid` to `chain` (see [`get_chain_pids`]). `chain` is left untouched if no step starts
/// with that particle.
///
/// # Errors
///
/// Returns an error if walking the decay branch reaches a step which is out of range.
pub fn get_chain_pids_from_pid(
    reaction: &Reaction,
    initial_pid: Particle,
    up_to_step: Option<usize>,
    expand_decaying: bool,
    chain: &mut Vec<Particle>,
) -> TopofitResult<()> {
    if let Some(step_index) = reaction
        .reaction_steps()
        .iter()
        .position(|step| step.initial_pid() == initial_pid)
    {
        get_chain_pids(reaction, step_index, up_to_step, expand_decaying, chain)?;
    }
    Ok(())
}

/// Check if the decay branch starting at the given step has any particles which cannot be
/// reconstructed: the step is inclusive, declares a missing particle, or contains a decaying
/// particle whose own branch has such particles.
///
/// # Errors
///
/// Returns an error if the step index is out of range.
pub fn check_if_missing_decay_product(
    reaction: &Reaction,
    step_index: usize,
) -> TopofitResult<bool> {
    let step = reaction.reaction_step(step_index)?;
    if step.is_inclusive() || step.missing_index().is_some() {
        return Ok(true);
    }
    let decay_index = reaction.decay_index();
    for particle_index in 0..step.num_final_pids() {
        if let Some(decay_step) =
            decay_index.decay_step_index(ParticleSlot::final_state(step_index, particle_index))
        {
            if check_if_missing_decay_product(reaction, decay_step)? {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Concatenate the ROOT names of a list of particles, as used when labelling decay chains.
pub fn pids_to_root_name(pids: &[Particle]) -> String {
    pids.iter().map(|pid| pid.root_name()).collect()
}
