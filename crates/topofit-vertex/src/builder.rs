use std::collections::BTreeMap;

use indexmap::IndexSet;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use topofit_core::{
    check_if_missing_decay_product, Particle, ParticleIndex, ParticleSlot, Reaction,
    TopofitError, TopofitResult,
};

use crate::{ParticleFilter, ReactionStepVertexInfo, VertexId};

/// Settings for [`ReactionVertexInfo::build`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VertexBuildConfig {
    /// Species whose decay step is merged into the vertex where they are produced, since they
    /// decay too quickly to travel a measurable distance.
    pub in_place_decays: IndexSet<Particle>,
}

impl Default for VertexBuildConfig {
    fn default() -> Self {
        Self {
            in_place_decays: [Particle::Pi0, Particle::Eta, Particle::EtaPrime]
                .into_iter()
                .collect(),
        }
    }
}

impl VertexBuildConfig {
    /// Does the given species decay at the vertex where it is produced?
    pub fn decays_in_place(&self, pid: Particle) -> bool {
        self.in_place_decays.contains(&pid)
    }
    /// Also treat the given species as decaying in place.
    pub fn with_in_place_decay(mut self, pid: Particle) -> Self {
        self.in_place_decays.insert(pid);
        self
    }
    /// Give the given species its own decay vertex.
    pub fn without_in_place_decay(mut self, pid: Particle) -> Self {
        self.in_place_decays.shift_remove(&pid);
        self
    }
}

/// A decaying particle which is produced at one vertex and decays at another.
#[derive(Copy, Clone, Debug)]
struct DecayLink {
    production_slot: ParticleSlot,
    production_vertex: VertexId,
    decay_step: usize,
    decay_vertex: VertexId,
}

impl DecayLink {
    fn decay_slot(&self) -> ParticleSlot {
        ParticleSlot::initial(self.decay_step)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum DefinedAt {
    Decay,
    Production,
}

/// Per-vertex classification gathered before it is handed to the vertex infos.
#[derive(Default)]
struct Classification {
    full_constrain: Vec<ParticleSlot>,
    decaying: Vec<ParticleSlot>,
    only_constrain_time: Vec<ParticleSlot>,
    no_constrain: Vec<ParticleSlot>,
    decaying_no_constrain: Vec<ParticleSlot>,
    decaying_full_constrain: BTreeMap<ParticleSlot, VertexId>,
    use_vertices: Vec<(ParticleSlot, VertexId)>,
}

/// Every vertex of a [`Reaction`], stored in one arena and addressed by [`VertexId`].
///
/// The vertex infos borrow the reaction, so it must outlive them.
#[derive(Clone, Debug)]
pub struct ReactionVertexInfo<'a> {
    reaction: &'a Reaction,
    vertices: Vec<ReactionStepVertexInfo<'a>>,
    step_vertices: Vec<VertexId>,
}

impl<'a> ReactionVertexInfo<'a> {
    /// Group the steps of a reaction into vertices and classify the role of every particle in
    /// a vertex fit.
    ///
    /// A decaying particle links the vertex where it is produced to the vertex where it
    /// decays. Its trajectory is defined at whichever of the two can be positioned without it
    /// (a vertex needs at least two fully constraining particles), preferring the decay vertex,
    /// and is then used to constrain the other one. At the production vertex this is only done
    /// if the momentum of the particle can be derived, either from its reconstructed decay
    /// products or from the rest of the reaction. Links which cannot be resolved leave both
    /// slots unconstraining, and vertices which remain with fewer than two fully constraining
    /// particles are flagged as dangling.
    ///
    /// # Errors
    ///
    /// Returns an [`EmptyReaction`](TopofitError::EmptyReaction) error if the reaction has no
    /// steps.
    pub fn build(reaction: &'a Reaction, config: &VertexBuildConfig) -> TopofitResult<Self> {
        let steps = reaction.reaction_steps();
        if steps.is_empty() {
            return Err(TopofitError::EmptyReaction {
                name: reaction.name().to_string(),
            });
        }
        let decay_index = reaction.decay_index();

        let mut vertices: Vec<ReactionStepVertexInfo<'a>> = Vec::new();
        let mut step_vertices: Vec<Option<VertexId>> = vec![None; steps.len()];
        for (step_index, step) in steps.iter().enumerate() {
            let vertex_id = match step_vertices[step_index] {
                Some(vertex_id) => vertex_id,
                None => {
                    let vertex_id = VertexId(vertices.len());
                    vertices.push(ReactionStepVertexInfo::new(reaction, step_index)?);
                    step_vertices[step_index] = Some(vertex_id);
                    vertex_id
                }
            };
            for (particle_index, pid) in step.final_pids().iter().enumerate() {
                let slot = ParticleSlot::final_state(step_index, particle_index);
                if let Some(decay_step) = decay_index.decay_step_index(slot) {
                    if config.decays_in_place(*pid) && step_vertices[decay_step].is_none() {
                        step_vertices[decay_step] = Some(vertex_id);
                        vertices[vertex_id.0].add_reaction_step(decay_step)?;
                    }
                }
            }
        }
        let step_vertices: Vec<VertexId> = step_vertices.into_iter().flatten().collect();

        let mut classifications: Vec<Classification> =
            vertices.iter().map(|_| Classification::default()).collect();
        let mut links: Vec<DecayLink> = Vec::new();
        for (vertex_index, vertex) in vertices.iter().enumerate() {
            let vertex_id = VertexId(vertex_index);
            let classification = &mut classifications[vertex_index];
            for &step_index in vertex.step_indices() {
                let step = &steps[step_index];
                let initial = ParticleSlot::initial(step_index);
                if vertex.production_vertex_flag() && step_index == 0 {
                    if step.is_missing(ParticleIndex::Initial) {
                        classification.no_constrain.push(initial);
                    } else {
                        classification.full_constrain.push(initial);
                    }
                } else {
                    match decay_index.parent_slot(step_index) {
                        Some(parent) if step_vertices[parent.step] == vertex_id => {}
                        Some(_) => classification.decaying.push(initial),
                        None => {
                            classification.decaying.push(initial);
                            classification.decaying_no_constrain.push(initial);
                        }
                    }
                }
                if step.target_pid().is_some() {
                    classification
                        .no_constrain
                        .push(ParticleSlot::target(step_index));
                }
                if step.second_beam_pid().is_some() {
                    classification
                        .full_constrain
                        .push(ParticleSlot::second_beam(step_index));
                }
                for (particle_index, pid) in step.final_pids().iter().enumerate() {
                    let slot = ParticleSlot::final_state(step_index, particle_index);
                    if step.is_missing(slot.index) {
                        classification.no_constrain.push(slot);
                    } else if let Some(decay_step) = decay_index.decay_step_index(slot) {
                        classification.decaying.push(slot);
                        let decay_vertex = step_vertices[decay_step];
                        if decay_vertex == vertex_id {
                            classification.decaying_no_constrain.push(slot);
                        } else {
                            links.push(DecayLink {
                                production_slot: slot,
                                production_vertex: vertex_id,
                                decay_step,
                                decay_vertex,
                            });
                        }
                    } else if pid.is_charged() {
                        classification.full_constrain.push(slot);
                    } else if *pid == Particle::Gamma {
                        classification.only_constrain_time.push(slot);
                    } else {
                        classification.no_constrain.push(slot);
                    }
                }
            }
        }

        let mut constraint_counts: Vec<usize> = classifications
            .iter()
            .map(|classification| classification.full_constrain.len())
            .collect();
        let mut resolutions: Vec<Option<DefinedAt>> = vec![None; links.len()];
        loop {
            let mut progress = false;
            for (link, resolution) in links.iter().zip(resolutions.iter_mut()) {
                if resolution.is_some()
                    || constraint_counts[link.decay_vertex.0] < 2
                    || check_if_missing_decay_product(reaction, link.decay_step)?
                {
                    continue;
                }
                log::trace!(
                    "{} in reaction \"{}\": defined at decay vertex {}, used at {}",
                    link.production_slot,
                    reaction.name(),
                    link.decay_vertex,
                    link.production_vertex
                );
                *resolution = Some(DefinedAt::Decay);
                constraint_counts[link.production_vertex.0] += 1;
                progress = true;
            }
            if progress {
                continue;
            }
            for (link, resolution) in links.iter().zip(resolutions.iter_mut()) {
                if resolution.is_some()
                    || constraint_counts[link.production_vertex.0] < 2
                    || !momentum_is_derivable(reaction, link.decay_step)?
                {
                    continue;
                }
                log::trace!(
                    "{} in reaction \"{}\": defined at production vertex {}, used at {}",
                    link.production_slot,
                    reaction.name(),
                    link.production_vertex,
                    link.decay_vertex
                );
                *resolution = Some(DefinedAt::Production);
                constraint_counts[link.decay_vertex.0] += 1;
                progress = true;
                break;
            }
            if !progress {
                break;
            }
        }

        for (link, resolution) in links.iter().zip(&resolutions) {
            let (production, decay) = (link.production_vertex.0, link.decay_vertex.0);
            match resolution {
                Some(DefinedAt::Decay) => {
                    classifications[production]
                        .decaying_full_constrain
                        .insert(link.production_slot, link.decay_vertex);
                    classifications[decay]
                        .decaying_no_constrain
                        .push(link.decay_slot());
                    classifications[decay]
                        .use_vertices
                        .push((link.decay_slot(), link.production_vertex));
                }
                Some(DefinedAt::Production) => {
                    classifications[production]
                        .decaying_no_constrain
                        .push(link.production_slot);
                    classifications[production]
                        .use_vertices
                        .push((link.production_slot, link.decay_vertex));
                    classifications[decay]
                        .decaying_full_constrain
                        .insert(link.decay_slot(), link.production_vertex);
                }
                None => {
                    log::trace!(
                        "{} in reaction \"{}\": unresolved between {} and {}",
                        link.production_slot,
                        reaction.name(),
                        link.production_vertex,
                        link.decay_vertex
                    );
                    classifications[production]
                        .decaying_no_constrain
                        .push(link.production_slot);
                    classifications[decay]
                        .decaying_no_constrain
                        .push(link.decay_slot());
                }
            }
        }

        for (vertex, classification) in vertices.iter_mut().zip(classifications) {
            vertex.set_particle_indices(
                &classification.full_constrain,
                &classification.decaying,
                &classification.only_constrain_time,
                &classification.no_constrain,
            )?;
            vertex.register_decaying_particle_constraints(
                &classification.decaying_no_constrain,
                &classification.decaying_full_constrain,
            )?;
            for (slot, use_vertex) in classification.use_vertices {
                vertex.register_decaying_no_constrain_use_vertex(slot, use_vertex)?;
            }
            let is_dangling = vertex
                .full_constrain_particles(&ParticleFilter::default())
                .len()
                < 2;
            vertex.set_dangling_vertex_flag(is_dangling);
        }

        let info = Self {
            reaction,
            vertices,
            step_vertices,
        };
        log::debug!(
            "Built {} vertex info(s) for reaction \"{}\" ({} dangling)",
            info.vertices.len(),
            reaction.name(),
            info.dangling_vertices().len()
        );
        Ok(info)
    }

    /// The reaction these vertices belong to.
    pub fn reaction(&self) -> &'a Reaction {
        self.reaction
    }
    /// The number of vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }
    /// Check if there are no vertices (never the case for a built reaction).
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
    /// Every vertex, ordered by the first step it contains.
    pub fn vertex_infos(&self) -> &[ReactionStepVertexInfo<'a>] {
        &self.vertices
    }
    /// The vertex with the given handle.
    ///
    /// # Errors
    ///
    /// Returns a [`VertexNotFound`](TopofitError::VertexNotFound) error if the handle is not
    /// part of this arena.
    pub fn vertex_info(&self, id: VertexId) -> TopofitResult<&ReactionStepVertexInfo<'a>> {
        self.vertices.get(id.0).ok_or(TopofitError::VertexNotFound {
            id: id.0,
            len: self.vertices.len(),
        })
    }
    /// The handle of the vertex which contains the given step.
    ///
    /// # Errors
    ///
    /// Returns a [`StepIndexOutOfRange`](TopofitError::StepIndexOutOfRange) error if the step
    /// is not part of the reaction.
    pub fn step_vertex_id(&self, step_index: usize) -> TopofitResult<VertexId> {
        self.step_vertices
            .get(step_index)
            .copied()
            .ok_or(TopofitError::StepIndexOutOfRange {
                reaction: self.reaction.name().to_string(),
                index: step_index,
                len: self.step_vertices.len(),
            })
    }
    /// The vertex which contains the given step.
    ///
    /// # Errors
    ///
    /// Returns a [`StepIndexOutOfRange`](TopofitError::StepIndexOutOfRange) error if the step
    /// is not part of the reaction.
    pub fn step_vertex_info(
        &self,
        step_index: usize,
    ) -> TopofitResult<&ReactionStepVertexInfo<'a>> {
        self.vertex_info(self.step_vertex_id(step_index)?)
    }
    /// The production vertex, if the reaction starts with a beam on a target (or a second
    /// beam).
    pub fn production_vertex(&self) -> Option<&ReactionStepVertexInfo<'a>> {
        self.vertices
            .first()
            .filter(|vertex| vertex.production_vertex_flag())
    }
    /// Handles of every dangling vertex.
    pub fn dangling_vertices(&self) -> Vec<VertexId> {
        self.vertices
            .iter()
            .enumerate()
            .filter_map(|(index, vertex)| vertex.dangling_vertex_flag().then_some(VertexId(index)))
            .collect()
    }
    /// The vertex which defines the trajectory of a decaying particle as seen from `vertex`:
    /// the linked vertex if the particle constrains `vertex`, `vertex` itself if the particle is
    /// defined there and used elsewhere, and [`None`] otherwise.
    ///
    /// # Errors
    ///
    /// Returns a [`VertexNotFound`](TopofitError::VertexNotFound) error if the handle is not
    /// part of this arena.
    pub fn defining_vertex(
        &self,
        vertex: VertexId,
        slot: ParticleSlot,
    ) -> TopofitResult<Option<VertexId>> {
        let info = self.vertex_info(vertex)?;
        if let Some(defining_vertex) = info.decaying_particles_full_constrain().get(&slot) {
            return Ok(Some(*defining_vertex));
        }
        Ok(info
            .decaying_particles_no_constrain()
            .get(&slot)
            .copied()
            .flatten()
            .map(|_| vertex))
    }
}

/// Can the momentum of the particle decaying in the given step be derived at its production
/// vertex? It can if its decay products are all reconstructed, or else if nothing outside its
/// decay chain is missing.
fn momentum_is_derivable(reaction: &Reaction, decay_step: usize) -> TopofitResult<bool> {
    if !check_if_missing_decay_product(reaction, decay_step)? {
        return Ok(true);
    }
    let subtree = reaction.decay_index().decay_subtree(decay_step);
    Ok(reaction
        .reaction_steps()
        .iter()
        .enumerate()
        .filter(|(step_index, _)| subtree.binary_search(step_index).is_err())
        .all(|(_, step)| !step.is_inclusive() && step.missing_index().is_none()))
}

/// Build the vertex infos of many reactions at once (in parallel with the `rayon` feature).
///
/// # Errors
///
/// Returns the first error raised by [`ReactionVertexInfo::build`].
pub fn build_many<'a>(
    reactions: &[&'a Reaction],
    config: &VertexBuildConfig,
) -> TopofitResult<Vec<ReactionVertexInfo<'a>>> {
    #[cfg(feature = "rayon")]
    return reactions
        .par_iter()
        .map(|&reaction| ReactionVertexInfo::build(reaction, config))
        .collect();
    #[cfg(not(feature = "rayon"))]
    return reactions
        .iter()
        .map(|&reaction| ReactionVertexInfo::build(reaction, config))
        .collect();
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use topofit_core::{KinFitType, ReactionStep};

    fn omega_reaction() -> Reaction {
        // γ p → p ω, ω → π+ π- π0, π0 → γ γ
        Reaction::new(
            "omega",
            vec![
                Arc::new(
                    ReactionStep::new(Particle::Gamma, [Particle::Proton, Particle::Omega])
                        .with_target(Particle::Proton),
                ),
                Arc::new(ReactionStep::new(
                    Particle::Omega,
                    [Particle::PiPlus, Particle::PiMinus, Particle::Pi0],
                )),
                Arc::new(ReactionStep::new(
                    Particle::Pi0,
                    [Particle::Gamma, Particle::Gamma],
                )),
            ],
            KinFitType::P4AndVertex,
        )
    }

    fn lambda_reaction(missing_production: bool) -> Reaction {
        // γ p → K+ Λ (K0), Λ → p π-
        let mut production =
            ReactionStep::new(Particle::Gamma, [Particle::KPlus, Particle::Lambda])
                .with_target(Particle::Proton);
        if missing_production {
            production = production.with_missing(Particle::KShort);
        }
        Reaction::new(
            "lambda",
            vec![
                Arc::new(production),
                Arc::new(ReactionStep::new(
                    Particle::Lambda,
                    [Particle::Proton, Particle::PiMinus],
                )),
            ],
            KinFitType::Vertex,
        )
    }

    fn assert_disjoint(info: &ReactionStepVertexInfo) {
        let filter = ParticleFilter::default();
        let full = info.full_constrain_particles(&filter);
        let time = info.only_constrain_time_particles(&filter);
        let none = info.no_constrain_particles(&filter);
        for slot in &full {
            assert!(!time.contains(slot) && !none.contains(slot), "{}", slot);
        }
        for slot in &time {
            assert!(!none.contains(slot), "{}", slot);
        }
        let mut union: Vec<ParticleSlot> = full.into_iter().chain(time).chain(none).collect();
        union.sort();
        assert_eq!(union, info.particles(&filter));
        for slot in info.decaying_particles_full_constrain().keys() {
            assert!(info.full_constrain_particles(&filter).contains(slot), "{}", slot);
        }
        for slot in info.decaying_particles_no_constrain().keys() {
            assert!(info.no_constrain_particles(&filter).contains(slot), "{}", slot);
        }
    }

    fn build_checked<'a>(
        reaction: &'a Reaction,
        config: &VertexBuildConfig,
    ) -> ReactionVertexInfo<'a> {
        let info = ReactionVertexInfo::build(reaction, config).unwrap();
        for vertex in info.vertex_infos() {
            assert_disjoint(vertex);
        }
        info
    }

    #[test]
    fn test_omega_vertices() {
        let reaction = omega_reaction();
        let info = build_checked(&reaction, &VertexBuildConfig::default());
        assert_eq!(info.len(), 2);
        let production = info.vertex_info(VertexId(0)).unwrap();
        assert!(production.production_vertex_flag());
        assert_eq!(production.step_indices(), &[0]);
        let decay = info.vertex_info(VertexId(1)).unwrap();
        assert!(!decay.production_vertex_flag());
        assert_eq!(decay.step_indices(), &[1, 2]);
        let omega = ParticleSlot::final_state(0, 1);
        assert_eq!(
            production.decaying_particles_full_constrain().get(&omega),
            Some(&VertexId(1))
        );
        assert!(!production
            .decaying_particles_no_constrain()
            .contains_key(&omega));
        assert_eq!(
            decay
                .decaying_particles_no_constrain()
                .get(&ParticleSlot::initial(1)),
            Some(&Some(VertexId(0)))
        );
        assert_eq!(info.defining_vertex(VertexId(0), omega).unwrap(), Some(VertexId(1)));
        assert_eq!(
            info.defining_vertex(VertexId(1), ParticleSlot::initial(1))
                .unwrap(),
            Some(VertexId(1))
        );
        assert!(info.dangling_vertices().is_empty());
    }

    #[test]
    fn test_cascade_vertices() {
        // γ p → K+ K+ Ξ-, Ξ- → Λ π-, Λ → p π-
        let reaction = Reaction::new(
            "xi",
            vec![
                Arc::new(
                    ReactionStep::new(
                        Particle::Gamma,
                        [Particle::KPlus, Particle::KPlus, Particle::XiMinus],
                    )
                    .with_target(Particle::Proton),
                ),
                Arc::new(ReactionStep::new(
                    Particle::XiMinus,
                    [Particle::Lambda, Particle::PiMinus],
                )),
                Arc::new(ReactionStep::new(
                    Particle::Lambda,
                    [Particle::Proton, Particle::PiMinus],
                )),
            ],
            KinFitType::P4AndSpacetime,
        );
        let info = build_checked(&reaction, &VertexBuildConfig::default());
        assert_eq!(info.len(), 3);
        let xi = ParticleSlot::final_state(0, 2);
        let lambda = ParticleSlot::final_state(1, 0);
        // the Λ is defined by its tracks, and then defines the Ξ vertex together with the π-
        let xi_vertex = info.vertex_info(VertexId(1)).unwrap();
        assert_eq!(
            xi_vertex.decaying_particles_full_constrain().get(&lambda),
            Some(&VertexId(2))
        );
        assert_eq!(
            xi_vertex
                .decaying_particles_no_constrain()
                .get(&ParticleSlot::initial(1)),
            Some(&Some(VertexId(0)))
        );
        assert_eq!(
            xi_vertex.full_constrain_particles(&ParticleFilter::default()),
            vec![ParticleSlot::final_state(1, 1), lambda]
        );
        let production = info.production_vertex().unwrap();
        assert_eq!(
            production.decaying_particles_full_constrain().get(&xi),
            Some(&VertexId(1))
        );
        assert_eq!(
            production
                .full_constrain_particles(&ParticleFilter::default())
                .len(),
            4
        );
        assert_eq!(info.defining_vertex(VertexId(1), lambda).unwrap(), Some(VertexId(2)));
        assert_eq!(
            info.defining_vertex(VertexId(2), ParticleSlot::initial(2))
                .unwrap(),
            Some(VertexId(2))
        );
        assert_eq!(info.defining_vertex(VertexId(0), xi).unwrap(), Some(VertexId(1)));
        assert!(info.dangling_vertices().is_empty());
    }

    #[test]
    fn test_two_step_omega() {
        // γ p → p ω, ω → π+ π- π0 with the π0 left undecayed
        let reaction = Reaction::new(
            "omega two step",
            vec![
                Arc::new(
                    ReactionStep::new(Particle::Gamma, [Particle::Proton, Particle::Omega])
                        .with_target(Particle::Proton),
                ),
                Arc::new(ReactionStep::new(
                    Particle::Omega,
                    [Particle::PiPlus, Particle::PiMinus, Particle::Pi0],
                )),
            ],
            KinFitType::Vertex,
        );
        let info = build_checked(&reaction, &VertexBuildConfig::default());
        assert_eq!(info.len(), 2);
        let production = &info.vertex_infos()[0];
        let decay = &info.vertex_infos()[1];
        assert!(production.production_vertex_flag());
        assert_eq!(production.step_indices(), &[0]);
        assert!(!decay.production_vertex_flag());
        assert_eq!(decay.step_indices(), &[1]);
        let omega = ParticleSlot::final_state(0, 1);
        assert!(production
            .decaying_particles(&ParticleFilter::default())
            .contains(&omega));
        assert_eq!(
            production.decaying_particles_full_constrain().get(&omega),
            Some(&VertexId(1))
        );
        assert_eq!(
            decay.no_constrain_particles(&ParticleFilter::default()),
            vec![ParticleSlot::final_state(1, 2), ParticleSlot::initial(1)]
        );
    }

    #[test]
    fn test_in_place_decay_classification() {
        let reaction = omega_reaction();
        let info = build_checked(&reaction, &VertexBuildConfig::default());
        let decay = info.step_vertex_info(2).unwrap();
        let filter = ParticleFilter::default();
        let pi0 = ParticleSlot::final_state(1, 2);
        assert!(decay.decaying_particles(&filter).contains(&pi0));
        assert!(decay.no_constrain_particles(&filter).contains(&pi0));
        assert_eq!(
            decay.decaying_particles_no_constrain().get(&pi0),
            Some(&None)
        );
        assert!(!decay.particles(&filter).contains(&ParticleSlot::initial(2)));
        assert_eq!(
            decay.only_constrain_time_particles(&filter),
            vec![ParticleSlot::final_state(2, 0), ParticleSlot::final_state(2, 1)]
        );
        assert_eq!(
            decay.full_constrain_particles(&filter.without_decaying()),
            vec![ParticleSlot::final_state(1, 0), ParticleSlot::final_state(1, 1)]
        );
    }

    #[test]
    fn test_in_place_set_is_configurable() {
        let reaction = omega_reaction();
        let merged_omega = VertexBuildConfig::default().with_in_place_decay(Particle::Omega);
        let info = build_checked(&reaction, &merged_omega);
        assert_eq!(info.len(), 1);
        assert_eq!(info.vertex_infos()[0].step_indices(), &[0, 1, 2]);

        let separate_pi0 = VertexBuildConfig::default().without_in_place_decay(Particle::Pi0);
        let info = build_checked(&reaction, &separate_pi0);
        assert_eq!(info.len(), 3);
        // π0 → γ γ cannot be positioned by photons alone
        assert_eq!(info.dangling_vertices(), vec![VertexId(2)]);
        let pi0 = ParticleSlot::final_state(1, 2);
        assert_eq!(
            info.step_vertex_info(1)
                .unwrap()
                .decaying_particles_no_constrain()
                .get(&pi0),
            Some(&Some(VertexId(2)))
        );
        assert_eq!(
            info.step_vertex_info(2)
                .unwrap()
                .decaying_particles_full_constrain()
                .get(&ParticleSlot::initial(2)),
            Some(&VertexId(1))
        );
    }

    #[test]
    fn test_defined_at_production() {
        // γ p → K+ Λ, Λ → p (π-): the decay vertex only has one track
        let reaction = Reaction::new(
            "lambda missing pion",
            vec![
                Arc::new(
                    ReactionStep::new(Particle::Gamma, [Particle::KPlus, Particle::Lambda])
                        .with_target(Particle::Proton),
                ),
                Arc::new(
                    ReactionStep::new(Particle::Lambda, [Particle::Proton])
                        .with_missing(Particle::PiMinus),
                ),
            ],
            KinFitType::Vertex,
        );
        let info = build_checked(&reaction, &VertexBuildConfig::default());
        let lambda = ParticleSlot::final_state(0, 1);
        let production = info.vertex_info(VertexId(0)).unwrap();
        assert_eq!(
            production.decaying_particles_no_constrain().get(&lambda),
            Some(&Some(VertexId(1)))
        );
        let decay = info.vertex_info(VertexId(1)).unwrap();
        assert_eq!(
            decay
                .decaying_particles_full_constrain()
                .get(&ParticleSlot::initial(1)),
            Some(&VertexId(0))
        );
        assert!(info.dangling_vertices().is_empty());
        assert_eq!(
            decay.missing_particles(&ParticleFilter::default()),
            vec![ParticleSlot::final_state(1, 1)]
        );
    }

    #[test]
    fn test_unresolved_link_is_dangling() {
        // γ p → K+ Λ (K0), Λ → p (π-): neither side can define the Λ
        let reaction = Reaction::new(
            "unresolved",
            vec![
                Arc::new(
                    ReactionStep::new(Particle::Gamma, [Particle::KPlus, Particle::Lambda])
                        .with_target(Particle::Proton)
                        .with_missing(Particle::KShort),
                ),
                Arc::new(
                    ReactionStep::new(Particle::Lambda, [Particle::Proton])
                        .with_missing(Particle::PiMinus),
                ),
            ],
            KinFitType::Vertex,
        );
        let info = build_checked(&reaction, &VertexBuildConfig::default());
        let lambda = ParticleSlot::final_state(0, 1);
        assert_eq!(
            info.vertex_info(VertexId(0))
                .unwrap()
                .decaying_particles_no_constrain()
                .get(&lambda),
            Some(&None)
        );
        assert_eq!(info.dangling_vertices(), vec![VertexId(1)]);
        assert_eq!(info.defining_vertex(VertexId(0), lambda).unwrap(), None);
    }

    #[test]
    fn test_missing_production_particle_still_uses_decay() {
        let reaction = lambda_reaction(true);
        let info = build_checked(&reaction, &VertexBuildConfig::default());
        let production = info.production_vertex().unwrap();
        assert_eq!(
            production
                .decaying_particles_full_constrain()
                .get(&ParticleSlot::final_state(0, 1)),
            Some(&VertexId(1))
        );
        assert_eq!(
            production.missing_particles(&ParticleFilter::default()),
            vec![ParticleSlot::final_state(0, 2)]
        );
    }

    #[test]
    fn test_decay_without_production() {
        // Λ → p π- with no described production
        let reaction = Reaction::new(
            "at rest",
            vec![Arc::new(ReactionStep::new(
                Particle::Lambda,
                [Particle::Proton, Particle::PiMinus],
            ))],
            KinFitType::Vertex,
        );
        let info = build_checked(&reaction, &VertexBuildConfig::default());
        assert!(info.production_vertex().is_none());
        let vertex = info.step_vertex_info(0).unwrap();
        assert_eq!(
            vertex
                .decaying_particles_no_constrain()
                .get(&ParticleSlot::initial(0)),
            Some(&None)
        );
        assert!(!vertex.dangling_vertex_flag());
    }

    #[test]
    fn test_query_errors() {
        let reaction = lambda_reaction(false);
        let info = build_checked(&reaction, &VertexBuildConfig::default());
        assert!(matches!(
            info.vertex_info(VertexId(5)),
            Err(TopofitError::VertexNotFound { id: 5, len: 2 })
        ));
        assert!(matches!(
            info.step_vertex_info(2),
            Err(TopofitError::StepIndexOutOfRange { .. })
        ));
        assert_eq!(info.step_vertex_id(1).unwrap(), VertexId(1));
        assert_eq!(info.reaction().name(), "lambda");

        let empty = Reaction::new("empty", Vec::new(), KinFitType::NoFit);
        assert!(matches!(
            ReactionVertexInfo::build(&empty, &VertexBuildConfig::default()),
            Err(TopofitError::EmptyReaction { .. })
        ));
    }

    #[test]
    fn test_build_many() {
        let reactions = [omega_reaction(), lambda_reaction(false)];
        let references: Vec<&Reaction> = reactions.iter().collect();
        let infos = build_many(&references, &VertexBuildConfig::default()).unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].reaction().name(), "omega");
        assert_eq!(infos[1].len(), 2);
        for vertex in infos.iter().flat_map(|info| info.vertex_infos()) {
            assert_disjoint(vertex);
        }
    }

    #[test]
    fn test_config_serialization() {
        let config = VertexBuildConfig::default().with_in_place_decay(Particle::Omega);
        let bytes = serde_pickle::to_vec(&config, Default::default()).unwrap();
        let restored: VertexBuildConfig =
            serde_pickle::from_slice(&bytes, Default::default()).unwrap();
        assert_eq!(restored, config);
        assert!(restored.decays_in_place(Particle::Omega));
        assert!(!VertexBuildConfig::default().decays_in_place(Particle::Omega));
    }
}
