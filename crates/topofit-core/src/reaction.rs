use std::{
    fmt::Debug,
    sync::{Arc, OnceLock},
};

use dyn_clone::DynClone;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    Charge, DecayIndex, KinFitType, Particle, ParticleIndex, ParticleSlot, ReactionStep,
    TopofitError, TopofitResult,
};

/// An analysis step (a cut, a histogram, ...) which is run over the particle combinations of a
/// [`Reaction`].
///
/// Actions are owned by their [`Reaction`] and dropped with it. Evaluating an action on event
/// data is the job of the analysis framework; here an action only needs a name and the chance to
/// configure itself from the reaction it belongs to.
#[typetag::serde(tag = "type")]
pub trait AnalysisAction: DynClone + Debug + Send + Sync {
    /// A name for the action which is unique within its reaction.
    fn action_name(&self) -> String;
    /// Should the action operate on kinematic-fit results rather than on measured values?
    fn use_kinfit_results(&self) -> bool {
        false
    }
    /// Configure the action from the reaction which owns it. This is called once, by
    /// [`Reaction::initialize_analysis_actions`]. The default implementation does nothing.
    #[allow(unused_variables)]
    fn initialize(&mut self, reaction: &Reaction) -> TopofitResult<()> {
        Ok(())
    }
}

dyn_clone::clone_trait_object!(AnalysisAction);

/// An [`AnalysisAction`] which cuts on the missing mass squared of a particle combination.
///
/// The particles which are expected to be missing are taken from the reaction when the action is
/// initialized.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CutMissingMassSquared {
    min: f64,
    max: f64,
    use_kinfit_results: bool,
    missing_pids: Vec<Particle>,
}
impl CutMissingMassSquared {
    /// Create a new cut which keeps missing masses squared (in GeV²) within `[min, max)`.
    pub fn new(min: f64, max: f64, use_kinfit_results: bool) -> Box<Self> {
        Self {
            min,
            max,
            use_kinfit_results,
            missing_pids: Vec::new(),
        }
        .into()
    }
    /// The particles which the cut expects to be missing.
    pub fn missing_pids(&self) -> &[Particle] {
        &self.missing_pids
    }
    /// The nominal missing mass squared, from the declared missing particles.
    pub fn expected_missing_mass_squared(&self) -> f64 {
        let mass: f64 = self.missing_pids.iter().map(|pid| pid.mass()).sum();
        mass * mass
    }
    /// Check if a value passes the cut.
    pub fn passes(&self, missing_mass_squared: f64) -> bool {
        missing_mass_squared >= self.min && missing_mass_squared < self.max
    }
}

#[typetag::serde]
impl AnalysisAction for CutMissingMassSquared {
    fn action_name(&self) -> String {
        if self.use_kinfit_results {
            "Cut_MissingMassSquared_KinFit".to_string()
        } else {
            "Cut_MissingMassSquared".to_string()
        }
    }
    fn use_kinfit_results(&self) -> bool {
        self.use_kinfit_results
    }
    fn initialize(&mut self, reaction: &Reaction) -> TopofitResult<()> {
        if self.min >= self.max {
            return Err(TopofitError::Custom(format!(
                "{} for reaction \"{}\" has an empty range [{}, {})",
                self.action_name(),
                reaction.name(),
                self.min,
                self.max
            )));
        }
        self.missing_pids = reaction.get_missing_pids(None)?;
        Ok(())
    }
}

/// Filters for [`Reaction::get_final_pids`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FinalPidOptions {
    /// Include the declared missing particles.
    pub include_missing: bool,
    /// Include particles which decay in a later step.
    pub include_decaying: bool,
    /// Only include particles with this charge.
    pub charge: Charge,
    /// Include a species more than once if it appears more than once.
    pub include_duplicates: bool,
}
impl Default for FinalPidOptions {
    fn default() -> Self {
        Self {
            include_missing: true,
            include_decaying: true,
            charge: Charge::All,
            include_duplicates: true,
        }
    }
}

/// Cuts applied before particle combinations are built.
///
/// Each value is [`None`] until it is explicitly set, so an unset cut can be told apart from a
/// cut at zero. Values given on the command line take precedence over values set on a reaction
/// (see [`PreSelectionCuts::overridden_by`]).
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PreSelectionCuts {
    /// The maximum time difference (ns) between a photon and the RF bunch.
    pub max_photon_rf_delta_t: Option<f64>,
    /// The maximum number of good tracks not used in a combination.
    pub max_extra_good_tracks: Option<usize>,
    /// The maximum number of beam photons within the RF bunch.
    pub max_num_beam_photons_in_bunch: Option<usize>,
}
impl PreSelectionCuts {
    /// Combine these cuts with a set of overrides: every cut which is set in `overrides` replaces
    /// the value here.
    pub fn overridden_by(&self, overrides: &PreSelectionCuts) -> Self {
        Self {
            max_photon_rf_delta_t: overrides
                .max_photon_rf_delta_t
                .or(self.max_photon_rf_delta_t),
            max_extra_good_tracks: overrides
                .max_extra_good_tracks
                .or(self.max_extra_good_tracks),
            max_num_beam_photons_in_bunch: overrides
                .max_num_beam_photons_in_bunch
                .or(self.max_num_beam_photons_in_bunch),
        }
    }
}

/// Configuration for writing analysis results to a tree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeOutput {
    /// Is output enabled?
    pub enabled: bool,
    /// The (shell-expanded) output file name.
    pub file_name: String,
    /// Also save particle combinations which did not survive the analysis actions.
    pub save_unused: bool,
}

/// A full reaction: an ordered list of [`ReactionStep`]s plus the configuration for analysing
/// it.
///
/// Steps are held through [`Arc`]s since the same step may be shared by several reactions; a
/// reaction never copies or drops the steps themselves. The [`AnalysisAction`]s belong to the
/// reaction. Names are expected to be unique among all live reactions, which a
/// [`ReactionRegistry`] can enforce.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Reaction {
    name: String,
    steps: Vec<Arc<ReactionStep>>,
    kinfit_type: KinFitType,
    kinfit_update_covariance_matrices: bool,
    actions: Vec<Box<dyn AnalysisAction>>,
    cuts: PreSelectionCuts,
    tree_output: TreeOutput,
    event_store_skims: Vec<String>,
    any_combo: bool,
    #[serde(skip)]
    decay_index: OnceLock<DecayIndex>,
}

impl Reaction {
    /// Create a new [`Reaction`] from a name, a list of steps, and a kinematic-fit mode.
    pub fn new(name: &str, steps: Vec<Arc<ReactionStep>>, kinfit_type: KinFitType) -> Self {
        Self {
            name: name.to_string(),
            steps,
            kinfit_type,
            kinfit_update_covariance_matrices: false,
            actions: Vec::new(),
            cuts: PreSelectionCuts::default(),
            tree_output: TreeOutput::default(),
            event_store_skims: Vec::new(),
            any_combo: false,
            decay_index: OnceLock::new(),
        }
    }

    /// The name of the reaction.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a step to the reaction.
    pub fn add_reaction_step(&mut self, step: Arc<ReactionStep>) {
        self.steps.push(step);
        self.decay_index = OnceLock::new();
    }
    /// Remove every step from the reaction (the steps themselves are untouched).
    pub fn clear_reaction_steps(&mut self) {
        self.steps.clear();
        self.decay_index = OnceLock::new();
    }
    /// The number of steps.
    pub fn num_reaction_steps(&self) -> usize {
        self.steps.len()
    }
    /// All of the steps, in order.
    pub fn reaction_steps(&self) -> &[Arc<ReactionStep>] {
        &self.steps
    }
    /// The step at the given index.
    ///
    /// # Errors
    ///
    /// Returns a [`StepIndexOutOfRange`](TopofitError::StepIndexOutOfRange) error if the index
    /// is beyond the list of steps.
    pub fn reaction_step(&self, index: usize) -> TopofitResult<&ReactionStep> {
        self.steps
            .get(index)
            .map(|step| step.as_ref())
            .ok_or(TopofitError::StepIndexOutOfRange {
                reaction: self.name.clone(),
                index,
                len: self.steps.len(),
            })
    }
    /// The particle at the given slot, or [`None`] if the slot is empty (like the target of a
    /// decay step).
    ///
    /// # Errors
    ///
    /// Returns an error if the slot's step index is out of range.
    pub fn slot_pid(&self, slot: ParticleSlot) -> TopofitResult<Option<Particle>> {
        Ok(self.reaction_step(slot.step)?.pid(slot.index))
    }

    /// The table of which final-state particles decay in which steps. It is built on first use
    /// and rebuilt after the steps change.
    pub fn decay_index(&self) -> &DecayIndex {
        self.decay_index
            .get_or_init(|| DecayIndex::new(&self.steps))
    }

    /// Check if the particle at the given slot decays further. The initial particle of a step
    /// is decaying unless it is the beam of the first step.
    pub fn is_decaying(&self, slot: ParticleSlot) -> bool {
        match slot.index {
            ParticleIndex::Initial => {
                slot.step < self.steps.len()
                    && !(slot.step == 0 && self.is_first_step_beam().unwrap_or(false))
            }
            ParticleIndex::Final(_) => self.decay_index().decay_step_index(slot).is_some(),
            ParticleIndex::Target | ParticleIndex::SecondBeam => false,
        }
    }

    /// Check if the first step is a production step (it has a target or a second beam) rather
    /// than the decay of a particle whose production is not described.
    ///
    /// # Errors
    ///
    /// Returns an [`EmptyReaction`](TopofitError::EmptyReaction) error if there are no steps.
    pub fn is_first_step_beam(&self) -> TopofitResult<bool> {
        let first_step = self.steps.first().ok_or(TopofitError::EmptyReaction {
            name: self.name.clone(),
        })?;
        Ok(first_step.target_pid().is_some() || first_step.second_beam_pid().is_some())
    }

    /// Check if any step is inclusive.
    pub fn is_inclusive(&self) -> bool {
        self.steps.iter().any(|step| step.is_inclusive())
    }

    /// Get the final-state particles of one step (or of every step if `step_index` is [`None`]),
    /// in step order and then in order within each step.
    ///
    /// # Errors
    ///
    /// Returns an error if the step index is out of range.
    pub fn get_final_pids(
        &self,
        step_index: Option<usize>,
        options: FinalPidOptions,
    ) -> TopofitResult<Vec<Particle>> {
        if let Some(index) = step_index {
            self.reaction_step(index)?;
        }
        let decay_index = self.decay_index();
        let mut pids: Vec<Particle> = Vec::new();
        for (current_step, step) in self.steps.iter().enumerate() {
            if step_index.is_some_and(|index| index != current_step) {
                continue;
            }
            for (particle_index, pid) in step.final_pids().iter().enumerate() {
                let slot = ParticleSlot::final_state(current_step, particle_index);
                if !options.include_missing && step.is_missing(slot.index) {
                    continue;
                }
                if !options.include_decaying && decay_index.decay_step_index(slot).is_some() {
                    continue;
                }
                if !options.charge.matches(pid.charge()) {
                    continue;
                }
                if !options.include_duplicates && pids.contains(pid) {
                    continue;
                }
                pids.push(*pid);
            }
        }
        Ok(pids)
    }

    /// Get the declared missing particles of one step (or of every step if `step_index` is
    /// [`None`]), in step order.
    ///
    /// # Errors
    ///
    /// Returns an error if the step index is out of range.
    pub fn get_missing_pids(&self, step_index: Option<usize>) -> TopofitResult<Vec<Particle>> {
        match step_index {
            Some(index) => Ok(self.reaction_step(index)?.missing_pid().into_iter().collect()),
            None => Ok(self
                .steps
                .iter()
                .filter_map(|step| step.missing_pid())
                .collect()),
        }
    }

    /// The kinematic-fit mode.
    pub fn kinfit_type(&self) -> KinFitType {
        self.kinfit_type
    }
    /// Set the kinematic-fit mode.
    pub fn set_kinfit_type(&mut self, kinfit_type: KinFitType) {
        self.kinfit_type = kinfit_type;
    }
    /// Should the kinematic fit produce new covariance matrices for the fitted particles?
    pub fn kinfit_update_covariance_matrices(&self) -> bool {
        self.kinfit_update_covariance_matrices
    }
    /// Set whether the kinematic fit should produce new covariance matrices.
    pub fn set_kinfit_update_covariance_matrices(&mut self, update: bool) {
        self.kinfit_update_covariance_matrices = update;
    }

    /// Add an analysis action. The reaction takes ownership of it.
    pub fn add_analysis_action(&mut self, action: Box<dyn AnalysisAction>) {
        self.actions.push(action);
    }
    /// The number of analysis actions.
    pub fn num_analysis_actions(&self) -> usize {
        self.actions.len()
    }
    /// The analysis action at the given index.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionIndexOutOfRange`](TopofitError::ActionIndexOutOfRange) error if the
    /// index is beyond the list of actions.
    pub fn analysis_action(&self, index: usize) -> TopofitResult<&dyn AnalysisAction> {
        self.actions
            .get(index)
            .map(|action| action.as_ref())
            .ok_or(TopofitError::ActionIndexOutOfRange {
                reaction: self.name.clone(),
                index,
                len: self.actions.len(),
            })
    }
    /// All of the analysis actions, in order.
    pub fn analysis_actions(&self) -> &[Box<dyn AnalysisAction>] {
        &self.actions
    }
    /// Run [`AnalysisAction::initialize`] for every action, in order.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by an action. The actions stay attached to the reaction
    /// either way.
    pub fn initialize_analysis_actions(&mut self) -> TopofitResult<()> {
        let mut actions = std::mem::take(&mut self.actions);
        let result = actions
            .iter_mut()
            .try_for_each(|action| action.initialize(self));
        self.actions = actions;
        result
    }

    /// The pre-selection cuts set on this reaction.
    pub fn pre_selection_cuts(&self) -> &PreSelectionCuts {
        &self.cuts
    }
    /// Set the maximum photon-RF time difference (ns).
    pub fn set_max_photon_rf_delta_t(&mut self, value: f64) {
        self.cuts.max_photon_rf_delta_t = Some(value);
    }
    /// Set the maximum number of extra good tracks.
    pub fn set_max_extra_good_tracks(&mut self, value: usize) {
        self.cuts.max_extra_good_tracks = Some(value);
    }
    /// Set the maximum number of beam photons within the RF bunch.
    pub fn set_max_num_beam_photons_in_bunch(&mut self, value: usize) {
        self.cuts.max_num_beam_photons_in_bunch = Some(value);
    }

    /// Enable tree output to the given file. Shell variables and `~` in the file name are
    /// expanded. Calling this again replaces the earlier settings.
    ///
    /// # Errors
    ///
    /// Returns a [`LookupError`](TopofitError::LookupError) if the file name refers to an
    /// undefined environment variable.
    pub fn enable_tree_output(&mut self, file_name: &str, save_unused: bool) -> TopofitResult<()> {
        let expanded = shellexpand::full(file_name)?;
        self.tree_output = TreeOutput {
            enabled: true,
            file_name: expanded.into_owned(),
            save_unused,
        };
        Ok(())
    }
    /// The tree-output configuration.
    pub fn tree_output(&self) -> &TreeOutput {
        &self.tree_output
    }

    /// Set the event-store skims from a comma-separated list.
    pub fn set_event_store_skims(&mut self, skims: &str) {
        self.event_store_skims = skims
            .split(',')
            .map(|skim| skim.trim())
            .filter(|skim| !skim.is_empty())
            .map(|skim| skim.to_string())
            .collect();
    }
    /// The event-store skims.
    pub fn event_store_skims(&self) -> &[String] {
        &self.event_store_skims
    }

    /// If set, the analysis stops building combinations once one has been built.
    pub fn any_combo(&self) -> bool {
        self.any_combo
    }
    /// Set whether the analysis stops building combinations once one has been built.
    pub fn set_any_combo(&mut self, any_combo: bool) {
        self.any_combo = any_combo;
    }
}

/// A collection of [`Reaction`]s keyed (and kept unique) by name, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct ReactionRegistry {
    reactions: IndexMap<String, Arc<Reaction>>,
}

impl ReactionRegistry {
    /// Add a reaction to the registry and get a shared handle to it.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`](TopofitError::RegistrationError) if a reaction by the
    /// same name is already registered.
    pub fn register(&mut self, reaction: Reaction) -> TopofitResult<Arc<Reaction>> {
        if self.reactions.contains_key(reaction.name()) {
            return Err(TopofitError::RegistrationError {
                name: reaction.name().to_string(),
            });
        }
        let reaction = Arc::new(reaction);
        self.reactions
            .insert(reaction.name().to_string(), reaction.clone());
        Ok(reaction)
    }
    /// Get a registered reaction by name.
    ///
    /// # Errors
    ///
    /// Returns a [`ReactionNotFoundError`](TopofitError::ReactionNotFoundError) if there is no
    /// reaction by that name.
    pub fn get(&self, name: &str) -> TopofitResult<Arc<Reaction>> {
        self.reactions
            .get(name)
            .cloned()
            .ok_or(TopofitError::ReactionNotFoundError {
                name: name.to_string(),
            })
    }
    /// The number of registered reactions.
    pub fn len(&self) -> usize {
        self.reactions.len()
    }
    /// Check if no reactions are registered.
    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }
    /// Iterate over the registered reactions in the order they were registered.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Reaction>> {
        self.reactions.values()
    }
}
