use topofit_core::{utils::list_to_name, ParticleSlot};

use crate::{ParticleFilter, ReactionStepVertexInfo};

fn slot_label(info: &ReactionStepVertexInfo, slot: ParticleSlot) -> Option<String> {
    let pid = info.reaction().slot_pid(slot).ok().flatten()?;
    if info.reaction().is_decaying(slot) {
        Some(format!("({})", pid.root_name()))
    } else {
        Some(pid.root_name().to_string())
    }
}

/// Describe the constraints of a vertex for plot titles and logs, in ROOT's TLatex syntax.
///
/// The particles which constrain the vertex position are listed in slot order, with decaying
/// particles in parentheses. If the kinematic fit of the reaction constrains vertex times, the
/// particles which only constrain the time are appended after a semicolon.
pub fn build_vertex_constraint_string(info: &ReactionStepVertexInfo) -> String {
    let filter = ParticleFilter::default();
    let labels = |slots: Vec<ParticleSlot>| -> Vec<String> {
        slots
            .into_iter()
            .filter_map(|slot| slot_label(info, slot))
            .collect()
    };
    let mut description = list_to_name(&labels(info.full_constrain_particles(&filter)));
    if info.reaction().kinfit_type().includes_time() {
        let time_only = labels(info.only_constrain_time_particles(&filter));
        if !time_only.is_empty() {
            description.push_str("; ");
            description.push_str(&list_to_name(&time_only));
        }
    }
    description
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{ReactionVertexInfo, VertexBuildConfig};
    use topofit_core::{KinFitType, Particle, Reaction, ReactionStep};

    fn omega_reaction(kinfit_type: KinFitType) -> Reaction {
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
            kinfit_type,
        )
    }

    #[test]
    fn test_constraint_strings() {
        let reaction = omega_reaction(KinFitType::P4AndSpacetime);
        let info = ReactionVertexInfo::build(&reaction, &VertexBuildConfig::default()).unwrap();
        let production = &info.vertex_infos()[0];
        assert_eq!(
            build_vertex_constraint_string(production),
            "#gamma, p, (#omega)"
        );
        let decay = &info.vertex_infos()[1];
        assert_eq!(
            build_vertex_constraint_string(decay),
            "#pi^{+}, #pi^{-}; #gamma, #gamma"
        );
    }

    #[test]
    fn test_time_constraints_follow_fit_type() {
        let reaction = omega_reaction(KinFitType::P4AndVertex);
        let info = ReactionVertexInfo::build(&reaction, &VertexBuildConfig::default()).unwrap();
        assert_eq!(
            build_vertex_constraint_string(&info.vertex_infos()[1]),
            "#pi^{+}, #pi^{-}"
        );
        let reaction = omega_reaction(KinFitType::Spacetime);
        let info = ReactionVertexInfo::build(&reaction, &VertexBuildConfig::default()).unwrap();
        assert_eq!(
            build_vertex_constraint_string(&info.vertex_infos()[1]),
            "#pi^{+}, #pi^{-}; #gamma, #gamma"
        );
    }
}
