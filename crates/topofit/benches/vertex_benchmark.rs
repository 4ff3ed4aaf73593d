use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use topofit::{
    build_many, FinalPidOptions, KinFitType, Particle, Reaction, ReactionStep, ReactionVertexInfo,
    VertexBuildConfig,
};

use rayon::ThreadPoolBuilder;

// γ p → K+ K+ Ξ-, Ξ- → Λ π-, Λ → p π-
fn xi_reaction(name: &str) -> Reaction {
    Reaction::new(
        name,
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
    )
}

// γ p → p η', η' → η π+ π-, η → π0 π0 π0, π0 → γ γ
fn eta_prime_reaction(name: &str) -> Reaction {
    let pi0_decay = Arc::new(ReactionStep::new(
        Particle::Pi0,
        [Particle::Gamma, Particle::Gamma],
    ));
    Reaction::new(
        name,
        vec![
            Arc::new(
                ReactionStep::new(Particle::Gamma, [Particle::Proton, Particle::EtaPrime])
                    .with_target(Particle::Proton),
            ),
            Arc::new(ReactionStep::new(
                Particle::EtaPrime,
                [Particle::Eta, Particle::PiPlus, Particle::PiMinus],
            )),
            Arc::new(ReactionStep::new(
                Particle::Eta,
                [Particle::Pi0, Particle::Pi0, Particle::Pi0],
            )),
            pi0_decay.clone(),
            pi0_decay.clone(),
            pi0_decay,
        ],
        KinFitType::P4AndVertex,
    )
}

fn vertex_build_benchmark(c: &mut Criterion) {
    let config = VertexBuildConfig::default();
    let mut group = c.benchmark_group("Vertex build");
    for (label, reaction) in [
        ("Xi", xi_reaction("xi")),
        ("EtaPrime", eta_prime_reaction("eta_prime")),
    ] {
        // the decay index is cached after the first query
        reaction
            .get_final_pids(None, FinalPidOptions::default())
            .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(label), &reaction, |b, reaction| {
            b.iter(|| black_box(ReactionVertexInfo::build(reaction, &config).unwrap()))
        });
    }
    group.finish();
}

fn build_many_benchmark(c: &mut Criterion) {
    let config = VertexBuildConfig::default();
    let reactions: Vec<Reaction> = (0..256)
        .map(|i| {
            if i % 2 == 0 {
                xi_reaction(&format!("xi_{}", i))
            } else {
                eta_prime_reaction(&format!("eta_prime_{}", i))
            }
        })
        .collect();
    let references: Vec<&Reaction> = reactions.iter().collect();
    let mut group = c.benchmark_group("Build many");
    let n_threads: Vec<usize> = (0..)
        .map(|x| 1 << x)
        .take_while(|&p| p <= num_cpus::get())
        .collect();
    for threads in n_threads {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .unwrap();
        group.bench_with_input(
            BenchmarkId::from_parameter(threads),
            &threads,
            |b, &_threads| {
                b.iter(|| pool.install(|| black_box(build_many(&references, &config).unwrap())))
            },
        );
    }
    group.finish();
}

criterion_group!(benches, vertex_build_benchmark, build_many_benchmark);
criterion_main!(benches);
