use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::TopofitError;

/// The particle species which can appear in a [`ReactionStep`](crate::ReactionStep).
///
/// Masses are nominal PDG values in GeV and charges are in units of $`e`$.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Particle {
    Gamma,
    Positron,
    Electron,
    Neutrino,
    MuonPlus,
    MuonMinus,
    Pi0,
    PiPlus,
    PiMinus,
    KLong,
    KShort,
    KPlus,
    KMinus,
    Eta,
    Omega,
    EtaPrime,
    Phi,
    Rho0,
    RhoPlus,
    RhoMinus,
    JPsi,
    Proton,
    AntiProton,
    Neutron,
    AntiNeutron,
    Lambda,
    AntiLambda,
    SigmaPlus,
    Sigma0,
    SigmaMinus,
    Xi0,
    XiMinus,
    OmegaMinus,
    Deuteron,
    Helium,
}

impl Particle {
    /// Every species in the catalogue.
    pub const ALL: [Particle; 35] = [
        Particle::Gamma,
        Particle::Positron,
        Particle::Electron,
        Particle::Neutrino,
        Particle::MuonPlus,
        Particle::MuonMinus,
        Particle::Pi0,
        Particle::PiPlus,
        Particle::PiMinus,
        Particle::KLong,
        Particle::KShort,
        Particle::KPlus,
        Particle::KMinus,
        Particle::Eta,
        Particle::Omega,
        Particle::EtaPrime,
        Particle::Phi,
        Particle::Rho0,
        Particle::RhoPlus,
        Particle::RhoMinus,
        Particle::JPsi,
        Particle::Proton,
        Particle::AntiProton,
        Particle::Neutron,
        Particle::AntiNeutron,
        Particle::Lambda,
        Particle::AntiLambda,
        Particle::SigmaPlus,
        Particle::Sigma0,
        Particle::SigmaMinus,
        Particle::Xi0,
        Particle::XiMinus,
        Particle::OmegaMinus,
        Particle::Deuteron,
        Particle::Helium,
    ];

    /// The electric charge in units of $`e`$.
    pub fn charge(&self) -> i32 {
        match self {
            Particle::Positron
            | Particle::MuonPlus
            | Particle::PiPlus
            | Particle::KPlus
            | Particle::RhoPlus
            | Particle::Proton
            | Particle::SigmaPlus
            | Particle::Deuteron => 1,
            Particle::Electron
            | Particle::MuonMinus
            | Particle::PiMinus
            | Particle::KMinus
            | Particle::RhoMinus
            | Particle::AntiProton
            | Particle::SigmaMinus
            | Particle::XiMinus
            | Particle::OmegaMinus => -1,
            Particle::Helium => 2,
            _ => 0,
        }
    }

    /// Is the particle electrically charged?
    pub fn is_charged(&self) -> bool {
        self.charge() != 0
    }

    /// The PDG Monte-Carlo particle number.
    pub fn pdg_id(&self) -> i32 {
        match self {
            Particle::Gamma => 22,
            Particle::Positron => -11,
            Particle::Electron => 11,
            Particle::Neutrino => 12,
            Particle::MuonPlus => -13,
            Particle::MuonMinus => 13,
            Particle::Pi0 => 111,
            Particle::PiPlus => 211,
            Particle::PiMinus => -211,
            Particle::KLong => 130,
            Particle::KShort => 310,
            Particle::KPlus => 321,
            Particle::KMinus => -321,
            Particle::Eta => 221,
            Particle::Omega => 223,
            Particle::EtaPrime => 331,
            Particle::Phi => 333,
            Particle::Rho0 => 113,
            Particle::RhoPlus => 213,
            Particle::RhoMinus => -213,
            Particle::JPsi => 443,
            Particle::Proton => 2212,
            Particle::AntiProton => -2212,
            Particle::Neutron => 2112,
            Particle::AntiNeutron => -2112,
            Particle::Lambda => 3122,
            Particle::AntiLambda => -3122,
            Particle::SigmaPlus => 3222,
            Particle::Sigma0 => 3212,
            Particle::SigmaMinus => 3112,
            Particle::Xi0 => 3322,
            Particle::XiMinus => 3312,
            Particle::OmegaMinus => 3334,
            Particle::Deuteron => 1000010020,
            Particle::Helium => 1000020040,
        }
    }

    /// The nominal mass in GeV.
    pub fn mass(&self) -> f64 {
        match self {
            Particle::Gamma | Particle::Neutrino => 0.0,
            Particle::Positron | Particle::Electron => 0.000510999,
            Particle::MuonPlus | Particle::MuonMinus => 0.105658,
            Particle::Pi0 => 0.134977,
            Particle::PiPlus | Particle::PiMinus => 0.139570,
            Particle::KLong | Particle::KShort => 0.497611,
            Particle::KPlus | Particle::KMinus => 0.493677,
            Particle::Eta => 0.547862,
            Particle::Omega => 0.78266,
            Particle::EtaPrime => 0.95778,
            Particle::Phi => 1.019461,
            Particle::Rho0 | Particle::RhoPlus | Particle::RhoMinus => 0.77526,
            Particle::JPsi => 3.096900,
            Particle::Proton | Particle::AntiProton => 0.938272,
            Particle::Neutron | Particle::AntiNeutron => 0.939565,
            Particle::Lambda | Particle::AntiLambda => 1.115683,
            Particle::SigmaPlus => 1.18937,
            Particle::Sigma0 => 1.192642,
            Particle::SigmaMinus => 1.197449,
            Particle::Xi0 => 1.31486,
            Particle::XiMinus => 1.32171,
            Particle::OmegaMinus => 1.67245,
            Particle::Deuteron => 1.875613,
            Particle::Helium => 3.727379,
        }
    }

    /// The name of the particle in ROOT's TLatex syntax.
    pub fn root_name(&self) -> &'static str {
        match self {
            Particle::Gamma => "#gamma",
            Particle::Positron => "e^{+}",
            Particle::Electron => "e^{-}",
            Particle::Neutrino => "#nu",
            Particle::MuonPlus => "#mu^{+}",
            Particle::MuonMinus => "#mu^{-}",
            Particle::Pi0 => "#pi^{0}",
            Particle::PiPlus => "#pi^{+}",
            Particle::PiMinus => "#pi^{-}",
            Particle::KLong => "K^{0}_{L}",
            Particle::KShort => "K^{0}_{S}",
            Particle::KPlus => "K^{+}",
            Particle::KMinus => "K^{-}",
            Particle::Eta => "#eta",
            Particle::Omega => "#omega",
            Particle::EtaPrime => "#eta'",
            Particle::Phi => "#phi",
            Particle::Rho0 => "#rho^{0}",
            Particle::RhoPlus => "#rho^{+}",
            Particle::RhoMinus => "#rho^{-}",
            Particle::JPsi => "J/#psi",
            Particle::Proton => "p",
            Particle::AntiProton => "#bar{p}",
            Particle::Neutron => "n",
            Particle::AntiNeutron => "#bar{n}",
            Particle::Lambda => "#Lambda",
            Particle::AntiLambda => "#bar{#Lambda}",
            Particle::SigmaPlus => "#Sigma^{+}",
            Particle::Sigma0 => "#Sigma^{0}",
            Particle::SigmaMinus => "#Sigma^{-}",
            Particle::Xi0 => "#Xi^{0}",
            Particle::XiMinus => "#Xi^{-}",
            Particle::OmegaMinus => "#Omega^{-}",
            Particle::Deuteron => "d",
            Particle::Helium => "He",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Particle::Gamma => "Gamma",
            Particle::Positron => "e+",
            Particle::Electron => "e-",
            Particle::Neutrino => "Neutrino",
            Particle::MuonPlus => "Mu+",
            Particle::MuonMinus => "Mu-",
            Particle::Pi0 => "Pi0",
            Particle::PiPlus => "Pi+",
            Particle::PiMinus => "Pi-",
            Particle::KLong => "KLong",
            Particle::KShort => "KShort",
            Particle::KPlus => "K+",
            Particle::KMinus => "K-",
            Particle::Eta => "Eta",
            Particle::Omega => "Omega",
            Particle::EtaPrime => "EtaPrime",
            Particle::Phi => "Phi",
            Particle::Rho0 => "Rho0",
            Particle::RhoPlus => "Rho+",
            Particle::RhoMinus => "Rho-",
            Particle::JPsi => "JPsi",
            Particle::Proton => "Proton",
            Particle::AntiProton => "AntiProton",
            Particle::Neutron => "Neutron",
            Particle::AntiNeutron => "AntiNeutron",
            Particle::Lambda => "Lambda",
            Particle::AntiLambda => "AntiLambda",
            Particle::SigmaPlus => "Sigma+",
            Particle::Sigma0 => "Sigma0",
            Particle::SigmaMinus => "Sigma-",
            Particle::Xi0 => "Xi0",
            Particle::XiMinus => "Xi-",
            Particle::OmegaMinus => "Omega-",
            Particle::Deuteron => "Deuteron",
            Particle::Helium => "Helium",
        }
    }
}

impl Display for Particle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Particle {
    type Err = TopofitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let alias = match lower.as_str() {
            "photon" | "g" | "γ" => Some(Particle::Gamma),
            "p" | "p+" => Some(Particle::Proton),
            "pbar" | "p-" => Some(Particle::AntiProton),
            "n" => Some(Particle::Neutron),
            "nbar" => Some(Particle::AntiNeutron),
            "pip" | "π+" => Some(Particle::PiPlus),
            "pim" | "π-" => Some(Particle::PiMinus),
            "π0" => Some(Particle::Pi0),
            "kl" | "k0l" | "k_l" => Some(Particle::KLong),
            "ks" | "k0s" | "k_s" => Some(Particle::KShort),
            "lambdabar" => Some(Particle::AntiLambda),
            "jpsi" | "j/psi" => Some(Particle::JPsi),
            _ => None,
        };
        alias
            .or_else(|| {
                Particle::ALL
                    .into_iter()
                    .find(|particle| particle.name().to_lowercase() == lower)
            })
            .ok_or(TopofitError::ParseError {
                name: s.to_string(),
                object: "Particle".to_string(),
            })
    }
}
