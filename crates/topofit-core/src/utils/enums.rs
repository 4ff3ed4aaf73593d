use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::TopofitError;

/// A filter on the electric charge of a particle.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Charge {
    /// Only positively charged particles.
    Positive,
    /// Only negatively charged particles.
    Negative,
    /// Only neutral particles.
    Neutral,
    /// Any charged particle, regardless of sign.
    Charged,
    /// No filtering on charge.
    #[default]
    All,
}
impl Charge {
    /// Check if a particle with the given charge (in units of $`e`$) passes this filter.
    pub fn matches(&self, charge: i32) -> bool {
        match self {
            Charge::Positive => charge > 0,
            Charge::Negative => charge < 0,
            Charge::Neutral => charge == 0,
            Charge::Charged => charge != 0,
            Charge::All => true,
        }
    }
}
impl Display for Charge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Charge::Positive => write!(f, "+"),
            Charge::Negative => write!(f, "-"),
            Charge::Neutral => write!(f, "0"),
            Charge::Charged => write!(f, "+/-"),
            Charge::All => write!(f, "all"),
        }
    }
}
impl FromStr for Charge {
    type Err = TopofitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "+" | "plus" | "pos" | "positive" => Ok(Self::Positive),
            "-" | "minus" | "neg" | "negative" => Ok(Self::Negative),
            "0" | "neutral" => Ok(Self::Neutral),
            "+/-" | "+-" | "charged" => Ok(Self::Charged),
            "all" | "any" => Ok(Self::All),
            _ => Err(TopofitError::ParseError {
                name: s.to_string(),
                object: "Charge".to_string(),
            }),
        }
    }
}

/// A filter on whether a particle belongs to the initial or final state of its step.
///
/// The beam (or decaying parent), the target, and a second beam are initial-state particles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionState {
    /// Only initial-state particles.
    Initial,
    /// Only final-state particles.
    Final,
    /// Both initial- and final-state particles.
    #[default]
    Either,
}
impl Display for ReactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReactionState::Initial => write!(f, "Initial"),
            ReactionState::Final => write!(f, "Final"),
            ReactionState::Either => write!(f, "Either"),
        }
    }
}

/// The kind of kinematic fit requested for a [`Reaction`](crate::Reaction).
///
/// Every mode which includes four-momentum conservation also includes invariant-mass constraints
/// on decaying particles.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KinFitType {
    /// No kinematic fit.
    #[default]
    NoFit,
    /// Four-momentum conservation.
    P4,
    /// Common-vertex constraints.
    Vertex,
    /// Common-vertex and common-time constraints.
    Spacetime,
    /// Four-momentum conservation and common-vertex constraints.
    P4AndVertex,
    /// Four-momentum conservation and common-vertex and common-time constraints.
    P4AndSpacetime,
}
impl KinFitType {
    /// Does the fit constrain vertex times?
    pub fn includes_time(&self) -> bool {
        matches!(self, KinFitType::Spacetime | KinFitType::P4AndSpacetime)
    }
}
impl Display for KinFitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KinFitType::NoFit => write!(f, "No Fit"),
            KinFitType::P4 => write!(f, "P4"),
            KinFitType::Vertex => write!(f, "Vertex"),
            KinFitType::Spacetime => write!(f, "Spacetime"),
            KinFitType::P4AndVertex => write!(f, "P4 & Vertex"),
            KinFitType::P4AndSpacetime => write!(f, "P4 & Spacetime"),
        }
    }
}
impl FromStr for KinFitType {
    type Err = TopofitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace([' ', '_', '-'], "").as_str() {
            "nofit" | "none" => Ok(Self::NoFit),
            "p4" => Ok(Self::P4),
            "vertex" | "vert" => Ok(Self::Vertex),
            "spacetime" => Ok(Self::Spacetime),
            "p4vertex" | "p4&vertex" | "p4andvertex" => Ok(Self::P4AndVertex),
            "p4spacetime" | "p4&spacetime" | "p4andspacetime" => Ok(Self::P4AndSpacetime),
            _ => Err(TopofitError::ParseError {
                name: s.to_string(),
                object: "KinFitType".to_string(),
            }),
        }
    }
}
