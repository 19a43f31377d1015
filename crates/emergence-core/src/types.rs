use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type AppId = String;

/// Upper bound every mutator clamps consciousness and vortex strength to.
pub const ATTRIBUTE_CEILING: f32 = 10.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "String", from = "String")]
pub enum LinkKind {
    #[default]
    Resonance,
    Vortex,
    Toroidal,
    Void,
    Consciousness,
    Custom(String),
}

impl LinkKind {
    pub fn as_str(&self) -> &str {
        match self {
            LinkKind::Resonance => "resonance",
            LinkKind::Vortex => "vortex",
            LinkKind::Toroidal => "toroidal",
            LinkKind::Void => "void",
            LinkKind::Consciousness => "consciousness",
            LinkKind::Custom(name) => name,
        }
    }
}

impl From<&str> for LinkKind {
    fn from(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "resonance" => LinkKind::Resonance,
            "vortex" => LinkKind::Vortex,
            "toroidal" => LinkKind::Toroidal,
            "void" => LinkKind::Void,
            "consciousness" => LinkKind::Consciousness,
            _ => LinkKind::Custom(value.to_string()),
        }
    }
}

impl From<String> for LinkKind {
    fn from(value: String) -> Self {
        LinkKind::from(value.as_str())
    }
}

impl From<LinkKind> for String {
    fn from(kind: LinkKind) -> Self {
        kind.as_str().to_string()
    }
}

impl FromStr for LinkKind {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(LinkKind::from(value))
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tag of an evolution-history entry. Each tag carries a fixed consciousness
/// shift, see [`crate::resonance::consciousness_shift_for`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "String", from = "String")]
pub enum StepKind {
    ConsciousnessEvolution,
    VortexEvolution,
    ToroidalEvolution,
    VoidEvolution,
    EvolvedComprehensive,
    Influence,
    Manifestation,
    Custom(String),
}

impl StepKind {
    pub fn as_str(&self) -> &str {
        match self {
            StepKind::ConsciousnessEvolution => "consciousness_evolution",
            StepKind::VortexEvolution => "vortex_evolution",
            StepKind::ToroidalEvolution => "toroidal_evolution",
            StepKind::VoidEvolution => "void_evolution",
            StepKind::EvolvedComprehensive => "evolved_comprehensive",
            StepKind::Influence => "influence",
            StepKind::Manifestation => "manifestation",
            StepKind::Custom(name) => name,
        }
    }
}

impl From<&str> for StepKind {
    fn from(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "consciousness_evolution" => StepKind::ConsciousnessEvolution,
            "vortex_evolution" => StepKind::VortexEvolution,
            "toroidal_evolution" => StepKind::ToroidalEvolution,
            "void_evolution" => StepKind::VoidEvolution,
            "evolved_comprehensive" => StepKind::EvolvedComprehensive,
            "influence" => StepKind::Influence,
            "manifestation" => StepKind::Manifestation,
            _ => StepKind::Custom(value.to_string()),
        }
    }
}

impl From<String> for StepKind {
    fn from(value: String) -> Self {
        StepKind::from(value.as_str())
    }
}

impl From<StepKind> for String {
    fn from(kind: StepKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Emerging,
    Intermediate,
    Advanced,
    Enlightened,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Emerging => "emerging",
            Stage::Intermediate => "intermediate",
            Stage::Advanced => "advanced",
            Stage::Enlightened => "enlightened",
        }
    }

    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Emerging => Some(Stage::Intermediate),
            Stage::Intermediate => Some(Stage::Advanced),
            Stage::Advanced => Some(Stage::Enlightened),
            Stage::Enlightened => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Partial overrides applied on top of the per-type defaults in `create_app`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consciousness_level: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vortex_strength: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toroidal_flow: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub void_connected: Option<bool>,
}

impl AppOptions {
    pub fn consciousness(mut self, level: f32) -> Self {
        self.consciousness_level = Some(level);
        self
    }

    pub fn vortex(mut self, strength: f32) -> Self {
        self.vortex_strength = Some(strength);
        self
    }

    pub fn toroidal(mut self, flow: bool) -> Self {
        self.toroidal_flow = Some(flow);
        self
    }

    pub fn void(mut self, connected: bool) -> Self {
        self.void_connected = Some(connected);
        self
    }
}
