//! Pure calculators mapping an app's attributes to derived scores.
//!
//! Nothing in here touches the network; the orchestrator calls these when it
//! refreshes an app's derived snapshots.

use std::f32::consts::{FRAC_PI_2, TAU};

use serde::{Deserialize, Serialize};

use crate::types::{Stage, StepKind, ATTRIBUTE_CEILING};

pub fn evolve_consciousness(level: f32) -> f32 {
    (level * 1.05).min(ATTRIBUTE_CEILING)
}

pub fn evolve_vortex(strength: f32) -> f32 {
    (strength * 1.02).min(ATTRIBUTE_CEILING)
}

/// Flags pass through unchanged.
pub fn evolve_toroidal(flow: bool) -> bool {
    flow
}

/// Flags pass through unchanged.
pub fn evolve_void(connected: bool) -> bool {
    connected
}

pub fn evolve_resonance(resonance: f32) -> f32 {
    (resonance * 1.03).min(1.0)
}

/// Fixed consciousness bump applied whenever a history entry of `step` is
/// appended, independent of how much the attributes actually moved.
pub fn consciousness_shift_for(step: &StepKind) -> f32 {
    match step {
        StepKind::ConsciousnessEvolution => 0.1,
        StepKind::VortexEvolution => 0.05,
        StepKind::ToroidalEvolution => 0.03,
        StepKind::VoidEvolution => 0.04,
        StepKind::EvolvedComprehensive => 0.08,
        StepKind::Influence => 0.03,
        StepKind::Manifestation => 0.15,
        StepKind::Custom(_) => 0.02,
    }
}

fn flag(value: bool) -> f32 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ResonanceProfile {
    pub frequency: f32,
    pub amplitude: f32,
    pub phase: f32,
    pub consciousness_resonance: f32,
    pub vortex_resonance: f32,
    pub toroidal_resonance: f32,
    pub void_resonance: f32,
}

impl ResonanceProfile {
    pub fn compute(consciousness: f32, vortex: f32, toroidal_flow: bool, void_connected: bool) -> Self {
        ResonanceProfile {
            frequency: consciousness / 10.0,
            amplitude: vortex / 10.0,
            phase: if toroidal_flow { FRAC_PI_2 } else { 0.0 },
            consciousness_resonance: consciousness / 10.0,
            vortex_resonance: vortex / 10.0,
            toroidal_resonance: flag(toroidal_flow),
            void_resonance: flag(void_connected),
        }
    }

    /// Unweighted mean of the four resonance factors.
    pub fn emergence_resonance(&self) -> f32 {
        (self.consciousness_resonance
            + self.vortex_resonance
            + self.toroidal_resonance
            + self.void_resonance)
            / 4.0
    }
}

/// Symmetric link score: the average of the pair's mean consciousness and
/// mean vortex, on the same 0..10 scale as the attributes.
pub fn link_resonance(
    first_consciousness: f32,
    first_vortex: f32,
    second_consciousness: f32,
    second_vortex: f32,
) -> f32 {
    let avg_consciousness = (first_consciousness + second_consciousness) / 2.0;
    let avg_vortex = (first_vortex + second_vortex) / 2.0;
    (avg_consciousness + avg_vortex) / 2.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EvolutionStage {
    pub stage: Stage,
    pub consciousness_threshold: f32,
    pub vortex_threshold: f32,
    pub next: Option<Stage>,
}

impl Default for EvolutionStage {
    fn default() -> Self {
        determine_evolution_stage(0.0, 0.0)
    }
}

struct StageRule {
    stage: Stage,
    threshold: f32,
    matches: fn(f32, f32) -> bool,
}

fn enlightened(consciousness: f32, vortex: f32) -> bool {
    consciousness >= 9.0 && vortex >= 9.0
}

fn advanced(consciousness: f32, vortex: f32) -> bool {
    consciousness >= 7.0 && vortex >= 7.0
}

fn intermediate(consciousness: f32, vortex: f32) -> bool {
    consciousness >= 5.0 && vortex >= 5.0
}

fn always(_consciousness: f32, _vortex: f32) -> bool {
    true
}

// Evaluated first-match; the last rule must always match.
static STAGE_RULES: [StageRule; 4] = [
    StageRule {
        stage: Stage::Enlightened,
        threshold: 9.0,
        matches: enlightened,
    },
    StageRule {
        stage: Stage::Advanced,
        threshold: 7.0,
        matches: advanced,
    },
    StageRule {
        stage: Stage::Intermediate,
        threshold: 5.0,
        matches: intermediate,
    },
    StageRule {
        stage: Stage::Emerging,
        threshold: 0.0,
        matches: always,
    },
];

pub fn determine_evolution_stage(consciousness: f32, vortex: f32) -> EvolutionStage {
    let rule = STAGE_RULES
        .iter()
        .find(|rule| (rule.matches)(consciousness, vortex))
        .unwrap_or(&STAGE_RULES[STAGE_RULES.len() - 1]);
    EvolutionStage {
        stage: rule.stage,
        consciousness_threshold: rule.threshold,
        vortex_threshold: rule.threshold,
        next: rule.stage.next(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VoidSignature {
    pub signature: String,
    pub depth: f32,
    pub intensity: f32,
}

pub fn calculate_void_signature(app_type: &str, consciousness: f32, vortex: f32) -> VoidSignature {
    VoidSignature {
        signature: format!(
            "void:{}:{:.2}:{:.2}",
            app_type.to_lowercase(),
            consciousness,
            vortex
        ),
        depth: (consciousness + vortex) / 20.0,
        intensity: (consciousness * vortex).max(0.0).sqrt() / 10.0,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct TorusCoordinates {
    pub theta: f32,
    pub phi: f32,
    pub major_radius: f32,
    pub minor_radius: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Places the app on a torus: consciousness drives the toroidal angle and
/// tube radius, vortex the poloidal angle and ring radius.
pub fn calculate_torus_coordinates(consciousness: f32, vortex: f32) -> TorusCoordinates {
    let theta = (consciousness / 10.0) * TAU;
    let phi = (vortex / 10.0) * TAU;
    let major_radius = 1.0 + vortex / 10.0;
    let minor_radius = 0.5 * consciousness / 10.0;
    let ring = major_radius + minor_radius * phi.cos();
    TorusCoordinates {
        theta,
        phi,
        major_radius,
        minor_radius,
        x: ring * theta.cos(),
        y: ring * theta.sin(),
        z: minor_radius * phi.sin(),
    }
}
