use serde::Serialize;
use serde_json::Value;

use crate::events::{AppListeners, AppSignal, EmitReport, ListenerResult};
use crate::resonance::{
    calculate_torus_coordinates, calculate_void_signature, consciousness_shift_for,
    determine_evolution_stage, EvolutionStage, ResonanceProfile, TorusCoordinates, VoidSignature,
};
use crate::types::{AppId, AppOptions, LinkKind, StepKind, ATTRIBUTE_CEILING};

/// App types with a dedicated default profile.
pub const KNOWN_APP_TYPES: [&str; 6] = [
    "unified",
    "void_connected",
    "toroidal",
    "vortex",
    "consciousness",
    "quantum",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeProfile {
    pub consciousness_level: f32,
    pub vortex_strength: f32,
    pub toroidal_flow: bool,
    pub void_connected: bool,
}

impl TypeProfile {
    /// Defaults keyed on the lower-cased app type; unknown types get 5.0/5.0.
    pub fn for_type(app_type: &str) -> Self {
        let (consciousness_level, vortex_strength, toroidal_flow, void_connected) =
            match app_type.to_lowercase().as_str() {
                "unified" => (8.0, 8.0, true, true),
                "void_connected" => (9.0, 9.0, false, true),
                "toroidal" => (7.0, 8.0, true, false),
                "vortex" => (6.0, 9.5, true, false),
                "consciousness" => (9.5, 6.0, false, false),
                "quantum" => (8.5, 7.5, true, false),
                _ => (5.0, 5.0, false, false),
            };
        TypeProfile {
            consciousness_level,
            vortex_strength,
            toroidal_flow,
            void_connected,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AppLink {
    pub app: AppId,
    pub link_type: LinkKind,
    pub created_at: u64,
    pub resonance: f32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvolutionRecord {
    pub step_type: StepKind,
    pub data: Value,
    pub timestamp: u64,
    pub consciousness_shift: f32,
}

#[derive(Debug, Serialize)]
pub struct EmergenceApp {
    pub id: AppId,
    #[serde(rename = "type")]
    pub app_type: String,
    pub consciousness_level: f32,
    pub vortex_strength: f32,
    pub toroidal_flow: bool,
    pub void_connected: bool,
    pub created_at: u64,
    pub manifested_at: Option<u64>,
    pub manifested: bool,
    pub linked_apps: Vec<AppLink>,
    #[serde(skip)]
    pub listeners: AppListeners,
    pub evolution_history: Vec<EvolutionRecord>,
    pub resonance_profile: ResonanceProfile,
    pub evolution_stage: EvolutionStage,
    pub void_signature: VoidSignature,
    pub torus_coordinates: TorusCoordinates,
}

impl EmergenceApp {
    pub fn new(id: AppId, app_type: &str, options: &AppOptions, now_ms: u64) -> Self {
        let defaults = TypeProfile::for_type(app_type);
        let mut app = EmergenceApp {
            id,
            app_type: app_type.to_string(),
            consciousness_level: options
                .consciousness_level
                .unwrap_or(defaults.consciousness_level),
            vortex_strength: options.vortex_strength.unwrap_or(defaults.vortex_strength),
            toroidal_flow: options.toroidal_flow.unwrap_or(defaults.toroidal_flow),
            void_connected: options.void_connected.unwrap_or(defaults.void_connected),
            created_at: now_ms,
            manifested_at: None,
            manifested: false,
            linked_apps: Vec::new(),
            listeners: AppListeners::default(),
            evolution_history: Vec::new(),
            resonance_profile: ResonanceProfile::default(),
            evolution_stage: EvolutionStage::default(),
            void_signature: VoidSignature::default(),
            torus_coordinates: TorusCoordinates::default(),
        };
        app.refresh_derived();
        app
    }

    /// Recomputes every derived snapshot from the current attributes.
    pub fn refresh_derived(&mut self) {
        self.refresh_evolution_snapshots();
        self.void_signature =
            calculate_void_signature(&self.app_type, self.consciousness_level, self.vortex_strength);
    }

    /// Stage, resonance profile and torus placement, leaving the void
    /// signature as it was.
    pub fn refresh_evolution_snapshots(&mut self) {
        self.evolution_stage =
            determine_evolution_stage(self.consciousness_level, self.vortex_strength);
        self.resonance_profile = ResonanceProfile::compute(
            self.consciousness_level,
            self.vortex_strength,
            self.toroidal_flow,
            self.void_connected,
        );
        self.torus_coordinates =
            calculate_torus_coordinates(self.consciousness_level, self.vortex_strength);
    }

    pub fn emergence_resonance(&self) -> f32 {
        ResonanceProfile::compute(
            self.consciousness_level,
            self.vortex_strength,
            self.toroidal_flow,
            self.void_connected,
        )
        .emergence_resonance()
    }

    pub fn is_linked_to(&self, other: &str) -> bool {
        self.linked_apps.iter().any(|link| link.app == other)
    }

    pub fn link_to(&mut self, other: &str, link_type: LinkKind, resonance: f32, now_ms: u64) {
        self.linked_apps.push(AppLink {
            app: other.to_string(),
            link_type,
            created_at: now_ms,
            resonance,
        });
    }

    pub fn unlink(&mut self, other: &str) -> usize {
        let before = self.linked_apps.len();
        self.linked_apps.retain(|link| link.app != other);
        before - self.linked_apps.len()
    }

    /// Boost applied to this side of a fresh link; the peer gets its own.
    pub fn apply_link_enhancement(&mut self, link_type: &LinkKind) {
        match link_type {
            LinkKind::Resonance => {
                self.consciousness_level = (self.consciousness_level * 1.02).min(ATTRIBUTE_CEILING);
            }
            LinkKind::Vortex => {
                self.vortex_strength = (self.vortex_strength * 1.03).min(ATTRIBUTE_CEILING);
            }
            LinkKind::Toroidal => {
                self.toroidal_flow = true;
            }
            LinkKind::Void => {
                self.void_connected = true;
            }
            LinkKind::Consciousness => {
                self.consciousness_level = (self.consciousness_level * 1.03).min(ATTRIBUTE_CEILING);
            }
            LinkKind::Custom(_) => {}
        }
    }

    /// Appends a history entry and bumps consciousness by the step's fixed
    /// shift. The combined value is clamped to the ceiling after the bump.
    pub fn record_evolution(&mut self, step_type: StepKind, data: Value, now_ms: u64) -> f32 {
        let shift = consciousness_shift_for(&step_type);
        self.evolution_history.push(EvolutionRecord {
            step_type,
            data,
            timestamp: now_ms,
            consciousness_shift: shift,
        });
        self.consciousness_level = (self.consciousness_level + shift).clamp(0.0, ATTRIBUTE_CEILING);
        shift
    }

    pub fn on_event<F>(&mut self, event: impl Into<String>, listener: F)
    where
        F: Fn(&AppSignal) -> ListenerResult + Send + Sync + 'static,
    {
        self.listeners.on(event, listener);
    }

    pub fn emit_event(&self, event: &str, payload: Value, now_ms: u64) -> EmitReport {
        let signal = AppSignal {
            app_id: self.id.clone(),
            event: event.to_string(),
            payload,
            at_ms: now_ms,
        };
        self.listeners.emit(&signal)
    }
}
