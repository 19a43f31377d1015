use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::app::EmergenceApp;
use crate::error::{EmergenceError, Result};
use crate::resonance::VoidSignature;
use crate::types::AppId;

pub const HIGH_RESONANCE: &str = "high_resonance";
pub const MEDIUM_RESONANCE: &str = "medium_resonance";
pub const LOW_RESONANCE: &str = "low_resonance";
pub const ISOLATED: &str = "isolated";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct EvolutionTracking {
    pub total_apps: usize,
    pub average_consciousness: f32,
    pub average_vortex: f32,
    pub stage_distribution: BTreeMap<String, usize>,
    pub total_evolutions: usize,
    pub updated_at_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ResonanceAnalysis {
    pub link_ends: usize,
    pub total_resonance: f32,
    pub average_resonance: f32,
    pub average_emergence_resonance: f32,
    pub pattern_counts: BTreeMap<String, usize>,
    pub updated_at_ms: u64,
}

/// Cached aggregates, overwritten after every structural mutation.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct NetworkState {
    pub evolution_tracking: EvolutionTracking,
    pub resonance_analysis: ResonanceAnalysis,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSummary {
    pub total_apps: usize,
    pub average_consciousness: f32,
    pub average_vortex: f32,
    pub total_links: usize,
    pub manifested_apps: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VoidConnectionStats {
    pub count: usize,
    pub average_consciousness: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkReport {
    pub total_apps: usize,
    pub average_consciousness: f32,
    pub average_vortex: f32,
    pub total_links: usize,
    pub average_links: f32,
    pub total_resonance: f32,
    pub average_resonance: f32,
    pub manifested_apps: usize,
    pub void_connected_apps: usize,
    pub toroidal_apps: usize,
    pub stage_distribution: BTreeMap<String, usize>,
    pub resonance_patterns: BTreeMap<String, usize>,
    pub void_connections: VoidConnectionStats,
    pub generated_at_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoidConnection {
    pub app: AppId,
    pub app_type: String,
    pub consciousness_level: f32,
    pub signature: VoidSignature,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VoidConnectionReport {
    pub connections: Vec<VoidConnection>,
    pub stats: VoidConnectionStats,
}

fn mean(sum: f32, count: usize) -> f32 {
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

fn attribute_means(apps: &[EmergenceApp]) -> (f32, f32) {
    let consciousness: f32 = apps.iter().map(|app| app.consciousness_level).sum();
    let vortex: f32 = apps.iter().map(|app| app.vortex_strength).sum();
    (mean(consciousness, apps.len()), mean(vortex, apps.len()))
}

fn stage_distribution(apps: &[EmergenceApp]) -> BTreeMap<String, usize> {
    let mut distribution = BTreeMap::new();
    for app in apps {
        *distribution
            .entry(app.evolution_stage.stage.as_str().to_string())
            .or_insert(0) += 1;
    }
    distribution
}

/// Per-app buckets keyed on its link resonances. An app whose links span
/// several ranges counts once in each of them.
pub fn resonance_patterns(apps: &[EmergenceApp]) -> BTreeMap<String, usize> {
    let mut patterns: BTreeMap<String, usize> = BTreeMap::new();
    for app in apps {
        if app.linked_apps.is_empty() {
            *patterns.entry(ISOLATED.to_string()).or_insert(0) += 1;
            continue;
        }
        let resonances = || app.linked_apps.iter().map(|link| link.resonance);
        if resonances().any(|r| r > 0.8) {
            *patterns.entry(HIGH_RESONANCE.to_string()).or_insert(0) += 1;
        }
        if resonances().any(|r| r > 0.5 && r <= 0.8) {
            *patterns.entry(MEDIUM_RESONANCE.to_string()).or_insert(0) += 1;
        }
        if resonances().any(|r| r <= 0.5) {
            *patterns.entry(LOW_RESONANCE.to_string()).or_insert(0) += 1;
        }
    }
    patterns
}

pub fn track_evolution(apps: &[EmergenceApp], now_ms: u64) -> EvolutionTracking {
    let (average_consciousness, average_vortex) = attribute_means(apps);
    EvolutionTracking {
        total_apps: apps.len(),
        average_consciousness,
        average_vortex,
        stage_distribution: stage_distribution(apps),
        total_evolutions: apps.iter().map(|app| app.evolution_history.len()).sum(),
        updated_at_ms: now_ms,
    }
}

pub fn analyze_resonance(apps: &[EmergenceApp], now_ms: u64) -> ResonanceAnalysis {
    let link_ends: usize = apps.iter().map(|app| app.linked_apps.len()).sum();
    let total_resonance: f32 = apps
        .iter()
        .flat_map(|app| app.linked_apps.iter())
        .map(|link| link.resonance)
        .sum();
    let emergence: f32 = apps.iter().map(EmergenceApp::emergence_resonance).sum();
    ResonanceAnalysis {
        link_ends,
        total_resonance,
        average_resonance: mean(total_resonance, link_ends),
        average_emergence_resonance: mean(emergence, apps.len()),
        pattern_counts: resonance_patterns(apps),
        updated_at_ms: now_ms,
    }
}

pub fn summarize(apps: &[EmergenceApp]) -> Result<NetworkSummary> {
    if apps.is_empty() {
        return Err(EmergenceError::EmptyNetwork);
    }
    let (average_consciousness, average_vortex) = attribute_means(apps);
    Ok(NetworkSummary {
        total_apps: apps.len(),
        average_consciousness,
        average_vortex,
        total_links: apps.iter().map(|app| app.linked_apps.len()).sum(),
        manifested_apps: apps.iter().filter(|app| app.manifested).count(),
    })
}

pub fn void_connections(apps: &[EmergenceApp]) -> VoidConnectionReport {
    let connections: Vec<VoidConnection> = apps
        .iter()
        .filter(|app| app.void_connected)
        .map(|app| VoidConnection {
            app: app.id.clone(),
            app_type: app.app_type.clone(),
            consciousness_level: app.consciousness_level,
            signature: app.void_signature.clone(),
        })
        .collect();
    let total: f32 = connections.iter().map(|c| c.consciousness_level).sum();
    let stats = VoidConnectionStats {
        count: connections.len(),
        average_consciousness: mean(total, connections.len()),
    };
    VoidConnectionReport { connections, stats }
}

pub fn analyze_comprehensive(apps: &[EmergenceApp], now_ms: u64) -> Result<NetworkReport> {
    if apps.is_empty() {
        return Err(EmergenceError::EmptyNetwork);
    }
    let (average_consciousness, average_vortex) = attribute_means(apps);
    let resonance = analyze_resonance(apps, now_ms);
    Ok(NetworkReport {
        total_apps: apps.len(),
        average_consciousness,
        average_vortex,
        total_links: resonance.link_ends,
        average_links: mean(resonance.link_ends as f32, apps.len()),
        total_resonance: resonance.total_resonance,
        average_resonance: resonance.average_resonance,
        manifested_apps: apps.iter().filter(|app| app.manifested).count(),
        void_connected_apps: apps.iter().filter(|app| app.void_connected).count(),
        toroidal_apps: apps.iter().filter(|app| app.toroidal_flow).count(),
        stage_distribution: stage_distribution(apps),
        resonance_patterns: resonance.pattern_counts,
        void_connections: void_connections(apps).stats,
        generated_at_ms: now_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppOptions, LinkKind};

    fn node(id: &str, app_type: &str) -> EmergenceApp {
        EmergenceApp::new(id.into(), app_type, &AppOptions::default(), 0)
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(summarize(&[]), Err(EmergenceError::EmptyNetwork)));
        assert!(matches!(
            analyze_comprehensive(&[], 0),
            Err(EmergenceError::EmptyNetwork)
        ));
        assert_eq!(track_evolution(&[], 5).total_apps, 0);
        assert_eq!(void_connections(&[]).stats.count, 0);
    }

    #[test]
    fn patterns_can_overlap_per_app() {
        let mut hub = node("hub", "unknown");
        hub.link_to("x", LinkKind::Resonance, 0.9, 0);
        hub.link_to("y", LinkKind::Resonance, 0.3, 0);
        let mut leaf = node("leaf", "unknown");
        leaf.link_to("hub", LinkKind::Resonance, 0.6, 0);
        let lonely = node("lonely", "unknown");
        let patterns = resonance_patterns(&[hub, leaf, lonely]);
        assert_eq!(patterns.get(HIGH_RESONANCE), Some(&1));
        assert_eq!(patterns.get(LOW_RESONANCE), Some(&1));
        assert_eq!(patterns.get(MEDIUM_RESONANCE), Some(&1));
        assert_eq!(patterns.get(ISOLATED), Some(&1));
    }

    #[test]
    fn comprehensive_report_aggregates_every_app() {
        let mut void = node("v", "void_connected");
        let mut plain = node("p", "unknown_type");
        void.link_to("p", LinkKind::Resonance, 0.7, 0);
        plain.link_to("v", LinkKind::Resonance, 0.7, 0);
        plain.manifested = true;
        let report = analyze_comprehensive(&[void, plain], 99).unwrap();
        assert_eq!(report.total_apps, 2);
        assert!((report.average_consciousness - 7.0).abs() < 1e-5);
        assert_eq!(report.total_links, 2);
        assert!((report.average_links - 1.0).abs() < 1e-6);
        assert!((report.total_resonance - 1.4).abs() < 1e-5);
        assert!((report.average_resonance - 0.7).abs() < 1e-5);
        assert_eq!(report.manifested_apps, 1);
        assert_eq!(report.void_connected_apps, 1);
        assert_eq!(report.stage_distribution.get("enlightened"), Some(&1));
        assert_eq!(report.stage_distribution.get("intermediate"), Some(&1));
        assert_eq!(report.void_connections.count, 1);
        assert!((report.void_connections.average_consciousness - 9.0).abs() < 1e-6);
        assert_eq!(report.generated_at_ms, 99);
    }
}
