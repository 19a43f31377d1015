use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::analysis::{
    analyze_comprehensive, summarize, void_connections, NetworkReport, NetworkState,
    NetworkSummary, VoidConnectionReport,
};
use crate::app::EmergenceApp;
use crate::config::EmergenceConfig;
use crate::error::{EmergenceError, Result};
use crate::events::{AppSignal, EmitReport, ListenerResult, NetworkBus};
use crate::journal::{AppSnapshot, EventJournal, NetworkEvent};
use crate::network::Network;
use crate::resonance::{
    evolve_consciousness, evolve_toroidal, evolve_vortex, evolve_void, link_resonance,
};
use crate::stream::StreamCursor;
use crate::types::{AppId, AppOptions, LinkKind, Stage, StepKind, ATTRIBUTE_CEILING};

pub const DEFAULT_APP_TYPE: &str = "unified";

/// Attribute movement produced by one evolve/influence call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvolutionOutcome {
    pub app: AppId,
    pub before_consciousness: f32,
    pub before_vortex: f32,
    pub consciousness_level: f32,
    pub vortex_strength: f32,
    pub stage: Stage,
}

impl EvolutionOutcome {
    fn capture(app: &EmergenceApp, before_consciousness: f32, before_vortex: f32) -> Self {
        EvolutionOutcome {
            app: app.id.clone(),
            before_consciousness,
            before_vortex,
            consciousness_level: app.consciousness_level,
            vortex_strength: app.vortex_strength,
            stage: app.evolution_stage.stage,
        }
    }
}

/// Orchestrates one network: every mutation goes through here, refreshes the
/// cached aggregates where required and publishes a [`NetworkEvent`].
#[derive(Debug)]
pub struct AdvancedEmergence {
    pub(crate) network: Network,
    bus: NetworkBus,
    pub(crate) stream: Option<StreamCursor>,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) config: EmergenceConfig,
    now_ms: u64,
}

impl Default for AdvancedEmergence {
    fn default() -> Self {
        AdvancedEmergence::new(EmergenceConfig::default())
    }
}

impl AdvancedEmergence {
    pub fn new(config: EmergenceConfig) -> Self {
        AdvancedEmergence {
            network: Network::with_journal_capacity(config.journal_capacity),
            bus: NetworkBus::default(),
            stream: None,
            rng: config.make_rng(),
            now_ms: config.start_ms,
            config,
        }
    }

    pub fn config(&self) -> &EmergenceConfig {
        &self.config
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn advance(&mut self, dt_ms: u64) -> u64 {
        self.now_ms = self.now_ms.saturating_add(dt_ms);
        self.now_ms
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn apps(&self) -> &[EmergenceApp] {
        self.network.apps()
    }

    pub fn app(&self, id: &str) -> Option<&EmergenceApp> {
        self.network.get(id)
    }

    pub fn len(&self) -> usize {
        self.network.len()
    }

    pub fn is_empty(&self) -> bool {
        self.network.is_empty()
    }

    pub fn network_state(&self) -> &NetworkState {
        self.network.state()
    }

    pub fn journal(&self) -> &EventJournal {
        self.network.journal()
    }

    pub fn bus_mut(&mut self) -> &mut NetworkBus {
        &mut self.bus
    }

    pub fn on<F>(&mut self, event: impl Into<String>, callback: F)
    where
        F: Fn(&NetworkEvent) + Send + Sync + 'static,
    {
        self.bus.on(event, callback);
    }

    pub fn on_any<F>(&mut self, callback: F)
    where
        F: Fn(&NetworkEvent) + Send + Sync + 'static,
    {
        self.bus.on_any(callback);
    }

    fn app_mut(&mut self, id: &str) -> Result<&mut EmergenceApp> {
        self.network
            .get_mut(id)
            .ok_or_else(|| EmergenceError::UnknownApp(id.to_string()))
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.network
            .position(id)
            .ok_or_else(|| EmergenceError::UnknownApp(id.to_string()))
    }

    pub(crate) fn publish(&mut self, event: NetworkEvent) {
        self.network.journal.record(self.now_ms, event.clone());
        self.bus.emit(&event);
    }

    pub(crate) fn next_app_id() -> AppId {
        Uuid::new_v4().to_string()
    }

    pub fn update_network_analysis(&mut self) {
        self.network.refresh_analysis(self.now_ms);
    }

    pub fn create_app(&mut self, app_type: &str, options: AppOptions) -> AppId {
        let id = Self::next_app_id();
        let app = EmergenceApp::new(id.clone(), app_type, &options, self.now_ms);
        let snapshot = AppSnapshot::from(&app);
        self.network.push(app);
        self.update_network_analysis();
        debug!(
            app = %id,
            app_type,
            stage = %snapshot.stage,
            "emergence.app_created"
        );
        self.publish(NetworkEvent::AppCreated(snapshot));
        id
    }

    pub fn create_default_app(&mut self) -> AppId {
        self.create_app(DEFAULT_APP_TYPE, AppOptions::default())
    }

    /// Links two apps symmetrically. Returns `Ok(false)` when they are already
    /// linked or when both ids name the same app.
    pub fn link_apps(&mut self, first: &str, second: &str, link_type: LinkKind) -> Result<bool> {
        let a = self.index_of(first)?;
        let b = self.index_of(second)?;
        if a == b || self.network.apps[a].is_linked_to(second) {
            return Ok(false);
        }
        let resonance = {
            let (left, right) = (&self.network.apps[a], &self.network.apps[b]);
            link_resonance(
                left.consciousness_level,
                left.vortex_strength,
                right.consciousness_level,
                right.vortex_strength,
            )
        };
        let now = self.now_ms;
        for (idx, peer) in [(a, second), (b, first)] {
            let app = &mut self.network.apps[idx];
            app.link_to(peer, link_type.clone(), resonance, now);
            app.apply_link_enhancement(&link_type);
        }
        self.update_network_analysis();
        debug!(first, second, %link_type, resonance, "emergence.apps_linked");
        self.publish(NetworkEvent::AppsLinked {
            first: first.to_string(),
            second: second.to_string(),
            link_type,
            resonance,
        });
        Ok(true)
    }

    /// Replaces two apps with their evolved average. Returns `None` when
    /// either id is not in the network.
    pub fn merge_apps_with_evolution(&mut self, first: &str, second: &str) -> Option<AppId> {
        let (Some(a), Some(b)) = (self.network.position(first), self.network.position(second))
        else {
            debug!(first, second, "emergence.merge_skipped");
            return None;
        };
        if a == b {
            return None;
        }

        let (merged_type, options, manifested, both_manifested_at, peers) = {
            let (left, right) = (&self.network.apps[a], &self.network.apps[b]);
            let options = AppOptions {
                consciousness_level: Some(evolve_consciousness(
                    (left.consciousness_level + right.consciousness_level) / 2.0,
                )),
                vortex_strength: Some(evolve_vortex(
                    (left.vortex_strength + right.vortex_strength) / 2.0,
                )),
                toroidal_flow: Some(evolve_toroidal(left.toroidal_flow && right.toroidal_flow)),
                void_connected: Some(evolve_void(left.void_connected && right.void_connected)),
            };
            let mut peers: Vec<(AppId, LinkKind)> = Vec::new();
            for link in left.linked_apps.iter().chain(right.linked_apps.iter()) {
                if link.app == first || link.app == second {
                    continue;
                }
                if peers.iter().any(|(peer, _)| *peer == link.app) {
                    continue;
                }
                peers.push((link.app.clone(), link.link_type.clone()));
            }
            (
                format!("merged_{}_{}", left.app_type, right.app_type),
                options,
                left.manifested && right.manifested,
                left.manifested_at.is_some() && right.manifested_at.is_some(),
                peers,
            )
        };

        let now = self.now_ms;
        let id = Self::next_app_id();
        let mut merged = EmergenceApp::new(id.clone(), &merged_type, &options, now);
        merged.manifested = manifested;
        if both_manifested_at {
            merged.manifested_at = Some(now);
        }

        self.network.detach(first);
        self.network.detach(second);

        let mut relinked = 0;
        for (peer_id, link_type) in peers {
            let Some(peer) = self.network.get_mut(&peer_id) else {
                continue;
            };
            let resonance = link_resonance(
                merged.consciousness_level,
                merged.vortex_strength,
                peer.consciousness_level,
                peer.vortex_strength,
            );
            peer.link_to(&id, link_type.clone(), resonance, now);
            merged.link_to(&peer_id, link_type, resonance, now);
            relinked += 1;
        }

        let snapshot = AppSnapshot::from(&merged);
        self.network.push(merged);
        self.update_network_analysis();
        info!(
            first,
            second,
            merged = %id,
            relinked,
            "emergence.apps_merged"
        );
        self.publish(NetworkEvent::AppsMergedWithEvolution {
            sources: [first.to_string(), second.to_string()],
            merged: snapshot,
            relinked,
        });
        Some(id)
    }

    pub fn evolve_app_comprehensive(&mut self, id: &str) -> Result<EvolutionOutcome> {
        let now = self.now_ms;
        let app = self.app_mut(id)?;
        let (before_c, before_v) = (app.consciousness_level, app.vortex_strength);
        app.consciousness_level = evolve_consciousness(before_c);
        app.vortex_strength = evolve_vortex(before_v);
        app.toroidal_flow = evolve_toroidal(app.toroidal_flow);
        app.void_connected = evolve_void(app.void_connected);
        app.refresh_evolution_snapshots();
        let data = json!({
            "before": {"consciousness": before_c, "vortex": before_v},
            "after": {"consciousness": app.consciousness_level, "vortex": app.vortex_strength},
            "consciousness_delta": app.consciousness_level - before_c,
            "vortex_delta": app.vortex_strength - before_v,
            "stage": app.evolution_stage.stage,
        });
        app.record_evolution(StepKind::EvolvedComprehensive, data, now);
        let outcome = EvolutionOutcome::capture(app, before_c, before_v);
        let snapshot = AppSnapshot::from(&*app);

        self.update_network_analysis();
        debug!(
            app = id,
            consciousness = outcome.consciousness_level,
            vortex = outcome.vortex_strength,
            "emergence.app_evolved_comprehensive"
        );
        self.publish(NetworkEvent::AppEvolvedComprehensive {
            app: snapshot,
            consciousness_delta: outcome.consciousness_level - before_c,
            vortex_delta: outcome.vortex_strength - before_v,
        });
        Ok(outcome)
    }

    /// Single-axis evolution; derived snapshots and network aggregates are
    /// left as they were.
    pub fn evolve_app(&mut self, id: &str, step: StepKind) -> Result<EvolutionOutcome> {
        let now = self.now_ms;
        let app = self.app_mut(id)?;
        let (before_c, before_v) = (app.consciousness_level, app.vortex_strength);
        match step {
            StepKind::ConsciousnessEvolution => {
                app.consciousness_level = evolve_consciousness(app.consciousness_level);
            }
            StepKind::VortexEvolution => {
                app.vortex_strength = evolve_vortex(app.vortex_strength);
            }
            StepKind::ToroidalEvolution => {
                app.toroidal_flow = evolve_toroidal(app.toroidal_flow);
            }
            StepKind::VoidEvolution => {
                app.void_connected = evolve_void(app.void_connected);
            }
            _ => {}
        }
        let data = json!({
            "before": {"consciousness": before_c, "vortex": before_v},
            "after": {"consciousness": app.consciousness_level, "vortex": app.vortex_strength},
        });
        app.record_evolution(step.clone(), data, now);
        let outcome = EvolutionOutcome::capture(app, before_c, before_v);

        debug!(app = id, %step, "emergence.app_evolved");
        self.publish(NetworkEvent::AppEvolved {
            app: id.to_string(),
            step,
            consciousness_level: outcome.consciousness_level,
            vortex_strength: outcome.vortex_strength,
        });
        Ok(outcome)
    }

    /// Pulls `target` toward `source` by a tenth of the gap, scaled by
    /// `strength` in 0..1.
    pub fn influence_app(
        &mut self,
        source: &str,
        target: &str,
        strength: f32,
    ) -> Result<EvolutionOutcome> {
        let strength = strength.clamp(0.0, 1.0);
        let (source_c, source_v) = {
            let src = self.index_of(source)?;
            let app = &self.network.apps[src];
            (app.consciousness_level, app.vortex_strength)
        };
        let now = self.now_ms;
        let app = self.app_mut(target)?;
        let (before_c, before_v) = (app.consciousness_level, app.vortex_strength);
        let pull = strength * 0.1;
        app.consciousness_level =
            (before_c + (source_c - before_c) * pull).clamp(0.0, ATTRIBUTE_CEILING);
        app.vortex_strength = (before_v + (source_v - before_v) * pull).clamp(0.0, ATTRIBUTE_CEILING);
        app.record_evolution(
            StepKind::Influence,
            json!({"source": source, "strength": strength}),
            now,
        );
        let outcome = EvolutionOutcome::capture(app, before_c, before_v);

        debug!(source, target, strength, "emergence.app_influenced");
        self.publish(NetworkEvent::AppInfluenced {
            source: source.to_string(),
            target: target.to_string(),
            strength,
        });
        Ok(outcome)
    }

    /// Flips `manifested` once. Returns `Ok(false)` if it already was.
    pub fn manifest_from_void(&mut self, id: &str) -> Result<bool> {
        let now = self.now_ms;
        let app = self.app_mut(id)?;
        if app.manifested {
            return Ok(false);
        }
        app.manifested = true;
        app.manifested_at = Some(now);
        app.void_connected = true;
        app.consciousness_level = (app.consciousness_level * 1.1).min(ATTRIBUTE_CEILING);
        app.vortex_strength = (app.vortex_strength * 1.1).min(ATTRIBUTE_CEILING);
        app.record_evolution(StepKind::Manifestation, json!({"manifested_at": now}), now);

        info!(app = id, "emergence.app_manifested");
        self.publish(NetworkEvent::AppManifested { app: id.to_string() });
        Ok(true)
    }

    pub fn analyze_network(&self) -> Result<NetworkSummary> {
        summarize(self.network.apps())
    }

    pub fn analyze_network_comprehensive(&self) -> Result<NetworkReport> {
        analyze_comprehensive(self.network.apps(), self.now_ms)
    }

    pub fn analyze_void_connections(&self) -> VoidConnectionReport {
        void_connections(self.network.apps())
    }

    pub fn on_app_event<F>(&mut self, id: &str, event: impl Into<String>, listener: F) -> Result<()>
    where
        F: Fn(&AppSignal) -> ListenerResult + Send + Sync + 'static,
    {
        self.app_mut(id)?.on_event(event, listener);
        Ok(())
    }

    pub fn emit_app_event(&self, id: &str, event: &str, payload: Value) -> Result<EmitReport> {
        let app = self
            .network
            .get(id)
            .ok_or_else(|| EmergenceError::UnknownApp(id.to_string()))?;
        Ok(app.emit_event(event, payload, self.now_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn emergence() -> AdvancedEmergence {
        AdvancedEmergence::new(EmergenceConfig::seeded(42))
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn create_app_appends_refreshes_and_emits() {
        let mut net = emergence();
        let created = Arc::new(Mutex::new(Vec::new()));
        let sink = created.clone();
        net.on("appCreated", move |event| {
            if let NetworkEvent::AppCreated(snapshot) = event {
                sink.lock().unwrap().push(snapshot.id.clone());
            }
        });
        let id = net.create_default_app();
        assert_eq!(net.len(), 1);
        assert_eq!(net.app(&id).unwrap().app_type, DEFAULT_APP_TYPE);
        assert_eq!(net.network_state().evolution_tracking.total_apps, 1);
        assert_eq!(*created.lock().unwrap(), vec![id]);
        assert_eq!(net.journal().count_of("appCreated"), 1);
    }

    #[test]
    fn linking_is_symmetric_and_idempotent() {
        let mut net = emergence();
        let a = net.create_app("toroidal", AppOptions::default());
        let b = net.create_app("quantum", AppOptions::default());
        assert!(net.link_apps(&a, &b, LinkKind::Resonance).unwrap());
        assert!(!net.link_apps(&a, &b, LinkKind::Resonance).unwrap());
        assert!(!net.link_apps(&b, &a, LinkKind::Vortex).unwrap());
        assert!(!net.link_apps(&a, &a, LinkKind::Resonance).unwrap());

        let left = net.app(&a).unwrap();
        let right = net.app(&b).unwrap();
        assert_eq!(left.linked_apps.len(), 1);
        assert_eq!(right.linked_apps.len(), 1);
        assert_eq!(left.linked_apps[0].app, b);
        assert_eq!(right.linked_apps[0].app, a);
        assert_eq!(left.linked_apps[0].resonance, right.linked_apps[0].resonance);
        assert_eq!(net.journal().count_of("appsLinked"), 1);
    }

    #[test]
    fn linking_unknown_app_is_an_error() {
        let mut net = emergence();
        let a = net.create_default_app();
        let err = net.link_apps(&a, "missing", LinkKind::Void).unwrap_err();
        assert!(matches!(err, EmergenceError::UnknownApp(id) if id == "missing"));
    }

    #[test]
    fn documented_scenario_holds() {
        let mut net = emergence();
        let a = net.create_app("void_connected", AppOptions::default());
        let b = net.create_app("unknown_type", AppOptions::default());
        assert_eq!(net.app(&a).unwrap().evolution_stage.stage, Stage::Enlightened);
        assert_eq!(net.app(&b).unwrap().evolution_stage.stage, Stage::Intermediate);

        let (a_vortex, b_vortex) = (
            net.app(&a).unwrap().vortex_strength,
            net.app(&b).unwrap().vortex_strength,
        );
        net.link_apps(&a, &b, LinkKind::from("vortex")).unwrap();
        assert!(approx(net.app(&a).unwrap().vortex_strength, a_vortex * 1.03));
        assert!(approx(net.app(&b).unwrap().vortex_strength, b_vortex * 1.03));

        let expected_flow =
            net.app(&a).unwrap().toroidal_flow && net.app(&b).unwrap().toroidal_flow;
        let merged = net.merge_apps_with_evolution(&a, &b).unwrap();
        assert_eq!(net.app(&merged).unwrap().toroidal_flow, expected_flow);
    }

    #[test]
    fn merge_replaces_sources_and_rewires_peers() {
        let mut net = emergence();
        let a = net.create_app("void_connected", AppOptions::default());
        let b = net.create_app("toroidal", AppOptions::default());
        let peer = net.create_app("quantum", AppOptions::default());
        net.link_apps(&a, &b, LinkKind::Resonance).unwrap();
        net.link_apps(&a, &peer, LinkKind::Void).unwrap();
        net.link_apps(&b, &peer, LinkKind::Toroidal).unwrap();
        let (ac, bc) = (
            net.app(&a).unwrap().consciousness_level,
            net.app(&b).unwrap().consciousness_level,
        );

        let merged = net.merge_apps_with_evolution(&a, &b).unwrap();
        let ids = net.network().ids();
        assert!(!ids.contains(&a));
        assert!(!ids.contains(&b));
        assert_eq!(ids, vec![peer.clone(), merged.clone()]);

        let node = net.app(&merged).unwrap();
        assert_eq!(node.app_type, "merged_void_connected_toroidal");
        assert!(approx(node.consciousness_level, ((ac + bc) / 2.0 * 1.05).min(10.0)));
        assert_eq!(node.linked_apps.len(), 1);
        assert_eq!(node.linked_apps[0].app, peer);
        assert_eq!(node.linked_apps[0].link_type, LinkKind::Void);

        let peer_node = net.app(&peer).unwrap();
        assert_eq!(peer_node.linked_apps.len(), 1);
        assert_eq!(peer_node.linked_apps[0].app, merged);
        assert_eq!(peer_node.linked_apps[0].resonance, node.linked_apps[0].resonance);
        assert_eq!(net.network_state().evolution_tracking.total_apps, 2);
    }

    #[test]
    fn merge_with_missing_app_returns_none() {
        let mut net = emergence();
        let a = net.create_default_app();
        assert!(net.merge_apps_with_evolution(&a, "ghost").is_none());
        assert!(net.merge_apps_with_evolution(&a, &a).is_none());
        assert_eq!(net.len(), 1);
    }

    #[test]
    fn merge_keeps_manifestation_only_when_both_manifested() {
        let mut net = emergence();
        let a = net.create_default_app();
        let b = net.create_default_app();
        let c = net.create_default_app();
        net.manifest_from_void(&a).unwrap();
        net.manifest_from_void(&b).unwrap();
        net.advance(50);
        let both = net.merge_apps_with_evolution(&a, &b).unwrap();
        let node = net.app(&both).unwrap();
        assert!(node.manifested);
        assert_eq!(node.manifested_at, Some(50));

        let mixed = net.merge_apps_with_evolution(&both, &c).unwrap();
        let node = net.app(&mixed).unwrap();
        assert!(!node.manifested);
        assert_eq!(node.manifested_at, None);
    }

    #[test]
    fn comprehensive_evolution_combines_growth_and_history_bump() {
        let mut net = emergence();
        let id = net.create_app("unknown", AppOptions::default());
        let outcome = net.evolve_app_comprehensive(&id).unwrap();
        assert!(approx(outcome.consciousness_level, 5.0 * 1.05 + 0.08));
        assert!(approx(outcome.vortex_strength, 5.0 * 1.02));
        let app = net.app(&id).unwrap();
        assert_eq!(app.evolution_history.len(), 1);
        assert_eq!(app.evolution_history[0].step_type, StepKind::EvolvedComprehensive);
        assert_eq!(net.network_state().evolution_tracking.total_evolutions, 1);
    }

    #[test]
    fn repeated_comprehensive_evolution_never_exceeds_ceiling() {
        let mut net = emergence();
        let id = net.create_app("void_connected", AppOptions::default());
        for _ in 0..100 {
            let outcome = net.evolve_app_comprehensive(&id).unwrap();
            assert!(outcome.consciousness_level <= ATTRIBUTE_CEILING);
            assert!(outcome.vortex_strength <= ATTRIBUTE_CEILING);
        }
        let app = net.app(&id).unwrap();
        assert_eq!(app.consciousness_level, ATTRIBUTE_CEILING);
        assert_eq!(app.vortex_strength, ATTRIBUTE_CEILING);
        assert_eq!(app.evolution_stage.stage, Stage::Enlightened);
    }

    #[test]
    fn simple_evolution_skips_network_refresh() {
        let mut net = emergence();
        let id = net.create_app("unknown", AppOptions::default());
        let cached = net.network_state().clone();
        let outcome = net.evolve_app(&id, StepKind::VortexEvolution).unwrap();
        assert!(approx(outcome.vortex_strength, 5.1));
        assert!(approx(outcome.consciousness_level, 5.05));
        assert_eq!(net.network_state(), &cached);
        assert_eq!(net.app(&id).unwrap().evolution_stage.stage, Stage::Intermediate);
        assert_eq!(net.journal().count_of("appEvolved"), 1);
    }

    #[test]
    fn influence_pulls_target_toward_source() {
        let mut net = emergence();
        let source = net.create_app("void_connected", AppOptions::default());
        let target = net.create_app("unknown", AppOptions::default());
        let outcome = net.influence_app(&source, &target, 1.0).unwrap();
        assert!(approx(outcome.vortex_strength, 5.4));
        assert!(approx(outcome.consciousness_level, 5.4 + 0.03));
        assert_eq!(net.app(&source).unwrap().consciousness_level, 9.0);
        assert!(net.influence_app("nobody", &target, 0.5).is_err());
    }

    #[test]
    fn manifestation_is_one_way() {
        let mut net = emergence();
        let id = net.create_app("unknown", AppOptions::default());
        net.advance(10);
        assert!(net.manifest_from_void(&id).unwrap());
        net.advance(10);
        assert!(!net.manifest_from_void(&id).unwrap());
        let app = net.app(&id).unwrap();
        assert!(app.manifested);
        assert!(app.void_connected);
        assert_eq!(app.manifested_at, Some(10));
        assert!(approx(app.vortex_strength, 5.5));
        assert_eq!(net.analyze_void_connections().stats.count, 1);
    }

    #[test]
    fn empty_network_queries_return_errors() {
        let net = emergence();
        assert!(matches!(net.analyze_network(), Err(EmergenceError::EmptyNetwork)));
        assert!(matches!(
            net.analyze_network_comprehensive(),
            Err(EmergenceError::EmptyNetwork)
        ));
    }

    #[test]
    fn app_events_are_scoped_per_app() {
        let mut net = emergence();
        let a = net.create_default_app();
        let b = net.create_default_app();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        net.on_app_event(&a, "pulse", move |signal| {
            sink.lock().unwrap().push(signal.payload.clone());
            Ok(())
        })
        .unwrap();
        net.on_app_event(&a, "pulse", |_| Err("listener broke".into()))
            .unwrap();
        let report = net.emit_app_event(&a, "pulse", json!({"n": 1})).unwrap();
        assert_eq!(report, EmitReport { delivered: 1, failed: 1 });
        let other = net.emit_app_event(&b, "pulse", json!({"n": 2})).unwrap();
        assert_eq!(other.delivered, 0);
        assert_eq!(*seen.lock().unwrap(), vec![json!({"n": 1})]);
        assert!(net.emit_app_event("missing", "pulse", Value::Null).is_err());
    }
}
