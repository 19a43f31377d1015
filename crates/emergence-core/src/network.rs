use crate::analysis::{analyze_resonance, track_evolution, NetworkState};
use crate::app::EmergenceApp;
use crate::journal::EventJournal;

/// Authoritative ordered collection of live apps plus cached aggregates.
#[derive(Debug, Default)]
pub struct Network {
    pub(crate) apps: Vec<EmergenceApp>,
    pub(crate) state: NetworkState,
    pub(crate) journal: EventJournal,
}

impl Network {
    pub fn with_journal_capacity(capacity: usize) -> Self {
        Network {
            apps: Vec::new(),
            state: NetworkState::default(),
            journal: EventJournal::with_capacity(capacity),
        }
    }

    pub fn apps(&self) -> &[EmergenceApp] {
        &self.apps
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.apps.iter().position(|app| app.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&EmergenceApp> {
        self.apps.iter().find(|app| app.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut EmergenceApp> {
        self.apps.iter_mut().find(|app| app.id == id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.apps.iter().map(|app| app.id.clone()).collect()
    }

    pub fn state(&self) -> &NetworkState {
        &self.state
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    pub(crate) fn push(&mut self, app: EmergenceApp) {
        self.apps.push(app);
    }

    /// Removes the app and every link entry other apps hold towards it.
    pub(crate) fn detach(&mut self, id: &str) -> Option<EmergenceApp> {
        let idx = self.position(id)?;
        let removed = self.apps.remove(idx);
        for app in &mut self.apps {
            app.unlink(id);
        }
        Some(removed)
    }

    pub(crate) fn refresh_analysis(&mut self, now_ms: u64) {
        self.state.evolution_tracking = track_evolution(&self.apps, now_ms);
        self.state.resonance_analysis = analyze_resonance(&self.apps, now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AppOptions, LinkKind};

    fn node(id: &str) -> EmergenceApp {
        EmergenceApp::new(id.into(), "unknown", &AppOptions::default(), 0)
    }

    #[test]
    fn detach_drops_dangling_links() {
        let mut network = Network::with_journal_capacity(8);
        let mut a = node("a");
        let mut b = node("b");
        a.link_to("b", LinkKind::Resonance, 0.5, 0);
        b.link_to("a", LinkKind::Resonance, 0.5, 0);
        network.push(a);
        network.push(b);
        network.push(node("c"));
        let removed = network.detach("a").unwrap();
        assert_eq!(removed.id, "a");
        assert_eq!(network.ids(), vec!["b".to_string(), "c".to_string()]);
        assert!(network.get("b").unwrap().linked_apps.is_empty());
        assert!(network.detach("a").is_none());
    }

    #[test]
    fn refresh_overwrites_cached_state() {
        let mut network = Network::default();
        network.push(node("a"));
        network.refresh_analysis(3);
        assert_eq!(network.state().evolution_tracking.total_apps, 1);
        assert_eq!(network.state().resonance_analysis.updated_at_ms, 3);
        network.push(node("b"));
        network.refresh_analysis(4);
        assert_eq!(network.state().evolution_tracking.total_apps, 2);
    }
}
