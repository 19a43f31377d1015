use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::app::EmergenceApp;
use crate::types::{AppId, LinkKind, Stage, StepKind};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppSnapshot {
    pub id: AppId,
    pub app_type: String,
    pub consciousness_level: f32,
    pub vortex_strength: f32,
    pub toroidal_flow: bool,
    pub void_connected: bool,
    pub manifested: bool,
    pub stage: Stage,
    pub links: usize,
}

impl From<&EmergenceApp> for AppSnapshot {
    fn from(app: &EmergenceApp) -> Self {
        AppSnapshot {
            id: app.id.clone(),
            app_type: app.app_type.clone(),
            consciousness_level: app.consciousness_level,
            vortex_strength: app.vortex_strength,
            toroidal_flow: app.toroidal_flow,
            void_connected: app.void_connected,
            manifested: app.manifested,
            stage: app.evolution_stage.stage,
            links: app.linked_apps.len(),
        }
    }
}

/// Every orchestrator-level mutation. Broadcast on the network bus and kept
/// in the journal ring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "payload", rename_all = "camelCase")]
pub enum NetworkEvent {
    AppCreated(AppSnapshot),
    AppsLinked {
        first: AppId,
        second: AppId,
        link_type: LinkKind,
        resonance: f32,
    },
    AppsMergedWithEvolution {
        sources: [AppId; 2],
        merged: AppSnapshot,
        relinked: usize,
    },
    AppEvolvedComprehensive {
        app: AppSnapshot,
        consciousness_delta: f32,
        vortex_delta: f32,
    },
    AppEvolved {
        app: AppId,
        step: StepKind,
        consciousness_level: f32,
        vortex_strength: f32,
    },
    AppInfluenced {
        source: AppId,
        target: AppId,
        strength: f32,
    },
    AppManifested {
        app: AppId,
    },
    InfiniteStreamStarted {
        consciousness_filter: f32,
    },
}

impl NetworkEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NetworkEvent::AppCreated(_) => "appCreated",
            NetworkEvent::AppsLinked { .. } => "appsLinked",
            NetworkEvent::AppsMergedWithEvolution { .. } => "appsMergedWithEvolution",
            NetworkEvent::AppEvolvedComprehensive { .. } => "appEvolvedComprehensive",
            NetworkEvent::AppEvolved { .. } => "appEvolved",
            NetworkEvent::AppInfluenced { .. } => "appInfluenced",
            NetworkEvent::AppManifested { .. } => "appManifested",
            NetworkEvent::InfiniteStreamStarted { .. } => "infiniteStreamStarted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub seq: u64,
    pub at_ms: u64,
    pub event: NetworkEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventJournal {
    entries: VecDeque<JournalEntry>,
    #[serde(skip, default = "default_capacity")]
    capacity: usize,
    next_seq: u64,
}

fn default_capacity() -> usize {
    256
}

impl Default for EventJournal {
    fn default() -> Self {
        EventJournal::with_capacity(default_capacity())
    }
}

impl EventJournal {
    pub fn with_capacity(capacity: usize) -> Self {
        EventJournal {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            next_seq: 0,
        }
    }

    pub fn record(&mut self, at_ms: u64, event: NetworkEvent) -> u64 {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push_back(JournalEntry { seq, at_ms, event });
        seq
    }

    pub fn iter(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of events ever recorded, including evicted ones.
    pub fn total_recorded(&self) -> u64 {
        self.next_seq
    }

    pub fn last(&self, limit: usize) -> Vec<JournalEntry> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn count_of(&self, name: &str) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.event.name() == name)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_evicts_oldest_and_keeps_sequence() {
        let mut journal = EventJournal::with_capacity(2);
        for i in 0..3 {
            journal.record(
                i * 10,
                NetworkEvent::AppManifested {
                    app: format!("n{i}"),
                },
            );
        }
        assert_eq!(journal.len(), 2);
        assert_eq!(journal.total_recorded(), 3);
        let seqs: Vec<u64> = journal.iter().map(|entry| entry.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert_eq!(journal.last(1)[0].at_ms, 20);
        assert_eq!(journal.count_of("appManifested"), 2);
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = NetworkEvent::AppsLinked {
            first: "a".into(),
            second: "b".into(),
            link_type: LinkKind::Vortex,
            resonance: 0.7,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["kind"], "appsLinked");
        assert_eq!(value["payload"]["link_type"], "vortex");
        let back: NetworkEvent = serde_json::from_value(value).unwrap();
        assert_eq!(back, event);
    }
}
