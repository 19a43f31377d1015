pub mod analysis;
pub mod app;
pub mod config;
pub mod emergence;
pub mod error;
pub mod events;
pub mod journal;
pub mod network;
pub mod resonance;
pub mod stream;
pub mod types;

pub use analysis::{
    EvolutionTracking, NetworkReport, NetworkState, NetworkSummary, ResonanceAnalysis,
    VoidConnectionReport,
};
pub use app::{AppLink, EmergenceApp, EvolutionRecord, TypeProfile, KNOWN_APP_TYPES};
pub use config::EmergenceConfig;
pub use emergence::{AdvancedEmergence, EvolutionOutcome, DEFAULT_APP_TYPE};
pub use error::EmergenceError;
pub use events::{AppSignal, EmitReport, ListenerResult, NetworkBus};
pub use journal::{AppSnapshot, EventJournal, JournalEntry, NetworkEvent};
pub use network::Network;
pub use resonance::determine_evolution_stage;
pub use stream::{InfiniteApps, StreamCursor, STREAM_APP_TYPE};
pub use types::{AppId, AppOptions, LinkKind, Stage, StepKind, ATTRIBUTE_CEILING};
