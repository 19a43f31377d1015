use rand::Rng;
use tracing::debug;

use crate::app::EmergenceApp;
use crate::emergence::AdvancedEmergence;
use crate::journal::{AppSnapshot, NetworkEvent};
use crate::types::{AppId, AppOptions, ATTRIBUTE_CEILING};

pub const STREAM_APP_TYPE: &str = "infinite_stream";

/// Position of one unbounded stream: its filter and how many apps it has
/// produced so far.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamCursor {
    consciousness_filter: f32,
    yielded: u64,
}

impl StreamCursor {
    /// NaN becomes 0 and infinities snap to the nearest attribute bound;
    /// finite filters are kept as given.
    pub fn new(consciousness_filter: f32) -> Self {
        let consciousness_filter = if consciousness_filter.is_nan() {
            0.0
        } else if consciousness_filter.is_infinite() {
            consciousness_filter.clamp(0.0, ATTRIBUTE_CEILING)
        } else {
            consciousness_filter
        };
        StreamCursor {
            consciousness_filter,
            yielded: 0,
        }
    }

    /// Inclusive range streamed consciousness is drawn from: `filter..=filter + 5`
    /// cut at the ceiling, never below the filter itself or below zero.
    pub fn consciousness_range(&self) -> (f32, f32) {
        let low = self.consciousness_filter.max(0.0);
        let high = (self.consciousness_filter + 5.0)
            .max(low)
            .min(ATTRIBUTE_CEILING.max(low));
        (low, high)
    }

    pub fn consciousness_filter(&self) -> f32 {
        self.consciousness_filter
    }

    pub fn yielded(&self) -> u64 {
        self.yielded
    }
}

/// Lazily creates a new app on every `next()`. Never returns `None`.
pub struct InfiniteApps<'a> {
    emergence: &'a mut AdvancedEmergence,
    cursor: StreamCursor,
}

impl InfiniteApps<'_> {
    pub fn cursor(&self) -> &StreamCursor {
        &self.cursor
    }
}

impl Iterator for InfiniteApps<'_> {
    type Item = AppId;

    fn next(&mut self) -> Option<AppId> {
        Some(self.emergence.spawn_streamed(&mut self.cursor))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

impl AdvancedEmergence {
    /// A fresh stream borrowing the orchestrator; every call starts over.
    pub fn stream_infinite_apps(&mut self, consciousness_filter: f32) -> InfiniteApps<'_> {
        InfiniteApps {
            emergence: self,
            cursor: StreamCursor::new(consciousness_filter),
        }
    }

    /// Stores a stream on the orchestrator, discarding any previous one.
    pub fn start_infinite_stream(&mut self, consciousness_filter: f32) {
        let cursor = StreamCursor::new(consciousness_filter);
        let consciousness_filter = cursor.consciousness_filter();
        if self.stream.replace(cursor).is_some() {
            debug!("emergence.stream_replaced");
        }
        self.publish(NetworkEvent::InfiniteStreamStarted {
            consciousness_filter,
        });
    }

    /// Pulls one app from the stored stream, `None` if none was started.
    pub fn get_next_from_stream(&mut self) -> Option<AppId> {
        let mut cursor = self.stream.take()?;
        let id = self.spawn_streamed(&mut cursor);
        self.stream = Some(cursor);
        Some(id)
    }

    pub fn stream_cursor(&self) -> Option<&StreamCursor> {
        self.stream.as_ref()
    }

    pub(crate) fn spawn_streamed(&mut self, cursor: &mut StreamCursor) -> AppId {
        let (low, high) = cursor.consciousness_range();
        let consciousness: f32 = self.rng.gen_range(low..=high);
        let vortex: f32 = self.rng.gen_range(0.0..=ATTRIBUTE_CEILING);
        let options = AppOptions::default()
            .consciousness(consciousness)
            .vortex(vortex);

        let id = Self::next_app_id();
        let app = EmergenceApp::new(id.clone(), STREAM_APP_TYPE, &options, self.now_ms());
        let snapshot = AppSnapshot::from(&app);
        self.network.push(app);
        cursor.yielded += 1;
        if cursor.yielded % u64::from(self.config.stream_refresh_every.max(1)) == 0 {
            self.update_network_analysis();
        }
        self.publish(NetworkEvent::AppCreated(snapshot));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmergenceConfig;

    #[test]
    fn stream_yields_apps_above_filter() {
        let mut net = AdvancedEmergence::new(EmergenceConfig::seeded(3));
        let ids: Vec<AppId> = net.stream_infinite_apps(7.5).take(25).collect();
        assert_eq!(ids.len(), 25);
        assert_eq!(net.len(), 25);
        for id in &ids {
            let app = net.app(id).unwrap();
            assert_eq!(app.app_type, STREAM_APP_TYPE);
            assert!(app.consciousness_level >= 7.5);
            assert!(app.consciousness_level <= ATTRIBUTE_CEILING);
            assert!((0.0..=ATTRIBUTE_CEILING).contains(&app.vortex_strength));
        }
    }

    #[test]
    fn analysis_refreshes_every_tenth_app() {
        let mut net = AdvancedEmergence::new(EmergenceConfig::seeded(5));
        let _: Vec<AppId> = net.stream_infinite_apps(0.0).take(9).collect();
        assert_eq!(net.network_state().evolution_tracking.total_apps, 0);
        let _: Vec<AppId> = net.stream_infinite_apps(0.0).take(1).collect();
        assert_eq!(net.network_state().evolution_tracking.total_apps, 0);
        let mut stream = net.stream_infinite_apps(0.0);
        for _ in 0..10 {
            stream.next();
        }
        assert_eq!(stream.cursor().yielded(), 10);
        assert_eq!(net.network_state().evolution_tracking.total_apps, 20);
    }

    #[test]
    fn stored_stream_is_pull_based_and_replaceable() {
        let mut net = AdvancedEmergence::new(EmergenceConfig::seeded(9));
        assert!(net.get_next_from_stream().is_none());
        net.start_infinite_stream(4.0);
        net.get_next_from_stream().unwrap();
        net.get_next_from_stream().unwrap();
        assert_eq!(net.stream_cursor().unwrap().yielded(), 2);

        net.start_infinite_stream(12.0);
        let cursor = net.stream_cursor().unwrap();
        assert_eq!(cursor.yielded(), 0);
        assert_eq!(cursor.consciousness_filter(), 12.0);
        let id = net.get_next_from_stream().unwrap();
        assert!(net.app(&id).unwrap().consciousness_level >= 12.0);
        assert_eq!(net.journal().count_of("infiniteStreamStarted"), 2);
    }

    #[test]
    fn non_finite_filters_still_stream() {
        let mut net = AdvancedEmergence::new(EmergenceConfig::seeded(13));
        net.start_infinite_stream(f32::NAN);
        assert_eq!(net.stream_cursor().unwrap().consciousness_filter(), 0.0);
        let id = net.get_next_from_stream().unwrap();
        let level = net.app(&id).unwrap().consciousness_level;
        assert!((0.0..=5.0).contains(&level));

        net.start_infinite_stream(f32::INFINITY);
        assert_eq!(
            net.stream_cursor().unwrap().consciousness_filter(),
            ATTRIBUTE_CEILING
        );
        let id = net.get_next_from_stream().unwrap();
        assert_eq!(net.app(&id).unwrap().consciousness_level, ATTRIBUTE_CEILING);

        net.start_infinite_stream(f32::NEG_INFINITY);
        assert_eq!(net.stream_cursor().unwrap().consciousness_filter(), 0.0);
        assert!(net.get_next_from_stream().is_some());
    }

    #[test]
    fn filter_near_ceiling_spreads_uniformly() {
        let mut net = AdvancedEmergence::new(EmergenceConfig::seeded(21));
        let ids: Vec<AppId> = net.stream_infinite_apps(7.0).take(1000).collect();
        let levels: Vec<f32> = ids
            .iter()
            .map(|id| net.app(id).unwrap().consciousness_level)
            .collect();
        assert!(levels.iter().all(|c| (7.0..=ATTRIBUTE_CEILING).contains(c)));
        let at_ceiling = levels.iter().filter(|c| **c == ATTRIBUTE_CEILING).count();
        assert!(at_ceiling < 10, "{at_ceiling} samples pinned to the ceiling");
        let upper_half = levels.iter().filter(|c| **c > 8.5).count();
        assert!((400..600).contains(&upper_half));
    }

    #[test]
    fn negative_filter_draws_from_zero() {
        let cursor = StreamCursor::new(-10.0);
        assert_eq!(cursor.consciousness_filter(), -10.0);
        assert_eq!(cursor.consciousness_range(), (0.0, 0.0));
        assert_eq!(StreamCursor::new(3.0).consciousness_range(), (3.0, 8.0));
        assert_eq!(StreamCursor::new(12.0).consciousness_range(), (12.0, 12.0));
    }

    #[test]
    fn seeded_streams_are_reproducible() {
        let levels = |seed| {
            let mut net = AdvancedEmergence::new(EmergenceConfig::seeded(seed));
            let ids: Vec<AppId> = net.stream_infinite_apps(2.0).take(5).collect();
            ids.iter()
                .map(|id| net.app(id).unwrap().consciousness_level)
                .collect::<Vec<f32>>()
        };
        assert_eq!(levels(77), levels(77));
    }
}
