pub mod cache;
pub mod error;
pub mod health;
pub mod timer;

pub use cache::{Cache, CacheConfig, CacheStats, Clock, ManualClock, SystemClock};
pub use error::CacheError;
pub use health::{
    aggregate, CheckOutcome, CheckResult, CheckStatus, HealthMonitor, HealthReport, HealthStatus,
};
pub use timer::Timer;
