use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use futures_util::future::{join_all, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::timeout;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        };
        f.write_str(label)
    }
}

/// What a single check reports back.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckOutcome {
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CheckOutcome {
    pub fn pass() -> Self {
        CheckOutcome {
            status: CheckStatus::Pass,
            message: None,
            data: None,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        CheckOutcome {
            status: CheckStatus::Warn,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        CheckOutcome {
            status: CheckStatus::Fail,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub response_time_ms: u64,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: Vec<CheckResult>,
    pub total_time_ms: u64,
}

impl HealthReport {
    pub fn check(&self, name: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|check| check.name == name)
    }
}

type CheckFn = Box<dyn Fn() -> BoxFuture<'static, CheckOutcome> + Send + Sync>;

struct NamedCheck {
    name: String,
    run: CheckFn,
}

/// Runs named async checks concurrently, each bounded by the same timeout.
pub struct HealthMonitor {
    checks: Vec<NamedCheck>,
    check_timeout: Duration,
}

impl fmt::Debug for HealthMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.checks.iter().map(|c| c.name.as_str()).collect();
        f.debug_struct("HealthMonitor")
            .field("checks", &names)
            .field("check_timeout", &self.check_timeout)
            .finish()
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        HealthMonitor::new(Duration::from_secs(5))
    }
}

impl HealthMonitor {
    pub fn new(check_timeout: Duration) -> Self {
        HealthMonitor {
            checks: Vec::new(),
            check_timeout,
        }
    }

    /// Registers a check. A name registered twice replaces the earlier check.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CheckOutcome> + Send + 'static,
    {
        let name = name.into();
        let run: CheckFn = Box::new(move || check().boxed());
        match self.checks.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.run = run,
            None => self.checks.push(NamedCheck { name, run }),
        }
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.checks.len();
        self.checks.retain(|c| c.name != name);
        self.checks.len() != before
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub async fn run(&self) -> HealthReport {
        let started = Instant::now();
        let limit = self.check_timeout;
        let pending = self.checks.iter().map(|check| async move {
            let began = Instant::now();
            let outcome = match timeout(limit, (check.run)()).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(
                        check = %check.name,
                        timeout_ms = limit.as_millis() as u64,
                        "health.check_timed_out"
                    );
                    CheckOutcome::fail(format!("timed out after {}ms", limit.as_millis()))
                }
            };
            CheckResult {
                name: check.name.clone(),
                response_time_ms: began.elapsed().as_millis() as u64,
                outcome,
            }
        });
        let checks = join_all(pending).await;
        let status = aggregate(checks.iter().map(|c| c.outcome.status));
        debug!(status = %status, checks = checks.len(), "health.report");
        HealthReport {
            status,
            checks,
            total_time_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Any failure makes the whole unhealthy; otherwise any warning degrades it.
pub fn aggregate<I>(statuses: I) -> HealthStatus
where
    I: IntoIterator<Item = CheckStatus>,
{
    let mut overall = HealthStatus::Healthy;
    for status in statuses {
        match status {
            CheckStatus::Fail => return HealthStatus::Unhealthy,
            CheckStatus::Warn => overall = HealthStatus::Degraded,
            CheckStatus::Pass => {}
        }
    }
    overall
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aggregate_prefers_worst_status() {
        assert_eq!(aggregate(Vec::new()), HealthStatus::Healthy);
        assert_eq!(
            aggregate([CheckStatus::Pass, CheckStatus::Warn]),
            HealthStatus::Degraded
        );
        assert_eq!(
            aggregate([CheckStatus::Warn, CheckStatus::Fail, CheckStatus::Pass]),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn empty_monitor_is_healthy() {
        let report = HealthMonitor::default().run().await;
        assert_eq!(report.status, HealthStatus::Healthy);
        assert!(report.checks.is_empty());
    }

    #[tokio::test]
    async fn runs_every_check_and_keeps_order() {
        let mut monitor = HealthMonitor::new(Duration::from_secs(1));
        monitor.register("alpha", || async { CheckOutcome::pass() });
        monitor.register("beta", || async {
            CheckOutcome::warn("low").with_data(json!({ "apps": 1 }))
        });
        let report = monitor.run().await;
        assert_eq!(report.status, HealthStatus::Degraded);
        let names: Vec<&str> = report.checks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        let beta = report.check("beta").unwrap();
        assert_eq!(beta.outcome.message.as_deref(), Some("low"));
        assert_eq!(beta.outcome.data, Some(json!({ "apps": 1 })));
    }

    #[tokio::test]
    async fn slow_check_fails_on_timeout() {
        let mut monitor = HealthMonitor::new(Duration::from_millis(20));
        monitor.register("slow", || async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            CheckOutcome::pass()
        });
        monitor.register("fast", || async { CheckOutcome::pass() });
        let report = monitor.run().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        let slow = report.check("slow").unwrap();
        assert_eq!(slow.outcome.status, CheckStatus::Fail);
        assert!(slow.outcome.message.as_deref().unwrap().contains("timed out"));
    }

    #[test]
    fn re_registering_replaces_check() {
        let mut monitor = HealthMonitor::default();
        monitor.register("a", || async { CheckOutcome::pass() });
        monitor.register("a", || async { CheckOutcome::fail("x") });
        assert_eq!(monitor.len(), 1);
        assert!(monitor.unregister("a"));
        assert!(monitor.is_empty());
    }

    #[test]
    fn report_serializes_flat_checks() {
        let report = HealthReport {
            status: HealthStatus::Degraded,
            checks: vec![CheckResult {
                name: "bounds".into(),
                response_time_ms: 2,
                outcome: CheckOutcome::warn("near ceiling"),
            }],
            total_time_ms: 2,
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "degraded");
        assert_eq!(value["checks"][0]["status"], "warn");
        assert_eq!(value["checks"][0]["message"], "near ceiling");
        assert!(value["checks"][0].get("data").is_none());
    }
}
