use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use emergence_core::{
    AdvancedEmergence, AppId, AppOptions, EmergenceConfig, EmergenceError, LinkKind,
    NetworkReport, ATTRIBUTE_CEILING, KNOWN_APP_TYPES,
};
use emergence_runtime::{
    Cache, CacheConfig, CheckOutcome, Clock, HealthMonitor, HealthReport, Timer,
};
use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const REPORT_KEY: &str = "network_report";
const MERGE_EVERY: u64 = 5;
/// Ticks a cached network report stays fresh.
const REPORT_TTL_TICKS: u64 = 4;

#[derive(Debug, Clone, PartialEq)]
struct CliArgs {
    config: Option<PathBuf>,
    ticks: u64,
    tick_ms: u64,
    filter: f32,
    seed: Option<u64>,
    json: bool,
}

impl Default for CliArgs {
    fn default() -> Self {
        CliArgs {
            config: None,
            ticks: 20,
            tick_ms: 100,
            filter: 0.0,
            seed: None,
            json: false,
        }
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs> {
    let mut parsed = CliArgs::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => parsed.json = true,
            "--config" => {
                let Some(path) = args.next() else {
                    return Err(anyhow!("--config requires a path"));
                };
                parsed.config = Some(PathBuf::from(path));
            }
            "--ticks" => {
                let Some(value) = args.next() else {
                    return Err(anyhow!("--ticks requires a number"));
                };
                parsed.ticks = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("--ticks expects a number, got {value}"))?;
            }
            "--tick-ms" => {
                let Some(value) = args.next() else {
                    return Err(anyhow!("--tick-ms requires milliseconds"));
                };
                parsed.tick_ms = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("--tick-ms expects milliseconds, got {value}"))?;
                if parsed.tick_ms == 0 {
                    return Err(anyhow!("--tick-ms must be greater than zero"));
                }
            }
            "--filter" => {
                let Some(value) = args.next() else {
                    return Err(anyhow!("--filter requires a consciousness level"));
                };
                parsed.filter = value
                    .parse::<f32>()
                    .map_err(|_| anyhow!("--filter expects a number, got {value}"))?;
                if !(0.0..=ATTRIBUTE_CEILING).contains(&parsed.filter) {
                    return Err(anyhow!("--filter must be within 0..{ATTRIBUTE_CEILING}"));
                }
            }
            "--seed" => {
                let Some(value) = args.next() else {
                    return Err(anyhow!("--seed requires a number"));
                };
                parsed.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| anyhow!("--seed expects a number, got {value}"))?,
                );
            }
            other => return Err(anyhow!("unknown argument: {other}")),
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    let args = parse_args(std::env::args().skip(1))?;
    let mut config = match &args.config {
        Some(path) => EmergenceConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EmergenceConfig::default(),
    };
    if args.seed.is_some() {
        config.rng_seed = args.seed;
    }

    let net = Arc::new(Mutex::new(seed_network(config, args.filter)));
    let cache: Cache<NetworkReport> = Cache::new(report_cache_config(args.tick_ms))?;

    run_ticks(net.clone(), &cache, &args).await?;

    let health = build_monitor(net.clone()).run().await;
    let stats = cache.stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = stats.hit_rate,
        "cache.stats"
    );

    let guard = net.lock().await;
    print_report(&guard, &health, args.json)
}

fn report_cache_config(tick_ms: u64) -> CacheConfig {
    CacheConfig {
        default_ttl_ms: tick_ms.saturating_mul(REPORT_TTL_TICKS),
        ..CacheConfig::default()
    }
}

fn seed_network(config: EmergenceConfig, filter: f32) -> AdvancedEmergence {
    let mut emergence = AdvancedEmergence::new(config);
    emergence.on_any(|event| {
        debug!(kind = event.name(), "network.event");
    });
    emergence.on("appsMergedWithEvolution", |event| {
        info!(kind = event.name(), "network.merge");
    });

    for app_type in KNOWN_APP_TYPES {
        let id = emergence.create_app(app_type, AppOptions::default());
        let listener_id = id.clone();
        let registered = emergence.on_app_event(&id, "tick", move |signal| {
            debug!(app = %listener_id, payload = %signal.payload, "app.tick");
            Ok(())
        });
        if let Err(err) = registered {
            warn!(app = %id, error = %err, "app.listener_not_registered");
        }
    }
    emergence.start_infinite_stream(filter);
    emergence
}

async fn run_ticks<C: Clock>(
    net: Arc<Mutex<AdvancedEmergence>>,
    cache: &Cache<NetworkReport, C>,
    args: &CliArgs,
) -> Result<()> {
    let mut previous: Option<AppId> = None;
    for tick in 1..=args.ticks {
        sleep(Duration::from_millis(args.tick_ms)).await;
        let timer = Timer::start(format!("tick {tick}"));
        let mut guard = net.lock().await;
        guard.advance(args.tick_ms);

        let Some(id) = guard.get_next_from_stream() else {
            return Err(anyhow!("stream stopped before tick {tick}"));
        };
        if let Some(prev) = previous.as_deref().filter(|prev| guard.network().contains(prev)) {
            guard.link_apps(prev, &id, LinkKind::Resonance)?;
        }
        let outcome = guard.evolve_app_comprehensive(&id)?;
        debug!(
            app = %outcome.app,
            stage = outcome.stage.as_str(),
            consciousness = outcome.consciousness_level,
            "tick.evolved"
        );

        if tick % MERGE_EVERY == 0 {
            merge_oldest(&mut guard);
        }
        for app in guard.network().ids() {
            guard.emit_app_event(&app, "tick", json!({ "tick": tick }))?;
        }

        let report =
            cache.try_get_or_set(REPORT_KEY, || guard.analyze_network_comprehensive(), None)?;
        info!(
            tick,
            apps = report.total_apps,
            avg_consciousness = report.average_consciousness,
            avg_resonance = report.average_resonance,
            "tick.report"
        );
        previous = Some(id);
        drop(guard);
        timer.finish();
    }
    Ok(())
}

fn merge_oldest(emergence: &mut AdvancedEmergence) {
    let ids = emergence.network().ids();
    let (Some(first), Some(second)) = (ids.first(), ids.get(1)) else {
        return;
    };
    match emergence.merge_apps_with_evolution(first, second) {
        Some(merged) => debug!(merged = %merged, "tick.merged"),
        None => warn!(first = %first, second = %second, "tick.merge_skipped"),
    }
}

fn build_monitor(net: Arc<Mutex<AdvancedEmergence>>) -> HealthMonitor {
    let mut monitor = HealthMonitor::new(Duration::from_secs(2));

    let populated = net.clone();
    monitor.register("network_populated", move || {
        let net = populated.clone();
        async move {
            let count = net.lock().await.len();
            if count == 0 {
                CheckOutcome::fail("network has no apps")
            } else {
                CheckOutcome::pass().with_data(json!({ "apps": count }))
            }
        }
    });

    let bounds = net.clone();
    monitor.register("attribute_bounds", move || {
        let net = bounds.clone();
        async move {
            let guard = net.lock().await;
            let out_of_range = guard
                .apps()
                .iter()
                .filter(|app| {
                    !(0.0..=ATTRIBUTE_CEILING).contains(&app.consciousness_level)
                        || !(0.0..=ATTRIBUTE_CEILING).contains(&app.vortex_strength)
                })
                .count();
            let saturated = guard
                .apps()
                .iter()
                .filter(|app| app.consciousness_level >= ATTRIBUTE_CEILING)
                .count();
            if out_of_range > 0 {
                CheckOutcome::fail(format!("{out_of_range} apps outside 0..{ATTRIBUTE_CEILING}"))
            } else if !guard.is_empty() && saturated == guard.len() {
                CheckOutcome::warn("every app is at the consciousness ceiling")
            } else {
                CheckOutcome::pass().with_data(json!({ "saturated": saturated }))
            }
        }
    });

    let stream = net;
    monitor.register("stream_active", move || {
        let net = stream.clone();
        async move {
            match net.lock().await.stream_cursor() {
                Some(cursor) => CheckOutcome::pass().with_data(json!({
                    "yielded": cursor.yielded(),
                    "consciousness_filter": cursor.consciousness_filter(),
                })),
                None => CheckOutcome::warn("no infinite stream started"),
            }
        }
    });
    monitor
}

fn print_report(emergence: &AdvancedEmergence, health: &HealthReport, as_json: bool) -> Result<()> {
    let analysis = emergence.analyze_network_comprehensive();
    if as_json {
        let report = match &analysis {
            Ok(report) => serde_json::to_value(report)?,
            Err(err) => json!({ "error": err.to_string() }),
        };
        let out = json!({
            "report": report,
            "health": health,
            "journal": emergence.journal().last(10),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("health: {}", health.status);
    for check in &health.checks {
        println!(
            "  {:<18} {:?} ({}ms)",
            check.name, check.outcome.status, check.response_time_ms
        );
    }
    match analysis {
        Ok(report) => {
            println!("apps: {}", report.total_apps);
            println!("avg consciousness: {:.3}", report.average_consciousness);
            println!("avg vortex: {:.3}", report.average_vortex);
            println!(
                "links: {} (avg resonance {:.3})",
                report.total_links, report.average_resonance
            );
            println!("manifested: {}", report.manifested_apps);
            println!("void connected: {}", report.void_connected_apps);
            for (stage, count) in &report.stage_distribution {
                println!("  stage {stage}: {count}");
            }
            for (pattern, count) in &report.resonance_patterns {
                println!("  pattern {pattern}: {count}");
            }
        }
        Err(EmergenceError::EmptyNetwork) => println!("network is empty"),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use emergence_runtime::ManualClock;

    fn args(raw: &[&str]) -> Result<CliArgs> {
        parse_args(raw.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_known_flags() {
        let parsed = args(&[
            "--ticks", "3", "--tick-ms", "5", "--filter", "7.5", "--seed", "9", "--json",
        ])
        .unwrap();
        assert_eq!(parsed.ticks, 3);
        assert_eq!(parsed.tick_ms, 5);
        assert_eq!(parsed.filter, 7.5);
        assert_eq!(parsed.seed, Some(9));
        assert!(parsed.json);
        assert_eq!(args(&[]).unwrap(), CliArgs::default());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(args(&["--ticks"]).is_err());
        assert!(args(&["--tick-ms", "0"]).is_err());
        assert!(args(&["--filter", "11"]).is_err());
        assert!(args(&["--bogus"]).is_err());
    }

    #[test]
    fn report_cache_outlives_a_tick() {
        let config = report_cache_config(100);
        assert_eq!(config.default_ttl_ms, 100 * REPORT_TTL_TICKS);
        assert!(config.default_ttl_ms > 100);
    }

    #[tokio::test]
    async fn report_cache_hits_within_window() {
        let net = Arc::new(Mutex::new(seed_network(EmergenceConfig::seeded(8), 1.0)));
        let clock = Arc::new(ManualClock::default());
        let cache = Cache::with_clock(report_cache_config(10), clock.clone()).unwrap();
        let cli = CliArgs {
            ticks: 1,
            tick_ms: 1,
            ..CliArgs::default()
        };
        for _ in 0..REPORT_TTL_TICKS {
            run_ticks(net.clone(), &cache, &cli).await.unwrap();
            clock.advance(Duration::from_millis(10));
        }
        run_ticks(net.clone(), &cache, &cli).await.unwrap();
        let stats = cache.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.hits, REPORT_TTL_TICKS - 1);
    }

    #[tokio::test]
    async fn short_run_stays_healthy() {
        let net = Arc::new(Mutex::new(seed_network(EmergenceConfig::seeded(4), 2.0)));
        let cache: Cache<NetworkReport> = Cache::new(CacheConfig::default()).unwrap();
        let cli = CliArgs {
            ticks: 6,
            tick_ms: 1,
            ..CliArgs::default()
        };
        run_ticks(net.clone(), &cache, &cli).await.unwrap();
        {
            let guard = net.lock().await;
            // six seeds plus six streamed, minus one per merge
            assert_eq!(guard.len(), KNOWN_APP_TYPES.len() + 6 - 1);
            assert_eq!(guard.journal().count_of("appsMergedWithEvolution"), 1);
        }
        let health = build_monitor(net).run().await;
        assert!(health.check("network_populated").is_some());
        assert_eq!(
            health.check("stream_active").unwrap().outcome.status,
            emergence_runtime::CheckStatus::Pass
        );
    }
}
