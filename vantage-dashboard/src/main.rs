//! Vantage dashboard entry point.
//!
//! Usage: `vantage-dashboard --config <path> [--once] [--search <query>]`

use serde_json::json;
use vantage_dashboard::config::DashboardConfig;
use vantage_dashboard::error::DashboardError;
use vantage_dashboard::telemetry;
use vantage_dashboard::{Dashboard, DashboardState, RefreshOutcome};

const SEARCH_LIMIT: usize = 10;

#[tokio::main]
async fn main() -> Result<(), DashboardError> {
    let config = DashboardConfig::load()?;
    telemetry::init_tracing(&config.logging)?;
    let args = CliArgs::parse();

    let dashboard = Dashboard::from_config(&config)?;
    let subscription = dashboard.subscribe(log_transition);

    if let Some(query) = args.search {
        let hits = dashboard.search(&query, SEARCH_LIMIT).await;
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }

    let outcome = dashboard.fetch().await;
    if args.once {
        subscription.unsubscribe();
        let state = dashboard.state();
        let system_metrics = match dashboard.system_metrics().await {
            Ok(read) => Some(read.value),
            Err(err) => {
                tracing::warn!(error = %err, "system metrics unavailable");
                None
            }
        };
        let report = json!({
            "status": dashboard.system_status(),
            "activeAlerts": dashboard.active_alerts_count(),
            "lastUpdated": state.last_updated,
            "error": state.error,
            "systemMetrics": system_metrics,
            "snapshot": state.snapshot.as_deref(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        if outcome == RefreshOutcome::Failed {
            std::process::exit(1);
        }
        return Ok(());
    }

    dashboard.set_auto_refresh(config.auto_refresh);
    tracing::info!(
        base_url = %config.api_base_url,
        auto_refresh = config.auto_refresh,
        interval_ms = config.refresh_interval_ms,
        "dashboard running, press Ctrl-C to exit"
    );
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    dashboard.set_auto_refresh(false);
    subscription.unsubscribe();
    Ok(())
}

#[derive(Debug, Default)]
struct CliArgs {
    once: bool,
    search: Option<String>,
}

impl CliArgs {
    fn parse() -> Self {
        let mut parsed = CliArgs::default();
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--once" => parsed.once = true,
                "--search" => parsed.search = args.next(),
                "--config" => {
                    args.next();
                }
                _ => {}
            }
        }
        parsed
    }
}

fn log_transition(state: &DashboardState) {
    if state.loading {
        tracing::debug!("refresh started");
        return;
    }
    match (&state.snapshot, &state.error) {
        (_, Some(error)) => tracing::warn!(%error, "refresh failed"),
        (Some(snapshot), None) => tracing::info!(
            agents = snapshot.agents.len(),
            alerts = snapshot.active_alerts_count(),
            health = ?snapshot.health.status,
            degraded = ?snapshot.degraded_sections,
            stale = ?snapshot.stale_sections,
            "dashboard updated"
        ),
        (None, None) => tracing::debug!("dashboard state changed"),
    }
}
