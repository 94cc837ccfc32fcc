use anyhow::Result;
use oejp_meter::config::Config;
use oejp_meter::coordinator::Coordinator;
use oejp_meter::logging::init_logging;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let mut config = match std::env::var("OEJP_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path, e))?,
        Err(_) => Config::load().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?,
    };
    config.apply_env_overrides();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    init_logging(&config.logging).map_err(|e| anyhow::anyhow!("Logging setup failed: {}", e))?;

    info!(
        "oejp-meter {} starting, endpoint={} interval={}s",
        env!("APP_VERSION"),
        config.api.endpoint(),
        config.poll_interval_seconds
    );

    let mut coordinator = Coordinator::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to create coordinator: {}", e))?;

    let mut ticker = tokio::time::interval(Duration::from_secs(config.poll_interval_seconds));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match coordinator.refresh().await {
                    Ok(snapshot) => {
                        info!(
                            "today={:.3} kWh yesterday={:.3} kWh mtd={:.3} kWh last_month={:.3} kWh",
                            snapshot.today_kwh,
                            snapshot.yesterday_kwh,
                            snapshot.month_to_date_kwh,
                            snapshot.last_month_kwh
                        );
                        if let Some(costs) = coordinator.costs() {
                            info!(
                                "today={:.2} JPY month_to_date={:.2} JPY",
                                costs.today_yen, costs.month_to_date_yen
                            );
                        }
                    }
                    Err(failure) if failure.reauth_required => {
                        warn!("Re-authentication required: {}", failure);
                    }
                    Err(failure) => {
                        error!("Refresh failed: {}", failure);
                    }
                }

                match coordinator.tick_accumulator() {
                    Ok(added) => info!(
                        "cumulative total={:.3} kWh (+{:.3})",
                        coordinator.accumulator().total(),
                        added
                    ),
                    Err(e) => error!("Failed to persist cumulative total: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    Ok(())
}
