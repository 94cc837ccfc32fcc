use super::*;

/// Octopus Energy Japan Kraken GraphQL endpoint
pub const DEFAULT_API_URL: &str = "https://api.oejp-kraken.energy/v1/graphql/";

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            url: DEFAULT_API_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { yen_per_kwh: 30.0 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/oejp-meter.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            pricing: PricingConfig::default(),
            logging: LoggingConfig::default(),
            poll_interval_seconds: 900,
            state_file: "/data/oejp_cumulative.json".to_string(),
        }
    }
}
