use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub portal: PortalConfig,
    pub scraper: ScraperConfig,
    pub screenshots: ScreenshotConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Advanced-search entry point.
    pub search_url: String,
    /// Origin used to qualify relative bid links.
    pub origin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_backoff_factor: f64,
    /// Wait for the search page's layout marker.
    pub page_load_timeout_secs: u64,
    /// Wait for facet controls to become interactive.
    pub filter_timeout_secs: u64,
    /// Wait for the first results (or error banner) after searching.
    pub results_timeout_secs: u64,
    /// Wait for result cards on an already-loaded page.
    pub cards_timeout_secs: u64,
    /// Wait for the next page's content after a pagination click.
    pub page_turn_timeout_secs: u64,
    /// Interval between element probes during bounded waits.
    pub poll_interval_ms: u64,
    /// Pause after selecting a facet value so the portal's JS can react.
    pub settle_delay_ms: u64,
    pub user_agent: String,
    pub chrome_path: Option<String>,
    pub headless: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    pub enabled: bool,
    pub dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            portal: PortalConfig {
                search_url: "https://bidplus.gem.gov.in/advance-search".to_string(),
                origin: "https://bidplus.gem.gov.in".to_string(),
            },
            scraper: ScraperConfig {
                retry_attempts: 3,
                retry_base_delay_ms: 5000,
                retry_backoff_factor: 2.0,
                page_load_timeout_secs: 35,
                filter_timeout_secs: 25,
                results_timeout_secs: 50,
                cards_timeout_secs: 20,
                page_turn_timeout_secs: 50,
                poll_interval_ms: 250,
                settle_delay_ms: 1000,
                user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36".to_string(),
                chrome_path: None,
                headless: true,
            },
            screenshots: ScreenshotConfig {
                enabled: true,
                dir: "data/screenshots".to_string(),
            },
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            // Start from built-in defaults so the binary runs without files
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("config/default").required(false))
            // Add environment-specific config
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables with prefix "GEMBID_"
            .add_source(Environment::with_prefix("GEMBID").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Add Chrome path from environment if not set
        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.portal.search_url).is_err() {
            return Err(ConfigError::Message("Invalid portal search URL".into()));
        }

        if Url::parse(&self.portal.origin).is_err() {
            return Err(ConfigError::Message("Invalid portal origin URL".into()));
        }

        if self.scraper.retry_attempts == 0 {
            return Err(ConfigError::Message(
                "Scraper retry_attempts must be at least 1".into(),
            ));
        }

        if self.scraper.retry_backoff_factor < 1.0 {
            return Err(ConfigError::Message(
                "Scraper retry_backoff_factor must be at least 1.0".into(),
            ));
        }

        if self.scraper.poll_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Scraper poll_interval_ms must be greater than 0".into(),
            ));
        }

        let timeouts = [
            self.scraper.page_load_timeout_secs,
            self.scraper.filter_timeout_secs,
            self.scraper.results_timeout_secs,
            self.scraper.cards_timeout_secs,
            self.scraper.page_turn_timeout_secs,
        ];
        if timeouts.iter().any(|&t| t == 0) {
            return Err(ConfigError::Message(
                "Scraper wait timeouts must be greater than 0".into(),
            ));
        }

        let shortest_timeout_ms = timeouts.iter().min().unwrap_or(&0) * 1000;
        if self.scraper.poll_interval_ms > shortest_timeout_ms {
            return Err(ConfigError::Message(
                "Scraper poll_interval_ms exceeds the shortest wait timeout".into(),
            ));
        }

        if self.screenshots.enabled && self.screenshots.dir.trim().is_empty() {
            return Err(ConfigError::Message(
                "Screenshot directory must be set when screenshots are enabled".into(),
            ));
        }

        Ok(())
    }
}

impl ScraperConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn filter_timeout(&self) -> Duration {
        Duration::from_secs(self.filter_timeout_secs)
    }

    pub fn results_timeout(&self) -> Duration {
        Duration::from_secs(self.results_timeout_secs)
    }

    pub fn cards_timeout(&self) -> Duration {
        Duration::from_secs(self.cards_timeout_secs)
    }

    pub fn page_turn_timeout(&self) -> Duration {
        Duration::from_secs(self.page_turn_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}
