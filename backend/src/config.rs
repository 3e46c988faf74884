use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use market::simulator::{DEFAULT_STEP_SCALE, MAX_STEP_SCALE};
use market::{HISTORY_CAPACITY, TickMode};
use reqwest::Url;
use scheduler::gate::{DEFAULT_COOLDOWN, DEFAULT_WARMUP};
use scheduler::{DEFAULT_INFERENCE_URL, GatePolicy};
use tokio::sync::watch;
use tracing::info;

use crate::error::ConfigError;

pub const DEFAULT_FEED_URL: &str =
    "https://studio.persianapi.com/index.php/web-service/list/melted-gold?format=json&limit=30&page=1";

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// Melted-gold reference price in Rials.
pub const INITIAL_PRICE: f64 = 487_810_000.0;

pub const DEFAULT_SEED_COUNT: usize = 30;
pub const DEFAULT_SEED_SPACING_MS: u64 = 3_000;

/// The runtime-mutable part of the configuration.
///
/// Fields are private: the only way to obtain a value is through a validating
/// constructor, and the simulation flag is derived from the URL rather than
/// stored, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    feed_url: String,
    poll_interval_ms: u64,
}

impl FeedConfig {
    /// An empty `feed_url` selects simulation mode.
    pub fn new(feed_url: impl Into<String>, poll_interval_ms: u64) -> Result<Self, ConfigError> {
        let feed_url = feed_url.into().trim().to_owned();
        if !feed_url.is_empty() {
            validate_http_url(&feed_url)?;
        }
        if poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }

        Ok(Self {
            feed_url,
            poll_interval_ms,
        })
    }

    pub fn simulation(poll_interval_ms: u64) -> Result<Self, ConfigError> {
        Self::new("", poll_interval_ms)
    }

    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn is_simulation(&self) -> bool {
        self.feed_url.is_empty()
    }

    pub fn tick_mode(&self) -> TickMode {
        if self.is_simulation() {
            TickMode::Simulation
        } else {
            TickMode::Live {
                url: self.feed_url.clone(),
            }
        }
    }

    pub fn with_feed_url(&self, feed_url: impl Into<String>) -> Result<Self, ConfigError> {
        Self::new(feed_url, self.poll_interval_ms)
    }

    pub fn with_poll_interval_ms(&self, poll_interval_ms: u64) -> Result<Self, ConfigError> {
        Self::new(self.feed_url.clone(), poll_interval_ms)
    }
}

fn validate_http_url(url: &str) -> Result<(), ConfigError> {
    let parsed = Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
        url: url.to_owned(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            url: url.to_owned(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

/// Single process-wide owner of the active [`FeedConfig`].
///
/// Updates replace the whole value; subscribers observe either the old or
/// the new value, never a mix.
#[derive(Clone)]
pub struct ConfigHandle {
    tx: Arc<watch::Sender<FeedConfig>>,
}

impl ConfigHandle {
    pub fn new(initial: FeedConfig) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> FeedConfig {
        self.tx.borrow().clone()
    }

    /// Installs `next`. Returns `false` (and notifies nobody) when it equals
    /// the active value.
    pub fn replace(&self, next: FeedConfig) -> bool {
        let changed = self.tx.send_if_modified(|cur| {
            if *cur == next {
                return false;
            }
            *cur = next.clone();
            true
        });

        if changed {
            info!(
                feed_url = %next.feed_url(),
                poll_interval_ms = next.poll_interval_ms(),
                simulation = next.is_simulation(),
                "feed configuration replaced"
            );
        }
        changed
    }

    /// Switches the feed; an empty URL switches to simulation.
    pub fn set_feed_url(&self, feed_url: impl Into<String>) -> Result<FeedConfig, ConfigError> {
        let next = self.current().with_feed_url(feed_url)?;
        self.replace(next.clone());
        Ok(next)
    }

    pub fn set_poll_interval_ms(&self, poll_interval_ms: u64) -> Result<FeedConfig, ConfigError> {
        let next = self.current().with_poll_interval_ms(poll_interval_ms)?;
        self.replace(next.clone());
        Ok(next)
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedConfig> {
        self.tx.subscribe()
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Initial feed configuration.
    ///
    /// `FEED_URL` unset selects the melted-gold endpoint; set to an empty
    /// string it selects simulation mode. `POLL_INTERVAL_MS` is the tick
    /// period.
    pub feed: FeedConfig,

    /// Endpoint of the structured-output reasoning service (`INFERENCE_URL`).
    ///
    /// Used verbatim; the desk adds no credentials.
    pub inference_url: String,

    /// Trigger policy for inference calls.
    ///
    /// - `warmup` (`SIGNAL_WARMUP`): history length required before the
    ///   first call; must be reachable, i.e. within the history capacity.
    /// - `cooldown` (`SIGNAL_COOLDOWN_MS`): quiet period after every settled
    ///   call, successful or not.
    pub gate: GatePolicy,

    /// Synthetic observations backfilled at startup (`SEED_COUNT`).
    ///
    /// Zero starts from a single observation at `initial_price` with an
    /// empty history.
    pub seed_count: usize,

    /// Spacing between backfilled observations (`SEED_SPACING_MS`).
    pub seed_spacing_ms: u64,

    /// Anchor price of the backfill walk (`INITIAL_PRICE`).
    pub initial_price: f64,

    /// Per-tick simulation step as a fraction of price (`SIM_STEP_SCALE`).
    pub sim_step_scale: f64,

    /// JSON log lines when `APP_ENV=production`.
    pub json_logs: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let feed_url = lookup("FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_owned());
        let poll_interval_ms = parse(&lookup, "POLL_INTERVAL_MS")?.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        let feed = FeedConfig::new(feed_url, poll_interval_ms)?;

        let inference_url = lookup("INFERENCE_URL")
            .map(|u| u.trim().to_owned())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_owned());
        validate_http_url(&inference_url)?;

        let warmup: usize = parse(&lookup, "SIGNAL_WARMUP")?.unwrap_or(DEFAULT_WARMUP);
        if warmup == 0 || warmup > HISTORY_CAPACITY {
            return Err(ConfigError::OutOfRange {
                var: "SIGNAL_WARMUP",
                reason: format!("must be within 1..={HISTORY_CAPACITY}, got {warmup}"),
            });
        }
        let cooldown = parse(&lookup, "SIGNAL_COOLDOWN_MS")?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_COOLDOWN);

        let seed_count = parse(&lookup, "SEED_COUNT")?.unwrap_or(DEFAULT_SEED_COUNT);
        let seed_spacing_ms = parse(&lookup, "SEED_SPACING_MS")?.unwrap_or(DEFAULT_SEED_SPACING_MS);
        if seed_count > 1 && seed_spacing_ms == 0 {
            return Err(ConfigError::OutOfRange {
                var: "SEED_SPACING_MS",
                reason: "must be positive when seeding more than one entry".into(),
            });
        }

        let initial_price: f64 = parse(&lookup, "INITIAL_PRICE")?.unwrap_or(INITIAL_PRICE);
        if !(initial_price.is_finite() && initial_price > 0.0) {
            return Err(ConfigError::OutOfRange {
                var: "INITIAL_PRICE",
                reason: format!("must be positive, got {initial_price}"),
            });
        }

        let sim_step_scale: f64 = parse(&lookup, "SIM_STEP_SCALE")?.unwrap_or(DEFAULT_STEP_SCALE);
        if !(sim_step_scale.is_finite() && sim_step_scale > 0.0 && sim_step_scale <= MAX_STEP_SCALE) {
            return Err(ConfigError::OutOfRange {
                var: "SIM_STEP_SCALE",
                reason: format!("must be within (0, {MAX_STEP_SCALE}], got {sim_step_scale}"),
            });
        }

        let json_logs = lookup("APP_ENV").is_some_and(|v| v == "production");

        Ok(Self {
            feed,
            inference_url,
            gate: GatePolicy { warmup, cooldown },
            seed_count,
            seed_spacing_ms,
            initial_price,
            sim_step_scale,
            json_logs,
        })
    }
}

fn parse<T, L>(lookup: &L, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    L: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Unparseable { var, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_are_live_melted_gold() {
        let cfg = load(&[]).unwrap();

        assert_eq!(cfg.feed.feed_url(), DEFAULT_FEED_URL);
        assert!(!cfg.feed.is_simulation());
        assert_eq!(cfg.feed.poll_interval_ms(), 5_000);
        assert_eq!(cfg.inference_url, DEFAULT_INFERENCE_URL);
        assert_eq!(cfg.gate, GatePolicy::default());
        assert_eq!(cfg.seed_count, 30);
        assert_eq!(cfg.seed_spacing_ms, 3_000);
        assert_eq!(cfg.initial_price, INITIAL_PRICE);
        assert!(!cfg.json_logs);
    }

    #[test]
    fn empty_feed_url_selects_simulation() {
        let cfg = load(&[("FEED_URL", "")]).unwrap();
        assert!(cfg.feed.is_simulation());
        assert_eq!(cfg.feed.tick_mode(), TickMode::Simulation);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = load(&[
            ("POLL_INTERVAL_MS", "1500"),
            ("SIGNAL_WARMUP", "12"),
            ("SIGNAL_COOLDOWN_MS", "2500"),
            ("SEED_COUNT", "0"),
            ("APP_ENV", "production"),
        ])
        .unwrap();

        assert_eq!(cfg.feed.poll_interval(), Duration::from_millis(1_500));
        assert_eq!(cfg.gate.warmup, 12);
        assert_eq!(cfg.gate.cooldown, Duration::from_millis(2_500));
        assert_eq!(cfg.seed_count, 0);
        assert!(cfg.json_logs);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            load(&[("POLL_INTERVAL_MS", "0")]).unwrap_err(),
            ConfigError::ZeroPollInterval
        );
        assert!(matches!(
            load(&[("POLL_INTERVAL_MS", "soon")]),
            Err(ConfigError::Unparseable { var: "POLL_INTERVAL_MS", .. })
        ));
        assert!(matches!(
            load(&[("FEED_URL", "ftp://example.com/gold")]),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            load(&[("FEED_URL", "not a url")]),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            load(&[("SIGNAL_WARMUP", "51")]),
            Err(ConfigError::OutOfRange { var: "SIGNAL_WARMUP", .. })
        ));
        assert!(matches!(
            load(&[("INITIAL_PRICE", "-1")]),
            Err(ConfigError::OutOfRange { var: "INITIAL_PRICE", .. })
        ));
        assert!(matches!(
            load(&[("SIM_STEP_SCALE", "2")]),
            Err(ConfigError::OutOfRange { var: "SIM_STEP_SCALE", .. })
        ));
    }

    #[test]
    fn feed_url_toggles_simulation_and_back() {
        let handle = ConfigHandle::new(FeedConfig::new(DEFAULT_FEED_URL, 5_000).unwrap());

        let sim = handle.set_feed_url("").unwrap();
        assert!(sim.is_simulation());
        assert!(handle.current().is_simulation());
        assert_eq!(handle.current().poll_interval_ms(), 5_000);

        let live = handle.set_feed_url("http://localhost:8080/gold").unwrap();
        assert!(!live.is_simulation());
        assert_eq!(handle.current().feed_url(), "http://localhost:8080/gold");
    }

    #[test]
    fn rejected_update_leaves_config_untouched() {
        let handle = ConfigHandle::new(FeedConfig::simulation(1_000).unwrap());

        assert_eq!(handle.set_poll_interval_ms(0), Err(ConfigError::ZeroPollInterval));
        assert!(handle.set_feed_url("gopher://x").is_err());
        assert_eq!(handle.current(), FeedConfig::simulation(1_000).unwrap());
    }

    #[tokio::test]
    async fn subscribers_see_whole_replacements_only() {
        let handle = ConfigHandle::new(FeedConfig::simulation(1_000).unwrap());
        let mut rx = handle.subscribe();

        assert!(!handle.replace(FeedConfig::simulation(1_000).unwrap()));
        assert!(!rx.has_changed().unwrap());

        handle.set_poll_interval_ms(250).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().poll_interval_ms(), 250);
    }
}
