use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::models::CoreError;
use crate::scheduling::{ScheduledSource, SchedulerSettings};

pub type ConfigResult<T> = Result<T, CoreError>;

pub const DEFAULT_COORDINATOR_TICK: Duration = Duration::from_millis(100);
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const NEWS_KEY_PLACEHOLDER: &str = "YOUR_NEWS_API_KEY";
const WEATHER_KEY_PLACEHOLDER: &str = "YOUR_WEATHER_API_KEY";
const NASA_DEMO_KEY: &str = "DEMO_KEY";

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum OutputFormat {
    Json,
    Csv,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    pub fn default_path(self) -> PathBuf {
        PathBuf::from(format!("output.{}", self.as_str()))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(CoreError::configuration(format!(
                "invalid format '{other}': format must be 'json' or 'csv'"
            ))),
        }
    }
}

/// Everything the poller needs to know at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct PollerConfig {
    pub max_concurrency: usize,
    pub poll_interval: Duration,
    pub source_intervals: BTreeMap<String, Duration>,
    pub output_format: OutputFormat,
    pub output_path: PathBuf,
    pub sources: Vec<String>,
    pub coordinator_tick: Duration,
    pub shutdown_grace: Duration,
    pub http_timeout: Duration,
}

impl PollerConfig {
    pub fn new(
        max_concurrency: usize,
        poll_interval: Duration,
        output_format: OutputFormat,
        sources: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            max_concurrency,
            poll_interval,
            source_intervals: BTreeMap::new(),
            output_format,
            output_path: output_format.default_path(),
            sources: sources.into_iter().map(Into::into).collect(),
            coordinator_tick: DEFAULT_COORDINATOR_TICK,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    pub fn output_path(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = output_path.into();
        self
    }

    pub fn source_interval(mut self, source: impl Into<String>, interval: Duration) -> Self {
        self.source_intervals
            .insert(source.into().to_ascii_lowercase(), interval);
        self
    }

    pub fn coordinator_tick(mut self, tick: Duration) -> Self {
        self.coordinator_tick = tick;
        self
    }

    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrency == 0 {
            return Err(CoreError::configuration(
                "max concurrency must be a positive integer",
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::configuration(
                "poll interval must be greater than zero",
            ));
        }
        if let Some((source, _)) = self
            .source_intervals
            .iter()
            .find(|(_, interval)| interval.is_zero())
        {
            return Err(CoreError::configuration(format!(
                "poll interval for source '{source}' must be greater than zero"
            )));
        }
        if self.sources.is_empty() {
            return Err(CoreError::configuration(
                "at least one source must be specified",
            ));
        }
        if self.sources.iter().any(|source| source.trim().is_empty()) {
            return Err(CoreError::configuration("source names must not be empty"));
        }
        if self.coordinator_tick.is_zero() {
            return Err(CoreError::configuration(
                "coordinator tick must be greater than zero",
            ));
        }
        if self.http_timeout.is_zero() {
            return Err(CoreError::configuration(
                "http timeout must be greater than zero",
            ));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(CoreError::configuration("output path must not be empty"));
        }
        Ok(())
    }

    pub fn interval_for(&self, source: &str) -> Duration {
        self.source_intervals
            .get(&source.to_ascii_lowercase())
            .copied()
            .unwrap_or(self.poll_interval)
    }

    /// Configured sources in order, each paired with its cadence.
    pub fn scheduled_sources(&self) -> Vec<ScheduledSource> {
        self.sources
            .iter()
            .map(|name| ScheduledSource {
                name: name.trim().to_string(),
                interval: self.interval_for(name.trim()),
            })
            .collect()
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            max_concurrency: self.max_concurrency,
            coordinator_tick: self.coordinator_tick,
            shutdown_grace: self.shutdown_grace,
        }
    }
}

impl fmt::Display for PollerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_concurrency={} poll_interval={}s sources=[{}] format={} output={}",
            self.max_concurrency,
            self.poll_interval.as_secs_f64(),
            self.sources.join(", "),
            self.output_format,
            self.output_path.display()
        )
    }
}

/// Parses a `name=seconds` per-source cadence override.
pub fn parse_interval_override(value: &str) -> ConfigResult<(String, Duration)> {
    let Some((name, seconds)) = value.split_once('=') else {
        return Err(CoreError::configuration(format!(
            "invalid interval override '{value}': expected NAME=SECONDS"
        )));
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::configuration(format!(
            "invalid interval override '{value}': source name is empty"
        )));
    }

    let seconds: u64 = seconds.trim().parse().map_err(|_| {
        CoreError::configuration(format!(
            "invalid interval override '{value}': '{seconds}' is not a whole number of seconds"
        ))
    })?;
    if seconds == 0 {
        return Err(CoreError::configuration(format!(
            "invalid interval override '{value}': interval must be positive"
        )));
    }

    Ok((name.to_ascii_lowercase(), Duration::from_secs(seconds)))
}

/// API credentials for the built-in sources.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKeys {
    pub news: String,
    pub weather: String,
    pub nasa: String,
}

impl ApiKeys {
    /// Reads `NEWS_API_KEY`, `WEATHER_API_KEY` and `NASA_API_KEY`, falling back
    /// to placeholders with a warning. Load any `.env` file before calling.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str, fallback: &str| match lookup(key).filter(|v| !v.trim().is_empty())
        {
            Some(value) => value,
            None => {
                tracing::warn!(key, "api key not found in environment, using default value");
                fallback.to_string()
            }
        };

        Self {
            news: read("NEWS_API_KEY", NEWS_KEY_PLACEHOLDER),
            weather: read("WEATHER_API_KEY", WEATHER_KEY_PLACEHOLDER),
            nasa: read("NASA_API_KEY", NASA_DEMO_KEY),
        }
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeys")
            .field("news", &"<redacted>")
            .field("weather", &"<redacted>")
            .field("nasa", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::models::CoreErrorKind;

    use super::{ApiKeys, OutputFormat, PollerConfig, parse_interval_override};

    fn base_config() -> PollerConfig {
        PollerConfig::new(
            2,
            Duration::from_secs(30),
            OutputFormat::Json,
            ["news", "weather"],
        )
    }

    #[test]
    fn valid_config_passes_and_defaults_output_path() {
        let config = base_config();
        config.validate().unwrap();
        assert_eq!(config.output_path.to_string_lossy(), "output.json");
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut config = base_config();
        config.max_concurrency = 0;
        let error = config.validate().unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::Configuration);
        assert!(error.message.contains("max concurrency"));
    }

    #[test]
    fn zero_intervals_are_rejected() {
        let mut config = base_config();
        config.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        let config = base_config().source_interval("news", Duration::ZERO);
        let error = config.validate().unwrap_err();
        assert!(error.message.contains("news"));
    }

    #[test]
    fn empty_source_list_is_rejected() {
        let config = PollerConfig::new(
            1,
            Duration::from_secs(1),
            OutputFormat::Csv,
            Vec::<String>::new(),
        );
        assert_eq!(
            config.validate().unwrap_err().kind,
            CoreErrorKind::Configuration
        );
    }

    #[test]
    fn unknown_sources_are_not_a_configuration_error() {
        let config = PollerConfig::new(
            1,
            Duration::from_secs(1),
            OutputFormat::Csv,
            ["news", "stocks"],
        );
        config.validate().unwrap();
    }

    #[test]
    fn format_parsing_is_case_insensitive() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!(" csv ".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        let error = "xml".parse::<OutputFormat>().unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::Configuration);
    }

    #[test]
    fn per_source_override_wins_over_default_interval() {
        let config = base_config().source_interval("Weather", Duration::from_secs(5));
        let scheduled = config.scheduled_sources();

        assert_eq!(scheduled.len(), 2);
        assert_eq!(scheduled[0].name, "news");
        assert_eq!(scheduled[0].interval, Duration::from_secs(30));
        assert_eq!(scheduled[1].interval, Duration::from_secs(5));
    }

    #[test]
    fn interval_override_parsing() {
        assert_eq!(
            parse_interval_override("nasa=120").unwrap(),
            ("nasa".to_string(), Duration::from_secs(120))
        );
        assert!(parse_interval_override("nasa").is_err());
        assert!(parse_interval_override("=5").is_err());
        assert!(parse_interval_override("nasa=0").is_err());
        assert!(parse_interval_override("nasa=soon").is_err());
    }

    #[test]
    fn missing_api_keys_fall_back_to_placeholders() {
        let keys = ApiKeys::from_lookup(|key| match key {
            "NEWS_API_KEY" => Some("abc".to_string()),
            "WEATHER_API_KEY" => Some("  ".to_string()),
            _ => None,
        });

        assert_eq!(keys.news, "abc");
        assert_eq!(keys.weather, "YOUR_WEATHER_API_KEY");
        assert_eq!(keys.nasa, "DEMO_KEY");
        assert!(!format!("{keys:?}").contains("abc"));
    }
}
