use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;

use crate::adapters::http_utils::parse_error;
use crate::adapters::source::{AdapterResult, SeenIds, SourceAdapter};
use crate::models::{Record, SourceId, WeatherRecord};

pub const WEATHER_CURRENT_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct City {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

pub const DEFAULT_CITIES: [City; 5] = [
    City {
        name: "London",
        latitude: 51.5074,
        longitude: -0.1278,
    },
    City {
        name: "New York",
        latitude: 40.7128,
        longitude: -74.0060,
    },
    City {
        name: "Moscow",
        latitude: 55.7558,
        longitude: 37.6173,
    },
    City {
        name: "Tokyo",
        latitude: 35.6762,
        longitude: 139.6503,
    },
    City {
        name: "Berlin",
        latitude: 52.5200,
        longitude: 13.4050,
    },
];

pub trait WeatherSource: Send + Sync {
    /// Raw JSON body of the current-weather endpoint for `city`.
    fn current(&self, city: &City) -> AdapterResult<String>;
}

/// Polls one city per fetch, rotating through the configured list.
pub struct WeatherAdapter<S: WeatherSource> {
    source: S,
    cities: Vec<City>,
    cursor: AtomicUsize,
    seen: SeenIds,
}

impl<S: WeatherSource> WeatherAdapter<S> {
    pub fn new(source: S) -> Self {
        Self::with_cities(source, DEFAULT_CITIES.to_vec())
    }

    pub fn with_cities(source: S, cities: Vec<City>) -> Self {
        Self {
            source,
            cities,
            cursor: AtomicUsize::new(0),
            seen: SeenIds::new(),
        }
    }

    fn next_city(&self) -> Option<City> {
        if self.cities.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.cities.len();
        Some(self.cities[index])
    }
}

impl<S: WeatherSource> SourceAdapter for WeatherAdapter<S> {
    fn name(&self) -> &str {
        SourceId::Weather.as_str()
    }

    fn fetch(&self) -> AdapterResult<Vec<Record>> {
        let Some(city) = self.next_city() else {
            return Ok(Vec::new());
        };

        tracing::info!(source = self.name(), city = city.name, "fetching weather data");
        let body = self.source.current(&city)?;
        let record = Record::Weather(parse_current_weather(&body)?);

        if !self.seen.insert(record.id()) {
            tracing::info!(
                source = self.name(),
                city = city.name,
                "weather observation already processed"
            );
            return Ok(Vec::new());
        }

        Ok(vec![record])
    }
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherRoot {
    #[serde(default)]
    name: String,
    #[serde(default)]
    dt: i64,
    #[serde(default)]
    main: MainBlock,
    #[serde(default)]
    wind: WindBlock,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct MainBlock {
    #[serde(default)]
    temp: f64,
    #[serde(default)]
    humidity: f64,
}

#[derive(Debug, Default, Deserialize)]
struct WindBlock {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    main: Option<String>,
}

fn parse_current_weather(body: &str) -> AdapterResult<WeatherRecord> {
    let root: CurrentWeatherRoot = serde_json::from_str(body).map_err(|e| {
        parse_error(
            SourceId::Weather.as_str(),
            format!("invalid current weather JSON: {e}"),
        )
    })?;

    Ok(WeatherRecord {
        city: root.name,
        temperature: root.main.temp,
        wind_speed: root.wind.speed,
        humidity: root.main.humidity.round() as i64,
        condition: root
            .weather
            .into_iter()
            .next()
            .and_then(|condition| condition.main)
            .unwrap_or_default(),
        timestamp: root.dt,
    })
}
