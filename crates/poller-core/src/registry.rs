use std::sync::Arc;

use crate::adapters::{
    HttpClient, HttpNasaSource, HttpNewsSource, HttpWeatherSource, NasaAdapter, NewsAdapter,
    SourceAdapter, SourceResolver, WeatherAdapter,
};
use crate::config::ApiKeys;
use crate::models::SourceId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SourceDescriptor {
    pub id: SourceId,
    pub display_name: &'static str,
    pub description: &'static str,
}

const ALL_SOURCES: [SourceDescriptor; 3] = [
    SourceDescriptor {
        id: SourceId::News,
        display_name: "NewsAPI top headlines",
        description: "Top headlines for the US from newsapi.org",
    },
    SourceDescriptor {
        id: SourceId::Weather,
        display_name: "OpenWeatherMap current weather",
        description: "Current conditions for a rotating set of cities",
    },
    SourceDescriptor {
        id: SourceId::Nasa,
        display_name: "NASA open APIs",
        description: "Astronomy Picture of the Day alternating with Mars rover photos",
    },
];

pub fn sources() -> &'static [SourceDescriptor] {
    &ALL_SOURCES
}

pub fn source(id: SourceId) -> Option<&'static SourceDescriptor> {
    ALL_SOURCES.iter().find(|descriptor| descriptor.id == id)
}

/// Builds HTTP-backed adapters for the built-in sources.
pub struct SourceRegistry {
    keys: ApiKeys,
    client: HttpClient,
}

impl SourceRegistry {
    pub fn new(keys: ApiKeys, client: HttpClient) -> Self {
        Self { keys, client }
    }

    pub fn build(&self, id: SourceId) -> Arc<dyn SourceAdapter> {
        match id {
            SourceId::News => Arc::new(NewsAdapter::new(HttpNewsSource::new(
                self.client.clone(),
                self.keys.news.clone(),
            ))),
            SourceId::Weather => Arc::new(WeatherAdapter::new(HttpWeatherSource::new(
                self.client.clone(),
                self.keys.weather.clone(),
            ))),
            SourceId::Nasa => Arc::new(NasaAdapter::new(HttpNasaSource::new(
                self.client.clone(),
                self.keys.nasa.clone(),
            ))),
        }
    }
}

impl SourceResolver for SourceRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn SourceAdapter>> {
        let id = name.parse::<SourceId>().ok()?;
        Some(self.build(id))
    }
}
