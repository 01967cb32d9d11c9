use serde::{Deserialize, Serialize};

use crate::models::SourceId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsRecord {
    pub title: String,
    pub description: String,
    pub url: String,
    pub source: String,
    pub published_at: String,
    pub author: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherRecord {
    pub city: String,
    pub temperature: f64,
    pub wind_speed: f64,
    pub humidity: i64,
    pub condition: String,
    pub timestamp: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NasaRecord {
    pub id: String,
    pub title: String,
    pub date: String,
    pub explanation: String,
    pub url: String,
    pub media_type: String,
    pub copyright: String,
}

/// One item produced by a source adapter and handed to a sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    News(NewsRecord),
    Weather(WeatherRecord),
    Nasa(NasaRecord),
}

impl Record {
    pub fn kind(&self) -> SourceId {
        match self {
            Self::News(_) => SourceId::News,
            Self::Weather(_) => SourceId::Weather,
            Self::Nasa(_) => SourceId::Nasa,
        }
    }

    /// Source-defined identity used for de-duplication.
    pub fn id(&self) -> String {
        match self {
            Self::News(record) => record.url.clone(),
            Self::Weather(record) => format!("{}_{}", record.city, record.timestamp),
            Self::Nasa(record) => record.id.clone(),
        }
    }

    /// Ordered `(header, value)` pairs for tabular sinks. The first column is
    /// always the record type.
    pub fn columns(&self) -> Vec<(&'static str, String)> {
        let mut columns = vec![("type", self.kind().as_str().to_string())];
        match self {
            Self::News(record) => columns.extend([
                ("title", record.title.clone()),
                ("description", record.description.clone()),
                ("url", record.url.clone()),
                ("source", record.source.clone()),
                ("publishedAt", record.published_at.clone()),
                ("author", record.author.clone()),
            ]),
            Self::Weather(record) => columns.extend([
                ("city", record.city.clone()),
                ("temperature", record.temperature.to_string()),
                ("windSpeed", record.wind_speed.to_string()),
                ("humidity", record.humidity.to_string()),
                ("condition", record.condition.clone()),
                ("timestamp", record.timestamp.to_string()),
            ]),
            Self::Nasa(record) => columns.extend([
                ("id", record.id.clone()),
                ("title", record.title.clone()),
                ("date", record.date.clone()),
                ("explanation", record.explanation.clone()),
                ("url", record.url.clone()),
                ("mediaType", record.media_type.clone()),
                ("copyright", record.copyright.clone()),
            ]),
        }
        columns
    }
}
