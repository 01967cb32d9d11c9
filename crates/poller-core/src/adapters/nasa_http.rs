use crate::adapters::http_utils::HttpClient;
use crate::adapters::nasa::{NASA_APOD_URL, NASA_MARS_PHOTOS_URL, NasaSource};
use crate::adapters::source::AdapterResult;
use crate::models::SourceId;

pub struct HttpNasaSource {
    client: HttpClient,
    api_key: String,
}

impl HttpNasaSource {
    pub fn new(client: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

impl NasaSource for HttpNasaSource {
    fn apod(&self, date: &str) -> AdapterResult<String> {
        self.client.get_text(
            SourceId::Nasa.as_str(),
            NASA_APOD_URL,
            &[("api_key", self.api_key.as_str()), ("date", date)],
        )
    }

    fn mars_photos(&self, sol: u32) -> AdapterResult<String> {
        let sol = sol.to_string();
        self.client.get_text(
            SourceId::Nasa.as_str(),
            NASA_MARS_PHOTOS_URL,
            &[
                ("sol", sol.as_str()),
                ("api_key", self.api_key.as_str()),
                ("page", "1"),
            ],
        )
    }
}
