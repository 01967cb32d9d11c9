use crate::adapters::http_utils::HttpClient;
use crate::adapters::source::AdapterResult;
use crate::adapters::weather::{City, WEATHER_CURRENT_URL, WeatherSource};
use crate::models::SourceId;

pub struct HttpWeatherSource {
    client: HttpClient,
    api_key: String,
}

impl HttpWeatherSource {
    pub fn new(client: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

impl WeatherSource for HttpWeatherSource {
    fn current(&self, city: &City) -> AdapterResult<String> {
        let latitude = format!("{:.6}", city.latitude);
        let longitude = format!("{:.6}", city.longitude);
        self.client.get_text(
            SourceId::Weather.as_str(),
            WEATHER_CURRENT_URL,
            &[
                ("lat", latitude.as_str()),
                ("lon", longitude.as_str()),
                ("units", "metric"),
                ("appid", self.api_key.as_str()),
            ],
        )
    }
}
