pub(crate) mod http_utils;
pub mod nasa;
pub mod nasa_http;
pub mod news;
pub mod news_http;
pub mod source;
pub mod weather;
pub mod weather_http;

pub use http_utils::HttpClient;
pub use nasa::{NasaAdapter, NasaSource};
pub use nasa_http::HttpNasaSource;
pub use news::{NewsAdapter, NewsSource};
pub use news_http::HttpNewsSource;
pub use source::{AdapterResult, SeenIds, SourceAdapter, SourceResolver};
pub use weather::{City, WeatherAdapter, WeatherSource};
pub use weather_http::HttpWeatherSource;
