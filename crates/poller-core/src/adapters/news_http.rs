use crate::adapters::http_utils::HttpClient;
use crate::adapters::news::{NEWS_TOP_HEADLINES_URL, NewsSource};
use crate::adapters::source::AdapterResult;
use crate::models::SourceId;

const NEWS_COUNTRY: &str = "us";

pub struct HttpNewsSource {
    client: HttpClient,
    api_key: String,
}

impl HttpNewsSource {
    pub fn new(client: HttpClient, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

impl NewsSource for HttpNewsSource {
    fn top_headlines(&self) -> AdapterResult<String> {
        tracing::info!(source = SourceId::News.as_str(), "fetching data from news api");
        self.client.get_text(
            SourceId::News.as_str(),
            NEWS_TOP_HEADLINES_URL,
            &[
                ("country", NEWS_COUNTRY),
                ("apiKey", self.api_key.as_str()),
            ],
        )
    }
}
