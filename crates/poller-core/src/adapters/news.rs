use serde::Deserialize;
use serde_json::Value;

use crate::adapters::http_utils::parse_error;
use crate::adapters::source::{AdapterResult, SeenIds, SourceAdapter};
use crate::models::{NewsRecord, Record, SourceId};

pub const NEWS_TOP_HEADLINES_URL: &str = "https://newsapi.org/v2/top-headlines";

pub trait NewsSource: Send + Sync {
    /// Raw JSON body of the top-headlines endpoint.
    fn top_headlines(&self) -> AdapterResult<String>;
}

pub struct NewsAdapter<S: NewsSource> {
    source: S,
    seen: SeenIds,
}

impl<S: NewsSource> NewsAdapter<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            seen: SeenIds::new(),
        }
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

impl<S: NewsSource> SourceAdapter for NewsAdapter<S> {
    fn name(&self) -> &str {
        SourceId::News.as_str()
    }

    fn fetch(&self) -> AdapterResult<Vec<Record>> {
        let body = self.source.top_headlines()?;
        let articles = parse_top_headlines(&body)?;

        let mut records = Vec::new();
        for article in articles {
            let record = Record::News(article);
            if self.seen.insert(record.id()) {
                records.push(record);
            }
        }

        tracing::debug!(source = self.name(), records = records.len(), "parsed headlines");
        Ok(records)
    }
}

#[derive(Debug, Deserialize)]
struct TopHeadlinesRoot {
    articles: Option<Value>,
}

fn parse_top_headlines(body: &str) -> AdapterResult<Vec<NewsRecord>> {
    let root: TopHeadlinesRoot = serde_json::from_str(body).map_err(|e| {
        parse_error(
            SourceId::News.as_str(),
            format!("invalid top-headlines JSON: {e}"),
        )
    })?;

    let Some(Value::Array(items)) = root.articles else {
        return Ok(Vec::new());
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if !item.is_object() {
            tracing::warn!(
                source = SourceId::News.as_str(),
                index,
                "skipping article entry that is not an object"
            );
            continue;
        }
        let url = text_field(item, "url");
        if url.is_empty() {
            continue;
        }

        let source = item
            .get("source")
            .and_then(|source| source.get("name"))
            .filter(|name| !name.is_null())
            .map(value_text)
            .unwrap_or_else(|| "Unknown".to_string());

        records.push(NewsRecord {
            title: text_field(item, "title"),
            description: text_field(item, "description"),
            url,
            source,
            published_at: text_field(item, "publishedAt"),
            author: text_field(item, "author"),
        });
    }

    Ok(records)
}

/// Scalar fields are rendered as text; missing, null and nested values read
/// as empty.
fn text_field(item: &Value, key: &str) -> String {
    item.get(key).map(value_text).unwrap_or_default()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}
