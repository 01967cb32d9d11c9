use std::sync::atomic::{AtomicU32, Ordering};

use serde::Deserialize;
use time::{Date, OffsetDateTime};

use crate::adapters::http_utils::parse_error;
use crate::adapters::source::{AdapterResult, SeenIds, SourceAdapter};
use crate::models::{NasaRecord, Record, SourceId};

pub const NASA_APOD_URL: &str = "https://api.nasa.gov/planetary/apod";
pub const NASA_MARS_PHOTOS_URL: &str =
    "https://api.nasa.gov/mars-photos/api/v1/rovers/curiosity/photos";

const APOD_LOOKBACK_DAYS: u32 = 365;
const MARS_MAX_SOL: u32 = 3000;

pub trait NasaSource: Send + Sync {
    /// Raw JSON body of the astronomy picture of the day for `date` (YYYY-MM-DD).
    fn apod(&self, date: &str) -> AdapterResult<String>;

    /// Raw JSON body of the first page of Curiosity photos taken on `sol`.
    fn mars_photos(&self, sol: u32) -> AdapterResult<String>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum NasaFeed {
    Apod,
    MarsPhotos,
}

/// Alternates between the APOD feed, walking back one day per call, and the
/// Curiosity photo feed, walking forward one sol per call.
pub struct NasaAdapter<S: NasaSource> {
    source: S,
    today: Option<Date>,
    calls: AtomicU32,
    seen: SeenIds,
}

impl<S: NasaSource> NasaAdapter<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            today: None,
            calls: AtomicU32::new(0),
            seen: SeenIds::new(),
        }
    }

    /// Pins the reference date instead of reading the clock.
    pub fn with_today(mut self, today: Date) -> Self {
        self.today = Some(today);
        self
    }

    fn fetch_apod(&self, round: u32) -> AdapterResult<Vec<Record>> {
        let today = self
            .today
            .unwrap_or_else(|| OffsetDateTime::now_utc().date());
        let days_back = i64::from(round % APOD_LOOKBACK_DAYS + 1);
        let date = today
            .checked_sub(time::Duration::days(days_back))
            .unwrap_or(today);
        let date = format_date(date);

        tracing::info!(source = self.name(), date = %date, "fetching apod data");
        let body = self.source.apod(&date)?;
        let record = Record::Nasa(parse_apod(&body)?);

        if !self.seen.insert(record.id()) {
            tracing::info!(source = self.name(), date = %date, "apod entry already processed");
            return Ok(Vec::new());
        }
        Ok(vec![record])
    }

    fn fetch_mars_photo(&self, round: u32) -> AdapterResult<Vec<Record>> {
        let sol = round % MARS_MAX_SOL + 1;

        tracing::info!(source = self.name(), sol, "fetching mars rover photos");
        let body = self.source.mars_photos(sol)?;
        let photos = parse_mars_photos(&body)?;

        let fresh = photos
            .into_iter()
            .find(|photo| !self.seen.contains(&photo.id));
        let Some(photo) = fresh else {
            tracing::info!(source = self.name(), sol, "no unseen photos for sol");
            return Ok(Vec::new());
        };

        let record = Record::Nasa(photo);
        self.seen.insert(record.id());
        Ok(vec![record])
    }
}

impl<S: NasaSource> SourceAdapter for NasaAdapter<S> {
    fn name(&self) -> &str {
        SourceId::Nasa.as_str()
    }

    fn fetch(&self) -> AdapterResult<Vec<Record>> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        let round = call / 2;
        match feed_for_call(call) {
            NasaFeed::Apod => self.fetch_apod(round),
            NasaFeed::MarsPhotos => self.fetch_mars_photo(round),
        }
    }
}

fn feed_for_call(call: u32) -> NasaFeed {
    if call % 2 == 0 {
        NasaFeed::Apod
    } else {
        NasaFeed::MarsPhotos
    }
}

fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

#[derive(Debug, Deserialize)]
struct ApodResponse {
    date: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    media_type: String,
    #[serde(default)]
    copyright: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MarsPhotosResponse {
    #[serde(default)]
    photos: Vec<MarsPhoto>,
}

#[derive(Debug, Deserialize)]
struct MarsPhoto {
    id: u64,
    #[serde(default)]
    img_src: String,
    #[serde(default)]
    earth_date: String,
    #[serde(default)]
    camera: Option<NamedBlock>,
    #[serde(default)]
    rover: Option<NamedBlock>,
}

#[derive(Debug, Deserialize)]
struct NamedBlock {
    name: Option<String>,
    full_name: Option<String>,
}

impl NamedBlock {
    fn display_name(&self) -> String {
        self.full_name
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_default()
    }
}

fn parse_apod(body: &str) -> AdapterResult<NasaRecord> {
    let response: ApodResponse = serde_json::from_str(body)
        .map_err(|e| parse_error(SourceId::Nasa.as_str(), format!("invalid APOD JSON: {e}")))?;

    Ok(NasaRecord {
        id: format!("apod_{}", response.date),
        title: response.title,
        date: response.date,
        explanation: response.explanation,
        url: response.url,
        media_type: response.media_type,
        copyright: response
            .copyright
            .map(|value| value.trim().to_string())
            .unwrap_or_default(),
    })
}

fn parse_mars_photos(body: &str) -> AdapterResult<Vec<NasaRecord>> {
    let response: MarsPhotosResponse = serde_json::from_str(body).map_err(|e| {
        parse_error(
            SourceId::Nasa.as_str(),
            format!("invalid mars photos JSON: {e}"),
        )
    })?;

    Ok(response
        .photos
        .into_iter()
        .map(|photo| {
            let camera = photo
                .camera
                .as_ref()
                .map(NamedBlock::display_name)
                .unwrap_or_default();
            let rover = photo
                .rover
                .as_ref()
                .map(NamedBlock::display_name)
                .unwrap_or_default();
            NasaRecord {
                id: format!("mars_{}", photo.id),
                title: format!("Mars Rover Photo by {camera}"),
                date: photo.earth_date,
                explanation: format!("Photo taken by {rover} rover on Mars using {camera}"),
                url: photo.img_src,
                media_type: "image".to_string(),
                copyright: "NASA/JPL".to_string(),
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use time::{Date, Month};

    use crate::adapters::source::{AdapterResult, SourceAdapter};
    use crate::models::{CoreErrorKind, Record};

    use super::{NasaAdapter, NasaSource, parse_apod, parse_mars_photos};

    const APOD_FIXTURE: &str = include_str!("../../tests/fixtures/nasa/apod.json");
    const MARS_FIXTURE: &str = include_str!("../../tests/fixtures/nasa/mars_photos.json");

    #[derive(Default)]
    struct RecordingNasaSource {
        calls: Mutex<Vec<String>>,
    }

    impl NasaSource for RecordingNasaSource {
        fn apod(&self, date: &str) -> AdapterResult<String> {
            self.calls.lock().unwrap().push(format!("apod:{date}"));
            Ok(APOD_FIXTURE.to_string())
        }

        fn mars_photos(&self, sol: u32) -> AdapterResult<String> {
            self.calls.lock().unwrap().push(format!("mars:{sol}"));
            Ok(MARS_FIXTURE.to_string())
        }
    }

    fn pinned_adapter() -> NasaAdapter<RecordingNasaSource> {
        let today = Date::from_calendar_date(2024, Month::March, 2).unwrap();
        NasaAdapter::new(RecordingNasaSource::default()).with_today(today)
    }

    #[test]
    fn parses_apod_fixture() {
        let record = parse_apod(APOD_FIXTURE).unwrap();
        assert_eq!(record.id, "apod_2024-02-29");
        assert_eq!(record.media_type, "image");
        assert_eq!(record.copyright, "Jane Stargazer");
    }

    #[test]
    fn parses_mars_photos_with_descriptive_titles() {
        let photos = parse_mars_photos(MARS_FIXTURE).unwrap();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].id, "mars_102693");
        assert_eq!(photos[0].title, "Mars Rover Photo by Front Hazard Avoidance Camera");
        assert_eq!(
            photos[0].explanation,
            "Photo taken by Curiosity rover on Mars using Front Hazard Avoidance Camera"
        );
        assert_eq!(photos[0].copyright, "NASA/JPL");
    }

    #[test]
    fn empty_photo_page_is_not_an_error() {
        assert!(parse_mars_photos("{\"photos\": []}").unwrap().is_empty());
    }

    #[test]
    fn alternates_feeds_and_walks_dates_and_sols() {
        let adapter = pinned_adapter();
        for _ in 0..4 {
            let _ = adapter.fetch().unwrap();
        }

        let calls = adapter.source.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec!["apod:2024-03-01", "mars:1", "apod:2024-02-29", "mars:2"]
        );
    }

    #[test]
    fn mars_feed_emits_each_photo_once() {
        let adapter = pinned_adapter();

        let mut mars_ids = Vec::new();
        for _ in 0..6 {
            for record in adapter.fetch().unwrap() {
                if let Record::Nasa(record) = record
                    && record.id.starts_with("mars_")
                {
                    mars_ids.push(record.id);
                }
            }
        }

        assert_eq!(mars_ids, vec!["mars_102693", "mars_102694"]);
    }

    #[test]
    fn apod_entry_is_deduplicated_by_date() {
        let adapter = pinned_adapter();
        let first = adapter.fetch().unwrap();
        let _ = adapter.fetch().unwrap();
        let third = adapter.fetch().unwrap();

        assert_eq!(first.len(), 1);
        assert!(third.is_empty());
    }

    #[test]
    fn malformed_apod_is_parse_failure() {
        let error = parse_apod("{}").unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::ParseFailure);
    }
}
