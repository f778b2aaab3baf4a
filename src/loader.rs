use crate::errors::FetchError;
use crate::models::{GraduateRecord, RosterSnapshot};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, info};
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

pub const NAME_COLUMN: &str = "Graduate Full Name";
pub const CLASS_YEAR_COLUMN: &str = "Which class year?";
pub const DEPARTMENT_COLUMN: &str = "Which Graduating Department";
pub const EMPLOYER_COLUMN: &str = "Employer Name/Fellowship Program";
pub const ADDRESS_COLUMN: &str =
    "Employer Full Address PLEASE keep in format include comma (ADDRESS, CITY, STATE, ZIP)";
pub const WORK_SETTING_COLUMN: &str = "Work Setting";
pub const HEADSHOT_COLUMN: &str = "Resident GME Headshot image";
pub const SUBMITTED_AT_COLUMN: &str = "Submitted at";

pub const EXPECTED_COLUMNS: [&str; 8] = [
    NAME_COLUMN,
    CLASS_YEAR_COLUMN,
    DEPARTMENT_COLUMN,
    EMPLOYER_COLUMN,
    ADDRESS_COLUMN,
    WORK_SETTING_COLUMN,
    HEADSHOT_COLUMN,
    SUBMITTED_AT_COLUMN,
];

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Graduate Full Name")]
    name: Option<String>,
    #[serde(rename = "Which class year?")]
    class_year: Option<String>,
    #[serde(rename = "Which Graduating Department")]
    department: Option<String>,
    #[serde(rename = "Employer Name/Fellowship Program")]
    employer: Option<String>,
    #[serde(
        rename = "Employer Full Address PLEASE keep in format include comma (ADDRESS, CITY, STATE, ZIP)"
    )]
    address: Option<String>,
    #[serde(rename = "Work Setting")]
    work_setting: Option<String>,
    #[serde(rename = "Resident GME Headshot image")]
    headshot_url: Option<String>,
    #[serde(rename = "Submitted at")]
    submitted_at: Option<String>,
}

impl RosterRow {
    fn into_record(self) -> GraduateRecord {
        GraduateRecord {
            name: self.name.unwrap_or_default(),
            class_year: self.class_year,
            department: self.department,
            employer: self.employer,
            address: self.address,
            work_setting: self.work_setting,
            headshot_url: self.headshot_url,
            submitted_at: self.submitted_at.as_deref().and_then(parse_timestamp),
            coordinates: None,
        }
    }
}

/// Snapshots already loaded in this process, keyed by resolved source.
#[derive(Debug, Default)]
pub struct SourceCache {
    entries: HashMap<String, Arc<RosterSnapshot>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Arc<RosterSnapshot>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: String, snapshot: Arc<RosterSnapshot>) {
        self.entries.insert(key, snapshot);
    }

    /// Drop one source so the next load refetches it.
    pub fn invalidate(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct RosterLoader {
    client: reqwest::Client,
    cache: SourceCache,
    sheet_name: String,
    timeout: Duration,
}

impl RosterLoader {
    pub fn new(client: reqwest::Client, cache: SourceCache, sheet_name: impl Into<String>) -> Self {
        Self {
            client,
            cache,
            sheet_name: sheet_name.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut SourceCache {
        &mut self.cache
    }

    /// Load a roster from a URL or a local CSV path, reusing a cached
    /// snapshot when the same source was already loaded.
    pub async fn load(&mut self, source: &str) -> Result<Arc<RosterSnapshot>, FetchError> {
        let key = resolve_source(source, &self.sheet_name);

        if let Some(snapshot) = self.cache.get(&key) {
            debug!("Using cached roster for {}", key);
            return Ok(snapshot);
        }

        let content = if is_remote(&key) {
            self.fetch_url(&key).await?
        } else {
            read_file(&key).await?
        };

        let records = parse_roster(content.as_bytes(), &key)?;
        info!("Loaded {} graduate records from {}", records.len(), key);

        let snapshot = Arc::new(RosterSnapshot::new(records));
        self.cache.insert(key, Arc::clone(&snapshot));
        Ok(snapshot)
    }

    async fn fetch_url(&self, url: &str) -> Result<String, FetchError> {
        info!("Fetching roster from: {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|cause| FetchError::Request {
                location: url.to_string(),
                cause,
            })?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                location: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().await.map_err(|cause| FetchError::Request {
            location: url.to_string(),
            cause,
        })
    }
}

async fn read_file(path: &str) -> Result<String, FetchError> {
    info!("Reading roster from: {}", path);
    tokio::fs::read_to_string(path)
        .await
        .map_err(|cause| FetchError::Io {
            location: path.to_string(),
            cause,
        })
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn sheet_id_regex() -> &'static Regex {
    static SHEET_ID: OnceLock<Regex> = OnceLock::new();
    SHEET_ID.get_or_init(|| {
        Regex::new(r"^(https?://docs\.google\.com/spreadsheets/d/)([A-Za-z0-9_-]+)")
            .expect("sheet id pattern should be valid")
    })
}

/// Turn a Google Sheets share/edit link into its CSV export endpoint.
/// Any other source (CSV URL, export URL, local path) is returned untouched.
pub fn resolve_source(source: &str, sheet_name: &str) -> String {
    let source = source.trim();
    if source.contains("/gviz/") || source.contains("/export") {
        return source.to_string();
    }

    let Some(caps) = sheet_id_regex().captures(source) else {
        return source.to_string();
    };

    let base = format!("{}{}/gviz/tq", &caps[1], &caps[2]);
    match Url::parse_with_params(&base, &[("tqx", "out:csv"), ("sheet", sheet_name)]) {
        Ok(url) => url.to_string(),
        Err(_) => source.to_string(),
    }
}

/// Parse CSV roster data. Every expected column must be present; a malformed
/// row fails the whole load.
pub fn parse_roster(data: &[u8], location: &str) -> Result<Vec<GraduateRecord>, FetchError> {
    let csv_error = |cause| FetchError::Csv {
        location: location.to_string(),
        cause,
    };

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(data);

    let headers = reader.headers().map_err(csv_error)?.clone();
    for column in EXPECTED_COLUMNS {
        if !headers.iter().any(|header| header == column) {
            return Err(FetchError::MissingColumn {
                location: location.to_string(),
                column: column.to_string(),
            });
        }
    }

    let mut records = Vec::new();
    for row in reader.deserialize::<RosterRow>() {
        records.push(row.map_err(csv_error)?.into_record());
    }

    Ok(records)
}

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%m/%d/%Y", "%Y-%m-%d", "%Y/%m/%d"];

/// Permissive timestamp parsing; anything unrecognised is unknown (`None`).
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn header() -> String {
        EXPECTED_COLUMNS
            .iter()
            .map(|c| format!("\"{}\"", c))
            .collect::<Vec<_>>()
            .join(",")
    }

    #[test]
    fn parses_rows_and_keeps_every_record() {
        let csv = format!(
            "{}\n\
            \"  jane doe \",2023,EM,st agnes,\"1303 E Herndon Ave, Fresno, CA, 93720\",Hospital,https://img/jane.png,2023-06-14 17:32:10\n\
            John Roe,2022,PATH,,,Other,,not a date\n",
            header()
        );

        let records = parse_roster(csv.as_bytes(), "test.csv").unwrap();
        assert_eq!(records.len(), 2);

        let jane = &records[0];
        assert_eq!(jane.name, "  jane doe ");
        assert_eq!(jane.department.as_deref(), Some("EM"));
        assert_eq!(
            jane.address.as_deref(),
            Some("1303 E Herndon Ave, Fresno, CA, 93720")
        );
        assert_eq!(jane.submitted_at.map(|t| t.year()), Some(2023));
        assert!(jane.coordinates.is_none());

        let john = &records[1];
        assert_eq!(john.employer, None);
        assert_eq!(john.address, None);
        assert_eq!(john.submitted_at, None);
    }

    #[test]
    fn extra_columns_are_ignored() {
        let csv = format!("\"Extra\",{}\nx,A B,2021,IM,Clinic,\"1 Main St, Town, CA, 90000\",Ambulatory,,\n", header());
        let records = parse_roster(csv.as_bytes(), "test.csv").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "A B");
        assert_eq!(records[0].work_setting.as_deref(), Some("Ambulatory"));
    }

    #[test]
    fn missing_column_is_a_fetch_error() {
        let csv = "Graduate Full Name,Which class year?\nJane,2023\n";
        let err = parse_roster(csv.as_bytes(), "test.csv").unwrap_err();
        match err {
            FetchError::MissingColumn { column, .. } => {
                assert_eq!(column, DEPARTMENT_COLUMN);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ragged_row_fails_whole_load() {
        let csv = format!("{}\nJane,2023,EM\n", header());
        let err = parse_roster(csv.as_bytes(), "test.csv").unwrap_err();
        assert!(matches!(err, FetchError::Csv { .. }));
    }

    #[test]
    fn timestamps_parse_permissively() {
        let ts = parse_timestamp("2024-02-14 17:30:00").unwrap();
        assert_eq!((ts.month(), ts.day(), ts.hour()), (2, 14, 17));

        let ts = parse_timestamp("6/14/2023 9:05:00").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2023, 6, 14));

        let ts = parse_timestamp("2023-06-14T17:32:10Z").unwrap();
        assert_eq!(ts.hour(), 17);

        let ts = parse_timestamp("2023-06-14").unwrap();
        assert_eq!((ts.hour(), ts.minute()), (0, 0));

        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn sheet_share_link_resolves_to_csv_export() {
        let resolved = resolve_source(
            "https://docs.google.com/spreadsheets/d/1-r0gE0J4HMAOOd0e-sLI_3xbJNtLXFPxUjAh-XlM3OI/edit?usp=sharing",
            "Sheet1",
        );
        assert_eq!(
            resolved,
            "https://docs.google.com/spreadsheets/d/1-r0gE0J4HMAOOd0e-sLI_3xbJNtLXFPxUjAh-XlM3OI/gviz/tq?tqx=out%3Acsv&sheet=Sheet1"
        );
    }

    #[test]
    fn other_sources_are_left_alone() {
        assert_eq!(resolve_source("data/roster.csv", "Sheet1"), "data/roster.csv");
        assert_eq!(
            resolve_source("http://localhost:8080/roster.csv", "Sheet1"),
            "http://localhost:8080/roster.csv"
        );
        let export = "https://docs.google.com/spreadsheets/d/abc/gviz/tq?tqx=out:csv&sheet=Other";
        assert_eq!(resolve_source(export, "Sheet1"), export);
    }

    #[tokio::test]
    async fn repeated_loads_are_served_from_cache_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.csv");
        let csv = format!("{}\nJane Doe,2023,EM,Clinic,,Ambulatory,,\n", header());
        std::fs::write(&path, csv).unwrap();
        let source = path.to_string_lossy().to_string();

        let mut loader = RosterLoader::new(reqwest::Client::new(), SourceCache::new(), "Sheet1");
        let first = loader.load(&source).await.unwrap();
        assert_eq!(first.len(), 1);

        // Source disappears; the cached snapshot is still served.
        std::fs::remove_file(&path).unwrap();
        let second = loader.load(&source).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(loader.cache_mut().invalidate(&source));
        let err = loader.load(&source).await.unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
        assert!(loader.cache().is_empty());
    }
}
