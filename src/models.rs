use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_SHEET_URL: &str =
    "https://docs.google.com/spreadsheets/d/1-r0gE0J4HMAOOd0e-sLI_3xbJNtLXFPxUjAh-XlM3OI/edit?usp=sharing";
pub const DEFAULT_GEOCODE_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Environment variable holding the geocoding API key.
pub const API_KEY_VAR: &str = "GOOGLE_GEO_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Roster source: a spreadsheet share URL, a CSV URL or a local CSV path
    pub sheet_url: String,
    pub sheet_name: String,
    pub output_directory: String,
    pub geocode_endpoint: String,
    pub geocode_concurrency: usize,
    pub request_timeout_secs: u64,
    pub title: String,
    pub description: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sheet_url: DEFAULT_SHEET_URL.to_string(),
            sheet_name: "Sheet1".to_string(),
            output_directory: "output".to_string(),
            geocode_endpoint: DEFAULT_GEOCODE_ENDPOINT.to_string(),
            geocode_concurrency: 4,
            request_timeout_secs: 30,
            title: "SAMC GME Graduate Data Map".to_string(),
            description: "This map shows the locations of all the GME graduates from SAMC and \
                their whereabouts after graduation. The data is sourced from the SAMC GME Office \
                and is updated every year."
                .to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }

    /// Number of geocoding lookups allowed in flight at once, never below one.
    pub fn effective_concurrency(&self) -> usize {
        self.geocode_concurrency.max(1)
    }
}

/// Geocoding credential. Kept out of `Debug` output so it never reaches the logs.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn from_env() -> Option<Self> {
        std::env::var(API_KEY_VAR)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(Self)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// The four visual classes a work setting can fall into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkSetting {
    Ambulatory,
    Hospital,
    Fellowship,
    Other,
}

impl WorkSetting {
    /// Exact match on the trimmed value; anything unrecognised is `Other`.
    pub fn classify(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("Ambulatory") => WorkSetting::Ambulatory,
            Some("Hospital") => WorkSetting::Hospital,
            Some("Fellowship") => WorkSetting::Fellowship,
            _ => WorkSetting::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WorkSetting::Ambulatory => "Ambulatory",
            WorkSetting::Hospital => "Hospital",
            WorkSetting::Fellowship => "Fellowship",
            WorkSetting::Other => "Other",
        }
    }

    pub fn marker_color(&self) -> &'static str {
        match self {
            WorkSetting::Ambulatory => "green",
            WorkSetting::Hospital => "red",
            WorkSetting::Fellowship => "blue",
            WorkSetting::Other => "black",
        }
    }
}

/// Map a department code to its display name; unknown codes pass through.
pub fn department_display_name(code: &str) -> &str {
    match code {
        "EM" => "Emergency Medicine",
        "IM" => "Internal Medicine",
        "FM" => "Family Medicine",
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraduateRecord {
    pub name: String,
    pub class_year: Option<String>,
    pub department: Option<String>,
    pub employer: Option<String>,
    pub address: Option<String>,
    pub work_setting: Option<String>,
    pub headshot_url: Option<String>,
    pub submitted_at: Option<NaiveDateTime>,
    pub coordinates: Option<Coordinates>,
}

impl GraduateRecord {
    pub fn is_geocoded(&self) -> bool {
        self.coordinates.is_some()
    }

    pub fn setting(&self) -> WorkSetting {
        WorkSetting::classify(self.work_setting.as_deref())
    }

    pub fn department_name(&self) -> Option<&str> {
        self.department.as_deref().map(department_display_name)
    }

    /// The address to geocode, if there is anything to look up.
    pub fn lookup_address(&self) -> Option<&str> {
        self.address
            .as_deref()
            .filter(|address| !address.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct RosterSnapshot {
    pub records: Vec<GraduateRecord>,
    pub last_updated: Option<NaiveDateTime>,
}

impl RosterSnapshot {
    pub fn new(records: Vec<GraduateRecord>) -> Self {
        let last_updated = records.iter().filter_map(|r| r.submitted_at).max();
        Self {
            records,
            last_updated,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Format the last-updated timestamp the way the dashboard shows it.
pub fn format_last_updated(last_updated: Option<NaiveDateTime>) -> String {
    last_updated
        .map(|ts| ts.format("%m/%d/%Y").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(submitted_at: Option<NaiveDateTime>) -> GraduateRecord {
        GraduateRecord {
            name: "Jane Doe".to_string(),
            class_year: Some("2023".to_string()),
            department: Some("EM".to_string()),
            employer: None,
            address: None,
            work_setting: None,
            headshot_url: None,
            submitted_at,
            coordinates: None,
        }
    }

    #[test]
    fn department_codes_map_to_display_names() {
        assert_eq!(department_display_name("EM"), "Emergency Medicine");
        assert_eq!(department_display_name("IM"), "Internal Medicine");
        assert_eq!(department_display_name("FM"), "Family Medicine");
        assert_eq!(department_display_name("PATH"), "PATH");
    }

    #[test]
    fn work_setting_classification_is_total() {
        assert_eq!(WorkSetting::classify(Some("Ambulatory")), WorkSetting::Ambulatory);
        assert_eq!(WorkSetting::classify(Some(" Hospital ")), WorkSetting::Hospital);
        assert_eq!(WorkSetting::classify(Some("Fellowship")), WorkSetting::Fellowship);
        assert_eq!(WorkSetting::classify(Some("hospital")), WorkSetting::Other);
        assert_eq!(WorkSetting::classify(Some("Academic")), WorkSetting::Other);
        assert_eq!(WorkSetting::classify(None), WorkSetting::Other);
        assert_eq!(WorkSetting::Other.marker_color(), "black");
        assert_eq!(WorkSetting::Hospital.marker_color(), "red");
    }

    #[test]
    fn last_updated_is_max_known_timestamp() {
        let early = NaiveDate::from_ymd_opt(2023, 6, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let late = NaiveDate::from_ymd_opt(2024, 2, 14)
            .unwrap()
            .and_hms_opt(17, 30, 0)
            .unwrap();
        let snapshot = RosterSnapshot::new(vec![record(Some(early)), record(None), record(Some(late))]);
        assert_eq!(snapshot.last_updated, Some(late));
        assert_eq!(format_last_updated(snapshot.last_updated), "02/14/2024");
    }

    #[test]
    fn unknown_last_updated_when_no_timestamps() {
        let snapshot = RosterSnapshot::new(vec![record(None)]);
        assert_eq!(snapshot.last_updated, None);
        assert_eq!(format_last_updated(snapshot.last_updated), "unknown");
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("super-secret");
        assert_eq!(format!("{:?}", key), "ApiKey(***)");
        assert_eq!(key.expose(), "super-secret");
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: Config = toml::from_str("sheet_url = \"roster.csv\"\ngeocode_concurrency = 0\n").unwrap();
        assert_eq!(config.sheet_url, "roster.csv");
        assert_eq!(config.sheet_name, "Sheet1");
        assert_eq!(config.output_directory, "output");
        assert_eq!(config.effective_concurrency(), 1);
    }
}
