// Shared helpers for the pipeline integration tests: roster CSV fixtures and
// mock geocoding responses.

#![allow(dead_code)] // Each test file uses a different subset

use graduate_map::loader::EXPECTED_COLUMNS;
use graduate_map::Config;
use serde_json::{json, Value};
use std::path::Path;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ROSTER_PATH: &str = "/roster.csv";
pub const GEOCODE_PATH: &str = "/maps/api/geocode/json";
pub const TEST_KEY: &str = "test-key";

/// One roster row, in `EXPECTED_COLUMNS` order.
pub struct Row<'a> {
    pub name: &'a str,
    pub year: &'a str,
    pub department: &'a str,
    pub employer: &'a str,
    pub address: &'a str,
    pub setting: &'a str,
    pub submitted_at: &'a str,
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

pub fn roster_csv(rows: &[Row<'_>]) -> String {
    let mut csv = EXPECTED_COLUMNS.iter().map(|c| quote(c)).collect::<Vec<_>>().join(",");
    csv.push('\n');
    for row in rows {
        let fields = [
            row.name,
            row.year,
            row.department,
            row.employer,
            row.address,
            row.setting,
            "",
            row.submitted_at,
        ];
        csv.push_str(&fields.iter().map(|f| quote(f)).collect::<Vec<_>>().join(","));
        csv.push('\n');
    }
    csv
}

pub fn location_body(lat: f64, lng: f64) -> Value {
    json!({
        "results": [{ "geometry": { "location": { "lat": lat, "lng": lng } } }],
        "status": "OK"
    })
}

pub fn zero_results_body() -> Value {
    json!({ "results": [], "status": "ZERO_RESULTS" })
}

pub async fn mount_roster(server: &MockServer, csv: String, expected_fetches: u64) {
    Mock::given(method("GET"))
        .and(path(ROSTER_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(csv))
        .expect(expected_fetches)
        .mount(server)
        .await;
}

pub async fn mount_geocode(server: &MockServer, address: &str, response: ResponseTemplate, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path(GEOCODE_PATH))
        .and(query_param("address", address))
        .and(query_param("key", TEST_KEY))
        .respond_with(response)
        .expect(expected_calls)
        .mount(server)
        .await;
}

pub fn config_for(server: &MockServer, output_dir: &Path) -> Config {
    Config {
        sheet_url: format!("{}{}", server.uri(), ROSTER_PATH),
        geocode_endpoint: format!("{}{}", server.uri(), GEOCODE_PATH),
        output_directory: output_dir.to_string_lossy().to_string(),
        geocode_concurrency: 2,
        request_timeout_secs: 5,
        title: "Graduate Map".to_string(),
        ..Config::default()
    }
}
