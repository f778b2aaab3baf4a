//! Clustered marker map rendering.
//!
//! Records go through [`PopupView`] and [`MapMarker`] view models first; the
//! page itself is a fixed Leaflet template with the markers embedded inline as
//! JSON, so the exported file carries all of its data.

use crate::models::{Coordinates, GraduateRecord, WorkSetting};
use log::info;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const EXPORT_FILE_NAME: &str = "geo_graduates.html";
pub const EXPORT_MIME_TYPE: &str = "text/html";

const LEFT_COLUMN_COLOR: &str = "#3e95b5";
const RIGHT_COLUMN_COLOR: &str = "#f2f9ff";

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Everything a marker popup shows, already resolved for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupView {
    pub headshot_url: Option<String>,
    pub name: String,
    pub class_year: String,
    pub department: String,
    pub employer: String,
    pub work_setting: String,
}

impl PopupView {
    pub fn from_record(record: &GraduateRecord) -> Self {
        Self {
            headshot_url: record
                .headshot_url
                .as_deref()
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
            name: record.name.clone(),
            class_year: record.class_year.clone().unwrap_or_default(),
            department: record.department_name().unwrap_or_default().to_string(),
            employer: record.employer.clone().unwrap_or_default(),
            work_setting: record.work_setting.clone().unwrap_or_default(),
        }
    }

    /// Table rows in display order.
    pub fn rows(&self) -> [(&'static str, &str); 4] {
        [
            ("Year Graduated", self.class_year.as_str()),
            ("Department", self.department.as_str()),
            ("Employer", self.employer.as_str()),
            ("Work Setting", self.work_setting.as_str()),
        ]
    }

    pub fn render_html(&self) -> String {
        let mut html = String::new();

        if let Some(url) = &self.headshot_url {
            html.push_str(&format!(
                "<center><img src=\"{}\" alt=\"headshot\" width=\"100\" height=\"100\"></center>",
                escape_html(url)
            ));
        }
        html.push_str(&format!(
            "<center><h4 style=\"margin-bottom:5px; width:200px\">{}</h4></center>",
            escape_html(&self.name)
        ));

        html.push_str("<center><table style=\"height: 126px; width: 305px;\"><tbody>");
        for (label, value) in self.rows() {
            html.push_str(&format!(
                "<tr><td style=\"background-color: {}; padding: 5px\"><span style=\"color: #ffffff;\">{}</span></td>\
                <td style=\"width: 150px; background-color: {}; padding: 5px\">{}</td></tr>",
                LEFT_COLUMN_COLOR,
                label,
                RIGHT_COLUMN_COLOR,
                escape_html(value)
            ));
        }
        html.push_str("</tbody></table></center>");
        html
    }
}

/// One marker as handed to the page script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub lat: f64,
    pub lng: f64,
    pub color: &'static str,
    pub tooltip: &'static str,
    pub popup: String,
}

impl MapMarker {
    /// `None` for records without coordinates.
    pub fn from_record(record: &GraduateRecord) -> Option<Self> {
        let Coordinates { lat, lng } = record.coordinates?;
        let setting: WorkSetting = record.setting();
        Some(Self {
            lat,
            lng,
            color: setting.marker_color(),
            tooltip: setting.label(),
            popup: PopupView::from_record(record).render_html(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: Coordinates,
    pub zoom: u8,
}

impl Default for MapView {
    /// Whole continental US.
    fn default() -> Self {
        Self {
            center: Coordinates::new(37.0902, -95.7129),
            zoom: 4,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapRenderer {
    view: MapView,
}

#[derive(Debug, Clone)]
pub struct RenderedMap {
    pub html: String,
    pub markers: Vec<MapMarker>,
}

impl MapRenderer {
    pub fn new(view: MapView) -> Self {
        Self { view }
    }

    pub fn render(&self, records: &[GraduateRecord]) -> RenderedMap {
        let markers: Vec<MapMarker> = records.iter().filter_map(MapMarker::from_record).collect();
        let html = self.page(&markers);
        RenderedMap { html, markers }
    }

    fn page(&self, markers: &[MapMarker]) -> String {
        // `</` would close the inline script early.
        let markers_json = serde_json::to_string(markers)
            .unwrap_or_else(|_| "[]".to_string())
            .replace("</", "<\\/");

        MAP_TEMPLATE
            .replace("{{CENTER_LAT}}", &self.view.center.lat.to_string())
            .replace("{{CENTER_LNG}}", &self.view.center.lng.to_string())
            .replace("{{ZOOM}}", &self.view.zoom.to_string())
            .replace("{{MARKERS}}", &markers_json)
    }
}

impl RenderedMap {
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Write `geo_graduates.html` into `dir`, replacing any earlier export.
    pub fn export(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(EXPORT_FILE_NAME);
        fs::write(&path, &self.html)?;
        info!("Saved map with {} markers to {}", self.marker_count(), path.display());
        Ok(path)
    }
}

const MAP_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Graduate Map</title>
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/leaflet@1.9.4/dist/leaflet.css">
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.css">
<link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/font-awesome@4.7.0/css/font-awesome.min.css">
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet.markercluster/1.5.3/MarkerCluster.css">
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet.markercluster/1.5.3/MarkerCluster.Default.css">
<script src="https://cdn.jsdelivr.net/npm/leaflet@1.9.4/dist/leaflet.js"></script>
<script src="https://cdnjs.cloudflare.com/ajax/libs/Leaflet.awesome-markers/2.0.2/leaflet.awesome-markers.js"></script>
<script src="https://cdnjs.cloudflare.com/ajax/libs/leaflet.markercluster/1.5.3/leaflet.markercluster.js"></script>
<style>
html, body { width: 100%; height: 100%; margin: 0; padding: 0; }
#map { position: absolute; top: 0; bottom: 0; right: 0; left: 0; }
</style>
</head>
<body>
<div id="map"></div>
<script>
var markers = {{MARKERS}};
var map = L.map("map").setView([{{CENTER_LAT}}, {{CENTER_LNG}}], {{ZOOM}});
L.tileLayer("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png", {
    maxZoom: 18,
    attribution: "&copy; OpenStreetMap contributors"
}).addTo(map);
var cluster = L.markerClusterGroup().addTo(map);
markers.forEach(function (m) {
    var icon = L.AwesomeMarkers.icon({ icon: "user", prefix: "fa", markerColor: m.color, iconColor: "white" });
    L.marker([m.lat, m.lng], { icon: icon })
        .bindPopup(m.popup, { maxWidth: 2650 })
        .bindTooltip(m.tooltip)
        .addTo(cluster);
});
</script>
</body>
</html>
"#;
