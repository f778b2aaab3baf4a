use crate::models::{format_last_updated, Coordinates};
use crate::normalizer::NormalizedRoster;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;

/// Label used when a department or work setting was left blank.
pub const UNSPECIFIED: &str = "Unspecified";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Inclusive on every edge.
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.south..=self.north).contains(&point.lat) && (self.west..=self.east).contains(&point.lng)
    }
}

/// Reporting region for "Central Valley, CA". Drawn generously: it also
/// takes in part of the coast.
pub const CENTRAL_VALLEY: BoundingBox = BoundingBox {
    north: 38.5,  // southern San Joaquin County
    south: 34.5,  // southern Kern County
    west: -122.0, // Coast Ranges
    east: -118.5, // Sierra Nevada foothills
};

pub const CENTRAL_VALLEY_LABEL: &str = "Central Valley, CA";

#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentCount {
    pub name: String,
    pub count: usize,
}

impl fmt::Display for DepartmentCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.count)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingShare {
    pub setting: String,
    pub count: usize,
    pub percentage: f64,
}

impl fmt::Display for SettingShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({:.2}%)", self.setting, self.count, self.percentage)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RosterStatistics {
    pub total_graduates: usize,
    pub geocoded_count: usize,
    pub departments: Vec<DepartmentCount>,
    pub region_count: usize,
    pub region_percentage: f64,
    pub unlocatable_names: Vec<String>,
    pub work_settings: Vec<SettingShare>,
    pub last_updated: Option<NaiveDateTime>,
}

/// `count / total * 100`, or zero for an empty roster.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Count labels, most frequent first; ties keep first-appearance order.
fn count_by<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for label in labels {
        let count = counts.entry(label).or_insert(0);
        if *count == 0 {
            order.push(label);
        }
        *count += 1;
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|label| (label.to_string(), counts[label]))
        .collect();
    // Stable sort keeps first-appearance order among equal counts
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
}

impl RosterStatistics {
    pub fn compute(roster: &NormalizedRoster) -> Self {
        Self::compute_with_region(roster, CENTRAL_VALLEY)
    }

    pub fn compute_with_region(roster: &NormalizedRoster, region: BoundingBox) -> Self {
        let total_graduates = roster.total();

        let departments = count_by(roster.all_records().map(|r| r.department_name().unwrap_or(UNSPECIFIED)))
            .into_iter()
            .map(|(name, count)| DepartmentCount { name, count })
            .collect();

        let region_count = roster
            .geocoded
            .iter()
            .filter_map(|r| r.coordinates)
            .filter(|point| region.contains(*point))
            .count();

        let work_settings = count_by(roster.all_records().map(|r| {
            r.work_setting
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(UNSPECIFIED)
        }))
        .into_iter()
        .map(|(setting, count)| SettingShare {
            setting,
            count,
            percentage: percentage(count, total_graduates),
        })
        .collect();

        Self {
            total_graduates,
            geocoded_count: roster.geocoded.len(),
            departments,
            region_count,
            region_percentage: percentage(region_count, total_graduates),
            unlocatable_names: roster.unlocatable.iter().map(|r| r.name.clone()).collect(),
            work_settings,
            last_updated: roster.last_updated,
        }
    }

    pub fn department_line(&self) -> String {
        join(&self.departments)
    }

    pub fn work_setting_line(&self) -> String {
        join(&self.work_settings)
    }

    pub fn region_line(&self) -> String {
        format!(
            "Graduates in {}: {} ({:.2}%)",
            CENTRAL_VALLEY_LABEL, self.region_count, self.region_percentage
        )
    }

    /// Plain-text rendering of every statistic, in dashboard order.
    pub fn to_text(&self, title: &str) -> String {
        let mut content = String::new();
        content.push_str(&format!("{}\n", title));
        content.push_str(&format!("{}\n", "=".repeat(title.chars().count())));
        content.push_str(&format!("Last updated: {}\n\n", format_last_updated(self.last_updated)));

        content.push_str(&format!("Total Graduates: {}\n\n", self.total_graduates));
        content.push_str("Graduates by Department\n");
        content.push_str(&format!("{}\n\n", self.department_line()));
        content.push_str(&format!("{}\n\n", self.region_line()));

        if !self.unlocatable_names.is_empty() {
            content.push_str("Graduate(s) with Unlocatable Work Address\n");
            content.push_str(&format!("{}\n\n", self.unlocatable_names.join(", ")));
        }

        content.push_str("Graduates by Work Setting\n");
        content.push_str(&format!("{}\n", self.work_setting_line()));
        content
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
