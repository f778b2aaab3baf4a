use crate::models::format_last_updated;
use crate::render::{escape_html, EXPORT_FILE_NAME, EXPORT_MIME_TYPE};
use crate::report::{RosterStatistics, CENTRAL_VALLEY_LABEL};

pub const DASHBOARD_FILE_NAME: &str = "dashboard.html";
pub const MAP_DISPLAY_WIDTH: u32 = 725;
pub const MAP_DISPLAY_HEIGHT: u32 = 500;

/// Page text shown above the map.
#[derive(Debug, Clone)]
pub struct DashboardHeader<'a> {
    pub title: &'a str,
    pub description: &'a str,
}

fn strong_list<T, F>(items: &[T], parts: F) -> String
where
    F: Fn(&T) -> (String, String),
{
    items
        .iter()
        .map(|item| {
            let (label, value) = parts(item);
            format!("<strong>{}</strong>: {}", escape_html(&label), value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Dashboard page: header, embedded map, download link, then the statistics
/// in a fixed order.
pub fn render_dashboard(header: &DashboardHeader<'_>, stats: &RosterStatistics) -> String {
    let mut body = String::new();

    body.push_str(&format!("<h1>{}</h1>\n", escape_html(header.title)));
    body.push_str(&format!(
        "<p>{} Last updated: {}</p>\n",
        escape_html(header.description),
        format_last_updated(stats.last_updated)
    ));

    body.push_str(&format!(
        "<iframe src=\"{file}\" title=\"Graduate map\" width=\"{w}\" height=\"{h}\" style=\"border: none;\"></iframe>\n",
        file = EXPORT_FILE_NAME,
        w = MAP_DISPLAY_WIDTH,
        h = MAP_DISPLAY_HEIGHT,
    ));
    body.push_str(&format!(
        "<p><a href=\"{file}\" download=\"{file}\" type=\"{mime}\">Download file as HTML file</a></p>\n",
        file = EXPORT_FILE_NAME,
        mime = EXPORT_MIME_TYPE,
    ));
    body.push_str("<p>Use a browser to open the downloaded HTML file for offline viewing</p>\n");

    body.push_str(&format!(
        "<h3>🎓 Total Graduates: {}</h3>\n",
        stats.total_graduates
    ));

    body.push_str("<h3>🪴 Graduates by Department</h3>\n");
    body.push_str(&format!(
        "<p id=\"departments\">{}</p>\n",
        strong_list(&stats.departments, |d| (d.name.clone(), d.count.to_string()))
    ));

    body.push_str(&format!(
        "<h3 id=\"region\">✅ Graduates in {}: {} ({:.2}%)</h3>\n",
        CENTRAL_VALLEY_LABEL, stats.region_count, stats.region_percentage
    ));

    if !stats.unlocatable_names.is_empty() {
        body.push_str("<h3>❌ Graduate(s) with Unlocatable Work Address</h3>\n");
        body.push_str(&format!(
            "<p id=\"unlocatable\">{}</p>\n",
            escape_html(&stats.unlocatable_names.join(", "))
        ));
    }

    body.push_str("<h3>🏢 Graduates by Work Setting</h3>\n");
    body.push_str(&format!(
        "<p id=\"work-settings\">{}</p>\n",
        strong_list(&stats.work_settings, |s| (
            s.setting.clone(),
            format!("{} ({:.2}%)", s.count, s.percentage)
        ))
    ));

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
        <style>body {{ font-family: sans-serif; max-width: 760px; margin: 2em auto; }}</style>\n\
        </head>\n<body>\n{}</body>\n</html>\n",
        escape_html(header.title),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{DepartmentCount, SettingShare};

    fn stats(unlocatable: Vec<String>) -> RosterStatistics {
        RosterStatistics {
            total_graduates: 3,
            geocoded_count: 3 - unlocatable.len(),
            departments: vec![DepartmentCount {
                name: "Emergency Medicine".to_string(),
                count: 3,
            }],
            region_count: 1,
            region_percentage: 100.0 / 3.0,
            unlocatable_names: unlocatable,
            work_settings: vec![SettingShare {
                setting: "Hospital".to_string(),
                count: 3,
                percentage: 100.0,
            }],
            last_updated: None,
        }
    }

    const HEADER: DashboardHeader<'static> = DashboardHeader {
        title: "Graduate Map",
        description: "Where our graduates work.",
    };

    #[test]
    fn sections_appear_in_order() {
        let page = render_dashboard(&HEADER, &stats(vec!["Bob Brown".to_string()]));

        let positions: Vec<usize> = [
            "<h1>Graduate Map</h1>",
            "Last updated: unknown",
            "<iframe src=\"geo_graduates.html\"",
            "download=\"geo_graduates.html\" type=\"text/html\"",
            "Total Graduates: 3",
            "<strong>Emergency Medicine</strong>: 3",
            "Graduates in Central Valley, CA: 1 (33.33%)",
            "Bob Brown",
            "<strong>Hospital</strong>: 3 (100.00%)",
        ]
        .iter()
        .map(|needle| page.find(needle).unwrap_or_else(|| panic!("missing {needle}")))
        .collect();

        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(page.contains("width=\"725\""));
    }

    #[test]
    fn unlocatable_section_only_when_needed() {
        let page = render_dashboard(&HEADER, &stats(Vec::new()));
        assert!(!page.contains("Unlocatable"));
    }
}
