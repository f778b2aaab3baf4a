use crate::dashboard::DASHBOARD_FILE_NAME;
use crate::models::{GraduateRecord, format_last_updated};
use crate::normalizer::NormalizedRoster;
use crate::render::EXPORT_FILE_NAME;
use crate::report::RosterStatistics;
use csv::Writer;
use log::info;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE_NAME: &str = "summary.txt";
pub const GRADUATES_CSV_FILE_NAME: &str = "graduates.csv";
pub const UNLOCATABLE_CSV_FILE_NAME: &str = "unlocatable_graduates.csv";

/// Files this tool writes; nothing else in the output directory is touched.
const GENERATED_FILES: [&str; 5] = [
    EXPORT_FILE_NAME,
    DASHBOARD_FILE_NAME,
    SUMMARY_FILE_NAME,
    GRADUATES_CSV_FILE_NAME,
    UNLOCATABLE_CSV_FILE_NAME,
];

pub fn clean_output_directory(output_dir: &Path) -> io::Result<()> {
    if !output_dir.exists() {
        return Ok(());
    }

    for item in &GENERATED_FILES {
        let item_path = output_dir.join(item);
        if item_path.is_file() {
            fs::remove_file(&item_path)?;
            info!("Removed previous output: {}", item);
        }
    }

    Ok(())
}

pub fn write_summary_report(stats: &RosterStatistics, title: &str, output_dir: &Path) -> io::Result<PathBuf> {
    let path = output_dir.join(SUMMARY_FILE_NAME);
    fs::write(&path, stats.to_text(title))?;
    Ok(path)
}

pub fn write_dashboard(page: &str, output_dir: &Path) -> io::Result<PathBuf> {
    let path = output_dir.join(DASHBOARD_FILE_NAME);
    fs::write(&path, page)?;
    info!("Saved dashboard to {}", path.display());
    Ok(path)
}

const CSV_HEADERS: [&str; 11] = [
    "Name",
    "Class Year",
    "Department",
    "Employer",
    "Address",
    "Work Setting",
    "Headshot URL",
    "Submitted At",
    "Latitude",
    "Longitude",
    "Geocoded",
];

fn write_records<'a>(
    path: &Path,
    records: impl Iterator<Item = &'a GraduateRecord>,
) -> csv::Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(CSV_HEADERS)?;

    for record in records {
        let (lat, lng) = record
            .coordinates
            .map(|c| (c.lat.to_string(), c.lng.to_string()))
            .unwrap_or_default();
        let submitted_at = record
            .submitted_at
            .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();

        writer.write_record([
            record.name.as_str(),
            record.class_year.as_deref().unwrap_or(""),
            record.department_name().unwrap_or(""),
            record.employer.as_deref().unwrap_or(""),
            record.address.as_deref().unwrap_or(""),
            record.work_setting.as_deref().unwrap_or(""),
            record.headshot_url.as_deref().unwrap_or(""),
            submitted_at.as_str(),
            lat.as_str(),
            lng.as_str(),
            if record.is_geocoded() { "yes" } else { "no" },
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Every normalized record, geocoded ones first.
pub fn write_graduates_csv(roster: &NormalizedRoster, output_dir: &Path) -> csv::Result<PathBuf> {
    let path = output_dir.join(GRADUATES_CSV_FILE_NAME);
    write_records(&path, roster.all_records())?;
    Ok(path)
}

pub fn write_unlocatable_csv(roster: &NormalizedRoster, output_dir: &Path) -> csv::Result<PathBuf> {
    let path = output_dir.join(UNLOCATABLE_CSV_FILE_NAME);
    write_records(&path, roster.unlocatable.iter())?;
    Ok(path)
}

/// Console summary printed at the end of a run.
pub fn print_summary(stats: &RosterStatistics, title: &str, outputs: &[PathBuf]) {
    println!("\n📊 {}", title);
    println!("==========\n");
    println!("🕒 Last updated: {}", format_last_updated(stats.last_updated));
    println!("🎓 Total Graduates: {}", stats.total_graduates);
    println!("🪴 Graduates by Department: {}", stats.department_line());
    println!("✅ {}", stats.region_line());

    if !stats.unlocatable_names.is_empty() {
        println!(
            "❌ Graduate(s) with Unlocatable Work Address: {}",
            stats.unlocatable_names.join(", ")
        );
    }

    println!("🏢 Graduates by Work Setting: {}", stats.work_setting_line());

    println!();
    for path in outputs {
        println!("📄 {}", path.display());
    }
}
